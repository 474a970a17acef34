mod analysis;
mod api;
mod aqi;
mod cache;
mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod pipeline;
mod service;

use cache::{spawn_sweeper, RankingCache};
use clap::Parser;
use cli::{App, Cli, Commands, TopArgs, DEFAULT_STATION_LIMIT, DEFAULT_TOP_N};
use colored::*;
use config::Config;
use dialoguer::{theme::ColorfulTheme, Select};
use error::Result;
use service::AirQualityService;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "aqi-aggregator.log";

/// Logs to stderr, plus a daily-rolling JSON file under `log_dir` when one is configured.
/// The returned guard must live as long as the process for the file writer to flush.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().json().with_writer(writer))
        .init();
    Ok(Some(guard))
}

async fn interactive(app: &App) -> Result<()> {
    println!(
        "{}",
        "Welcome to the Air Quality Aggregator!".cyan().bold()
    );

    // Main interactive loop
    loop {
        let options = &[
            "Global Statistics",
            "Country Breakdown",
            "All Ranked Cities",
            "Cleanest Cities",
            "Most Polluted Cities",
            "List Stations",
            "Provider Status",
            "Clear Ranking Cache",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()? // Ctrl+C / Esc yields None
            .unwrap_or(options.len() - 1);

        println!("\n---\n");

        let command_result = match selection {
            0 => app.run_command(Commands::Stats).await,
            1 => app.run_command(Commands::Countries).await,
            2 => app.run_command(Commands::Cities).await,
            3 | 4 => {
                let prompt = if selection == 3 {
                    "How many of the cleanest cities?"
                } else {
                    "How many of the most polluted cities?"
                };
                match cli::prompt_count(prompt, DEFAULT_TOP_N) {
                    Ok(n) if selection == 3 => app.run_command(Commands::Best(TopArgs { n })).await,
                    Ok(n) => app.run_command(Commands::Worst(TopArgs { n })).await,
                    Err(e) => {
                        println!("{} {}", "Failed to get input:".red(), e);
                        continue;
                    },
                }
            },
            5 => match cli::prompt_count("How many stations?", DEFAULT_STATION_LIMIT) {
                Ok(limit) => app.run_command(Commands::Stations { limit }).await,
                Err(e) => {
                    println!("{} {}", "Failed to get input:".red(), e);
                    continue;
                },
            },
            6 => app.run_command(Commands::Sources).await,
            7 => {
                app.clear_cache();
                Ok(())
            },
            8 => {
                println!("{}", "Exiting application. Goodbye!".green());
                break;
            },
            _ => unreachable!(),
        };

        if let Err(e) = command_result {
            error!("Command execution failed: {:?}", e);
            println!(
                "{} {}",
                "Error executing command:".red(),
                e.to_string().red()
            );
        }

        println!("\n---\n");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load();
    let _log_guard = init_tracing(config.as_ref().ok().and_then(|c| c.log_dir.as_deref()))?;
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            println!("{} {}", "Error:".red(), e.to_string().red());
            return Err(e);
        },
    };

    info!("Initializing air quality aggregator...");

    let cache = Arc::new(RankingCache::new(config.cache_ttl));
    info!(
        "Ranking cache TTL {:?}, swept every {:?}",
        cache.default_ttl(),
        config.sweep_interval
    );
    let sweeper = spawn_sweeper(Arc::clone(&cache), config.sweep_interval);
    let app = App::new(AirQualityService::from_config(&config, cache), cli.json);

    let result = match cli.command {
        Some(command) => app.run_command(command).await,
        None => interactive(&app).await,
    };
    sweeper.abort();

    if let Err(e) = &result {
        error!("Command execution failed: {:?}", e);
        eprintln!("{} {}", "Error:".red(), e.to_string().red());
    }
    result
}
