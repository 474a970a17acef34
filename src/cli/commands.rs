use super::render::{cities_table, countries_table, sources_table, stations_table, stats_table};
use crate::error::{AppError, Result};
use crate::service::AirQualityService;
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Default number of cities shown by `best` / `worst`.
pub const DEFAULT_TOP_N: usize = 10;

/// Default number of stations listed by `stations`.
pub const DEFAULT_STATION_LIMIT: usize = 25;

/// Aggregate, deduplicate and rank air quality readings from several providers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Command to run; omit for the interactive menu
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Global statistics over the current snapshot
    Stats,

    /// Per-country breakdown, most polluted first
    Countries,

    /// Every ranked city, in the order first reported
    Cities,

    /// The cleanest cities by average AQI
    Best(TopArgs),

    /// The most polluted cities by average AQI
    Worst(TopArgs),

    /// Deduplicated station readings
    Stations {
        /// Maximum number of stations to list
        #[arg(short, long, default_value_t = DEFAULT_STATION_LIMIT)]
        limit: usize,
    },

    /// Fetch from every provider and report how each one fared
    Sources,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TopArgs {
    /// Number of cities to show
    #[arg(short = 'n', long = "count", default_value_t = DEFAULT_TOP_N)]
    pub n: usize,
}

/// Rejects a zero count for commands that rank or list.
pub fn validate_count(n: usize) -> Result<usize> {
    if n == 0 {
        return Err(AppError::Cli("Count must be at least 1".to_string()));
    }
    Ok(n)
}

/// Asks for a positive count, offering `default`.
pub fn prompt_count(prompt: &str, default: usize) -> Result<usize> {
    let n: usize = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .validate_with(|input: &usize| -> std::result::Result<(), &str> {
            if *input == 0 {
                Err("Enter a number greater than zero")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(n)
}

/// CLI application
pub struct App {
    service: AirQualityService,
    json: bool,
}

impl App {
    pub fn new(service: AirQualityService, json: bool) -> Self {
        Self { service, json }
    }

    /// Run a single command and print its result
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        info!("Running command {:?}", command);
        match command {
            Commands::Stats => self.show_stats().await,
            Commands::Countries => self.show_countries().await,
            Commands::Cities => self.show_cities().await,
            Commands::Best(args) => self.show_best(validate_count(args.n)?).await,
            Commands::Worst(args) => self.show_worst(validate_count(args.n)?).await,
            Commands::Stations { limit } => self.show_stations(validate_count(limit)?).await,
            Commands::Sources => self.show_sources().await,
        }
    }

    /// Drops every cached ranking and reports how many were removed.
    pub fn clear_cache(&self) {
        let dropped = self.service.clear_cache();
        println!(
            "{}",
            format!("Cleared {} cached ranking(s).", dropped).green()
        );
    }

    fn spinner(&self, message: &str) -> Result<ProgressBar> {
        if self.json {
            return Ok(ProgressBar::hidden());
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Ok(spinner)
    }

    fn print_json<T: Serialize>(value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn fetch_message(&self) -> String {
        format!(
            "Fetching from {} providers...",
            self.service.provider_count()
        )
    }

    async fn show_stats(&self) -> Result<()> {
        let spinner = self.spinner(&self.fetch_message())?;
        let stats = self.service.stats().await;
        spinner.finish_and_clear();

        if self.json {
            return Self::print_json(&stats);
        }
        println!("{}", "Global air quality".cyan().bold());
        println!("{}", stats_table(&stats));
        Ok(())
    }

    async fn show_countries(&self) -> Result<()> {
        let spinner = self.spinner(&self.fetch_message())?;
        let countries = self.service.country_stats().await;
        spinner.finish_and_clear();

        if self.json {
            return Self::print_json(&countries);
        }
        if countries.is_empty() {
            println!("{}", "No country information in the current snapshot.".yellow());
            return Ok(());
        }
        println!("{}", "Countries by average AQI".cyan().bold());
        println!("{}", countries_table(&countries));
        Ok(())
    }

    async fn show_cities(&self) -> Result<()> {
        let spinner = self.spinner("Ranking cities...")?;
        let cities = self.service.city_rankings().await;
        spinner.finish_and_clear();

        if self.json {
            return Self::print_json(&cities);
        }
        println!(
            "{}",
            format!("{} ranked cities", cities.len()).cyan().bold()
        );
        println!("{}", cities_table(&cities));
        Ok(())
    }

    async fn show_best(&self, n: usize) -> Result<()> {
        let spinner = self.spinner("Ranking cities...")?;
        let cities = self.service.best_cities(n).await;
        spinner.finish_and_clear();

        if self.json {
            return Self::print_json(&cities);
        }
        println!("{}", format!("Top {} cleanest cities", n).green().bold());
        println!("{}", cities_table(&cities));
        Ok(())
    }

    async fn show_worst(&self, n: usize) -> Result<()> {
        let spinner = self.spinner("Ranking cities...")?;
        let cities = self.service.worst_cities(n).await;
        spinner.finish_and_clear();

        if self.json {
            return Self::print_json(&cities);
        }
        println!("{}", format!("Top {} most polluted cities", n).red().bold());
        println!("{}", cities_table(&cities));
        Ok(())
    }

    async fn show_stations(&self, limit: usize) -> Result<()> {
        let spinner = self.spinner(&self.fetch_message())?;
        let snapshot = self.service.snapshot().await;
        spinner.finish_and_clear();

        let total = snapshot.records.len();
        let shown = &snapshot.records[..total.min(limit)];

        if self.json {
            return Self::print_json(&shown);
        }
        if snapshot.used_fallback {
            println!(
                "{}",
                "No provider returned data; showing the fallback dataset.".yellow()
            );
        }
        println!("{}", stations_table(shown));
        if total > shown.len() {
            println!("... and {} more (showing first {} only)", total - shown.len(), limit);
        }
        Ok(())
    }

    async fn show_sources(&self) -> Result<()> {
        let spinner = self.spinner(&self.fetch_message())?;
        let snapshot = self.service.snapshot().await;
        spinner.finish_and_clear();

        if self.json {
            return Self::print_json(&snapshot.reports);
        }
        println!("{}", sources_table(&snapshot.reports));
        if snapshot.used_fallback {
            println!(
                "{}",
                "Every provider came back empty; the fallback dataset was used.".yellow()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fakes::{Behaviour, FakeProvider};
    use crate::cache::RankingCache;
    use crate::models::DataSource;
    use crate::pipeline::Aggregator;
    use std::sync::Arc;

    fn offline_app(json: bool) -> App {
        let aggregator = Aggregator::new(
            vec![
                FakeProvider::with(DataSource::OpenAq, Behaviour::Unconfigured),
                FakeProvider::with(DataSource::Waqi, Behaviour::Fail("503".into())),
            ],
            Duration::from_secs(5),
        );
        let service = AirQualityService::new(aggregator, Arc::new(RankingCache::default()));
        App::new(service, json)
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["aqi-aggregator", "worst", "-n", "3"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Worst(TopArgs { n: 3 })));
        assert!(!cli.json);

        let cli = Cli::try_parse_from(["aqi-aggregator", "best", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Best(TopArgs { n: DEFAULT_TOP_N })));
        assert!(cli.json);

        let cli = Cli::try_parse_from(["aqi-aggregator", "stations", "--limit", "5"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Stations { limit: 5 }));

        let cli = Cli::try_parse_from(["aqi-aggregator"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_parse_rejects_non_numeric_count() {
        assert!(Cli::try_parse_from(["aqi-aggregator", "best", "-n", "many"]).is_err());
    }

    #[tokio::test]
    async fn test_zero_count_is_a_cli_error() {
        let app = offline_app(true);
        let result = app
            .run_command(Commands::Worst(TopArgs { n: 0 }))
            .await;
        match result {
            Err(AppError::Cli(msg)) => assert!(msg.contains("at least 1")),
            other => panic!("Expected CliError, got {:?}", other),
        }
        assert!(app.service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_commands_run_against_fallback_data() {
        let app = offline_app(true);
        for command in [
            Commands::Stats,
            Commands::Countries,
            Commands::Cities,
            Commands::Best(TopArgs { n: 3 }),
            Commands::Worst(TopArgs { n: 3 }),
            Commands::Stations { limit: 2 },
            Commands::Sources,
        ] {
            assert!(app.run_command(command).await.is_ok());
        }
        assert_eq!(app.service.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_table_output_and_cache_clear() {
        let app = offline_app(false);
        assert!(app.run_command(Commands::Worst(TopArgs { n: 5 })).await.is_ok());
        assert!(app.run_command(Commands::Stations { limit: 3 }).await.is_ok());
        app.clear_cache();
        assert!(app.service.cache().is_empty());
    }
}
