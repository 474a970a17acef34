//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes the clap command definitions, the `App` that runs them against the
//! air quality service, interactive prompts, and table rendering.

mod commands;
mod render;

pub use commands::*;
