//! Recon
//!
//! Command-line front end for COLMAP-based 3D reconstruction.
//!
//! Features:
//! - Full sparse + dense pipeline with best sparse model selection
//! - Dense model inspection
//! - RGB-D dataset capture, depth hint conversion and back-projection
//! - Dataset download from the Hugging Face hub

mod app;
mod cli;
mod error;
mod logging;

use clap::Parser;
use cli::Cli;
use logging::LoggingConfig;

fn main() {
    let cli = Cli::parse();

    logging::init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        #[cfg(feature = "tracy")]
        enable_tracy: cli.tracy,
        #[cfg(not(feature = "tracy"))]
        enable_tracy: false,
    });

    if let Err(e) = app::run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
