//! Aperture CLI - operator front end for the capture-metadata pipeline.
//!
//! Aperture persists captures into a media directory and writes their EXIF
//! metadata in the background. This binary inspects and manages that
//! directory, and can push an existing photo through the full pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Save a photo with a location, then wait for the metadata write
//! aperture import shot.jpg --lat 37.7749 --lon -122.4194
//!
//! # Show what was embedded
//! aperture inspect ~/Documents/Aperture/IMG_20240601_103000_123456.jpg
//!
//! # List captures and storage usage
//! aperture list
//! aperture usage
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Aperture - capture-metadata pipeline and media store.
#[derive(Parser, Debug)]
#[command(name = "aperture")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Media directory (overrides storage.custom_dir)
    #[arg(long, global = true, env = "APERTURE_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// View and manage configuration
    Config(cli::config::ConfigArgs),

    /// List captures in the media directory
    List(cli::media::ListArgs),

    /// Show storage usage of the media directory
    Usage,

    /// Save a photo through the capture pipeline
    Import(cli::import::ImportArgs),

    /// Show the capture metadata embedded in an image
    Inspect(cli::inspect::InspectArgs),

    /// Delete captures by file name
    Delete(cli::media::DeleteArgs),

    /// Delete everything in the media directory
    Clear(cli::media::ClearArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let mut config = match aperture_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `aperture config path`."
            );
            aperture_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    if let Some(dir) = cli.dir {
        config.storage.custom_dir = Some(dir);
    }

    tracing::debug!("Aperture v{}", aperture_core::VERSION);

    match cli.command {
        Commands::Config(args) => cli::config::execute(args).await,
        Commands::List(args) => cli::media::list(&config, args).await,
        Commands::Usage => cli::media::usage(&config).await,
        Commands::Import(args) => cli::import::execute(config, args).await,
        Commands::Inspect(args) => cli::inspect::execute(args).await,
        Commands::Delete(args) => cli::media::delete(&config, args).await,
        Commands::Clear(args) => cli::media::clear(&config, args).await,
    }
}
