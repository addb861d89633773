//! Lightbox CLI: webcam preview and device control from the terminal.
//!
//! Usage:
//!   lightbox check                       Check system capabilities
//!   lightbox devices                     List video devices
//!   lightbox controls <DEVICE>           List device controls
//!   lightbox set <DEVICE> <NAME> <VALUE> Write one control
//!   lightbox formats <DEVICE>            List capture formats
//!   lightbox preview [OPTIONS]           Interactive preview

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lightbox_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "lightbox",
    about = "Webcam preview with focus and exposure controls",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check system capabilities
    Check,

    /// List video devices
    Devices,

    /// Discover and print the controls of a device
    Controls {
        /// Device node, e.g. /dev/video0
        device: PathBuf,

        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one control
    Set {
        /// Device node, e.g. /dev/video0
        device: PathBuf,

        /// Control name, e.g. focus_absolute
        name: String,

        /// New value
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },

    /// Negotiate with a device and print its capture formats
    Formats {
        /// Device node, e.g. /dev/video0
        device: PathBuf,

        /// Seconds to wait for negotiation
        #[arg(long, default_value = "10")]
        timeout: u64,
    },

    /// Interactive preview; commands are read from stdin
    Preview {
        /// Device index as printed by `lightbox devices` (0 = no device)
        #[arg(short, long)]
        device: Option<usize>,

        /// Initial orientation, e.g. clockwise or horizontal-flip
        #[arg(short, long)]
        orientation: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    lightbox_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Check => commands::check::run(&config),
        Commands::Devices => commands::devices::run(),
        Commands::Controls { device, json } => commands::controls::run(&config, device, json).await,
        Commands::Set {
            device,
            name,
            value,
        } => commands::set::run(&config, device, name, value).await,
        Commands::Formats { device, timeout } => {
            commands::formats::run(device, timeout).await
        }
        Commands::Preview {
            device,
            orientation,
        } => commands::preview::run(&config, device, orientation).await,
    }
}
