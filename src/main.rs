// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::config::Config;
use barcode_scanner::constants::APP_ID;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Scan barcodes from a camera or an image file")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive scanner in the terminal (default)
    Terminal {
        /// Camera index to use (from 'barcode-scanner list')
        #[arg(short, long)]
        device: Option<usize>,

        /// Mirror the camera preview horizontally
        #[arg(long)]
        mirror: bool,
    },

    /// List available cameras
    List,

    /// Decode a barcode from an image file
    Scan {
        /// Image file to decode
        path: PathBuf,
    },

    /// Print barcodes seen by a camera
    Watch {
        /// Camera index to use (from 'barcode-scanner list')
        #[arg(short, long)]
        device: Option<usize>,

        /// Replay an image file instead of opening a camera
        #[arg(short, long)]
        replay: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Keep watching after the first barcode
        #[arg(short, long)]
        continuous: bool,
    },

    /// Show the configuration
    Config {
        /// Write the default configuration if no file exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, None | Some(Commands::Terminal { .. }));
    init_logging(interactive);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match cli.command {
        None => barcode_scanner::terminal::run(config),
        Some(Commands::Terminal { device, mirror }) => {
            if device.is_some() {
                config.camera_device = device;
            }
            config.mirror_preview |= mirror;
            barcode_scanner::terminal::run(config)
        }
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Scan { path }) => cli::scan_file(&path, &config),
        Some(Commands::Watch {
            device,
            replay,
            timeout,
            continuous,
        }) => cli::watch(
            cli::WatchOptions {
                device,
                replay,
                timeout,
                continuous,
            },
            &config,
        ),
        Some(Commands::Config { init }) => cli::show_config(init, cli.config.as_deref()),
    }
}

fn init_logging(interactive: bool) {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=barcode_scanner=debug, RUST_LOG=info
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // The terminal UI owns stdout and stderr, so its logs go to a file
    if interactive && let Some(file) = open_log_file() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join(APP_ID);
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("scanner.log"))
        .ok()
}
