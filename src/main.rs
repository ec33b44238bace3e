use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use diffdrive_runtime::config::{Config, ConfigError};
use diffdrive_runtime::runtime;

/// Gamepad teleop for a differential-drive base over a "+sa" serial link
#[derive(Parser)]
#[command(name = "diffdrive-runtime", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bind a gamepad and drive the motors
    Drive {
        #[command(flatten)]
        link: LinkArgs,

        /// Print frames to stdout instead of opening the serial port
        #[arg(long)]
        dry_run: bool,
    },
    /// Read "+sa" frames from a serial port and log them
    Monitor {
        #[command(flatten)]
        link: LinkArgs,
    },
}

#[derive(Args)]
struct LinkArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,
}

impl LinkArgs {
    fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        Ok(config)
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match cli.command {
        Command::Drive { link, dry_run } => {
            let config = link.load()?;
            runtime::run_drive(&config, dry_run).await?;
        }
        Command::Monitor { link } => {
            let config = link.load()?;
            // Serial reads block, keep them off the async runtime
            tokio::task::spawn_blocking(move || runtime::run_monitor(&config)).await??;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug); stderr keeps dry-run frames clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
