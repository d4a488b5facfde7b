//! `bce-feeder` — stream pre-recorded frame data into the BC_EMU
//! test-pattern generator.
//!
//! ```text
//! USAGE:
//!   bce-feeder [-c <config>] [-d <dir>]
//!
//!   -c, --config <path>   Config file (default: bce_feeder.conf)
//!   -d, --dir <path>      Feed every .csv file in <dir> instead of the
//!                         configured data_files list
//! ```
//!
//! Exits 0 on normal completion (frames exhausted), 1 on any
//! configuration, CLI, hardware-identity, or I/O error.

use anyhow::Result;
use bce_driver::{
    discovery, frames, BarRegion, Config, FeederError, FeederOptions, FrameFeeder, RegisterMap,
    DEFAULT_CONFIG_FILE,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bce-feeder", about = "BC_EMU frame feeder", version)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory to scan for .csv frame files, overriding the configured
    /// data_files list.
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            // Unrecognized flag or malformed usage: report and exit 1
            eprintln!("{}", FeederError::cli(e.to_string()));
            return ExitCode::from(1);
        }
        Err(e) => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    let paths = frames::resolve_inputs(&config.data_files, cli.dir.as_deref())?;
    let frame_set = frames::load_all(&paths)?;

    let id = discovery::PciId::parse(&config.pci_device)?;
    let address = discovery::find_device(id)?;
    discovery::ensure_enabled(&address)?;

    let bar = BarRegion::map(&address, 0)?;
    let regs = RegisterMap::bind(bar, config.offsets)?;

    let options = FeederOptions {
        repeat_factor: config.repeat_factor,
        ..FeederOptions::default()
    };

    let mut feeder = FrameFeeder::new(regs, frame_set, options)?;
    feeder.run()?;

    Ok(())
}
