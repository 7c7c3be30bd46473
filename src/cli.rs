use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "fitsdex")]
#[command(about = "Index FITS header keyword fingerprints", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory tree and build the keyword fingerprint store
    Index {
        /// Root directory containing FITS files (overrides Config.toml)
        fitsdir: Option<PathBuf>,
        /// Continue an interrupted run from its surviving work queue
        /// instead of rebuilding the store from scratch
        #[arg(long)]
        resume: bool,
    },
    /// Report keyword and fingerprint usage from a finished store
    Report {
        /// Store path (overrides Config.toml)
        store: Option<PathBuf>,
        /// Hide keywords used by fewer than this percentage of files
        #[arg(long, default_value_t = 75.0)]
        min_keyword_perc: f64,
        /// Hide fingerprints used by fewer than this percentage of files
        #[arg(long, default_value_t = 1.0)]
        min_fingerprint_perc: f64,
    },
    /// Print configuration values
    PrintConfig,
}
