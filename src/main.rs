use anyhow::Context;
use clap::{CommandFactory, Parser};
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::{debug, error};

use fitsdex::cli::{Cli, Commands};
use fitsdex::config::AppConfig;
use fitsdex::{index, logging, report};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Index { fitsdir, resume }) => run_index(fitsdir, resume),
        Some(Commands::Report {
            store,
            min_keyword_perc,
            min_fingerprint_perc,
        }) => run_report(store, min_keyword_perc, min_fingerprint_perc),
        Some(Commands::PrintConfig) => print_config(),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run_index(fitsdir: Option<PathBuf>, resume: bool) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(dir) = fitsdir {
        config.root_path = dir.to_string_lossy().into_owned();
    }
    debug!("config.root_path: {:?}", config.root_path);
    debug!("config.store_path: {:?}", config.store_path);

    index::process(&config, resume).context("indexing run failed")?;
    Ok(())
}

fn run_report(
    store: Option<PathBuf>,
    min_keyword_perc: f64,
    min_fingerprint_perc: f64,
) -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let store_path = store.unwrap_or_else(|| PathBuf::from(&config.store_path));

    report::run(&store_path, min_keyword_perc, min_fingerprint_perc)
        .context("report failed")?;
    Ok(())
}

fn print_config() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    println!("{:#?}", config);
    Ok(())
}
