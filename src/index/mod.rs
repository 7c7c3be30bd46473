pub mod discover;
pub mod driver;
pub mod normalize;
pub mod queue;
pub mod registry;
pub mod stats;

use crate::config::AppConfig;
use crate::error::Error;
use driver::Indexer;
use tracing::{info, warn};

/// Run an indexing pass and emit the end-of-run summary: stats table, CSV
/// row, and the complete rejection list. With `resume` set, continue an
/// interrupted run from its surviving work queue instead of starting over.
pub fn process(config: &AppConfig, resume: bool) -> Result<(), Error> {
    let indexer = Indexer::new(config);
    let (report, stats) = if resume {
        indexer.resume()?
    } else {
        indexer.run()?
    };

    stats.print();
    if let Some(csv_path) = &config.stats_csv_path {
        if let Err(err) = stats.write_csv(csv_path) {
            warn!("could not write stats csv {:?}: {}", csv_path, err);
        }
    }

    info!(
        "drained: {} files processed, {} distinct fingerprints, {} rejected",
        report.processed,
        report.distinct_fingerprints,
        report.rejected.len()
    );
    for path in &report.rejected {
        println!("rejected: {}", path.display());
    }
    Ok(())
}
