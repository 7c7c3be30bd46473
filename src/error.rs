use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Per-file extraction problems are not represented here;
/// they are swallowed into the rejection list by the driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error("directory walk failed: {0}")]
    Discovery(#[from] walkdir::Error),

    #[error("store error: {0}")]
    Db(#[from] rocksdb::Error),

    #[error("value encoding failed: {0}")]
    Codec(#[from] bincode::Error),

    #[error("store already exists at {0:?}; refusing to clobber it")]
    StoreExists(PathBuf),

    #[error("work queue not found at {0:?}")]
    QueueMissing(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
