pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod logging;
pub mod model;
pub mod report;
pub mod store;

pub use error::Error;
pub use model::{Fingerprint, RunReport, Signature};
