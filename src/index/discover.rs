//! Recursive discovery of candidate FITS files.

use crate::error::Error;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions recognized as FITS files (`.fz` is the fpack-compressed
/// variant; its headers are still plain FITS blocks).
const FITS_EXTENSIONS: [&str; 2] = ["fits", "fz"];

/// Walk `root` and collect every file with a recognized extension.
///
/// The returned collection is deduplicated; the caller imposes processing
/// order. Any unreadable subtree is fatal: a partial walk cannot guarantee
/// a complete index.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut found = BTreeSet::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_fits_extension(entry.path()) {
            found.insert(entry.path().to_path_buf());
        }
    }

    debug!("discovered {} fits files under {:?}", found.len(), root);
    Ok(found.into_iter().collect())
}

fn has_fits_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => FITS_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}
