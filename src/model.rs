use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// The canonical, duplicate-free, unordered set of header keywords derived
/// from one FITS file. Two files with equal signatures are structurally
/// identical for indexing purposes.
///
/// Internally the keywords are kept sorted so that `Signature` is usable as
/// a hash-map key: insertion order never affects equality or hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    keywords: Vec<String>,
}

impl Signature {
    pub fn from_set(set: BTreeSet<String>) -> Self {
        Signature {
            keywords: set.into_iter().collect(),
        }
    }

    /// Keywords in sorted order.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// An empty signature marks the file as rejected.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }
}

/// Stable per-run identifier for a distinct [`Signature`], of the form
/// `fp-<seq>` where `<seq>` is the zero-padded first-seen ordinal.
///
/// Processing order is randomized, so successive runs over the same corpus
/// may label the same logical signature differently. Identity is only
/// stable within one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_seq(seq: u64) -> Self {
        Fingerprint(format!("fp-{:06}", seq))
    }

    /// Rebuild a fingerprint from its stored string form.
    pub(crate) fn from_raw(raw: String) -> Self {
        Fingerprint(raw)
    }

    /// The ordinal encoded in the identifier, when well-formed.
    pub(crate) fn seq(&self) -> Option<u64> {
        self.0.strip_prefix("fp-")?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a finished run hands back to the caller: totals plus the rejection
/// list. Rejections live only here, never in the store.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub processed: u64,
    pub distinct_fingerprints: usize,
    pub rejected: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_equality_ignores_build_order() {
        let a: BTreeSet<String> = ["NAXIS", "BITPIX", "EXPTIME"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let b: BTreeSet<String> = ["EXPTIME", "NAXIS", "BITPIX"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(Signature::from_set(a), Signature::from_set(b));
    }

    #[test]
    fn test_fingerprint_format() {
        assert_eq!(Fingerprint::from_seq(0).as_str(), "fp-000000");
        assert_eq!(Fingerprint::from_seq(42).as_str(), "fp-000042");
    }
}
