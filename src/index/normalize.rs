//! Signature normalization: raw keyword list -> canonical [`Signature`].

use crate::model::Signature;
use std::collections::BTreeSet;

/// Keywords that may legitimately repeat within a single file; their
/// presence carries no discriminating information, so they never make it
/// into a signature. The empty string covers blank cards.
const EXCLUDED_KEYWORDS: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// Collapse a raw keyword list into a duplicate-free, order-independent
/// signature. An empty result is valid and signals "rejected" to the caller.
pub fn normalize(raw_keywords: &[String]) -> Signature {
    let set: BTreeSet<String> = raw_keywords
        .iter()
        .filter(|kw| !EXCLUDED_KEYWORDS.contains(&kw.as_str()))
        .cloned()
        .collect();
    Signature::from_set(set)
}
