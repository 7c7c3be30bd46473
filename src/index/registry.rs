//! Deduplicating signature -> fingerprint registry.

use crate::model::{Fingerprint, Signature};
use std::collections::HashMap;

/// Assigns stable identifiers to distinct signatures in first-seen order.
///
/// Purely in-memory; lifetime is one run. Persisting an assignment is the
/// driver's job.
#[derive(Debug, Default)]
pub struct FingerprintRegistry {
    by_signature: HashMap<Signature, Fingerprint>,
    next_seq: u64,
}

impl FingerprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the fingerprint for `signature`, minting a new one with the
    /// next sequence number the first time a signature is seen.
    pub fn assign(&mut self, signature: Signature) -> Fingerprint {
        if let Some(existing) = self.by_signature.get(&signature) {
            return existing.clone();
        }
        let fingerprint = Fingerprint::from_seq(self.next_seq);
        self.next_seq += 1;
        self.by_signature.insert(signature, fingerprint.clone());
        fingerprint
    }

    /// Re-register a signature under a fingerprint recovered from the
    /// store, keeping the next ordinal clear of everything restored.
    pub(crate) fn restore(&mut self, signature: Signature, fingerprint: Fingerprint) {
        if let Some(seq) = fingerprint.seq() {
            self.next_seq = self.next_seq.max(seq + 1);
        }
        self.by_signature.insert(signature, fingerprint);
    }

    pub fn lookup(&self, signature: &Signature) -> Option<&Fingerprint> {
        self.by_signature.get(signature)
    }

    /// Number of distinct signatures observed so far.
    pub fn len(&self) -> usize {
        self.by_signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::normalize::normalize;

    fn sig(list: &[&str]) -> Signature {
        normalize(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_equal_signatures_share_a_fingerprint() {
        let mut registry = FingerprintRegistry::new();
        let first = registry.assign(sig(&["NAXIS", "BITPIX"]));
        let second = registry.assign(sig(&["BITPIX", "NAXIS"]));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_signature_gets_fresh_ordinal() {
        let mut registry = FingerprintRegistry::new();
        let a = registry.assign(sig(&["NAXIS"]));
        let b = registry.assign(sig(&["BITPIX"]));
        let c = registry.assign(sig(&["NAXIS", "BITPIX"]));
        assert_eq!(a.as_str(), "fp-000000");
        assert_eq!(b.as_str(), "fp-000001");
        assert_eq!(c.as_str(), "fp-000002");
    }

    #[test]
    fn test_restore_reuses_identity_and_advances_ordinal() {
        let mut registry = FingerprintRegistry::new();
        registry.restore(sig(&["NAXIS"]), Fingerprint::from_seq(3));

        // A restored signature keeps its old identity
        assert_eq!(registry.assign(sig(&["NAXIS"])).as_str(), "fp-000003");
        // A brand new signature mints past everything restored
        assert_eq!(registry.assign(sig(&["BITPIX"])).as_str(), "fp-000004");
    }

    #[test]
    fn test_lookup_does_not_mint() {
        let mut registry = FingerprintRegistry::new();
        assert!(registry.lookup(&sig(&["NAXIS"])).is_none());
        let minted = registry.assign(sig(&["NAXIS"]));
        assert_eq!(registry.lookup(&sig(&["NAXIS"])), Some(&minted));
        assert_eq!(registry.len(), 1);
    }
}
