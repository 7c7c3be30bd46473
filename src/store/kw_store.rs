//! The durable keyword/fingerprint store.
//!
//! Three rocksdb column families mirror the three output relations:
//!
//! - `kwcount`:     keyword -> cumulative file count (bincode u64)
//! - `fingerprint`: `<fpid>\x1f<keyword>` -> (), the membership relation
//! - `fpfile`:      file path -> fpid
//!
//! All writes for one processed file are staged into a pending `WriteBatch`
//! and land atomically on `commit()` with a synced WAL. A crash before
//! commit leaves the store exactly as of the previous commit.

use crate::error::Error;
use crate::model::Fingerprint;
use rocksdb::{
    ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB,
};
use std::path::Path;
use tracing::debug;

const CF_KWCOUNT: &str = "kwcount";
const CF_FINGERPRINT: &str = "fingerprint";
const CF_FPFILE: &str = "fpfile";
/// All column families, including rocksdb's mandatory default one; every
/// open must list the full set.
const CF_NAMES: [&str; 4] = ["default", CF_KWCOUNT, CF_FINGERPRINT, CF_FPFILE];

/// Separator between fpid and keyword in membership keys. A prefix scan on
/// `<fpid>\x1f` yields the membership set of one fingerprint.
const MEMBER_SEP: u8 = 0x1f;

pub struct KwStore {
    db: DB,
    pending: WriteBatch,
}

impl KwStore {
    /// Create a fresh store. Fails loudly if anything already exists at
    /// `path`; callers wanting a clean run go through [`KwStore::destroy`]
    /// first.
    pub fn init(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            return Err(Error::StoreExists(path.to_path_buf()));
        }

        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.create_missing_column_families(true);

        let descriptors = CF_NAMES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&db_options, path, descriptors)?;
        debug!("initialized store at {:?}", path);

        Ok(KwStore {
            db,
            pending: WriteBatch::default(),
        })
    }

    /// Open an existing store for reading (reports, verification).
    pub fn open(path: &Path) -> Result<Self, Error> {
        let descriptors = CF_NAMES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&Options::default(), path, descriptors)?;

        Ok(KwStore {
            db,
            pending: WriteBatch::default(),
        })
    }

    /// Remove a store left behind by a previous run. A no-op when nothing
    /// exists at `path`.
    pub fn destroy(path: &Path) -> Result<(), Error> {
        if path.exists() {
            debug!("destroying previous store at {:?}", path);
            DB::destroy(&Options::default(), path)?;
        }
        Ok(())
    }

    // ── Writes (staged until commit) ─────────────────────────────────────

    /// Stage the current cumulative count for `keyword`. Replace-by-key, so
    /// re-staging the same keyword is safe.
    pub fn upsert_keyword_count(&mut self, keyword: &str, new_total: u64) -> Result<(), Error> {
        let value = bincode::serialize(&new_total)?;
        let cf = self.db.cf_handle(CF_KWCOUNT).expect("kwcount cf missing");
        self.pending.put_cf(cf, keyword.as_bytes(), value);
        Ok(())
    }

    /// Stage a `(keyword, fingerprint)` membership pair.
    pub fn upsert_membership(&mut self, keyword: &str, fingerprint: &Fingerprint) {
        let cf = self
            .db
            .cf_handle(CF_FINGERPRINT)
            .expect("fingerprint cf missing");
        self.pending
            .put_cf(cf, member_key(fingerprint.as_str(), keyword), b"");
    }

    /// Stage the fingerprint assignment for one file. The path is the
    /// natural key; re-processing a file replaces its record.
    pub fn upsert_file_record(&mut self, file_path: &str, fingerprint: &Fingerprint) {
        let cf = self.db.cf_handle(CF_FPFILE).expect("fpfile cf missing");
        self.pending
            .put_cf(cf, file_path.as_bytes(), fingerprint.as_str().as_bytes());
    }

    /// Atomically land everything staged since the last commit, with a
    /// synced WAL.
    pub fn commit(&mut self) -> Result<(), Error> {
        let batch = std::mem::take(&mut self.pending);
        let mut write_options = WriteOptions::default();
        write_options.set_sync(true);
        self.db.write_opt(batch, &write_options)?;
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// All `(keyword, count)` rows.
    pub fn keyword_counts(&self) -> Result<Vec<(String, u64)>, Error> {
        let cf = self.db.cf_handle(CF_KWCOUNT).expect("kwcount cf missing");
        let mut counts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let keyword = String::from_utf8_lossy(&key).into_owned();
            let count: u64 = bincode::deserialize(&value)?;
            counts.push((keyword, count));
        }
        Ok(counts)
    }

    /// All `(file path, fpid)` rows.
    pub fn file_records(&self) -> Result<Vec<(String, String)>, Error> {
        let cf = self.db.cf_handle(CF_FPFILE).expect("fpfile cf missing");
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            records.push((
                String::from_utf8_lossy(&key).into_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            ));
        }
        Ok(records)
    }

    /// Number of successfully processed files.
    pub fn file_count(&self) -> Result<u64, Error> {
        let cf = self.db.cf_handle(CF_FPFILE).expect("fpfile cf missing");
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// All `(fpid, keyword)` membership pairs across every fingerprint.
    pub fn memberships(&self) -> Result<Vec<(String, String)>, Error> {
        let cf = self
            .db
            .cf_handle(CF_FINGERPRINT)
            .expect("fingerprint cf missing");
        let mut pairs = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            if let Some(pos) = key.iter().position(|b| *b == MEMBER_SEP) {
                pairs.push((
                    String::from_utf8_lossy(&key[..pos]).into_owned(),
                    String::from_utf8_lossy(&key[pos + 1..]).into_owned(),
                ));
            }
        }
        Ok(pairs)
    }

    /// The keyword membership of one fingerprint, in sorted order.
    pub fn members_of(&self, fpid: &str) -> Result<Vec<String>, Error> {
        let cf = self
            .db
            .cf_handle(CF_FINGERPRINT)
            .expect("fingerprint cf missing");
        let prefix = member_key(fpid, "");

        let mut members = Vec::new();
        let mode = IteratorMode::From(prefix.as_slice(), Direction::Forward);
        for item in self.db.iterator_cf(cf, mode) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            members.push(String::from_utf8_lossy(&key[prefix.len()..]).into_owned());
        }
        Ok(members)
    }
}

fn member_key(fpid: &str, keyword: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(fpid.len() + 1 + keyword.len());
    key.extend_from_slice(fpid.as_bytes());
    key.push(MEMBER_SEP);
    key.extend_from_slice(keyword.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fingerprint;
    use tempfile::tempdir;

    fn fp(seq: u64) -> Fingerprint {
        Fingerprint::from_seq(seq)
    }

    #[test]
    fn test_init_refuses_existing_path() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store");

        let store = KwStore::init(&store_path).unwrap();
        drop(store);

        assert!(matches!(
            KwStore::init(&store_path),
            Err(Error::StoreExists(_))
        ));

        // destroy-then-init is the clean-run path
        KwStore::destroy(&store_path).unwrap();
        KwStore::init(&store_path).unwrap();
    }

    #[test]
    fn test_commit_roundtrip() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store");

        let mut store = KwStore::init(&store_path).unwrap();
        store.upsert_keyword_count("NAXIS", 1).unwrap();
        store.upsert_keyword_count("BITPIX", 1).unwrap();
        store.upsert_membership("NAXIS", &fp(0));
        store.upsert_membership("BITPIX", &fp(0));
        store.upsert_file_record("/data/a.fits", &fp(0));
        store.commit().unwrap();
        drop(store);

        let store = KwStore::open(&store_path).unwrap();
        let mut counts = store.keyword_counts().unwrap();
        counts.sort();
        assert_eq!(
            counts,
            vec![("BITPIX".to_string(), 1), ("NAXIS".to_string(), 1)]
        );
        assert_eq!(
            store.file_records().unwrap(),
            vec![("/data/a.fits".to_string(), "fp-000000".to_string())]
        );
        assert_eq!(store.members_of("fp-000000").unwrap(), ["BITPIX", "NAXIS"]);
        assert_eq!(
            store.memberships().unwrap(),
            vec![
                ("fp-000000".to_string(), "BITPIX".to_string()),
                ("fp-000000".to_string(), "NAXIS".to_string()),
            ]
        );
        assert_eq!(store.file_count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store");

        let mut store = KwStore::init(&store_path).unwrap();
        store.upsert_keyword_count("NAXIS", 1).unwrap();
        store.commit().unwrap();
        store.upsert_keyword_count("NAXIS", 2).unwrap();
        store.upsert_file_record("/data/a.fits", &fp(0));
        store.commit().unwrap();
        store.upsert_file_record("/data/a.fits", &fp(1));
        store.commit().unwrap();

        assert_eq!(
            store.keyword_counts().unwrap(),
            vec![("NAXIS".to_string(), 2)]
        );
        assert_eq!(
            store.file_records().unwrap(),
            vec![("/data/a.fits".to_string(), "fp-000001".to_string())]
        );
    }

    #[test]
    fn test_uncommitted_writes_leave_no_trace() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store");

        let mut store = KwStore::init(&store_path).unwrap();
        store.upsert_keyword_count("NAXIS", 1).unwrap();
        store.upsert_membership("NAXIS", &fp(0));
        store.upsert_file_record("/data/a.fits", &fp(0));
        store.commit().unwrap();

        // Second file staged but never committed ("crash" before commit)
        store.upsert_keyword_count("NAXIS", 2).unwrap();
        store.upsert_keyword_count("FILTER", 1).unwrap();
        store.upsert_membership("FILTER", &fp(1));
        store.upsert_file_record("/data/b.fits", &fp(1));
        drop(store);

        let store = KwStore::open(&store_path).unwrap();
        let mut counts = store.keyword_counts().unwrap();
        counts.sort();
        assert_eq!(counts, vec![("NAXIS".to_string(), 1)]);
        assert_eq!(store.file_count().unwrap(), 1);
        assert_eq!(
            store.file_records().unwrap(),
            vec![("/data/a.fits".to_string(), "fp-000000".to_string())]
        );
        assert!(store.members_of("fp-000001").unwrap().is_empty());
    }

    #[test]
    fn test_members_of_does_not_bleed_across_fingerprints() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("store");

        let mut store = KwStore::init(&store_path).unwrap();
        store.upsert_membership("NAXIS", &fp(0));
        store.upsert_membership("BITPIX", &fp(0));
        store.upsert_membership("EXPTIME", &fp(1));
        store.commit().unwrap();

        assert_eq!(store.members_of("fp-000000").unwrap(), ["BITPIX", "NAXIS"]);
        assert_eq!(store.members_of("fp-000001").unwrap(), ["EXPTIME"]);
        assert!(store.members_of("fp-000002").unwrap().is_empty());
    }
}
