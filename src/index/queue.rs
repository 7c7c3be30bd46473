//! Disk-backed work queue with destructive random pop.
//!
//! Decouples discovery order from processing order: paths are keyed by a
//! dense integer index in a rocksdb database and drawn uniformly at random
//! among the remaining keys. Only the 8-byte keys are held in memory; the
//! paths themselves stay on disk until popped. Because each draw is uniform
//! over what remains, an interrupted run has processed an unbiased random
//! sample of the corpus rather than a directory-order prefix.
//!
//! Durability tradeoff: the removal is written with a synced WAL before the
//! path is handed to the caller. A crash between pop and the caller's own
//! commit loses that one in-flight item (completeness), but a popped entry
//! can never be returned twice (correctness). We do not journal the
//! in-flight item; that would buy back completeness at the cost of a second
//! write per pop.

use crate::error::Error;
use rand::Rng;
use rocksdb::{IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct WorkQueue {
    db: DB,
    /// Keys still present in the database.
    live: Vec<u64>,
}

impl WorkQueue {
    /// Persist `paths` into a fresh queue at `path`, destroying any queue
    /// left behind by a previous run first.
    pub fn build(path: &Path, paths: &[PathBuf]) -> Result<Self, Error> {
        if path.exists() {
            debug!("destroying stale work queue at {:?}", path);
            DB::destroy(&Options::default(), path)?;
        }

        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        let db = DB::open(&db_options, path)?;

        let mut batch = WriteBatch::default();
        for (index, file_path) in paths.iter().enumerate() {
            let key = (index as u64).to_be_bytes();
            batch.put(key, file_path.to_string_lossy().as_bytes());
        }
        db.write_opt(batch, &sync_writes())?;

        Ok(WorkQueue {
            db,
            live: (0..paths.len() as u64).collect(),
        })
    }

    /// Reopen a queue database that survived a process restart and
    /// re-enumerate its remaining keys. Entries popped before the restart
    /// are gone for good.
    pub fn resume(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::QueueMissing(path.to_path_buf()));
        }
        let db = DB::open(&Options::default(), path)?;

        let mut live = Vec::new();
        for item in db.iterator(IteratorMode::Start) {
            let (key, _) = item?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&key);
            live.push(u64::from_be_bytes(buf));
        }
        debug!("resumed work queue with {} remaining entries", live.len());

        Ok(WorkQueue { db, live })
    }

    /// Remove a uniformly random remaining entry and return its path, or
    /// `None` once the queue is drained. The removal hits disk before the
    /// path is returned.
    pub fn pop_random(&mut self) -> Result<Option<PathBuf>, Error> {
        while !self.live.is_empty() {
            let pick = rand::thread_rng().gen_range(0..self.live.len());
            let key = self.live.swap_remove(pick).to_be_bytes();

            let value = self.db.get(key)?;
            self.db.delete_opt(key, &sync_writes())?;

            if let Some(bytes) = value {
                let path = PathBuf::from(String::from_utf8_lossy(&bytes).into_owned());
                return Ok(Some(path));
            }
            // Key vanished from disk but was still in the live set; skip it.
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

fn sync_writes() -> WriteOptions {
    let mut write_options = WriteOptions::default();
    write_options.set_sync(true);
    write_options
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn sample_paths(n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| PathBuf::from(format!("/data/file_{:03}.fits", i)))
            .collect()
    }

    #[test]
    fn test_pop_covers_every_path_exactly_once() {
        let dir = tempdir().unwrap();
        let queue_path = dir.path().join("queue");
        let paths = sample_paths(25);

        let mut queue = WorkQueue::build(&queue_path, &paths).unwrap();
        assert_eq!(queue.len(), 25);

        let mut seen = BTreeSet::new();
        while let Some(path) = queue.pop_random().unwrap() {
            assert!(seen.insert(path), "a path was returned twice");
        }

        assert_eq!(seen.len(), 25);
        assert!(queue.is_empty());
        assert_eq!(seen, paths.into_iter().collect::<BTreeSet<_>>());
        // Drained queue stays drained
        assert!(queue.pop_random().unwrap().is_none());
    }

    #[test]
    fn test_build_destroys_previous_queue() {
        let dir = tempdir().unwrap();
        let queue_path = dir.path().join("queue");

        let mut first = WorkQueue::build(&queue_path, &sample_paths(10)).unwrap();
        for _ in 0..10 {
            first.pop_random().unwrap();
        }
        drop(first);

        let queue = WorkQueue::build(&queue_path, &sample_paths(3)).unwrap();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_resume_sees_only_unpopped_entries() {
        let dir = tempdir().unwrap();
        let queue_path = dir.path().join("queue");

        let mut queue = WorkQueue::build(&queue_path, &sample_paths(8)).unwrap();
        let mut popped = BTreeSet::new();
        for _ in 0..5 {
            popped.insert(queue.pop_random().unwrap().unwrap());
        }
        drop(queue);

        let mut resumed = WorkQueue::resume(&queue_path).unwrap();
        assert_eq!(resumed.len(), 3);
        while let Some(path) = resumed.pop_random().unwrap() {
            assert!(!popped.contains(&path), "popped entry came back");
        }
    }

    #[test]
    fn test_resume_missing_queue() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("never_built");
        assert!(matches!(
            WorkQueue::resume(&missing),
            Err(Error::QueueMissing(_))
        ));
    }

    #[test]
    fn test_empty_queue() {
        let dir = tempdir().unwrap();
        let mut queue = WorkQueue::build(&dir.path().join("queue"), &[]).unwrap();
        assert!(queue.is_empty());
        assert!(queue.pop_random().unwrap().is_none());
    }
}
