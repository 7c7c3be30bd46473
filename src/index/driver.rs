//! The indexing driver: DISCOVERING -> QUEUEING -> PROCESSING -> DRAINED.
//!
//! One file is fully processed (extract -> normalize -> fingerprint ->
//! persist -> commit) before the next is drawn. Per-file failures are
//! swallowed into the rejection list; only discovery and store failures
//! abort the run. Because every commit is per-file-atomic, killing the
//! process at any point leaves a valid, queryable store covering every
//! file committed so far.

use crate::config::AppConfig;
use crate::error::Error;
use crate::extract::extract_keywords;
use crate::index::discover::discover;
use crate::index::normalize::normalize;
use crate::index::queue::WorkQueue;
use crate::index::registry::FingerprintRegistry;
use crate::index::stats::{IndexStats, StatsTimer};
use crate::model::{Fingerprint, RunReport, Signature};
use crate::store::KwStore;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Single-use engine context for one run. Owns the registry, the running
/// counters, and the rejection list; nothing here is global.
pub struct Indexer {
    root: PathBuf,
    store_path: PathBuf,
    queue_path: PathBuf,
    progress_interval: u64,

    registry: FingerprintRegistry,
    keyword_counts: HashMap<String, u64>,
    fingerprint_counts: HashMap<Fingerprint, u64>,
    rejected: Vec<PathBuf>,
    processed: u64,

    stats: IndexStats,
}

impl Indexer {
    pub fn new(config: &AppConfig) -> Self {
        Indexer {
            root: PathBuf::from(&config.root_path),
            store_path: PathBuf::from(&config.store_path),
            queue_path: PathBuf::from(&config.queue_path),
            progress_interval: config.progress_interval.max(1),
            registry: FingerprintRegistry::new(),
            keyword_counts: HashMap::new(),
            fingerprint_counts: HashMap::new(),
            rejected: Vec::new(),
            processed: 0,
            stats: IndexStats {
                root_path: config.root_path.clone(),
                ..Default::default()
            },
        }
    }

    /// Run the full state machine to completion. Consumes the driver; a
    /// fresh one is needed for the next run.
    pub fn run(mut self) -> Result<(RunReport, IndexStats), Error> {
        self.stats.run_start_time = Some(std::time::SystemTime::now());

        // DISCOVERING
        self.stats.discover_timer = StatsTimer::start();
        let paths = discover(&self.root)?;
        self.stats.discover_timer.finish();
        self.stats.discovered_count = paths.len();
        info!("discovered {} fits files under {:?}", paths.len(), self.root);

        // QUEUEING
        self.stats.queue_timer = StatsTimer::start();
        KwStore::destroy(&self.store_path)?;
        let store = KwStore::init(&self.store_path)?;
        let queue = WorkQueue::build(&self.queue_path, &paths)?;
        self.stats.queue_timer.finish();
        info!("queued {} files at {:?}", queue.len(), self.queue_path);

        self.drain(store, queue)
    }

    /// Pick up an interrupted run: reopen the surviving queue and store,
    /// reload the counters and the registry from what was already
    /// committed, and keep draining. Entries popped before the restart are
    /// not reprocessed; the returned totals cover the whole run, both
    /// halves.
    pub fn resume(mut self) -> Result<(RunReport, IndexStats), Error> {
        self.stats.run_start_time = Some(std::time::SystemTime::now());

        let queue = WorkQueue::resume(&self.queue_path)?;
        let store = KwStore::open(&self.store_path)?;
        self.restore_from(&store)?;
        self.stats.discovered_count = queue.len() + self.processed as usize;
        info!(
            "resuming: {} files already committed, {} still queued",
            self.processed,
            queue.len()
        );

        self.drain(store, queue)
    }

    /// Reload in-memory state from a store left by an interrupted run, so
    /// that signatures committed before the restart keep their fingerprints
    /// and keyword counts stay cumulative.
    fn restore_from(&mut self, store: &KwStore) -> Result<(), Error> {
        for (keyword, count) in store.keyword_counts()? {
            self.keyword_counts.insert(keyword, count);
        }

        let mut members: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (fpid, keyword) in store.memberships()? {
            members.entry(fpid).or_default().insert(keyword);
        }
        for (fpid, keywords) in members {
            self.registry
                .restore(Signature::from_set(keywords), Fingerprint::from_raw(fpid));
        }

        for (_, fpid) in store.file_records()? {
            *self
                .fingerprint_counts
                .entry(Fingerprint::from_raw(fpid))
                .or_insert(0) += 1;
            self.processed += 1;
        }
        Ok(())
    }

    fn drain(
        mut self,
        mut store: KwStore,
        mut queue: WorkQueue,
    ) -> Result<(RunReport, IndexStats), Error> {
        // PROCESSING
        self.stats.process_timer = StatsTimer::start();
        while let Some(path) = queue.pop_random()? {
            self.process_one(&mut store, &path)?;
        }
        self.stats.process_timer.finish();

        // DRAINED
        if let Some((fingerprint, count)) = self.fingerprint_counts.iter().max_by_key(|(_, c)| **c)
        {
            info!("most common fingerprint: {} ({} files)", fingerprint, count);
        }
        self.stats.processed_count = self.processed as usize;
        self.stats.rejected_count = self.rejected.len();
        self.stats.distinct_fingerprint_count = self.registry.len();

        let report = RunReport {
            processed: self.processed,
            distinct_fingerprints: self.registry.len(),
            rejected: self.rejected,
        };
        Ok((report, self.stats))
    }

    fn process_one(&mut self, store: &mut KwStore, path: &Path) -> Result<(), Error> {
        let raw_keywords = match extract_keywords(path) {
            Ok(keywords) => keywords,
            Err(err) => {
                warn!("extraction failed for {:?}: {}", path, err);
                Vec::new()
            }
        };

        let signature = normalize(&raw_keywords);
        if signature.is_empty() {
            debug!("rejecting {:?}: empty signature", path);
            self.rejected.push(path.to_path_buf());
            return Ok(());
        }

        let fingerprint = self.registry.assign(signature.clone());
        *self
            .fingerprint_counts
            .entry(fingerprint.clone())
            .or_insert(0) += 1;

        for keyword in signature.keywords() {
            let total = self.keyword_counts.entry(keyword.clone()).or_insert(0);
            *total += 1;
            store.upsert_keyword_count(keyword, *total)?;
            store.upsert_membership(keyword, &fingerprint);
        }
        store.upsert_file_record(&path.to_string_lossy(), &fingerprint);
        store.commit()?;

        self.processed += 1;
        if self.processed % self.progress_interval == 0 {
            info!("# processed {} files", self.processed);
        }
        Ok(())
    }
}
