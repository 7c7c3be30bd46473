//! Read-only reports over a finished store, mirroring the two queries the
//! index exists to answer: how widely is each keyword used, and which
//! keyword-set fingerprints dominate the corpus.

use crate::error::Error;
use crate::store::KwStore;
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

pub fn run(store_path: &Path, min_keyword_perc: f64, min_fingerprint_perc: f64) -> Result<(), Error> {
    let store = KwStore::open(store_path)?;
    keyword_report(&store, min_keyword_perc)?;
    println!();
    fingerprint_report(&store, min_fingerprint_perc)?;
    Ok(())
}

/// Percentage of files whose signature contains each keyword, descending,
/// cut off below `min_perc`.
pub fn keyword_report(store: &KwStore, min_perc: f64) -> Result<(), Error> {
    println!(
        "{}",
        format!(
            "Keyword use by percentage of files using. (min perc={})",
            min_perc
        )
        .bold()
    );

    let total_files = store.file_count()?;
    println!("Total file count: {}", total_files);
    if total_files == 0 {
        return Ok(());
    }

    let mut counts = store.keyword_counts()?;
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (keyword, count) in counts {
        let perc = (count as f64 / total_files as f64) * 100.0;
        if perc < min_perc {
            break;
        }
        println!("{:12} {:.1}%", keyword, perc);
    }
    Ok(())
}

/// Per-fingerprint share of files, descending, cut off below `min_perc`;
/// then the keyword membership of the most used fingerprint.
pub fn fingerprint_report(store: &KwStore, min_perc: f64) -> Result<(), Error> {
    println!(
        "{}",
        format!(
            "FingerPrint use by percentage of files using. (min perc={})",
            min_perc
        )
        .bold()
    );

    let records = store.file_records()?;
    let total_files = records.len() as f64;
    if records.is_empty() {
        println!("Store is empty.");
        return Ok(());
    }

    let mut usage: HashMap<String, u64> = HashMap::new();
    for (_, fpid) in &records {
        *usage.entry(fpid.clone()).or_insert(0) += 1;
    }
    let mut usage: Vec<(String, u64)> = usage.into_iter().collect();
    usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (fpid, count) in &usage {
        let perc = (*count as f64 / total_files) * 100.0;
        if perc < min_perc {
            break;
        }
        println!("{:12} {:.1}%", fpid, perc);
    }

    let (best_fpid, best_count) = &usage[0];
    let best_perc = (*best_count as f64 / total_files) * 100.0;
    println!(
        "{}",
        format!("Keywords in most used fingerprint ({}, {:.1}%):", best_fpid, best_perc).bold()
    );
    for keyword in store.members_of(best_fpid)? {
        println!("\t{}", keyword);
    }
    Ok(())
}
