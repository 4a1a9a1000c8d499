//! Stats merger
//!
//! Folds a plugin's per-timestamp results into the domain's persistent
//! date-bucketed stats store. Merging only ever adds or overwrites the
//! `(date, plugin)` entries present in the given run; entries from other
//! plugins or other dates are preserved, so re-running a plugin replaces
//! its prior value rather than accumulating.

use crate::domain::write_json_atomic;
use crate::pipeline::dispatcher::PluginResults;
use crate::pipeline::pending::{is_timestamp_key, PROCESSED_LEDGER};
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-domain stats store: date -> plugin name -> metric mapping
pub type StatsStore = BTreeMap<String, BTreeMap<String, Value>>;

/// Path of a domain's stats file inside its directory
pub fn stats_path(domain_dir: &Path, domain: &str) -> PathBuf {
    domain_dir.join(format!("stats_{}.json", domain))
}

/// Loads a domain's stats store, empty when missing or corrupt
pub fn load_stats(domain_dir: &Path, domain: &str) -> StatsStore {
    let path = stats_path(domain_dir, domain);
    match std::fs::read_to_string(&path) {
        Ok(body) => match serde_json::from_str(&body) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(
                    "Corrupt stats file {}: {} (treating as empty)",
                    path.display(),
                    e
                );
                StatsStore::new()
            }
        },
        Err(_) => StatsStore::new(),
    }
}

/// Merges one plugin's results into a stats store in memory
///
/// Each well-formed `YYYYMMDDTHHMMSS` key is bucketed under its date
/// (the portion before `T`); any other key is a schema violation and is
/// ignored with a warning.
pub fn merge_results(stats: &mut StatsStore, plugin: &str, results: &PluginResults) {
    for (timestamp, metrics) in results {
        if !is_timestamp_key(timestamp) {
            tracing::warn!(
                "Ignoring non-timestamp key '{}' in {} results",
                timestamp,
                plugin
            );
            continue;
        }
        let date = timestamp[..8].to_string();
        stats
            .entry(date)
            .or_default()
            .insert(plugin.to_string(), metrics.clone());
    }
}

/// Persists a domain's stats store (atomic replace)
pub fn save_stats(domain_dir: &Path, domain: &str, stats: &StatsStore) -> Result<()> {
    write_json_atomic(&stats_path(domain_dir, domain), stats)
}

/// Appends file names to the domain's processed ledger, skipping names
/// already present (atomic replace)
pub fn mark_processed(domain_dir: &Path, files: &[String]) -> Result<()> {
    let mut seen = crate::pipeline::pending::load_processed(domain_dir);
    for name in files {
        if !seen.contains(name) {
            seen.push(name.clone());
        }
    }
    write_json_atomic(&domain_dir.join(PROCESSED_LEDGER), &seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn results(pairs: &[(&str, Value)]) -> PluginResults {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_merge_buckets_by_date() {
        let mut stats = StatsStore::new();
        merge_results(
            &mut stats,
            "count_hcards.py",
            &results(&[
                ("20140926T072253", json!({"h-card": 1})),
                ("20141004T164138", json!({"h-card": 2})),
            ]),
        );

        assert_eq!(stats["20140926"]["count_hcards.py"], json!({"h-card": 1}));
        assert_eq!(stats["20141004"]["count_hcards.py"], json!({"h-card": 2}));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let run = results(&[("20140926T072253", json!({"h-card": 1}))]);

        let mut stats = StatsStore::new();
        merge_results(&mut stats, "count_hcards.py", &run);
        let first = stats.clone();
        merge_results(&mut stats, "count_hcards.py", &run);

        assert_eq!(stats, first);
    }

    #[test]
    fn test_rerun_overwrites_only_that_plugin() {
        let mut stats = StatsStore::new();
        merge_results(
            &mut stats,
            "count_hcards.py",
            &results(&[("20140926T072253", json!({"h-card": 1}))]),
        );
        merge_results(
            &mut stats,
            "count_links.py",
            &results(&[("20140926T072253", json!({"links": 9}))]),
        );

        // Re-run the first plugin with a new value for the same date
        merge_results(
            &mut stats,
            "count_hcards.py",
            &results(&[("20140926T072253", json!({"h-card": 3}))]),
        );

        assert_eq!(stats["20140926"]["count_hcards.py"], json!({"h-card": 3}));
        assert_eq!(stats["20140926"]["count_links.py"], json!({"links": 9}));
    }

    #[test]
    fn test_merge_ignores_malformed_keys() {
        let mut stats = StatsStore::new();
        merge_results(
            &mut stats,
            "count_hcards.py",
            &results(&[
                ("stats", json!({"bogus": true})),
                ("20140926T072253", json!({"h-card": 1})),
            ]),
        );

        assert_eq!(stats.len(), 1);
        assert!(stats.contains_key("20140926"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut stats = StatsStore::new();
        merge_results(
            &mut stats,
            "count_hcards.py",
            &results(&[("20140926T072253", json!({"h-card": 1}))]),
        );
        save_stats(dir.path(), "a.example", &stats).unwrap();

        let loaded = load_stats(dir.path(), "a.example");
        assert_eq!(loaded, stats);
    }

    #[test]
    fn test_load_corrupt_stats_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(stats_path(dir.path(), "a.example"), "broken").unwrap();
        assert!(load_stats(dir.path(), "a.example").is_empty());
    }

    #[test]
    fn test_mark_processed_appends_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let first = vec!["20140926T072253_a.example.json".to_string()];
        let second = vec![
            "20140926T072253_a.example.json".to_string(),
            "20141004T164138_a.example.json".to_string(),
        ];

        mark_processed(dir.path(), &first).unwrap();
        mark_processed(dir.path(), &second).unwrap();

        let seen = crate::pipeline::pending::load_processed(dir.path());
        assert_eq!(seen, second);
    }
}
