//! Pending-work detector
//!
//! Diffs each domain directory against its processed ledger to find
//! snapshot files no stat plugin has consumed yet.

use crate::config::Config;
use crate::domain::DomainRegistry;
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the per-domain processed ledger
pub const PROCESSED_LEDGER: &str = "processed.json";

/// Extracts the timestamp from a well-formed snapshot name for `domain`
///
/// A snapshot name is `<YYYYMMDDTHHMMSS>_<domain>.json`. The strict shape
/// check keeps the record file, the processed ledger, and the stats file
/// out of the pending set even though they live in the same directory.
pub fn snapshot_timestamp<'a>(name: &'a str, domain: &str) -> Option<&'a str> {
    let suffix = format!("_{}.json", domain);
    let timestamp = name.strip_suffix(suffix.as_str())?;
    if is_timestamp_key(timestamp) {
        Some(timestamp)
    } else {
        None
    }
}

/// Whether a key is a well-formed `YYYYMMDDTHHMMSS` timestamp
pub fn is_timestamp_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'T'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

/// Whether a key is a well-formed `YYYYMMDD` date
pub fn is_date_key(key: &str) -> bool {
    key.len() == 8 && key.bytes().all(|b| b.is_ascii_digit())
}

/// Reads a domain's processed ledger fresh from disk
///
/// Missing or corrupt ledgers are treated as empty (the files will simply
/// be reprocessed, which merging makes idempotent).
pub fn load_processed(domain_dir: &Path) -> Vec<String> {
    let path = domain_dir.join(PROCESSED_LEDGER);
    match std::fs::read_to_string(&path) {
        Ok(body) => match serde_json::from_str(&body) {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(
                    "Corrupt processed ledger {}: {} (treating as empty)",
                    path.display(),
                    e
                );
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}

/// Computes the pending snapshot files for every registry domain
///
/// The ledger is read fresh per run, never cached. Domains with zero
/// pending files are omitted so they are skipped by dispatch entirely.
pub fn find_pending(config: &Config, registry: &DomainRegistry) -> BTreeMap<String, Vec<String>> {
    tracing::info!("searching {} domains for new files", registry.len());
    let mut pending = BTreeMap::new();

    for record in registry.iter() {
        let domain_dir = config.domain_dir(&record.domain);
        let entries = match std::fs::read_dir(&domain_dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        let seen = load_processed(&domain_dir);
        let mut files: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| snapshot_timestamp(name, &record.domain).is_some())
            .filter(|name| !seen.contains(name))
            .collect();

        if !files.is_empty() {
            files.sort();
            pending.insert(record.domain.clone(), files);
        }
    }

    tracing::info!("{} domains found with pending files", pending.len());
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CrawlerConfig, DispatcherConfig, PathsConfig, UserAgentConfig};
    use crate::domain::DomainRecord;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> Config {
        Config {
            paths: PathsConfig {
                data_path: root.join("data").to_string_lossy().into_owned(),
                domain_path: root.join("data/mf2data").to_string_lossy().into_owned(),
                ledger_file: "domains.json".to_string(),
            },
            crawler: CrawlerConfig {
                request_timeout: 30,
                connect_timeout: 10,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestPulse".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            dispatcher: DispatcherConfig::default(),
            gather: None,
        }
    }

    fn seed_domain(config: &Config, domain: &str, snapshots: &[&str]) {
        let dir = config.domain_dir(domain);
        std::fs::create_dir_all(&dir).unwrap();
        let mut record = DomainRecord::new(domain).unwrap();
        record.store(&config.domain_path()).unwrap();
        for name in snapshots {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
    }

    #[test]
    fn test_snapshot_timestamp_accepts_well_formed_names() {
        assert_eq!(
            snapshot_timestamp("20140926T072253_a.example.json", "a.example"),
            Some("20140926T072253")
        );
    }

    #[test]
    fn test_snapshot_timestamp_rejects_bookkeeping_files() {
        assert!(snapshot_timestamp("a.example.json", "a.example").is_none());
        assert!(snapshot_timestamp("processed.json", "a.example").is_none());
        assert!(snapshot_timestamp("stats_a.example.json", "a.example").is_none());
        // Wrong domain in the suffix
        assert!(snapshot_timestamp("20140926T072253_b.example.json", "a.example").is_none());
        // Malformed timestamp
        assert!(snapshot_timestamp("2014-09-26T07_a.example.json", "a.example").is_none());
    }

    #[test]
    fn test_key_shape_checks() {
        assert!(is_date_key("20140926"));
        assert!(!is_date_key("stats"));
        assert!(!is_date_key("2014092"));
        assert!(is_timestamp_key("20140926T072253"));
        assert!(!is_timestamp_key("20140926T07225x"));
    }

    #[test]
    fn test_find_pending_skips_seen_files() {
        let root = TempDir::new().unwrap();
        let config = test_config(root.path());
        seed_domain(
            &config,
            "a.example",
            &[
                "20140926T072253_a.example.json",
                "20141001T072243_a.example.json",
            ],
        );
        std::fs::write(
            config.domain_dir("a.example").join(PROCESSED_LEDGER),
            r#"["20140926T072253_a.example.json"]"#,
        )
        .unwrap();

        let mut registry = DomainRegistry::new(&config);
        registry.add("a.example").unwrap();

        let pending = find_pending(&config, &registry);
        assert_eq!(
            pending["a.example"],
            vec!["20141001T072243_a.example.json".to_string()]
        );
    }

    #[test]
    fn test_find_pending_omits_fully_processed_domains() {
        let root = TempDir::new().unwrap();
        let config = test_config(root.path());
        seed_domain(&config, "a.example", &["20140926T072253_a.example.json"]);
        std::fs::write(
            config.domain_dir("a.example").join(PROCESSED_LEDGER),
            r#"["20140926T072253_a.example.json"]"#,
        )
        .unwrap();

        let mut registry = DomainRegistry::new(&config);
        registry.add("a.example").unwrap();

        let pending = find_pending(&config, &registry);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_find_pending_corrupt_ledger_treated_as_empty() {
        let root = TempDir::new().unwrap();
        let config = test_config(root.path());
        seed_domain(&config, "a.example", &["20140926T072253_a.example.json"]);
        std::fs::write(
            config.domain_dir("a.example").join(PROCESSED_LEDGER),
            "not json at all",
        )
        .unwrap();

        let mut registry = DomainRegistry::new(&config);
        registry.add("a.example").unwrap();

        let pending = find_pending(&config, &registry);
        assert_eq!(pending["a.example"].len(), 1);
    }

    #[test]
    fn test_find_pending_sorted_output() {
        let root = TempDir::new().unwrap();
        let config = test_config(root.path());
        seed_domain(
            &config,
            "a.example",
            &[
                "20141004T164138_a.example.json",
                "20140926T072253_a.example.json",
            ],
        );

        let mut registry = DomainRegistry::new(&config);
        registry.add("a.example").unwrap();

        let pending = find_pending(&config, &registry);
        assert_eq!(
            pending["a.example"],
            vec![
                "20140926T072253_a.example.json".to_string(),
                "20141004T164138_a.example.json".to_string(),
            ]
        );
    }
}
