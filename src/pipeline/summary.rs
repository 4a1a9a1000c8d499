//! Global summarizer
//!
//! Rebuilds `summary.json` from scratch on every run: per-domain stats
//! stores are nested under `domains`, the global date range is folded
//! over every well-formed date key, and the polling counters are
//! recomputed from the registry.

use crate::config::Config;
use crate::domain::write_json_atomic;
use crate::domain::DomainRegistry;
use crate::pipeline::merger::{load_stats, StatsStore};
use crate::pipeline::pending::is_date_key;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-domain aggregate, fully rebuilt each run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSummary {
    /// Number of domains with a readable stats store
    pub domain_count: u64,

    /// Lexicographic minimum over all date keys ("z" when none seen;
    /// `YYYYMMDD` is fixed-width and zero-padded so string comparison is
    /// date comparison)
    pub start_date: String,

    /// Lexicographic maximum over all date keys ("" when none seen)
    pub end_date: String,

    /// Polled domains whose last status was outside the 2xx range
    pub error_polling: u64,

    /// Polled domains whose last status was in the 2xx range
    pub good_polling: u64,

    /// Domains whose last fetch extracted at least one microformats item
    pub mf_found: u64,

    /// Domains excluded by owner request
    pub excluded: u64,

    /// Every domain's full stats store
    pub domains: BTreeMap<String, StatsStore>,
}

impl GlobalSummary {
    fn empty() -> Self {
        Self {
            domain_count: 0,
            start_date: "z".to_string(),
            end_date: String::new(),
            error_polling: 0,
            good_polling: 0,
            mf_found: 0,
            excluded: 0,
            domains: BTreeMap::new(),
        }
    }
}

/// Builds the global summary across every registry domain
///
/// Domains whose stats file is missing or unreadable are skipped for the
/// aggregate (not fatal); their record still feeds the polling counters.
pub fn summarize(config: &Config, registry: &DomainRegistry) -> GlobalSummary {
    let mut summary = GlobalSummary::empty();

    for record in registry.iter() {
        if record.excluded {
            summary.excluded += 1;
        }
        if record.polled.is_some() {
            if (200..300).contains(&record.status) {
                summary.good_polling += 1;
            } else {
                summary.error_polling += 1;
            }
        }
        if record.has_microformats() {
            summary.mf_found += 1;
        }

        let domain_dir = config.domain_dir(&record.domain);
        if !crate::pipeline::merger::stats_path(&domain_dir, &record.domain).exists() {
            continue;
        }

        let stats = load_stats(&domain_dir, &record.domain);
        if stats.is_empty() {
            tracing::warn!("Skipping {}: empty or unreadable stats store", record.domain);
            continue;
        }

        summary.domain_count += 1;
        for key in stats.keys() {
            if !is_date_key(key) {
                tracing::warn!("Ignoring non-date key '{}' in {} stats", key, record.domain);
                continue;
            }
            if key.as_str() < summary.start_date.as_str() {
                summary.start_date = key.clone();
            }
            if key.as_str() > summary.end_date.as_str() {
                summary.end_date = key.clone();
            }
        }

        summary.domains.insert(record.domain.clone(), stats);
    }

    summary
}

/// Writes the summary document to its configured path (atomic replace)
pub fn write_summary(config: &Config, summary: &GlobalSummary) -> Result<()> {
    write_json_atomic(&config.summary_path(), summary)
}
