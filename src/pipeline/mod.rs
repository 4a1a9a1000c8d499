//! Stats pipeline orchestration
//!
//! Runs the batch stages in sequence: load the registry, detect pending
//! snapshots, dispatch every `(domain, plugin)` pair, merge results, and
//! rebuild the global summary. Failures are isolated per pair and the
//! orchestrator logs and continues; core stage logic returns `Result`
//! and never logs-and-swallows on its own.

pub mod dispatcher;
pub mod merger;
pub mod pending;
pub mod reset;
pub mod summary;

pub use dispatcher::{discover_plugins, run_plugin, PluginResults};
pub use merger::{load_stats, merge_results, save_stats, StatsStore};
pub use pending::find_pending;
pub use reset::{reset_all, reset_domain};
pub use summary::{summarize, write_summary, GlobalSummary};

use crate::config::Config;
use crate::domain::DomainRegistry;
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with the signal handler
///
/// Checked between `(domain, plugin)` pairs: the in-flight pair always
/// runs to completion so stats and ledger files never tear, then the run
/// stops before the summarizer.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome counts for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Domains whose every plugin succeeded and whose ledger was updated
    pub domains_processed: usize,
    /// `(domain, plugin)` pairs merged successfully
    pub pairs_merged: usize,
    /// `(domain, plugin)` pairs that failed dispatch or merge
    pub pairs_failed: usize,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

/// Runs the full stats pipeline once
///
/// A domain's snapshot files enter the processed ledger only when every
/// registered plugin produced a merged result for them in this run;
/// otherwise they stay pending and the next run retries them
/// (at-least-once, made safe by idempotent merging).
pub async fn run_pipeline(config: &Config, cancel: &CancelFlag) -> Result<PipelineReport> {
    let registry = DomainRegistry::load(config);
    tracing::info!("{} domains loaded from datastore", registry.len());

    let pending = find_pending(config, &registry);
    let plugins = discover_plugins(&config.scripts_path())?;
    tracing::info!(
        "calling {} plugins for {} domains",
        plugins.len(),
        pending.len()
    );

    let mut report = PipelineReport::default();

    'domains: for (domain, files) in &pending {
        let domain_dir = config.domain_dir(domain);
        let mut all_merged = !plugins.is_empty();

        for plugin in &plugins {
            if cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping before {}", domain);
                report.cancelled = true;
                break 'domains;
            }

            match run_plugin(config, domain, plugin, files).await {
                Ok(results) => {
                    let mut stats = load_stats(&domain_dir, domain);
                    merge_results(&mut stats, plugin, &results);
                    match save_stats(&domain_dir, domain, &stats) {
                        Ok(()) => report.pairs_merged += 1,
                        Err(e) => {
                            tracing::warn!("{}: failed to save stats: {}", domain, e);
                            report.pairs_failed += 1;
                            all_merged = false;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("{}: {}", domain, e);
                    report.pairs_failed += 1;
                    all_merged = false;
                }
            }
        }

        if all_merged {
            merger::mark_processed(&domain_dir, files)?;
            report.domains_processed += 1;
        }
    }

    if report.cancelled {
        tracing::info!("Run cancelled; skipping summary rebuild");
        return Ok(report);
    }

    let global = summarize(config, &registry);
    write_summary(config, &global)?;
    tracing::info!(
        "summary: {} domains, {} - {}",
        global.domain_count,
        global.start_date,
        global.end_date
    );

    Ok(report)
}
