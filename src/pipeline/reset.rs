//! Reset tooling
//!
//! Clears a domain's stats store and processed ledger so every snapshot
//! becomes pending again and the next pipeline run reprocesses it from
//! scratch. Snapshots themselves are never touched.

use crate::config::Config;
use crate::domain::DomainRegistry;
use crate::pipeline::merger::stats_path;
use crate::pipeline::pending::PROCESSED_LEDGER;
use crate::Result;

/// Resets one domain's pipeline state
pub fn reset_domain(config: &Config, domain: &str) -> Result<()> {
    let domain_dir = config.domain_dir(domain);

    for path in [
        stats_path(&domain_dir, domain),
        domain_dir.join(PROCESSED_LEDGER),
    ] {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::info!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Resets every domain in the registry
pub fn reset_all(config: &Config, registry: &DomainRegistry) -> Result<()> {
    for domain in registry.domains() {
        reset_domain(config, domain)?;
    }
    Ok(())
}
