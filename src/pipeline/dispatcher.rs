//! Plugin dispatcher
//!
//! Runs each stat-extraction plugin against a domain's pending snapshots
//! in a freshly-allocated workspace. The plugin contract is four
//! positional arguments:
//!
//! ```text
//! <plugin> <domain> <workdir> <manifest.json> <result.json>
//! ```
//!
//! The dispatcher copies every pending snapshot into the workdir and
//! writes the manifest (a JSON array of the pending file names) before
//! invocation. The plugin's sole observed side effect is the result
//! file: a mapping from raw snapshot timestamp to a metric mapping.
//! Non-zero exit, spawn failure, timeout, or a missing/unparseable
//! result file is a dispatch failure for that `(domain, plugin)` pair
//! only; the files stay pending and are retried on the next run.

use crate::config::Config;
use crate::{PulseError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Parsed plugin output: raw snapshot timestamp to metric mapping
pub type PluginResults = BTreeMap<String, Value>;

/// Lists the registered plugins (executable files in the scripts
/// directory), sorted by name for deterministic dispatch order
pub fn discover_plugins(scripts_path: &Path) -> Result<Vec<String>> {
    let mut plugins: Vec<String> = std::fs::read_dir(scripts_path)?
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    plugins.sort();
    Ok(plugins)
}

/// Runs one plugin over one domain's pending files in a fresh workspace
///
/// # Arguments
///
/// * `config` - Pipeline configuration (scripts path, plugin timeout)
/// * `domain` - The domain being processed
/// * `plugin` - Plugin file name inside the scripts directory
/// * `pending` - Ordered pending snapshot file names
///
/// # Returns
///
/// * `Ok(PluginResults)` - Parsed result mapping, ready for the merger
/// * `Err(PulseError)` - Dispatch failure; nothing was merged and the
///   processed ledger must not be updated
pub async fn run_plugin(
    config: &Config,
    domain: &str,
    plugin: &str,
    pending: &[String],
) -> Result<PluginResults> {
    let workspace = tempfile::Builder::new().prefix("cruncher").tempdir()?;
    let workdir = workspace.path();

    let manifest_path = workdir.join(format!("{}_files.json", plugin));
    let result_path = workdir.join(format!("{}_results.json", plugin));

    let manifest = serde_json::to_vec(pending).map_err(|source| PulseError::Json {
        path: manifest_path.clone(),
        source,
    })?;
    std::fs::write(&manifest_path, manifest)?;

    let domain_dir = config.domain_dir(domain);
    for name in pending {
        std::fs::copy(domain_dir.join(name), workdir.join(name))?;
    }

    let plugin_path = config.scripts_path().join(plugin);
    tracing::info!(
        "{} {} {} {} {}",
        plugin_path.display(),
        domain,
        workdir.display(),
        manifest_path.display(),
        result_path.display()
    );

    let timeout = Duration::from_secs(config.dispatcher.plugin_timeout);
    let invocation = Command::new(&plugin_path)
        .arg(domain)
        .arg(workdir)
        .arg(&manifest_path)
        .arg(&result_path)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, invocation).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(PulseError::PluginFailed {
                plugin: plugin.to_string(),
                domain: domain.to_string(),
                detail: format!("failed to launch: {}", e),
            })
        }
        Err(_) => {
            return Err(PulseError::PluginTimeout {
                plugin: plugin.to_string(),
                domain: domain.to_string(),
                secs: config.dispatcher.plugin_timeout,
            })
        }
    };

    if !output.status.success() {
        return Err(PulseError::PluginFailed {
            plugin: plugin.to_string(),
            domain: domain.to_string(),
            detail: format!(
                "exit {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let body = match std::fs::read_to_string(&result_path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PulseError::MissingResult {
                plugin: plugin.to_string(),
                domain: domain.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&body).map_err(|source| PulseError::Json {
        path: result_path,
        source,
    })
}
