//! Domain tracking module
//!
//! This module contains the durable model for tracked domains:
//! - `DomainRecord`: one host's crawl state and history
//! - `DomainRegistry`: the ordered collection of records, backed by a
//!   ledger file plus a directory scan of the domain store

mod record;
mod registry;

pub use record::{DomainRecord, DomainStatus, FETCH_FAILED_STATUS};
pub use registry::DomainRegistry;

use crate::{PulseError, Result};
use serde::Serialize;
use std::path::Path;

/// Serializes a value as JSON to `path` via write-to-temp-then-rename.
///
/// Every durable rewrite in the system goes through this so a crash
/// mid-write never leaves a torn file behind.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| PulseError::Io(std::io::Error::other("path has no parent directory")))?;
    std::fs::create_dir_all(parent)?;

    let body = serde_json::to_vec(value).map_err(|source| PulseError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::fs::write(tmp.path(), &body)?;
    tmp.persist(path).map_err(|e| PulseError::Io(e.error))?;
    Ok(())
}
