use crate::domain::write_json_atomic;
use crate::{PulseError, Result, UrlError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Status recorded when a fetch fails at the transport level
/// (timeout, DNS, TLS, connection refused)
pub const FETCH_FAILED_STATUS: u16 = 500;

/// Timestamp format used in snapshot file names
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Derived presence of a domain, computed on read and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainStatus {
    /// No record exists for the domain
    Absent,
    /// Record exists but the owner has not claimed it
    Present,
    /// Owner claimed the domain and has not opted out
    Included,
    /// Owner opted out of inclusion
    Excluded,
}

impl DomainStatus {
    /// Derives the status from an optional record, `Absent` when missing
    pub fn of(record: Option<&DomainRecord>) -> Self {
        match record {
            None => DomainStatus::Absent,
            Some(r) if r.excluded => DomainStatus::Excluded,
            Some(r) if r.claimed => DomainStatus::Included,
            Some(_) => DomainStatus::Present,
        }
    }
}

/// Durable crawl state for one tracked domain
///
/// The record is persisted as `<domain-path>/<domain>/<domain>.json` and
/// copied verbatim into a timestamped snapshot file on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Canonical lowercase host name; derived once from `url`, never changed
    pub domain: String,

    /// Scheme-qualified reachable address
    pub url: String,

    /// Most recent fetched page body, or empty if never fetched successfully
    #[serde(default)]
    pub html: String,

    /// Response headers from the most recent successful fetch
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Last observed HTTP status (sentinel 500 for transport failures)
    #[serde(default)]
    pub status: u16,

    /// Timestamp of the last poll attempt, or null if never polled
    #[serde(default)]
    pub polled: Option<DateTime<Utc>>,

    /// Past status codes, most recent first
    #[serde(default)]
    pub history: Vec<u16>,

    /// Extracted microformats data consumed by stat plugins
    #[serde(default)]
    pub mf2: serde_json::Value,

    /// Owner opted out of inclusion
    #[serde(default)]
    pub excluded: bool,

    /// Owner has verified ownership
    #[serde(default)]
    pub claimed: bool,

    /// Whether this record was read back from a valid record file
    #[serde(skip)]
    pub found: bool,
}

impl DomainRecord {
    /// Constructs a new record from a URL or bare hostname
    ///
    /// Canonicalizes casing and scheme: a bare hostname gets `http://`, the
    /// host is lowercased, and the stored `url` is rebuilt as scheme + host.
    /// Does not fetch.
    pub fn new(input: &str) -> std::result::Result<Self, UrlError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlError::MissingDomain);
        }

        let parsed = match Url::parse(trimmed) {
            Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => url,
            Ok(url) if !matches!(url.scheme(), "http" | "https") && url.has_host() => {
                return Err(UrlError::InvalidScheme(url.scheme().to_string()));
            }
            _ => Url::parse(&format!("http://{}", trimmed))
                .map_err(|e| UrlError::Parse(e.to_string()))?,
        };

        let host = parsed.host_str().ok_or(UrlError::MissingDomain)?;
        let domain = host.to_lowercase();
        let url = format!("{}://{}", parsed.scheme(), domain);

        Ok(Self {
            domain,
            url,
            html: String::new(),
            headers: BTreeMap::new(),
            status: 0,
            polled: None,
            history: Vec::new(),
            mf2: serde_json::Value::Null,
            excluded: false,
            claimed: false,
            found: false,
        })
    }

    /// File name of the canonical record file for this domain
    pub fn record_file_name(&self) -> String {
        format!("{}.json", self.domain)
    }

    /// Full path of the record file under the given domain store
    pub fn record_path(&self, domain_path: &Path) -> PathBuf {
        domain_path.join(&self.domain).join(self.record_file_name())
    }

    /// Loads a record from its record file under the domain store
    ///
    /// # Returns
    ///
    /// * `Ok(DomainRecord)` - Parsed record with `found = true`
    /// * `Err(PulseError::RecordNotFound)` - No record file on disk
    /// * `Err(PulseError::Json)` - Record file exists but is corrupt
    pub fn load(domain_path: &Path, domain: &str) -> Result<Self> {
        let path = domain_path.join(domain).join(format!("{}.json", domain));
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PulseError::RecordNotFound {
                    domain: domain.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut record: DomainRecord =
            serde_json::from_str(&body).map_err(|source| PulseError::Json { path, source })?;
        record.found = true;
        Ok(record)
    }

    /// Persists the record to its record file (atomic replace)
    pub fn store(&mut self, domain_path: &Path) -> Result<()> {
        let path = self.record_path(domain_path);
        write_json_atomic(&path, self)?;
        self.found = true;
        Ok(())
    }

    /// Writes an immutable snapshot of the current state
    ///
    /// The snapshot is named `<YYYYMMDDTHHMMSS>_<domain>.json` from the
    /// `polled` timestamp, so names for one domain sort lexicographically
    /// by poll time.
    pub fn write_snapshot(&self, domain_path: &Path) -> Result<String> {
        let polled = self.polled.ok_or_else(|| {
            PulseError::Io(std::io::Error::other(
                "cannot snapshot a record that has never been polled",
            ))
        })?;

        let name = format!(
            "{}_{}.json",
            polled.format(SNAPSHOT_TIMESTAMP_FORMAT),
            self.domain
        );
        let path = domain_path.join(&self.domain).join(&name);
        write_json_atomic(&path, self)?;
        Ok(name)
    }

    /// Derived status of this record
    pub fn domain_status(&self) -> DomainStatus {
        DomainStatus::of(Some(self))
    }

    /// Whether the last successful fetch extracted any microformats items
    pub fn has_microformats(&self) -> bool {
        self.mf2
            .get("items")
            .and_then(|items| items.as_array())
            .is_some_and(|items| !items.is_empty())
    }
}
