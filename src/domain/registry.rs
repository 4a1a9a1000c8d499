use crate::config::Config;
use crate::domain::record::DomainRecord;
use crate::domain::write_json_atomic;
use crate::{PulseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One entry in the domain ledger file
///
/// The ledger accepts both a bare URL string (legacy form) and a full
/// entry object; `store()` always writes the object form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LedgerEntry {
    Url(String),
    Record(LedgerRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerRecord {
    domain: String,
    url: String,
    #[serde(default)]
    polled: Option<DateTime<Utc>>,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    history: Vec<u16>,
}

/// Ordered collection of tracked domains
///
/// Membership (unique domain keys) is the enforced invariant; insertion
/// order is kept only so ledger output is deterministic across
/// load/store cycles.
#[derive(Debug)]
pub struct DomainRegistry {
    order: Vec<String>,
    records: HashMap<String, DomainRecord>,
    ledger_path: PathBuf,
    domain_path: PathBuf,
}

impl DomainRegistry {
    /// Creates an empty registry rooted at the configured paths
    pub fn new(config: &Config) -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
            ledger_path: config.ledger_path(),
            domain_path: config.domain_path(),
        }
    }

    /// Loads the registry: ledger file first, then a directory scan
    ///
    /// A malformed ledger is treated as empty (logged, not fatal). A
    /// ledger entry or scanned directory whose record file is corrupt is
    /// skipped with a warning; an entry with no record file yet stays a
    /// member with its ledger-derived state.
    pub fn load(config: &Config) -> Self {
        let mut registry = Self::new(config);
        registry.load_ledger();
        registry.scan_directories();
        registry
    }

    fn load_ledger(&mut self) {
        let entries: Vec<LedgerEntry> = match std::fs::read_to_string(&self.ledger_path) {
            Ok(body) => match serde_json::from_str(&body) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        "Malformed ledger {}: {} (treating as empty)",
                        self.ledger_path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    "Unreadable ledger {}: {} (treating as empty)",
                    self.ledger_path.display(),
                    e
                );
                Vec::new()
            }
        };

        for entry in entries {
            let seeded = match &entry {
                LedgerEntry::Url(url) => DomainRecord::new(url),
                LedgerEntry::Record(ledger) => DomainRecord::new(&ledger.url).map(|mut record| {
                    record.polled = ledger.polled;
                    record.status = ledger.status;
                    record.history = ledger.history.clone();
                    record
                }),
            };

            let seeded = match seeded {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping unparseable ledger entry: {}", e);
                    continue;
                }
            };

            // Prefer the on-disk record file over the ledger-derived state
            match DomainRecord::load(&self.domain_path, &seeded.domain) {
                Ok(record) => self.insert(record),
                Err(PulseError::RecordNotFound { .. }) => self.insert(seeded),
                Err(e) => {
                    tracing::warn!("Skipping {}: corrupt record file: {}", seeded.domain, e);
                }
            }
        }
    }

    fn scan_directories(&mut self) {
        let entries = match std::fs::read_dir(&self.domain_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(
                    "Cannot scan domain path {}: {}",
                    self.domain_path.display(),
                    e
                );
                return;
            }
        };

        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.records.contains_key(&name) {
                continue;
            }

            match DomainRecord::load(&self.domain_path, &name) {
                Ok(record) => {
                    tracing::debug!("Found unledgered domain directory: {}", name);
                    self.insert(record);
                }
                Err(PulseError::RecordNotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!("Skipping directory {}: {}", name, e);
                }
            }
        }
    }

    /// Serializes every member's canonical ledger entry back to the
    /// ledger file (full overwrite, atomic replace)
    pub fn store(&self) -> Result<()> {
        let entries: Vec<LedgerEntry> = self
            .iter()
            .map(|record| {
                LedgerEntry::Record(LedgerRecord {
                    domain: record.domain.clone(),
                    url: record.url.clone(),
                    polled: record.polled,
                    status: record.status,
                    history: record.history.clone(),
                })
            })
            .collect();

        write_json_atomic(&self.ledger_path, &entries)
    }

    /// Adds a new domain from a URL or bare hostname without fetching
    ///
    /// If the canonical domain is already a member, this is a no-op that
    /// returns the existing record.
    pub fn add(&mut self, url: &str) -> Result<&DomainRecord> {
        let record = DomainRecord::new(url)?;
        let domain = record.domain.clone();
        if !self.records.contains_key(&domain) {
            self.insert(record);
        }
        Ok(&self.records[&domain])
    }

    fn insert(&mut self, record: DomainRecord) {
        if !self.records.contains_key(&record.domain) {
            self.order.push(record.domain.clone());
        }
        self.records.insert(record.domain.clone(), record);
    }

    pub fn get(&self, domain: &str) -> Option<&DomainRecord> {
        self.records.get(domain)
    }

    pub fn get_mut(&mut self, domain: &str) -> Option<&mut DomainRecord> {
        self.records.get_mut(domain)
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.records.contains_key(domain)
    }

    /// Member domain names in insertion order
    pub fn domains(&self) -> &[String] {
        &self.order
    }

    /// Member records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &DomainRecord> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
