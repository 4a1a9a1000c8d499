//! Crawl module: domain refresh batch
//!
//! A refresh fetches one domain's page, extracts microformats, updates
//! the record's status history, and writes exactly one immutable
//! snapshot. New snapshots are how pending work enters the stats
//! pipeline.

mod fetcher;
mod microformats;

pub use fetcher::{build_http_client, fetch_url, FetchOutcome};
pub use microformats::extract_microformats;

use crate::config::Config;
use crate::domain::{DomainRecord, DomainRegistry, FETCH_FAILED_STATUS};
use crate::{ConfigError, PulseError, Result};
use chrono::Utc;
use reqwest::Client;
use std::path::Path;

/// Refreshes one domain record
///
/// Excluded domains are a no-op: no network contact, no state change, no
/// snapshot. Otherwise one fetch is made; the observed status (real HTTP
/// code, or the 500 sentinel for transport failures) is prepended to the
/// history, `polled` is set, the record is persisted, and exactly one
/// snapshot file is written.
///
/// # Returns
///
/// The recorded status for this poll (the prior status for excluded
/// domains).
pub async fn refresh(
    record: &mut DomainRecord,
    client: &Client,
    domain_path: &Path,
) -> Result<u16> {
    if record.excluded {
        tracing::debug!("{}: excluded, skipping refresh", record.domain);
        return Ok(record.status);
    }

    match fetch_url(client, &record.url).await {
        FetchOutcome::Success {
            status,
            body,
            headers,
        } => {
            record.status = status;
            record.mf2 = extract_microformats(&body);
            record.html = body;
            record.headers = headers;
        }
        FetchOutcome::HttpError { status } => {
            record.status = status;
        }
        FetchOutcome::Failed { error } => {
            tracing::debug!("{}: fetch failed: {}", record.domain, error);
            record.status = FETCH_FAILED_STATUS;
        }
    }

    record.history.insert(0, record.status);
    record.polled = Some(Utc::now());
    record.store(domain_path)?;
    record.write_snapshot(domain_path)?;

    Ok(record.status)
}

/// Refreshes every domain in the registry sequentially, then stores the
/// ledger
///
/// A single domain's failure is logged and does not stop the batch.
pub async fn refresh_all(config: &Config, registry: &mut DomainRegistry) -> Result<()> {
    let client = build_http_client(&config.crawler, &config.user_agent)?;
    let domain_path = config.domain_path();

    let domains: Vec<String> = registry.domains().to_vec();
    tracing::info!("Refreshing {} domains", domains.len());

    for domain in domains {
        let Some(record) = registry.get_mut(&domain) else {
            continue;
        };
        match refresh(record, &client, &domain_path).await {
            Ok(status) => tracing::info!("{}: {}", domain, status),
            Err(e) => tracing::warn!("{}: refresh failed: {}", domain, e),
        }
    }

    registry.store()
}

/// Discovers new domains from the configured directory page
///
/// Fetches the `[gather]` source page, extracts its microformats
/// entries, and registers every `u-url` whose domain is not already in
/// the registry. A non-success fetch is logged and adds nothing.
///
/// # Returns
///
/// The number of domains added.
pub async fn gather(config: &Config, registry: &mut DomainRegistry) -> Result<usize> {
    let Some(gather) = &config.gather else {
        return Err(PulseError::Config(ConfigError::Validation(
            "gather requires a [gather] section with source-url".to_string(),
        )));
    };

    let client = build_http_client(&config.crawler, &config.user_agent)?;

    let body = match fetch_url(&client, &gather.source_url).await {
        FetchOutcome::Success { body, .. } => body,
        FetchOutcome::HttpError { status } => {
            tracing::warn!("gather source returned {}, no domains added", status);
            return Ok(0);
        }
        FetchOutcome::Failed { error } => {
            tracing::warn!("gather source unreachable: {}", error);
            return Ok(0);
        }
    };

    let mf2 = extract_microformats(&body);
    let empty = Vec::new();
    let items = mf2["items"].as_array().unwrap_or(&empty);

    let mut added = 0;
    for item in items {
        let urls = item
            .pointer("/properties/url")
            .and_then(|v| v.as_array())
            .unwrap_or(&empty);
        for url in urls.iter().filter_map(|v| v.as_str()) {
            // Entries without a usable URL are skipped, not fatal
            let Ok(candidate) = DomainRecord::new(url) else {
                tracing::debug!("gather: skipping unusable url '{}'", url);
                continue;
            };
            if registry.contains(&candidate.domain) {
                continue;
            }
            registry.add(url)?;
            tracing::info!("gather: added {}", candidate.domain);
            added += 1;
        }
    }

    tracing::info!("gather: {} new domains from {}", added, gather.source_url);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> Client {
        use crate::config::{CrawlerConfig, UserAgentConfig};
        build_http_client(
            &CrawlerConfig {
                request_timeout: 5,
                connect_timeout: 2,
            },
            &UserAgentConfig {
                crawler_name: "TestPulse".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
        )
        .unwrap()
    }

    fn snapshot_files(domain_path: &std::path::Path, domain: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(domain_path.join(domain))
            .unwrap()
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains('_'))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_refresh_success_updates_history_and_snapshots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"<div class="h-card"></div>"#, "text/html"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut record = DomainRecord::new("a.example").unwrap();
        record.url = server.uri();

        let status = refresh(&mut record, &test_client(), dir.path()).await.unwrap();

        assert_eq!(status, 200);
        assert_eq!(record.history[0], record.status);
        assert!(record.polled.is_some());
        assert!(record.has_microformats());
        assert_eq!(snapshot_files(dir.path(), "a.example").len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_records_sentinel() {
        let dir = TempDir::new().unwrap();
        let mut record = DomainRecord::new("a.example").unwrap();
        record.url = "http://127.0.0.1:1/".to_string();
        record.html = "old body".to_string();

        let status = refresh(&mut record, &test_client(), dir.path()).await.unwrap();

        assert_eq!(status, FETCH_FAILED_STATUS);
        assert_eq!(record.history, vec![FETCH_FAILED_STATUS]);
        // html/headers untouched on failure
        assert_eq!(record.html, "old body");
        // failed fetch still writes its snapshot
        assert_eq!(snapshot_files(dir.path(), "a.example").len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_excluded_is_a_noop() {
        let server = MockServer::start().await;
        // Expect zero requests to reach the server
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut record = DomainRecord::new("a.example").unwrap();
        record.url = server.uri();
        record.excluded = true;
        record.status = 204;
        record.history = vec![204];

        let status = refresh(&mut record, &test_client(), dir.path()).await.unwrap();

        assert_eq!(status, 204);
        assert_eq!(record.history, vec![204]);
        assert!(record.polled.is_none());
        assert!(!dir.path().join("a.example").exists());
    }

    fn gather_config(root: &std::path::Path, source_url: &str) -> Config {
        use crate::config::{CrawlerConfig, DispatcherConfig, GatherConfig, PathsConfig, UserAgentConfig};
        Config {
            paths: PathsConfig {
                data_path: root.join("data").to_string_lossy().into_owned(),
                domain_path: root.join("data/mf2data").to_string_lossy().into_owned(),
                ledger_file: "domains.json".to_string(),
            },
            crawler: CrawlerConfig {
                request_timeout: 5,
                connect_timeout: 2,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestPulse".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            dispatcher: DispatcherConfig::default(),
            gather: Some(GatherConfig {
                source_url: source_url.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_gather_adds_unseen_domains() {
        let server = MockServer::start().await;
        let page = r#"
            <div class="h-card"><a class="u-url" href="https://alpha.example/">Alpha</a></div>
            <div class="h-card"><a class="u-url" href="http://beta.example/blog">Beta</a></div>
        "#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = gather_config(dir.path(), &server.uri());
        let mut registry = DomainRegistry::new(&config);

        let added = gather(&config, &mut registry).await.unwrap();

        assert_eq!(added, 2);
        assert!(registry.contains("alpha.example"));
        assert!(registry.contains("beta.example"));
    }

    #[tokio::test]
    async fn test_gather_skips_domains_already_registered() {
        let server = MockServer::start().await;
        let page = r#"<div class="h-card"><a class="u-url" href="https://alpha.example/">Alpha</a></div>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = gather_config(dir.path(), &server.uri());
        let mut registry = DomainRegistry::new(&config);
        registry.add("https://alpha.example/").unwrap();

        let added = gather(&config, &mut registry).await.unwrap();

        assert_eq!(added, 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_gather_source_error_adds_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = gather_config(dir.path(), &server.uri());
        let mut registry = DomainRegistry::new(&config);

        let added = gather(&config, &mut registry).await.unwrap();

        assert_eq!(added, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_gather_without_section_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut config = gather_config(dir.path(), "http://unused.example/");
        config.gather = None;
        let mut registry = DomainRegistry::new(&config);

        let result = gather(&config, &mut registry).await;

        assert!(matches!(result, Err(PulseError::Config(_))));
    }

    #[tokio::test]
    async fn test_two_refreshes_write_ordered_snapshots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut record = DomainRecord::new("a.example").unwrap();
        record.url = server.uri();

        refresh(&mut record, &test_client(), dir.path()).await.unwrap();
        // Snapshot names have second resolution
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        refresh(&mut record, &test_client(), dir.path()).await.unwrap();

        let names = snapshot_files(dir.path(), "a.example");
        assert_eq!(names.len(), 2);
        assert!(names[1] > names[0]);
        assert_eq!(record.history.len(), 2);
    }
}
