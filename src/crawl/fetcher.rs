//! HTTP fetcher for domain refresh
//!
//! One GET per refresh, no retry: a failed fetch is itself a meaningful
//! observation and gets recorded in the domain's status history.

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with body and headers captured
    Success {
        status: u16,
        body: String,
        headers: BTreeMap<String, String>,
    },

    /// Valid HTTP response outside the 2xx range; recorded as its real code
    HttpError { status: u16 },

    /// Transport-level failure (timeout, DNS, TLS, connection refused);
    /// recorded as the 500 sentinel
    Failed { error: String },
}

/// Builds the shared HTTP client used for all domain refreshes
///
/// User agent format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(agent)
        .timeout(Duration::from_secs(crawler.request_timeout))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once and classifies the outcome
pub async fn fetch_url(client: &Client, url: &str) -> FetchOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::Failed {
                error: e.to_string(),
            }
        }
    };

    let status = response.status().as_u16();
    if !response.status().is_success() {
        return FetchOutcome::HttpError { status };
    }

    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    match response.text().await {
        Ok(body) => FetchOutcome::Success {
            status,
            body,
            headers,
        },
        Err(e) => FetchOutcome::Failed {
            error: e.to_string(),
        },
    }
}
