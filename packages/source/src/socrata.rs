//! Socrata SODA API client.
//!
//! [`SodaClient`] is the seam between extraction and the network: the
//! extractor only ever talks to a `&dyn SodaClient`, and [`HttpSodaClient`]
//! is the `reqwest`-backed implementation used by the binary. Queries use
//! the `$where`, `$select`, `$order`, `$limit` and `$offset` parameters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::SourceError;
use crate::progress::ProgressCallback;

/// Default Socrata domain for NYC Open Data.
pub const DEFAULT_DOMAIN: &str = "data.cityofnewyork.us";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(150);

/// Order used to keep pagination stable across requests.
pub const PAGE_ORDER: &str = ":id";

/// Header carrying the Socrata application token.
const APP_TOKEN_HEADER: &str = "x-app-token";

/// One SoQL query against a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SodaQuery {
    /// `$where` clause.
    pub where_clause: Option<String>,
    /// `$select` projection (comma-separated columns).
    pub select: Option<String>,
    /// `$order` clause.
    pub order: Option<String>,
    /// `$limit`.
    pub limit: u64,
    /// `$offset`.
    pub offset: u64,
}

impl SodaQuery {
    /// Query string parameters in the order they are sent.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);
        if let Some(select) = &self.select {
            params.push(("$select", select.clone()));
        }
        if let Some(where_clause) = &self.where_clause {
            params.push(("$where", where_clause.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("$order", order.clone()));
        }
        params.push(("$limit", self.limit.to_string()));
        params.push(("$offset", self.offset.to_string()));
        params
    }
}

/// A source of Socrata query results.
#[async_trait]
pub trait SodaClient: Send + Sync {
    /// Runs `query` against `dataset_id` and returns the raw JSON records.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Remote`] if the service rejects the query and
    /// [`SourceError::Http`] if the request cannot be completed.
    async fn query(
        &self,
        dataset_id: &str,
        query: &SodaQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError>;
}

/// Connection settings for [`HttpSodaClient`].
#[derive(Debug, Clone)]
pub struct SodaClientConfig {
    /// Socrata domain, e.g. `"data.cityofnewyork.us"`. A value with a
    /// scheme (`"http://127.0.0.1:8080"`) is used as the base URL verbatim.
    pub domain: String,
    /// Application token. Without one Socrata applies a much lower
    /// request quota.
    pub app_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for SodaClientConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            app_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Error body returned by Socrata on a failed query.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// [`SodaClient`] over HTTPS.
pub struct HttpSodaClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSodaClient {
    /// Builds a client for the configured domain.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the token is not a valid header
    /// value or [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SodaClientConfig) -> Result<Self, SourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.app_token {
            let value = reqwest::header::HeaderValue::from_str(token).map_err(|e| {
                SourceError::Config {
                    message: format!("invalid app token: {e}"),
                }
            })?;
            headers.insert(APP_TOKEN_HEADER, value);
        } else {
            log::warn!(
                "No Socrata app token configured; requests to {} are subject to a lower rate limit",
                config.domain
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(&config.domain),
        })
    }

    /// The SODA resource endpoint for `dataset_id`.
    #[must_use]
    pub fn resource_url(&self, dataset_id: &str) -> String {
        format!("{}/resource/{dataset_id}.json", self.base_url)
    }
}

/// `https://{domain}`, unless `domain` already names a scheme.
fn base_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

#[async_trait]
impl SodaClient for HttpSodaClient {
    async fn query(
        &self,
        dataset_id: &str,
        query: &SodaQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let url = self.resource_url(dataset_id);
        log::debug!("GET {url} {:?}", query.params());

        let response = self.client.get(&url).query(&query.params()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Remote {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(response.json().await?)
    }
}

/// Extracts a readable message from a Socrata error body, falling back to
/// the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            code: Some(code),
        }) => format!("{code}: {message}"),
        Ok(ErrorBody {
            message: Some(message),
            code: None,
        }) => message,
        _ => body.trim().to_string(),
    }
}

/// Configuration for a paginated Socrata fetch.
pub struct SocrataConfig<'a> {
    /// Socrata dataset id (e.g., `"tg4x-b46p"`).
    pub dataset_id: &'a str,
    /// Label for log messages (e.g., `"NYC Film Permits"`).
    pub label: &'a str,
    /// `$where` clause applied to every page.
    pub where_clause: Option<&'a str>,
    /// `$select` projection applied to every page.
    pub select: Option<&'a str>,
    /// Maximum number of records to fetch in total.
    pub limit: u64,
    /// Records per request.
    pub page_size: u64,
}

/// Fetches up to `config.limit` records from a Socrata dataset, one page at
/// a time, stopping early on a short page.
///
/// # Errors
///
/// Returns the first [`SourceError`] raised by `client`.
pub async fn fetch_socrata(
    client: &dyn SodaClient,
    config: &SocrataConfig<'_>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<serde_json::Value>, SourceError> {
    let page_size = config.page_size.max(1);
    let mut all_records: Vec<serde_json::Value> = Vec::new();
    let mut offset: u64 = 0;

    progress.set_message(format!("Fetching {}", config.label));

    loop {
        let remaining = config.limit.saturating_sub(offset);
        if remaining == 0 {
            break;
        }
        let page_limit = remaining.min(page_size);

        let query = SodaQuery {
            where_clause: config.where_clause.map(str::to_string),
            select: config.select.map(str::to_string),
            order: Some(PAGE_ORDER.to_string()),
            limit: page_limit,
            offset,
        };

        log::info!(
            "Fetching {} data: offset={offset}, limit={page_limit}",
            config.label
        );
        let records = client.query(config.dataset_id, &query).await?;

        let count = records.len() as u64;
        progress.inc(count);
        all_records.extend(records);
        offset += count;

        if count < page_limit {
            break;
        }
    }

    all_records.truncate(usize::try_from(config.limit).unwrap_or(usize::MAX));

    log::info!(
        "Downloaded {} {} records total",
        all_records.len(),
        config.label
    );
    progress.finish(format!(
        "[{}] download complete -- {} records",
        config.label,
        all_records.len()
    ));

    Ok(all_records)
}
