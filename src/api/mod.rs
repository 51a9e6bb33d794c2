//! HTTP client for the public recording API.
//!
//! Thin reqwest wrapper: build the URL, fire the request, map the status,
//! decode the body. No retries and no caching happen here; the sync engine
//! owns those policies.

pub mod dto;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use self::dto::{ConferenceDto, ConferencesResponse, EventDto, SearchEventsResponse};

/// Errors from talking to the recording API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {reason}")]
    Decode { reason: String },

    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl ApiError {
    /// True for an HTTP 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode {
                reason: err.to_string(),
            }
        } else {
            ApiError::Network {
                reason: err.to_string(),
            }
        }
    }
}

/// Configuration for [`RecordingClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the public API, with trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.media.ccc.de/public/".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("mediathek/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// One page of keyword search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub events: Vec<EventDto>,
    /// Total result count across all pages, from the `total` header.
    pub total: u32,
    /// Pagination links keyed by `rel`, from the `link` header.
    pub links: HashMap<String, String>,
}

/// Read access to the remote recording catalog.
///
/// The sync engine talks to this trait so tests can substitute a
/// programmable fake for the real HTTP client.
#[async_trait]
pub trait RecordingApi: Send + Sync {
    /// All conferences, without their event lists.
    async fn conferences(&self) -> Result<ConferencesResponse, ApiError>;

    /// One conference by acronym, with its full event list.
    async fn conference_by_acronym(&self, acronym: &str) -> Result<ConferenceDto, ApiError>;

    /// One event by GUID, with recordings and related events.
    async fn event_by_guid(&self, guid: &str) -> Result<EventDto, ApiError>;

    /// One page of keyword search results.
    async fn search_events(&self, query: &str, page: u32) -> Result<SearchPage, ApiError>;
}

/// reqwest-backed [`RecordingApi`] implementation.
pub struct RecordingClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RecordingClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Turns a non-2xx response into [`ApiError::Status`], keeping the body
/// text as the message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RecordingApi for RecordingClient {
    async fn conferences(&self) -> Result<ConferencesResponse, ApiError> {
        self.get_json(self.endpoint("conferences")?).await
    }

    async fn conference_by_acronym(&self, acronym: &str) -> Result<ConferenceDto, ApiError> {
        self.get_json(self.endpoint(&format!("conferences/{acronym}"))?)
            .await
    }

    async fn event_by_guid(&self, guid: &str) -> Result<EventDto, ApiError> {
        self.get_json(self.endpoint(&format!("events/{guid}"))?)
            .await
    }

    async fn search_events(&self, query: &str, page: u32) -> Result<SearchPage, ApiError> {
        let mut url = self.endpoint("events/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("page", &page.to_string());

        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;

        let total = response
            .headers()
            .get("total")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let links = parse_link_header(
            response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok()),
        );

        let body: SearchEventsResponse = response.json().await?;
        Ok(SearchPage {
            events: body.events,
            total,
            links,
        })
    }
}

/// Parses an RFC 5988 `Link` header into a rel -> URL map.
///
/// Entries that do not carry both a `<url>` part and a quoted `rel` are
/// skipped, so a malformed header yields an empty map rather than an error.
pub(crate) fn parse_link_header(header: Option<&str>) -> HashMap<String, String> {
    let mut links = HashMap::new();
    let Some(header) = header else {
        return links;
    };

    for entry in header.split(',') {
        let mut url = None;
        let mut rel = None;
        for part in entry.split(';') {
            let part = part.trim();
            if part.starts_with('<') {
                url = part
                    .strip_prefix('<')
                    .and_then(|p| p.strip_suffix('>'))
                    .map(str::to_string);
            } else if let Some(value) = part.strip_prefix("rel=") {
                rel = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .map(str::to_string);
            }
        }
        if let (Some(url), Some(rel)) = (url, rel) {
            links.insert(rel, url);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_header_next_and_prev() {
        let header = "<https://api.example.org/public/events/search?p=2&q=camera>; rel=\"next\", \
                      <https://api.example.org/public/events/search?p=1&q=camera>; rel=\"prev\"";
        let links = parse_link_header(Some(header));
        assert_eq!(links.len(), 2);
        assert_eq!(
            links.get("next").map(String::as_str),
            Some("https://api.example.org/public/events/search?p=2&q=camera")
        );
        assert!(links.contains_key("prev"));
    }

    #[test]
    fn test_parse_link_header_absent_or_malformed() {
        assert!(parse_link_header(None).is_empty());
        assert!(parse_link_header(Some("")).is_empty());
        assert!(parse_link_header(Some("not a link header")).is_empty());
        // url without rel is skipped
        assert!(parse_link_header(Some("<https://example.org>")).is_empty());
    }

    #[test]
    fn test_endpoint_joins_against_base() {
        let client = RecordingClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.endpoint("conferences/36c3").unwrap().as_str(),
            "https://api.media.ccc.de/public/conferences/36c3"
        );
        assert_eq!(
            client.endpoint("events/abcd").unwrap().as_str(),
            "https://api.media.ccc.de/public/events/abcd"
        );
    }

    #[test]
    fn test_not_found_detection() {
        let err = ApiError::Status {
            status: 404,
            message: String::new(),
        };
        assert!(err.is_not_found());
        let err = ApiError::Status {
            status: 500,
            message: String::new(),
        };
        assert!(!err.is_not_found());
    }
}
