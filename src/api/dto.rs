//! Wire types for the recording API.
//!
//! Field names follow the remote JSON (snake_case throughout). Everything
//! the cache does not strictly require is `#[serde(default)]` so a sparse
//! payload never fails deserialization.

use serde::Deserialize;

/// Response body of the full conference listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ConferencesResponse {
    #[serde(default)]
    pub conferences: Vec<ConferenceDto>,
}

/// One conference, as listed or as detail (detail carries `events`).
#[derive(Debug, Clone, Deserialize)]
pub struct ConferenceDto {
    #[serde(default)]
    pub acronym: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Present on the per-conference detail endpoint only.
    #[serde(default)]
    pub events: Option<Vec<EventDto>>,
}

/// One talk/event. The detail endpoint additionally carries `recordings`
/// and `related`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDto {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub persons: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub thumb_url: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub frontend_link: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub conference_url: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub promoted: bool,
    #[serde(default)]
    pub recordings: Option<Vec<RecordingDto>>,
    #[serde(default)]
    pub related: Option<Vec<RelatedEventDto>>,
}

impl EventDto {
    /// Conference acronym, taken from the last path segment of
    /// `conference_url`.
    pub fn conference_acronym(&self) -> Option<&str> {
        self.conference_url
            .split('/')
            .filter(|s| !s.is_empty())
            .next_back()
            .filter(|s| !s.is_empty())
    }
}

/// One recording (a downloadable/streamable file of an event).
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingDto {
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub high_quality: bool,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RecordingDto {
    /// The playable URL: `recording_url` with `url` as fallback.
    pub fn media_url(&self) -> &str {
        self.recording_url
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default()
    }
}

/// A reference from one event to a related event.
#[derive(Debug, Clone, Deserialize)]
pub struct RelatedEventDto {
    #[serde(default)]
    pub event_guid: String,
}

/// Response body of the keyword search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEventsResponse {
    #[serde(default)]
    pub events: Vec<EventDto>,
}
