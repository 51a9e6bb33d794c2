//! Row types for the local cache database.
//!
//! These mirror the SQLite schema, not the wire DTOs. List-valued event
//! fields (persons, tags) are stored as JSON text columns and exposed
//! through accessor methods.

use serde::{Deserialize, Serialize};

use crate::api::dto::{ConferenceDto, EventDto, RecordingDto};
use crate::util;

/// Errors from the local cache database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not determine home directory")]
    HomeDirNotFound,

    #[error("failed to create data directory: {0}")]
    CreateDir(#[from] std::io::Error),

    #[error("migration failed: {0}")]
    Migration(String),
}

/// A series of conferences ("congress", "camp", ...), used to group the
/// conference list for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferenceGroup {
    pub id: i64,
    pub name: String,
    /// Display position. Well-known series sort by their list position,
    /// the catch-all group sorts last.
    pub sort_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conference {
    pub id: i64,
    pub acronym: String,
    pub title: String,
    pub slug: String,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub updated_at: Option<String>,
    pub conference_group_id: i64,
}

impl Conference {
    /// Series name derived from the slug, e.g. "congress" from
    /// `conferences/congress/36c3`.
    pub fn series_name(&self) -> &str {
        util::series_name(&self.slug)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub guid: String,
    pub conference_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub original_language: Option<String>,
    /// JSON array of speaker names.
    pub persons_json: Option<String>,
    /// JSON array of tags.
    pub tags_json: Option<String>,
    pub date: Option<String>,
    pub release_date: Option<String>,
    pub updated_at: Option<String>,
    pub length: i64,
    pub thumb_url: Option<String>,
    pub poster_url: Option<String>,
    pub frontend_link: Option<String>,
    pub url: String,
    pub conference_url: String,
    pub view_count: i64,
    pub promoted: bool,
}

impl Event {
    pub fn persons(&self) -> Vec<String> {
        decode_json_list(self.persons_json.as_deref())
    }

    pub fn tags(&self) -> Vec<String> {
        decode_json_list(self.tags_json.as_deref())
    }
}

fn decode_json_list(json: Option<&str>) -> Vec<String> {
    json.and_then(|j| serde_json::from_str(j).ok())
        .unwrap_or_default()
}

pub(crate) fn encode_json_list(list: Option<&[String]>) -> Option<String> {
    list.map(|l| serde_json::to_string(l).unwrap_or_else(|_| "[]".to_string()))
}

/// Column values for inserting or updating an event. Everything except the
/// surrogate id and the resolved conference id comes from the wire DTO.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub guid: String,
    pub conference_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub slug: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub original_language: Option<String>,
    pub persons_json: Option<String>,
    pub tags_json: Option<String>,
    pub date: Option<String>,
    pub release_date: Option<String>,
    pub updated_at: Option<String>,
    pub length: i64,
    pub thumb_url: Option<String>,
    pub poster_url: Option<String>,
    pub frontend_link: Option<String>,
    pub url: String,
    pub conference_url: String,
    pub view_count: i64,
    pub promoted: bool,
}

impl NewEvent {
    pub fn from_dto(dto: &EventDto, conference_id: i64) -> Self {
        Self {
            guid: dto.guid.clone(),
            conference_id,
            title: dto.title.clone(),
            subtitle: dto.subtitle.clone(),
            slug: dto.slug.clone(),
            link: dto.link.clone(),
            description: dto.description.clone(),
            original_language: dto.original_language.clone(),
            persons_json: encode_json_list(dto.persons.as_deref()),
            tags_json: encode_json_list(dto.tags.as_deref()),
            date: dto.date.clone(),
            release_date: dto.release_date.clone(),
            updated_at: dto.updated_at.clone(),
            length: dto.length,
            thumb_url: dto.thumb_url.clone(),
            poster_url: dto.poster_url.clone(),
            frontend_link: dto.frontend_link.clone(),
            url: dto.url.clone(),
            conference_url: dto.conference_url.clone(),
            view_count: dto.view_count,
            promoted: dto.promoted,
        }
    }
}

/// Column values for inserting or updating a conference.
#[derive(Debug, Clone)]
pub struct NewConference {
    pub acronym: String,
    pub title: String,
    pub slug: String,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub updated_at: Option<String>,
    pub conference_group_id: i64,
}

impl NewConference {
    pub fn from_dto(dto: &ConferenceDto, conference_group_id: i64) -> Self {
        Self {
            acronym: dto.acronym.clone(),
            title: dto.title.clone(),
            slug: dto.slug.clone(),
            url: dto.url.clone(),
            logo_url: dto.logo_url.clone(),
            updated_at: dto.updated_at.clone(),
            conference_group_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: i64,
    pub event_id: i64,
    pub size: i64,
    pub length: i64,
    pub mime_type: String,
    pub language: Option<String>,
    pub filename: Option<String>,
    pub high_quality: bool,
    pub width: i64,
    pub height: i64,
    pub recording_url: String,
}

/// Column values for inserting a recording.
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub event_id: i64,
    pub size: i64,
    pub length: i64,
    pub mime_type: String,
    pub language: Option<String>,
    pub filename: Option<String>,
    pub high_quality: bool,
    pub width: i64,
    pub height: i64,
    pub recording_url: String,
}

impl NewRecording {
    pub fn from_dto(dto: &RecordingDto, event_id: i64) -> Self {
        Self {
            event_id,
            size: dto.size,
            length: dto.length,
            mime_type: dto.mime_type.clone(),
            language: dto.language.clone(),
            filename: dto.filename.clone(),
            high_quality: dto.high_quality,
            width: dto.width,
            height: dto.height,
            recording_url: dto.media_url().to_string(),
        }
    }
}

/// A directed reference from one cached event to another, by GUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEvent {
    pub id: i64,
    pub event_id: i64,
    pub related_event_guid: String,
}

/// A bookmarked event, keyed by event GUID so it survives re-syncs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub event_guid: String,
    pub created_at: String,
}

/// Saved playback position for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackProgress {
    pub event_guid: String,
    /// Position in milliseconds.
    pub progress_millis: i64,
    /// Wall-clock time of the last update, unix millis.
    pub watched_at: i64,
}

/// A recommendation for an event on a named channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub event_guid: String,
    pub channel: String,
    pub dismissed: bool,
    pub created_at: String,
}

/// A locally downloaded event, keyed by event GUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineEvent {
    pub id: i64,
    pub event_guid: String,
    pub recording_id: i64,
    /// Identifier of the download in the platform download manager.
    pub download_reference: i64,
    pub local_path: String,
}

/// An event joined with its playback progress, for "continue watching"
/// rows.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub event: Event,
    pub progress: PlaybackProgress,
}

/// An event joined with the recommendation that surfaced it.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationEvent {
    pub event: Event,
    pub recommendation: Recommendation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_list_round_trip() {
        let persons = vec!["alice".to_string(), "bob".to_string()];
        let encoded = encode_json_list(Some(&persons)).unwrap();
        let event = Event {
            id: 1,
            guid: "g".into(),
            conference_id: 1,
            title: "t".into(),
            subtitle: None,
            slug: "s".into(),
            link: None,
            description: None,
            original_language: None,
            persons_json: Some(encoded),
            tags_json: None,
            date: None,
            release_date: None,
            updated_at: None,
            length: 0,
            thumb_url: None,
            poster_url: None,
            frontend_link: None,
            url: String::new(),
            conference_url: String::new(),
            view_count: 0,
            promoted: false,
        };
        assert_eq!(event.persons(), persons);
        assert!(event.tags().is_empty());
    }

    #[test]
    fn test_decode_json_list_tolerates_garbage() {
        assert!(decode_json_list(Some("not json")).is_empty());
        assert!(decode_json_list(None).is_empty());
    }
}
