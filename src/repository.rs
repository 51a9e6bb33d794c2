//! Read facade over the local cache, plus user-data operations.
//!
//! Everything here is local-only and synchronous. Anything that needs the
//! network lives on [`crate::sync::SyncEngine`].

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::db::{
    Conference, ConferenceGroup, DbError, Event, MediaDb, OfflineEvent, PlaybackProgress,
    ProgressEvent, RecommendationEvent, Recording,
};

/// Channel name for view-count based home screen recommendations.
pub const CHANNEL_POPULAR: &str = "popular";
/// Channel name for editorially promoted events.
pub const CHANNEL_PROMOTED: &str = "promoted";

const HOME_RECOMMENDATION_LIMIT: usize = 10;

pub struct MediaRepository {
    db: Arc<Mutex<MediaDb>>,
}

impl MediaRepository {
    pub fn new(db: Arc<Mutex<MediaDb>>) -> Self {
        Self { db }
    }

    // -------------------------------------------------------------------
    // Catalog queries
    // -------------------------------------------------------------------

    pub fn conference_groups(&self) -> Result<Vec<ConferenceGroup>, DbError> {
        self.db.lock().get_conference_groups()
    }

    pub fn conferences_in_group(&self, group_id: i64) -> Result<Vec<Conference>, DbError> {
        self.db.lock().get_conferences_in_group(group_id)
    }

    pub fn conference_by_acronym(&self, acronym: &str) -> Result<Option<Conference>, DbError> {
        self.db.lock().get_conference_by_acronym(acronym)
    }

    /// Most recently updated conferences, for the home screen.
    pub fn latest_conferences(&self, limit: usize) -> Result<Vec<Conference>, DbError> {
        self.db.lock().get_latest_conferences(limit)
    }

    pub fn events_for_conference(&self, conference_id: i64) -> Result<Vec<Event>, DbError> {
        self.db.lock().get_events_for_conference(conference_id)
    }

    /// Most viewed events across the cache.
    pub fn top_events(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        self.db.lock().get_top_viewed_events(limit)
    }

    pub fn promoted_events(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        self.db.lock().get_promoted_events(limit)
    }

    /// Cache-only lookup; never touches the network.
    pub fn event_by_guid(&self, guid: &str) -> Result<Option<Event>, DbError> {
        self.db.lock().get_event_by_guid(guid)
    }

    pub fn find_event_by_title(&self, title: &str) -> Result<Option<Event>, DbError> {
        self.db.lock().find_event_by_title(title)
    }

    pub fn recordings_for_event(&self, event_id: i64) -> Result<Vec<Recording>, DbError> {
        self.db.lock().get_recordings_for_event(event_id)
    }

    // -------------------------------------------------------------------
    // Watchlist
    // -------------------------------------------------------------------

    pub fn add_bookmark(&self, event_guid: &str) -> Result<(), DbError> {
        self.db.lock().add_watchlist_item(event_guid)
    }

    pub fn remove_bookmark(&self, event_guid: &str) -> Result<(), DbError> {
        self.db.lock().delete_watchlist_item(event_guid)
    }

    pub fn is_bookmarked(&self, event_guid: &str) -> Result<bool, DbError> {
        Ok(self.db.lock().get_watchlist_item(event_guid)?.is_some())
    }

    pub fn bookmarked_events(&self) -> Result<Vec<Event>, DbError> {
        self.db.lock().get_bookmarked_events()
    }

    // -------------------------------------------------------------------
    // Playback progress
    // -------------------------------------------------------------------

    /// Store the current playback position, stamped with wall-clock time.
    pub fn save_progress(&self, event_guid: &str, progress_millis: i64) -> Result<(), DbError> {
        let watched_at = Utc::now().timestamp_millis();
        self.db
            .lock()
            .save_playback_progress(event_guid, progress_millis, watched_at)
    }

    pub fn progress_for_event(
        &self,
        event_guid: &str,
    ) -> Result<Option<PlaybackProgress>, DbError> {
        self.db.lock().get_playback_progress(event_guid)
    }

    pub fn clear_progress(&self, event_guid: &str) -> Result<(), DbError> {
        self.db.lock().delete_playback_progress(event_guid)
    }

    /// "Continue watching" rows, most recently watched first.
    pub fn events_in_progress(&self) -> Result<Vec<ProgressEvent>, DbError> {
        self.db.lock().get_events_in_progress()
    }

    // -------------------------------------------------------------------
    // Recommendations
    // -------------------------------------------------------------------

    /// Derive home screen recommendations from the current cache state:
    /// the most viewed events on the popular channel and promoted events
    /// on the promoted channel. Dismissals stick across updates.
    pub fn update_home_recommendations(&self) -> Result<(), DbError> {
        let db = self.db.lock();
        for event in db.get_top_viewed_events(HOME_RECOMMENDATION_LIMIT)? {
            db.add_recommendation(&event.guid, CHANNEL_POPULAR)?;
        }
        for event in db.get_promoted_events(HOME_RECOMMENDATION_LIMIT)? {
            db.add_recommendation(&event.guid, CHANNEL_PROMOTED)?;
        }
        Ok(())
    }

    pub fn dismiss_recommendation(
        &self,
        event_guid: &str,
        channel: &str,
    ) -> Result<(), DbError> {
        self.db.lock().dismiss_recommendation(event_guid, channel)
    }

    pub fn active_recommendations(
        &self,
        channel: &str,
    ) -> Result<Vec<RecommendationEvent>, DbError> {
        self.db
            .lock()
            .get_active_recommendations(channel, HOME_RECOMMENDATION_LIMIT)
    }

    // -------------------------------------------------------------------
    // Offline events
    // -------------------------------------------------------------------

    /// Track a download handed to the platform download manager.
    pub fn register_download(
        &self,
        event_guid: &str,
        recording_id: i64,
        download_reference: i64,
        local_path: &str,
    ) -> Result<(), DbError> {
        self.db
            .lock()
            .add_offline_event(event_guid, recording_id, download_reference, local_path)
    }

    pub fn remove_download(&self, event_guid: &str) -> Result<(), DbError> {
        self.db.lock().delete_offline_event(event_guid)
    }

    pub fn offline_event(&self, event_guid: &str) -> Result<Option<OfflineEvent>, DbError> {
        self.db.lock().get_offline_event(event_guid)
    }

    pub fn offline_event_by_download_reference(
        &self,
        download_reference: i64,
    ) -> Result<Option<OfflineEvent>, DbError> {
        self.db
            .lock()
            .get_offline_event_by_download_reference(download_reference)
    }

    pub fn is_available_offline(&self, event_guid: &str) -> Result<bool, DbError> {
        Ok(self.db.lock().get_offline_event(event_guid)?.is_some())
    }

    pub fn offline_events(&self) -> Result<Vec<OfflineEvent>, DbError> {
        self.db.lock().get_all_offline_events()
    }

    /// Download-manager references of everything currently tracked, for
    /// reconciling against the platform's own download list.
    pub fn all_download_references(&self) -> Result<Vec<i64>, DbError> {
        self.db.lock().get_all_download_references()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{ConferenceDto, EventDto};
    use crate::db::test_utils::test_db;
    use crate::db::{NewConference, NewEvent};

    fn repo_with_events(specs: &[(&str, i64, bool)]) -> MediaRepository {
        let db = test_db();
        let group_id = db.get_or_create_group("congress", 1).expect("group");
        let conf = ConferenceDto {
            acronym: "36c3".into(),
            slug: "conferences/congress/36c3".into(),
            title: "36C3".into(),
            updated_at: None,
            logo_url: None,
            url: None,
            events: None,
        };
        let conf_id = db
            .upsert_conference(&NewConference::from_dto(&conf, group_id))
            .expect("conference");
        for (guid, view_count, promoted) in specs {
            let dto = EventDto {
                guid: guid.to_string(),
                title: format!("Talk {guid}"),
                view_count: *view_count,
                promoted: *promoted,
                ..serde_json::from_str("{}").expect("empty dto")
            };
            db.upsert_event(&NewEvent::from_dto(&dto, conf_id))
                .expect("event");
        }
        MediaRepository::new(Arc::new(Mutex::new(db)))
    }

    #[test]
    fn test_bookmark_round_trip() {
        let repo = repo_with_events(&[("g1", 10, false)]);

        assert!(!repo.is_bookmarked("g1").expect("check"));
        repo.add_bookmark("g1").expect("add");
        assert!(repo.is_bookmarked("g1").expect("check"));

        let events = repo.bookmarked_events().expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].guid, "g1");

        repo.remove_bookmark("g1").expect("remove");
        assert!(!repo.is_bookmarked("g1").expect("check"));
    }

    #[test]
    fn test_save_progress_stamps_time() {
        let repo = repo_with_events(&[("g1", 10, false)]);

        let before = Utc::now().timestamp_millis();
        repo.save_progress("g1", 90_000).expect("save");

        let progress = repo
            .progress_for_event("g1")
            .expect("get")
            .expect("exists");
        assert_eq!(progress.progress_millis, 90_000);
        assert!(progress.watched_at >= before);

        repo.clear_progress("g1").expect("clear");
        assert!(repo.progress_for_event("g1").expect("get").is_none());
    }

    #[test]
    fn test_home_recommendations_respect_dismissal() {
        let repo = repo_with_events(&[("popular", 500, false), ("featured", 5, true)]);

        repo.update_home_recommendations().expect("update");

        let popular = repo.active_recommendations(CHANNEL_POPULAR).expect("popular");
        assert_eq!(popular.len(), 2, "both events rank in the top viewed");
        let promoted = repo
            .active_recommendations(CHANNEL_PROMOTED)
            .expect("promoted");
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].event.guid, "featured");

        repo.dismiss_recommendation("featured", CHANNEL_PROMOTED)
            .expect("dismiss");
        // Updating again must not resurrect the dismissed entry
        repo.update_home_recommendations().expect("update again");
        assert!(repo
            .active_recommendations(CHANNEL_PROMOTED)
            .expect("promoted")
            .is_empty());
        // The same event stays active on the other channel
        assert_eq!(
            repo.active_recommendations(CHANNEL_POPULAR)
                .expect("popular")
                .len(),
            2
        );
    }

    #[test]
    fn test_top_events_limit() {
        let repo = repo_with_events(&[("a", 10, false), ("b", 300, false), ("c", 50, false)]);
        let top = repo.top_events(2).expect("top");
        let guids: Vec<&str> = top.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(guids, vec!["b", "c"]);
    }

    #[test]
    fn test_download_tracking() {
        let repo = repo_with_events(&[("g1", 10, false)]);

        assert!(!repo.is_available_offline("g1").expect("check"));
        repo.register_download("g1", 1, 42, "/downloads/talk.mp4")
            .expect("register");
        assert!(repo.is_available_offline("g1").expect("check"));
        assert_eq!(repo.all_download_references().expect("refs"), vec![42]);

        let by_ref = repo
            .offline_event_by_download_reference(42)
            .expect("by ref")
            .expect("exists");
        assert_eq!(by_ref.event_guid, "g1");

        repo.remove_download("g1").expect("remove");
        assert!(!repo.is_available_offline("g1").expect("check"));
        assert!(repo.all_download_references().expect("refs").is_empty());
    }

    #[test]
    fn test_event_by_guid_is_cache_only() {
        let repo = repo_with_events(&[("g1", 10, false)]);
        assert!(repo.event_by_guid("g1").expect("get").is_some());
        assert!(repo.event_by_guid("never-synced").expect("get").is_none());
    }
}
