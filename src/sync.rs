//! Sync engine: pulls the remote catalog into the local cache.
//!
//! Long-running refreshes run on background tasks and report progress
//! through [`StatusStream`] handles. Failures never take other refreshes
//! down with them, and nothing here retries on its own: callers decide
//! when to ask again.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::dto::{ConferencesResponse, EventDto};
use crate::api::RecordingApi;
use crate::db::{
    Conference, Event, MediaDb, NewConference, NewEvent, NewRecording, Recording,
};
use crate::error::SyncError;
use crate::status::{self, StatusStream};
use crate::util;
use crate::worker::WorkerPool;

/// One page of search results, with the events already written to the
/// cache.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub events: Vec<Event>,
    /// Total match count across all pages.
    pub total: u32,
    /// Pagination links keyed by `rel`.
    pub links: HashMap<String, String>,
}

impl SearchResult {
    pub fn has_next(&self) -> bool {
        self.links.contains_key("next")
    }

    pub fn has_prev(&self) -> bool {
        self.links.contains_key("prev")
    }
}

pub struct SyncEngine {
    api: Arc<dyn RecordingApi>,
    db: Arc<Mutex<MediaDb>>,
    workers: WorkerPool,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn RecordingApi>, db: Arc<Mutex<MediaDb>>) -> Self {
        Self {
            api,
            db,
            workers: WorkerPool::new(),
        }
    }

    /// Abort all in-flight background refreshes.
    pub fn shutdown(&self) {
        self.workers.shutdown();
    }

    // -------------------------------------------------------------------
    // Background refreshes
    // -------------------------------------------------------------------

    /// Fetch the full conference list and merge it into the cache.
    ///
    /// Returns immediately; progress arrives on the stream.
    pub fn refresh_conferences(&self) -> StatusStream<Vec<Conference>> {
        let (tx, stream) = status::channel();
        let api = Arc::clone(&self.api);
        let db = Arc::clone(&self.db);

        self.workers.spawn(async move {
            match api.conferences().await {
                Ok(response) => match save_conferences(&db, &response) {
                    Ok(conferences) => {
                        log::info!("Synced {} conferences", conferences.len());
                        tx.done(conferences);
                    }
                    Err(e) => {
                        log::warn!("Failed to store conference list: {e}");
                        tx.fail(e.to_string());
                    }
                },
                Err(e) => {
                    log::warn!("Conference list fetch failed: {e}");
                    tx.fail(e.to_string());
                }
            }
        });

        stream
    }

    /// Fetch one conference with its event list and merge it into the
    /// cache.
    pub fn refresh_events_for_conference(&self, acronym: &str) -> StatusStream<Vec<Event>> {
        let (tx, stream) = status::channel();
        let api = Arc::clone(&self.api);
        let db = Arc::clone(&self.db);
        let acronym = acronym.to_string();

        self.workers.spawn(async move {
            match api.conference_by_acronym(&acronym).await {
                Ok(conference) => {
                    let dtos = conference.events.unwrap_or_default();
                    let mut events = Vec::with_capacity(dtos.len());
                    let mut failed = 0usize;
                    for dto in &dtos {
                        match save_event(&api, &db, dto).await {
                            Ok(event) => events.push(event),
                            Err(e) => {
                                failed += 1;
                                log::warn!("Skipping event '{}': {e}", dto.guid);
                            }
                        }
                    }
                    if failed > 0 {
                        log::warn!(
                            "Synced {} events for {acronym}, {failed} skipped",
                            events.len()
                        );
                    } else {
                        log::info!("Synced {} events for {acronym}", events.len());
                    }
                    tx.done(events);
                }
                Err(e) => {
                    log::warn!("Event list fetch for {acronym} failed: {e}");
                    tx.fail(e.to_string());
                }
            }
        });

        stream
    }

    /// Fetch one event's detail and merge its recordings into the cache.
    pub fn refresh_recordings_for_event(&self, guid: &str) -> StatusStream<Vec<Recording>> {
        let (tx, stream) = status::channel();
        let api = Arc::clone(&self.api);
        let db = Arc::clone(&self.db);
        let guid = guid.to_string();

        self.workers.spawn(async move {
            match api.event_by_guid(&guid).await {
                Ok(dto) => {
                    let saved = async {
                        let event = save_event(&api, &db, &dto).await?;
                        let db = db.lock();
                        db.get_recordings_for_event(event.id).map_err(SyncError::from)
                    }
                    .await;
                    match saved {
                        Ok(recordings) => {
                            log::info!("Synced {} recordings for {guid}", recordings.len());
                            tx.done(recordings);
                        }
                        Err(e) => {
                            log::warn!("Failed to store recordings for {guid}: {e}");
                            tx.fail(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Event fetch for {guid} failed: {e}");
                    tx.fail(e.to_string());
                }
            }
        });

        stream
    }

    // -------------------------------------------------------------------
    // Direct operations
    // -------------------------------------------------------------------

    /// Fetch one event by GUID and merge it into the cache.
    ///
    /// A 404 is not an error: the event simply does not exist remotely
    /// and `Ok(None)` is returned. Anything else surfaces as `Err`.
    pub async fn try_refresh_single_event(
        &self,
        guid: &str,
    ) -> Result<Option<Event>, SyncError> {
        match self.api.event_by_guid(guid).await {
            Ok(dto) => {
                let event = save_event(&self.api, &self.db, &dto).await?;
                Ok(Some(event))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(SyncError::from(e)),
        }
    }

    /// Best-effort variant of [`try_refresh_single_event`] that flattens
    /// failures to `None`, logging them instead.
    ///
    /// [`try_refresh_single_event`]: Self::try_refresh_single_event
    pub async fn refresh_single_event(&self, guid: &str) -> Option<Event> {
        match self.try_refresh_single_event(guid).await {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Refresh of event {guid} failed: {e}");
                None
            }
        }
    }

    /// Look up an event in the cache, fetching it from the API on a miss.
    pub async fn event_for_guid(&self, guid: &str) -> Result<Option<Event>, SyncError> {
        let cached = {
            let db = self.db.lock();
            db.get_event_by_guid(guid)?
        };
        if cached.is_some() {
            return Ok(cached);
        }
        self.try_refresh_single_event(guid).await
    }

    /// Events related to the given cached event. References whose target
    /// is missing from the cache are fetched best-effort; unresolvable
    /// ones are skipped.
    pub async fn related_events(&self, event_id: i64) -> Result<Vec<Event>, SyncError> {
        let references = {
            let db = self.db.lock();
            db.get_related_events(event_id)?
        };

        let mut events = Vec::with_capacity(references.len());
        for reference in references {
            let cached = {
                let db = self.db.lock();
                db.get_event_by_guid(&reference.related_event_guid)?
            };
            match cached {
                Some(event) => events.push(event),
                None => {
                    if let Some(event) =
                        self.refresh_single_event(&reference.related_event_guid).await
                    {
                        events.push(event);
                    }
                }
            }
        }
        Ok(events)
    }

    /// Run a keyword search against the API and cache every returned
    /// event.
    ///
    /// Returns `None` when the request itself fails. Events that cannot
    /// be stored are logged and skipped, not fatal to the page.
    pub async fn search_events(&self, query: &str, page: u32) -> Option<SearchResult> {
        let page_result = match self.api.search_events(query, page).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Search for '{query}' failed: {e}");
                return None;
            }
        };

        let mut events = Vec::with_capacity(page_result.events.len());
        for dto in &page_result.events {
            match save_event(&self.api, &self.db, dto).await {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Skipping search hit '{}': {e}", dto.guid),
            }
        }

        Some(SearchResult {
            events,
            total: page_result.total,
            links: page_result.links,
        })
    }

    /// Wipe all synced catalog data. User data stays.
    pub fn clear_synced_data(&self) -> Result<(), SyncError> {
        let db = self.db.lock();
        db.clear_synced_data()?;
        Ok(())
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Merge a conference listing into the cache.
///
/// Conferences are grouped by the series segment of their slug; unknown
/// series land in the catch-all group. Groups left without conferences
/// after the merge are removed. One transaction per call.
fn save_conferences(
    db: &Mutex<MediaDb>,
    response: &ConferencesResponse,
) -> Result<Vec<Conference>, SyncError> {
    let db = db.lock();
    let stored = db.with_transaction(|db| {
        let mut stored = Vec::with_capacity(response.conferences.len());
        for dto in &response.conferences {
            let series = util::series_name(&dto.slug);
            let group_id =
                db.get_or_create_group(series, util::series_sort_index(series))?;
            let id = db.upsert_conference_tx(&NewConference::from_dto(dto, group_id))?;
            if let Some(conference) = db.get_conference_by_id(id)? {
                stored.push(conference);
            }
        }
        db.delete_empty_groups()?;
        Ok(stored)
    })?;
    Ok(stored)
}

/// Merge one event into the cache, resolving its conference by acronym.
///
/// If the conference is not cached yet, the conference list is fetched
/// once and merged before giving up. Recordings and related references
/// are replaced only when the DTO actually carries them; the list
/// endpoints omit both and must not wipe previously synced detail.
async fn save_event(
    api: &Arc<dyn RecordingApi>,
    db: &Mutex<MediaDb>,
    dto: &EventDto,
) -> Result<Event, SyncError> {
    let acronym = dto
        .conference_acronym()
        .ok_or_else(|| SyncError::MissingConferenceUrl(dto.guid.clone()))?
        .to_string();

    let mut conference = {
        let db = db.lock();
        db.get_conference_by_acronym(&acronym)?
    };

    if conference.is_none() {
        log::info!("Conference {acronym} not cached yet, refreshing conference list");
        let response = api.conferences().await?;
        save_conferences(db, &response)?;
        conference = {
            let db = db.lock();
            db.get_conference_by_acronym(&acronym)?
        };
    }

    let conference = conference.ok_or_else(|| SyncError::UnknownConference(acronym))?;

    let db = db.lock();
    db.with_transaction(|db| {
        let event_id = db.upsert_event_tx(&NewEvent::from_dto(dto, conference.id))?;

        if let Some(recordings) = &dto.recordings {
            let rows: Vec<NewRecording> = recordings
                .iter()
                .map(|r| NewRecording::from_dto(r, event_id))
                .collect();
            db.replace_recordings_tx(event_id, &rows)?;
        }

        if let Some(related) = &dto.related {
            let guids: Vec<String> =
                related.iter().map(|r| r.event_guid.clone()).collect();
            db.replace_related_events_tx(event_id, &guids)?;
        }

        db.get_event_by_id(event_id)?.ok_or_else(|| {
            crate::db::DbError::Migration("event vanished inside transaction".to_string())
        })
    })
    .map_err(SyncError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{ConferenceDto, RecordingDto, RelatedEventDto};
    use crate::api::{ApiError, SearchPage};
    use crate::db::test_utils::test_db;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -------------------------------------------------------------------
    // Programmable fake API
    // -------------------------------------------------------------------

    #[derive(Clone, Copy)]
    enum MockFailure {
        Status(u16),
        Network,
    }

    impl MockFailure {
        fn to_error(self) -> ApiError {
            match self {
                MockFailure::Status(status) => ApiError::Status {
                    status,
                    message: "mock".to_string(),
                },
                MockFailure::Network => ApiError::Network {
                    reason: "mock connection refused".to_string(),
                },
            }
        }
    }

    #[derive(Default)]
    struct MockApi {
        conferences: Mutex<Option<ConferencesResponse>>,
        conference_details: Mutex<HashMap<String, ConferenceDto>>,
        events: Mutex<HashMap<String, EventDto>>,
        search: Mutex<Option<SearchPage>>,
        fail_all: Mutex<Option<MockFailure>>,
        conference_calls: AtomicUsize,
        event_calls: AtomicUsize,
    }

    impl MockApi {
        fn with_conferences(self, response: ConferencesResponse) -> Self {
            *self.conferences.lock() = Some(response);
            self
        }

        fn with_event(self, dto: EventDto) -> Self {
            self.events.lock().insert(dto.guid.clone(), dto);
            self
        }

        fn with_conference_detail(self, dto: ConferenceDto) -> Self {
            self.conference_details
                .lock()
                .insert(dto.acronym.clone(), dto);
            self
        }

        fn with_search(self, page: SearchPage) -> Self {
            *self.search.lock() = Some(page);
            self
        }

        fn failing(self, failure: MockFailure) -> Self {
            *self.fail_all.lock() = Some(failure);
            self
        }

        fn check_failure(&self) -> Result<(), ApiError> {
            match *self.fail_all.lock() {
                Some(failure) => Err(failure.to_error()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RecordingApi for MockApi {
        async fn conferences(&self) -> Result<ConferencesResponse, ApiError> {
            self.conference_calls.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;
            self.conferences.lock().clone().ok_or(ApiError::Status {
                status: 404,
                message: "no canned conferences".to_string(),
            })
        }

        async fn conference_by_acronym(
            &self,
            acronym: &str,
        ) -> Result<ConferenceDto, ApiError> {
            self.check_failure()?;
            self.conference_details
                .lock()
                .get(acronym)
                .cloned()
                .ok_or(ApiError::Status {
                    status: 404,
                    message: "unknown conference".to_string(),
                })
        }

        async fn event_by_guid(&self, guid: &str) -> Result<EventDto, ApiError> {
            self.event_calls.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;
            self.events.lock().get(guid).cloned().ok_or(ApiError::Status {
                status: 404,
                message: "unknown event".to_string(),
            })
        }

        async fn search_events(&self, _query: &str, _page: u32) -> Result<SearchPage, ApiError> {
            self.check_failure()?;
            self.search.lock().clone().ok_or(ApiError::Status {
                status: 404,
                message: "no canned search".to_string(),
            })
        }
    }

    // -------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------

    fn conference_dto(acronym: &str, series: &str) -> ConferenceDto {
        ConferenceDto {
            acronym: acronym.to_string(),
            slug: format!("conferences/{series}/{acronym}"),
            title: format!("Conference {acronym}"),
            updated_at: Some("2020-01-10T10:00:00Z".to_string()),
            logo_url: None,
            url: Some(format!(
                "https://api.example.org/public/conferences/{acronym}"
            )),
            events: None,
        }
    }

    fn event_dto(guid: &str, acronym: &str) -> EventDto {
        EventDto {
            guid: guid.to_string(),
            title: format!("Talk {guid}"),
            slug: format!("talk-{guid}"),
            conference_url: format!("https://api.example.org/public/conferences/{acronym}"),
            ..serde_json::from_str("{}").expect("empty dto")
        }
    }

    fn listing(confs: &[(&str, &str)]) -> ConferencesResponse {
        ConferencesResponse {
            conferences: confs
                .iter()
                .map(|(acronym, series)| conference_dto(acronym, series))
                .collect(),
        }
    }

    fn engine(api: MockApi) -> SyncEngine {
        SyncEngine::new(Arc::new(api), Arc::new(Mutex::new(test_db())))
    }

    // -------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_conferences_groups_by_series() {
        let api = MockApi::default().with_conferences(listing(&[
            ("36c3", "congress"),
            ("35c3", "congress"),
            ("camp2023", "camp"),
            ("oddcon", "weirdness"),
        ]));
        let engine = engine(api);

        let status = engine.refresh_conferences().terminal().await;
        let conferences = status.into_data().expect("sync should succeed");
        assert_eq!(conferences.len(), 4);

        let db = engine.db.lock();
        let groups = db.get_conference_groups().expect("groups");
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        // "weirdness" is not a known series and gets index 0, tying with
        // congress; the name breaks the tie. camp follows at index 1.
        assert_eq!(names, vec!["congress", "weirdness", "camp"]);

        let congress = groups.iter().find(|g| g.name == "congress").expect("congress");
        assert_eq!(
            db.get_conferences_in_group(congress.id).expect("members").len(),
            2
        );
    }

    #[tokio::test]
    async fn test_resync_preserves_conference_ids() {
        let api = MockApi::default().with_conferences(listing(&[("36c3", "congress")]));
        let engine = engine(api);

        let first = engine
            .refresh_conferences()
            .terminal()
            .await
            .into_data()
            .expect("first sync");
        let second = engine
            .refresh_conferences()
            .terminal()
            .await
            .into_data()
            .expect("second sync");
        assert_eq!(first[0].id, second[0].id);
    }

    #[tokio::test]
    async fn test_refresh_conferences_failure_reaches_stream() {
        let api = MockApi::default().failing(MockFailure::Network);
        let engine = engine(api);

        let status = engine.refresh_conferences().terminal().await;
        let error = status.error().expect("should fail");
        assert!(error.contains("connection refused"), "got: {error}");

        // A failed refresh leaves the cache untouched
        let db = engine.db.lock();
        assert!(db.get_conference_groups().expect("groups").is_empty());
    }

    #[tokio::test]
    async fn test_conference_without_events_is_done_empty() {
        // Detail endpoint carries no events list at all
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_conference_detail(conference_dto("36c3", "congress"));
        let engine = engine(api);

        let events = engine
            .refresh_events_for_conference("36c3")
            .terminal()
            .await
            .into_data()
            .expect("empty conference is not an error");
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_events_for_conference() {
        let mut detail = conference_dto("36c3", "congress");
        detail.events = Some(vec![event_dto("g1", "36c3"), event_dto("g2", "36c3")]);
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_conference_detail(detail);
        let engine = engine(api);

        let events = engine
            .refresh_events_for_conference("36c3")
            .terminal()
            .await
            .into_data()
            .expect("sync");
        assert_eq!(events.len(), 2);

        let db = engine.db.lock();
        assert!(db.get_event_by_guid("g1").expect("get").is_some());
        assert!(db.get_event_by_guid("g2").expect("get").is_some());
    }

    #[tokio::test]
    async fn test_save_event_resolves_conference_via_listing_fetch() {
        // The event arrives before its conference is cached; saving it
        // must trigger exactly one conference list fetch.
        let api = Arc::new(
            MockApi::default()
                .with_conferences(listing(&[("36c3", "congress")]))
                .with_event(event_dto("g1", "36c3")),
        );
        let engine = SyncEngine::new(api.clone(), Arc::new(Mutex::new(test_db())));

        let event = engine
            .try_refresh_single_event("g1")
            .await
            .expect("refresh")
            .expect("event exists");
        assert_eq!(event.guid, "g1");
        assert_eq!(api.conference_calls.load(Ordering::SeqCst), 1);

        // Saving a second event against the now-cached conference must
        // not fetch the listing again.
        let dto = event_dto("g2", "36c3");
        save_event(&engine.api, &engine.db, &dto)
            .await
            .expect("second save");
        assert_eq!(api.conference_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_event_unknown_conference() {
        // Conference listing does not contain the event's conference.
        let api = MockApi::default()
            .with_conferences(listing(&[("camp2023", "camp")]))
            .with_event(event_dto("g1", "36c3"));
        let engine = engine(api);

        let result = engine.try_refresh_single_event("g1").await;
        match result {
            Err(SyncError::UnknownConference(acronym)) => assert_eq!(acronym, "36c3"),
            other => panic!("expected UnknownConference, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_try_refresh_single_event_distinguishes_missing_from_failure() {
        let api = MockApi::default().with_conferences(listing(&[("36c3", "congress")]));
        let engine = engine(api);

        // 404 from the canned map
        let missing = engine.try_refresh_single_event("nope").await.expect("ok");
        assert!(missing.is_none());

        // A server error is a real error
        let api = MockApi::default().failing(MockFailure::Status(500));
        let engine = self::engine(api);
        assert!(engine.try_refresh_single_event("g1").await.is_err());

        // The best-effort wrapper flattens both to None
        assert!(engine.refresh_single_event("g1").await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_recordings_replaces_stale_set() {
        let mut dto = event_dto("g1", "36c3");
        dto.recordings = Some(vec![
            RecordingDto {
                size: 100,
                length: 1800,
                mime_type: "video/mp4".into(),
                language: Some("eng".into()),
                filename: Some("talk.mp4".into()),
                high_quality: true,
                width: 1920,
                height: 1080,
                recording_url: Some("https://cdn.example.org/talk.mp4".into()),
                url: None,
            },
        ]);
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_event(dto.clone());
        let engine = engine(api);

        let recordings = engine
            .refresh_recordings_for_event("g1")
            .terminal()
            .await
            .into_data()
            .expect("sync");
        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].height, 1080);

        // Second sync with a different set replaces, never accumulates
        {
            let updated = EventDto {
                recordings: Some(vec![RecordingDto {
                    size: 50,
                    length: 1800,
                    mime_type: "video/webm".into(),
                    language: None,
                    filename: None,
                    high_quality: false,
                    width: 1024,
                    height: 576,
                    recording_url: Some("https://cdn.example.org/talk.webm".into()),
                    url: None,
                }]),
                ..dto
            };
            // Fresh mock with the updated canned event, same database
            let api = MockApi::default()
                .with_conferences(listing(&[("36c3", "congress")]))
                .with_event(updated);
            let engine2 = SyncEngine::new(Arc::new(api), Arc::clone(&engine.db));
            let recordings = engine2
                .refresh_recordings_for_event("g1")
                .terminal()
                .await
                .into_data()
                .expect("second sync");
            assert_eq!(recordings.len(), 1);
            assert_eq!(recordings[0].height, 576);
        }
    }

    #[tokio::test]
    async fn test_list_sync_does_not_wipe_recordings() {
        // Detail sync first, storing recordings
        let mut dto = event_dto("g1", "36c3");
        dto.recordings = Some(vec![RecordingDto {
            size: 100,
            length: 1800,
            mime_type: "video/mp4".into(),
            language: None,
            filename: None,
            high_quality: true,
            width: 1920,
            height: 1080,
            recording_url: Some("https://cdn.example.org/talk.mp4".into()),
            url: None,
        }]);
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_event(dto);
        let engine = engine(api);
        engine
            .try_refresh_single_event("g1")
            .await
            .expect("detail sync")
            .expect("event");

        // Now a list-shaped sync of the same event (no recordings field)
        let mut detail = conference_dto("36c3", "congress");
        detail.events = Some(vec![event_dto("g1", "36c3")]);
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_conference_detail(detail);
        let engine2 = SyncEngine::new(Arc::new(api), Arc::clone(&engine.db));
        engine2
            .refresh_events_for_conference("36c3")
            .terminal()
            .await
            .into_data()
            .expect("list sync");

        let db = engine.db.lock();
        let event = db.get_event_by_guid("g1").expect("get").expect("exists");
        assert_eq!(
            db.get_recordings_for_event(event.id).expect("recordings").len(),
            1,
            "list sync must not wipe detail data"
        );
    }

    #[tokio::test]
    async fn test_related_events_fetches_missing_targets() {
        let mut dto = event_dto("g1", "36c3");
        dto.related = Some(vec![
            RelatedEventDto {
                event_guid: "g2".to_string(),
            },
            RelatedEventDto {
                event_guid: "gone".to_string(),
            },
        ]);
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_event(dto)
            .with_event(event_dto("g2", "36c3"));
        let engine = engine(api);

        let event = engine
            .try_refresh_single_event("g1")
            .await
            .expect("refresh")
            .expect("event");

        let related = engine.related_events(event.id).await.expect("related");
        // g2 resolved via on-demand fetch, "gone" 404s and is skipped
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].guid, "g2");
    }

    #[tokio::test]
    async fn test_search_saves_hits_and_reports_pagination() {
        let mut links = HashMap::new();
        links.insert(
            "next".to_string(),
            "https://api.example.org/public/events/search?p=2".to_string(),
        );
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_search(SearchPage {
                events: vec![event_dto("g1", "36c3"), event_dto("g2", "36c3")],
                total: 42,
                links,
            });
        let engine = engine(api);

        let result = engine.search_events("camera", 1).await.expect("search");
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.total, 42);
        assert!(result.has_next());
        assert!(!result.has_prev());

        // Hits are persisted
        let db = engine.db.lock();
        assert!(db.get_event_by_guid("g1").expect("get").is_some());
    }

    #[tokio::test]
    async fn test_search_failure_is_none() {
        let api = MockApi::default().failing(MockFailure::Network);
        let engine = engine(api);
        assert!(engine.search_events("camera", 1).await.is_none());
    }

    #[tokio::test]
    async fn test_search_skips_unsavable_hits() {
        // One hit has no conference_url at all
        let mut broken = event_dto("broken", "36c3");
        broken.conference_url = String::new();
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_search(SearchPage {
                events: vec![event_dto("g1", "36c3"), broken],
                total: 2,
                links: HashMap::new(),
            });
        let engine = engine(api);

        let result = engine.search_events("camera", 1).await.expect("search");
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].guid, "g1");
    }

    #[tokio::test]
    async fn test_event_for_guid_prefers_cache() {
        let api = Arc::new(
            MockApi::default()
                .with_conferences(listing(&[("36c3", "congress")]))
                .with_event(event_dto("g1", "36c3")),
        );
        let engine = SyncEngine::new(api.clone(), Arc::new(Mutex::new(test_db())));

        // miss: fetches once
        let event = engine.event_for_guid("g1").await.expect("ok");
        assert!(event.is_some());
        assert_eq!(api.event_calls.load(Ordering::SeqCst), 1);

        // hit: served from the cache, no further fetch
        let cached = engine.event_for_guid("g1").await.expect("ok");
        assert!(cached.is_some());
        assert_eq!(api.event_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_synced_data_keeps_user_rows() {
        let api = MockApi::default()
            .with_conferences(listing(&[("36c3", "congress")]))
            .with_event(event_dto("g1", "36c3"));
        let engine = engine(api);
        engine
            .try_refresh_single_event("g1")
            .await
            .expect("sync")
            .expect("event");

        {
            let db = engine.db.lock();
            db.add_watchlist_item("g1").expect("bookmark");
        }

        engine.clear_synced_data().expect("clear");

        let db = engine.db.lock();
        assert!(db.get_event_by_guid("g1").expect("get").is_none());
        assert!(db.get_watchlist_item("g1").expect("get").is_some());
    }
}
