//! User data persistence: watchlist, playback progress, recommendations,
//! offline events.
//!
//! Everything here is keyed by event GUID rather than the surrogate event
//! id, so rows survive a full catalog re-sync or wipe.

use rusqlite::{params, OptionalExtension, Row};

use super::events::{map_event, EVENT_COLS};
use super::{
    DbError, Event, MediaDb, OfflineEvent, PlaybackProgress, ProgressEvent, Recommendation,
    RecommendationEvent, WatchlistItem,
};

fn map_offline_event(row: &Row<'_>) -> rusqlite::Result<OfflineEvent> {
    Ok(OfflineEvent {
        id: row.get(0)?,
        event_guid: row.get(1)?,
        recording_id: row.get(2)?,
        download_reference: row.get(3)?,
        local_path: row.get(4)?,
    })
}

impl MediaDb {
    // -------------------------------------------------------------------
    // Watchlist
    // -------------------------------------------------------------------

    /// Bookmark an event. Idempotent.
    pub fn add_watchlist_item(&self, event_guid: &str) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT OR IGNORE INTO watchlist (event_guid) VALUES (?1)",
            params![event_guid],
        )?;
        Ok(())
    }

    pub fn delete_watchlist_item(&self, event_guid: &str) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM watchlist WHERE event_guid = ?1",
            params![event_guid],
        )?;
        Ok(())
    }

    pub fn get_watchlist_item(&self, event_guid: &str) -> Result<Option<WatchlistItem>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                "SELECT event_guid, created_at FROM watchlist WHERE event_guid = ?1",
                params![event_guid],
                |row| {
                    Ok(WatchlistItem {
                        event_guid: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Cached events that are bookmarked, newest bookmark first. Bookmarks
    /// whose event is not in the cache are skipped.
    pub fn get_bookmarked_events(&self) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {} FROM events e
             JOIN watchlist w ON w.event_guid = e.guid
             ORDER BY w.created_at DESC",
            qualified_event_cols()
        ))?;
        let rows = stmt.query_map([], map_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    // -------------------------------------------------------------------
    // Playback progress
    // -------------------------------------------------------------------

    /// Store the playback position of an event, overwriting any previous
    /// position.
    pub fn save_playback_progress(
        &self,
        event_guid: &str,
        progress_millis: i64,
        watched_at: i64,
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO playback_progress (event_guid, progress_millis, watched_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(event_guid) DO UPDATE SET
                progress_millis = excluded.progress_millis,
                watched_at = excluded.watched_at",
            params![event_guid, progress_millis, watched_at],
        )?;
        Ok(())
    }

    pub fn get_playback_progress(
        &self,
        event_guid: &str,
    ) -> Result<Option<PlaybackProgress>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                "SELECT event_guid, progress_millis, watched_at
                 FROM playback_progress WHERE event_guid = ?1",
                params![event_guid],
                map_progress,
            )
            .optional()?;
        Ok(result)
    }

    pub fn delete_playback_progress(&self, event_guid: &str) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM playback_progress WHERE event_guid = ?1",
            params![event_guid],
        )?;
        Ok(())
    }

    /// Cached events with saved progress, most recently watched first.
    pub fn get_events_in_progress(&self) -> Result<Vec<ProgressEvent>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {}, p.event_guid, p.progress_millis, p.watched_at
             FROM events e
             JOIN playback_progress p ON p.event_guid = e.guid
             ORDER BY p.watched_at DESC",
            qualified_event_cols()
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(ProgressEvent {
                event: map_event(row)?,
                progress: PlaybackProgress {
                    event_guid: row.get(22)?,
                    progress_millis: row.get(23)?,
                    watched_at: row.get(24)?,
                },
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    // -------------------------------------------------------------------
    // Recommendations
    // -------------------------------------------------------------------

    /// Record a recommendation for an event on a channel. Re-recommending
    /// an already dismissed event on the same channel leaves it dismissed.
    pub fn add_recommendation(&self, event_guid: &str, channel: &str) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT OR IGNORE INTO recommendations (event_guid, channel) VALUES (?1, ?2)",
            params![event_guid, channel],
        )?;
        Ok(())
    }

    /// Dismiss a recommendation so it no longer surfaces on that channel.
    pub fn dismiss_recommendation(&self, event_guid: &str, channel: &str) -> Result<(), DbError> {
        self.conn_ref().execute(
            "UPDATE recommendations SET dismissed = 1
             WHERE event_guid = ?1 AND channel = ?2",
            params![event_guid, channel],
        )?;
        Ok(())
    }

    /// Non-dismissed recommendations on a channel, joined with their cached
    /// events. Newest recommendation first.
    pub fn get_active_recommendations(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<RecommendationEvent>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {}, r.id, r.event_guid, r.channel, r.dismissed, r.created_at
             FROM events e
             JOIN recommendations r ON r.event_guid = e.guid
             WHERE r.channel = ?1 AND r.dismissed = 0
             ORDER BY r.created_at DESC
             LIMIT ?2",
            qualified_event_cols()
        ))?;
        let rows = stmt.query_map(params![channel, limit as i64], |row| {
            Ok(RecommendationEvent {
                event: map_event(row)?,
                recommendation: Recommendation {
                    id: row.get(22)?,
                    event_guid: row.get(23)?,
                    channel: row.get(24)?,
                    dismissed: row.get(25)?,
                    created_at: row.get(26)?,
                },
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    // -------------------------------------------------------------------
    // Offline events
    // -------------------------------------------------------------------

    /// Register a completed or in-flight download for an event.
    pub fn add_offline_event(
        &self,
        event_guid: &str,
        recording_id: i64,
        download_reference: i64,
        local_path: &str,
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "INSERT INTO offline_events (event_guid, recording_id, download_reference, local_path)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(event_guid) DO UPDATE SET
                recording_id = excluded.recording_id,
                download_reference = excluded.download_reference,
                local_path = excluded.local_path",
            params![event_guid, recording_id, download_reference, local_path],
        )?;
        Ok(())
    }

    pub fn get_offline_event(&self, event_guid: &str) -> Result<Option<OfflineEvent>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                "SELECT id, event_guid, recording_id, download_reference, local_path
                 FROM offline_events WHERE event_guid = ?1",
                params![event_guid],
                map_offline_event,
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_offline_event_by_download_reference(
        &self,
        download_reference: i64,
    ) -> Result<Option<OfflineEvent>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                "SELECT id, event_guid, recording_id, download_reference, local_path
                 FROM offline_events WHERE download_reference = ?1",
                params![download_reference],
                map_offline_event,
            )
            .optional()?;
        Ok(result)
    }

    pub fn delete_offline_event(&self, event_guid: &str) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM offline_events WHERE event_guid = ?1",
            params![event_guid],
        )?;
        Ok(())
    }

    pub fn get_all_offline_events(&self) -> Result<Vec<OfflineEvent>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, event_guid, recording_id, download_reference, local_path
             FROM offline_events ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], map_offline_event)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Download-manager references of all tracked downloads.
    pub fn get_all_download_references(&self) -> Result<Vec<i64>, DbError> {
        let mut stmt = self
            .conn_ref()
            .prepare("SELECT download_reference FROM offline_events")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut refs = Vec::new();
        for row in rows {
            refs.push(row?);
        }
        Ok(refs)
    }
}

fn map_progress(row: &Row<'_>) -> rusqlite::Result<PlaybackProgress> {
    Ok(PlaybackProgress {
        event_guid: row.get(0)?,
        progress_millis: row.get(1)?,
        watched_at: row.get(2)?,
    })
}

/// `EVENT_COLS` with every column prefixed `e.`, for joins.
fn qualified_event_cols() -> String {
    EVENT_COLS
        .split(", ")
        .map(|c| format!("e.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
