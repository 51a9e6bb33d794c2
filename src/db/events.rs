//! Event persistence and catalog queries.

use rusqlite::{params, OptionalExtension, Row};

use super::{DbError, Event, MediaDb, NewEvent, RelatedEvent};

pub(crate) fn map_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        guid: row.get(1)?,
        conference_id: row.get(2)?,
        title: row.get(3)?,
        subtitle: row.get(4)?,
        slug: row.get(5)?,
        link: row.get(6)?,
        description: row.get(7)?,
        original_language: row.get(8)?,
        persons_json: row.get(9)?,
        tags_json: row.get(10)?,
        date: row.get(11)?,
        release_date: row.get(12)?,
        updated_at: row.get(13)?,
        length: row.get(14)?,
        thumb_url: row.get(15)?,
        poster_url: row.get(16)?,
        frontend_link: row.get(17)?,
        url: row.get(18)?,
        conference_url: row.get(19)?,
        view_count: row.get(20)?,
        promoted: row.get(21)?,
    })
}

pub(crate) const EVENT_COLS: &str = "id, guid, conference_id, title, subtitle, slug, link, \
     description, original_language, persons_json, tags_json, date, release_date, updated_at, \
     length, thumb_url, poster_url, frontend_link, url, conference_url, view_count, promoted";

impl MediaDb {
    /// Insert or update an event, matched by guid. Returns the row id.
    ///
    /// A re-synced event keeps its surrogate id so recordings and related
    /// event rows stay attached.
    pub fn upsert_event(&self, event: &NewEvent) -> Result<i64, DbError> {
        self.with_transaction(|db| db.upsert_event_tx(event))
    }

    pub(crate) fn upsert_event_tx(&self, event: &NewEvent) -> Result<i64, DbError> {
        let existing: Option<i64> = self
            .conn_ref()
            .query_row(
                "SELECT id FROM events WHERE guid = ?1",
                params![event.guid],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                self.conn_ref().execute(
                    "UPDATE events
                     SET conference_id = ?1, title = ?2, subtitle = ?3, slug = ?4, link = ?5,
                         description = ?6, original_language = ?7, persons_json = ?8,
                         tags_json = ?9, date = ?10, release_date = ?11, updated_at = ?12,
                         length = ?13, thumb_url = ?14, poster_url = ?15, frontend_link = ?16,
                         url = ?17, conference_url = ?18, view_count = ?19, promoted = ?20
                     WHERE id = ?21",
                    params![
                        event.conference_id,
                        event.title,
                        event.subtitle,
                        event.slug,
                        event.link,
                        event.description,
                        event.original_language,
                        event.persons_json,
                        event.tags_json,
                        event.date,
                        event.release_date,
                        event.updated_at,
                        event.length,
                        event.thumb_url,
                        event.poster_url,
                        event.frontend_link,
                        event.url,
                        event.conference_url,
                        event.view_count,
                        event.promoted,
                        id
                    ],
                )?;
                Ok(id)
            }
            None => {
                self.conn_ref().execute(
                    "INSERT INTO events
                     (guid, conference_id, title, subtitle, slug, link, description,
                      original_language, persons_json, tags_json, date, release_date,
                      updated_at, length, thumb_url, poster_url, frontend_link, url,
                      conference_url, view_count, promoted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
                    params![
                        event.guid,
                        event.conference_id,
                        event.title,
                        event.subtitle,
                        event.slug,
                        event.link,
                        event.description,
                        event.original_language,
                        event.persons_json,
                        event.tags_json,
                        event.date,
                        event.release_date,
                        event.updated_at,
                        event.length,
                        event.thumb_url,
                        event.poster_url,
                        event.frontend_link,
                        event.url,
                        event.conference_url,
                        event.view_count,
                        event.promoted
                    ],
                )?;
                Ok(self.conn_ref().last_insert_rowid())
            }
        }
    }

    pub fn get_event_by_guid(&self, guid: &str) -> Result<Option<Event>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {EVENT_COLS} FROM events WHERE guid = ?1"),
                params![guid],
                map_event,
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_event_by_id(&self, id: i64) -> Result<Option<Event>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {EVENT_COLS} FROM events WHERE id = ?1"),
                params![id],
                map_event,
            )
            .optional()?;
        Ok(result)
    }

    /// Exact-title lookup within the local cache.
    pub fn find_event_by_title(&self, title: &str) -> Result<Option<Event>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {EVENT_COLS} FROM events WHERE title = ?1 LIMIT 1"),
                params![title],
                map_event,
            )
            .optional()?;
        Ok(result)
    }

    /// All events of one conference, newest release first.
    pub fn get_events_for_conference(&self, conference_id: i64) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {EVENT_COLS} FROM events
             WHERE conference_id = ?1
             ORDER BY release_date IS NULL, release_date DESC, title ASC"
        ))?;
        let rows = stmt.query_map(params![conference_id], map_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// The most viewed events across the whole cache, for the home screen.
    pub fn get_top_viewed_events(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {EVENT_COLS} FROM events
             ORDER BY view_count DESC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], map_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Promoted events, most viewed first.
    pub fn get_promoted_events(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {EVENT_COLS} FROM events
             WHERE promoted = 1
             ORDER BY view_count DESC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], map_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Replace the stored related-event references for an event.
    pub fn replace_related_events(
        &self,
        event_id: i64,
        related_guids: &[String],
    ) -> Result<(), DbError> {
        self.with_transaction(|db| db.replace_related_events_tx(event_id, related_guids))
    }

    pub(crate) fn replace_related_events_tx(
        &self,
        event_id: i64,
        related_guids: &[String],
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM related_events WHERE event_id = ?1",
            params![event_id],
        )?;
        for guid in related_guids {
            self.conn_ref().execute(
                "INSERT OR IGNORE INTO related_events (event_id, related_event_guid)
                 VALUES (?1, ?2)",
                params![event_id, guid],
            )?;
        }
        Ok(())
    }

    /// Stored related-event references for an event.
    pub fn get_related_events(&self, event_id: i64) -> Result<Vec<RelatedEvent>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, event_id, related_event_guid FROM related_events
             WHERE event_id = ?1",
        )?;
        let rows = stmt.query_map(params![event_id], |row| {
            Ok(RelatedEvent {
                id: row.get(0)?,
                event_id: row.get(1)?,
                related_event_guid: row.get(2)?,
            })
        })?;
        let mut related = Vec::new();
        for row in rows {
            related.push(row?);
        }
        Ok(related)
    }
}
