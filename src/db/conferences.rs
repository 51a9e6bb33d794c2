//! Conference group and conference persistence.

use rusqlite::{params, OptionalExtension, Row};

use super::{Conference, ConferenceGroup, DbError, MediaDb, NewConference};

fn map_group(row: &Row<'_>) -> rusqlite::Result<ConferenceGroup> {
    Ok(ConferenceGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        sort_index: row.get(2)?,
    })
}

fn map_conference(row: &Row<'_>) -> rusqlite::Result<Conference> {
    Ok(Conference {
        id: row.get(0)?,
        acronym: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        url: row.get(4)?,
        logo_url: row.get(5)?,
        updated_at: row.get(6)?,
        conference_group_id: row.get(7)?,
    })
}

const CONFERENCE_COLS: &str =
    "id, acronym, title, slug, url, logo_url, updated_at, conference_group_id";

impl MediaDb {
    /// Look up a group by name, creating it with the given sort index if it
    /// does not exist yet. The sort index of an existing group is never
    /// changed.
    pub fn get_or_create_group(&self, name: &str, sort_index: i64) -> Result<i64, DbError> {
        self.conn_ref().execute(
            "INSERT OR IGNORE INTO conference_groups (name, sort_index) VALUES (?1, ?2)",
            params![name, sort_index],
        )?;
        let id = self.conn_ref().query_row(
            "SELECT id FROM conference_groups WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All groups in display order.
    pub fn get_conference_groups(&self) -> Result<Vec<ConferenceGroup>, DbError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, name, sort_index FROM conference_groups
             ORDER BY sort_index ASC, name ASC",
        )?;
        let rows = stmt.query_map([], map_group)?;
        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    /// Delete groups that no conference references anymore.
    pub fn delete_empty_groups(&self) -> Result<usize, DbError> {
        let deleted = self.conn_ref().execute(
            "DELETE FROM conference_groups
             WHERE id NOT IN (SELECT DISTINCT conference_group_id FROM conferences)",
            [],
        )?;
        Ok(deleted)
    }

    /// Insert or update a conference, matched by acronym. Returns the row id.
    ///
    /// A re-synced conference keeps its surrogate id so child events stay
    /// attached.
    pub fn upsert_conference(&self, conference: &NewConference) -> Result<i64, DbError> {
        self.with_transaction(|db| db.upsert_conference_tx(conference))
    }

    /// Upsert without opening a new transaction. For callers that already
    /// hold one.
    pub(crate) fn upsert_conference_tx(&self, conference: &NewConference) -> Result<i64, DbError> {
        let existing: Option<i64> = self
            .conn_ref()
            .query_row(
                "SELECT id FROM conferences WHERE acronym = ?1",
                params![conference.acronym],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                self.conn_ref().execute(
                    "UPDATE conferences
                     SET title = ?1, slug = ?2, url = ?3, logo_url = ?4,
                         updated_at = ?5, conference_group_id = ?6
                     WHERE id = ?7",
                    params![
                        conference.title,
                        conference.slug,
                        conference.url,
                        conference.logo_url,
                        conference.updated_at,
                        conference.conference_group_id,
                        id
                    ],
                )?;
                Ok(id)
            }
            None => {
                self.conn_ref().execute(
                    "INSERT INTO conferences
                     (acronym, title, slug, url, logo_url, updated_at, conference_group_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        conference.acronym,
                        conference.title,
                        conference.slug,
                        conference.url,
                        conference.logo_url,
                        conference.updated_at,
                        conference.conference_group_id
                    ],
                )?;
                Ok(self.conn_ref().last_insert_rowid())
            }
        }
    }

    pub fn get_conference_by_acronym(&self, acronym: &str) -> Result<Option<Conference>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {CONFERENCE_COLS} FROM conferences WHERE acronym = ?1"),
                params![acronym],
                map_conference,
            )
            .optional()?;
        Ok(result)
    }

    pub fn get_conference_by_id(&self, id: i64) -> Result<Option<Conference>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {CONFERENCE_COLS} FROM conferences WHERE id = ?1"),
                params![id],
                map_conference,
            )
            .optional()?;
        Ok(result)
    }

    /// All conferences in one group, newest first by title fallback.
    pub fn get_conferences_in_group(&self, group_id: i64) -> Result<Vec<Conference>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {CONFERENCE_COLS} FROM conferences
             WHERE conference_group_id = ?1
             ORDER BY updated_at IS NULL, updated_at DESC, title ASC"
        ))?;
        let rows = stmt.query_map(params![group_id], map_conference)?;
        let mut conferences = Vec::new();
        for row in rows {
            conferences.push(row?);
        }
        Ok(conferences)
    }

    /// The most recently updated conferences, for the home screen.
    /// Conferences without an `updated_at` sort last.
    pub fn get_latest_conferences(&self, limit: usize) -> Result<Vec<Conference>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {CONFERENCE_COLS} FROM conferences
             ORDER BY updated_at IS NULL, updated_at DESC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], map_conference)?;
        let mut conferences = Vec::new();
        for row in rows {
            conferences.push(row?);
        }
        Ok(conferences)
    }
}
