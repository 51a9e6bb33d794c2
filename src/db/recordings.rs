//! Recording persistence.
//!
//! Recordings have no natural key of their own, so a refresh replaces the
//! full set for an event instead of upserting row by row.

use rusqlite::{params, OptionalExtension, Row};

use super::{DbError, MediaDb, NewRecording, Recording};

fn map_recording(row: &Row<'_>) -> rusqlite::Result<Recording> {
    Ok(Recording {
        id: row.get(0)?,
        event_id: row.get(1)?,
        size: row.get(2)?,
        length: row.get(3)?,
        mime_type: row.get(4)?,
        language: row.get(5)?,
        filename: row.get(6)?,
        high_quality: row.get(7)?,
        width: row.get(8)?,
        height: row.get(9)?,
        recording_url: row.get(10)?,
    })
}

const RECORDING_COLS: &str = "id, event_id, size, length, mime_type, language, filename, \
     high_quality, width, height, recording_url";

impl MediaDb {
    /// Replace all stored recordings of an event with the given set.
    pub fn replace_recordings(
        &self,
        event_id: i64,
        recordings: &[NewRecording],
    ) -> Result<(), DbError> {
        self.with_transaction(|db| db.replace_recordings_tx(event_id, recordings))
    }

    pub(crate) fn replace_recordings_tx(
        &self,
        event_id: i64,
        recordings: &[NewRecording],
    ) -> Result<(), DbError> {
        self.conn_ref().execute(
            "DELETE FROM recordings WHERE event_id = ?1",
            params![event_id],
        )?;
        for recording in recordings {
            self.conn_ref().execute(
                "INSERT INTO recordings
                 (event_id, size, length, mime_type, language, filename, high_quality,
                  width, height, recording_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event_id,
                    recording.size,
                    recording.length,
                    recording.mime_type,
                    recording.language,
                    recording.filename,
                    recording.high_quality,
                    recording.width,
                    recording.height,
                    recording.recording_url
                ],
            )?;
        }
        Ok(())
    }

    /// All recordings of an event, best quality first.
    pub fn get_recordings_for_event(&self, event_id: i64) -> Result<Vec<Recording>, DbError> {
        let mut stmt = self.conn_ref().prepare(&format!(
            "SELECT {RECORDING_COLS} FROM recordings
             WHERE event_id = ?1
             ORDER BY high_quality DESC, height DESC"
        ))?;
        let rows = stmt.query_map(params![event_id], map_recording)?;
        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(row?);
        }
        Ok(recordings)
    }

    pub fn get_recording_by_id(&self, id: i64) -> Result<Option<Recording>, DbError> {
        let result = self
            .conn_ref()
            .query_row(
                &format!("SELECT {RECORDING_COLS} FROM recordings WHERE id = ?1"),
                params![id],
                map_recording,
            )
            .optional()?;
        Ok(result)
    }
}
