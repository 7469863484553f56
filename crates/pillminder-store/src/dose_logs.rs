//! CRUD operations for [`DoseLogEntry`] records.
//!
//! Dose logs are append-only; the only mutation is deletion together with
//! the parent medication.

use chrono::{DateTime, Utc};
use rusqlite::params;

use pillminder_shared::{DoseLogEntry, DoseLogId, DoseStatus, MedicationId, NewDoseLog, UserId};

use crate::database::{
    conversion_error, parse_ts, parse_uuid, truncate_micros, ts_to_sql, Database,
};
use crate::error::Result;

const DOSE_LOG_COLUMNS: &str =
    "id, medication_id, user_id, taken_at, scheduled_time, status, minutes_difference";

impl Database {
    /// Append a dose log and return the stored record.
    pub fn insert_dose_log(&self, new: &NewDoseLog) -> Result<DoseLogEntry> {
        let entry = DoseLogEntry {
            id: DoseLogId::new(),
            medication_id: new.medication_id,
            user_id: new.user_id,
            taken_at: truncate_micros(new.taken_at),
            scheduled_time: new.scheduled_time,
            status: new.status,
            minutes_difference: new.minutes_difference,
        };

        self.conn().execute(
            "INSERT INTO dose_logs
                (id, medication_id, user_id, taken_at, scheduled_time, status, minutes_difference)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.medication_id.to_string(),
                entry.user_id.to_string(),
                ts_to_sql(&entry.taken_at),
                entry.scheduled_time.to_string(),
                entry.status.as_str(),
                entry.minutes_difference,
            ],
        )?;

        tracing::debug!(
            log = %entry.id,
            medication = %entry.medication_id,
            status = %entry.status,
            "inserted dose log"
        );
        Ok(entry)
    }

    /// Logs for one of `user_id`'s medications, newest first.
    pub fn list_dose_logs_for_medication(
        &self,
        user_id: UserId,
        medication_id: MedicationId,
    ) -> Result<Vec<DoseLogEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOSE_LOG_COLUMNS}
             FROM dose_logs
             WHERE medication_id = ?1 AND user_id = ?2
             ORDER BY taken_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(
            params![medication_id.to_string(), user_id.to_string()],
            row_to_dose_log,
        )?;
        collect(rows)
    }

    /// All of a user's logs, newest first. When `range` is given only logs
    /// with `start <= taken_at < end` are returned.
    pub fn list_dose_logs_for_user(
        &self,
        user_id: UserId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<DoseLogEntry>> {
        let (start, end) = match range {
            Some((start, end)) => (Some(ts_to_sql(&start)), Some(ts_to_sql(&end))),
            None => (None, None),
        };

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOSE_LOG_COLUMNS}
             FROM dose_logs
             WHERE user_id = ?1
               AND (?2 IS NULL OR taken_at >= ?2)
               AND (?3 IS NULL OR taken_at < ?3)
             ORDER BY taken_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id.to_string(), start, end], row_to_dose_log)?;
        collect(rows)
    }

    /// Every user's logs, newest first.
    pub fn list_all_dose_logs(&self) -> Result<Vec<DoseLogEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOSE_LOG_COLUMNS}
             FROM dose_logs
             ORDER BY taken_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map([], row_to_dose_log)?;
        collect(rows)
    }

    /// Delete every log of one of `user_id`'s medications. Returns the number
    /// of rows removed.
    pub fn delete_dose_logs_for_medication(
        &self,
        user_id: UserId,
        medication_id: MedicationId,
    ) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM dose_logs WHERE medication_id = ?1 AND user_id = ?2",
            params![medication_id.to_string(), user_id.to_string()],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<DoseLogEntry>>,
) -> Result<Vec<DoseLogEntry>> {
    let mut logs = Vec::new();
    for row in rows {
        logs.push(row?);
    }
    Ok(logs)
}

/// Map a `rusqlite::Row` to a [`DoseLogEntry`].
fn row_to_dose_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoseLogEntry> {
    let id_str: String = row.get(0)?;
    let medication_str: String = row.get(1)?;
    let user_str: String = row.get(2)?;
    let taken_str: String = row.get(3)?;
    let scheduled_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let minutes_difference: i64 = row.get(6)?;

    let status: DoseStatus = status_str.parse().map_err(|e| conversion_error(5, e))?;

    Ok(DoseLogEntry {
        id: DoseLogId(parse_uuid(0, &id_str)?),
        medication_id: MedicationId(parse_uuid(1, &medication_str)?),
        user_id: UserId(parse_uuid(2, &user_str)?),
        taken_at: parse_ts(3, &taken_str)?,
        scheduled_time: scheduled_str.parse().map_err(|e| conversion_error(4, e))?,
        status,
        minutes_difference,
    })
}
