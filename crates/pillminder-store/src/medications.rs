//! CRUD operations for [`Medication`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;

use pillminder_shared::{Medication, MedicationId, NewMedication, TimeOfDay, UserId};

use crate::database::{
    conversion_error, not_found, parse_ts, parse_uuid, truncate_micros, ts_to_sql, Database,
};
use crate::error::{Result, StoreError};

const MEDICATION_COLUMNS: &str =
    "id, user_id, name, time, taken, taken_at, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new medication and return the stored record.
    pub fn insert_medication(&self, new: &NewMedication) -> Result<Medication> {
        let medication = Medication {
            id: MedicationId::new(),
            user_id: new.user_id,
            name: new.name.clone(),
            time: new.time,
            taken: false,
            taken_at: None,
            created_at: truncate_micros(new.created_at),
            updated_at: None,
        };

        self.conn().execute(
            "INSERT INTO medications (id, user_id, name, time, taken, taken_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, NULL)",
            params![
                medication.id.to_string(),
                medication.user_id.to_string(),
                medication.name,
                medication.time.to_string(),
                ts_to_sql(&medication.created_at),
            ],
        )?;

        tracing::debug!(medication = %medication.id, user = %medication.user_id, "inserted medication");
        Ok(medication)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch one of `user_id`'s medications.
    pub fn get_medication(&self, user_id: UserId, id: MedicationId) -> Result<Medication> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {MEDICATION_COLUMNS}
                     FROM medications
                     WHERE id = ?1 AND user_id = ?2"
                ),
                params![id.to_string(), user_id.to_string()],
                row_to_medication,
            )
            .map_err(not_found)
    }

    /// List a user's medications, newest first.
    pub fn list_medications_for_user(&self, user_id: UserId) -> Result<Vec<Medication>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEDICATION_COLUMNS}
             FROM medications
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_medication)?;

        let mut medications = Vec::new();
        for row in rows {
            medications.push(row?);
        }
        Ok(medications)
    }

    /// List every user's medications, newest first.
    pub fn list_all_medications(&self) -> Result<Vec<Medication>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEDICATION_COLUMNS}
             FROM medications
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map([], row_to_medication)?;

        let mut medications = Vec::new();
        for row in rows {
            medications.push(row?);
        }
        Ok(medications)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Set the taken flag and timestamp of one of `user_id`'s medications.
    pub fn set_medication_taken(
        &self,
        user_id: UserId,
        id: MedicationId,
        taken: bool,
        taken_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Medication> {
        let affected = self.conn().execute(
            "UPDATE medications
             SET taken = ?1, taken_at = ?2, updated_at = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![
                taken,
                taken_at.as_ref().map(ts_to_sql),
                ts_to_sql(&updated_at),
                id.to_string(),
                user_id.to_string(),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_medication(user_id, id)
    }

    /// Clear the taken state of all of a user's medications.
    pub fn reset_medications_for_user(
        &self,
        user_id: UserId,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<Medication>> {
        let affected = self.conn().execute(
            "UPDATE medications
             SET taken = 0, taken_at = NULL, updated_at = ?1
             WHERE user_id = ?2",
            params![ts_to_sql(&updated_at), user_id.to_string()],
        )?;

        tracing::debug!(user = %user_id, affected, "reset medications");
        self.list_medications_for_user(user_id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete one of `user_id`'s medications.  Returns `true` if a row was
    /// deleted.  Remaining dose logs are removed by the FK cascade.
    pub fn delete_medication(&self, user_id: UserId, id: MedicationId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM medications WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Medication`].
fn row_to_medication(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medication> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let name: String = row.get(2)?;
    let time_str: String = row.get(3)?;
    let taken: bool = row.get(4)?;
    let taken_at_str: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;
    let updated_str: Option<String> = row.get(7)?;

    let time: TimeOfDay = time_str.parse().map_err(|e| conversion_error(3, e))?;

    Ok(Medication {
        id: MedicationId(parse_uuid(0, &id_str)?),
        user_id: UserId(parse_uuid(1, &user_str)?),
        name,
        time,
        taken,
        taken_at: taken_at_str.map(|s| parse_ts(5, &s)).transpose()?,
        created_at: parse_ts(6, &created_str)?,
        updated_at: updated_str.map(|s| parse_ts(7, &s)).transpose()?,
    })
}
