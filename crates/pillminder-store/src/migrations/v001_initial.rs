//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `medications` and `dose_logs`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Medications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS medications (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_id    TEXT NOT NULL,                 -- owner, UUID from the identity provider
    name       TEXT NOT NULL,
    time       TEXT NOT NULL,                 -- HH:MM
    taken      INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    taken_at   TEXT,                          -- RFC-3339, NULL when not taken
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_medications_user_created
    ON medications(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Dose logs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS dose_logs (
    id                 TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    medication_id      TEXT NOT NULL,              -- FK -> medications(id)
    user_id            TEXT NOT NULL,
    taken_at           TEXT NOT NULL,              -- RFC-3339
    scheduled_time     TEXT NOT NULL,              -- HH:MM
    status             TEXT NOT NULL
        CHECK (status IN ('on_time', 'late', 'early')),
    minutes_difference INTEGER NOT NULL,

    FOREIGN KEY (medication_id) REFERENCES medications(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_dose_logs_user_taken
    ON dose_logs(user_id, taken_at DESC);

CREATE INDEX IF NOT EXISTS idx_dose_logs_medication
    ON dose_logs(medication_id, taken_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
