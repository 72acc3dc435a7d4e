//! SQLite-backed persistence for encounters, follow-ups, triage results
//! and protocol revisions.
//!
//! Triage results are stored as a JSON document keyed by encounter id;
//! the primary key is what makes the one-result-per-encounter guarantee
//! hold under concurrent writers.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use super::{StoreError, TriageStore};
use crate::models::{
    Channel, Demographics, Encounter, EncounterStatus, FollowupResponse, ProtocolVersion, Sex,
    TriageResult, Vitals,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS encounters (
    id          TEXT PRIMARY KEY,
    channel     TEXT NOT NULL,
    age         INTEGER NOT NULL,
    sex         TEXT NOT NULL,
    location    TEXT,
    symptoms    TEXT NOT NULL,
    vitals_json TEXT,
    lab_results TEXT,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS followup_responses (
    encounter_id TEXT NOT NULL REFERENCES encounters(id),
    position     INTEGER NOT NULL,
    question     TEXT NOT NULL,
    answer       TEXT NOT NULL,
    PRIMARY KEY (encounter_id, position)
);
CREATE TABLE IF NOT EXISTS triage_results (
    encounter_id TEXT PRIMARY KEY REFERENCES encounters(id),
    result_json  TEXT NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS protocol_versions (
    version      INTEGER PRIMARY KEY AUTOINCREMENT,
    description  TEXT NOT NULL,
    content      TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 0,
    published_at TEXT NOT NULL
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a file-backed store and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn encounter_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound {
        entity: "encounter".into(),
        id: id.to_string(),
    }
}

type EncounterRow = (
    String,
    String,
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn row_to_encounter(row: EncounterRow) -> Result<Encounter, StoreError> {
    let (id, channel, age, sex, location, symptoms, vitals_json, lab_results, status, created_at) =
        row;
    let vitals: Option<Vitals> = match vitals_json {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };
    Ok(Encounter {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::InvalidEnum {
            field: "encounter.id".into(),
            value: e.to_string(),
        })?,
        channel: Channel::from_str(&channel)?,
        demographics: Demographics {
            age: age as u8,
            sex: Sex::from_str(&sex)?,
            location,
        },
        symptoms,
        vitals,
        lab_results,
        status: EncounterStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidEnum {
            field: "timestamp".into(),
            value: e.to_string(),
        })
}

impl TriageStore for SqliteStore {
    fn insert_encounter(&self, encounter: &Encounter) -> Result<(), StoreError> {
        let vitals_json = encounter
            .vitals
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.lock().execute(
            "INSERT INTO encounters
             (id, channel, age, sex, location, symptoms, vitals_json, lab_results, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                encounter.id.to_string(),
                encounter.channel.as_str(),
                encounter.demographics.age as i64,
                encounter.demographics.sex.as_str(),
                encounter.demographics.location,
                encounter.symptoms,
                vitals_json,
                encounter.lab_results,
                encounter.status.as_str(),
                encounter.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_encounter(&self, id: Uuid) -> Result<Encounter, StoreError> {
        let row: Option<EncounterRow> = self
            .lock()
            .query_row(
                "SELECT id, channel, age, sex, location, symptoms, vitals_json, lab_results,
                        status, created_at
                 FROM encounters WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some(row) => row_to_encounter(row),
            None => Err(encounter_not_found(id)),
        }
    }

    fn append_followups(&self, id: Uuid, pairs: &[FollowupResponse]) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM encounters WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(status) = status else {
            return Err(encounter_not_found(id));
        };

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM followup_responses WHERE encounter_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        for (offset, pair) in pairs.iter().enumerate() {
            tx.execute(
                "INSERT INTO followup_responses (encounter_id, position, question, answer)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.to_string(),
                    next + offset as i64,
                    pair.question,
                    pair.answer
                ],
            )?;
        }

        if status == EncounterStatus::Created.as_str() {
            tx.execute(
                "UPDATE encounters SET status = ?1 WHERE id = ?2",
                params![EncounterStatus::InProgress.as_str(), id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn followups(&self, id: Uuid) -> Result<Vec<FollowupResponse>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT question, answer FROM followup_responses
             WHERE encounter_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            Ok(FollowupResponse {
                question: row.get(0)?,
                answer: row.get(1)?,
            })
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(pairs)
    }

    fn get_triage_result(&self, id: Uuid) -> Result<Option<TriageResult>, StoreError> {
        let json: Option<String> = self
            .lock()
            .query_row(
                "SELECT result_json FROM triage_results WHERE encounter_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put_triage_result(&self, id: Uuid, result: &TriageResult) -> Result<(), StoreError> {
        let json = serde_json::to_string(result)?;
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM encounters WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(encounter_not_found(id));
        }

        let inserted = tx.execute(
            "INSERT INTO triage_results (encounter_id, result_json, created_at)
             VALUES (?1, ?2, ?3)",
            params![id.to_string(), json, result.timestamp.to_rfc3339()],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::AlreadyExists(id));
            }
            Err(e) => return Err(e.into()),
        }

        tx.execute(
            "UPDATE encounters SET status = ?1 WHERE id = ?2",
            params![EncounterStatus::Triaged.as_str(), id.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn active_protocol(&self) -> Result<Option<ProtocolVersion>, StoreError> {
        let row: Option<(i64, String, String, String)> = self
            .lock()
            .query_row(
                "SELECT version, description, content, published_at
                 FROM protocol_versions WHERE active = 1
                 ORDER BY version DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((version, description, content, published_at)) => Ok(Some(ProtocolVersion {
                version,
                description,
                content,
                active: true,
                published_at: parse_timestamp(&published_at)?,
            })),
            None => Ok(None),
        }
    }

    fn publish_protocol(
        &self,
        description: &str,
        content: &str,
    ) -> Result<ProtocolVersion, StoreError> {
        let published_at = Utc::now();
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute("UPDATE protocol_versions SET active = 0 WHERE active = 1", [])?;
        tx.execute(
            "INSERT INTO protocol_versions (description, content, active, published_at)
             VALUES (?1, ?2, 1, ?3)",
            params![description, content, published_at.to_rfc3339()],
        )?;
        let version = tx.last_insert_rowid();

        tx.commit()?;
        Ok(ProtocolVersion {
            version,
            description: description.to_string(),
            content: content.to_string(),
            active: true,
            published_at,
        })
    }
}
