//! SQLite Database
//!
//! Embedded store for the scheduling data this service reads and the
//! delivery flags it reconciles, using rusqlite with r2d2 connection
//! pooling. Assignments are created by the scheduling system; this
//! service only queries them and flips their delivery-state flags.

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::models::{
    DateRange, DeliveryLogEntry, DeliveryStatus, DutyAssignment, Hall, PersonRecord, Role, Venue,
};
use crate::services::pipeline::DutyStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::database_path;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database instance with connection pooling
    pub fn new() -> AppResult<Self> {
        let db_path = database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;

        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// Uses an in-memory SQLite database with the same schema as the
    /// production database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        // Duty assignments; qids holds the person-key set as a JSON array
        conn.execute(
            "CREATE TABLE IF NOT EXISTS invigilations (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                qids TEXT NOT NULL DEFAULT '[]',
                hall_id TEXT NOT NULL,
                venue_id TEXT NOT NULL,
                mail_sent INTEGER NOT NULL DEFAULT 0,
                force_resend INTEGER NOT NULL DEFAULT 0,
                mail_sent_at TEXT
            )",
            [],
        )?;

        // Reference data for rendering
        conn.execute(
            "CREATE TABLE IF NOT EXISTS halls (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                floor TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS venues (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            )",
            [],
        )?;

        // People and their role-specific identifier sub-records
        conn.execute(
            "CREATE TABLE IF NOT EXISTS persons (
                qid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                mail TEXT,
                role TEXT NOT NULL DEFAULT 'other'
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS staff_details (
                qid TEXT PRIMARY KEY,
                eid TEXT NOT NULL UNIQUE
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS student_details (
                qid TEXT PRIMARY KEY,
                htno TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        // Per-recipient delivery audit log
        conn.execute(
            "CREATE TABLE IF NOT EXISTS mail_log (
                id TEXT PRIMARY KEY,
                qid TEXT NOT NULL,
                to_address TEXT NOT NULL,
                subject TEXT NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                attempted_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    // ========================================================================
    // Row Mapping
    // ========================================================================

    fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<DutyAssignment> {
        let date: String = row.get(1)?;
        let start_time: String = row.get(2)?;
        let end_time: String = row.get(3)?;
        let qids_json: String = row.get(4)?;
        let mail_sent: i64 = row.get(7)?;
        let force_resend: i64 = row.get(8)?;
        let mail_sent_at: Option<String> = row.get(9)?;

        let qids: Vec<String> = serde_json::from_str(&qids_json).unwrap_or_default();
        let mail_sent_at = match mail_sent_at {
            Some(ts) => Some(parse_timestamp(9, &ts)?),
            None => None,
        };

        Ok(DutyAssignment {
            id: row.get(0)?,
            date: parse_date(1, &date)?,
            start_time: parse_timestamp(2, &start_time)?,
            end_time: parse_timestamp(3, &end_time)?,
            qids,
            hall_id: row.get(5)?,
            venue_id: row.get(6)?,
            mail_sent: mail_sent != 0,
            force_resend: force_resend != 0,
            mail_sent_at,
        })
    }

    // ========================================================================
    // Scheduling Data Inserts (seeding / scheduling-system side)
    // ========================================================================

    /// Insert a duty assignment row.
    pub fn insert_assignment(&self, assignment: &DutyAssignment) -> AppResult<()> {
        let conn = self.get_connection()?;
        let qids_json = serde_json::to_string(&assignment.qids).unwrap_or_default();

        conn.execute(
            "INSERT INTO invigilations (id, date, start_time, end_time, qids, hall_id, venue_id, mail_sent, force_resend, mail_sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                assignment.id,
                assignment.date.to_string(),
                assignment.start_time.to_rfc3339(),
                assignment.end_time.to_rfc3339(),
                qids_json,
                assignment.hall_id,
                assignment.venue_id,
                assignment.mail_sent as i32,
                assignment.force_resend as i32,
                assignment.mail_sent_at.map(|ts| ts.to_rfc3339()),
            ],
        )?;

        Ok(())
    }

    /// Insert a hall reference row.
    pub fn insert_hall(&self, hall: &Hall) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO halls (id, name, floor) VALUES (?1, ?2, ?3)",
            params![hall.id, hall.name, hall.floor],
        )?;
        Ok(())
    }

    /// Insert a venue reference row.
    pub fn insert_venue(&self, venue: &Venue) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO venues (id, name) VALUES (?1, ?2)",
            params![venue.id, venue.name],
        )?;
        Ok(())
    }

    /// Insert a person row.
    pub fn insert_person(&self, person: &PersonRecord) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO persons (qid, name, mail, role) VALUES (?1, ?2, ?3, ?4)",
            params![
                person.qid,
                person.name,
                person.mail,
                person.role.to_string()
            ],
        )?;
        Ok(())
    }

    /// Insert a staff identifier sub-record.
    pub fn insert_staff_detail(&self, qid: &str, eid: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO staff_details (qid, eid) VALUES (?1, ?2)",
            params![qid, eid],
        )?;
        Ok(())
    }

    /// Insert a student identifier sub-record.
    pub fn insert_student_detail(&self, qid: &str, htno: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO student_details (qid, htno) VALUES (?1, ?2)",
            params![qid, htno],
        )?;
        Ok(())
    }

    // ========================================================================
    // Read-back Accessors
    // ========================================================================

    /// Get a single assignment by id.
    pub fn assignment(&self, id: &str) -> AppResult<Option<DutyAssignment>> {
        let conn = self.get_connection()?;

        let result = conn.query_row(
            "SELECT id, date, start_time, end_time, qids, hall_id, venue_id, mail_sent, force_resend, mail_sent_at
             FROM invigilations WHERE id = ?1",
            params![id],
            Self::row_to_assignment,
        );

        match result {
            Ok(assignment) => Ok(Some(assignment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// List all delivery audit records, oldest first.
    pub fn delivery_log(&self) -> AppResult<Vec<DeliveryLogEntry>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT id, qid, to_address, subject, status, error, attempted_at
             FROM mail_log ORDER BY attempted_at ASC",
        )?;

        let entries = stmt
            .query_map([], |row| {
                let status: String = row.get(4)?;
                Ok(DeliveryLogEntry {
                    id: row.get(0)?,
                    qid: row.get(1)?,
                    to_address: row.get(2)?,
                    subject: row.get(3)?,
                    status: DeliveryStatus::from_str_value(&status),
                    error: row.get(5)?,
                    attempted_at: row.get(6)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }
}

impl DutyStore for Database {
    fn pending_assignments(&self, range: &DateRange) -> AppResult<Vec<DutyAssignment>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT id, date, start_time, end_time, qids, hall_id, venue_id, mail_sent, force_resend, mail_sent_at
             FROM invigilations
             WHERE date >= ?1 AND date <= ?2 AND (mail_sent = 0 OR force_resend = 1)
             ORDER BY date ASC, start_time ASC",
        )?;

        let assignments = stmt
            .query_map(
                params![range.from.to_string(), range.to.to_string()],
                Self::row_to_assignment,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(assignments)
    }

    fn assignments_for_person(
        &self,
        range: &DateRange,
        qid: &str,
    ) -> AppResult<Vec<DutyAssignment>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT id, date, start_time, end_time, qids, hall_id, venue_id, mail_sent, force_resend, mail_sent_at
             FROM invigilations
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC, start_time ASC",
        )?;

        let assignments = stmt
            .query_map(
                params![range.from.to_string(), range.to.to_string()],
                Self::row_to_assignment,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Person-set containment on the JSON column is filtered here after
        // parsing, matching how list-valued columns are read elsewhere.
        Ok(assignments
            .into_iter()
            .filter(|a| a.qids.iter().any(|q| q == qid))
            .collect())
    }

    fn hall(&self, id: &str) -> AppResult<Option<Hall>> {
        let conn = self.get_connection()?;

        let result = conn.query_row(
            "SELECT id, name, floor FROM halls WHERE id = ?1",
            params![id],
            |row| {
                Ok(Hall {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    floor: row.get(2)?,
                })
            },
        );

        match result {
            Ok(hall) => Ok(Some(hall)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    fn venue(&self, id: &str) -> AppResult<Option<Venue>> {
        let conn = self.get_connection()?;

        let result = conn.query_row(
            "SELECT id, name FROM venues WHERE id = ?1",
            params![id],
            |row| {
                Ok(Venue {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        );

        match result {
            Ok(venue) => Ok(Some(venue)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    fn person(&self, qid: &str) -> AppResult<Option<PersonRecord>> {
        let conn = self.get_connection()?;

        let result = conn.query_row(
            "SELECT qid, name, mail, role FROM persons WHERE qid = ?1",
            params![qid],
            |row| {
                let role: String = row.get(3)?;
                Ok(PersonRecord {
                    qid: row.get(0)?,
                    name: row.get(1)?,
                    mail: row.get(2)?,
                    role: Role::from_str_value(&role),
                })
            },
        );

        match result {
            Ok(person) => Ok(Some(person)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    fn staff_eid(&self, qid: &str) -> AppResult<Option<String>> {
        self.scalar_lookup("SELECT eid FROM staff_details WHERE qid = ?1", qid)
    }

    fn student_htno(&self, qid: &str) -> AppResult<Option<String>> {
        self.scalar_lookup("SELECT htno FROM student_details WHERE qid = ?1", qid)
    }

    fn qid_by_eid(&self, eid: &str) -> AppResult<Option<String>> {
        self.scalar_lookup("SELECT qid FROM staff_details WHERE eid = ?1", eid)
    }

    fn qid_by_htno(&self, htno: &str) -> AppResult<Option<String>> {
        self.scalar_lookup("SELECT qid FROM student_details WHERE htno = ?1", htno)
    }

    fn mark_mail_sent(&self, ids: &[String], sent_at: DateTime<Utc>) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.get_connection()?;

        // One statement over the whole id set; per-assignment updates would
        // break the all-or-nothing batch guarantee.
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE invigilations SET mail_sent = 1, mail_sent_at = ?, force_resend = 0 WHERE id IN ({})",
            placeholders
        );

        let mut values: Vec<String> = Vec::with_capacity(ids.len() + 1);
        values.push(sent_at.to_rfc3339());
        values.extend(ids.iter().cloned());

        conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(())
    }

    fn record_delivery(&self, entry: &DeliveryLogEntry) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "INSERT INTO mail_log (id, qid, to_address, subject, status, error, attempted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.qid,
                entry.to_address,
                entry.subject,
                entry.status.to_string(),
                entry.error,
                entry.attempted_at,
            ],
        )?;

        Ok(())
    }
}

impl Database {
    fn scalar_lookup(&self, sql: &str, key: &str) -> AppResult<Option<String>> {
        let conn = self.get_connection()?;

        let result = conn.query_row(sql, params![key], |row| row.get::<_, String>(0));

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }
}

fn parse_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
