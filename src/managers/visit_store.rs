//! Visit store.
//!
//! Implements `VisitStoreTrait`: recording, listing, searching and removing
//! browsing visits, backed by SQLite via `rusqlite`. Every visit is its own
//! row; repeated visits to a URL are separate events.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::types::errors::HistoryError;
use crate::types::history::{domain_of, Visit};

/// Trait defining visit store operations.
pub trait VisitStoreTrait {
    fn record_visit(
        &mut self,
        url: &str,
        title: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<String, HistoryError>;
    fn visits_since(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<Vec<Visit>, HistoryError>;
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Visit>, HistoryError>;
    fn delete_url(&mut self, url: &str) -> Result<usize, HistoryError>;
    fn clear_all(&mut self) -> Result<(), HistoryError>;
    fn is_recording_enabled(&self) -> bool;
    fn set_recording_enabled(&mut self, enabled: bool);
}

/// Visit store backed by a SQLite connection.
pub struct VisitStore<'a> {
    conn: &'a Connection,
    recording_enabled: bool,
}

impl<'a> VisitStore<'a> {
    /// Creates a new `VisitStore` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            recording_enabled: true,
        }
    }

    /// Reads a single visit row.
    fn row_to_visit(row: &rusqlite::Row) -> rusqlite::Result<Visit> {
        let url: String = row.get(0)?;
        let title: Option<String> = row.get(1)?;
        let millis: i64 = row.get(2)?;
        let date = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_default();
        Ok(Visit::new(url, title, date))
    }

    fn collect(
        stmt: &mut rusqlite::Statement<'_>,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Visit>, HistoryError> {
        let rows = stmt
            .query_map(params, Self::row_to_visit)
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| HistoryError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl<'a> VisitStoreTrait for VisitStore<'a> {
    /// Records a visit at `at` and returns its row ID.
    fn record_visit(
        &mut self,
        url: &str,
        title: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<String, HistoryError> {
        if !self.recording_enabled {
            return Err(HistoryError::DatabaseError(
                "Recording is disabled (private mode)".to_string(),
            ));
        }
        if url.trim().is_empty() {
            return Err(HistoryError::InvalidVisit("URL is empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO visits (id, url, title, visit_time, domain) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, url, title, at.timestamp_millis(), domain_of(url)],
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;
        Ok(id)
    }

    /// Lists visits at or after `cutoff`, newest first.
    fn visits_since(&self, cutoff: DateTime<Utc>, limit: usize) -> Result<Vec<Visit>, HistoryError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT url, title, visit_time FROM visits \
                 WHERE visit_time >= ?1 \
                 ORDER BY visit_time DESC LIMIT ?2",
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        Self::collect(&mut stmt, params![cutoff.timestamp_millis(), sql_limit(limit)])
    }

    /// Searches visits by title or URL, newest first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Visit>, HistoryError> {
        let pattern = like_pattern(query);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT url, title, visit_time FROM visits \
                 WHERE title LIKE ?1 ESCAPE '\\' OR url LIKE ?1 ESCAPE '\\' \
                 ORDER BY visit_time DESC LIMIT ?2",
            )
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        Self::collect(&mut stmt, params![pattern, sql_limit(limit)])
    }

    /// Removes every visit to `url`. Returns the number of removed visits.
    fn delete_url(&mut self, url: &str) -> Result<usize, HistoryError> {
        let affected = self
            .conn
            .execute("DELETE FROM visits WHERE url = ?1", params![url])
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        if affected == 0 {
            return Err(HistoryError::NotFound(url.to_string()));
        }
        Ok(affected)
    }

    /// Clears all visits.
    fn clear_all(&mut self) -> Result<(), HistoryError> {
        self.conn
            .execute("DELETE FROM visits", [])
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn is_recording_enabled(&self) -> bool {
        self.recording_enabled
    }

    /// Enables or disables recording (private mode).
    fn set_recording_enabled(&mut self, enabled: bool) {
        self.recording_enabled = enabled;
    }
}
