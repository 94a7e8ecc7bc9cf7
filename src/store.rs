use crate::app_dirs::AppDirs;
use crate::library::ChapterRef;
use crate::session::{CompletionSummary, Cursor};
use chrono::{DateTime, Duration, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Cumulative figures folded out of the completions table.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeStats {
    pub total_tokens: i64,
    pub completions: i64,
    pub avg_tokens_per_min: f64,
    /// Consecutive calendar days (ending today or yesterday) with at least
    /// one completed chapter.
    pub day_streak: u32,
    pub last_completed: Option<DateTime<Local>>,
}

/// Persistence façade over a local SQLite database: resume cursors,
/// permanent completions, per-chapter notes. The engine never touches this;
/// the app layer drives it from engine events.
#[derive(Debug)]
pub struct ProgressStore {
    conn: Connection,
}

impl ProgressStore {
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("versetype_progress.db"));
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::open(&db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS resume_positions (
                edition TEXT NOT NULL,
                book TEXT NOT NULL,
                chapter INTEGER NOT NULL,
                sequence_index INTEGER NOT NULL,
                intra_token_offset INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (edition, book, chapter)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS completions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                edition TEXT NOT NULL,
                book TEXT NOT NULL,
                chapter INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                tokens INTEGER NOT NULL,
                duration_secs REAL NOT NULL,
                tokens_per_min REAL NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_completions_chapter ON completions(edition, book, chapter)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                edition TEXT NOT NULL,
                book TEXT NOT NULL,
                chapter INTEGER NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (edition, book, chapter)
            )
            "#,
            [],
        )?;

        Ok(ProgressStore { conn })
    }

    /// Upserts the resume cursor for a chapter. Called on debounced saves
    /// while a session runs.
    pub fn save_resume(&self, reference: &ChapterRef, cursor: Cursor) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO resume_positions
            (edition, book, chapter, sequence_index, intra_token_offset, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(edition, book, chapter) DO UPDATE SET
                sequence_index = excluded.sequence_index,
                intra_token_offset = excluded.intra_token_offset,
                updated_at = excluded.updated_at
            "#,
            params![
                reference.edition,
                reference.book,
                reference.chapter,
                cursor.sequence_index as i64,
                cursor.intra_token_offset as i64,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn load_resume(&self, reference: &ChapterRef) -> Result<Option<Cursor>> {
        self.conn
            .query_row(
                r#"
                SELECT sequence_index, intra_token_offset FROM resume_positions
                WHERE edition = ?1 AND book = ?2 AND chapter = ?3
                "#,
                params![reference.edition, reference.book, reference.chapter],
                |row| {
                    Ok(Cursor {
                        sequence_index: row.get::<_, i64>(0)? as usize,
                        intra_token_offset: row.get::<_, i64>(1)? as usize,
                    })
                },
            )
            .optional()
    }

    pub fn clear_resume(&self, reference: &ChapterRef) -> Result<()> {
        self.conn.execute(
            "DELETE FROM resume_positions WHERE edition = ?1 AND book = ?2 AND chapter = ?3",
            params![reference.edition, reference.book, reference.chapter],
        )?;
        Ok(())
    }

    pub fn record_completion(
        &self,
        reference: &ChapterRef,
        summary: &CompletionSummary,
    ) -> Result<()> {
        self.record_completion_at(reference, summary, Local::now())
    }

    pub fn record_completion_at(
        &self,
        reference: &ChapterRef,
        summary: &CompletionSummary,
        at: DateTime<Local>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO completions
            (edition, book, chapter, completed_at, tokens, duration_secs, tokens_per_min)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                reference.edition,
                reference.book,
                reference.chapter,
                at.to_rfc3339(),
                summary.delta.tokens as i64,
                summary.duration_secs,
                summary.tokens_per_min,
            ],
        )?;
        // A finished chapter restarts from the top next time.
        self.clear_resume(reference)
    }

    pub fn completion_count(&self, reference: &ChapterRef) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM completions WHERE edition = ?1 AND book = ?2 AND chapter = ?3",
            params![reference.edition, reference.book, reference.chapter],
            |row| row.get(0),
        )
    }

    pub fn cumulative_stats(&self) -> Result<CumulativeStats> {
        let (total_tokens, completions, avg_rate): (Option<i64>, i64, Option<f64>) =
            self.conn.query_row(
                "SELECT SUM(tokens), COUNT(*), AVG(tokens_per_min) FROM completions",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let mut stmt = self
            .conn
            .prepare("SELECT completed_at FROM completions ORDER BY completed_at DESC")?;
        let timestamps: Vec<DateTime<Local>> = stmt
            .query_map([], |row| {
                let raw: String = row.get(0)?;
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Local))
                    .map_err(|_| {
                        rusqlite::Error::InvalidColumnType(
                            0,
                            "completed_at".to_string(),
                            rusqlite::types::Type::Text,
                        )
                    })
            })?
            .collect::<Result<_>>()?;

        Ok(CumulativeStats {
            total_tokens: total_tokens.unwrap_or(0),
            completions,
            avg_tokens_per_min: avg_rate.unwrap_or(0.0),
            day_streak: day_streak(&timestamps, Local::now().date_naive()),
            last_completed: timestamps.first().copied(),
        })
    }

    pub fn save_note(&self, reference: &ChapterRef, body: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO notes (edition, book, chapter, body, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(edition, book, chapter) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
            params![
                reference.edition,
                reference.book,
                reference.chapter,
                body,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn load_note(&self, reference: &ChapterRef) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT body FROM notes WHERE edition = ?1 AND book = ?2 AND chapter = ?3",
                params![reference.edition, reference.book, reference.chapter],
                |row| row.get(0),
            )
            .optional()
    }

    /// Writes the completion log as CSV, newest first.
    pub fn export_completions_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT completed_at, edition, book, chapter, tokens, duration_secs, tokens_per_min
            FROM completions ORDER BY completed_at DESC
            "#,
        )?;
        let rows: Vec<(String, String, String, i64, i64, f64, f64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<Result<_>>()?;

        let to_sql_err = |e: std::io::Error| {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
                Some(e.to_string()),
            )
        };

        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| to_sql_err(std::io::Error::other(e.to_string())))?;
        writer
            .write_record([
                "completed_at",
                "edition",
                "book",
                "chapter",
                "tokens",
                "duration_secs",
                "tokens_per_min",
            ])
            .map_err(|e| to_sql_err(std::io::Error::other(e.to_string())))?;
        for (at, edition, book, chapter, tokens, duration, rate) in rows {
            writer
                .write_record([
                    at,
                    edition,
                    book,
                    chapter.to_string(),
                    tokens.to_string(),
                    format!("{:.2}", duration),
                    format!("{:.2}", rate),
                ])
                .map_err(|e| to_sql_err(std::io::Error::other(e.to_string())))?;
        }
        writer
            .flush()
            .map_err(to_sql_err)?;
        Ok(())
    }
}

/// Counts consecutive days with a completion, walking back from `today`.
/// A streak survives until a full calendar day is missed, so a run ending
/// yesterday still counts.
fn day_streak(timestamps: &[DateTime<Local>], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = timestamps.iter().map(|t| t.date_naive()).collect();

    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&(today - Duration::days(1))) {
        today - Duration::days(1)
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor = cursor - Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CumulativeDelta;
    use chrono::TimeZone;

    fn reference() -> ChapterRef {
        ChapterRef::new("kjv", "genesis", 1)
    }

    fn summary(tokens: u32) -> CompletionSummary {
        CompletionSummary {
            cursor: Cursor::at(tokens as usize),
            tokens_typed: tokens,
            duration_secs: 60.0,
            tokens_per_min: tokens as f64,
            delta: CumulativeDelta {
                tokens,
                streak_increment: 1,
            },
        }
    }

    fn local_day(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_resume_roundtrip() {
        let store = ProgressStore::open_in_memory().unwrap();
        let cursor = Cursor {
            sequence_index: 42,
            intra_token_offset: 2,
        };

        assert_eq!(store.load_resume(&reference()).unwrap(), None);
        store.save_resume(&reference(), cursor).unwrap();
        assert_eq!(store.load_resume(&reference()).unwrap(), Some(cursor));
    }

    #[test]
    fn test_resume_upserts() {
        let store = ProgressStore::open_in_memory().unwrap();
        store.save_resume(&reference(), Cursor::at(5)).unwrap();
        store.save_resume(&reference(), Cursor::at(9)).unwrap();

        assert_eq!(
            store.load_resume(&reference()).unwrap(),
            Some(Cursor::at(9))
        );
    }

    #[test]
    fn test_completion_clears_resume() {
        let store = ProgressStore::open_in_memory().unwrap();
        store.save_resume(&reference(), Cursor::at(5)).unwrap();
        store.record_completion(&reference(), &summary(10)).unwrap();

        assert_eq!(store.load_resume(&reference()).unwrap(), None);
        assert_eq!(store.completion_count(&reference()).unwrap(), 1);
    }

    #[test]
    fn test_cumulative_stats() {
        let store = ProgressStore::open_in_memory().unwrap();
        store.record_completion(&reference(), &summary(10)).unwrap();
        store
            .record_completion(&ChapterRef::new("kjv", "psalms", 117), &summary(20))
            .unwrap();

        let stats = store.cumulative_stats().unwrap();
        assert_eq!(stats.total_tokens, 30);
        assert_eq!(stats.completions, 2);
        assert!((stats.avg_tokens_per_min - 15.0).abs() < 1e-9);
        assert_eq!(stats.day_streak, 1);
        assert!(stats.last_completed.is_some());
    }

    #[test]
    fn test_empty_cumulative_stats() {
        let store = ProgressStore::open_in_memory().unwrap();
        let stats = store.cumulative_stats().unwrap();
        assert_eq!(stats.total_tokens, 0);
        assert_eq!(stats.completions, 0);
        assert_eq!(stats.day_streak, 0);
        assert_eq!(stats.last_completed, None);
    }

    #[test]
    fn test_day_streak_consecutive() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let stamps = vec![
            local_day(2026, 8, 30),
            local_day(2026, 8, 29),
            local_day(2026, 8, 29),
            local_day(2026, 8, 28),
        ];
        assert_eq!(day_streak(&stamps, today), 3);
    }

    #[test]
    fn test_day_streak_broken_by_gap() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let stamps = vec![local_day(2026, 8, 30), local_day(2026, 8, 27)];
        assert_eq!(day_streak(&stamps, today), 1);
    }

    #[test]
    fn test_day_streak_survives_one_pending_day() {
        // Practiced yesterday but not yet today.
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let stamps = vec![local_day(2026, 8, 29), local_day(2026, 8, 28)];
        assert_eq!(day_streak(&stamps, today), 2);

        let stale = vec![local_day(2026, 8, 25)];
        assert_eq!(day_streak(&stale, today), 0);
    }

    #[test]
    fn test_notes_roundtrip() {
        let store = ProgressStore::open_in_memory().unwrap();
        assert_eq!(store.load_note(&reference()).unwrap(), None);

        store.save_note(&reference(), "memorize v3").unwrap();
        store.save_note(&reference(), "memorize v3 and v27").unwrap();
        assert_eq!(
            store.load_note(&reference()).unwrap().as_deref(),
            Some("memorize v3 and v27")
        );
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        let store = ProgressStore::open_in_memory().unwrap();
        store.record_completion(&reference(), &summary(10)).unwrap();
        store.export_completions_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "completed_at,edition,book,chapter,tokens,duration_secs,tokens_per_min"
        );
        assert!(lines.next().unwrap().contains("kjv,genesis,1,10"));
    }
}
