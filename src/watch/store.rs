//! Durable relational store for the watch subsystem.
//!
//! Five tables (repos, tracked, snapshots, changes, sessions) with
//! write-ahead journaling, foreign keys on, and cascade delete from a
//! repo. Helpers return mapped domain values, never row tuples. The
//! connection opens lazily and is reused for the process lifetime.

use crate::domain::TargetKind;
use crate::error::{Result, ScoutError};
use crate::utils::utc_timestamp;
use crate::vcs::DiffStats;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRow {
    pub id: i64,
    pub full_name: String,
    pub url: String,
    pub default_branch: Option<String>,
    pub license: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRow {
    pub id: i64,
    pub repo_id: i64,
    pub kind: TargetKind,
    pub paths: Vec<String>,
    pub enabled: bool,
    pub interval_hours: u32,
}

/// Tracked entry joined with its repo metadata.
#[derive(Debug, Clone)]
pub struct TrackedJoined {
    pub tracked: TrackedRow,
    pub repo: RepoRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub id: i64,
    pub repo_id: i64,
    pub commit: String,
    pub observed_at: String,
}

#[derive(Debug, Clone)]
pub struct ChangeRow {
    pub id: i64,
    pub repo_id: i64,
    pub from_commit: String,
    pub to_commit: String,
    pub kind: TargetKind,
    pub stats: Option<DiffStats>,
    pub created_at: String,
    pub drift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Running,
    Success,
    Failure,
    Skipped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Success => "success",
            SessionStatus::Failure => "failure",
            SessionStatus::Skipped => "skipped",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(SessionStatus::Pending),
            "running" => Ok(SessionStatus::Running),
            "success" => Ok(SessionStatus::Success),
            "failure" => Ok(SessionStatus::Failure),
            "skipped" => Ok(SessionStatus::Skipped),
            other => Err(ScoutError::SessionInvalid {
                reason: format!("unknown session status '{other}' in store"),
            }),
        }
    }

    /// Status transitions progress monotonically; terminal states never
    /// move again.
    fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Pending, SessionStatus::Running)
                | (SessionStatus::Pending, SessionStatus::Skipped)
                | (SessionStatus::Running, SessionStatus::Success)
                | (SessionStatus::Running, SessionStatus::Failure)
                | (SessionStatus::Running, SessionStatus::Skipped)
        )
    }
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub change_id: i64,
    pub path: PathBuf,
    pub status: SessionStatus,
    pub exit_code: Option<i32>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

pub struct WatchStore {
    db_path: PathBuf,
    conn: Option<Connection>,
}

impl WatchStore {
    /// Create a store over `<dir>/scout.db`. The connection is not opened
    /// until first use.
    pub fn new(dir: &Path) -> Self {
        Self { db_path: dir.join("scout.db"), conn: None }
    }

    fn conn(&mut self) -> Result<&Connection> {
        if self.conn.is_none() {
            if let Some(parent) = self.db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&self.db_path)?;
            // journal_mode returns a row; run it as a query.
            conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            create_schema(&conn)?;
            self.conn = Some(conn);
        }
        Ok(self.conn.as_ref().expect("connection just opened"))
    }

    /// Close the connection deterministically. Subsequent calls reopen.
    pub fn close(&mut self) {
        self.conn = None;
    }

    pub fn upsert_repo(
        &mut self,
        full_name: &str,
        url: &str,
        default_branch: Option<&str>,
        license: Option<&str>,
    ) -> Result<RepoRow> {
        let now = utc_timestamp();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO repos(full_name, url, default_branch, license, created_at)
             VALUES(?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(full_name) DO UPDATE SET
                 url = excluded.url,
                 default_branch = COALESCE(excluded.default_branch, repos.default_branch),
                 license = COALESCE(excluded.license, repos.license)",
            params![full_name, url, default_branch, license, now],
        )?;
        self.repo_by_name(full_name)?.ok_or_else(|| ScoutError::SessionInvalid {
            reason: format!("repo '{full_name}' missing after upsert"),
        })
    }

    pub fn repo_by_name(&mut self, full_name: &str) -> Result<Option<RepoRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, full_name, url, default_branch, license, created_at
                 FROM repos WHERE full_name = ?1",
                params![full_name],
                map_repo,
            )
            .optional()?;
        Ok(row)
    }

    pub fn delete_repo(&mut self, repo_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM repos WHERE id = ?1", params![repo_id])?)
    }

    pub fn upsert_tracked(
        &mut self,
        repo_id: i64,
        kind: TargetKind,
        paths: &[String],
        enabled: bool,
        interval_hours: u32,
    ) -> Result<TrackedRow> {
        let serialized = serde_json::to_string(paths)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tracked(repo_id, kind, paths, enabled, interval_hours)
             VALUES(?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(repo_id, kind) DO UPDATE SET
                 paths = excluded.paths,
                 enabled = excluded.enabled,
                 interval_hours = excluded.interval_hours",
            params![repo_id, kind.as_str(), serialized, enabled, interval_hours],
        )?;
        let row = conn.query_row(
            "SELECT id, repo_id, kind, paths, enabled, interval_hours
             FROM tracked WHERE repo_id = ?1 AND kind = ?2",
            params![repo_id, kind.as_str()],
            map_tracked,
        )??;
        Ok(row)
    }

    /// Enabled and disabled tracked rows joined with repo metadata,
    /// ordered by tracked id.
    pub fn list_tracked(&mut self) -> Result<Vec<TrackedJoined>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.repo_id, t.kind, t.paths, t.enabled, t.interval_hours,
                    r.id, r.full_name, r.url, r.default_branch, r.license, r.created_at
             FROM tracked t JOIN repos r ON r.id = t.repo_id
             ORDER BY t.id",
        )?;
        let rows = stmt.query_map([], |row| {
            let tracked = map_tracked(row)?;
            let repo = RepoRow {
                id: row.get(6)?,
                full_name: row.get(7)?,
                url: row.get(8)?,
                default_branch: row.get(9)?,
                license: row.get(10)?,
                created_at: row.get(11)?,
            };
            Ok((tracked, repo))
        })?;
        let mut joined = Vec::new();
        for row in rows {
            let (tracked, repo) = row?;
            joined.push(TrackedJoined { tracked: tracked?, repo });
        }
        Ok(joined)
    }

    pub fn remove_tracked(&mut self, repo_id: i64, kind: TargetKind) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "DELETE FROM tracked WHERE repo_id = ?1 AND kind = ?2",
            params![repo_id, kind.as_str()],
        )?)
    }

    pub fn append_snapshot(&mut self, repo_id: i64, commit: &str) -> Result<SnapshotRow> {
        let now = utc_timestamp();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO snapshots(repo_id, commit_id, observed_at) VALUES(?1, ?2, ?3)",
            params![repo_id, commit, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(SnapshotRow { id, repo_id, commit: commit.to_string(), observed_at: now })
    }

    /// Latest snapshot = max-id row for the repo.
    pub fn latest_snapshot(&mut self, repo_id: i64) -> Result<Option<SnapshotRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, repo_id, commit_id, observed_at FROM snapshots
                 WHERE repo_id = ?1 ORDER BY id DESC LIMIT 1",
                params![repo_id],
                |row| {
                    Ok(SnapshotRow {
                        id: row.get(0)?,
                        repo_id: row.get(1)?,
                        commit: row.get(2)?,
                        observed_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn append_change(
        &mut self,
        repo_id: i64,
        from_commit: &str,
        to_commit: &str,
        kind: TargetKind,
        stats: Option<&DiffStats>,
        drift: bool,
    ) -> Result<ChangeRow> {
        let now = utc_timestamp();
        let stats_json = stats.map(serde_json::to_string).transpose()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO changes(repo_id, from_commit, to_commit, kind, diff_stats, created_at, drift)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![repo_id, from_commit, to_commit, kind.as_str(), stats_json, now, drift],
        )?;
        let id = conn.last_insert_rowid();
        Ok(ChangeRow {
            id,
            repo_id,
            from_commit: from_commit.to_string(),
            to_commit: to_commit.to_string(),
            kind,
            stats: stats.copied(),
            created_at: now,
            drift,
        })
    }

    /// Append a session in `pending` state.
    pub fn append_session(&mut self, change_id: i64, path: &Path) -> Result<SessionRow> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions(change_id, path, status) VALUES(?1, ?2, 'pending')",
            params![change_id, path.to_string_lossy()],
        )?;
        let id = conn.last_insert_rowid();
        Ok(SessionRow {
            id,
            change_id,
            path: path.to_path_buf(),
            status: SessionStatus::Pending,
            exit_code: None,
            started_at: None,
            finished_at: None,
        })
    }

    /// Transition a session; non-monotonic transitions are rejected.
    pub fn transition_session(
        &mut self,
        session_id: i64,
        next: SessionStatus,
        exit_code: Option<i32>,
    ) -> Result<SessionRow> {
        let current = self.session_by_id(session_id)?.ok_or_else(|| {
            ScoutError::SessionInvalid { reason: format!("session {session_id} not found") }
        })?;
        if !current.status.can_transition_to(next) {
            return Err(ScoutError::SessionInvalid {
                reason: format!(
                    "illegal session transition {} -> {}",
                    current.status.as_str(),
                    next.as_str()
                ),
            });
        }
        let now = utc_timestamp();
        let conn = self.conn()?;
        match next {
            SessionStatus::Running => {
                conn.execute(
                    "UPDATE sessions SET status = ?1, started_at = ?2 WHERE id = ?3",
                    params![next.as_str(), now, session_id],
                )?;
            }
            _ => {
                conn.execute(
                    "UPDATE sessions SET status = ?1, exit_code = ?2, finished_at = ?3 WHERE id = ?4",
                    params![next.as_str(), exit_code, now, session_id],
                )?;
            }
        }
        self.session_by_id(session_id)?.ok_or_else(|| ScoutError::SessionInvalid {
            reason: format!("session {session_id} vanished during transition"),
        })
    }

    pub fn session_by_id(&mut self, session_id: i64) -> Result<Option<SessionRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, change_id, path, status, exit_code, started_at, finished_at
                 FROM sessions WHERE id = ?1",
                params![session_id],
                map_session,
            )
            .optional()?;
        row.transpose()
    }

    pub fn session_by_path(&mut self, path: &Path) -> Result<Option<SessionRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, change_id, path, status, exit_code, started_at, finished_at
                 FROM sessions WHERE path = ?1 ORDER BY id DESC LIMIT 1",
                params![path.to_string_lossy()],
                map_session,
            )
            .optional()?;
        row.transpose()
    }

    /// Existing session for (repo, from, to, kind); backs session-build
    /// idempotence.
    pub fn find_session(
        &mut self,
        repo_id: i64,
        from_commit: &str,
        to_commit: &str,
        kind: TargetKind,
    ) -> Result<Option<SessionRow>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT s.id, s.change_id, s.path, s.status, s.exit_code, s.started_at, s.finished_at
                 FROM sessions s JOIN changes c ON c.id = s.change_id
                 WHERE c.repo_id = ?1 AND c.from_commit = ?2 AND c.to_commit = ?3 AND c.kind = ?4
                 ORDER BY s.id DESC LIMIT 1",
                params![repo_id, from_commit, to_commit, kind.as_str()],
                map_session,
            )
            .optional()?;
        row.transpose()
    }

    pub fn sessions_for_repo(&mut self, repo_id: i64) -> Result<Vec<SessionRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.change_id, s.path, s.status, s.exit_code, s.started_at, s.finished_at
             FROM sessions s JOIN changes c ON c.id = s.change_id
             WHERE c.repo_id = ?1 ORDER BY s.id",
        )?;
        let rows = stmt.query_map(params![repo_id], map_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row??);
        }
        Ok(sessions)
    }

    pub fn pending_sessions(&mut self) -> Result<Vec<SessionRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, change_id, path, status, exit_code, started_at, finished_at
             FROM sessions WHERE status = 'pending' ORDER BY id",
        )?;
        let rows = stmt.query_map([], map_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row??);
        }
        Ok(sessions)
    }

    pub fn changes_for_repo(&mut self, repo_id: i64) -> Result<Vec<ChangeRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, repo_id, from_commit, to_commit, kind, diff_stats, created_at, drift
             FROM changes WHERE repo_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![repo_id], map_change)?;
        let mut changes = Vec::new();
        for row in rows {
            changes.push(row??);
        }
        Ok(changes)
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS repos (
            id INTEGER PRIMARY KEY,
            full_name TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            default_branch TEXT,
            license TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tracked (
            id INTEGER PRIMARY KEY,
            repo_id INTEGER NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            paths TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            interval_hours INTEGER NOT NULL DEFAULT 24,
            UNIQUE(repo_id, kind)
        );

        CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY,
            repo_id INTEGER NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
            commit_id TEXT NOT NULL,
            observed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS changes (
            id INTEGER PRIMARY KEY,
            repo_id INTEGER NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
            from_commit TEXT NOT NULL,
            to_commit TEXT NOT NULL,
            kind TEXT NOT NULL,
            diff_stats TEXT,
            created_at TEXT NOT NULL,
            drift INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY,
            change_id INTEGER NOT NULL REFERENCES changes(id) ON DELETE CASCADE,
            path TEXT NOT NULL,
            status TEXT NOT NULL,
            exit_code INTEGER,
            started_at TEXT,
            finished_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_tracked_repo ON tracked(repo_id);
        CREATE INDEX IF NOT EXISTS idx_snapshots_repo ON snapshots(repo_id);
        CREATE INDEX IF NOT EXISTS idx_changes_repo ON changes(repo_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_change ON sessions(change_id);
        ",
    )?;

    let current: Option<i64> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).ok();
    match current {
        None => {
            conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(version) => {
            return Err(ScoutError::SessionInvalid {
                reason: format!(
                    "unsupported watch store schema version {version}; expected {SCHEMA_VERSION}"
                ),
            });
        }
    }
    Ok(())
}

fn map_repo(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepoRow> {
    Ok(RepoRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        url: row.get(2)?,
        default_branch: row.get(3)?,
        license: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_tracked(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<TrackedRow>> {
    let kind_raw: String = row.get(2)?;
    let paths_raw: String = row.get(3)?;
    Ok((|| {
        let kind = TargetKind::from_str(&kind_raw)
            .map_err(|reason| ScoutError::SessionInvalid { reason })?;
        let paths: Vec<String> = serde_json::from_str(&paths_raw)?;
        Ok(TrackedRow {
            id: row.get(0)?,
            repo_id: row.get(1)?,
            kind,
            paths,
            enabled: row.get(4)?,
            interval_hours: row.get(5)?,
        })
    })())
}

fn map_change(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<ChangeRow>> {
    let kind_raw: String = row.get(4)?;
    let stats_raw: Option<String> = row.get(5)?;
    Ok((|| {
        let kind = TargetKind::from_str(&kind_raw)
            .map_err(|reason| ScoutError::SessionInvalid { reason })?;
        let stats = stats_raw.as_deref().map(serde_json::from_str).transpose()?;
        Ok(ChangeRow {
            id: row.get(0)?,
            repo_id: row.get(1)?,
            from_commit: row.get(2)?,
            to_commit: row.get(3)?,
            kind,
            stats,
            created_at: row.get(6)?,
            drift: row.get(7)?,
        })
    })())
}

fn map_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<SessionRow>> {
    let status_raw: String = row.get(3)?;
    let path_raw: String = row.get(2)?;
    Ok((|| {
        Ok(SessionRow {
            id: row.get(0)?,
            change_id: row.get(1)?,
            path: PathBuf::from(path_raw),
            status: SessionStatus::parse(&status_raw)?,
            exit_code: row.get(4)?,
            started_at: row.get(5)?,
            finished_at: row.get(6)?,
        })
    })())
}
