//! Database migrations
//!
//! Ordered, additive-only migrations tracked in `schema_version`. Each
//! migration runs at most once; re-running the sequence is a no-op.

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }
    if version < 3 {
        migrate_v3(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Apply a migration's statements inside one transaction.
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            [i64::from(version)],
        )
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: Initial schema
///
/// Every syncable table carries the sync metadata columns: a nullable unique
/// `remote_id`, the integer `sync_status` tag, and `last_synced_at`.
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            remote_id TEXT UNIQUE,
            sync_status INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER
        )",
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
            title TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 1,
            state INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            remote_id TEXT UNIQUE,
            sync_status INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_tasks_project_order ON tasks(project_id, sort_order)",
        "CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            duration_seconds INTEGER NOT NULL DEFAULT 0,
            focused_seconds INTEGER NOT NULL DEFAULT 0,
            distraction_count INTEGER NOT NULL DEFAULT 0,
            is_complete INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            remote_id TEXT UNIQUE,
            sync_status INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER
        )",
        "CREATE TABLE IF NOT EXISTS session_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            event_type TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            app_name TEXT,
            duration_seconds INTEGER,
            metadata TEXT,
            created_at INTEGER NOT NULL,
            remote_id TEXT UNIQUE,
            sync_status INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_session_events_session
             ON session_events(session_id, timestamp)",
        // Settings table (local only)
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    ];

    apply(conn, 1, &statements).await
}

/// Migration to version 2: Partial indexes over the not-synced subsets
///
/// The reconciliation pipeline scans for pending records every cycle; these
/// indexes keep that scan cheap as the synced majority grows.
async fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_projects_pending
             ON projects(sync_status) WHERE sync_status != 1",
        "CREATE INDEX IF NOT EXISTS idx_tasks_pending
             ON tasks(sync_status) WHERE sync_status != 1",
        "CREATE INDEX IF NOT EXISTS idx_sessions_pending
             ON sessions(sync_status) WHERE sync_status != 1",
        "CREATE INDEX IF NOT EXISTS idx_session_events_pending
             ON session_events(sync_status) WHERE sync_status != 1",
    ];

    apply(conn, 2, &statements).await
}

/// Migration to version 3: Task estimates and due dates
async fn migrate_v3(conn: &Connection) -> Result<()> {
    let statements = [
        "ALTER TABLE tasks ADD COLUMN estimate_minutes INTEGER",
        "ALTER TABLE tasks ADD COLUMN due_date INTEGER",
    ];

    apply(conn, 3, &statements).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_all_entity_tables_exist() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in ["projects", "tasks", "sessions", "session_events", "settings"] {
            let mut rows = conn
                .query(
                    "SELECT EXISTS(
                        SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?
                    )",
                    [table],
                )
                .await
                .unwrap();

            let exists = rows
                .next()
                .await
                .unwrap()
                .is_some_and(|row| row.get::<i32>(0).unwrap() != 0);
            assert!(exists, "missing table {table}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migration_v3_adds_task_columns() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        conn.execute(
            "INSERT INTO tasks (title, created_at, updated_at, estimate_minutes, due_date)
             VALUES ('t', 1, 1, 25, 2)",
            (),
        )
        .await
        .unwrap();
    }
}
