use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating mirror schema");

    // Messages table. mid is the forum's own id, not assigned here.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS messages (
            mid INTEGER PRIMARY KEY,
            subject TEXT,
            posted_at TEXT,
            edited_at TEXT,
            content TEXT,
            uid INTEGER,
            icon TEXT,
            tid INTEGER NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0,
            last_scraped TEXT
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create messages table")?;

    // Users table
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS users (
            uid INTEGER PRIMARY KEY,
            name TEXT,
            avatar TEXT,
            user_group TEXT,
            posts INTEGER,
            signature TEXT,
            email TEXT,
            blurb TEXT,
            location TEXT,
            real_name TEXT,
            social TEXT,
            website TEXT,
            gender TEXT,
            last_scraped TEXT
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    // Topics table
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS topics (
            tid INTEGER PRIMARY KEY,
            topic_name TEXT,
            bid INTEGER
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create topics table")?;

    // Boards table
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS boards (
            bid INTEGER PRIMARY KEY,
            board_name TEXT
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create boards table")?;

    // Scraper bookkeeping (phase timestamps and the like)
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS statistics (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create statistics table")?;

    // Indexes for common queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_posted_at ON messages(posted_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_uid ON messages(uid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_tid ON messages(tid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_topics_bid ON topics(bid)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: full-text search tables");

    // External-content FTS5 over message subject/content
    sqlx::query(
        r"
        CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
            subject,
            content,
            content='messages',
            content_rowid='mid'
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create messages FTS table")?;

    // Triggers to keep FTS in sync with the messages table
    sqlx::query(
        r"
        CREATE TRIGGER IF NOT EXISTS messages_fts_insert AFTER INSERT ON messages BEGIN
            INSERT INTO messages_fts(rowid, subject, content)
            VALUES (new.mid, new.subject, new.content);
        END
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create messages FTS insert trigger")?;

    sqlx::query(
        r"
        CREATE TRIGGER IF NOT EXISTS messages_fts_delete AFTER DELETE ON messages BEGIN
            INSERT INTO messages_fts(messages_fts, rowid, subject, content)
            VALUES ('delete', old.mid, old.subject, old.content);
        END
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create messages FTS delete trigger")?;

    sqlx::query(
        r"
        CREATE TRIGGER IF NOT EXISTS messages_fts_update AFTER UPDATE ON messages BEGIN
            INSERT INTO messages_fts(messages_fts, rowid, subject, content)
            VALUES ('delete', old.mid, old.subject, old.content);
            INSERT INTO messages_fts(rowid, subject, content)
            VALUES (new.mid, new.subject, new.content);
        END
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create messages FTS update trigger")?;

    // External-content FTS5 over topic names
    sqlx::query(
        r"
        CREATE VIRTUAL TABLE IF NOT EXISTS topics_fts USING fts5(
            topic_name,
            content='topics',
            content_rowid='tid'
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create topics FTS table")?;

    sqlx::query(
        r"
        CREATE TRIGGER IF NOT EXISTS topics_fts_insert AFTER INSERT ON topics BEGIN
            INSERT INTO topics_fts(rowid, topic_name)
            VALUES (new.tid, new.topic_name);
        END
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create topics FTS insert trigger")?;

    sqlx::query(
        r"
        CREATE TRIGGER IF NOT EXISTS topics_fts_delete AFTER DELETE ON topics BEGIN
            INSERT INTO topics_fts(topics_fts, rowid, topic_name)
            VALUES ('delete', old.tid, old.topic_name);
        END
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create topics FTS delete trigger")?;

    sqlx::query(
        r"
        CREATE TRIGGER IF NOT EXISTS topics_fts_update AFTER UPDATE ON topics BEGIN
            INSERT INTO topics_fts(topics_fts, rowid, topic_name)
            VALUES ('delete', old.tid, old.topic_name);
            INSERT INTO topics_fts(rowid, topic_name)
            VALUES (new.tid, new.topic_name);
        END
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create topics FTS update trigger")?;

    Ok(())
}
