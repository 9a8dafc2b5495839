use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use super::models::{Board, Message, NewMessage, NewUser, Topic, User};
use super::DATETIME_FORMAT;

/// Current UTC time in the stored TEXT format.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().format(DATETIME_FORMAT).to_string()
}

fn format_datetime(dt: Option<NaiveDateTime>) -> Option<String> {
    dt.map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

// ========== Messages ==========

/// Insert or merge a scraped message, fanning out its board/topic/author
/// context first so foreign references resolve in id lookups.
///
/// Merge contract: fields absent (null) in the record never overwrite stored
/// non-null values. The one exception is `content` when the record carries the
/// deleted flag, which blanks it deliberately.
///
/// # Errors
///
/// Returns an error if any of the writes fail.
pub async fn upsert_message(pool: &SqlitePool, msg: &NewMessage) -> Result<()> {
    // Boards are only known from some page types; skip the row entirely when
    // the record has no board context.
    if let Some(bid) = msg.bid {
        upsert_board(pool, bid, msg.board_name.as_deref()).await?;
    }

    upsert_topic(pool, msg.tid, msg.topic_name.as_deref(), msg.bid).await?;

    if let Some(user) = &msg.user {
        upsert_user(pool, user).await?;
    }

    sqlx::query(
        r"
        INSERT INTO messages (mid, subject, posted_at, edited_at, content, uid, icon, tid, deleted, last_scraped)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(mid) DO UPDATE SET
            subject = COALESCE(excluded.subject, messages.subject),
            posted_at = COALESCE(excluded.posted_at, messages.posted_at),
            edited_at = COALESCE(excluded.edited_at, messages.edited_at),
            content = CASE WHEN excluded.deleted
                           THEN NULL
                           ELSE COALESCE(excluded.content, messages.content) END,
            uid = COALESCE(excluded.uid, messages.uid),
            icon = COALESCE(excluded.icon, messages.icon),
            tid = excluded.tid,
            deleted = excluded.deleted,
            last_scraped = excluded.last_scraped
        ",
    )
    .bind(msg.mid)
    .bind(&msg.subject)
    .bind(format_datetime(msg.posted_at))
    .bind(format_datetime(msg.edited_at))
    .bind(&msg.content)
    .bind(msg.user.as_ref().map(|u| u.uid))
    .bind(&msg.icon)
    .bind(msg.tid)
    .bind(msg.deleted)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to upsert message")?;

    Ok(())
}

/// Get a message by its forum id.
pub async fn get_message(pool: &SqlitePool, mid: i64) -> Result<Option<Message>> {
    sqlx::query_as("SELECT * FROM messages WHERE mid = ?")
        .bind(mid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch message")
}

/// Whether a message row exists with resolved (non-null) content.
///
/// This is the scan phase's skip check: rows stored with null content by a
/// non-greedy page scrape still count as unfetched.
pub async fn message_has_content(pool: &SqlitePool, mid: i64) -> Result<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM messages WHERE mid = ? AND content IS NOT NULL")
            .bind(mid)
            .fetch_optional(pool)
            .await
            .context("Failed to check message content")?;

    Ok(row.is_some())
}

/// Maximum known message id (the high watermark), if any messages are stored.
pub async fn max_mid(pool: &SqlitePool) -> Result<Option<i64>> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(mid) FROM messages")
        .fetch_one(pool)
        .await
        .context("Failed to fetch max message id")?;

    Ok(row.0)
}

/// Minimum known message id (the low watermark), if any messages are stored.
pub async fn min_mid(pool: &SqlitePool) -> Result<Option<i64>> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MIN(mid) FROM messages")
        .fetch_one(pool)
        .await
        .context("Failed to fetch min message id")?;

    Ok(row.0)
}

/// Stored post times for the given message ids, keyed by id. Ids with no row
/// or no recorded post time are simply absent from the map.
pub async fn posted_times(
    pool: &SqlitePool,
    mids: &[i64],
) -> Result<HashMap<i64, NaiveDateTime>> {
    if mids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; mids.len()].join(", ");
    let sql = format!(
        "SELECT mid, posted_at FROM messages WHERE mid IN ({placeholders}) AND posted_at IS NOT NULL"
    );

    let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
    for mid in mids {
        query = query.bind(*mid);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to fetch post times")?;

    Ok(rows
        .into_iter()
        .filter_map(|(mid, text)| {
            NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
                .ok()
                .map(|dt| (mid, dt))
        })
        .collect())
}

/// Full-text search over message subject/content.
///
/// `match_expr` is an FTS5 MATCH expression. Callers must phrase-quote user
/// terms before composing it; raw input is not a valid expression.
pub async fn search_messages(
    pool: &SqlitePool,
    match_expr: &str,
    limit: i64,
) -> Result<Vec<Message>> {
    sqlx::query_as(
        r"
        SELECT m.*
        FROM messages m
        JOIN messages_fts ON m.mid = messages_fts.rowid
        WHERE messages_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        ",
    )
    .bind(match_expr)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search messages")
}

// ========== Users ==========

/// Insert or merge a scraped user profile. Fields absent in the record keep
/// their stored values; `last_scraped` always advances.
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn upsert_user(pool: &SqlitePool, user: &NewUser) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO users (uid, name, avatar, user_group, posts, signature, email, blurb,
                           location, real_name, social, website, gender, last_scraped)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(uid) DO UPDATE SET
            name = COALESCE(excluded.name, users.name),
            avatar = COALESCE(excluded.avatar, users.avatar),
            user_group = COALESCE(excluded.user_group, users.user_group),
            posts = COALESCE(excluded.posts, users.posts),
            signature = COALESCE(excluded.signature, users.signature),
            email = COALESCE(excluded.email, users.email),
            blurb = COALESCE(excluded.blurb, users.blurb),
            location = COALESCE(excluded.location, users.location),
            real_name = COALESCE(excluded.real_name, users.real_name),
            social = COALESCE(excluded.social, users.social),
            website = COALESCE(excluded.website, users.website),
            gender = COALESCE(excluded.gender, users.gender),
            last_scraped = excluded.last_scraped
        ",
    )
    .bind(user.uid)
    .bind(&user.name)
    .bind(&user.avatar)
    .bind(&user.user_group)
    .bind(user.posts)
    .bind(&user.signature)
    .bind(&user.email)
    .bind(&user.blurb)
    .bind(&user.location)
    .bind(&user.real_name)
    .bind(&user.social)
    .bind(&user.website)
    .bind(&user.gender)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to upsert user")?;

    Ok(())
}

/// Get a user by id.
pub async fn get_user(pool: &SqlitePool, uid: i64) -> Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE uid = ?")
        .bind(uid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch user")
}

/// All stored user ids, for the user refresh phase.
pub async fn all_user_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT uid FROM users ORDER BY uid")
        .fetch_all(pool)
        .await
        .context("Failed to list user ids")?;

    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}

// ========== Topics & Boards ==========

/// Insert or replace a topic. Unlike messages and users this overwrites
/// unconditionally: a later scrape of the same topic simply carries equal or
/// better context.
pub async fn upsert_topic(
    pool: &SqlitePool,
    tid: i64,
    topic_name: Option<&str>,
    bid: Option<i64>,
) -> Result<()> {
    // ON CONFLICT UPDATE rather than INSERT OR REPLACE so the FTS sync
    // trigger sees an UPDATE, not a DELETE+INSERT.
    sqlx::query(
        r"
        INSERT INTO topics (tid, topic_name, bid)
        VALUES (?, ?, ?)
        ON CONFLICT(tid) DO UPDATE SET
            topic_name = excluded.topic_name,
            bid = excluded.bid
        ",
    )
    .bind(tid)
    .bind(topic_name)
    .bind(bid)
    .execute(pool)
    .await
    .context("Failed to upsert topic")?;

    Ok(())
}

/// Get a topic by id.
pub async fn get_topic(pool: &SqlitePool, tid: i64) -> Result<Option<Topic>> {
    sqlx::query_as("SELECT * FROM topics WHERE tid = ?")
        .bind(tid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch topic")
}

/// Full-text search over topic names.
pub async fn search_topics(pool: &SqlitePool, match_expr: &str, limit: i64) -> Result<Vec<Topic>> {
    sqlx::query_as(
        r"
        SELECT t.*
        FROM topics t
        JOIN topics_fts ON t.tid = topics_fts.rowid
        WHERE topics_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        ",
    )
    .bind(match_expr)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search topics")
}

/// Insert or replace a board row.
pub async fn upsert_board(pool: &SqlitePool, bid: i64, board_name: Option<&str>) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO boards (bid, board_name)
        VALUES (?, ?)
        ON CONFLICT(bid) DO UPDATE SET
            board_name = COALESCE(excluded.board_name, boards.board_name)
        ",
    )
    .bind(bid)
    .bind(board_name)
    .execute(pool)
    .await
    .context("Failed to upsert board")?;

    Ok(())
}

/// Get a board by id.
pub async fn get_board(pool: &SqlitePool, bid: i64) -> Result<Option<Board>> {
    sqlx::query_as("SELECT * FROM boards WHERE bid = ?")
        .bind(bid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch board")
}

// ========== Statistics ==========

/// Record a scraper statistic. Last write wins.
pub async fn record_statistic(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO statistics (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("Failed to record statistic")?;

    Ok(())
}

/// All recorded statistics, keyed by name.
pub async fn get_statistics(pool: &SqlitePool) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM statistics")
        .fetch_all(pool)
        .await
        .context("Failed to fetch statistics")?;

    Ok(rows.into_iter().collect())
}
