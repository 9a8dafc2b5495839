use std::collections::BTreeMap;

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;
use crate::backup;
use crate::db::{self, Message, Topic};
use crate::stats::{self, CountFilters, Granularity, TimeSeries};

const SEARCH_RESULT_LIMIT: i64 = 50;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/message/:mid", get(message_detail))
        .route("/api/post/:mid", get(message_detail))
        .route("/api/user/:uid", get(user_detail))
        .route("/api/topic/:tid", get(topic_detail))
        .route("/api/search/messages", get(search_messages))
        .route("/api/search/topics", get(search_topics))
        .route("/api/stats", get(statistics))
        .route("/api/counts/:sample", get(message_counts))
        .route("/api/backups", get(list_backups))
        .route("/api/backups/:name", get(download_backup))
}

async fn health() -> &'static str {
    "OK"
}

// ========== Record lookups ==========

async fn message_detail(
    State(state): State<AppState>,
    Path(mid): Path<i64>,
) -> Result<Json<Message>, ApiError> {
    db::get_message(state.db.pool(), mid)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn user_detail(
    State(state): State<AppState>,
    Path(uid): Path<i64>,
) -> Result<Json<db::User>, ApiError> {
    db::get_user(state.db.pool(), uid)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn topic_detail(
    State(state): State<AppState>,
    Path(tid): Path<i64>,
) -> Result<Json<Topic>, ApiError> {
    db::get_topic(state.db.pool(), tid)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

// ========== Search ==========

#[derive(Debug, Deserialize)]
struct MessageSearchParams {
    subject: Option<String>,
    content: Option<String>,
    q: Option<String>,
}

async fn search_messages(
    State(state): State<AppState>,
    Query(params): Query<MessageSearchParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let mut terms = Vec::new();
    if let Some(subject) = params.subject.as_deref() {
        terms.push(format!("subject: {}", fts_phrase(subject)));
    }
    if let Some(content) = params.content.as_deref() {
        terms.push(format!("content: {}", fts_phrase(content)));
    }
    if let Some(q) = params.q.as_deref() {
        terms.push(fts_phrase(q));
    }
    if terms.is_empty() {
        return Err(ApiError::Validation(
            "provide at least one of: subject, content, q".to_string(),
        ));
    }

    let results =
        db::search_messages(state.db.pool(), &terms.join(" AND "), SEARCH_RESULT_LIMIT).await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct TopicSearchParams {
    q: String,
}

async fn search_topics(
    State(state): State<AppState>,
    Query(params): Query<TopicSearchParams>,
) -> Result<Json<Vec<Topic>>, ApiError> {
    let results =
        db::search_topics(state.db.pool(), &fts_phrase(&params.q), SEARCH_RESULT_LIMIT).await?;
    Ok(Json(results))
}

/// Quote a user term as an FTS5 phrase so query syntax cannot leak through.
fn fts_phrase(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

// ========== Statistics ==========

async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(db::get_statistics(state.db.pool()).await?))
}

async fn message_counts(
    State(state): State<AppState>,
    Path(sample): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<TimeSeries>, ApiError> {
    let granularity: Granularity = sample.parse().map_err(ApiError::from)?;
    let filters =
        parse_count_filters(query.as_deref().unwrap_or("")).map_err(ApiError::Validation)?;

    let series = stats::count_over_time(state.db.pool(), granularity, &filters).await?;
    Ok(Json(series))
}

/// Parse the counts query string by hand: the id parameters repeat, which the
/// usual form deserializer cannot express.
fn parse_count_filters(query: &str) -> Result<CountFilters, String> {
    let mut filters = CountFilters::default();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "user" => filters.users.push(parse_id("user", &value)?),
            "topic" => filters.topics.push(parse_id("topic", &value)?),
            "board" => filters.boards.push(parse_id("board", &value)?),
            "start" => filters.start = Some(parse_datetime("start", &value)?),
            "end" => filters.end = Some(parse_datetime("end", &value)?),
            "combine_users" => filters.combine_users = parse_flag("combine_users", &value)?,
            "combine_topics" => filters.combine_topics = parse_flag("combine_topics", &value)?,
            "combine_boards" => filters.combine_boards = parse_flag("combine_boards", &value)?,
            "cumulative" => filters.cumulative = parse_flag("cumulative", &value)?,
            "fill" => filters.fill = parse_flag("fill", &value)?,
            _ => {}
        }
    }

    Ok(filters)
}

fn parse_id(name: &str, value: &str) -> Result<i64, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {name} id '{value}'"))
}

fn parse_datetime(name: &str, value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| format!("invalid {name} datetime '{value}' (ISO-8601 expected)"))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("invalid {name} flag '{other}'")),
    }
}

// ========== Backups ==========

async fn list_backups(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let manifest = backup::read_manifest(&state.config.backup_dir).await?;
    Ok(Json(manifest))
}

async fn download_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let manifest = backup::read_manifest(&state.config.backup_dir).await?;

    // Only manifest-listed names resolve to files; anything else (including
    // traversal attempts) is a plain 404.
    let Some((taken_at, _)) = manifest.iter().find(|(_, file)| **file == name) else {
        return Err(ApiError::NotFound);
    };

    let bytes = tokio::fs::read(state.config.backup_dir.join(&name))
        .await
        .map_err(|e| ApiError::Store(e.into()))?;

    let headers = [
        (header::CONTENT_TYPE, "application/zstd".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"backup-{taken_at}.sqlite.zst\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}
