//! Statistics query composition.
//!
//! Turns request-level filter parameters into grouped, time-bucketed count
//! queries and a gap-free [`TimeSeries`]. All validation happens before any
//! SQL runs; id filters are rendered through a predicate tree with bound
//! parameters, never interpolated.

mod backfill;
mod filters;

pub use backfill::fill_series;
pub use filters::{Condition, FilterField};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::constants::MAX_CONDITIONS;
use crate::db::DATETIME_FORMAT;

/// Time-bucket granularity for count queries. Each carries its own bucket
/// label format, maximum queryable range, and default range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// strftime format producing the bucket label. Shared verbatim between
    /// SQLite and chrono so query output and backfill labels line up.
    #[must_use]
    pub fn bucket_format(self) -> &'static str {
        match self {
            Self::Hourly => "%Y-%m-%dT%H",
            Self::Daily => "%Y-%m-%d",
            Self::Weekly => "%Y-W%W",
            Self::Monthly => "%Y-%m",
        }
    }

    /// Widest allowed `end - start` for this granularity.
    #[must_use]
    pub fn range_limit(self) -> Duration {
        match self {
            Self::Hourly => Duration::weeks(1),
            Self::Daily => Duration::days(183),
            Self::Weekly => Duration::days(1095),
            Self::Monthly => Duration::days(7305),
        }
    }

    /// Range used when the request omits start/end.
    #[must_use]
    pub fn default_range(self) -> Duration {
        match self {
            Self::Hourly => Duration::days(1),
            Self::Daily => Duration::days(30),
            Self::Weekly => Duration::days(90),
            Self::Monthly => Duration::days(365),
        }
    }

    /// Native bucket interval used by the backfill walk.
    #[must_use]
    pub fn step(self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::weeks(1),
            Self::Monthly => Duration::days(28),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(StatsError::Validation(format!(
                "unknown sample granularity '{other}' (allowed: hourly, daily, weekly, monthly)"
            ))),
        }
    }
}

/// Errors from the statistics composer. Validation failures are rejected
/// before any query executes and map to a client error; store failures map to
/// a server-side error.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("{0}")]
    Validation(String),
    #[error("statistics query failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// Request-level filter parameters for [`count_over_time`].
#[derive(Debug, Clone)]
pub struct CountFilters {
    pub users: Vec<i64>,
    pub topics: Vec<i64>,
    pub boards: Vec<i64>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// OR all user ids into one condition instead of one series per id.
    pub combine_users: bool,
    pub combine_topics: bool,
    pub combine_boards: bool,
    /// Running totals ordered by bucket instead of per-bucket counts.
    pub cumulative: bool,
    /// Materialize every bucket in the range, not just buckets with data.
    pub fill: bool,
}

impl Default for CountFilters {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            topics: Vec::new(),
            boards: Vec::new(),
            start: None,
            end: None,
            combine_users: true,
            combine_topics: true,
            combine_boards: true,
            cumulative: false,
            fill: true,
        }
    }
}

/// A grouped, gap-filled count result: bucket label → series label → count.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    pub conditions: Vec<String>,
    pub start: String,
    pub end: String,
    pub counts: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Count messages per time bucket for every filter combination.
///
/// # Errors
///
/// Returns [`StatsError::Validation`] for a bad range or an over-limit
/// combination fan-out, and [`StatsError::Store`] when a query fails.
pub async fn count_over_time(
    pool: &SqlitePool,
    granularity: Granularity,
    filters: &CountFilters,
) -> Result<TimeSeries, StatsError> {
    count_over_time_at(pool, granularity, filters, Utc::now().naive_utc()).await
}

/// [`count_over_time`] with an injectable clock for the default range.
///
/// # Errors
///
/// Same as [`count_over_time`].
pub async fn count_over_time_at(
    pool: &SqlitePool,
    granularity: Granularity,
    filters: &CountFilters,
    now: NaiveDateTime,
) -> Result<TimeSeries, StatsError> {
    let end = filters.end.unwrap_or(now);
    let start = filters.start.unwrap_or(end - granularity.default_range());

    if end <= start {
        return Err(StatsError::Validation(format!(
            "empty time range: start {start} is not before end {end}"
        )));
    }
    if end - start > granularity.range_limit() {
        return Err(StatsError::Validation(format!(
            "range exceeds the {granularity} limit of {} days",
            granularity.range_limit().num_days()
        )));
    }

    let combinations = expand_conditions(filters)?;
    let labels: Vec<String> = combinations.iter().map(Condition::label).collect();

    let start_text = start.format(DATETIME_FORMAT).to_string();
    let end_text = end.format(DATETIME_FORMAT).to_string();

    let mut counts: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for (condition, label) in combinations.iter().zip(&labels) {
        let rows = run_count_query(
            pool,
            granularity,
            condition,
            &start_text,
            &end_text,
            filters.cumulative,
        )
        .await?;

        for (bucket, n) in rows {
            counts.entry(bucket).or_default().insert(label.clone(), n);
        }
    }

    let counts = fill_series(
        counts,
        &labels,
        start,
        end,
        granularity,
        filters.cumulative,
        filters.fill,
    );

    Ok(TimeSeries {
        conditions: labels,
        start: start_text,
        end: end_text,
        counts,
    })
}

async fn run_count_query(
    pool: &SqlitePool,
    granularity: Granularity,
    condition: &Condition,
    start: &str,
    end: &str,
    cumulative: bool,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let mut params = Vec::new();
    let condition_sql = condition.to_sql(&mut params);

    // Board filters live on the topics side of the join; the join is cheap
    // enough to keep unconditional.
    let grouped = format!(
        "SELECT strftime(?, m.posted_at) AS bucket, COUNT(*) AS n \
         FROM messages m JOIN topics t ON t.tid = m.tid \
         WHERE {condition_sql} AND m.posted_at >= ? AND m.posted_at < ? \
         GROUP BY bucket"
    );
    let sql = if cumulative {
        format!("SELECT bucket, SUM(n) OVER (ORDER BY bucket) FROM ({grouped}) ORDER BY bucket")
    } else {
        format!("{grouped} ORDER BY bucket")
    };

    let mut query = sqlx::query_as::<_, (String, i64)>(&sql).bind(granularity.bucket_format());
    for param in params {
        query = query.bind(param);
    }
    query = query.bind(start).bind(end);

    query.fetch_all(pool).await
}

/// Expand per-axis id sets into the Cartesian product of conditions, one
/// output series per element.
fn expand_conditions(filters: &CountFilters) -> Result<Vec<Condition>, StatsError> {
    let users = axis_conditions(FilterField::User, &filters.users, filters.combine_users);
    let topics = axis_conditions(FilterField::Topic, &filters.topics, filters.combine_topics);
    let boards = axis_conditions(FilterField::Board, &filters.boards, filters.combine_boards);

    let total = users.len() * topics.len() * boards.len();
    if total > MAX_CONDITIONS {
        return Err(StatsError::Validation(format!(
            "too many filter combinations ({total}, limit {MAX_CONDITIONS})"
        )));
    }

    let mut combinations = Vec::with_capacity(total);
    for user in &users {
        for topic in &topics {
            for board in &boards {
                let mut parts: Vec<Condition> = [user, topic, board]
                    .into_iter()
                    .filter_map(Clone::clone)
                    .collect();
                combinations.push(match parts.len() {
                    0 => Condition::All,
                    1 => parts.remove(0),
                    _ => Condition::And(parts),
                });
            }
        }
    }

    Ok(combinations)
}

/// One axis of the product: absent → a single unconstrained slot, combined →
/// one OR-ed condition, otherwise one condition per id.
fn axis_conditions(field: FilterField, ids: &[i64], combine: bool) -> Vec<Option<Condition>> {
    let mut unique = Vec::new();
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    if unique.is_empty() {
        vec![None]
    } else if combine {
        vec![Some(Condition::any_of(field, unique))]
    } else {
        unique
            .into_iter()
            .map(|id| Some(Condition::Eq(field, id)))
            .collect()
    }
}
