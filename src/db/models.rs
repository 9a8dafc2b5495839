use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A mirrored forum message. `content` is the raw BBC source; a null value
/// means "not yet fetched" unless `deleted` is set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub mid: i64,
    pub subject: Option<String>,
    pub posted_at: Option<String>,
    pub edited_at: Option<String>,
    pub content: Option<String>,
    pub uid: Option<i64>,
    pub icon: Option<String>,
    pub tid: i64,
    pub deleted: bool,
    pub last_scraped: Option<String>,
}

/// A mirrored forum user profile.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub uid: i64,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub user_group: Option<String>,
    pub posts: Option<i64>,
    pub signature: Option<String>,
    pub email: Option<String>,
    pub blurb: Option<String>,
    pub location: Option<String>,
    pub real_name: Option<String>,
    pub social: Option<String>,
    pub website: Option<String>,
    pub gender: Option<String>,
    pub last_scraped: Option<String>,
}

/// A mirrored topic. The name stays null until some scraped page resolves it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub tid: i64,
    pub topic_name: Option<String>,
    pub bid: Option<i64>,
}

/// A mirrored board.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub bid: i64,
    pub board_name: Option<String>,
}

/// A scraped user record as produced by the forum client. Absent fields stay
/// `None` and never clobber stored values on upsert.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub uid: i64,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub user_group: Option<String>,
    pub posts: Option<i64>,
    pub signature: Option<String>,
    pub email: Option<String>,
    pub blurb: Option<String>,
    pub location: Option<String>,
    pub real_name: Option<String>,
    pub social: Option<String>,
    pub website: Option<String>,
    pub gender: Option<String>,
}

/// A scraped message record as produced by the forum client.
///
/// Carries whatever topic/board/author context the source page exposed;
/// `upsert_message` fans the pieces out to their own tables.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub mid: i64,
    pub subject: Option<String>,
    pub posted_at: Option<NaiveDateTime>,
    pub edited_at: Option<NaiveDateTime>,
    pub content: Option<String>,
    pub icon: Option<String>,
    pub deleted: bool,
    pub tid: i64,
    pub topic_name: Option<String>,
    pub bid: Option<i64>,
    pub board_name: Option<String>,
    pub user: Option<NewUser>,
}

impl NewMessage {
    /// A bare record carrying only identity. Useful as a starting point for
    /// adapters and tests.
    #[must_use]
    pub fn bare(mid: i64, tid: i64) -> Self {
        Self {
            mid,
            subject: None,
            posted_at: None,
            edited_at: None,
            content: None,
            icon: None,
            deleted: false,
            tid,
            topic_name: None,
            bid: None,
            board_name: None,
            user: None,
        }
    }
}
