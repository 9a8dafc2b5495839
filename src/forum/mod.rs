//! Forum client boundary.
//!
//! The crawler only sees this trait: page fetches come back as typed records,
//! failures come back classified. [`http::HttpForumClient`] is the production
//! implementation; tests script their own.

pub mod http;

pub use http::HttpForumClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::{NewMessage, NewUser};

/// Failure classification for forum requests.
///
/// The crawler retries `Transient` forever and treats `NotFound` as evidence
/// of deletion at per-message granularity; unclassified failures surface
/// through other channels and abort the crawl cycle.
#[derive(Debug, Error)]
pub enum ForumError {
    #[error("transient transport error: {0}")]
    Transient(#[source] anyhow::Error),
    #[error("page or message not found")]
    NotFound,
}

pub type ForumResult<T> = Result<T, ForumError>;

/// A page-oriented view of the forum.
///
/// All methods may return [`ForumError::Transient`] on transport failures;
/// the per-message methods additionally signal [`ForumError::NotFound`] when
/// the forum rejects the id (deleted or never existed).
#[async_trait]
pub trait ForumClient: Send + Sync {
    /// Fetch one page of the recent-activity listing, newest first.
    /// `offset` is the message offset, not a page number.
    async fn fetch_recent_page(&self, offset: u32) -> ForumResult<Vec<NewMessage>>;

    /// Fetch the topic page containing the given message, returning every
    /// message visible on that page.
    async fn fetch_message_page(&self, mid: i64) -> ForumResult<Vec<NewMessage>>;

    /// Fetch the raw BBC source of a single message.
    async fn fetch_raw_content(&self, mid: i64) -> ForumResult<String>;

    /// Fetch a user's profile page.
    async fn fetch_user_profile(&self, uid: i64) -> ForumResult<NewUser>;
}
