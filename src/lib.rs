//! Forum mirror library.
//!
//! A service that incrementally scrapes an SMF forum into a SQLite mirror and
//! serves a JSON query/statistics API over the mirrored data.

pub mod backup;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod db;
pub mod forum;
pub mod stats;
pub mod web;
