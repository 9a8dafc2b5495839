//! Crawl tuning constants. These are deploy-time knobs: change them here and
//! rebuild, they are deliberately not runtime configuration.

use std::time::Duration;

/// User agent string sent with every forum request.
pub const SCRAPER_USER_AGENT: &str = "forum-mirror/0.1 (+https://github.com/forum-mirror)";

/// Multiplier applied to the most recently posted messages when drawing the
/// review sample. Must be at least 1.
pub const RECENT_MULTIPLIER: f64 = 5.0;

/// Half-life of the recency multiplier. A message this old carries half the
/// extra weight of a brand-new one.
pub const RECENT_HALF_LIFE_HOURS: i64 = 12;

/// Upper bound on the number of messages re-fetched per review phase.
pub const REVIEW_SAMPLE_SIZE: usize = 50;

/// The candidate pool for the review sample is this many times the sample
/// size (clamped to the addressable id range).
pub const REVIEW_CANDIDATE_FACTOR: usize = 8;

/// When scanning a topic page, fetch raw content for every message on the
/// page rather than only the requested one. Off by default: co-located
/// messages are stored with null content and repaired by the review phase.
pub const GREEDY_SCRAPE: bool = false;

/// Number of recent-activity listing pages walked per discovery phase.
pub const DISCOVERY_PAGE_BOUND: u32 = 10;

/// Messages per recent-activity listing page.
pub const RECENT_PAGE_SIZE: u32 = 10;

/// The earliest publicly addressable message id on the forum.
pub const FLOOR_MID: i64 = 3;

/// Fixed pause between retries of a transiently failed forum request.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on filter combinations a single statistics query may expand
/// into. Requests beyond this are rejected before any query runs.
pub const MAX_CONDITIONS: usize = 100;
