//! The phased crawl controller.
//!
//! One cycle runs four phases in fixed order:
//!
//! - **Discovery**: walk the recent-activity listing until a known id shows
//!   up, storing everything new.
//! - **Scan**: walk message ids downward over the gap Discovery left and the
//!   backlog below the low watermark, fetching ids without stored content.
//! - **Review**: re-fetch a recency-weighted random sample to repair rows
//!   stored with null content and to pick up edits and deletions.
//! - **User refresh**: re-fetch every stored user profile.
//!
//! Each phase start is recorded in the statistics table. Transient transport
//! errors never escape (they retry forever); a not-found is handled where it
//! occurs as evidence of deletion; anything else aborts the cycle, is logged,
//! and propagates to the caller after a best-effort bookkeeping flush.

pub mod retry;
pub mod sampler;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::constants::{
    DISCOVERY_PAGE_BOUND, FLOOR_MID, GREEDY_SCRAPE, RECENT_PAGE_SIZE, RETRY_DELAY,
    REVIEW_SAMPLE_SIZE,
};
use crate::db::{self, Database, NewMessage};
use crate::forum::{ForumClient, ForumError};
use retry::with_retry;

/// Where Discovery stopped, handed to Scan to bound its first range.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOutcome {
    /// Max known message id before the cycle started.
    pub high_watermark: i64,
    /// The last (oldest) listing id Discovery processed. Equal to the high
    /// watermark when Discovery had nothing new to do.
    pub frontier: i64,
}

/// The crawl controller. Drives one forum client against one database.
pub struct Crawler<C> {
    client: C,
    db: Database,
}

impl<C: ForumClient> Crawler<C> {
    pub fn new(client: C, db: Database) -> Self {
        Self { client, db }
    }

    /// The forum client driving this crawler.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run crawl cycles until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first unclassified error; transient and not-found
    /// conditions are absorbed per the phase rules.
    pub async fn run(&self) -> Result<()> {
        info!("Entering crawl loop");
        loop {
            self.run_cycle().await?;
        }
    }

    /// Run one full Discovery → Scan → Review → UserRefresh cycle.
    ///
    /// # Errors
    ///
    /// Returns an error only for unclassified failures, after logging at the
    /// highest severity and flushing a bookkeeping record of the failure.
    pub async fn run_cycle(&self) -> Result<()> {
        let result = self.cycle_inner().await;

        if let Err(e) = &result {
            error!("Fatal error in crawl cycle: {e:#}");
            // Statements autocommit, so stored rows are already safe; this
            // flush just stamps the failure for the statistics endpoint.
            if let Err(flush_err) = db::record_statistic(
                self.db.pool(),
                "scraper.last_error",
                &format!("{e:#}"),
            )
            .await
            {
                error!("Failed to record crawl failure: {flush_err:#}");
            }
        }

        result
    }

    async fn cycle_inner(&self) -> Result<()> {
        let outcome = self.discovery().await?;
        self.scan(outcome).await?;
        self.review().await?;
        self.refresh_users().await?;
        Ok(())
    }

    /// Discovery phase: walk the recent listing newest-first until a known id
    /// appears, fetching raw content for and upserting every new message.
    ///
    /// # Errors
    ///
    /// Returns an error on unclassified failures.
    pub async fn discovery(&self) -> Result<DiscoveryOutcome> {
        info!("Entering discovery phase");
        self.record_phase("phases.discovery").await?;

        let high_watermark = db::max_mid(self.db.pool()).await?.unwrap_or(1);
        let mut frontier = high_watermark;

        'listing: for page in 0..DISCOVERY_PAGE_BOUND {
            let offset = page * RECENT_PAGE_SIZE;
            let listing = match with_retry("recent listing", RETRY_DELAY, || {
                self.client.fetch_recent_page(offset)
            })
            .await
            {
                Ok(listing) => listing,
                // Walked past the end of the listing.
                Err(ForumError::NotFound) => break,
                Err(e) => return Err(e.into()),
            };

            if listing.is_empty() {
                break;
            }

            for mut msg in listing {
                self.resolve_raw_content(&mut msg).await?;
                db::upsert_message(self.db.pool(), &msg).await?;
                frontier = msg.mid;
                if msg.mid <= high_watermark {
                    // Everything below this point in the listing is already
                    // known; discovery work is bounded to the new tail.
                    break 'listing;
                }
            }
        }

        debug!(high_watermark, frontier, "Discovery complete");
        Ok(DiscoveryOutcome {
            high_watermark,
            frontier,
        })
    }

    /// Scan phase: walk ids downward over (a) the gap between the old high
    /// watermark and Discovery's frontier, then (b) the backlog between the
    /// low watermark and the forum's floor id. Ids whose stored content is
    /// already resolved are skipped, which is what makes a re-run after a
    /// partial cycle cheap.
    ///
    /// # Errors
    ///
    /// Returns an error on unclassified failures.
    pub async fn scan(&self, discovery: DiscoveryOutcome) -> Result<()> {
        info!("Entering scan phase");
        self.record_phase("phases.scan").await?;

        let low_watermark = db::min_mid(self.db.pool()).await?.unwrap_or(1);

        // Latest posts first: the discovery gap is strictly newer than the
        // backlog below the low watermark.
        let gap = ((discovery.high_watermark + 1)..discovery.frontier).rev();
        let backlog = (FLOOR_MID..low_watermark).rev();

        for mid in gap.chain(backlog) {
            if db::message_has_content(self.db.pool(), mid).await? {
                continue;
            }
            self.scrape_message_page(mid).await?;
        }

        Ok(())
    }

    /// Review phase: re-fetch a recency-weighted sample of the known id
    /// range, overwriting whatever is stored.
    ///
    /// # Errors
    ///
    /// Returns an error on unclassified failures.
    pub async fn review(&self) -> Result<()> {
        info!("Entering review phase");
        self.record_phase("phases.review").await?;

        let Some(max_mid) = db::max_mid(self.db.pool()).await? else {
            debug!("Nothing stored yet, skipping review");
            return Ok(());
        };

        let sample = sampler::draw_review_sample(
            &self.db,
            FLOOR_MID,
            max_mid,
            REVIEW_SAMPLE_SIZE,
            Utc::now().naive_utc(),
        )
        .await?;

        debug!(sample_size = sample.len(), "Review sample drawn");
        for mid in sample {
            self.scrape_message_page(mid).await?;
        }

        Ok(())
    }

    /// User refresh phase: re-fetch every stored profile.
    ///
    /// # Errors
    ///
    /// Returns an error on unclassified failures.
    pub async fn refresh_users(&self) -> Result<()> {
        info!("Entering user refresh phase");
        self.record_phase("phases.users").await?;

        for uid in db::all_user_ids(self.db.pool()).await? {
            match with_retry("user profile", RETRY_DELAY, || {
                self.client.fetch_user_profile(uid)
            })
            .await
            {
                Ok(profile) => db::upsert_user(self.db.pool(), &profile).await?,
                Err(ForumError::NotFound) => {
                    info!(uid, "Profile no longer accessible, keeping stored record");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Fetch the topic page containing `mid` and upsert every message on it.
    /// A not-found page means the message is gone; that is recorded by
    /// skipping, not by erroring.
    async fn scrape_message_page(&self, mid: i64) -> Result<()> {
        let page = match with_retry("message page", RETRY_DELAY, || {
            self.client.fetch_message_page(mid)
        })
        .await
        {
            Ok(page) => page,
            Err(ForumError::NotFound) => {
                info!(mid, "Cannot scrape message page, assuming deleted");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        for mut msg in page {
            if GREEDY_SCRAPE || msg.mid == mid {
                self.resolve_raw_content(&mut msg).await?;
            } else {
                // Not fetched out of laziness; the review phase will resolve
                // it later.
                msg.content = None;
            }
            db::upsert_message(self.db.pool(), &msg).await?;
        }

        Ok(())
    }

    /// Fill in a message's raw BBC source. A not-found here marks the message
    /// deleted and blanks its content.
    async fn resolve_raw_content(&self, msg: &mut NewMessage) -> Result<()> {
        let mid = msg.mid;
        match with_retry("raw content", RETRY_DELAY, || {
            self.client.fetch_raw_content(mid)
        })
        .await
        {
            Ok(content) => {
                msg.content = Some(content);
            }
            Err(ForumError::NotFound) => {
                info!(mid, "Cannot fetch raw content, assuming deleted");
                msg.content = None;
                msg.deleted = true;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn record_phase(&self, key: &str) -> Result<()> {
        db::record_statistic(self.db.pool(), key, &db::now_timestamp()).await
    }
}
