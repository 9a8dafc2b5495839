//! Integration tests for the crawl controller, driven by a scripted forum.
//!
//! The watermark handoff between discovery and scan is easy to get subtly
//! wrong, so its boundaries are pinned down explicitly here.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use forum_mirror::constants::RECENT_PAGE_SIZE;
use forum_mirror::crawler::{Crawler, DiscoveryOutcome};
use forum_mirror::db::{
    get_message, get_statistics, get_user, upsert_message, upsert_user, Database, NewMessage,
    NewUser,
};
use forum_mirror::forum::{ForumClient, ForumError, ForumResult};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

#[derive(Clone)]
struct ForumPost {
    mid: i64,
    tid: i64,
    uid: i64,
    content: String,
}

/// An in-memory forum with call recording.
#[derive(Default)]
struct ScriptedForum {
    posts: BTreeMap<i64, ForumPost>,
    missing_profiles: HashSet<i64>,
    page_fetches: Mutex<Vec<i64>>,
    raw_fetches: Mutex<Vec<i64>>,
    profile_fetches: Mutex<Vec<i64>>,
}

impl ScriptedForum {
    /// One post per topic unless stated otherwise, so a message-page fetch
    /// returns exactly the requested message.
    fn with_posts(mids: impl IntoIterator<Item = i64>) -> Self {
        let mut forum = Self::default();
        for mid in mids {
            forum.add_post(mid, mid, 1);
        }
        forum
    }

    fn add_post(&mut self, mid: i64, tid: i64, uid: i64) {
        self.posts.insert(
            mid,
            ForumPost {
                mid,
                tid,
                uid,
                content: format!("raw content {mid}"),
            },
        );
    }

    fn stub(&self, post: &ForumPost) -> NewMessage {
        let mut msg = NewMessage::bare(post.mid, post.tid);
        msg.subject = Some(format!("Subject {}", post.mid));
        msg.posted_at = Some(at("2024-01-15T12:00:00"));
        msg.topic_name = Some(format!("Topic {}", post.tid));
        msg.user = Some(NewUser {
            uid: post.uid,
            name: Some(format!("user-{}", post.uid)),
            ..NewUser::default()
        });
        msg
    }

    fn page_fetches(&self) -> Vec<i64> {
        self.page_fetches.lock().unwrap().clone()
    }

    fn raw_fetches(&self) -> Vec<i64> {
        self.raw_fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForumClient for ScriptedForum {
    async fn fetch_recent_page(&self, offset: u32) -> ForumResult<Vec<NewMessage>> {
        let mut all: Vec<&ForumPost> = self.posts.values().collect();
        all.sort_by_key(|p| std::cmp::Reverse(p.mid));
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(RECENT_PAGE_SIZE as usize)
            .map(|p| self.stub(p))
            .collect())
    }

    async fn fetch_message_page(&self, mid: i64) -> ForumResult<Vec<NewMessage>> {
        self.page_fetches.lock().unwrap().push(mid);
        let Some(post) = self.posts.get(&mid) else {
            return Err(ForumError::NotFound);
        };
        Ok(self
            .posts
            .values()
            .filter(|p| p.tid == post.tid)
            .map(|p| self.stub(p))
            .collect())
    }

    async fn fetch_raw_content(&self, mid: i64) -> ForumResult<String> {
        self.raw_fetches.lock().unwrap().push(mid);
        self.posts
            .get(&mid)
            .map(|p| p.content.clone())
            .ok_or(ForumError::NotFound)
    }

    async fn fetch_user_profile(&self, uid: i64) -> ForumResult<NewUser> {
        self.profile_fetches.lock().unwrap().push(uid);
        if self.missing_profiles.contains(&uid) {
            return Err(ForumError::NotFound);
        }
        Ok(NewUser {
            uid,
            name: Some(format!("user-{uid}")),
            posts: Some(uid * 10),
            ..NewUser::default()
        })
    }
}

/// Store a message with resolved content, as a completed scrape would.
async fn seed_scraped(db: &Database, mid: i64) {
    let mut msg = NewMessage::bare(mid, mid);
    msg.content = Some(format!("stored content {mid}"));
    msg.posted_at = Some(at("2024-01-10T00:00:00"));
    upsert_message(db.pool(), &msg).await.unwrap();
}

/// Store a null-content placeholder row, as a non-greedy page scrape would.
async fn seed_placeholder(db: &Database, mid: i64) {
    upsert_message(db.pool(), &NewMessage::bare(mid, mid))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_discovery_stops_at_high_watermark() {
    let (db, _temp_dir) = setup_db().await;
    seed_scraped(&db, 100).await;

    let forum = ScriptedForum::with_posts(95..=105);
    let crawler = Crawler::new(forum, db.clone());

    let outcome = crawler.discovery().await.unwrap();
    assert_eq!(outcome.high_watermark, 100);
    // The boundary id itself is processed; discovery stops there.
    assert_eq!(outcome.frontier, 100);

    let fetched = crawler.client().raw_fetches();
    assert_eq!(fetched, vec![105, 104, 103, 102, 101, 100]);

    // Everything new is stored with content.
    for mid in 101..=105 {
        let msg = get_message(db.pool(), mid).await.unwrap().unwrap();
        assert_eq!(msg.content.as_deref(), Some(&*format!("raw content {mid}")));
    }
}

#[tokio::test]
async fn test_discovery_on_empty_database_defaults_watermark() {
    let (db, _temp_dir) = setup_db().await;

    let forum = ScriptedForum::with_posts(3..=7);
    let crawler = Crawler::new(forum, db.clone());

    let outcome = crawler.discovery().await.unwrap();
    assert_eq!(outcome.high_watermark, 1);
    // Listing exhausted without ever reaching a known id.
    assert_eq!(outcome.frontier, 3);
    assert_eq!(crawler.client().raw_fetches(), vec![7, 6, 5, 4, 3]);
}

#[tokio::test]
async fn test_scan_covers_gap_and_backlog_exclusively() {
    let (db, _temp_dir) = setup_db().await;

    // High watermark from before the cycle, plus rows a crashed scan left:
    // content at 18..=20, a placeholder at 17.
    seed_scraped(&db, 10).await;
    for mid in 18..=20 {
        seed_scraped(&db, mid).await;
    }
    seed_placeholder(&db, 17).await;

    let forum = ScriptedForum::with_posts(3..=21);
    let crawler = Crawler::new(forum, db.clone());

    // As if discovery walked down to 21 before exhausting its page bound.
    crawler
        .scan(DiscoveryOutcome {
            high_watermark: 10,
            frontier: 21,
        })
        .await
        .unwrap();

    let fetched = crawler.client().page_fetches();

    // Gap (10, 21): newest first, skipping resolved rows 18..=20, including
    // the null-content placeholder 17. Neither boundary is re-fetched.
    // Backlog (FLOOR_MID..low_watermark): 9 down to 3.
    assert_eq!(
        fetched,
        vec![17, 16, 15, 14, 13, 12, 11, 9, 8, 7, 6, 5, 4, 3]
    );
    assert!(!fetched.contains(&21), "frontier was already stored");
    assert!(!fetched.contains(&10), "high watermark was already stored");

    // The placeholder is repaired.
    let msg = get_message(db.pool(), 17).await.unwrap().unwrap();
    assert_eq!(msg.content.as_deref(), Some("raw content 17"));
}

#[tokio::test]
async fn test_scan_rerun_skips_resolved_rows() {
    let (db, _temp_dir) = setup_db().await;
    seed_scraped(&db, 10).await;

    let forum = ScriptedForum::with_posts(3..=21);
    let crawler = Crawler::new(forum, db.clone());

    let outcome = DiscoveryOutcome {
        high_watermark: 10,
        frontier: 21,
    };
    crawler.scan(outcome).await.unwrap();
    let first_run = crawler.client().page_fetches().len();
    assert!(first_run > 0);

    // Everything got content on the first pass, so a re-run fetches nothing.
    crawler.scan(outcome).await.unwrap();
    assert_eq!(crawler.client().page_fetches().len(), first_run);
}

#[tokio::test]
async fn test_scan_treats_missing_messages_as_deleted() {
    let (db, _temp_dir) = setup_db().await;
    seed_scraped(&db, 10).await;

    // The forum has nothing below 10: every backlog fetch is a NotFound.
    let forum = ScriptedForum::with_posts([10]);
    let crawler = Crawler::new(forum, db.clone());

    crawler
        .scan(DiscoveryOutcome {
            high_watermark: 10,
            frontier: 10,
        })
        .await
        .unwrap();

    // Deleted ids are skipped, not stored.
    for mid in 3..10 {
        assert!(get_message(db.pool(), mid).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_non_greedy_scan_stores_colocated_placeholders() {
    let (db, _temp_dir) = setup_db().await;
    seed_scraped(&db, 10).await;

    // Three posts sharing topic 1, below the low watermark.
    let mut forum = ScriptedForum::default();
    forum.add_post(5, 1, 1);
    forum.add_post(6, 1, 1);
    forum.add_post(7, 1, 1);
    let crawler = Crawler::new(forum, db.clone());

    crawler
        .scan(DiscoveryOutcome {
            high_watermark: 10,
            frontier: 10,
        })
        .await
        .unwrap();

    // 9 and 8 do not exist (NotFound, skipped). 7's page stored 5 and 6 as
    // placeholders; with GREEDY_SCRAPE off their contents stayed null, so the
    // walk fetched their pages as well instead of skipping them.
    let resolved = get_message(db.pool(), 7).await.unwrap().unwrap();
    assert_eq!(resolved.content.as_deref(), Some("raw content 7"));

    let fetched = crawler.client().page_fetches();
    assert_eq!(fetched, vec![9, 8, 7, 6, 5, 4, 3]);

    for mid in 5..=6 {
        let msg = get_message(db.pool(), mid).await.unwrap().unwrap();
        assert_eq!(msg.content.as_deref(), Some(&*format!("raw content {mid}")));
    }
}

#[tokio::test]
async fn test_review_repairs_null_content() {
    let (db, _temp_dir) = setup_db().await;

    // Placeholders across the whole known range; population is far below the
    // sample cap, so review visits every id.
    for mid in 3..=12 {
        seed_placeholder(&db, mid).await;
    }

    let forum = ScriptedForum::with_posts(3..=12);
    let crawler = Crawler::new(forum, db.clone());
    crawler.review().await.unwrap();

    for mid in 3..=12 {
        let msg = get_message(db.pool(), mid).await.unwrap().unwrap();
        assert_eq!(msg.content.as_deref(), Some(&*format!("raw content {mid}")));
    }
}

#[tokio::test]
async fn test_user_refresh_merges_and_tolerates_missing() {
    let (db, _temp_dir) = setup_db().await;

    for uid in [1, 2, 3] {
        upsert_user(
            db.pool(),
            &NewUser {
                uid,
                name: Some(format!("stale-{uid}")),
                location: Some("Somewhere".to_string()),
                ..NewUser::default()
            },
        )
        .await
        .unwrap();
    }

    let mut forum = ScriptedForum::default();
    forum.missing_profiles.insert(2);
    let crawler = Crawler::new(forum, db.clone());
    crawler.refresh_users().await.unwrap();

    let refreshed = get_user(db.pool(), 1).await.unwrap().unwrap();
    assert_eq!(refreshed.name.as_deref(), Some("user-1"));
    // The profile fetch knew nothing about location; the stored value stays.
    assert_eq!(refreshed.location.as_deref(), Some("Somewhere"));

    // A vanished profile keeps its stored record.
    let kept = get_user(db.pool(), 2).await.unwrap().unwrap();
    assert_eq!(kept.name.as_deref(), Some("stale-2"));
}

#[tokio::test]
async fn test_full_cycle_records_phases_and_stores_everything() {
    let (db, _temp_dir) = setup_db().await;

    let mut forum = ScriptedForum::default();
    for mid in 3..=7 {
        forum.add_post(mid, mid, mid % 2 + 1);
    }
    let crawler = Crawler::new(forum, db.clone());
    crawler.run_cycle().await.unwrap();

    for mid in 3..=7 {
        let msg = get_message(db.pool(), mid).await.unwrap().unwrap();
        assert_eq!(msg.content.as_deref(), Some(&*format!("raw content {mid}")));
    }

    // Authors observed during the cycle got refreshed profiles.
    let user = get_user(db.pool(), 1).await.unwrap().unwrap();
    assert_eq!(user.name.as_deref(), Some("user-1"));

    let stats = get_statistics(db.pool()).await.unwrap();
    for key in [
        "phases.discovery",
        "phases.scan",
        "phases.review",
        "phases.users",
    ] {
        assert!(stats.contains_key(key), "missing phase statistic {key}");
    }
}
