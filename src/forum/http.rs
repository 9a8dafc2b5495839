//! HTTP forum client for SMF-style forums.
//!
//! Fetches the handful of page types the crawler needs and parses them into
//! typed records. Parsing is deliberately tolerant: a malformed entry is
//! skipped rather than failing the page, since forum markup drifts.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{ForumClient, ForumError, ForumResult};
use crate::constants::SCRAPER_USER_AGENT;
use crate::db::{NewMessage, NewUser};

static TOPIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"topic=(\d+)").expect("valid regex"));
static MSG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"msg[=_]?(\d+)").expect("valid regex"));
static BOARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"board=(\d+)").expect("valid regex"));
static PROFILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"action=profile;u=(\d+)").expect("valid regex"));
static QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<quote>(.*)</quote>").expect("valid regex"));

static RECENT_ENTRY_SEL: Lazy<Selector> = Lazy::new(|| sel("div.core_posts div.windowbg"));
static POST_WRAPPER_SEL: Lazy<Selector> = Lazy::new(|| sel("div.post_wrapper"));
static H5_LINK_SEL: Lazy<Selector> = Lazy::new(|| sel("h5 a"));
static PROFILE_LINK_SEL: Lazy<Selector> = Lazy::new(|| sel(r#"a[href*="action=profile"]"#));
static SMALLTEXT_SEL: Lazy<Selector> = Lazy::new(|| sel("span.smalltext, div.smalltext"));
static POST_INNER_SEL: Lazy<Selector> = Lazy::new(|| sel("div.post div.inner"));
static MSG_ICON_SEL: Lazy<Selector> = Lazy::new(|| sel("span.messageicon img"));
static CANONICAL_SEL: Lazy<Selector> = Lazy::new(|| sel(r#"link[rel="canonical"]"#));
static NAV_LINK_SEL: Lazy<Selector> = Lazy::new(|| sel("div.navigate_section a"));
static USERNAME_SEL: Lazy<Selector> = Lazy::new(|| sel("div.username h4"));
static POSITION_SEL: Lazy<Selector> = Lazy::new(|| sel("span.position"));
static AVATAR_SEL: Lazy<Selector> = Lazy::new(|| sel("img.avatar"));
static SIGNATURE_SEL: Lazy<Selector> = Lazy::new(|| sel("div.signature"));
static BLURB_SEL: Lazy<Selector> = Lazy::new(|| sel("div.custom_title, span.blurb"));
static DT_SEL: Lazy<Selector> = Lazy::new(|| sel("dt"));
static DD_SEL: Lazy<Selector> = Lazy::new(|| sel("dd"));
static MAILTO_SEL: Lazy<Selector> = Lazy::new(|| sel(r#"a[href^="mailto:"]"#));
static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| sel("a"));
static FATAL_ERROR_SEL: Lazy<Selector> = Lazy::new(|| sel("#fatal_error"));

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector literal")
}

/// Forum client speaking SMF's query-string endpoints over HTTP.
#[derive(Debug, Clone)]
pub struct HttpForumClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpForumClient {
    /// Create a client rooted at the forum's base URL (scheme + host, no
    /// trailing `index.php`).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(SCRAPER_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path_and_query: &str) -> ForumResult<String> {
        let url = format!("{}/{path_and_query}", self.base_url);
        debug!(url = %url, "Fetching forum page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ForumError::Transient(anyhow!(e)))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::GONE => {
                return Err(ForumError::NotFound)
            }
            status if !status.is_success() => {
                return Err(ForumError::Transient(anyhow!(
                    "forum returned status {status} for {url}"
                )))
            }
            _ => {}
        }

        response
            .text()
            .await
            .map_err(|e| ForumError::Transient(anyhow!(e)))
    }
}

#[async_trait]
impl ForumClient for HttpForumClient {
    async fn fetch_recent_page(&self, offset: u32) -> ForumResult<Vec<NewMessage>> {
        let body = self
            .get(&format!("index.php?action=recent;start={offset}"))
            .await?;
        Ok(parse_recent_page(&body, today()))
    }

    async fn fetch_message_page(&self, mid: i64) -> ForumResult<Vec<NewMessage>> {
        let body = self.get(&format!("index.php?msg={mid}")).await?;
        if page_is_error(&body) {
            return Err(ForumError::NotFound);
        }
        Ok(parse_topic_page(&body, today()))
    }

    async fn fetch_raw_content(&self, mid: i64) -> ForumResult<String> {
        let body = self
            .get(&format!("index.php?action=quotefast;quote={mid};xml"))
            .await?;
        parse_quotefast(&body).ok_or(ForumError::NotFound)
    }

    async fn fetch_user_profile(&self, uid: i64) -> ForumResult<NewUser> {
        let body = self
            .get(&format!("index.php?action=profile;u={uid}"))
            .await?;
        if page_is_error(&body) {
            return Err(ForumError::NotFound);
        }
        Ok(parse_profile_page(&body, uid))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// SMF reports inaccessible pages with HTTP 200 and an error panel.
fn page_is_error(body: &str) -> bool {
    let document = Html::parse_document(body);
    document.select(&FATAL_ERROR_SEL).next().is_some()
}

fn capture_i64(re: &Regex, haystack: &str) -> Option<i64> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse one recent-activity listing page. Each entry names its board, topic,
/// author, and post time; the message body is not on this page, so `content`
/// stays null until the raw-content fetch fills it.
pub fn parse_recent_page(body: &str, today: NaiveDate) -> Vec<NewMessage> {
    let document = Html::parse_document(body);
    let mut messages = Vec::new();

    for entry in document.select(&RECENT_ENTRY_SEL) {
        let mut topic_link = None;
        let mut board_link = None;
        for link in entry.select(&H5_LINK_SEL) {
            let href = link.value().attr("href").unwrap_or_default();
            if href.contains("topic=") && topic_link.is_none() {
                topic_link = Some(link);
            } else if href.contains("board=") && board_link.is_none() {
                board_link = Some(link);
            }
        }

        let Some(topic_link) = topic_link else { continue };
        let topic_href = topic_link.value().attr("href").unwrap_or_default();
        let Some(mid) = capture_i64(&MSG_RE, topic_href) else {
            continue;
        };
        let Some(tid) = capture_i64(&TOPIC_RE, topic_href) else {
            continue;
        };

        let mut msg = NewMessage::bare(mid, tid);
        msg.subject = Some(element_text(topic_link)).filter(|s| !s.is_empty());
        // Listing entries show the reply subject; the topic name is that
        // minus the reply prefix.
        msg.topic_name = msg
            .subject
            .as_deref()
            .map(|s| s.trim_start_matches("Re: ").to_string());

        if let Some(board_link) = board_link {
            let board_href = board_link.value().attr("href").unwrap_or_default();
            msg.bid = capture_i64(&BOARD_RE, board_href);
            msg.board_name = Some(element_text(board_link)).filter(|s| !s.is_empty());
        }

        if let Some(author) = entry.select(&PROFILE_LINK_SEL).next() {
            let href = author.value().attr("href").unwrap_or_default();
            if let Some(uid) = capture_i64(&PROFILE_RE, href) {
                msg.user = Some(NewUser {
                    uid,
                    name: Some(element_text(author)).filter(|s| !s.is_empty()),
                    ..NewUser::default()
                });
            }
        }

        if let Some(small) = entry.select(&SMALLTEXT_SEL).next() {
            msg.posted_at = extract_timestamp(&element_text(small), today);
        }

        messages.push(msg);
    }

    messages
}

/// Parse a topic page into one record per visible post. Topic and board
/// context comes from the canonical link and the breadcrumb trail and is
/// shared by every post on the page.
pub fn parse_topic_page(body: &str, today: NaiveDate) -> Vec<NewMessage> {
    let document = Html::parse_document(body);

    let tid = document
        .select(&CANONICAL_SEL)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| capture_i64(&TOPIC_RE, href));
    let Some(tid) = tid else {
        return Vec::new();
    };

    let mut topic_name = None;
    let mut bid = None;
    let mut board_name = None;
    for link in document.select(&NAV_LINK_SEL) {
        let href = link.value().attr("href").unwrap_or_default();
        if href.contains("board=") {
            bid = capture_i64(&BOARD_RE, href);
            board_name = Some(element_text(link)).filter(|s| !s.is_empty());
        } else if href.contains("topic=") {
            topic_name = Some(element_text(link)).filter(|s| !s.is_empty());
        }
    }

    let mut messages = Vec::new();
    for post in document.select(&POST_WRAPPER_SEL) {
        let Some(inner) = post.select(&POST_INNER_SEL).next() else {
            continue;
        };
        let mid = inner
            .value()
            .attr("id")
            .and_then(|id| capture_i64(&MSG_RE, id));
        let Some(mid) = mid else { continue };

        let mut msg = NewMessage::bare(mid, tid);
        msg.topic_name.clone_from(&topic_name);
        msg.bid = bid;
        msg.board_name.clone_from(&board_name);
        // The page shows rendered HTML; the raw BBC source comes from the
        // quotefast fetch. Store it as-is only if the caller resolves it.
        msg.content = None;

        for link in post.select(&H5_LINK_SEL) {
            let href = link.value().attr("href").unwrap_or_default();
            if href.contains(&format!("msg{mid}")) || href.contains(&format!("msg={mid}")) {
                msg.subject = Some(element_text(link)).filter(|s| !s.is_empty());
                break;
            }
        }

        if let Some(author) = post.select(&PROFILE_LINK_SEL).next() {
            let href = author.value().attr("href").unwrap_or_default();
            if let Some(uid) = capture_i64(&PROFILE_RE, href) {
                msg.user = Some(NewUser {
                    uid,
                    name: Some(element_text(author)).filter(|s| !s.is_empty()),
                    ..NewUser::default()
                });
            }
        }

        if let Some(icon) = post.select(&MSG_ICON_SEL).next() {
            msg.icon = icon.value().attr("alt").map(ToString::to_string);
        }

        if let Some(small) = post.select(&SMALLTEXT_SEL).next() {
            let text = element_text(small);
            msg.posted_at = extract_timestamp(&text, today);
            if let Some(edited) = text.split("Last Edit:").nth(1) {
                // Rendered as "Last Edit: <date> by <user>".
                let edited = edited.split(" by ").next().unwrap_or(edited);
                msg.edited_at = parse_forum_timestamp(edited, today);
            }
        }

        messages.push(msg);
    }

    messages
}

/// Extract the raw BBC source from a quotefast XML response.
///
/// The payload wraps the message in a single `[quote ...]...[/quote]` pair;
/// the wrapper is stripped. Returns `None` when the response carries no quote
/// element, which SMF uses for deleted or inaccessible messages.
pub fn parse_quotefast(body: &str) -> Option<String> {
    let quoted = QUOTE_RE.captures(body)?.get(1)?.as_str();

    let open_end = quoted.find(']')?;
    let close_start = quoted.rfind("[/quote]")?;
    if close_start <= open_end {
        return None;
    }

    Some(quoted[open_end + 1..close_start].trim().to_string())
}

/// Parse a profile page. Labelled dt/dd rows cover most fields; the rest come
/// from dedicated page elements.
pub fn parse_profile_page(body: &str, uid: i64) -> NewUser {
    let document = Html::parse_document(body);
    let mut user = NewUser {
        uid,
        ..NewUser::default()
    };

    if let Some(username) = document.select(&USERNAME_SEL).next() {
        let full = element_text(username);
        if let Some(position) = username.select(&POSITION_SEL).next() {
            let group = element_text(position);
            user.name = Some(full.replace(&group, "").trim().to_string()).filter(|s| !s.is_empty());
            user.user_group = Some(group).filter(|s| !s.is_empty());
        } else {
            user.name = Some(full).filter(|s| !s.is_empty());
        }
    }

    user.avatar = document
        .select(&AVATAR_SEL)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(ToString::to_string);

    user.signature = document
        .select(&SIGNATURE_SEL)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty());

    user.blurb = document
        .select(&BLURB_SEL)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty());

    user.email = document
        .select(&MAILTO_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| href.strip_prefix("mailto:"))
        .map(ToString::to_string);

    // Labelled rows: <dt>Posts:</dt><dd>1,234 (0.5 per day)</dd> and friends.
    let labels: Vec<String> = document.select(&DT_SEL).map(element_text).collect();
    let values: Vec<ElementRef<'_>> = document.select(&DD_SEL).collect();
    for (label, value) in labels.iter().zip(values) {
        let text = element_text(value);
        match label.trim_end_matches(':') {
            "Posts" => {
                let digits: String = text
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == ',')
                    .filter(char::is_ascii_digit)
                    .collect();
                user.posts = digits.parse().ok();
            }
            "Location" => user.location = Some(text).filter(|s| !s.is_empty()),
            "Real name" | "Name" => user.real_name = Some(text).filter(|s| !s.is_empty()),
            "Gender" => user.gender = Some(text).filter(|s| !s.is_empty()),
            "Website" => {
                user.website = value
                    .select(&ANCHOR_SEL)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(ToString::to_string);
            }
            "Social" => {
                let links: Vec<String> = value
                    .select(&ANCHOR_SEL)
                    .filter_map(|a| a.value().attr("href"))
                    .map(ToString::to_string)
                    .collect();
                if !links.is_empty() {
                    user.social = serde_json::to_string(&links).ok();
                }
            }
            _ => {}
        }
    }

    user
}

/// Find and parse the post timestamp inside a key-info line like
/// `« on: January 15, 2024, 12:34:56 PM »` or `by Alice on Today at 09:15:00 »`.
fn extract_timestamp(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let after_on = text
        .split("on:")
        .nth(1)
        .or_else(|| text.split(" on ").nth(1))
        .unwrap_or(text);
    // Drop the closing guillemet and anything after it (edit trailers).
    let cleaned = after_on.split('»').next().unwrap_or(after_on).trim();

    parse_forum_timestamp(cleaned, today)
}

/// Normalize a forum-rendered timestamp to a naive datetime.
///
/// Supported shapes: `Today at 12:34:56 PM`, `Yesterday at 12:34:56 PM`,
/// `January 15, 2024, 12:34:56 PM`, and ISO `2024-01-15T12:34:56`.
pub fn parse_forum_timestamp(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("Today at ") {
        return parse_clock(rest).map(|t| today.and_time(t));
    }
    if let Some(rest) = text.strip_prefix("Yesterday at ") {
        return parse_clock(rest).map(|t| today.pred_opt().unwrap_or(today).and_time(t));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%B %d, %Y, %I:%M:%S %p") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }

    None
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%I:%M:%S %p")
        .or_else(|_| NaiveTime::parse_from_str(text.trim(), "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_forum_timestamp_absolute() {
        let dt = parse_forum_timestamp("January 15, 2024, 12:34:56 PM", day(2024, 3, 1)).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 12:34:56");

        let dt = parse_forum_timestamp("March 03, 2023, 01:02:03 AM", day(2024, 3, 1)).unwrap();
        assert_eq!(dt.to_string(), "2023-03-03 01:02:03");
    }

    #[test]
    fn test_parse_forum_timestamp_relative() {
        let today = day(2024, 3, 1);
        let dt = parse_forum_timestamp("Today at 09:15:00 PM", today).unwrap();
        assert_eq!(dt.to_string(), "2024-03-01 21:15:00");

        let dt = parse_forum_timestamp("Yesterday at 09:15:00 AM", today).unwrap();
        assert_eq!(dt.to_string(), "2024-02-29 09:15:00");
    }

    #[test]
    fn test_parse_forum_timestamp_garbage() {
        assert!(parse_forum_timestamp("a while ago", day(2024, 3, 1)).is_none());
    }

    #[test]
    fn test_parse_quotefast() {
        let body = r#"<?xml version="1.0"?>
<smf>
<quote>[quote author=Alice link=msg=42 date=1700000000]Hello [b]world[/b][/quote]</quote>
</smf>"#;
        assert_eq!(parse_quotefast(body).unwrap(), "Hello [b]world[/b]");
    }

    #[test]
    fn test_parse_quotefast_missing_quote() {
        assert!(parse_quotefast("<smf></smf>").is_none());
    }

    const RECENT_FIXTURE: &str = r#"
<html><body>
<div class="core_posts">
  <div class="windowbg">
    <h5>
      <a href="https://forum.example/index.php?board=4.0">General</a> /
      <a href="https://forum.example/index.php?topic=123.msg456#msg456">Re: Hello thread</a>
    </h5>
    <span class="smalltext">by <a href="https://forum.example/index.php?action=profile;u=78">Alice</a> on January 15, 2024, 12:34:56 PM »</span>
  </div>
  <div class="windowbg">
    <h5>
      <a href="https://forum.example/index.php?board=2.0">Games</a> /
      <a href="https://forum.example/index.php?topic=99.msg455#msg455">Another topic</a>
    </h5>
    <span class="smalltext">by <a href="https://forum.example/index.php?action=profile;u=12">Bob</a> on Today at 09:15:00 AM »</span>
  </div>
</div>
</body></html>"#;

    #[test]
    fn test_parse_recent_page() {
        let messages = parse_recent_page(RECENT_FIXTURE, day(2024, 3, 1));
        assert_eq!(messages.len(), 2);

        let first = &messages[0];
        assert_eq!(first.mid, 456);
        assert_eq!(first.tid, 123);
        assert_eq!(first.bid, Some(4));
        assert_eq!(first.subject.as_deref(), Some("Re: Hello thread"));
        assert_eq!(first.board_name.as_deref(), Some("General"));
        assert_eq!(first.user.as_ref().unwrap().uid, 78);
        assert_eq!(first.user.as_ref().unwrap().name.as_deref(), Some("Alice"));
        assert_eq!(
            first.posted_at.unwrap().to_string(),
            "2024-01-15 12:34:56"
        );

        let second = &messages[1];
        assert_eq!(second.mid, 455);
        assert_eq!(second.posted_at.unwrap().to_string(), "2024-03-01 09:15:00");
    }

    const TOPIC_FIXTURE: &str = r#"
<html><head>
<link rel="canonical" href="https://forum.example/index.php?topic=123.40" />
</head><body>
<div class="navigate_section">
  <a href="https://forum.example/index.php?board=4.0">General</a>
  <a href="https://forum.example/index.php?topic=123.0">Hello thread</a>
</div>
<div class="post_wrapper">
  <div class="poster"><h4><a href="https://forum.example/index.php?action=profile;u=78">Alice</a></h4></div>
  <div class="keyinfo">
    <h5 id="subject_456"><a href="https://forum.example/index.php?topic=123.msg456#msg456">Re: Hello thread</a></h5>
    <div class="smalltext">« on: January 15, 2024, 12:34:56 PM »</div>
  </div>
  <div class="post"><div class="inner" id="msg_456">Rendered <b>body</b></div></div>
</div>
<div class="post_wrapper">
  <div class="poster"><h4><a href="https://forum.example/index.php?action=profile;u=12">Bob</a></h4></div>
  <div class="keyinfo">
    <h5 id="subject_457"><a href="https://forum.example/index.php?topic=123.msg457#msg457">Re: Hello thread</a></h5>
    <div class="smalltext">« on: January 16, 2024, 08:00:00 AM » <em>Last Edit: January 17, 2024, 09:00:00 AM by Bob</em></div>
  </div>
  <div class="post"><div class="inner" id="msg_457">Second</div></div>
</div>
</body></html>"#;

    #[test]
    fn test_parse_topic_page() {
        let messages = parse_topic_page(TOPIC_FIXTURE, day(2024, 3, 1));
        assert_eq!(messages.len(), 2);

        let first = &messages[0];
        assert_eq!(first.mid, 456);
        assert_eq!(first.tid, 123);
        assert_eq!(first.bid, Some(4));
        assert_eq!(first.topic_name.as_deref(), Some("Hello thread"));
        assert_eq!(first.board_name.as_deref(), Some("General"));
        assert_eq!(first.subject.as_deref(), Some("Re: Hello thread"));
        assert!(first.content.is_none());
        assert_eq!(first.user.as_ref().unwrap().uid, 78);

        let second = &messages[1];
        assert_eq!(second.mid, 457);
        assert_eq!(
            second.edited_at.unwrap().to_string(),
            "2024-01-17 09:00:00"
        );
    }

    #[test]
    fn test_parse_topic_page_without_canonical() {
        assert!(parse_topic_page("<html><body></body></html>", day(2024, 3, 1)).is_empty());
    }

    const PROFILE_FIXTURE: &str = r#"
<html><body>
<div id="profileview">
  <div class="username"><h4>Alice <span class="position">Member</span></h4></div>
  <img class="avatar" src="https://forum.example/avatars/alice.png" />
  <dl>
    <dt>Posts:</dt><dd>1,234 (0.5 per day)</dd>
    <dt>Location:</dt><dd>Wonderland</dd>
    <dt>Gender:</dt><dd>Female</dd>
    <dt>Website:</dt><dd><a href="https://alice.example">alice.example</a></dd>
  </dl>
  <div class="signature">Curiouser and curiouser</div>
</div>
</body></html>"#;

    #[test]
    fn test_parse_profile_page() {
        let user = parse_profile_page(PROFILE_FIXTURE, 78);
        assert_eq!(user.uid, 78);
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert_eq!(user.user_group.as_deref(), Some("Member"));
        assert_eq!(user.posts, Some(1234));
        assert_eq!(user.location.as_deref(), Some("Wonderland"));
        assert_eq!(user.gender.as_deref(), Some("Female"));
        assert_eq!(user.website.as_deref(), Some("https://alice.example"));
        assert_eq!(
            user.avatar.as_deref(),
            Some("https://forum.example/avatars/alice.png")
        );
        assert_eq!(user.signature.as_deref(), Some("Curiouser and curiouser"));
    }
}
