//! Integration tests for the HTTP forum client's transport behavior.

use forum_mirror::forum::{ForumClient, ForumError, HttpForumClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUOTEFAST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<smf>
<quote>[quote author=Alice link=msg=42 date=1700000000]Hello [b]world[/b][/quote]</quote>
</smf>"#;

const RECENT_HTML: &str = r#"
<html><body>
<div class="core_posts">
  <div class="windowbg">
    <h5>
      <a href="/index.php?board=4.0">General</a> /
      <a href="/index.php?topic=123.msg456#msg456">Re: Hello thread</a>
    </h5>
    <span class="smalltext">by <a href="/index.php?action=profile;u=78">Alice</a> on January 15, 2024, 12:34:56 PM »</span>
  </div>
</div>
</body></html>"#;

const ERROR_PAGE_HTML: &str = r#"
<html><body>
<div id="fatal_error">
  <h3>An Error Has Occurred!</h3>
  <p>The user whose profile you are trying to view does not exist.</p>
</div>
</body></html>"#;

#[tokio::test]
async fn test_fetch_raw_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("action", "quotefast;quote=42;xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUOTEFAST_XML))
        .mount(&server)
        .await;

    let client = HttpForumClient::new(&server.uri()).unwrap();
    let content = client.fetch_raw_content(42).await.unwrap();
    assert_eq!(content, "Hello [b]world[/b]");
}

#[tokio::test]
async fn test_http_404_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = HttpForumClient::new(&server.uri()).unwrap();
    let err = client.fetch_raw_content(42).await.unwrap_err();
    assert!(matches!(err, ForumError::NotFound));
}

#[tokio::test]
async fn test_http_5xx_maps_to_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpForumClient::new(&server.uri()).unwrap();
    let err = client.fetch_message_page(42).await.unwrap_err();
    assert!(matches!(err, ForumError::Transient(_)));
}

#[tokio::test]
async fn test_connection_failure_maps_to_transient() {
    // Nothing is listening here.
    let client = HttpForumClient::new("http://127.0.0.1:1").unwrap();
    let err = client.fetch_raw_content(42).await.unwrap_err();
    assert!(matches!(err, ForumError::Transient(_)));
}

#[tokio::test]
async fn test_fetch_recent_page_parses_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("action", "recent;start=0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RECENT_HTML))
        .mount(&server)
        .await;

    let client = HttpForumClient::new(&server.uri()).unwrap();
    let messages = client.fetch_recent_page(0).await.unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].mid, 456);
    assert_eq!(messages[0].tid, 123);
    assert_eq!(messages[0].bid, Some(4));
    assert_eq!(messages[0].user.as_ref().unwrap().uid, 78);
}

#[tokio::test]
async fn test_error_panel_page_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ERROR_PAGE_HTML))
        .mount(&server)
        .await;

    let client = HttpForumClient::new(&server.uri()).unwrap();
    let err = client.fetch_user_profile(999).await.unwrap_err();
    assert!(matches!(err, ForumError::NotFound));

    let err = client.fetch_message_page(999).await.unwrap_err();
    assert!(matches!(err, ForumError::NotFound));
}

#[tokio::test]
async fn test_quotefast_without_quote_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<smf></smf>"))
        .mount(&server)
        .await;

    let client = HttpForumClient::new(&server.uri()).unwrap();
    let err = client.fetch_raw_content(42).await.unwrap_err();
    assert!(matches!(err, ForumError::NotFound));
}
