//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the search endpoint and run
//! the full crawl cycle end-to-end, from HTTP through the ledger to the
//! records file.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use weibo_search::config::{Config, CrawlerConfig, HttpConfig, OutputConfig, SearchConfig};
use weibo_search::crawler::{run_crawl, FetchError, HttpSearchClient, SearchClient};
use weibo_search::output::load_report;
use weibo_search::storage::{RunStatus, SqliteStorage};
use weibo_search::{ContainType, PostRecord, SearchTask, WeiboType};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a result page in the endpoint's markup
fn result_page(mids: &[&str]) -> String {
    let items: String = mids
        .iter()
        .map(|mid| {
            format!(
                r#"<div class="card-wrap" action-type="feed_list_item" mid="{mid}">
                     <div class="content">
                       <a class="name" href="//weibo.com/u/1">author {mid}</a>
                       <p class="txt" node-type="feed_list_content">about rust {mid}</p>
                       <p class="from"><a href="//weibo.com/1/{mid}">01月01日 10:00</a></p>
                     </div>
                   </div>"#
            )
        })
        .collect();

    format!(r#"<html><body><div id="pl_feedlist_index">{items}</div></body></html>"#)
}

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, keywords: &[&str], dir: &Path) -> Config {
    Config {
        search: SearchConfig {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            keyword_file: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            weibo_type: WeiboType::All,
            contain_type: ContainType::Any,
            region: vec![],
            limit_result: 0,
        },
        crawler: CrawlerConfig {
            download_delay: 0.0,
            max_delay: 0.0,
            jitter_ms: 0,
            block_retry_limit: 3,
            max_pages_per_query: 5,
            ..CrawlerConfig::default()
        },
        http: HttpConfig {
            base_url: format!("{}/weibo", base_url),
            cookie: Some("SUB=test-session".to_string()),
            ..HttpConfig::default()
        },
        output: OutputConfig {
            ledger_path: dir.join("ledger.db").display().to_string(),
            records_path: dir.join("posts.jsonl").display().to_string(),
        },
    }
}

async fn mount_page(server: &MockServer, keyword: &str, page: u32, mids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/weibo"))
        .and(query_param("q", keyword))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(result_page(mids))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn read_records(path: &str) -> Vec<PostRecord> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid record line"))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_single_day() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "rust", 1, &["1001", "1002"]).await;
    mount_page(&mock_server, "rust", 2, &["1003"]).await;
    mount_page(&mock_server, "rust", 3, &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &["rust"], dir.path());
    let records_path = config.output.records_path.clone();
    let ledger_path = config.output.ledger_path.clone();

    let report = run_crawl(config, false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.tasks_completed, 1);
    assert_eq!(report.records_emitted, 3);

    let records = read_records(&records_path);
    let ids: Vec<&str> = records.iter().map(|r| r.content_id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002", "1003"]);
    assert_eq!(records[0].keyword, "rust");
    assert_eq!(records[0].author, "author 1001");
    assert_eq!(records[0].text, "about rust 1001");

    // The ledger reports the same numbers after the fact
    let storage = SqliteStorage::new(Path::new(&ledger_path)).unwrap();
    let stored = load_report(&storage).unwrap().expect("No run recorded");
    assert_eq!(stored.records_emitted, 3);
    assert_eq!(stored.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_rate_limited_keyword_is_blocked() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weibo"))
        .and(query_param("q", "hot"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "calm", 1, &["2001"]).await;
    mount_page(&mock_server, "calm", 2, &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &["hot", "calm"], dir.path());
    let records_path = config.output.records_path.clone();

    let report = run_crawl(config, false, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.blocked_tasks, 1);
    assert_eq!(report.tasks_completed, 1);

    let records = read_records(&records_path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content_id, "2001");
}

#[tokio::test]
async fn test_login_redirect_is_blocked() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weibo"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "https://passport.weibo.com/visitor/visitor"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &["rust"], dir.path());
    let client = HttpSearchClient::new(&config.http).unwrap();

    let task = SearchTask {
        keyword: "rust".to_string(),
        date_start: config.search.start_date,
        date_end: config.search.end_date,
        region: None,
        weibo_type: WeiboType::All,
        contain_type: ContainType::Any,
    };

    let result = client.fetch_page(&task, 1).await;
    assert!(matches!(
        result,
        Err(FetchError::Blocked {
            status: Some(302),
            ..
        })
    ));
}

#[tokio::test]
async fn test_session_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weibo"))
        .and(header("cookie", "SUB=test-session"))
        .and(query_param("timescope", "custom:2024-01-01-0:2024-01-02-0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(&["3001"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &["rust"], dir.path());
    let client = HttpSearchClient::new(&config.http).unwrap();

    let task = SearchTask {
        keyword: "rust".to_string(),
        date_start: config.search.start_date,
        date_end: config.search.end_date,
        region: None,
        weibo_type: WeiboType::All,
        contain_type: ContainType::Any,
    };

    let body = client.fetch_page(&task, 1).await.expect("Fetch failed");
    assert!(body.contains("3001"));
}

#[tokio::test]
async fn test_limit_then_resume_appends_without_duplicates() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "rust", 1, &["1", "2", "3"]).await;
    mount_page(&mock_server, "rust", 2, &["4", "5"]).await;
    mount_page(&mock_server, "rust", 3, &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), &["rust"], dir.path());
    config.search.limit_result = 2;
    let records_path = config.output.records_path.clone();

    let first = run_crawl(config.clone(), false, CancellationToken::new())
        .await
        .expect("First crawl failed");
    assert_eq!(first.status, RunStatus::LimitReached);
    assert_eq!(read_records(&records_path).len(), 2);

    config.search.limit_result = 0;
    let second = run_crawl(config, false, CancellationToken::new())
        .await
        .expect("Resumed crawl failed");
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.records_emitted, 5);

    let records = read_records(&records_path);
    let ids: Vec<String> = records.into_iter().map(|r| r.content_id).collect();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(unique.len(), 5);
}

#[tokio::test]
async fn test_fresh_run_ignores_stored_progress() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "rust", 1, &["1", "2"]).await;
    mount_page(&mock_server, "rust", 2, &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), &["rust"], dir.path());
    config.search.limit_result = 1;

    let first = run_crawl(config.clone(), false, CancellationToken::new())
        .await
        .expect("First crawl failed");
    assert_eq!(first.status, RunStatus::LimitReached);

    config.search.limit_result = 0;
    let fresh = run_crawl(config, true, CancellationToken::new())
        .await
        .expect("Fresh crawl failed");
    assert_ne!(fresh.run_id, first.run_id);
    assert_eq!(fresh.records_emitted, 2);
}
