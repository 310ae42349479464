//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against an on-disk graph store.

use sitegraph::config::Config;
use sitegraph::crawler::{crawl, Coordinator, Fetcher};
use sitegraph::storage::{GraphStore, RunStatus, SqliteGraphStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to a fresh database in `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.fetch_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0.0".to_string();
    config.store.database_path = dir.path().join("graph.db").display().to_string();
    config
}

fn open_store(config: &Config) -> SqliteGraphStore {
    SqliteGraphStore::open(std::path::Path::new(&config.store.database_path))
        .expect("Failed to open store")
}

fn html_page(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_depth_one_crawl_stays_on_host() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <p>This is the home page of the test site.</p>
            <a href="/page1">Page 1</a>
            <a href="{}/page2">Page 2</a>
            <a href="https://external.example.org/">Elsewhere</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/page1",
        "<title>Page 1</title><p>First child page with content.</p>".to_string(),
    )
    .await;
    mount_page(
        &server,
        "/page2",
        "<title>Page 2</title><p>Second child page with content.</p>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let seed = format!("{}/", base);

    let report = crawl(&config, &seed, 1, "hash").await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.nodes_scanned, 3);
    assert_eq!(report.nodes_failed, 0);

    let store = open_store(&config);
    assert_eq!(store.count_pages().unwrap(), 3);
    assert_eq!(store.count_edges().unwrap(), 2);
    assert!(store
        .get_page("https://external.example.org/")
        .unwrap()
        .is_none());

    let home = store.get_page(&seed).unwrap().unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.level, Some(0));

    let page1 = store.get_page(&format!("{}/page1", base)).unwrap().unwrap();
    assert_eq!(page1.level, Some(1));
    assert_eq!(
        page1.content.as_deref(),
        Some("First child page with content.")
    );

    assert_eq!(
        store.outgoing_links(&seed).unwrap(),
        vec![format!("{}/page1", base), format!("{}/page2", base)]
    );
}

#[tokio::test]
async fn test_depth_zero_records_links_without_fetching() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<title>Seed</title><a href="/a">A</a><a href="/b">B</a>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page("<title>A</title>".to_string()))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("<title>B</title>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let report = crawl(&config, &format!("{}/", base), 0, "").await.unwrap();
    assert_eq!(report.nodes_scanned, 1);

    let store = open_store(&config);
    assert_eq!(store.count_edges().unwrap(), 2);

    let a = store.get_page(&format!("{}/a", base)).unwrap().unwrap();
    assert!(a.is_placeholder());
    assert_eq!(a.level, None);
    assert!(!a.error);
}

#[tokio::test]
async fn test_failing_seed_becomes_error_node() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let seed = format!("{}/", server.uri());

    let report = crawl(&config, &seed, 2, "").await.unwrap();
    assert_eq!(report.nodes_scanned, 0);
    assert_eq!(report.nodes_failed, 1);

    let store = open_store(&config);
    assert_eq!(store.count_pages().unwrap(), 1);
    assert_eq!(store.count_edges().unwrap(), 0);

    let node = store.get_page(&seed).unwrap().unwrap();
    assert!(node.error);
    assert!(node.last_scanned_at.is_some());
    assert!(node.error_message.unwrap().contains("500"));
}

#[tokio::test]
async fn test_failed_page_does_not_abort_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<title>Home</title><a href="/broken">x</a><a href="/ok">y</a>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<title>OK</title>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let report = crawl(&config, &format!("{}/", base), 1, "").await.unwrap();

    assert_eq!(report.nodes_scanned, 2);
    assert_eq!(report.nodes_failed, 1);

    let store = open_store(&config);
    let broken = store.get_page(&format!("{}/broken", base)).unwrap().unwrap();
    assert!(broken.error);
    let ok = store.get_page(&format!("{}/ok", base)).unwrap().unwrap();
    assert!(!ok.error);
    assert_eq!(ok.title.as_deref(), Some("OK"));
}

#[tokio::test]
async fn test_each_url_fetched_once_despite_cycles() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/a">a</a><a href="/b">b</a>"#.to_string(),
    )
    .await;
    mount_page(
        &server,
        "/a",
        r##"<a href="/">home</a><a href="/b">b</a><a href="/a#self">self</a>"##.to_string(),
    )
    .await;
    mount_page(
        &server,
        "/b",
        r#"<a href="/">home</a><a href="/a">a</a>"#.to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let report = crawl(&config, &format!("{}/", server.uri()), 5, "")
        .await
        .unwrap();

    assert_eq!(report.nodes_scanned, 3);

    let store = open_store(&config);
    assert_eq!(store.count_pages().unwrap(), 3);
    // "/" -> a, b; "/a" -> "/", b; "/b" -> "/", a. The self-link is dropped.
    assert_eq!(store.count_edges().unwrap(), 6);
    // Wiremock verifies `.expect(1)` on every page when the server drops
}

#[tokio::test]
async fn test_link_cap_limits_edges() {
    let server = MockServer::start().await;

    let mut body = String::from("<title>Hub</title>");
    for i in 0..150 {
        body.push_str(&format!(r#"<a href="/p{}">p{}</a>"#, i, i));
    }
    mount_page(&server, "/", body).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    crawl(&config, &format!("{}/", server.uri()), 0, "")
        .await
        .unwrap();

    let store = open_store(&config);
    assert_eq!(store.count_edges().unwrap(), 100);
    assert_eq!(store.count_pages().unwrap(), 101);
}

#[tokio::test]
async fn test_short_blocks_filtered_from_content() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<title>Blocks</title>
           <p>Too short</p>
           <p>This paragraph easily clears the limit.</p>
           <p>   </p>
           <p>And so does this second paragraph.</p>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let seed = format!("{}/", server.uri());
    crawl(&config, &seed, 0, "").await.unwrap();

    let page = open_store(&config).get_page(&seed).unwrap().unwrap();
    assert_eq!(
        page.content.as_deref(),
        Some("This paragraph easily clears the limit.\nAnd so does this second paragraph.")
    );
}

#[tokio::test]
async fn test_meta_charset_wins_over_header() {
    let server = MockServer::start().await;

    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(b"<html><head><meta charset=\"windows-1252\"><title>Caf\xe9</title></head>");
    body.extend_from_slice(b"<body><p>Cr\xe8me br\xfbl\xe9e is served every day.</p></body></html>");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let seed = format!("{}/", server.uri());
    crawl(&config, &seed, 0, "").await.unwrap();

    let page = open_store(&config).get_page(&seed).unwrap().unwrap();
    assert_eq!(page.title.as_deref(), Some("Café"));
    assert_eq!(
        page.content.as_deref(),
        Some("Crème brûlée is served every day.")
    );
}

#[tokio::test]
async fn test_recrawl_updates_existing_nodes() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<title>Home</title><a href="/child">c</a>"#.to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(html_page(r#"<title>Child</title>"#.to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let seed = format!("{}/", base);
    let child = format!("{}/child", base);

    crawl(&config, &seed, 1, "").await.unwrap();
    let first = open_store(&config).get_page(&child).unwrap().unwrap();

    // Crawling from the child makes it a root; level is last-write-wins
    crawl(&config, &child, 0, "").await.unwrap();

    let store = open_store(&config);
    let second = store.get_page(&child).unwrap().unwrap();
    assert_eq!(first.level, Some(1));
    assert_eq!(second.level, Some(0));
    assert!(second.last_scanned_at >= first.last_scanned_at);
    assert_eq!(store.count_pages().unwrap(), 2);
    assert_eq!(store.count_edges().unwrap(), 1);

    let roots: Vec<String> = store.root_pages().unwrap().into_iter().map(|p| p.url).collect();
    assert!(roots.contains(&seed));
    assert!(roots.contains(&child));
}

#[tokio::test]
async fn test_run_history_written() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page("<title>Page</title>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    crawl(&config, &format!("{}/", server.uri()), 1, "abc123")
        .await
        .unwrap();
    crawl(&config, "ftp://example.com/", 1, "abc123")
        .await
        .unwrap();

    let runs = open_store(&config).list_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    // Newest first
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].seed_url, "ftp://example.com/");
    assert_eq!(runs[1].status, RunStatus::Completed);
    assert_eq!(runs[1].nodes_scanned, 1);
    assert_eq!(runs[1].config_hash, "abc123");
}

#[tokio::test]
async fn test_coordinator_with_in_memory_store() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<title>Mem</title><a href="/next">n</a>"#.to_string(),
    )
    .await;
    mount_page(&server, "/next", "<title>Next</title>".to_string()).await;

    let store = SqliteGraphStore::open_in_memory().unwrap();
    let fetcher = Fetcher::new(&Config::default()).unwrap();
    let mut coordinator = Coordinator::new(store, fetcher, "");

    let report = coordinator.crawl(&format!("{}/", server.uri()), 1).await;
    assert_eq!(report.nodes_scanned, 2);

    let store = coordinator.into_store();
    assert_eq!(store.count_scanned_pages().unwrap(), 2);
}
