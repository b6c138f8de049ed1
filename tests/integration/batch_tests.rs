//! Integration tests for batch runs
//!
//! These tests use wiremock to stand in for the fiction site and a temporary
//! SQLite database to check what a run leaves behind.

use chrono::{Duration as ChronoDuration, Utc};
use starwatch::client::{RateAwareClient, RecordingSleeper, Sleeper};
use starwatch::config::{load_config, Config};
use starwatch::diff::genre_movement;
use starwatch::orchestrator::{BatchSettings, Orchestrator};
use starwatch::storage::{SnapshotEntry, SqliteStorage, Storage};
use starwatch::{ProcessingBudget, StarwatchError, WorkState};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"
<html><body>
<div class="fiction-list">
  <div class="fiction-list-item row">
    <h2 class="fiction-title"><a href="/fiction/101/first">First Story</a></h2>
    <div class="author"><a href="/profile/1">Alice</a></div>
  </div>
  <div class="fiction-list-item row">
    <h2 class="fiction-title"><a href="/fiction/202/second">Second Story</a></h2>
  </div>
  <div class="fiction-list-item row">
    <h2 class="fiction-title"><a href="/fiction/303/third">Third Story</a></h2>
  </div>
</div>
</body></html>
"#;

const FICTION_101: &str = r#"
<html><body>
  <div class="fic-title">
    <h1>First Story</h1>
    <h4><span>by </span><span><a href="/profile/1">Alice</a></span></h4>
  </div>
  <div class="fiction-info">
    <span class="label label-default">Original</span>
    <span class="label label-default">ONGOING</span>
  </div>
  <div class="fiction-stats">
    <ul class="list-unstyled">
      <li class="bold uppercase">Total Views :</li><li class="bold uppercase">9,001</li>
      <li class="bold uppercase">Followers :</li><li class="bold uppercase">120</li>
      <li class="bold uppercase">Pages :</li><li class="bold uppercase">310</li>
    </ul>
  </div>
</body></html>
"#;

/// Test fixture: a config pointing at the mock server plus a fresh database
struct Fixture {
    _dir: TempDir,
    config: Config,
    storage: SqliteStorage,
    client: RateAwareClient,
    sleeper: Arc<RecordingSleeper>,
}

impl Fixture {
    fn new(base_url: &str, genres: &[&str]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = dir.path().join("starwatch.db");
        let config_path = dir.path().join("starwatch.toml");

        let genre_list = genres
            .iter()
            .map(|g| format!("\"{}\"", g))
            .collect::<Vec<_>>()
            .join(", ");
        let toml = format!(
            r#"
[site]
base-url = "{base_url}"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[scraper]
request-delay-ms = 0
rate-limit-cooldown-ms = 5000

[rising-stars]
genres = [{genre_list}]

[storage]
database-path = "{db}"
"#,
            base_url = base_url,
            genre_list = genre_list,
            db = db_path.display()
        );
        std::fs::write(&config_path, toml).expect("Failed to write config");

        let config = load_config(&config_path).expect("Failed to load config");
        let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
        let sleeper = Arc::new(RecordingSleeper::new());
        let client = RateAwareClient::new(
            reqwest::Client::new(),
            Url::parse(base_url).expect("Failed to parse base URL"),
            Duration::ZERO,
            sleeper.clone(),
        );

        Self {
            _dir: dir,
            config,
            storage,
            client,
            sleeper,
        }
    }

    fn orchestrator(&mut self) -> Orchestrator<'_, RateAwareClient, SqliteStorage> {
        let sleeper: Arc<dyn Sleeper> = self.sleeper.clone();
        Orchestrator::new(
            &self.client,
            &mut self.storage,
            sleeper,
            BatchSettings::from_config(&self.config, "test-hash"),
        )
    }
}

fn budget() -> ProcessingBudget {
    ProcessingBudget::new(Duration::from_secs(60), Duration::from_secs(5))
}

async fn mount_page(server: &MockServer, page_path: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rising_stars_capture_writes_snapshots() {
    let server = MockServer::start().await;
    mount_page(&server, "/fictions/rising-stars", 200, LISTING).await;
    mount_page(&server, "/fictions/rising-stars/fantasy", 200, LISTING).await;

    let mut fixture = Fixture::new(&server.uri(), &["main", "fantasy"]);
    let summary = fixture
        .orchestrator()
        .run_rising_stars(&budget(), None)
        .await
        .expect("Run failed");

    assert_eq!(summary.processed_count, 2);
    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.saved_count, 6);
    assert_eq!(summary.remaining_count, 0);

    // Listing entries become tracked fictions
    assert_eq!(fixture.storage.count_fictions().unwrap(), 3);
    let tracked = fixture.storage.get_fiction_by_key(101).unwrap().unwrap();
    assert_eq!(tracked.title, "First Story");
    assert_eq!(tracked.author_name, "Alice");

    let main = fixture.storage.latest_snapshot("main").unwrap();
    let ids: Vec<(u64, u32)> = main.iter().map(|e| (e.fiction_id, e.position)).collect();
    assert_eq!(ids, vec![(101, 1), (202, 2), (303, 3)]);

    // Both genres are fresh now, so a second run has nothing to do
    let summary = fixture
        .orchestrator()
        .run_rising_stars(&budget(), None)
        .await
        .expect("Second run failed");
    assert_eq!(summary.total_count, 0);
    assert_eq!(fixture.storage.count_snapshot_entries().unwrap(), 6);
}

#[tokio::test]
async fn test_fiction_refresh_after_capture() {
    let server = MockServer::start().await;
    mount_page(&server, "/fictions/rising-stars", 200, LISTING).await;
    mount_page(&server, "/fiction/101", 200, FICTION_101).await;
    mount_page(&server, "/fiction/202", 404, "Not Found").await;
    mount_page(&server, "/fiction/303", 403, "Forbidden").await;

    let mut fixture = Fixture::new(&server.uri(), &["main"]);
    fixture
        .orchestrator()
        .run_rising_stars(&budget(), None)
        .await
        .expect("Capture failed");

    let summary = fixture
        .orchestrator()
        .run_fictions(&budget(), None)
        .await
        .expect("Refresh failed");

    // Gone and failed fictions still count as processed
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.processed_count, 3);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.saved_count, 1);

    let refreshed = fixture.storage.get_fiction_by_key(101).unwrap().unwrap();
    assert_eq!(refreshed.status, "ONGOING");
    assert!(refreshed.last_scraped_at.is_some());
    assert_eq!(fixture.storage.count_history_entries().unwrap(), 1);

    let attempts = fixture.storage.count_attempts_by_state().unwrap();
    assert_eq!(attempts.get(&WorkState::Gone), Some(&1));
    assert_eq!(attempts.get(&WorkState::FailedTerminal), Some(&1));

    // Nothing is due again inside the freshness window
    let summary = fixture
        .orchestrator()
        .run_fictions(&budget(), None)
        .await
        .expect("Second refresh failed");
    assert_eq!(summary.total_count, 0);
    assert!(fixture.sleeper.calls().is_empty());
}

#[tokio::test]
async fn test_rate_limited_listing_cools_down() {
    let server = MockServer::start().await;
    mount_page(&server, "/fictions/rising-stars", 429, "Slow down").await;
    mount_page(&server, "/fictions/rising-stars/fantasy", 200, LISTING).await;

    let mut fixture = Fixture::new(&server.uri(), &["main", "fantasy"]);
    let summary = fixture
        .orchestrator()
        .run_rising_stars(&budget(), None)
        .await
        .expect("Run failed");

    assert_eq!(summary.processed_count, 2);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(fixture.sleeper.calls(), vec![Duration::from_millis(5000)]);
    assert!(fixture.storage.latest_snapshot("main").unwrap().is_empty());
    assert_eq!(fixture.storage.latest_snapshot("fantasy").unwrap().len(), 3);

    let attempts = fixture.storage.count_attempts_by_state().unwrap();
    assert_eq!(attempts.get(&WorkState::FailedRetryable), Some(&1));
}

#[tokio::test]
async fn test_single_fiction_gone() {
    let server = MockServer::start().await;
    mount_page(&server, "/fiction/404", 404, "Not Found").await;

    let mut fixture = Fixture::new(&server.uri(), &["main"]);
    let result = fixture.orchestrator().scrape_fiction(404, &budget()).await;

    assert!(matches!(result, Err(StarwatchError::FictionGone(404))));
    assert_eq!(fixture.storage.count_history_entries().unwrap(), 0);
}

#[tokio::test]
async fn test_movement_after_two_days() {
    let server = MockServer::start().await;
    mount_page(&server, "/fictions/rising-stars/fantasy", 200, LISTING).await;

    let mut fixture = Fixture::new(&server.uri(), &["fantasy"]);

    // Yesterday's list: 303 led, 202 second, 999 has since dropped off
    let yesterday = Utc::now() - ChronoDuration::days(1);
    let previous: Vec<SnapshotEntry> = [(303, 1), (202, 2), (999, 3)]
        .into_iter()
        .map(|(fiction_id, position)| SnapshotEntry {
            fiction_id,
            genre: "fantasy".to_string(),
            position,
            captured_at: yesterday,
        })
        .collect();
    for entry in &previous {
        fixture
            .storage
            .create_fiction(
                &starwatch::storage::NewFiction {
                    id: entry.fiction_id,
                    ..Default::default()
                },
                yesterday,
            )
            .unwrap();
    }
    fixture.storage.append_snapshot_entries(&previous).unwrap();

    fixture
        .orchestrator()
        .run_rising_stars(&budget(), Some("fantasy"))
        .await
        .expect("Capture failed");

    let view = genre_movement(&fixture.storage, "fantasy", None, 13, 50).unwrap();
    assert!(view.previous_day.is_some());

    let rows: Vec<(u64, Option<i64>, bool, bool)> = view
        .movements
        .iter()
        .map(|r| (r.fiction_id, r.delta(), r.is_new(), r.is_dropped()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (101, None, true, false),
            (202, Some(0), false, false),
            (303, Some(-2), false, false),
            (999, None, false, true),
        ]
    );
}

#[tokio::test]
async fn test_database_survives_reopen() {
    let server = MockServer::start().await;
    mount_page(&server, "/fictions/rising-stars", 200, LISTING).await;

    let mut fixture = Fixture::new(&server.uri(), &["main"]);
    fixture
        .orchestrator()
        .run_rising_stars(&budget(), None)
        .await
        .expect("Run failed");

    let db_path = fixture.config.storage.database_path.clone();
    let reopened = SqliteStorage::new(Path::new(&db_path)).expect("Failed to reopen");
    assert_eq!(reopened.count_snapshot_entries().unwrap(), 3);
    let run = reopened.get_latest_run().unwrap().expect("No run recorded");
    assert_eq!(run.processed_count, 1);
}
