//! Integration tests for the aggregation pipeline
//!
//! These tests use wiremock to stand in for the marketplace API and exercise
//! the fetchers and the orchestrator end-to-end.

use std::sync::{Arc, Mutex};

use bidscope::api::{ApiClient, RetryPolicy};
use bidscope::fetch::{fetch_bids, fetch_milestones, fetch_project_details, BidQuery};
use bidscope::model::AwardStatus;
use bidscope::pipeline::{
    Aggregator, CancelToken, FetchScope, NullObserver, ProgressEvent, ProgressObserver, Stage,
    StageProgress,
};
use bidscope::storage::{DatasetMetadata, DatasetRecord, DatasetStore, SqliteStore};
use bidscope::BidscopeError;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BIDS_PATH: &str = "/projects/0.1/bids/";
const PROJECTS_PATH: &str = "/projects/0.1/projects/";
const THREADS_PATH: &str = "/messages/0.1/threads/";
const MILESTONES_PATH: &str = "/projects/0.1/milestones/";
const USERS_PATH: &str = "/users/0.1/users/";

fn test_client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Some("test-token".to_string()), 1.0).unwrap()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

fn bid_query(limit: Option<u32>) -> BidQuery {
    BidQuery {
        bidder_id: 99,
        from_time: None,
        to_time: None,
        limit,
        page_size: 50,
    }
}

/// Observer recording every reported percentage
struct Recorder(Arc<Mutex<Vec<f32>>>);

impl ProgressObserver for Recorder {
    fn on_progress(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event.percent);
    }
}

/// Bid list response with two bids, stub projects, and stub users
fn bid_list_body() -> serde_json::Value {
    json!({
        "status": "success",
        "result": {
            "bids": [
                {
                    "id": 1,
                    "project_id": 10,
                    "bidder_id": 99,
                    "amount": 100.0,
                    "time_submitted": 1_700_000_000,
                    "award_status": "pending",
                },
                {
                    "id": 2,
                    "project_id": 20,
                    "bidder_id": 99,
                    "amount": 200.0,
                    "time_submitted": 1_700_000_000,
                    "award_status": "awarded",
                    "time_awarded": 1_700_007_200,
                },
            ],
            "projects": {
                "10": {"id": 10, "title": "Stub title 10", "owner_id": 7},
                "20": {"id": 20, "title": "Stub title 20", "owner_id": 8},
            },
            "users": {
                "7": {"id": 7, "username": "acme"},
                "8": {"id": 8, "username": "globex"},
            },
        },
    })
}

async fn mount_full_pipeline_mocks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(BIDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(bid_list_body())
                .insert_header("ratelimit-limit", "50;window=60")
                .insert_header("ratelimit-remaining", "49"),
        )
        .mount(server)
        .await;

    // Detailed projects as a list; project 10 omits owner_id so the stub
    // value must survive the merge
    Mock::given(method("GET"))
        .and(path(PROJECTS_PATH))
        .and(query_param("full_description", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "projects": [
                    {
                        "id": 10,
                        "title": "Logo design",
                        "type": "fixed",
                        "budget": {"minimum": 50.0, "maximum": 250.0},
                        "bid_stats": {"bid_count": 14, "bid_avg": 125.0},
                        "jobs": [{"name": "Design"}],
                        "time_submitted": 1_699_990_000,
                    },
                    {
                        "id": 20,
                        "title": "API integration",
                        "owner_id": 8,
                        "type": "hourly",
                        "bid_stats": {"bid_count": 7, "bid_avg": 160.0},
                        "jobs": [{"name": "Rust"}],
                        "time_submitted": 1_699_999_000,
                    },
                ],
            },
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(THREADS_PATH))
        .and(query_param("contexts[]", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "threads": [{
                    "context": {"id": 10, "type": "project"},
                    "time_created": 1_700_003_600,
                    "message": {"time_created": 1_700_003_600},
                }],
            },
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(THREADS_PATH))
        .and(query_param("contexts[]", "20"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": {"threads": []}})),
        )
        .mount(server)
        .await;

    // Milestones as a map; only the cleared one may count toward the total
    Mock::given(method("GET"))
        .and(path(MILESTONES_PATH))
        .and(query_param("bids[]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "milestones": {
                    "900": {"id": 900, "bid_id": 2, "amount": 150.0, "status": "cleared"},
                    "901": {"id": 901, "bid_id": 2, "amount": 50.0, "status": "pending"},
                },
            },
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "users": {
                    "7": {
                        "id": 7,
                        "display_name": "Acme Corp",
                        "username": "acme",
                        "location": {"country": {"name": "Germany"}},
                        "employer_reputation": {"entire_history": {"overall": 4.8}},
                        "status": {"payment_verified": true},
                    },
                    "8": {
                        "id": 8,
                        "display_name": "Globex",
                        "username": "globex",
                        "location": {"country": {"name": "Canada"}},
                        "status": {"payment_verified": false},
                    },
                },
            },
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_pipeline_end_to_end() {
    let server = MockServer::start().await;
    mount_full_pipeline_mocks(&server).await;

    let client = test_client(&server);
    let percents = Arc::new(Mutex::new(Vec::new()));
    let observer = Recorder(percents.clone());

    let aggregator = Aggregator::new(&client, &observer).with_retry_policy(fast_retry());
    let rows = aggregator
        .run(&bid_query(None), FetchScope::Full)
        .await
        .expect("pipeline failed");

    // Row order and count mirror the bid list
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].bid_id, 1);
    assert_eq!(rows[1].bid_id, 2);

    // Bid 1: detailed project fields plus the surviving stub owner
    let first = &rows[0];
    assert_eq!(first.project_title.as_deref(), Some("Logo design"));
    assert_eq!(first.client_id, Some(7));
    assert_eq!(first.client_name.as_deref(), Some("Acme Corp"));
    assert_eq!(first.client_country.as_deref(), Some("Germany"));
    assert_eq!(first.client_reputation, Some(4.8));
    assert_eq!(first.payment_verified, Some(true));
    assert_eq!(first.average_bid, Some(125.0));
    // 100 / 125 = 0.8
    assert_eq!(first.price_competitiveness, Some(0.8));
    assert!(first.received_response);
    assert_eq!(first.response_time_secs, Some(3600));
    assert_eq!(first.time_to_bid_secs, Some(10_000));

    // Bid 2: cleared milestone counted, pending excluded
    let second = &rows[1];
    assert_eq!(second.award_status, AwardStatus::Awarded);
    assert_eq!(second.total_milestone_amount, 150.0);
    assert_eq!(second.bid_to_award_secs, Some(7200));
    assert!(!second.received_response);
    assert_eq!(second.response_time_secs, None);

    // Progress only ever moves forward
    let recorded = percents.lock().unwrap();
    assert!(!recorded.is_empty());
    for pair in recorded.windows(2) {
        assert!(pair[1] >= pair[0], "progress went backwards: {:?}", recorded);
    }
    assert_eq!(*recorded.last().unwrap(), 100.0);

    // The saved dataset round-trips losslessly
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bidscope.db");
    let mut store = SqliteStore::new(&db_path).unwrap();

    let record = DatasetRecord {
        id: "ds-test".to_string(),
        name: "integration run".to_string(),
        metadata: DatasetMetadata {
            from_date: None,
            to_date: None,
            bid_limit: None,
            row_count: rows.len() as u64,
            saved_at: "2024-07-01T12:00:00+00:00".to_string(),
            last_modified: "2024-07-01T12:00:00+00:00".to_string(),
            config_hash: "hash".to_string(),
        },
        rows,
    };
    store.save_dataset(&record).unwrap();

    let loaded = store.get_dataset("ds-test").unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn test_bids_only_scope_skips_enrichment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BIDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(bid_list_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let aggregator = Aggregator::new(&client, &observer).with_retry_policy(fast_retry());

    let rows = aggregator
        .run(&bid_query(None), FetchScope::BidsOnly)
        .await
        .expect("bids-only run failed");

    assert_eq!(rows.len(), 2);
    // Enrichment never ran: stub titles remain, derived fields default
    assert_eq!(rows[0].project_title.as_deref(), Some("Stub title 10"));
    assert_eq!(rows[0].average_bid, None);
    assert!(!rows[0].received_response);
    assert_eq!(rows[1].total_milestone_amount, 0.0);

    // Only the bids endpoint was hit
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == BIDS_PATH));
}

#[tokio::test]
async fn test_bid_limit_stops_pagination() {
    let server = MockServer::start().await;

    // Five bids available; the fetcher is limited to two and must not
    // request a second page
    let bids: Vec<serde_json::Value> = (1..=5)
        .map(|i| json!({"id": i, "project_id": i * 10, "amount": 50.0}))
        .collect();

    Mock::given(method("GET"))
        .and(path(BIDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"bids": bids, "projects": {}, "users": {}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let progress = StageProgress::new(&observer, Stage::Bids);
    let cancel = CancelToken::new();

    let result = fetch_bids(&client, &bid_query(Some(2)), &fast_retry(), &progress, &cancel)
        .await
        .expect("bid fetch failed");

    assert_eq!(result.bids.len(), 2);
    assert_eq!(result.bids[0].id, 1);
    assert_eq!(result.bids[1].id, 2);
}

#[tokio::test]
async fn test_milestones_requested_only_for_awarded_bids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(MILESTONES_PATH))
        .and(query_param("bids[]", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "milestones": {
                    "900": {"id": 900, "bid_id": 2, "amount": 75.0, "status": "cleared"},
                },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let progress = StageProgress::new(&observer, Stage::Payments);
    let cancel = CancelToken::new();

    let bids = vec![
        bidscope::model::Bid {
            id: 1,
            project_id: 10,
            bidder_id: Some(99),
            amount: 50.0,
            submitted_at: None,
            award_status: AwardStatus::Pending,
            awarded_at: None,
            paid_amount: 0.0,
            milestones: Vec::new(),
        },
        bidscope::model::Bid {
            id: 2,
            project_id: 20,
            bidder_id: Some(99),
            amount: 80.0,
            submitted_at: None,
            award_status: AwardStatus::Awarded,
            awarded_at: None,
            paid_amount: 0.0,
            milestones: Vec::new(),
        },
    ];

    let milestones = fetch_milestones(&client, &bids, &fast_retry(), &progress, &cancel)
        .await
        .expect("milestone fetch failed");

    assert_eq!(milestones.len(), 1);
    assert!(milestones.contains_key(&2));

    // The pending bid's ID never appeared in any request
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.query().unwrap_or("").contains("bids%5B%5D=1")));
}

#[tokio::test]
async fn test_429_sets_rate_limited_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BIDS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(!client.is_rate_limited());

    let observer = NullObserver;
    let progress = StageProgress::new(&observer, Stage::Bids);
    let cancel = CancelToken::new();

    let result = fetch_bids(&client, &bid_query(None), &fast_retry(), &progress, &cancel).await;

    match result {
        Err(BidscopeError::Api(e)) => assert!(e.is_retryable()),
        other => panic!("expected rate-limit error, got {:?}", other.map(|r| r.bids.len())),
    }
    assert!(client.is_rate_limited());
}

#[tokio::test]
async fn test_partial_batch_failure_continues() {
    let server = MockServer::start().await;

    // 15 project IDs split into batches of 10 and 5; the first batch fails
    let project_ids: Vec<u64> = (1..=15).collect();

    Mock::given(method("GET"))
        .and(path(PROJECTS_PATH))
        .and(query_param("projects[]", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let second_batch: Vec<serde_json::Value> = (11..=15)
        .map(|i| json!({"id": i, "title": format!("Project {}", i)}))
        .collect();

    Mock::given(method("GET"))
        .and(path(PROJECTS_PATH))
        .and(query_param("projects[]", "11"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"projects": second_batch}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let progress = StageProgress::new(&observer, Stage::ProjectDetails);
    let cancel = CancelToken::new();

    let details = fetch_project_details(&client, &project_ids, &fast_retry(), &progress, &cancel)
        .await
        .expect("fetch should tolerate one failed batch");

    // Only the second batch contributed
    assert_eq!(details.len(), 5);
    assert!(details.contains_key(&11));
    assert!(!details.contains_key(&1));
}

#[tokio::test]
async fn test_all_batches_failing_fails_the_stage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PROJECTS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let progress = StageProgress::new(&observer, Stage::ProjectDetails);
    let cancel = CancelToken::new();

    let result =
        fetch_project_details(&client, &[1, 2, 3], &fast_retry(), &progress, &cancel).await;

    assert!(matches!(result, Err(BidscopeError::Api(_))));
}

#[tokio::test]
async fn test_stage_failure_aborts_pipeline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BIDS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let aggregator = Aggregator::new(&client, &observer).with_retry_policy(fast_retry());

    let result = aggregator.run(&bid_query(None), FetchScope::Full).await;

    match result {
        Err(BidscopeError::Stage { stage, .. }) => assert_eq!(stage, "bids"),
        other => panic!("expected stage error, got {:?}", other.map(|r| r.len())),
    }

    // Nothing past the bids endpoint was touched
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == BIDS_PATH));
}

#[tokio::test]
async fn test_cancelled_token_stops_run_before_any_request() {
    let server = MockServer::start().await;

    let client = test_client(&server);
    let observer = NullObserver;
    let aggregator = Aggregator::new(&client, &observer).with_retry_policy(fast_retry());

    aggregator.cancel_token().cancel();

    let result = aggregator.run(&bid_query(None), FetchScope::Full).await;
    assert!(matches!(result, Err(BidscopeError::Cancelled)));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_low_remaining_header_flips_rate_limited_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BIDS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {"bids": [], "projects": {}, "users": {}}}))
                .insert_header("ratelimit-limit", "50;window=60")
                .insert_header("ratelimit-remaining", "1"),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let observer = NullObserver;
    let progress = StageProgress::new(&observer, Stage::Bids);
    let cancel = CancelToken::new();

    fetch_bids(&client, &bid_query(None), &fast_retry(), &progress, &cancel)
        .await
        .expect("empty fetch failed");

    assert!(client.is_rate_limited());
}
