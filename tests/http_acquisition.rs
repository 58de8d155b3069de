// End-to-end acquisition against a mock catalog server

use pokedex::acquisition::lock;
use pokedex::{
    project, AcquisitionService, Aggregation, FetchError, HttpSource, OverlapPolicy, PageRequest,
    RecordStore, RefreshOutcome, StatKind,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CREATURES: [(u32, &str, &str); 3] = [
    (1, "bulbasaur", "grass"),
    (4, "charmander", "fire"),
    (25, "pikachu", "electric"),
];

fn record_json(id: u32, name: &str, kind: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "types": [{"slot": 1, "type": {"name": kind, "url": "ignored"}}],
        "stats": [
            {"base_stat": 45, "stat": {"name": "hp"}},
            {"base_stat": 120, "stat": {"name": "attack"}},
            {"base_stat": 49, "stat": {"name": "defense"}},
            {"base_stat": 65, "stat": {"name": "special-attack"}}
        ]
    })
}

async fn mount_index(server: &MockServer, limit: &str) {
    let results: Vec<_> = CREATURES
        .iter()
        .map(|(id, name, _)| {
            json!({"name": name, "url": format!("{}/api/v2/pokemon/{}/", server.uri(), id)})
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/v2/pokemon"))
        .and(query_param("limit", limit))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1302,
            "results": results
        })))
        .mount(server)
        .await;
}

async fn mount_records(server: &MockServer, failing: Option<u32>) {
    for (id, name, kind) in CREATURES {
        let response = if Some(id) == failing {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_json(record_json(id, name, kind))
        };
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/pokemon/{id}/")))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

fn service(server: &MockServer, limit: u32, aggregation: Aggregation) -> AcquisitionService {
    let source = HttpSource::new(format!("{}/api/v2/pokemon", server.uri()), None);
    AcquisitionService::new(Arc::new(source), PageRequest { limit, offset: 0 }, aggregation)
}

#[tokio::test]
async fn test_fetch_all_resolves_every_entry() {
    let server = MockServer::start().await;
    mount_index(&server, "3").await;
    mount_records(&server, None).await;

    let records = service(&server, 3, Aggregation::FailFast)
        .fetch_all()
        .await
        .unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["bulbasaur", "charmander", "pikachu"]);

    let cards = project(&records, "PIKA");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id, 25);
    assert_eq!(cards[0].stat(StatKind::Attack).value, 120);
    assert_eq!(cards[0].stat(StatKind::Attack).width, 100);
    assert_eq!(cards[0].types[0].color.token, "yellow-400");
}

#[tokio::test]
async fn test_one_failed_entry_fails_the_batch() {
    let server = MockServer::start().await;
    mount_index(&server, "3").await;
    mount_records(&server, Some(4)).await;

    let err = service(&server, 3, Aggregation::FailFast)
        .fetch_all()
        .await
        .unwrap_err();

    match err {
        FetchError::Batch { failed, total, first } => {
            assert_eq!((failed, total), (1, 3));
            assert!(matches!(*first, FetchError::Status { status: 500, .. }));
        }
        other => panic!("expected batch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_best_effort_reports_failed_entry() {
    let server = MockServer::start().await;
    mount_index(&server, "3").await;
    mount_records(&server, Some(4)).await;

    let outcome = service(&server, 3, Aggregation::BestEffort)
        .fetch_batch()
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].name, "charmander");
}

#[tokio::test]
async fn test_malformed_record_is_decode_error() {
    let server = MockServer::start().await;
    mount_index(&server, "3").await;
    for (id, _, _) in CREATURES {
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/pokemon/{id}/")))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
    }

    let outcome = service(&server, 3, Aggregation::BestEffort)
        .fetch_batch()
        .await
        .unwrap();

    assert!(outcome.records.is_empty());
    assert!(outcome
        .failures
        .iter()
        .all(|f| matches!(f.error, FetchError::Decode { .. })));
}

#[tokio::test]
async fn test_index_failure_leaves_store_empty_and_not_loading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pokemon"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Mutex::new(RecordStore::new(OverlapPolicy::Ignore));
    let outcome = service(&server, 151, Aggregation::FailFast)
        .refresh(&store)
        .await;

    assert!(matches!(outcome, RefreshOutcome::Failed { generation: 1, .. }));
    let store = lock(&store);
    assert!(store.records().is_empty());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Port 1 is reserved; connections are refused
    let source = HttpSource::new("http://127.0.0.1:1/api/v2/pokemon", None);
    let service = AcquisitionService::new(
        Arc::new(source),
        PageRequest::default(),
        Aggregation::FailFast,
    );

    let err = service.fetch_all().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
}

#[tokio::test]
async fn test_null_stats_do_not_fail_the_batch() {
    let server = MockServer::start().await;
    mount_index(&server, "3").await;
    for (id, name, kind) in CREATURES {
        let mut body = record_json(id, name, kind);
        if id == 4 {
            body["stats"] = serde_json::Value::Null;
        }
        Mock::given(method("GET"))
            .and(path(format!("/api/v2/pokemon/{id}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let records = service(&server, 3, Aggregation::FailFast)
        .fetch_all()
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[1].name, "charmander");
    assert_eq!(records[1].stat_at(0), 0);
}
