
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use spark_workbench::api::{router, AppState};
use spark_workbench::config::JobServerConfig;
use spark_workbench::design::MemoryDesignStore;
use spark_workbench::jobserver::{JobServerApi, JobServerClient, JobServerError, JobSubmission};
use test_harness::{form, spawn_fake_job_server, TestApp};

/// What the fake job server saw.
#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    body: String,
}

type Seen = Arc<Mutex<Vec<SeenRequest>>>;

fn record(seen: &Seen, method: &str, path: String, query: HashMap<String, String>, body: String) {
    seen.lock().unwrap().push(SeenRequest {
        method: method.to_string(),
        path,
        query,
        body,
    });
}

async fn jars(State(seen): State<Seen>, Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    record(&seen, "GET", "/jars".to_string(), q, String::new());
    Json(json!({
        "wordcount": "2014-05-01T10:00:00.000Z",
        "analytics": "2014-05-02T10:00:00.000Z"
    }))
}

async fn contexts() -> impl IntoResponse {
    Json(json!(["shared", "adhoc"]))
}

async fn create_context(
    State(seen): State<Seen>,
    Path(name): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> axum::response::Response {
    record(&seen, "POST", format!("/contexts/{}", name), q, String::new());
    if name == "dup" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "ERROR", "result": "context dup exists"})),
        )
            .into_response();
    }
    "OK".into_response()
}

async fn delete_context(
    State(seen): State<Seen>,
    Path(name): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    record(&seen, "DELETE", format!("/contexts/{}", name), q, String::new());
    "OK"
}

async fn job(Path(job_id): Path<String>) -> axum::response::Response {
    match job_id.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "ERROR", "result": "No such job ID missing"})),
        )
            .into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "stack trace").into_response(),
        _ => Json(json!({"status": "FINISHED", "result": {"a": 2, "b": 1}})).into_response(),
    }
}

async fn submit(
    State(seen): State<Seen>,
    Query(q): Query<HashMap<String, String>>,
    body: String,
) -> impl IntoResponse {
    record(&seen, "POST", "/jobs".to_string(), q, body);
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "STARTED",
            "result": {"jobId": "5453779a-f004-45fc-a11d-a39dae0f9bf4", "context": "b7ea0eb5-spark.jobserver.WordCountExample"}
        })),
    )
}

async fn fake_job_server() -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/jars", get(jars))
        .route("/contexts", get(contexts))
        .route("/contexts/:name", post(create_context).delete(delete_context))
        .route("/jobs", post(submit))
        .route("/jobs/:job_id", get(job))
        .with_state(seen.clone());

    (spawn_fake_job_server(app).await, seen)
}

fn client(url: &str, impersonation: bool) -> JobServerClient {
    JobServerClient::new(&JobServerConfig {
        url: url.to_string(),
        request_timeout_ms: 5_000,
        impersonation,
    })
    .unwrap()
}

#[tokio::test]
async fn test_jars_returns_sorted_names() {
    let (url, _) = fake_job_server().await;

    let jars = client(&url, false).jars().await.unwrap();

    assert_eq!(jars, vec!["analytics", "wordcount"]);
}

#[tokio::test]
async fn test_contexts() {
    let (url, _) = fake_job_server().await;

    let contexts = client(&url, false).contexts().await.unwrap();

    assert_eq!(contexts, vec!["shared", "adhoc"]);
}

#[tokio::test]
async fn test_create_context_plain_text_ack() {
    let (url, seen) = fake_job_server().await;

    let err = client(&url, false)
        .create_context("analysis", "1g", "2")
        .await
        .unwrap_err();

    assert!(matches!(err, JobServerError::NotJson { status: 200, .. }));
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].path, "/contexts/analysis");
    assert_eq!(seen[0].query["memory-per-node"], "1g");
    assert_eq!(seen[0].query["num-cpu-cores"], "2");
}

#[tokio::test]
async fn test_create_context_remote_error_carries_payload() {
    let (url, _) = fake_job_server().await;

    let err = client(&url, false)
        .create_context("dup", "512m", "1")
        .await
        .unwrap_err();

    match err {
        JobServerError::Remote {
            status, payload, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(payload.unwrap()["result"], "context dup exists");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_context() {
    let (url, seen) = fake_job_server().await;

    let err = client(&url, false)
        .delete_context("analysis")
        .await
        .unwrap_err();

    assert!(matches!(err, JobServerError::NotJson { .. }));
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].path, "/contexts/analysis");
}

#[tokio::test]
async fn test_job_status() {
    let (url, _) = fake_job_server().await;
    let c = client(&url, false);

    let job = c.job("abc").await.unwrap();
    assert_eq!(job["status"], "FINISHED");

    let err = c.job("missing").await.unwrap_err();
    assert_eq!(
        err.payload().unwrap()["result"],
        "No such job ID missing"
    );

    let err = c.job("broken").await.unwrap_err();
    assert!(err.payload().is_none());
    assert!(err.to_string().contains("stack trace"));
}

#[tokio::test]
async fn test_submit_job_sends_query_and_config() {
    let (url, seen) = fake_job_server().await;

    let result = client(&url, false)
        .submit_job(&JobSubmission {
            app_name: "wordcount".to_string(),
            class_path: "spark.jobserver.WordCountExample".to_string(),
            data: "input.string=a b a\nx=1".to_string(),
            context: Some("shared".to_string()),
            sync: false,
        })
        .await
        .unwrap();

    assert!(result.is_started());
    assert_eq!(
        result.result["jobId"],
        "5453779a-f004-45fc-a11d-a39dae0f9bf4"
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].query["appName"], "wordcount");
    assert_eq!(seen[0].query["classPath"], "spark.jobserver.WordCountExample");
    assert_eq!(seen[0].query["context"], "shared");
    assert_eq!(seen[0].query["sync"], "false");
    assert_eq!(seen[0].body, "input.string=a b a\nx=1");
}

#[tokio::test]
async fn test_submit_job_without_context() {
    let (url, seen) = fake_job_server().await;

    client(&url, false)
        .submit_job(&JobSubmission {
            app_name: "wordcount".to_string(),
            class_path: "WordCount".to_string(),
            data: String::new(),
            context: None,
            sync: false,
        })
        .await
        .unwrap();

    assert!(!seen.lock().unwrap()[0].query.contains_key("context"));
}

#[tokio::test]
async fn test_impersonation_adds_do_as() {
    let (url, seen) = fake_job_server().await;

    client(&url, true).for_user("alice").jars().await.unwrap();
    client(&url, false).for_user("alice").jars().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].query.get("doAs").map(String::as_str), Some("alice"));
    assert!(!seen[1].query.contains_key("doAs"));
}

#[tokio::test]
async fn test_unreachable_job_server_is_transport_error() {
    let err = client("http://127.0.0.1:1", false).jars().await.unwrap_err();

    assert_eq!(err.error_type(), "transport");
}

#[tokio::test]
async fn test_create_context_end_to_end() {
    let (url, _) = fake_job_server().await;
    let designs = Arc::new(MemoryDesignStore::new());
    let state = AppState::new(Arc::new(client(&url, false)), designs.clone());
    let app = TestApp {
        router: router(state),
        stub: Default::default(),
        designs,
    };

    let (status, body) = app
        .send(form(
            Method::POST,
            "/spark/api/contexts/create",
            &[("name", "analysis")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK", "name": "analysis"}));

    let (_, body) = app
        .send(form(
            Method::POST,
            "/spark/api/contexts/create",
            &[("name", "dup")],
        ))
        .await;
    assert_eq!(
        body,
        json!({"status": "ERROR", "result": "context dup exists", "name": "dup"})
    );
}
