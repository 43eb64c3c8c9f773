use super::*;
use crate::{credentials::MemoryCredentialStore, fixtures};
use axum::{
    extract::{Path, RawQuery, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{BlockerCategory, BlockerSeverity, BlockerStatus},
    error::ErrorCode,
};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(Option<String>, String, Option<String>)>>>,
}

impl Seen {
    async fn record(&self, headers: &HeaderMap, path: impl Into<String>, query: Option<String>) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().await.push((auth, path.into(), query));
    }

    async fn all(&self) -> Vec<(Option<String>, String, Option<String>)> {
        self.requests.lock().await.clone()
    }
}

async fn my_blockers(
    State(seen): State<Seen>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<BlockerListResponse> {
    seen.record(&headers, "my", query).await;
    Json(BlockerListResponse {
        blockers: vec![fixtures::blocker(
            "b1",
            BlockerStatus::Open,
            BlockerSeverity::High,
        )],
        total: 14,
    })
}

async fn team_blockers(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(team): Path<String>,
) -> Json<BlockerListResponse> {
    seen.record(&headers, team, None).await;
    Json(BlockerListResponse {
        blockers: Vec::new(),
        total: 0,
    })
}

async fn partial_stats() -> Json<serde_json::Value> {
    Json(json!({
        "total": 3,
        "byCategory": { "Technical": 2, "Customer Escalation": 1 },
        "bySeverity": { "High": 3 },
        "byStatus": { "Open": 3 },
        "weeklyTrend": [{ "week": "2024-W10", "count": 3 }]
    }))
}

async fn generate_team_report(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(team): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<AiReport> {
    seen.record(&headers, team, query).await;
    Json(fixtures::report("r1", "team summary", true))
}

async fn unauthorized() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn server_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "report engine unavailable", "statusCode": 500 })),
    )
}

async fn forbidden_with_unauthorized_body() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "message": "not your team", "statusCode": 401 })),
    )
}

async fn plain_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such report")
}

async fn spawn_tracker() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/blockers/my", get(my_blockers))
        .route("/blockers/my/stats", get(partial_stats))
        .route("/blockers/team/:team", get(team_blockers))
        .route("/blockers/team/:team/stats", get(forbidden_with_unauthorized_body))
        .route("/ai-reports/generate/team/:team", post(generate_team_report))
        .route("/ai-reports/my", get(server_error))
        .route("/ai-reports/:id", get(plain_not_found))
        .route("/auth/me", get(unauthorized))
        .with_state(seen.clone());
    let url = fixtures::spawn_api(app).await.expect("spawn api");
    (url, seen)
}

#[tokio::test]
async fn list_call_carries_bearer_token_and_filters() {
    let (url, seen) = spawn_tracker().await;
    let api = HttpTrackerApi::new(&url, Arc::new(MemoryCredentialStore::with_token("tok-1")))
        .expect("api");

    let query = BlockerQuery {
        status: Some(BlockerStatus::Open),
        category: Some(BlockerCategory::CustomerEscalation),
        ..BlockerQuery::with_limit(5)
    };
    let page = api.my_blockers(&query).await.expect("blockers");

    assert_eq!(page.total, 14);
    assert_eq!(page.blockers.len(), 1);

    let requests = seen.all().await;
    assert_eq!(requests.len(), 1);
    let (auth, _, raw_query) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer tok-1"));
    let raw_query = raw_query.clone().unwrap_or_default();
    assert!(raw_query.contains("status=Open"), "{raw_query}");
    assert!(raw_query.contains("limit=5"), "{raw_query}");
    assert!(raw_query.contains("category=Customer+Escalation"), "{raw_query}");
}

#[tokio::test]
async fn signed_out_calls_send_no_authorization() {
    let (url, seen) = spawn_tracker().await;
    let api = HttpTrackerApi::new(&url, Arc::new(MemoryCredentialStore::new())).expect("api");

    api.my_blockers(&BlockerQuery::default())
        .await
        .expect("blockers");

    let requests = seen.all().await;
    assert_eq!(requests[0].0, None);
    assert_eq!(requests[0].2, None);
}

#[tokio::test]
async fn team_names_are_escaped_into_one_path_segment() {
    let (url, seen) = spawn_tracker().await;
    let api = HttpTrackerApi::new(&url, Arc::new(MemoryCredentialStore::with_token("tok")))
        .expect("api");

    api.team_blockers("Platform / Core", &BlockerQuery::default())
        .await
        .expect("team blockers");

    let requests = seen.all().await;
    assert_eq!(requests[0].1, "Platform / Core");
}

#[tokio::test]
async fn server_stats_are_zero_filled() {
    let (url, _) = spawn_tracker().await;
    let api = HttpTrackerApi::new(&url, Arc::new(MemoryCredentialStore::with_token("tok")))
        .expect("api");

    let stats = api.my_stats().await.expect("stats");

    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_category.get(BlockerCategory::CustomerEscalation), 1);
    assert_eq!(stats.by_category.get(BlockerCategory::Review), 0);
    assert_eq!(stats.by_category.iter().count(), 12);
    assert_eq!(stats.by_severity.get(BlockerSeverity::Low), 0);
    assert_eq!(stats.by_status.get(BlockerStatus::Ignored), 0);
    assert_eq!(stats.weekly_trend.len(), 1);
}

#[tokio::test]
async fn generation_sends_period_as_query() {
    let (url, seen) = spawn_tracker().await;
    let api = HttpTrackerApi::new(&url, Arc::new(MemoryCredentialStore::with_token("tok")))
        .expect("api");

    let report = api
        .generate_team_report("Platform", ReportPeriod::Monthly)
        .await
        .expect("report");

    assert!(report.is_existing);
    let requests = seen.all().await;
    assert_eq!(requests[0].1, "Platform");
    assert_eq!(requests[0].2.as_deref(), Some("period=monthly"));
}

#[tokio::test]
async fn unauthorized_response_clears_stored_token() {
    let (url, _) = spawn_tracker().await;
    let credentials = Arc::new(MemoryCredentialStore::with_token("expired"));
    let api = HttpTrackerApi::new(&url, credentials.clone()).expect("api");

    let err = api.fetch_profile().await.expect_err("must be rejected");

    assert!(err.is_unauthorized());
    assert_eq!(credentials.load_token().await.expect("load"), None);
}

#[tokio::test]
async fn only_http_401_ends_the_session() {
    let (url, _) = spawn_tracker().await;
    let credentials = Arc::new(MemoryCredentialStore::with_token("tok"));
    let api = HttpTrackerApi::new(&url, credentials.clone()).expect("api");

    let err = api.team_stats("Platform").await.expect_err("must fail");

    assert!(!err.is_unauthorized());
    assert_eq!(err.code(), Some(ErrorCode::Forbidden));
    assert_eq!(
        credentials.load_token().await.expect("load").as_deref(),
        Some("tok")
    );
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let (url, _) = spawn_tracker().await;
    let credentials = Arc::new(MemoryCredentialStore::with_token("tok"));
    let api = HttpTrackerApi::new(&url, credentials.clone()).expect("api");

    let err = api.my_reports().await.expect_err("must fail");

    match err {
        ClientError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 500);
            assert_eq!(code, ErrorCode::Internal);
            assert_eq!(message, "report engine unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        credentials.load_token().await.expect("load").as_deref(),
        Some("tok")
    );
}

#[tokio::test]
async fn plain_text_error_body_becomes_message() {
    let (url, _) = spawn_tracker().await;
    let api = HttpTrackerApi::new(&url, Arc::new(MemoryCredentialStore::with_token("tok")))
        .expect("api");

    let err = api
        .report(&ReportId::new("missing"))
        .await
        .expect_err("must fail");

    match err {
        ClientError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code, ErrorCode::NotFound);
            assert_eq!(message, "no such report");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let api = HttpTrackerApi::new(
        "http://127.0.0.1:9/api",
        Arc::new(MemoryCredentialStore::new()),
    )
    .expect("api");

    let err = api.my_stats().await.expect_err("must fail");

    assert!(matches!(err, ClientError::Transport(_)), "{err:?}");
}

#[test]
fn rejects_base_urls_that_cannot_hold_paths() {
    let err = HttpTrackerApi::new("mailto:team@example.com", Arc::new(MemoryCredentialStore::new()))
        .err()
        .expect("must fail");
    assert!(matches!(err, ClientError::Validation(_)));
}
