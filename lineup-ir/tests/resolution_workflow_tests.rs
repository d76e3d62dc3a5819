//! End-to-end resolution workflow tests through the HTTP surface
//!
//! Exercises ingest → resolve → inspect with in-process fakes standing in
//! for the three external collaborators.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use lineup_ir::db::groups::GroupCandidate;
use lineup_ir::services::classifier::{
    ClassificationSubject, ClassifierError, GroupingClassifier, RawGroupScore,
};
use lineup_ir::services::comparator::{ComparatorError, VisualComparator, VisualComparison};
use lineup_ir::services::describer::{Describer, DescriberError, Description};
use lineup_ir::services::resolver::ResolutionOrchestrator;
use lineup_ir::models::MatchConfidence;
use lineup_ir::{build_router, AppState};

struct FakeDescriber;

#[async_trait]
impl Describer for FakeDescriber {
    async fn describe(&self, image_ref: &str) -> Result<Option<Description>, DescriberError> {
        Ok(Some(Description {
            schema: json!({"source": image_ref}),
            natural_summary: Some(format!("description of {}", image_ref)),
        }))
    }
}

/// Scores every candidate with the same fixed probability
struct UniformClassifier {
    probability: f64,
}

#[async_trait]
impl GroupingClassifier for UniformClassifier {
    async fn score_groups(
        &self,
        _subject: &ClassificationSubject,
        candidates: &[GroupCandidate],
    ) -> Result<Vec<RawGroupScore>, ClassifierError> {
        Ok(candidates
            .iter()
            .map(|c| RawGroupScore {
                group_id: Some(c.group_id),
                probability: Some(self.probability),
                explanation: None,
            })
            .collect())
    }
}

struct RejectingComparator;

#[async_trait]
impl VisualComparator for RejectingComparator {
    async fn compare(
        &self,
        _image_a: &str,
        _image_b: &str,
        _context_a: Option<&str>,
        _context_b: Option<&str>,
    ) -> Result<VisualComparison, ComparatorError> {
        Ok(VisualComparison {
            similarity: 5.0,
            confidence: MatchConfidence::High,
            fatal_mismatch: None,
            explanation: None,
        })
    }
}

struct TestApp {
    _temp_dir: TempDir,
    router: axum::Router,
}

async fn test_app(classifier_probability: f64) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db = lineup_common::db::init_database(&temp_dir.path().join("lineup.db"))
        .await
        .unwrap();

    let describer: Arc<dyn Describer> = Arc::new(FakeDescriber);
    let resolver = Arc::new(ResolutionOrchestrator::new(
        db.clone(),
        describer.clone(),
        Arc::new(UniformClassifier {
            probability: classifier_probability,
        }),
        Arc::new(RejectingComparator),
    ));

    let state = AppState::new(db, resolver, describer);
    TestApp {
        _temp_dir: temp_dir,
        router: build_router(state),
    }
}

async fn request_json(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn ingest(router: &axum::Router, image_ref: &str, schema: Value) -> i64 {
    let (status, body) = request_json(
        router,
        "POST",
        "/captures",
        Some(json!({
            "image_ref": image_ref,
            "description_schema": schema,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_first_capture_creates_group_with_display_code() {
    let app = test_app(0.0).await;

    let capture_id = ingest(&app.router, "crop://a", json!({"top": "red jacket"})).await;
    let (status, outcome) = request_json(
        &app.router,
        "POST",
        &format!("/captures/{}/resolve", capture_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["created"], json!(true));
    assert_eq!(outcome["matched"], json!(false));
    assert_eq!(outcome["state"], json!("COMMITTED"));
    assert_eq!(outcome["group_id"], json!(1));
    assert_eq!(outcome["group_display_code"], json!("AB"));
}

#[tokio::test]
async fn test_matching_capture_joins_existing_group() {
    let app = test_app(90.0).await;

    let first = ingest(&app.router, "crop://a", json!({"top": "red jacket"})).await;
    request_json(&app.router, "POST", &format!("/captures/{}/resolve", first), None).await;

    let second = ingest(&app.router, "crop://b", json!({"top": "red jacket"})).await;
    let (status, outcome) = request_json(
        &app.router,
        "POST",
        &format!("/captures/{}/resolve", second),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["matched"], json!(true));
    assert_eq!(outcome["group_id"], json!(1));
    assert!(outcome["shortlist"].as_array().unwrap().len() == 1);

    // Registry reflects the membership
    let (status, groups) = request_json(&app.router, "GET", "/groups", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups["total"], json!(1));
    assert_eq!(groups["groups"][0]["member_count"], json!(2));
}

#[tokio::test]
async fn test_low_scores_create_separate_groups() {
    let app = test_app(10.0).await;

    let first = ingest(&app.router, "crop://a", json!({"top": "red jacket"})).await;
    request_json(&app.router, "POST", &format!("/captures/{}/resolve", first), None).await;

    let second = ingest(&app.router, "crop://b", json!({"top": "green hoodie"})).await;
    let (_, outcome) = request_json(
        &app.router,
        "POST",
        &format!("/captures/{}/resolve", second),
        None,
    )
    .await;

    assert_eq!(outcome["created"], json!(true));
    assert_eq!(outcome["group_id"], json!(2));
    assert_eq!(outcome["group_display_code"], json!("AC"));

    let (_, groups) = request_json(&app.router, "GET", "/groups", None).await;
    assert_eq!(groups["total"], json!(2));
}

#[tokio::test]
async fn test_resolved_capture_shows_group_assignment() {
    let app = test_app(0.0).await;

    let capture_id = ingest(&app.router, "crop://a", json!({"top": "red jacket"})).await;
    request_json(
        &app.router,
        "POST",
        &format!("/captures/{}/resolve", capture_id),
        None,
    )
    .await;

    let (status, capture) = request_json(
        &app.router,
        "GET",
        &format!("/captures/{}", capture_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(capture["group_id"], json!(1));

    let (status, group) = request_json(&app.router, "GET", "/groups/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group["representative_capture_id"], json!(capture_id));
    assert_eq!(group["display_code"], json!("AB"));
}

#[tokio::test]
async fn test_undescribed_ingest_is_described_by_fake() {
    let app = test_app(0.0).await;

    // No schema supplied: describe-on-ingest fills it in
    let (status, capture) = request_json(
        &app.router,
        "POST",
        "/captures",
        Some(json!({"image_ref": "crop://bare"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(capture["description_schema"]["source"], json!("crop://bare"));
}

#[tokio::test]
async fn test_empty_image_ref_rejected() {
    let app = test_app(0.0).await;

    let (status, body) = request_json(
        &app.router,
        "POST",
        "/captures",
        Some(json!({"image_ref": "  "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn test_resolve_unknown_capture_is_404() {
    let app = test_app(0.0).await;

    let (status, body) = request_json(&app.router, "POST", "/captures/999/resolve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn test_unknown_group_is_404() {
    let app = test_app(0.0).await;

    let (status, _) = request_json(&app.router, "GET", "/groups/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_re_resolution_is_idempotent_over_http() {
    let app = test_app(0.0).await;

    let capture_id = ingest(&app.router, "crop://a", json!({"top": "red jacket"})).await;
    let (_, first) = request_json(
        &app.router,
        "POST",
        &format!("/captures/{}/resolve", capture_id),
        None,
    )
    .await;
    let (_, second) = request_json(
        &app.router,
        "POST",
        &format!("/captures/{}/resolve", capture_id),
        None,
    )
    .await;

    assert_eq!(second["group_id"], first["group_id"]);
    assert_eq!(second["matched"], json!(true));
    assert_eq!(second["created"], json!(false));

    let (_, groups) = request_json(&app.router, "GET", "/groups", None).await;
    assert_eq!(groups["groups"][0]["member_count"], json!(1));
}

#[tokio::test]
async fn test_health_reports_ok() {
    let app = test_app(0.0).await;

    let (status, health) = request_json(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], json!("ok"));
    assert_eq!(health["module"], json!("lineup-ir"));
    assert!(health.get("last_error").is_none());
}
