//! # API REST
//!
//! REST API implementation for the triage engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//! - In-memory hosting of many independent quiz sessions
//!
//! Uses `api-shared` for wire types and `triage-core` for all behaviour.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod store;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use triage_core::{CoreConfig, ReportBuilder};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use store::SessionStore;

/// Application state shared by every request handler.
///
/// One report builder serves every session, so report ids increase across the whole server.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub sessions: SessionStore,
    pub reports: Arc<Mutex<ReportBuilder>>,
}

impl AppState {
    pub fn new(cfg: CoreConfig) -> Self {
        Self {
            sessions: SessionStore::new(cfg.session_limits()),
            cfg: Arc::new(cfg),
            reports: Arc::new(Mutex::new(ReportBuilder::new())),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_questions,
        handlers::create_session,
        handlers::get_session,
        handlers::answer,
        handlers::back,
        handlers::restart,
        handlers::toggle_model,
        handlers::ingest_text,
        handlers::add_symptom,
        handlers::remove_symptom,
        handlers::run_analysis,
        handlers::create_report,
        handlers::delete_session,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::SymptomDto,
        api_shared::OptionDto,
        api_shared::QuestionDto,
        api_shared::QuestionsRes,
        api_shared::ConditionDto,
        api_shared::DiagnosisResultDto,
        api_shared::ModelContributionDto,
        api_shared::PathEntryDto,
        api_shared::SessionStatus,
        api_shared::SessionRes,
        api_shared::AnswerReq,
        api_shared::IngestTextReq,
        api_shared::IngestTextRes,
        api_shared::SymptomChangeRes,
        api_shared::ToggleModelRes,
        api_shared::AnalysisRes,
        api_shared::PatientDto,
        api_shared::ReportReq,
        api_shared::ReportRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router, Swagger UI included, over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/questions", get(handlers::list_questions))
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/:id/answer", post(handlers::answer))
        .route("/sessions/:id/back", post(handlers::back))
        .route("/sessions/:id/restart", post(handlers::restart))
        .route(
            "/sessions/:id/models/:model_id",
            post(handlers::toggle_model),
        )
        .route("/sessions/:id/symptoms", post(handlers::add_symptom))
        .route("/sessions/:id/symptoms/text", post(handlers::ingest_text))
        .route(
            "/sessions/:id/symptoms/:symptom_id",
            delete(handlers::remove_symptom),
        )
        .route("/sessions/:id/analysis", post(handlers::run_analysis))
        .route("/sessions/:id/report", post(handlers::create_report))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use triage_core::{BackPolicy, QuestionGraph, ScoringRules, SessionLimits};

    fn config() -> CoreConfig {
        CoreConfig::new(
            QuestionGraph::default_catalog().unwrap(),
            ScoringRules::default(),
            BackPolicy::KeepSymptoms,
            Some(42),
        )
        .unwrap()
    }

    fn app() -> Router {
        router(AppState::new(config()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessionId"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(), "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_questions_lists_graph() {
        let (status, body) = call(&app(), "GET", "/questions", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_full_questionnaire_flow() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/answer"),
            Some(json!({ "optionId": "q1_neurological" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentQuestion"]["id"], "q8");

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/answer"),
            Some(json!({ "optionId": "q8_headache" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert!(body["result"]["conditions"].as_array().unwrap().len() >= 2);

        let (status, analysis) =
            call(&app, "POST", &format!("/sessions/{id}/analysis"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analysis["result"], body["result"]);
        assert_eq!(analysis["modelContributions"].as_array().unwrap().len(), 2);

        let (status, report) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/report"),
            Some(json!({ "patient": { "name": "Sam", "age": 40 } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["diagnosisResult"], body["result"]);
        assert_eq!(report["patient"]["name"], "Sam");
        assert_eq!(report["symptoms"][0]["name"], "Headache");
    }

    #[tokio::test]
    async fn test_explicit_analysis_runs_in_background_pool() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms/text"),
            Some(json!({ "text": "fever and a dry cough" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"].as_array().unwrap().len(), 2);

        let (status, analysis) =
            call(&app, "POST", &format!("/sessions/{id}/analysis"), None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = analysis["result"]["conditions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Influenza"));

        let (_, view) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(view["status"], "completed");
        assert_eq!(view["analysisInFlight"], false);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/answer"),
            Some(json!({ "optionId": "q9_nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("q9_nope"));

        let (status, _) = call(&app, "POST", &format!("/sessions/{id}/back"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", &format!("/sessions/{id}/analysis"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, "POST", &format!("/sessions/{id}/report"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/models/not-a-model"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = triage_uuid::UuidService::new();
        let (status, _) = call(&app, "GET", &format!("/sessions/{unknown}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/sessions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_back_restart_toggle_and_delete() {
        let app = app();
        let id = new_session(&app).await;

        call(
            &app,
            "POST",
            &format!("/sessions/{id}/answer"),
            Some(json!({ "optionId": "q1_pain" })),
        )
        .await;
        let (status, body) = call(&app, "POST", &format!("/sessions/{id}/back"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentQuestion"]["id"], "q1");
        assert_eq!(body["path"].as_array().unwrap().len(), 0);

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/models/biobert-v2"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selected"], true);

        let (status, body) = call(&app, "POST", &format!("/sessions/{id}/restart"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["progress"], 0.0);
        assert_eq!(body["selectedModels"].as_array().unwrap().len(), 3);

        let (status, _) = call(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_and_remove_symptom() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms"),
            Some(json!({ "id": "s2", "name": "Fever", "severity": 6 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
        assert_eq!(body["symptoms"][0]["severity"], 6);

        let (_, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms"),
            Some(json!({ "id": "s2", "name": "Fever" })),
        )
        .await;
        assert_eq!(body["changed"], false);
        assert_eq!(body["symptoms"].as_array().unwrap().len(), 1);

        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms"),
            Some(json!({ "id": "s3", "name": "Cough", "severity": 12 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) =
            call(&app, "DELETE", &format!("/sessions/{id}/symptoms/s2"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
        assert_eq!(body["symptoms"].as_array().unwrap().len(), 0);

        let (_, body) = call(&app, "DELETE", &format!("/sessions/{id}/symptoms/s2"), None).await;
        assert_eq!(body["changed"], false);

        let (_, view) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert!(view["symptoms"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_symptom_edits_rejected_after_completion() {
        let app = app();
        let id = new_session(&app).await;
        call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms/text"),
            Some(json!({ "text": "fever" })),
        )
        .await;
        call(&app, "POST", &format!("/sessions/{id}/analysis"), None).await;

        let (status, _) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms"),
            Some(json!({ "id": "s3", "name": "Cough" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            call(&app, "DELETE", &format!("/sessions/{id}/symptoms/s2"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_abandoned_analysis_does_not_lock_session() {
        let state = AppState::new(config());
        let app = router(state.clone());
        let id = new_session(&app).await;
        call(
            &app,
            "POST",
            &format!("/sessions/{id}/symptoms/text"),
            Some(json!({ "text": "fever and a dry cough" })),
        )
        .await;

        // A request that began analysis and was then cancelled drops its ticket.
        let uuid = triage_uuid::UuidService::parse(&id).unwrap();
        let session = state.sessions.get(&uuid).await.unwrap();
        let ticket = session.lock().await.begin_analysis().unwrap();
        let (_, view) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(view["analysisInFlight"], true);
        drop(ticket);

        let (_, view) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(view["analysisInFlight"], false);
        let (status, body) = call(
            &app,
            "POST",
            &format!("/sessions/{id}/answer"),
            Some(json!({ "optionId": "q1_neurological" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentQuestion"]["id"], "q8");
    }

    #[tokio::test]
    async fn test_report_ids_increase_across_sessions() {
        let app = app();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = new_session(&app).await;
            call(
                &app,
                "POST",
                &format!("/sessions/{id}/symptoms/text"),
                Some(json!({ "text": "a dry cough" })),
            )
            .await;
            call(&app, "POST", &format!("/sessions/{id}/analysis"), None).await;
            let (status, report) =
                call(&app, "POST", &format!("/sessions/{id}/report"), None).await;
            assert_eq!(status, StatusCode::OK);
            let id: triage_uuid::TimestampUuid = report["id"].as_str().unwrap().parse().unwrap();
            ids.push(id);
        }

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_session_limit_returns_service_unavailable() {
        let cfg = config().with_session_limits(SessionLimits {
            max_sessions: 1,
            ..SessionLimits::default()
        });
        let app = router(AppState::new(cfg));
        let id = new_session(&app).await;

        let (status, body) = call(&app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());

        call(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        new_session(&app).await;
    }

    #[test]
    fn test_openapi_lists_session_paths() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/sessions/{id}/analysis"));
        assert!(doc.paths.paths.contains_key("/sessions/{id}/symptoms"));
        assert!(doc
            .paths
            .paths
            .contains_key("/sessions/{id}/symptoms/{symptom_id}"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
