//! HTTP handlers.
//!
//! Handlers are thin: they look the session up, lock it, call one engine operation and convert
//! the outcome to a DTO.

use crate::error::ApiError;
use crate::AppState;
use api_shared::{
    AnalysisRes, AnswerReq, ErrorRes, HealthRes, HealthService, IngestTextReq, IngestTextRes,
    QuestionDto, QuestionsRes, ReportReq, ReportRes, SessionRes, SymptomChangeRes, SymptomDto,
    ToggleModelRes,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
};
use triage_core::PatientInfo;
use triage_uuid::UuidService;

use crate::store::SharedSession;

type ApiResult<T> = Result<T, ApiError>;

async fn find_session(state: &AppState, id: &str) -> ApiResult<(UuidService, SharedSession)> {
    let uuid = UuidService::parse(id)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid session id"))?;
    let session = state
        .sessions
        .get(&uuid)
        .await
        .ok_or_else(|| ApiError::session_not_found(id))?;
    Ok((uuid, session))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/questions",
    responses(
        (status = 200, description = "The question graph in declaration order", body = QuestionsRes)
    )
)]
#[axum::debug_handler]
pub async fn list_questions(State(state): State<AppState>) -> Json<QuestionsRes> {
    let questions = state
        .cfg
        .question_graph()
        .nodes()
        .iter()
        .map(QuestionDto::from)
        .collect();
    Json(QuestionsRes { questions })
}

#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session started on the first question", body = SessionRes),
        (status = 503, description = "Session limit reached", body = ErrorRes)
    )
)]
/// Start a new questionnaire session.
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SessionRes>)> {
    let (id, session) = state
        .sessions
        .insert(state.cfg.start_session())
        .await
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Too many active sessions, try again later",
            )
        })?;
    tracing::info!(session = %id, "session started");

    let session = session.lock().await;
    Ok((
        StatusCode::CREATED,
        Json(SessionRes::from_session(id.to_string(), &session)),
    ))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current session view", body = SessionRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<SessionRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(SessionRes::from_session(id, &session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/answer",
    params(("id" = String, Path, description = "Session id")),
    request_body = AnswerReq,
    responses(
        (status = 200, description = "Answer recorded", body = SessionRes),
        (status = 400, description = "Option not on the current question, or session complete", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Analysis in progress", body = ErrorRes),
        (status = 422, description = "Completion with no symptoms reported", body = ErrorRes)
    )
)]
/// Answer the current question.
#[axum::debug_handler]
pub async fn answer(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<AnswerReq>,
) -> ApiResult<Json<SessionRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    session.answer(&req.option_id)?;
    Ok(Json(SessionRes::from_session(id, &session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/back",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Last answer undone", body = SessionRes),
        (status = 400, description = "Nothing to undo, or session complete", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Analysis in progress", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn back(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<SessionRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    session.back()?;
    Ok(Json(SessionRes::from_session(id, &session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/restart",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session reset to the first question", body = SessionRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn restart(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<SessionRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    session.restart();
    Ok(Json(SessionRes::from_session(id, &session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/models/{model_id}",
    params(
        ("id" = String, Path, description = "Session id"),
        ("model_id" = String, Path, description = "Catalog model id")
    ),
    responses(
        (status = 200, description = "Model selection toggled", body = ToggleModelRes),
        (status = 400, description = "Unknown model", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn toggle_model(
    State(state): State<AppState>,
    AxumPath((id, model_id)): AxumPath<(String, String)>,
) -> ApiResult<Json<ToggleModelRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    let selected = session.toggle_model(&model_id)?;
    Ok(Json(ToggleModelRes {
        model_id,
        selected,
        selected_models: session.selected_models().to_vec(),
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/symptoms/text",
    params(("id" = String, Path, description = "Session id")),
    request_body = IngestTextReq,
    responses(
        (status = 200, description = "Symptoms recognised in the text", body = IngestTextRes),
        (status = 400, description = "Session complete", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Analysis in progress", body = ErrorRes)
    )
)]
/// Add symptoms named in free text.
#[axum::debug_handler]
pub async fn ingest_text(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<IngestTextReq>,
) -> ApiResult<Json<IngestTextRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    let added = session.ingest_text(&req.text)?;
    Ok(Json(IngestTextRes::new(&added, session.symptoms())))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/symptoms",
    params(("id" = String, Path, description = "Session id")),
    request_body = SymptomDto,
    responses(
        (status = 200, description = "Symptom added, or already present", body = SymptomChangeRes),
        (status = 400, description = "Invalid symptom, or session complete", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Analysis in progress", body = ErrorRes)
    )
)]
/// Add one symptom directly, without answering a question.
#[axum::debug_handler]
pub async fn add_symptom(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SymptomDto>,
) -> ApiResult<Json<SymptomChangeRes>> {
    let symptom = req.into_symptom()?;
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    let added = session.add_symptom(symptom)?;
    Ok(Json(SymptomChangeRes::new(added, session.symptoms())))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}/symptoms/{symptom_id}",
    params(
        ("id" = String, Path, description = "Session id"),
        ("symptom_id" = String, Path, description = "Symptom id")
    ),
    responses(
        (status = 200, description = "Symptom removed, or was not present", body = SymptomChangeRes),
        (status = 400, description = "Session complete", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Analysis in progress", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn remove_symptom(
    State(state): State<AppState>,
    AxumPath((id, symptom_id)): AxumPath<(String, String)>,
) -> ApiResult<Json<SymptomChangeRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let mut session = session.lock().await;
    let removed = session.remove_symptom(&symptom_id)?;
    Ok(Json(SymptomChangeRes::new(
        removed.is_some(),
        session.symptoms(),
    )))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/analysis",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Diagnosis result", body = AnalysisRes),
        (status = 404, description = "Unknown session", body = ErrorRes),
        (status = 409, description = "Analysis already in progress, or session restarted meanwhile", body = ErrorRes),
        (status = 422, description = "No symptoms reported", body = ErrorRes)
    )
)]
/// Score the session's symptoms.
///
/// Scoring runs on the blocking pool with the session unlocked; a restart issued meanwhile
/// invalidates the result. A completed session returns its stored result. If the client
/// disconnects, the dropped outcome releases the session once the blocking task finishes.
#[axum::debug_handler]
pub async fn run_analysis(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<AnalysisRes>> {
    let (_, session) = find_session(&state, &id).await?;

    let ticket = {
        let mut guard = session.lock().await;
        if let Some(result) = guard.result() {
            return Ok(Json(AnalysisRes::new(result, guard.analysis_details())));
        }
        guard.begin_analysis()?
    };
    let generation = ticket.generation();

    let outcome = tokio::task::spawn_blocking(move || ticket.run()).await;

    let mut guard = session.lock().await;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Analysis task failed: {:?}", e);
            guard.abandon_analysis(generation);
            return Err(ApiError::internal());
        }
    };
    let result = guard.complete_analysis(outcome)?;
    Ok(Json(AnalysisRes::new(&result, guard.analysis_details())))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/report",
    params(("id" = String, Path, description = "Session id")),
    request_body = ReportReq,
    responses(
        (status = 200, description = "Report for the completed session", body = ReportRes),
        (status = 400, description = "Session not analysed yet", body = ErrorRes),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_report(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    req: Option<Json<ReportReq>>,
) -> ApiResult<Json<ReportRes>> {
    let (_, session) = find_session(&state, &id).await?;
    let session = session.lock().await;

    let patient = req.and_then(|Json(req)| req.patient).map(PatientInfo::from);
    let report = state
        .reports
        .lock()
        .await
        .build_for_session_with_patient(&session, patient)?;
    tracing::info!(session = %id, report = %report.id(), "report built");
    Ok(Json(ReportRes::from(&report)))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Unknown session", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<StatusCode> {
    let (uuid, _) = find_session(&state, &id).await?;
    state.sessions.remove(&uuid).await;
    tracing::info!(session = %id, "session discarded");
    Ok(StatusCode::NO_CONTENT)
}
