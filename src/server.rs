use std::sync::Arc;

use anyhow::{Context, Error};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pcp_contest::{
    Contest, ContestTime, IntakeError, LogSink, QuestionRepresentation, RunRepresentation,
    SessionRef, SubmissionId, SubmissionRequest,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::opt::ServeOpt;

/// The header carrying the session of the request.
pub const SESSION_HEADER: &str = "X-Team";

/// Entry point of `pcp serve`: load the contest, start its clock and accept submissions until
/// Ctrl-C is pressed.
pub fn main_serve(opt: ServeOpt) -> Result<(), Error> {
    let contest = Contest::load(&opt.config, Arc::new(LogSink))
        .with_context(|| format!("Cannot load the contest at {}", opt.config.display()))?;
    contest.clock().start();
    let contest = Arc::new(contest);

    let runtime = tokio::runtime::Runtime::new().context("Cannot start the async runtime")?;
    runtime.block_on(serve(contest.clone(), &opt.address))?;
    drop(runtime);

    contest.close();
    match Arc::try_unwrap(contest) {
        Ok(contest) => contest.shutdown(),
        Err(_) => warn!("The contest is still referenced, the queued runs are dropped"),
    }
    Ok(())
}

async fn serve(contest: Arc<Contest>, address: &str) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Cannot bind the server on {}", address))?;
    info!("Accepting submissions on {}", address);
    axum::serve(listener, router(contest))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("The server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// The routes of the intake.
pub fn router(contest: Arc<Contest>) -> Router {
    Router::new()
        .route("/api/submit", post(submit))
        .route("/api/runs", get(runs))
        .route("/api/questions", get(questions))
        .route("/api/time", get(time))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(contest)
}

/// A request refused by the intake.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    /// The session header is missing or not valid text.
    MissingSession,
    /// The submission was rejected.
    Intake(IntakeError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// The HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingSession => StatusCode::UNAUTHORIZED,
            ApiError::Intake(IntakeError::NotStarted) => too_early(),
            ApiError::Intake(IntakeError::UnknownQuestion(_))
            | ApiError::Intake(IntakeError::InvalidFileName(_)) => StatusCode::BAD_REQUEST,
            ApiError::Intake(IntakeError::PipelineClosed) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// 425 Too Early.
fn too_early() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::FORBIDDEN)
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        ApiError::Intake(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match &self {
            ApiError::MissingSession => format!("Missing {} header", SESSION_HEADER),
            ApiError::Intake(e) => e.to_string(),
        };
        (self.status(), Json(ErrorBody { error })).into_response()
    }
}

/// The response to an accepted submission.
#[derive(Debug, Serialize)]
pub struct Submitted {
    /// The id of the submission.
    pub id: SubmissionId,
}

fn session_of(headers: &HeaderMap) -> Result<SessionRef, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|team| !team.is_empty())
        .map(|team| SessionRef(team.to_string()))
        .ok_or(ApiError::MissingSession)
}

async fn submit(
    State(contest): State<Arc<Contest>>,
    headers: HeaderMap,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<Submitted>, ApiError> {
    let session = session_of(&headers)?;
    let id = contest.submit(session, request)?;
    Ok(Json(Submitted { id }))
}

async fn runs(
    State(contest): State<Arc<Contest>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RunRepresentation>>, ApiError> {
    let session = session_of(&headers)?;
    Ok(Json(contest.runs_of(&session)))
}

async fn questions(State(contest): State<Arc<Contest>>) -> Json<Vec<QuestionRepresentation>> {
    Json(contest.questions().representations())
}

async fn time(State(contest): State<Arc<Contest>>) -> Json<ContestTime> {
    Json(contest.clock().now())
}
