use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::composer::max_request_size;
use crate::core::{LowLevelClient, QuizGenerator};
use crate::error::{AIError, ClaudeError, QuizError};
use crate::protocol::{ErrorResponse, GenerateQuizRequest, GenerateTitleRequest, HealthResponse, TitleResponse};
use crate::streaming::GenerationEvent;

/// Request bodies carry up to three base64 PDFs of up to 5 MiB each.
pub const BODY_LIMIT: usize = max_request_size();

/// Shared, immutable state of the HTTP surface.
#[derive(Debug)]
pub struct AppState {
    pub generator: QuizGenerator<Box<dyn LowLevelClient>>,
}

impl AppState {
    pub fn new(generator: QuizGenerator<Box<dyn LowLevelClient>>) -> Arc<Self> {
        Arc::new(Self { generator })
    }
}

/// Application-specific error types for the API
#[derive(Debug)]
pub struct AppError(pub QuizError);

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QuizError::Upload(_) | QuizError::Validation(_) | QuizError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QuizError::Ai(AIError::Claude(ClaudeError::RateLimit)) => StatusCode::TOO_MANY_REQUESTS,
            QuizError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            QuizError::Ai(_) | QuizError::MalformedOutput(_) | QuizError::Http(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, %status, "request failed");
        } else {
            warn!(error = %self.0, %status, "request rejected");
        }

        let error_response = ErrorResponse { error: self.0.to_string() };
        (status, Json(error_response)).into_response()
    }
}

/// Build the application router with all routes configured
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/generate-quiz", post(generate_quiz))
        .route("/api/generate-title", post(generate_title))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Stream a quiz for the first uploaded PDF.
///
/// Problems with the request are reported as JSON errors; once streaming has
/// begun, any failure aborts the body instead.
pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<Response, AppError> {
    let count = payload.question_count().map_err(QuizError::from)?;
    let document = payload.first_file().and_then(|f| f.decode()).map_err(QuizError::from)?;
    info!(document = %document.name, bytes = document.bytes.len(), %count, files = payload.files.len(), "generating quiz");

    let generation = state.generator.stream_quiz(&document, count).await?;

    let body = generation.filter_map(|event| {
        futures_util::future::ready(match event {
            Ok(GenerationEvent::Delta(text)) => Some(Ok(text)),
            Ok(GenerationEvent::Question { index, .. }) => {
                info!(index, "question streamed");
                None
            }
            Ok(GenerationEvent::Completed(questions)) => {
                info!(count = questions.len(), "quiz stream complete");
                None
            }
            Err(e) => {
                error!(error = %e, "aborting quiz stream");
                Some(Err(e))
            }
        })
    });

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

pub async fn generate_title(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateTitleRequest>,
) -> Result<Json<TitleResponse>, AppError> {
    if payload.file_name.trim().is_empty() {
        return Err(QuizError::InvalidRequest("fileName must not be empty".to_string()).into());
    }
    let title = state.generator.generate_title(&payload.file_name).await?;
    Ok(Json(TitleResponse { title }))
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "pdf-quiz".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
