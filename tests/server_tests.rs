
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::IntoResponse,
};
use http_body_util::BodyExt;
use pdf_quiz::clients::mock::{MockHandle, MockResponse};
use pdf_quiz::composer::{QuizRequestComposer, SelectedFile, SelectionSource, MAX_FILES, MAX_FILE_SIZE, PDF_MIME_TYPE};
use pdf_quiz::error::{AIError, ClaudeError, QuizError, ValidationError};
use pdf_quiz::protocol::{EncodedFile, ErrorResponse, HealthResponse, TitleResponse};
use pdf_quiz::quiz::Question;
use pdf_quiz::server::{app, AppError, AppState};
use serde_json::json;
use test_utils::*;
use tower::util::ServiceExt;

fn test_app() -> (axum::Router, Arc<MockHandle>) {
    let (generator, handle) = boxed_mock_generator(Duration::from_secs(5));
    (app(AppState::new(generator)), handle)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn quiz_body(files: Vec<EncodedFile>, count: Option<u32>) -> serde_json::Value {
    let mut body = json!({ "files": files });
    if let Some(count) = count {
        body["questionsLength"] = json!(count);
    }
    body
}

fn pdf_file(name: &str) -> EncodedFile {
    EncodedFile::encode(name, PDF_MIME_TYPE, &pdf_bytes())
}

async fn error_of(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    error.error
}

#[tokio::test]
async fn health_check_reports_ok() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.service, "pdf-quiz");
}

#[tokio::test]
async fn quiz_is_streamed_as_plain_text() {
    let (app, handle) = test_app();
    handle.push_stream(MockResponse::chunked(&fenced_quiz_json(5), 40));

    let response = app
        .oneshot(post_json("/api/generate-quiz", quiz_body(vec![pdf_file("syllabus.pdf")], Some(5))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let questions: Vec<Question> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(questions, sample_questions(5));
}

#[tokio::test]
async fn only_the_first_file_is_sent_to_the_model() {
    let (app, handle) = test_app();
    handle.push_stream(MockResponse::text(quiz_json(4)));

    let first = pdf_file("first.pdf");
    let second = EncodedFile::encode("second.pdf", PDF_MIME_TYPE, b"%PDF-1.7 other");
    let response = app
        .oneshot(post_json("/api/generate-quiz", quiz_body(vec![first, second], None)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.into_body().collect().await.unwrap();

    let requests = handle.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].system.as_deref().unwrap().contains("with 4 questions"));
    let documents = requests[0]
        .content
        .iter()
        .filter(|part| matches!(part, pdf_quiz::core::ContentPart::Document { .. }))
        .count();
    assert_eq!(documents, 1);
}

#[tokio::test]
async fn missing_files_are_rejected() {
    let (app, handle) = test_app();
    let response = app.oneshot(post_json("/api/generate-quiz", quiz_body(vec![], Some(4)))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_of(response).await.contains("No files"));
    assert!(handle.requests().is_empty());
}

#[tokio::test]
async fn unsupported_count_is_rejected() {
    let (app, handle) = test_app();
    let response = app
        .oneshot(post_json("/api/generate-quiz", quiz_body(vec![pdf_file("a.pdf")], Some(7))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_of(response).await.contains("questionsLength"));
    assert!(handle.requests().is_empty());
}

#[tokio::test]
async fn non_pdf_upload_is_rejected() {
    let (app, _) = test_app();
    let png = EncodedFile::encode("cat.png", "image/png", b"\x89PNG");
    let response = app.oneshot(post_json("/api/generate-quiz", quiz_body(vec![png], None))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_of(response).await.contains("not a PDF"));
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, _) = test_app();
    let big = EncodedFile::encode("big.pdf", PDF_MIME_TYPE, &vec![0u8; MAX_FILE_SIZE + 1]);
    let response = app.oneshot(post_json("/api/generate-quiz", quiz_body(vec![big], None))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn two_near_limit_pdfs_are_accepted() {
    let (app, handle) = test_app();
    handle.push_stream(MockResponse::text(quiz_json(4)));

    let mut composer = QuizRequestComposer::new();
    let files = ["a.pdf", "b.pdf"]
        .into_iter()
        .map(|name| {
            let mut bytes = pdf_bytes();
            bytes.resize(4 * 1024 * 1024, b' ');
            SelectedFile::new(name, PDF_MIME_TYPE, bytes)
        })
        .collect();
    assert!(composer.select(files, SelectionSource::Picker).is_none());
    assert!(composer.can_submit());

    let body = serde_json::to_value(composer.build_request().unwrap()).unwrap();
    let response = app.oneshot(post_json("/api/generate-quiz", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let questions: Vec<Question> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(questions.len(), 4);
}

#[tokio::test]
async fn too_many_files_are_rejected() {
    let (app, handle) = test_app();
    let files = (0..=MAX_FILES).map(|i| pdf_file(&format!("part-{i}.pdf"))).collect();
    let response = app.oneshot(post_json("/api/generate-quiz", quiz_body(files, None))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_of(response).await.contains("limit of 3 files"));
    assert!(handle.requests().is_empty());
}

#[tokio::test]
async fn refused_model_request_is_a_bad_gateway() {
    let (app, handle) = test_app();
    handle.push_stream(MockResponse::Error("overloaded".to_string()));
    let response = app
        .oneshot(post_json("/api/generate-quiz", quiz_body(vec![pdf_file("a.pdf")], None)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn mid_stream_failure_aborts_the_body() {
    let (app, handle) = test_app();
    let body = quiz_json(5);
    let cut = body.match_indices("},").nth(1).unwrap().0 + 1;
    handle.push_stream(MockResponse::FailAfter { chunks: vec![body[..cut].to_string()], error: "reset".into() });

    let response = app
        .oneshot(post_json("/api/generate-quiz", quiz_body(vec![pdf_file("a.pdf")], Some(5))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.into_body().collect().await.is_err());
}

#[tokio::test]
async fn title_endpoint_returns_generated_title() {
    let (app, handle) = test_app();
    handle.push_ask(MockResponse::text(r#"{"title":"Biology Syllabus"}"#));

    let response = app
        .oneshot(post_json("/api/generate-title", json!({ "fileName": "bio_syllabus.pdf" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let title: TitleResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(title.title, "Biology Syllabus");
}

#[tokio::test]
async fn title_endpoint_rejects_empty_name() {
    let (app, handle) = test_app();
    let response = app
        .oneshot(post_json("/api/generate-title", json!({ "fileName": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(handle.requests().is_empty());
}

#[test]
fn error_statuses() {
    let cases = [
        (QuizError::Validation(ValidationError::single("bad")), StatusCode::BAD_REQUEST),
        (QuizError::Ai(AIError::Claude(ClaudeError::RateLimit)), StatusCode::TOO_MANY_REQUESTS),
        (QuizError::Ai(AIError::Claude(ClaudeError::Api("boom".into()))), StatusCode::BAD_GATEWAY),
        (QuizError::Timeout(Duration::from_secs(60)), StatusCode::GATEWAY_TIMEOUT),
        (QuizError::MalformedOutput("no array".into()), StatusCode::BAD_GATEWAY),
    ];
    for (error, status) in cases {
        assert_eq!(AppError(error).into_response().status(), status);
    }
}
