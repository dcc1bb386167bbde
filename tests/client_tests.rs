
use std::sync::Arc;
use std::time::Duration;

use pdf_quiz::client::QuizClient;
use pdf_quiz::clients::mock::{split_chunks, MockHandle, MockResponse};
use pdf_quiz::composer::{QuizRequestComposer, SelectedFile, SelectionSource, PDF_MIME_TYPE};
use pdf_quiz::quiz::QuestionCount;
use pdf_quiz::renderer::{QuizRenderer, RenderState, FAILURE_NOTICE};
use pdf_quiz::server::{app, AppState};
use pdf_quiz::session::QuizSession;
use test_utils::*;

/// Serve the app on an ephemeral port and return its base URL.
async fn spawn_server() -> (String, Arc<MockHandle>) {
    let (generator, handle) = boxed_mock_generator(Duration::from_secs(5));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(AppState::new(generator))).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

fn composer_for(name: &str, count: u32) -> QuizRequestComposer {
    composer_with(SelectedFile::new(name, PDF_MIME_TYPE, pdf_bytes()), count)
}

fn composer_with(file: SelectedFile, count: u32) -> QuizRequestComposer {
    let mut composer = QuizRequestComposer::new();
    composer.set_question_count(QuestionCount::new(count).unwrap());
    composer.select(vec![file], SelectionSource::Picker);
    composer
}

#[tokio::test]
async fn syllabus_quiz_streams_to_completion_with_title() {
    let (base_url, handle) = spawn_server().await;
    handle.push_ask(MockResponse::text(r#"{"title": "Course Syllabus"}"#));
    handle.push_stream(MockResponse::Delayed {
        chunks: split_chunks(&quiz_json(5), 64),
        delay: Duration::from_millis(60),
    });

    let client = QuizClient::new(base_url);
    let mut bytes = pdf_bytes();
    bytes.resize(2 * 1024 * 1024, b' ');
    let mut composer = composer_with(SelectedFile::new("syllabus.pdf", PDF_MIME_TYPE, bytes), 5);
    let mut renderer = QuizRenderer::new();
    let mut percents = Vec::new();

    let quiz = client
        .generate(&mut composer, &mut renderer, |state| {
            if let RenderState::Generating(progress) = state {
                percents.push(progress.percent());
            }
        })
        .await
        .expect("quiz should complete");

    assert_eq!(quiz.title, "Course Syllabus");
    assert_eq!(quiz.questions, sample_questions(5));
    assert!(renderer.is_finished());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert!(percents.iter().all(|p| *p < 100.0));
    assert_eq!(composer.files().len(), 1);

    let mut session = QuizSession::new(quiz);
    for question in sample_questions(5) {
        session.select_answer(question.answer);
        session.next();
    }
    assert!(session.submit());
    assert_eq!(session.score(), 5);
}

#[tokio::test]
async fn failed_title_falls_back_to_default() {
    let (base_url, handle) = spawn_server().await;
    handle.push_ask(MockResponse::Error("no title today".to_string()));
    handle.push_stream(MockResponse::chunked(&quiz_json(3), 32));

    let client = QuizClient::new(base_url);
    let mut composer = composer_for("12345.pdf", 3);
    let mut renderer = QuizRenderer::new();

    let quiz = client.generate(&mut composer, &mut renderer, |_| {}).await.unwrap();
    assert_eq!(quiz.title, "Quiz");
    assert_eq!(quiz.questions.len(), 3);
}

#[tokio::test]
async fn failure_after_two_questions_rolls_back() {
    let (base_url, handle) = spawn_server().await;
    handle.push_ask(MockResponse::text(r#"{"title": "Notes"}"#));
    let body = quiz_json(5);
    let cut = body.match_indices("},").nth(1).unwrap().0 + 1;
    handle.push_stream(MockResponse::FailAfter {
        chunks: split_chunks(&body[..cut], 50),
        error: "model disconnected".to_string(),
    });

    let client = QuizClient::new(base_url);
    let mut composer = composer_for("notes.pdf", 5);
    let mut renderer = QuizRenderer::new();
    let mut best = 0.0f64;

    let quiz = client
        .generate(&mut composer, &mut renderer, |state| {
            if let RenderState::Generating(progress) = state {
                best = best.max(progress.percent());
            }
        })
        .await;

    assert!(quiz.is_none());
    assert!(best <= 40.0, "progress reached {best}");
    assert_eq!(renderer.state(), &RenderState::Idle);
    assert_eq!(renderer.notice(), Some(FAILURE_NOTICE));
    assert!(!composer.can_submit());
}

#[tokio::test]
async fn rejected_request_resets_renderer() {
    let (base_url, handle) = spawn_server().await;
    handle.push_ask(MockResponse::text(r#"{"title": "X"}"#));
    handle.push_stream(MockResponse::Error("overloaded".to_string()));

    let client = QuizClient::new(base_url);
    let mut composer = composer_for("x.pdf", 4);
    let mut renderer = QuizRenderer::new();

    assert!(client.generate(&mut composer, &mut renderer, |_| {}).await.is_none());
    assert_eq!(renderer.notice(), Some(FAILURE_NOTICE));
}

#[tokio::test]
async fn empty_composer_submits_nothing() {
    let (base_url, handle) = spawn_server().await;
    let client = QuizClient::new(base_url);
    let mut composer = QuizRequestComposer::new();
    let mut renderer = QuizRenderer::new();

    assert!(client.generate(&mut composer, &mut renderer, |_| {}).await.is_none());
    assert_eq!(renderer.state(), &RenderState::Idle);
    assert_eq!(renderer.notice(), None);
    assert!(handle.requests().is_empty());
}

#[tokio::test]
async fn title_endpoint_round_trip() {
    let (base_url, handle) = spawn_server().await;
    handle.push_ask(MockResponse::text(r#"{"title": "Linear Algebra Review Sheet"}"#));
    let client = QuizClient::new(format!("{base_url}/"));
    let title = client.generate_title("linalg_review.pdf").await.unwrap();
    assert_eq!(title, "Linear Algebra Review");
}
