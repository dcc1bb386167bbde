//! HTTP client for the quiz server: streams a quiz into a [`QuizRenderer`]
//! while the title is fetched concurrently.

use crate::composer::QuizRequestComposer;
use crate::error::QuizError;
use crate::protocol::{ErrorResponse, GenerateQuizRequest, GenerateTitleRequest, TitleResponse};
use crate::renderer::{FinishedQuiz, QuizRenderer, RenderState};
use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct QuizClient {
    http: Client,
    base_url: String,
}

impl QuizClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: Client::new(), base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the server for a title derived from `file_name`.
    #[instrument(skip(self))]
    pub async fn generate_title(&self, file_name: &str) -> Result<String, QuizError> {
        let response = self
            .http
            .post(self.url("/api/generate-title"))
            .json(&GenerateTitleRequest { file_name: file_name.to_string() })
            .send()
            .await
            .map_err(|e| QuizError::Http(e.to_string()))?;

        let response = check_status(response).await?;
        let body: TitleResponse = response.json().await.map_err(|e| QuizError::Http(e.to_string()))?;
        Ok(body.title)
    }

    /// Open the quiz stream. Errors reported before the body starts are returned here.
    async fn open_quiz_stream(&self, request: &GenerateQuizRequest) -> Result<reqwest::Response, QuizError> {
        let response = self
            .http
            .post(self.url("/api/generate-quiz"))
            .json(request)
            .send()
            .await
            .map_err(|e| QuizError::Http(e.to_string()))?;
        check_status(response).await
    }

    /// Submit the composer's selection and render the quiz as it streams.
    ///
    /// The title request runs alongside the stream; whichever value it has
    /// published when the quiz completes is used, otherwise the default title.
    /// On any failure the renderer resets with a notice and the composer's
    /// selection is cleared.
    #[instrument(skip_all, fields(files = composer.files().len(), count = %composer.question_count()))]
    pub async fn generate<F>(
        &self,
        composer: &mut QuizRequestComposer,
        renderer: &mut QuizRenderer,
        mut on_update: F,
    ) -> Option<FinishedQuiz>
    where
        F: FnMut(&RenderState),
    {
        let request = match composer.build_request() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "nothing to submit");
                return None;
            }
        };

        renderer.begin(composer.question_count());
        on_update(renderer.state());

        let (title_tx, title_rx) = watch::channel::<Option<String>>(None);
        let title_task = composer.title_source().map(|name| {
            let client = self.clone();
            let name = name.to_string();
            tokio::spawn(async move {
                match client.generate_title(&name).await {
                    Ok(title) => {
                        let _ = title_tx.send(Some(title));
                    }
                    Err(e) => debug!(error = %e, "title generation failed, keeping default"),
                }
            })
        });

        let result = self.drive(&request, renderer, &title_rx, &mut on_update).await;

        if let Some(task) = title_task {
            task.abort();
        }

        match result {
            Ok(quiz) => {
                info!(title = %quiz.title, questions = quiz.questions.len(), "quiz ready");
                Some(quiz)
            }
            Err(e) => {
                warn!(error = %e, "quiz generation failed");
                renderer.fail();
                composer.clear();
                on_update(renderer.state());
                None
            }
        }
    }

    async fn drive<F>(
        &self,
        request: &GenerateQuizRequest,
        renderer: &mut QuizRenderer,
        title: &watch::Receiver<Option<String>>,
        on_update: &mut F,
    ) -> Result<FinishedQuiz, QuizError>
    where
        F: FnMut(&RenderState),
    {
        let response = self.open_quiz_stream(request).await?;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| QuizError::Http(e.to_string()))?;
            let latest_title = title.borrow().clone();
            if let Some(t) = latest_title {
                renderer.set_title(t);
            }
            renderer.push_bytes(&chunk);
            on_update(renderer.state());

            if let RenderState::Finished(quiz) = renderer.state() {
                return Ok(quiz.clone());
            }
            if matches!(renderer.state(), RenderState::Idle) {
                return Err(QuizError::MalformedOutput("response body is not valid UTF-8".to_string()));
            }
        }

        match renderer.end_of_stream() {
            RenderState::Finished(quiz) => Ok(quiz.clone()),
            _ => Err(QuizError::MalformedOutput("stream ended before the quiz was complete".to_string())),
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, QuizError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(QuizError::Http(format!("{status}: {message}")))
}
