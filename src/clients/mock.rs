use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::{LowLevelClient, ModelRequest, TextStream};
use crate::error::AIError;

/// A scripted model response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Deliver these chunks in order, then end the stream.
    Chunks(Vec<String>),
    /// Deliver these chunks, then fail with the given message.
    FailAfter { chunks: Vec<String>, error: String },
    /// Deliver these chunks, pausing before each one.
    Delayed { chunks: Vec<String>, delay: Duration },
    /// Deliver these chunks, then never yield again.
    Stall(Vec<String>),
    /// Refuse the request before any streaming starts.
    Error(String),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Chunks(vec![text.into()])
    }

    /// Split `text` into pieces of at most `size` bytes (on char boundaries).
    pub fn chunked(text: &str, size: usize) -> Self {
        Self::Chunks(split_chunks(text, size))
    }
}

/// Split text into chunks of at most `size` bytes without breaking characters.
pub fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.len() + c.len_utf8() > size && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Shared control surface for a [`MockClient`]: queue responses and inspect
/// the requests that were made.
#[derive(Debug, Default)]
pub struct MockHandle {
    stream_responses: Mutex<VecDeque<MockResponse>>,
    ask_responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockHandle {
    /// Queue a response for the next streaming request.
    pub fn push_stream(&self, response: MockResponse) {
        self.stream_responses.lock().unwrap_or_else(|e| e.into_inner()).push_back(response);
    }

    /// Queue a response for the next one-shot request.
    pub fn push_ask(&self, response: MockResponse) {
        self.ask_responses.lock().unwrap_or_else(|e| e.into_inner()).push_back(response);
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, request: ModelRequest) {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);
    }

    fn next(queue: &Mutex<VecDeque<MockResponse>>) -> Result<MockResponse, AIError> {
        queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| AIError::Mock("no mock response queued".to_string()))
    }
}

/// Mock client for tests that replays scripted responses.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, request: ModelRequest) -> Result<String, AIError> {
        self.handle.record(request);
        match MockHandle::next(&self.handle.ask_responses)? {
            MockResponse::Chunks(chunks)
            | MockResponse::Delayed { chunks, .. }
            | MockResponse::Stall(chunks) => Ok(chunks.concat()),
            MockResponse::FailAfter { error, .. } | MockResponse::Error(error) => Err(AIError::Mock(error)),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    async fn stream_raw(&self, request: ModelRequest) -> Result<TextStream, AIError> {
        self.handle.record(request);
        let response = match MockHandle::next(&self.handle.stream_responses)? {
            MockResponse::Error(error) => return Err(AIError::Mock(error)),
            other => other,
        };

        let s = async_stream::stream! {
            match response {
                MockResponse::Chunks(chunks) => {
                    for chunk in chunks { yield Ok(chunk); }
                }
                MockResponse::FailAfter { chunks, error } => {
                    for chunk in chunks { yield Ok(chunk); }
                    yield Err(AIError::Mock(error));
                }
                MockResponse::Delayed { chunks, delay } => {
                    for chunk in chunks {
                        tokio::time::sleep(delay).await;
                        yield Ok(chunk);
                    }
                }
                MockResponse::Stall(chunks) => {
                    for chunk in chunks { yield Ok(chunk); }
                    std::future::pending::<()>().await;
                }
                MockResponse::Error(_) => {}
            }
        };
        Ok(Box::pin(s))
    }
}
