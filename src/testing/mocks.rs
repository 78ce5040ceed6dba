//! Mock implementations for testing
//!
//! Scripted LLM and search providers, a recording progress sink and
//! in-memory artifact stores, so the whole pipeline can run without network
//! or filesystem access.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::output::{ArtifactLocation, ArtifactStore, PersistenceError};
use crate::pipeline::stage::Stage;
use crate::progress::{ProgressEvent, ProgressKind, ProgressSink};
use crate::search::{SearchError, SearchHit, SearchProvider};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One scripted answer for a stage
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(LlmError),
    /// Never completes; for timeout and cancellation tests
    Hang,
}

/// A request seen by [`ScriptedLlmProvider`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub stage: Option<Stage>,
    pub system: String,
    pub prompt: String,
    pub model: String,
}

/// LLM provider answering from per-stage queues
///
/// The stage comes from the request's `stage` metadata. Replies are consumed
/// in order and the last one repeats once its queue is down to one entry.
/// A stage with no script answers `"<stage> output"`.
#[derive(Debug, Default)]
pub struct ScriptedLlmProvider {
    scripts: Mutex<HashMap<Stage, VecDeque<ScriptedReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, stage: Stage, reply: ScriptedReply) -> Self {
        self.scripts
            .get_mut()
            .entry(stage)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_reply(self, stage: Stage, text: impl Into<String>) -> Self {
        self.push(stage, ScriptedReply::Text(text.into()))
    }

    pub fn with_replies<I, S>(self, stage: Stage, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .fold(self, |provider, text| provider.with_reply(stage, text))
    }

    pub fn with_failure(self, stage: Stage, error: LlmError) -> Self {
        self.push(stage, ScriptedReply::Fail(error))
    }

    pub fn with_hang(self, stage: Stage) -> Self {
        self.push(stage, ScriptedReply::Hang)
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_for(&self, stage: Stage) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.stage == Some(stage))
            .count()
    }

    /// Stages in the order they were called
    pub async fn stage_sequence(&self) -> Vec<Stage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| call.stage)
            .collect()
    }

    async fn next_reply(&self, stage: Option<Stage>) -> ScriptedReply {
        let Some(stage) = stage else {
            return ScriptedReply::Text("Mock response".to_string());
        };

        let mut scripts = self.scripts.lock().await;
        match scripts.get_mut(&stage) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| ScriptedReply::Text(format!("{stage} output"))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedReply::Text(format!("{stage} output"))),
            None => ScriptedReply::Text(format!("{stage} output")),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let stage = request
            .metadata
            .get("stage")
            .and_then(|name| name.parse::<Stage>().ok());

        self.calls.lock().await.push(RecordedCall {
            stage,
            system: request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            prompt: request.prompt().to_string(),
            model: request.model.clone(),
        });

        let content = match self.next_reply(stage).await {
            ScriptedReply::Text(text) => text,
            ScriptedReply::Fail(error) => return Err(error),
            ScriptedReply::Hang => std::future::pending().await,
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: request.model,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            metadata: HashMap::new(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Search provider returning canned hits for every query
#[derive(Debug, Default)]
pub struct MockSearchProvider {
    pub hits: Vec<SearchHit>,
    pub should_fail: bool,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl MockSearchProvider {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn get_queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().await.push(query.to_string());
        if self.should_fail {
            return Err(SearchError::Api {
                status: 500,
                message: "Mock search failure".to_string(),
            });
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

/// Progress sink that keeps every event
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().await.clone()
    }

    pub async fn kinds(&self) -> Vec<ProgressKind> {
        self.events
            .lock()
            .await
            .iter()
            .map(|event| event.kind.clone())
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn emit(&self, event: ProgressEvent) {
        self.events.lock().await.push(event);
    }
}

/// Artifact store that keeps saved content in memory
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    saved: Arc<Mutex<Vec<String>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn saved(&self) -> Vec<String> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save(&self, content: &str) -> Result<ArtifactLocation, PersistenceError> {
        let mut saved = self.saved.lock().await;
        saved.push(content.to_string());
        Ok(ArtifactLocation(format!("memory://artifact/{}", saved.len())))
    }
}

/// Artifact store whose saves always fail
#[derive(Debug, Default)]
pub struct FailingArtifactStore;

#[async_trait]
impl ArtifactStore for FailingArtifactStore {
    async fn save(&self, _content: &str) -> Result<ArtifactLocation, PersistenceError> {
        Err(PersistenceError::Unavailable(
            "Mock store rejects every save".to_string(),
        ))
    }
}
