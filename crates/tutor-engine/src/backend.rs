//! Generation backends.
//!
//! A [`GenerationBackend`] turns a [`GenerationRequest`] into a JSON object
//! of the requested [`Schema`]. The gateway holds an ordered list of them and
//! falls through on failure.
//!
//! - [`ChatCompletionsBackend`] talks to an OpenAI-compatible HTTP API, one
//!   instance per model.
//! - [`ScriptedBackend`] replays queued replies, for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::GenerationConfig;
use crate::error::{GenerationError, GenerationErrorKind};
use crate::generation::Schema;
use crate::prompt::GenerationRequest;

/// Something that can produce structured output for a prompt.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Produces a JSON object matching `schema`.
    async fn generate(
        &self,
        request: &GenerationRequest,
        schema: Schema,
    ) -> Result<Value, GenerationError>;
}

// ============================================================================
// ChatCompletionsBackend
// ============================================================================

/// A backend for one model behind an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ChatCompletionsBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl std::fmt::Debug for ChatCompletionsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsBackend {
    /// Creates a backend for `model` using the shared HTTP client.
    #[must_use]
    pub fn new(client: Client, config: &GenerationConfig, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            model: model.into(),
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    /// Builds one backend per configured model, in configured order.
    #[must_use]
    pub fn candidates(config: &GenerationConfig) -> Vec<Arc<dyn GenerationBackend>> {
        let client = Client::new();
        if config.api_key().is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key set; generation requests will likely be rejected"
            );
        }

        config
            .models
            .iter()
            .filter(|model| !model.trim().is_empty())
            .map(|model| {
                Arc::new(Self::new(client.clone(), config, model.as_str()))
                    as Arc<dyn GenerationBackend>
            })
            .collect()
    }

    fn transport_error(&self, err: &reqwest::Error) -> GenerationError {
        let kind = if err.is_timeout() {
            GenerationErrorKind::Timeout
        } else if err.is_decode() {
            GenerationErrorKind::MalformedOutput
        } else if let Some(status) = err.status() {
            GenerationErrorKind::from_status(status.as_u16())
        } else {
            GenerationErrorKind::Transport
        };
        GenerationError::new(&self.model, kind, err.to_string())
    }
}

#[async_trait]
impl GenerationBackend for ChatCompletionsBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        schema: Schema,
    ) -> Result<Value, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt(schema),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt(),
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut builder = self.client.post(url).json(&payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(
                &self.model,
                GenerationErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: {}", truncate(&body, 200)),
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::malformed(&self.model, "response had no content"))?;

        parse_object(&self.model, &content)
    }
}

/// Parses backend text into a JSON object.
fn parse_object(backend: &str, content: &str) -> Result<Value, GenerationError> {
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| GenerationError::malformed(backend, format!("not JSON: {e}")))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(GenerationError::malformed(
            backend,
            "expected a JSON object",
        ))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

// ============================================================================
// ScriptedBackend
// ============================================================================

/// One queued reply of a [`ScriptedBackend`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Answer with this JSON value.
    Value(Value),
    /// Fail with this kind of error.
    Fail(GenerationErrorKind),
    /// Wait, then answer with the value.
    Delayed(Duration, Value),
}

/// A backend that replays queued replies in order.
///
/// Each call to `generate` consumes one reply. An empty queue fails with
/// [`GenerationErrorKind::Other`].
#[derive(Debug)]
pub struct ScriptedBackend {
    name: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    /// Creates a backend with an empty queue.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a backend with the given replies queued.
    #[must_use]
    pub fn with_replies(
        name: impl Into<String>,
        replies: impl IntoIterator<Item = ScriptedReply>,
    ) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queues a successful reply.
    pub async fn queue_value(&self, value: Value) {
        self.replies.lock().await.push_back(ScriptedReply::Value(value));
    }

    /// Queues a failure.
    pub async fn queue_failure(&self, kind: GenerationErrorKind) {
        self.replies.lock().await.push_back(ScriptedReply::Fail(kind));
    }

    /// Number of replies still queued.
    pub async fn queued(&self) -> usize {
        self.replies.lock().await.len()
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of times `generate` was called.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        schema: Schema,
    ) -> Result<Value, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let reply = self.replies.lock().await.pop_front();
        match reply {
            Some(ScriptedReply::Value(value)) => Ok(value),
            Some(ScriptedReply::Fail(kind)) => Err(GenerationError::new(
                &self.name,
                kind,
                format!("scripted {kind} failure for {schema}"),
            )),
            Some(ScriptedReply::Delayed(delay, value)) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            None => Err(GenerationError::new(
                &self.name,
                GenerationErrorKind::Other,
                format!("no scripted reply queued for {schema}"),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::TutorMode;
    use crate::generation::Understanding;

    fn request() -> GenerationRequest {
        GenerationRequest {
            exercise_title: "Test".to_string(),
            tutor_mode: TutorMode::Socratic,
            checkpoint: 1,
            step: 1,
            main_question: "Q".to_string(),
            main_answer: "A".to_string(),
            guiding_question: None,
            guiding_answer: None,
            understanding: Understanding::default(),
            history: Vec::new(),
            learner_input: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_backend_replays_in_order() {
        let backend = ScriptedBackend::with_replies(
            "script",
            [
                ScriptedReply::Value(json!({"feedback": "one"})),
                ScriptedReply::Fail(GenerationErrorKind::RateLimit),
            ],
        );

        let first = backend.generate(&request(), Schema::Feedback).await.unwrap();
        assert_eq!(first["feedback"], "one");

        let err = backend
            .generate(&request(), Schema::Feedback)
            .await
            .unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::RateLimit);
        assert!(err.is_transient());

        let err = backend
            .generate(&request(), Schema::Feedback)
            .await
            .unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::Other);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_backend_queue_helpers() {
        let backend = ScriptedBackend::new("script");
        backend.queue_value(json!({"instructions": "go on"})).await;
        backend.queue_failure(GenerationErrorKind::Server).await;
        assert_eq!(backend.queued().await, 2);
        assert_eq!(backend.name(), "script");
    }

    #[test]
    fn test_parse_object_accepts_objects_only() {
        assert!(parse_object("m", r#"{"feedback": "ok"}"#).is_ok());

        let err = parse_object("m", "[1, 2]").unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::MalformedOutput);

        let err = parse_object("m", "Sure! Here is your feedback").unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::MalformedOutput);
        assert_eq!(err.backend, "m");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn test_candidates_follow_model_order() {
        let config = GenerationConfig {
            models: vec!["first".to_string(), " ".to_string(), "second".to_string()],
            ..GenerationConfig::default()
        };
        let candidates = ChatCompletionsBackend::candidates(&config);
        let names: Vec<&str> = candidates.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_chat_request_serialization() {
        let payload = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            temperature: 0.5,
            top_p: 0.5,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
