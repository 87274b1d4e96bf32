//! Completion client for the hosted LLM.
//!
//! [`CompletionClient`] is the seam the assistant talks through;
//! [`AnthropicClient`] implements it over the Messages API.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use regassist_shared::{AppConfig, RegAssistError, Result, resolve_api_key};

/// API version header sent with every request.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("regassist/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request, borrowing the prompt and history from the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: &'a str,
    pub messages: &'a [Message],
}

/// The model's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Anything that can turn a request into a completion.
pub trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> impl Future<Output = Result<Completion>> + Send;

    /// Like [`complete`](Self::complete), handing each piece of text to
    /// `on_text` as it arrives. The returned completion holds the full text.
    ///
    /// The default delivers the whole reply as a single piece.
    fn complete_streaming<F>(
        &self,
        request: &CompletionRequest<'_>,
        mut on_text: F,
    ) -> impl Future<Output = Result<Completion>> + Send
    where
        F: FnMut(&str) + Send,
    {
        async move {
            let completion = self.complete(request).await?;
            on_text(&completion.text);
            Ok(completion)
        }
    }
}

// ---------------------------------------------------------------------------
// Anthropic Messages API
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Request body with the `stream` flag set.
#[derive(Debug, Serialize)]
struct StreamingBody<'a> {
    #[serde(flatten)]
    request: &'a CompletionRequest<'a>,
    stream: bool,
}

/// Server-sent events of a streamed Messages API response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: StreamStart,
    },
    ContentBlockDelta {
        delta: Delta,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<Usage>,
    },
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamStart {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RegAssistError::Completion(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from the `[anthropic]` config section and the API key env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        Self::new(
            api_key,
            &config.anthropic.base_url,
            Duration::from_secs(config.anthropic.timeout_secs),
        )
    }

    /// POST to the Messages endpoint and fail on a non-2xx status.
    async fn send(&self, body: &impl Serialize) -> Result<reqwest::Response> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| RegAssistError::Completion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| format!("{}: {}", env.error.kind, env.error.message))
                .unwrap_or(body);
            return Err(RegAssistError::Completion(format!(
                "API returned HTTP {status}: {detail}"
            )));
        }

        Ok(response)
    }
}

impl CompletionClient for AnthropicClient {
    #[instrument(skip_all, fields(model = request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let response = self.send(request).await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RegAssistError::Completion(format!("unexpected response body: {e}")))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            return Err(RegAssistError::Completion("model returned no text".into()));
        }

        let usage = parsed.usage.unwrap_or_default();
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "completion received"
        );

        Ok(Completion {
            text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }

    #[instrument(skip_all, fields(model = request.model, messages = request.messages.len()))]
    async fn complete_streaming<F>(
        &self,
        request: &CompletionRequest<'_>,
        mut on_text: F,
    ) -> Result<Completion>
    where
        F: FnMut(&str) + Send,
    {
        let body = StreamingBody {
            request,
            stream: true,
        };
        let response = self.send(&body).await?;

        let mut events = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut text = String::new();
        let mut usage = Usage::default();

        while let Some(chunk) = events.next().await {
            let chunk =
                chunk.map_err(|e| RegAssistError::Completion(format!("stream interrupted: {e}")))?;
            buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

            while let Some(block) = next_event_block(&mut buffer) {
                let Some(data) = event_data(&block) else {
                    continue;
                };
                let event: StreamEvent = serde_json::from_str(&data).map_err(|e| {
                    RegAssistError::Completion(format!("unexpected stream event: {e}"))
                })?;

                match event {
                    StreamEvent::MessageStart { message } => {
                        if let Some(start) = message.usage {
                            usage.input_tokens = start.input_tokens;
                        }
                    }
                    StreamEvent::ContentBlockDelta {
                        delta: Delta::TextDelta { text: piece },
                    } => {
                        on_text(&piece);
                        text.push_str(&piece);
                    }
                    StreamEvent::MessageDelta { usage: Some(delta) } => {
                        usage.output_tokens = delta.output_tokens;
                    }
                    StreamEvent::Error { error } => {
                        return Err(RegAssistError::Completion(format!(
                            "stream error: {}: {}",
                            error.kind, error.message
                        )));
                    }
                    _ => {}
                }
            }
        }

        if text.is_empty() {
            return Err(RegAssistError::Completion("model returned no text".into()));
        }

        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "streamed completion received"
        );

        Ok(Completion {
            text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}

/// Remove and return the next complete event (terminated by a blank line).
fn next_event_block(buffer: &mut Vec<u8>) -> Option<String> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let block: Vec<u8> = buffer.drain(..end + 2).collect();
    Some(String::from_utf8_lossy(&block[..end]).into_owned())
}

/// Joined `data:` lines of one event, if it has any.
fn event_data(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}
