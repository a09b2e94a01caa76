//! HTTP implementation of [`ChatGateway`] for OpenAI-compatible endpoints.
//!
//! The endpoint may answer with a single JSON completion or with a
//! server-sent event stream, regardless of what was requested. Both shapes are
//! read into a [`CompletionBody`] and flattened into one reply string here, so
//! nothing outside this module sees the difference.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memchr;
use tracing::{debug, warn};

use crate::api::{ChatCompletion, ChatMessage, ChatRequest, ChatResponseChunk};
use crate::core::gateway::{ChatGateway, GatewayError, GenerationParams};
use crate::core::message::Message;
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

#[derive(Debug, Clone, PartialEq)]
enum StreamEvent {
    Delta(String),
    Done,
    Failed(String),
    Dropped(String),
}

#[derive(Debug)]
enum CompletionBody {
    Complete(ChatCompletion),
    Stream(Vec<StreamEvent>),
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Interpret one SSE line. Lines without a `data:` field yield nothing.
fn parse_sse_line(line: &str) -> Option<StreamEvent> {
    let payload = extract_data_payload(line.trim())?;
    if payload == "[DONE]" {
        return Some(StreamEvent::Done);
    }
    if payload.trim().is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => return Some(StreamEvent::Dropped(payload.to_string())),
    };
    if value.get("error").is_some() {
        return Some(StreamEvent::Failed(format_api_error(payload)));
    }

    match serde_json::from_value::<ChatResponseChunk>(value) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default();
            Some(StreamEvent::Delta(content))
        }
        Err(_) => Some(StreamEvent::Dropped(payload.to_string())),
    }
}

/// Split buffered bytes into complete lines, leaving any partial tail behind.
fn drain_lines(buffer: &mut Vec<u8>, events: &mut Vec<StreamEvent>) -> bool {
    while let Some(newline_pos) = memchr(b'\n', buffer) {
        let event = match std::str::from_utf8(&buffer[..newline_pos]) {
            Ok(line) => parse_sse_line(line),
            Err(err) => Some(StreamEvent::Dropped(format!("invalid UTF-8: {err}"))),
        };
        buffer.drain(..=newline_pos);
        if let Some(event) = event {
            let done = event == StreamEvent::Done;
            events.push(event);
            if done {
                return true;
            }
        }
    }
    false
}

/// Parse a complete SSE body.
#[cfg(test)]
fn parse_sse_body(body: &str) -> Vec<StreamEvent> {
    let mut buffer = body.as_bytes().to_vec();
    buffer.push(b'\n');
    let mut events = Vec::new();
    drain_lines(&mut buffer, &mut events);
    events
}

fn flatten(body: CompletionBody, status: u16) -> Result<String, GatewayError> {
    match body {
        CompletionBody::Complete(completion) => completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(GatewayError::EmptyResponse),
        CompletionBody::Stream(events) => {
            let mut text = String::new();
            let mut dropped = 0usize;
            for event in events {
                match event {
                    StreamEvent::Delta(delta) => text.push_str(&delta),
                    StreamEvent::Done => break,
                    StreamEvent::Failed(detail) => {
                        return Err(GatewayError::Api { status, detail });
                    }
                    StreamEvent::Dropped(payload) => {
                        dropped += 1;
                        warn!(%payload, "dropping malformed stream chunk");
                    }
                }
            }
            if text.is_empty() {
                debug!(dropped, "stream produced no content");
                return Err(GatewayError::EmptyResponse);
            }
            Ok(text)
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Reduce an error body to something printable on one line when possible.
fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
        return json_value.to_string();
    }

    trimmed.to_string()
}

/// Talks to `{base_url}/chat/completions` with a bearer key read from the
/// environment at call time.
pub struct HttpChatGateway {
    client: reqwest::Client,
    base_url: String,
    api_key_env: String,
    stream: bool,
}

impl HttpChatGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
        stream: bool,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            stream,
        })
    }

    fn api_key(&self) -> Result<String, GatewayError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GatewayError::MissingCredentials(self.api_key_env.clone()))
    }

    async fn read_body(response: reqwest::Response) -> Result<CompletionBody, GatewayError> {
        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if !is_event_stream {
            let text = response
                .text()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            let completion = serde_json::from_str::<ChatCompletion>(&text)
                .map_err(|e| GatewayError::Malformed(e.to_string()))?;
            return Ok(CompletionBody::Complete(completion));
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut events = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| GatewayError::Transport(e.to_string()))?;
            buffer.extend_from_slice(&chunk);
            if drain_lines(&mut buffer, &mut events) {
                return Ok(CompletionBody::Stream(events));
            }
        }
        if !buffer.is_empty() {
            buffer.push(b'\n');
            drain_lines(&mut buffer, &mut events);
        }
        Ok(CompletionBody::Stream(events))
    }
}

#[async_trait]
impl ChatGateway for HttpChatGateway {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<String, GatewayError> {
        let api_key = self.api_key()?;
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: self.stream,
        };

        let chat_url = construct_api_url(&self.base_url, "chat/completions");
        debug!(%chat_url, %model, messages = messages.len(), stream = self.stream, "sending chat request");

        let http_request = self
            .client
            .post(chat_url)
            .header("Content-Type", "application/json");
        let response = add_auth_headers(http_request, &api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                detail: format_api_error(&error_text),
            });
        }

        let body = Self::read_body(response).await?;
        flatten(body, status.as_u16())
    }
}
