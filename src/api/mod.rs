//! Wire types for the OpenAI-compatible chat completions endpoint.

use serde::{Deserialize, Serialize};

use crate::core::message::Message;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// One server-sent event payload of a streamed completion.
#[derive(Deserialize, Debug)]
pub struct ChatResponseChunk {
    #[serde(default)]
    pub choices: Vec<ChatResponseChunkChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponseChunkChoice {
    #[serde(default)]
    pub delta: ChatResponseDelta,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

/// A non-streamed completion.
#[derive(Deserialize, Debug)]
pub struct ChatCompletion {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}
