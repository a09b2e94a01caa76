//! The seam between a chat session and whatever answers it.

use std::fmt;

use async_trait::async_trait;

use crate::core::message::Message;

pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const MIN_MAX_TOKENS: u32 = 64;
pub const MAX_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Sampling settings sent along with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl GenerationParams {
    /// Build params with both values clamped into their supported ranges.
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        let temperature = if temperature.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
        };
        Self {
            temperature,
            max_tokens: max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS),
        }
    }

    /// Replace individual values, keeping the rest.
    pub fn with_overrides(self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self::new(
            temperature.unwrap_or(self.temperature),
            max_tokens.unwrap_or(self.max_tokens),
        )
    }
}

/// Failure of a single gateway call.
#[derive(Debug)]
pub enum GatewayError {
    /// No API key was available when the call was made.
    MissingCredentials(String),

    /// The request never produced an HTTP response.
    Transport(String),

    /// The endpoint answered with a non-success status.
    Api { status: u16, detail: String },

    /// The response body could not be understood.
    Malformed(String),

    /// The call finished without producing any assistant text.
    EmptyResponse,

    /// The caller abandoned the call.
    Cancelled,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::MissingCredentials(var) => {
                write!(f, "No API key configured: set the {var} environment variable")
            }
            GatewayError::Transport(msg) => write!(f, "Request failed: {msg}"),
            GatewayError::Api { status, detail } => {
                write!(f, "API request failed with status {status}: {detail}")
            }
            GatewayError::Malformed(msg) => write!(f, "Malformed response: {msg}"),
            GatewayError::EmptyResponse => write!(f, "The model returned no content"),
            GatewayError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Sends a conversation to a model and returns the assistant's full reply.
///
/// Whether the remote side streams is an implementation detail: callers always
/// get one concatenated string or an error.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(
        &self,
        model: &str,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<String, GatewayError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A gateway that replays canned outcomes and records what it was sent.
    #[derive(Default)]
    pub struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        pub calls: Mutex<Vec<(String, Vec<Message>, GenerationParams)>>,
    }

    impl ScriptedGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, err: GatewayError) -> Self {
            self.replies.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatGateway for ScriptedGateway {
        async fn send(
            &self,
            model: &str,
            messages: &[Message],
            params: GenerationParams,
        ) -> Result<String, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec(), params));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("ok".to_string()))
        }
    }

    /// A gateway whose calls never complete.
    pub struct HangingGateway;

    #[async_trait]
    impl ChatGateway for HangingGateway {
        async fn send(
            &self,
            _model: &str,
            _messages: &[Message],
            _params: GenerationParams,
        ) -> Result<String, GatewayError> {
            std::future::pending().await
        }
    }
}
