use std::fmt;

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::gateway::{ChatGateway, GatewayError, GenerationParams};
use crate::core::message::ConversationLog;
use crate::core::persona::{PersonaError, PersonaStore};

/// Number of user/assistant pairs the CLI keeps in context.
pub const DEFAULT_MAX_TURNS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Ended,
}

/// Why a turn did not produce a reply. The log is unchanged in every case.
#[derive(Debug)]
pub enum TurnError {
    /// The gateway failed; the user message was rolled back.
    TurnFailed(GatewayError),
    /// The session was already ended.
    SessionEnded,
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::TurnFailed(cause) => write!(f, "{cause}"),
            TurnError::SessionEnded => write!(f, "This session has ended; start a new one"),
        }
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TurnError::TurnFailed(cause) => Some(cause),
            TurnError::SessionEnded => None,
        }
    }
}

/// One conversation with one model and a fixed persona selection.
#[derive(Debug, Clone)]
pub struct Session {
    log: ConversationLog,
    model: String,
    persona_refs: Vec<String>,
    started_at: DateTime<Local>,
    saved: bool,
    state: SessionState,
    max_turns: Option<usize>,
}

impl Session {
    /// Merge the selected personas and open an active session.
    ///
    /// A persona failure is returned as-is and no session exists afterwards.
    pub fn start(
        model: impl Into<String>,
        persona_refs: Vec<String>,
        store: &PersonaStore,
    ) -> Result<Self, PersonaError> {
        let system_text = store.merge(&persona_refs)?;
        let model = model.into();
        let log = ConversationLog::seeded(system_text);
        info!(
            %model,
            personas = ?persona_refs,
            seeded = log.has_system(),
            "session started"
        );

        Ok(Self {
            log,
            model,
            persona_refs,
            started_at: Local::now(),
            saved: false,
            state: SessionState::Active,
            max_turns: None,
        })
    }

    /// Bound the retained context to the latest `max_turns` pairs after each
    /// successful turn. `None` keeps everything.
    pub fn with_window(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Send one user message and record the reply.
    ///
    /// The user message is appended before the call so the gateway sees it,
    /// and removed again if the call fails or `cancel` fires first.
    pub async fn submit_turn(
        &mut self,
        gateway: &dyn ChatGateway,
        params: GenerationParams,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        if self.state == SessionState::Ended {
            return Err(TurnError::SessionEnded);
        }

        self.log.push_user(user_text);
        debug!(model = %self.model, messages = self.log.len(), "submitting turn");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            result = gateway.send(&self.model, self.log.messages(), params) => result,
        };

        match outcome {
            Ok(reply) => {
                self.log.push_assistant(reply.clone());
                if let Some(max_turns) = self.max_turns {
                    let dropped = self.log.trim_to_window(max_turns);
                    if dropped > 0 {
                        debug!(dropped, "trimmed context window");
                    }
                }
                Ok(reply)
            }
            Err(cause) => {
                self.log.pop();
                debug!(error = %cause, "turn rolled back");
                Err(TurnError::TurnFailed(cause))
            }
        }
    }

    /// Close the session. Saving is a separate step.
    pub fn end(mut self) -> Self {
        self.state = SessionState::Ended;
        self
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn persona_refs(&self) -> &[String] {
        &self.persona_refs
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub(crate) fn mark_saved(&mut self) {
        self.saved = true;
    }

    #[cfg(test)]
    pub(crate) fn set_started_at(&mut self, started_at: DateTime<Local>) {
        self.started_at = started_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::testing::{HangingGateway, ScriptedGateway};
    use crate::core::message::Message;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn store_with(files: &[(&str, &str)]) -> (TempDir, PersonaStore) {
        let dir = tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = PersonaStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn round_trip_seeds_system_and_records_reply() {
        let (_dir, store) = store_with(&[("a.xml", "You are A.")]);
        let mut session = Session::start("hunyuan-a13b", vec!["a.xml".into()], &store).unwrap();
        let gateway = ScriptedGateway::new().reply("hello");

        let reply = session
            .submit_turn(&gateway, GenerationParams::default(), "hi", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply, "hello");
        let messages = session.log().messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_system());
        assert!(messages[0].content.contains("You are A."));
        assert_eq!(messages[1], Message::user("hi"));
        assert_eq!(messages[2], Message::assistant("hello"));

        let calls = gateway.calls.lock().unwrap();
        let (model, sent, params) = &calls[0];
        assert_eq!(model, "hunyuan-a13b");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], Message::user("hi"));
        assert_eq!(*params, GenerationParams::default());
    }

    #[test]
    fn start_without_personas_has_empty_log() {
        let (_dir, store) = store_with(&[]);
        let session = Session::start("m", Vec::new(), &store).unwrap();
        assert!(session.log().is_empty());
        assert!(session.is_active());
        assert!(!session.is_saved());
    }

    #[test]
    fn start_fails_when_a_persona_is_missing() {
        let (_dir, store) = store_with(&[("a.xml", "A")]);
        let err = Session::start("m", vec!["a.xml".into(), "missing.xml".into()], &store)
            .unwrap_err();
        assert!(matches!(err, PersonaError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_turn_rolls_back_and_session_stays_usable() {
        let (_dir, store) = store_with(&[("a.xml", "A")]);
        let mut session = Session::start("m", vec!["a.xml".into()], &store).unwrap();
        let gateway = ScriptedGateway::new()
            .reply("first")
            .fail(GatewayError::Transport("connection reset".into()))
            .reply("second");
        let cancel = CancellationToken::new();
        let params = GenerationParams::default();

        session.submit_turn(&gateway, params, "one", &cancel).await.unwrap();
        let before = session.log().clone();

        let err = session.submit_turn(&gateway, params, "two", &cancel).await.unwrap_err();
        assert!(matches!(err, TurnError::TurnFailed(GatewayError::Transport(_))));
        assert_eq!(session.log(), &before);
        assert!(session.is_active());

        let reply = session.submit_turn(&gateway, params, "three", &cancel).await.unwrap();
        assert_eq!(reply, "second");
        assert_eq!(session.log().len(), 5);
        assert_eq!(session.log().messages()[3], Message::user("three"));
    }

    #[tokio::test]
    async fn cancellation_rolls_back_a_pending_turn() {
        let (_dir, store) = store_with(&[]);
        let mut session = Session::start("m", Vec::new(), &store).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = session
            .submit_turn(&HangingGateway, GenerationParams::default(), "hi", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::TurnFailed(GatewayError::Cancelled)));
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn windowed_session_keeps_system_and_latest_sixteen() {
        let (_dir, store) = store_with(&[("a.xml", "A")]);
        let mut session = Session::start("m", vec!["a.xml".into()], &store)
            .unwrap()
            .with_window(Some(DEFAULT_MAX_TURNS));
        let system = session.log().system().cloned().unwrap();
        let gateway = ScriptedGateway::new();
        let cancel = CancellationToken::new();

        for i in 0..12 {
            session
                .submit_turn(&gateway, GenerationParams::default(), &format!("q{i}"), &cancel)
                .await
                .unwrap();
            assert_eq!(session.log().messages()[0], system);
            assert!(session.log().conversation().len() <= 2 * DEFAULT_MAX_TURNS);
        }
        assert_eq!(session.log().conversation()[0], Message::user("q4"));
    }

    #[tokio::test]
    async fn unwindowed_session_keeps_everything() {
        let (_dir, store) = store_with(&[]);
        let mut session = Session::start("m", Vec::new(), &store).unwrap();
        let gateway = ScriptedGateway::new();
        let cancel = CancellationToken::new();

        for i in 0..10 {
            session
                .submit_turn(&gateway, GenerationParams::default(), &format!("q{i}"), &cancel)
                .await
                .unwrap();
        }
        assert_eq!(session.log().len(), 20);
    }

    #[tokio::test]
    async fn ended_session_rejects_turns() {
        let (_dir, store) = store_with(&[]);
        let mut session = Session::start("m", Vec::new(), &store).unwrap().end();
        let gateway = ScriptedGateway::new();

        let err = session
            .submit_turn(&gateway, GenerationParams::default(), "hi", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::SessionEnded));
        assert_eq!(session.state(), SessionState::Ended);
        assert_eq!(gateway.call_count(), 0);
        assert!(session.log().is_empty());
    }
}
