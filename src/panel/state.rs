//! Shared panel state.
//!
//! Sessions live in a map keyed by id. A handler checks a session out, which
//! moves the value out of the map and leaves a `CheckedOut` marker behind,
//! and checks it back in when done. A second request for a checked-out
//! session is rejected instead of waiting. Sessions left idle are swept
//! away unsaved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::core::chat_stream::HttpChatGateway;
use crate::core::config::Config;
use crate::core::gateway::{ChatGateway, GatewayError, GenerationParams};
use crate::core::persona::PersonaStore;
use crate::core::session::Session;
use crate::core::transcript::TranscriptWriter;
use crate::panel::error::PanelError;

#[derive(Debug)]
pub enum SessionSlot {
    CheckedOut,
    Ready { session: Session, touched: Instant },
}

impl SessionSlot {
    fn ready(session: Session) -> Self {
        SessionSlot::Ready {
            session,
            touched: Instant::now(),
        }
    }
}

/// Everything a panel handler needs. Cheap to clone.
#[derive(Clone)]
pub struct PanelState {
    sessions: Arc<DashMap<Uuid, SessionSlot>>,
    pub store: Arc<PersonaStore>,
    pub writer: Arc<TranscriptWriter>,
    pub gateway: Arc<dyn ChatGateway>,
    pub models: Arc<Vec<String>>,
    pub defaults: GenerationParams,
}

impl PanelState {
    pub fn new(
        store: PersonaStore,
        writer: TranscriptWriter,
        gateway: Arc<dyn ChatGateway>,
        models: Vec<String>,
        defaults: GenerationParams,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            store: Arc::new(store),
            writer: Arc::new(writer),
            gateway,
            models: Arc::new(models),
            defaults,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let gateway = HttpChatGateway::new(
            config.base_url(),
            config.api_key_env(),
            config.stream(),
            config.request_timeout(),
        )?;
        let store = PersonaStore::new(config.personas_dir());
        let writer = TranscriptWriter::new(config.log_dir(), store.root());

        Ok(Self::new(
            store,
            writer,
            Arc::new(gateway),
            config.models(),
            config.generation_params(),
        ))
    }

    /// Register a new session and return its id.
    pub fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::now_v7();
        self.sessions.insert(id, SessionSlot::ready(session));
        id
    }

    /// Drop a session without saving it. Unknown ids are ignored.
    pub fn discard(&self, id: Uuid) {
        if self.sessions.remove(&id).is_some() {
            info!(session = %id, "session discarded");
        }
    }

    /// Move a session out of the map for exclusive use.
    pub fn checkout(&self, id: Uuid) -> Result<Session, PanelError> {
        let mut slot = self
            .sessions
            .get_mut(&id)
            .ok_or(PanelError::UnknownSession(id))?;
        match std::mem::replace(slot.value_mut(), SessionSlot::CheckedOut) {
            SessionSlot::Ready { session, .. } => Ok(session),
            SessionSlot::CheckedOut => Err(PanelError::SessionBusy(id)),
        }
    }

    /// Return a checked-out session. A session discarded meanwhile stays gone.
    pub fn checkin(&self, id: Uuid, session: Session) {
        if let Some(mut slot) = self.sessions.get_mut(&id) {
            *slot = SessionSlot::ready(session);
        }
    }

    /// Drop sessions untouched for `max_idle` or longer. Checked-out
    /// sessions are in use and always kept. Returns how many were dropped.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, slot| match slot {
            SessionSlot::CheckedOut => true,
            SessionSlot::Ready { touched, .. } => touched.elapsed() < max_idle,
        });
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!(removed, "idle sessions dropped");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::testing::ScriptedGateway;
    use tempfile::tempdir;

    fn state_in(dir: &std::path::Path) -> PanelState {
        let store = PersonaStore::new(dir.join("prompts"));
        let writer = TranscriptWriter::new(dir.join("logs"), store.root());
        PanelState::new(
            store,
            writer,
            Arc::new(ScriptedGateway::new()),
            vec!["m".to_string()],
            GenerationParams::default(),
        )
    }

    #[test]
    fn checked_out_session_is_busy_until_checked_in() {
        let dir = tempdir().unwrap();
        let state = state_in(dir.path());
        let session = Session::start("m", Vec::new(), &state.store).unwrap();
        let id = state.insert(session);

        let session = state.checkout(id).unwrap();
        assert!(matches!(state.checkout(id), Err(PanelError::SessionBusy(_))));

        state.checkin(id, session);
        assert!(state.checkout(id).is_ok());
    }

    #[test]
    fn discarded_session_is_not_resurrected_by_checkin() {
        let dir = tempdir().unwrap();
        let state = state_in(dir.path());
        let id = state.insert(Session::start("m", Vec::new(), &state.store).unwrap());

        let session = state.checkout(id).unwrap();
        state.discard(id);
        state.checkin(id, session);

        assert_eq!(state.session_count(), 0);
        assert!(matches!(state.checkout(id), Err(PanelError::UnknownSession(_))));
    }

    #[test]
    fn idle_sweep_drops_ready_sessions_and_keeps_checked_out_ones() {
        let dir = tempdir().unwrap();
        let state = state_in(dir.path());
        let idle = state.insert(Session::start("m", Vec::new(), &state.store).unwrap());
        let busy = state.insert(Session::start("m", Vec::new(), &state.store).unwrap());
        let held = state.checkout(busy).unwrap();

        assert_eq!(state.sweep_idle(Duration::from_secs(3600)), 0);
        assert_eq!(state.sweep_idle(Duration::ZERO), 1);

        assert_eq!(state.session_count(), 1);
        assert!(matches!(state.checkout(idle), Err(PanelError::UnknownSession(_))));
        state.checkin(busy, held);
        assert!(state.checkout(busy).is_ok());
    }
}
