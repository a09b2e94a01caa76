//! Panel HTTP handlers.
//!
//! Endpoints:
//! - GET  /                            - The panel page
//! - GET  /api/models                  - Model allow-list and generation defaults
//! - GET  /api/personas                - Rescan persona files
//! - POST /api/sessions                - Start a session
//! - POST /api/sessions/{id}/messages  - Run one turn
//! - POST /api/sessions/{id}/save      - End the session and save its transcript

use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::config::path_display;
use crate::core::session::Session;
use crate::core::transcript::SaveError;
use crate::panel::error::PanelError;
use crate::panel::state::PanelState;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct PersonasResponse {
    pub personas: Vec<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub model: String,
    #[serde(default)]
    pub personas: Vec<String>,
    /// Session this one replaces; it is dropped without saving.
    #[serde(default)]
    pub replaces: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /api/models
pub async fn list_models(State(state): State<PanelState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.models.as_ref().clone(),
        default_temperature: state.defaults.temperature,
        default_max_tokens: state.defaults.max_tokens,
    })
}

/// GET /api/personas
pub async fn list_personas(State(state): State<PanelState>) -> Json<PersonasResponse> {
    let personas: Vec<String> = state.store.scan().collect();
    let message = if personas.is_empty() {
        format!(
            "No .xml files found under {}.",
            path_display(state.store.root())
        )
    } else {
        format!("Found {} persona files.", personas.len())
    };
    Json(PersonasResponse { personas, message })
}

/// POST /api/sessions
pub async fn start_session(
    State(state): State<PanelState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, PanelError> {
    if !state.models.contains(&request.model) {
        return Err(PanelError::Validation(format!(
            "Unknown model '{}'",
            request.model
        )));
    }
    if let Some(previous) = request.replaces {
        state.discard(previous);
    }

    let session = Session::start(request.model, request.personas, &state.store)?;
    let session_id = state.insert(session);
    info!(session = %session_id, "panel session started");

    Ok(Json(StartSessionResponse {
        session_id,
        message: "Session started. Type below to chat.".to_string(),
    }))
}

/// POST /api/sessions/{id}/messages
///
/// The turn runs on its own task so a client that goes away mid-request
/// cannot leave the session checked out.
pub async fn send_message(
    State(state): State<PanelState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, PanelError> {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err(PanelError::Validation("Message is empty".to_string()));
    }
    let params = state
        .defaults
        .with_overrides(request.temperature, request.max_tokens);

    let mut session = state.checkout(id)?;
    let task_state = state.clone();
    let turn = tokio::spawn(async move {
        let result = session
            .submit_turn(
                task_state.gateway.as_ref(),
                params,
                &text,
                &CancellationToken::new(),
            )
            .await;
        task_state.checkin(id, session);
        result
    });

    let reply = turn
        .await
        .map_err(|e| PanelError::Internal(format!("Turn task failed: {e}")))??;
    debug!(session = %id, chars = reply.len(), "panel turn complete");
    Ok(Json(SendMessageResponse { reply }))
}

/// POST /api/sessions/{id}/save
pub async fn save_session(
    State(state): State<PanelState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, PanelError> {
    let mut session = state.checkout(id)?.end();
    let outcome = state.writer.save(&mut session);
    state.checkin(id, session);

    let message = match outcome {
        Ok(path) => {
            let path = std::path::absolute(&path).unwrap_or(path);
            format!("Saved to: {}", path.display())
        }
        Err(e @ (SaveError::NothingToSave | SaveError::AlreadySaved)) => e.to_string(),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(MessageResponse { message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::testing::ScriptedGateway;
    use crate::core::gateway::{GatewayError, GenerationParams};
    use crate::core::message::Message;
    use crate::core::persona::PersonaStore;
    use crate::core::transcript::TranscriptWriter;
    use axum::http::StatusCode;
    use std::fs;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        state: PanelState,
        gateway: Arc<ScriptedGateway>,
    }

    fn fixture(gateway: ScriptedGateway) -> Fixture {
        let dir = tempdir().unwrap();
        let prompts = dir.path().join("prompts");
        fs::create_dir_all(prompts.join("extra")).unwrap();
        fs::write(prompts.join("goblin.xml"), "You are a goblin.").unwrap();
        fs::write(prompts.join("extra").join("tone.xml"), "Speak softly.").unwrap();

        let store = PersonaStore::new(&prompts);
        let writer = TranscriptWriter::new(dir.path().join("logs"), store.root());
        let gateway = Arc::new(gateway);
        let state = PanelState::new(
            store,
            writer,
            gateway.clone(),
            vec!["hunyuan-a13b".to_string(), "hunyuan-pro".to_string()],
            GenerationParams::default(),
        );
        Fixture {
            dir,
            state,
            gateway,
        }
    }

    async fn start(state: &PanelState, personas: &[&str]) -> Uuid {
        let request = StartSessionRequest {
            model: "hunyuan-a13b".to_string(),
            personas: personas.iter().map(|p| p.to_string()).collect(),
            replaces: None,
        };
        start_session(State(state.clone()), Json(request))
            .await
            .unwrap()
            .0
            .session_id
    }

    async fn send(state: &PanelState, id: Uuid, text: &str) -> Result<String, PanelError> {
        let request = SendMessageRequest {
            text: text.to_string(),
            temperature: Some(1.5),
            max_tokens: None,
        };
        send_message(State(state.clone()), Path(id), Json(request))
            .await
            .map(|json| json.0.reply)
    }

    async fn save(state: &PanelState, id: Uuid) -> Result<String, PanelError> {
        save_session(State(state.clone()), Path(id))
            .await
            .map(|json| json.0.message)
    }

    #[tokio::test]
    async fn personas_and_models_are_listed() {
        let fx = fixture(ScriptedGateway::new());

        let personas = list_personas(State(fx.state.clone())).await.0;
        let mut ids = personas.personas.clone();
        ids.sort();
        assert_eq!(ids, vec!["extra/tone.xml", "goblin.xml"]);
        assert_eq!(personas.message, "Found 2 persona files.");

        let models = list_models(State(fx.state.clone())).await.0;
        assert_eq!(models.models, vec!["hunyuan-a13b", "hunyuan-pro"]);
        assert_eq!(models.default_max_tokens, 512);
    }

    #[tokio::test]
    async fn empty_persona_directory_says_so() {
        let dir = tempdir().unwrap();
        let store = PersonaStore::new(dir.path().join("nothing-here"));
        let writer = TranscriptWriter::new(dir.path().join("logs"), store.root());
        let state = PanelState::new(
            store,
            writer,
            Arc::new(ScriptedGateway::new()),
            vec!["m".to_string()],
            GenerationParams::default(),
        );

        let personas = list_personas(State(state)).await.0;
        assert!(personas.personas.is_empty());
        assert!(personas.message.starts_with("No .xml files found under "));
    }

    #[tokio::test]
    async fn a_full_session_runs_turns_and_saves_once() {
        let fx = fixture(ScriptedGateway::new().reply("Grr."));
        let id = start(&fx.state, &["goblin.xml", "extra/tone.xml"]).await;

        assert_eq!(send(&fx.state, id, "  hello  ").await.unwrap(), "Grr.");
        {
            let calls = fx.gateway.calls.lock().unwrap();
            let (model, messages, params) = &calls[0];
            assert_eq!(model, "hunyuan-a13b");
            assert!(messages[0].content.contains("<!-- BEGIN: goblin.xml -->"));
            assert!(messages[0].content.contains("<!-- BEGIN: extra/tone.xml -->"));
            assert_eq!(messages[1], Message::user("hello"));
            assert_eq!(params.temperature, 1.5);
        }

        let message = save(&fx.state, id).await.unwrap();
        assert!(message.starts_with("Saved to: "));
        let logs: Vec<_> = fs::read_dir(fx.dir.path().join("logs")).unwrap().collect();
        assert_eq!(logs.len(), 1);

        assert_eq!(
            save(&fx.state, id).await.unwrap(),
            "This session has already been saved."
        );
        let err = send(&fx.state, id, "more").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn failed_turn_is_reported_and_the_session_keeps_going() {
        let fx = fixture(
            ScriptedGateway::new()
                .reply("first")
                .fail(GatewayError::Transport("timed out".into()))
                .reply("third"),
        );
        let id = start(&fx.state, &[]).await;

        send(&fx.state, id, "one").await.unwrap();
        let err = send(&fx.state, id, "two").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.message(), "Request failed: timed out");

        assert_eq!(send(&fx.state, id, "three").await.unwrap(), "third");
        let calls = fx.gateway.calls.lock().unwrap();
        let sent = &calls[2].1;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], Message::user("one"));
        assert_eq!(sent[2], Message::user("three"));
    }

    #[tokio::test]
    async fn saving_before_any_turn_has_nothing_to_save() {
        let fx = fixture(ScriptedGateway::new());
        let id = start(&fx.state, &[]).await;

        assert_eq!(
            save(&fx.state, id).await.unwrap(),
            "Nothing to save in this session yet."
        );
        assert!(!fx.dir.path().join("logs").exists());
    }

    #[tokio::test]
    async fn missing_persona_fails_without_creating_a_session() {
        let fx = fixture(ScriptedGateway::new());
        let request = StartSessionRequest {
            model: "hunyuan-a13b".to_string(),
            personas: vec!["goblin.xml".to_string(), "missing.xml".to_string()],
            replaces: None,
        };

        let err = start_session(State(fx.state.clone()), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(fx.state.session_count(), 0);
    }

    #[tokio::test]
    async fn unknown_model_is_rejected() {
        let fx = fixture(ScriptedGateway::new());
        let request = StartSessionRequest {
            model: "gpt-nothing".to_string(),
            personas: Vec::new(),
            replaces: None,
        };
        let err = start_session(State(fx.state.clone()), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn replacing_a_session_discards_the_old_one() {
        let fx = fixture(ScriptedGateway::new());
        let first = start(&fx.state, &[]).await;
        let request = StartSessionRequest {
            model: "hunyuan-pro".to_string(),
            personas: Vec::new(),
            replaces: Some(first),
        };
        let second = start_session(State(fx.state.clone()), Json(request))
            .await
            .unwrap()
            .0
            .session_id;

        assert_ne!(first, second);
        assert_eq!(fx.state.session_count(), 1);
        let err = send(&fx.state, first, "hi").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn busy_and_unknown_sessions_are_rejected() {
        let fx = fixture(ScriptedGateway::new());
        let id = start(&fx.state, &[]).await;

        let held = fx.state.checkout(id).unwrap();
        let err = send(&fx.state, id, "hi").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "SESSION_BUSY");
        fx.state.checkin(id, held);

        let err = save(&fx.state, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(fx.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_messages_are_rejected_before_checkout() {
        let fx = fixture(ScriptedGateway::new());
        let id = start(&fx.state, &[]).await;

        let err = send(&fx.state, id, "   ").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fx.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn personas_merge_in_request_order_not_scan_order() {
        let fx = fixture(ScriptedGateway::new());
        let id = start(&fx.state, &["goblin.xml", "extra/tone.xml"]).await;
        send(&fx.state, id, "hi").await.unwrap();

        let calls = fx.gateway.calls.lock().unwrap();
        let system = &calls[0].1[0].content;
        let goblin = system.find("<!-- BEGIN: goblin.xml -->").unwrap();
        let tone = system.find("<!-- BEGIN: extra/tone.xml -->").unwrap();
        assert!(goblin < tone);
    }

    #[test]
    fn page_sends_personas_in_tick_order() {
        assert!(INDEX_HTML.contains("personas: [...selected]"));
        assert!(!INDEX_HTML.contains("input:checked"));
    }
}
