use crate::core::config::data::Config;
use crate::core::gateway::GenerationParams;
use crate::core::session::DEFAULT_MAX_TURNS;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MODELS: [&str; 3] = ["hunyuan-a13b", "hunyuan-standard", "hunyuan-pro"];
pub const DEFAULT_MODELS_FILE: &str = "models.json";
pub const DEFAULT_PERSONAS_DIR: &str = "prompts";
pub const DEFAULT_PERSONA: &str = "goblin.xml";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_BASE_URL: &str = "https://api.hunyuan.cloud.tencent.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "HUNYUAN_API_KEY";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PANEL_BIND: &str = "127.0.0.1:7860";

/// Read a JSON array of model names.
///
/// A missing, unreadable, malformed or empty file yields the built-in list.
pub fn load_models_file(path: &Path) -> Vec<String> {
    let builtin = || DEFAULT_MODELS.iter().map(|m| m.to_string()).collect();

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return builtin(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read models file, using built-in list");
            return builtin();
        }
    };

    match serde_json::from_str::<Vec<String>>(&contents) {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => builtin(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "models file is not a list of names, using built-in list");
            builtin()
        }
    }
}

impl Config {
    pub fn models_file(&self) -> PathBuf {
        self.models_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_FILE))
    }

    /// The model allow-list offered by the panel and `goblin models`.
    pub fn models(&self) -> Vec<String> {
        load_models_file(&self.models_file())
    }

    /// Configured model, or the first entry of the allow-list.
    pub fn model(&self) -> String {
        match &self.model {
            Some(model) => model.clone(),
            None => self
                .models()
                .into_iter()
                .next()
                .unwrap_or_else(|| DEFAULT_MODELS[0].to_string()),
        }
    }

    pub fn personas_dir(&self) -> PathBuf {
        self.personas_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PERSONAS_DIR))
    }

    pub fn default_personas(&self) -> Vec<String> {
        self.default_personas
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_PERSONA.to_string()])
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    /// Generation defaults, clamped into their supported ranges.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams::default().with_overrides(self.temperature, self.max_tokens)
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns.unwrap_or(DEFAULT_MAX_TURNS)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn panel_bind(&self) -> &str {
        self.panel_bind.as_deref().unwrap_or(DEFAULT_PANEL_BIND)
    }
}
