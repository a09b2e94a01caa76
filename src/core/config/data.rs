use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk configuration. Every key is optional; see `defaults.rs` for the
/// values used when a key is absent.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model used when none is given on the command line
    pub model: Option<String>,
    /// JSON file holding an array of selectable model names
    pub models_file: Option<PathBuf>,
    /// Directory scanned for persona `.xml` fragments
    pub personas_dir: Option<PathBuf>,
    /// Personas merged into the system message by the terminal chat
    pub default_personas: Option<Vec<String>>,
    /// Directory that receives saved transcripts
    pub log_dir: Option<PathBuf>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// User/assistant pairs kept in context by the terminal chat
    pub max_turns: Option<usize>,
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Ask the endpoint for a streamed response
    pub stream: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    /// Listen address for the browser panel
    pub panel_bind: Option<String>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
