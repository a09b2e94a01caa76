//! Persona fragments on disk.
//!
//! A persona is an `.xml` file anywhere below the personas root, addressed by
//! its path relative to that root (always `/`-separated). Several personas can
//! be merged, in selection order, into one system instruction.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

/// File extension that marks a persona fragment.
pub const PERSONA_EXTENSION: &str = "xml";

const MERGE_HEADER: &str = "<!--\n  Multiple persona XML merged.\n  NOTE: Later files override earlier ones when rules conflict.\n-->\n";

/// Errors raised while resolving or reading persona fragments.
#[derive(Debug)]
pub enum PersonaError {
    /// The identifier does not resolve to an existing fragment file.
    NotFound {
        /// Resolved location that was looked up.
        path: PathBuf,
    },

    /// The identifier escapes the personas root or is not a relative path.
    InvalidId(String),

    /// The fragment exists but could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::NotFound { path } => {
                write!(f, "Persona file not found: {}", path.display())
            }
            PersonaError::InvalidId(id) => {
                write!(f, "Invalid persona identifier '{id}': must be a path inside the personas directory")
            }
            PersonaError::Read { path, source } => {
                write!(f, "Failed to read persona {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PersonaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersonaError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Read-only view over a personas directory.
#[derive(Debug, Clone)]
pub struct PersonaStore {
    root: PathBuf,
}

impl PersonaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily enumerate persona identifiers below the root.
    ///
    /// Each call starts a fresh walk. A missing root yields nothing.
    pub fn scan(&self) -> PersonaScan {
        let Ok(base) = self.root.canonicalize() else {
            debug!(root = %self.root.display(), "personas root does not exist");
            return PersonaScan::empty();
        };

        let pattern = format!(
            "{}/**/*.{}",
            glob::Pattern::escape(&base.to_string_lossy()),
            PERSONA_EXTENSION
        );
        match glob::glob(&pattern) {
            Ok(paths) => PersonaScan {
                base,
                paths: Some(paths),
            },
            Err(err) => {
                warn!(%pattern, error = %err, "invalid persona scan pattern");
                PersonaScan::empty()
            }
        }
    }

    /// Absolute location of a fragment, without checking that it exists.
    pub fn resolve(&self, id: &str) -> PathBuf {
        let joined = self.root.join(id);
        std::path::absolute(&joined).unwrap_or(joined)
    }

    /// Read one fragment.
    pub fn load(&self, id: &str) -> Result<String, PersonaError> {
        validate_id(id)?;
        let path = self.resolve(id);
        if !path.is_file() {
            return Err(PersonaError::NotFound { path });
        }
        fs::read_to_string(&path).map_err(|source| PersonaError::Read { path, source })
    }

    /// Merge the selected fragments, in the given order, into one instruction.
    ///
    /// Every fragment is read before anything is assembled, so one missing
    /// identifier fails the whole merge. An empty selection yields an empty
    /// string.
    pub fn merge<S: AsRef<str>>(&self, selected: &[S]) -> Result<String, PersonaError> {
        if selected.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::with_capacity(selected.len());
        for id in selected {
            let id = id.as_ref();
            let content = self.load(id)?;
            parts.push(format!("<!-- BEGIN: {id} -->\n{content}\n<!-- END: {id} -->"));
        }

        Ok(format!("{MERGE_HEADER}{}", parts.join("\n\n")))
    }
}

fn validate_id(id: &str) -> Result<(), PersonaError> {
    let path = Path::new(id);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if id.is_empty() || escapes {
        return Err(PersonaError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Iterator over persona identifiers produced by [`PersonaStore::scan`].
pub struct PersonaScan {
    base: PathBuf,
    paths: Option<glob::Paths>,
}

impl PersonaScan {
    fn empty() -> Self {
        Self {
            base: PathBuf::new(),
            paths: None,
        }
    }
}

impl Iterator for PersonaScan {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let paths = self.paths.as_mut()?;
        loop {
            match paths.next()? {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    let Ok(relative) = path.strip_prefix(&self.base) else {
                        continue;
                    };
                    let id = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    return Some(id);
                }
                Err(err) => {
                    warn!(path = %err.path().display(), error = %err.error(), "skipping unreadable persona entry");
                }
            }
        }
    }
}
