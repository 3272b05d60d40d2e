pub mod api;
pub mod history;
pub mod keywords;
pub mod layout;
pub mod validate;

pub use history::{DiagramVersion, RevisionHistory};
pub use layout::{compute_layout, DiagramKind, LayoutConfig};
pub use validate::{validate, Severity, ValidationFinding, ValidationReport};

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// --- Storage ---

/// Default file name for exported diagram text.
pub const DEFAULT_EXPORT_NAME: &str = "c4-diagram.mmd";

/// Resolve the per-user data directory (~/.c4draft/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".c4draft")
}

/// Write diagram text verbatim to `path`.
///
/// Goes through a temp file in the same directory plus rename, so a reader
/// never observes a half-written diagram.
pub fn export_diagram(path: &Path, diagram_text: &str) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_EXPORT_NAME.to_string());
    let tmp = dir.join(format!(".{file_name}.tmp"));
    fs::write(&tmp, diagram_text).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    log::info!(path = path.display().to_string(); "exported diagram");
    Ok(())
}

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    /// Base URL of a diagram REST service; takes precedence over direct LLM calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
}

impl AiSettings {
    /// Apply `C4DRAFT_*` overrides from the given environment lookup.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("C4DRAFT_PROVIDER") {
            self.provider = v;
        }
        if let Some(v) = var("C4DRAFT_MODEL") {
            self.model = v;
        }
        if let Some(v) = var("C4DRAFT_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = var("C4DRAFT_BACKEND_URL") {
            self.backend_url = Some(v).filter(|u| !u.is_empty());
        }
        self
    }
}

pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Read settings from `path`; a missing or unreadable file yields defaults.
pub fn read_settings_from(path: &Path) -> AiSettings {
    if !path.exists() {
        return AiSettings::default();
    }
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Settings from ~/.c4draft/settings.json with environment overrides applied.
pub fn read_settings() -> AiSettings {
    read_settings_from(&settings_path()).with_env(|k| std::env::var(k).ok())
}

pub fn write_settings_to(path: &Path, settings: &AiSettings) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(|e| StoreError::io(path, e))
}

pub fn write_settings(settings: &AiSettings) -> Result<(), StoreError> {
    write_settings_to(&settings_path(), settings)
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
