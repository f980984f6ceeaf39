use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::inpaint::composite::ResampleFilter;
use crate::inpaint::selection::MIN_SELECTION_SIZE;

pub const SETTINGS_FILE_NAME: &str = "masked_inpaint.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Name of the environment variable holding a bearer token, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub resample_filter: ResampleFilter,
    #[serde(default = "default_min_selection_size")]
    pub min_selection_size: f64,
    #[serde(default)]
    pub debug_logging: bool,
    /// Mirror log output to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            resample_filter: ResampleFilter::default(),
            min_selection_size: default_min_selection_size(),
            debug_logging: false,
            log_file: None,
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8080/inpaint".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_min_selection_size() -> f64 {
    MIN_SELECTION_SIZE
}

impl Settings {
    /// Missing or blank files load as defaults. Out-of-range values are reset.
    pub fn load(path: &Path) -> Result<Self> {
        let mut loaded = Self::read(path)?;
        loaded.sanitize();
        Ok(loaded)
    }

    /// Like [`Settings::load`] but leaves values as written; call
    /// [`Settings::sanitize`] once logging is up.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("deserialize settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create settings parent folder {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))
    }

    pub fn sanitize(&mut self) {
        if !self.min_selection_size.is_finite() || self.min_selection_size < 0.0 {
            tracing::warn!(
                value = self.min_selection_size,
                "invalid min_selection_size; using default"
            );
            self.min_selection_size = default_min_selection_size();
        }
    }
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}
