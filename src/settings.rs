use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ServiceError, ServiceResult};
use crate::metadata::DEFAULT_BASE_URL;
use crate::session::write_json_atomically;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Settings {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE)
    }

    /// Read `settings.json` from `dir`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> ServiceResult<Self> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, dir: &Path) -> ServiceResult<()> {
        write_json_atomically(&Self::path(dir), self)
    }

    /// Apply a command-line or environment override on top of the file.
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) {
            self.base_url = url.to_string();
        }
        self
    }

    pub fn validate(&self) -> ServiceResult<()> {
        validate_base_url(&self.base_url).map_err(ServiceError::Config)
    }

    /// Prompt for every field, prefilled with the current values.
    pub fn edit_interactively(&self) -> ServiceResult<Self> {
        let base_url: String = dialoguer::Input::new()
            .with_prompt("Service base URL")
            .default(self.base_url.clone())
            .validate_with(|input: &String| validate_base_url(input))
            .interact_text()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }
}

fn validate_base_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("base URL cannot be empty".to_string());
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("base URL '{}' must start with http:// or https://", url));
    }
    Ok(())
}
