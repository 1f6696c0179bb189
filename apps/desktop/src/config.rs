use std::{collections::HashMap, fs, path::Path};

use tracing::warn;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_DATA_URL: &str = "sqlite://./data/client.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub data_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            data_url: DEFAULT_DATA_URL.into(),
        }
    }
}

impl Settings {
    /// Command line values win over everything else.
    pub fn with_overrides(mut self, server_url: Option<String>, data_url: Option<String>) -> Self {
        if let Some(v) = server_url {
            self.server_url = v;
        }
        if let Some(v) = data_url {
            self.data_url = normalize_data_url(&v);
        }
        self
    }
}

pub fn load_settings(config_path: &Path) -> Settings {
    let raw = fs::read_to_string(config_path).ok();
    resolve_settings(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file, then the environment.
pub fn resolve_settings(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("server_url") {
                    settings.server_url = v.clone();
                }
                if let Some(v) = file_cfg.get("data_url") {
                    settings.data_url = v.clone();
                }
            }
            Err(error) => warn!(%error, "config: ignoring malformed config file"),
        }
    }

    if let Some(v) = env("DOCENGINE_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("DOCENGINE_DATA_URL") {
        settings.data_url = v;
    }
    if let Some(v) = env("APP__DATA_URL") {
        settings.data_url = v;
    }

    settings.data_url = normalize_data_url(&settings.data_url);
    settings
}

pub fn normalize_data_url(raw_data_url: &str) -> String {
    let raw_data_url = raw_data_url.trim();

    if raw_data_url.is_empty() {
        return DEFAULT_DATA_URL.to_string();
    }

    if raw_data_url.starts_with("sqlite::memory:") || raw_data_url.contains("://") {
        return raw_data_url.to_string();
    }

    let path = raw_data_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_data_url)
        .replace('\\', "/");
    format!("sqlite://{path}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
