use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

pub const DEFAULT_CONFIG_FILE: &str = "watchlist.toml";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub directory_url: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            directory_url: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

fn default_database_url() -> String {
    let path = dirs::data_local_dir()
        .map(|base| base.join("watchlist").join("settings.sqlite3"))
        .unwrap_or_else(|| PathBuf::from("./data/watchlist.sqlite3"));
    normalize_database_url(&path.to_string_lossy())
}

/// Defaults, then `config_path` (missing file is fine), then environment overrides.
pub fn load_settings(config_path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(config_path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", config_path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", config_path.display()))
        }
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("database_url") {
        settings.database_url = normalize_database_url(v);
    }
    if let Some(v) = file_cfg.get("directory_url") {
        settings.directory_url = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("WATCHLIST_DATABASE_URL") {
        settings.database_url = normalize_database_url(&v);
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = normalize_database_url(&v);
    }

    if let Some(v) = var("WATCHLIST_DIRECTORY_URL") {
        settings.directory_url = Some(v);
    }
    if let Some(v) = var("APP__DIRECTORY_URL") {
        settings.directory_url = Some(v);
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return default_database_url();
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
