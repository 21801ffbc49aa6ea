use std::{collections::HashMap, fs, path::Path};

use search_core::EmptyPredicatePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub empty_predicate_policy: EmptyPredicatePolicy,
    pub voice_input: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/directory.db".into(),
            empty_predicate_policy: EmptyPredicatePolicy::Unfiltered,
            voice_input: true,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `path` if it exists, then the environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    let text = |key: &str| match file_cfg.get(key) {
        Some(toml::Value::String(v)) => Some(v.clone()),
        Some(toml::Value::Boolean(v)) => Some(v.to_string()),
        _ => None,
    };

    if let Some(v) = text("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = text("empty_predicate_policy") {
        if let Ok(parsed) = v.parse() {
            settings.empty_predicate_policy = parsed;
        }
    }
    if let Some(v) = text("voice_input") {
        if let Some(parsed) = parse_flag(&v) {
            settings.voice_input = parsed;
        }
    }
    if let Some(v) = text("log_filter") {
        settings.log_filter = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__EMPTY_PREDICATE_POLICY") {
        if let Ok(parsed) = v.parse() {
            settings.empty_predicate_policy = parsed;
        }
    }

    if let Some(v) = var("APP__VOICE_INPUT") {
        if let Some(parsed) = parse_flag(&v) {
            settings.voice_input = parsed;
        }
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
