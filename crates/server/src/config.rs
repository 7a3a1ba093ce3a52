use std::{collections::HashMap, fs, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub engine_binary: String,
    pub engine_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            engine_binary: "./kvstore".into(),
            engine_timeout_secs: 10,
        }
    }
}

/// Defaults, then `relay.toml` if present, then environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("relay.toml") {
        apply_file(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("RELAY_BIND") {
        settings.bind_addr = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Ok(v) = std::env::var("RELAY_ENGINE_BIN") {
        settings.engine_binary = v;
    }
    if let Ok(v) = std::env::var("APP__ENGINE_BIN") {
        settings.engine_binary = v;
    }

    if let Ok(v) = std::env::var("RELAY_ENGINE_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.engine_timeout_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__ENGINE_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.engine_timeout_secs = parsed;
        }
    }

    normalize(&mut settings);
    settings
}

pub fn apply_file(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("bind_addr") {
            settings.bind_addr = v.clone();
        }
        if let Some(v) = file_cfg.get("engine_bin") {
            settings.engine_binary = v.clone();
        }
        if let Some(v) = file_cfg.get("engine_timeout_secs") {
            if let Ok(parsed) = v.parse::<u64>() {
                settings.engine_timeout_secs = parsed;
            }
        }
    }
}

pub fn engine_timeout(settings: &Settings) -> Duration {
    Duration::from_secs(settings.engine_timeout_secs.max(1))
}

fn normalize(settings: &mut Settings) {
    let defaults = Settings::default();
    if settings.bind_addr.trim().is_empty() {
        settings.bind_addr = defaults.bind_addr;
    }
    if settings.engine_binary.trim().is_empty() {
        settings.engine_binary = defaults.engine_binary;
    }
}
