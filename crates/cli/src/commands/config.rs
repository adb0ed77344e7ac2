use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sfquery_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigLine {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for line in config_lines(&config) {
        let source = field_source(
            line.key,
            line.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", line.key, line.value));
    }

    lines.join("\n")
}

fn config_lines(config: &AppConfig) -> Vec<ConfigLine> {
    vec![
        line("llm.provider", format!("{:?}", config.llm.provider), &["SFQUERY_LLM_PROVIDER"]),
        line("llm.model", config.llm.model.clone(), &["SFQUERY_LLM_MODEL"]),
        line(
            "llm.base_url",
            config.llm.effective_base_url().to_string(),
            &["SFQUERY_LLM_BASE_URL"],
        ),
        line(
            "llm.api_key",
            if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
            &["SFQUERY_LLM_API_KEY"],
        ),
        line("llm.temperature", config.llm.temperature.to_string(), &["SFQUERY_LLM_TEMPERATURE"]),
        line(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["SFQUERY_LLM_TIMEOUT_SECS"],
        ),
        line(
            "agent.admin_profiles",
            config.agent.admin_profiles.join(", "),
            &["SFQUERY_AGENT_ADMIN_PROFILES"],
        ),
        line(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SFQUERY_SERVER_BIND_ADDRESS"],
        ),
        line("server.port", config.server.port.to_string(), &["SFQUERY_SERVER_PORT", "PORT"]),
        line(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["SFQUERY_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        line(
            "server.allowed_origins",
            config.server.allowed_origins.join(", "),
            &["SFQUERY_SERVER_ALLOWED_ORIGINS"],
        ),
        line(
            "logging.level",
            config.logging.level.clone(),
            &["SFQUERY_LOGGING_LEVEL", "SFQUERY_LOG_LEVEL"],
        ),
        line(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SFQUERY_LOGGING_FORMAT", "SFQUERY_LOG_FORMAT"],
        ),
    ]
}

fn line(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigLine {
    ConfigLine { key, value, env_keys }
}

fn detect_config_path() -> Option<PathBuf> {
    ["sfquery.toml", "config/sfquery.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
