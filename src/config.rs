use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

pub static API_BASE_URL: Lazy<String> = Lazy::new(|| {
    env::var("API_BASE_URL")
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "http://localhost:5000/api".to_string())
});

pub static HTTP_TIMEOUT: Lazy<Duration> = Lazy::new(|| env_secs("HTTP_TIMEOUT_SECS", 30));

pub static HTTP_CONNECT_TIMEOUT: Lazy<Duration> =
    Lazy::new(|| env_secs("HTTP_CONNECT_TIMEOUT_SECS", 5));

pub static ACCESS_TOKEN: Lazy<Option<String>> = Lazy::new(|| {
    env::var("ACCESS_TOKEN")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
});

pub static AUTO_SELECT_FIRST: Lazy<bool> =
    Lazy::new(|| parse_env_bool("AUTO_SELECT_FIRST").unwrap_or(true));

pub static CATALOG_FETCH_TIMEOUT: Lazy<Option<Duration>> = Lazy::new(|| {
    env::var("CATALOG_FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
});

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn parse_env_bool(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    parse_bool(&raw)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
