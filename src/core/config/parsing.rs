use std::env;
use std::str::FromStr;

use super::types::{ConfigError, Environment};

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

/// Reads `key` as a number, falling back to `default` when unset.
pub(super) fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(value) => parse_number(key, value),
        None => Ok(default),
    }
}

fn parse_number<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

/// Accepts a JSON array or a comma separated list. Empty input keeps the
/// local development origins.
pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_default();
    let trimmed = raw.trim();

    let origins: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|_| ConfigError::InvalidCors(raw.clone()))?
    } else {
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    };

    if origins.is_empty() {
        Ok(default_cors_origins())
    } else {
        Ok(origins)
    }
}

pub(super) fn parse_string_list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    let Some(raw) = value else {
        return defaults.iter().map(|item| item.to_string()).collect();
    };

    raw.split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

pub(super) fn is_supported_image_extension(extension: &str) -> bool {
    matches!(extension, "jpg" | "jpeg" | "png" | "webp" | "gif")
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cors_origins_json() {
        let raw = "[\"http://a\",\"http://b\"]".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors json");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_csv() {
        let raw = "http://a, http://b".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors csv");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_defaults_on_empty() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        assert_eq!(parsed, default_cors_origins());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_string_list_normalizes_extensions() {
        let parsed = parse_string_list(Some(" .PNG, jpg,,".to_string()), &["gif"]);
        assert_eq!(parsed, vec!["png".to_string(), "jpg".to_string()]);

        let defaults = parse_string_list(None, &["gif", "webp"]);
        assert_eq!(defaults, vec!["gif".to_string(), "webp".to_string()]);
    }

    #[test]
    fn parse_number_reports_field() {
        let err = parse_number::<u64>("MAX_IMPORT_UPLOAD_MB", "lots".to_string())
            .expect_err("invalid");
        assert!(err.to_string().contains("MAX_IMPORT_UPLOAD_MB"));

        let pool: u16 = parse_number("DATABASE_MAX_CONNECTIONS", "12".to_string()).expect("valid");
        assert_eq!(pool, 12);
    }

    #[test]
    fn image_extension_whitelist() {
        assert!(is_supported_image_extension("png"));
        assert!(!is_supported_image_extension("exe"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("production".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
