pub mod types;

pub use types::*;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

const CONFIG_FILE_NAME: &str = "config.json";

/// Places searched for a config file when none is given on the command line.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("lecture-pacer").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Loads the config from `path`, or from the first default location that exists.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let candidates = default_config_paths();
            candidates
                .iter()
                .find(|candidate| candidate.is_file())
                .cloned()
                .ok_or(ConfigError::NotFound(candidates))?
        }
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    parse(&raw).map_err(|err| match err {
        ParseFailure::Json(source) => ConfigError::Parse { path, source },
        ParseFailure::Invalid(reason) => ConfigError::Invalid(reason),
    })
}

enum ParseFailure {
    Json(serde_json::Error),
    Invalid(String),
}

fn parse(raw: &str) -> Result<AppConfig, ParseFailure> {
    let config: AppConfig = serde_json::from_str(raw).map_err(ParseFailure::Json)?;
    validate(&config).map_err(ParseFailure::Invalid)?;
    Ok(config)
}

pub fn validate(config: &AppConfig) -> Result<(), String> {
    if config.cookie.trim().is_empty() {
        return Err("`cookie` must not be empty".to_string());
    }
    if config.user_agent.trim().is_empty() {
        return Err("`user_agent` must not be empty".to_string());
    }
    if config.classroom_id == 0 {
        return Err("`classroom_id` must be a positive integer".to_string());
    }
    if config.max_parallel == 0 || config.max_parallel > Semaphore::MAX_PERMITS {
        return Err(format!(
            "`max_parallel` must be between 1 and {}",
            Semaphore::MAX_PERMITS
        ));
    }
    if !is_positive_duration(config.tick_interval_secs) {
        return Err("`tick_interval_secs` must be a positive number of seconds".to_string());
    }
    if !is_positive_duration(config.request_timeout_secs) {
        return Err("`request_timeout_secs` must be a positive number of seconds".to_string());
    }
    if config.max_backoff_ms < config.retry_backoff_ms {
        return Err("`max_backoff_ms` must not be smaller than `retry_backoff_ms`".to_string());
    }
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(format!("`base_url` is not an http(s) URL: {}", config.base_url));
    }
    Ok(())
}

fn is_positive_duration(secs: f64) -> bool {
    secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn minimal() -> &'static str {
        r#"{"cookie": "sessionid=abc; csrftoken=xyz", "user_agent": "Mozilla/5.0", "classroom_id": 123}"#
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse(minimal()).ok().unwrap();

        assert_eq!(config.classroom_id, 123);
        assert_eq!(config.max_parallel, 3);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.probe_duration);
        assert!(!config.uses_firefox_cookies());

        let policy = config.playback_policy();
        assert_eq!(policy.tick_interval, Duration::from_secs(5));
        assert_eq!(policy.max_retries, 3);
    }

    #[test]
    fn test_firefox_sentinel_is_recognised() {
        let raw = r#"{"cookie": "FIREFOX", "user_agent": "ua", "classroom_id": 7}"#;
        let config = parse(raw).ok().unwrap();
        assert!(config.uses_firefox_cookies());
    }

    #[test]
    fn test_rejects_zero_classroom() {
        let raw = r#"{"cookie": "a=b", "user_agent": "ua", "classroom_id": 0}"#;
        assert!(matches!(parse(raw), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn test_rejects_negative_classroom_and_unknown_keys() {
        let negative = r#"{"cookie": "a=b", "user_agent": "ua", "classroom_id": -4}"#;
        assert!(matches!(parse(negative), Err(ParseFailure::Json(_))));

        let unknown = r#"{"cookie": "a=b", "user_agent": "ua", "classroom_id": 4, "speed": 2}"#;
        assert!(matches!(parse(unknown), Err(ParseFailure::Json(_))));
    }

    #[test]
    fn test_rejects_non_positive_tick() {
        let raw = r#"{"cookie": "a=b", "user_agent": "ua", "classroom_id": 4, "tick_interval_secs": 0}"#;
        assert!(matches!(parse(raw), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn test_rejects_durations_too_large_to_represent() {
        let tick = r#"{"cookie": "a=b", "user_agent": "ua", "classroom_id": 4, "tick_interval_secs": 1e20}"#;
        assert!(matches!(parse(tick), Err(ParseFailure::Invalid(_))));

        let timeout = r#"{"cookie": "a=b", "user_agent": "ua", "classroom_id": 4, "request_timeout_secs": 1e20}"#;
        assert!(matches!(parse(timeout), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn test_rejects_parallelism_beyond_semaphore_capacity() {
        let raw = format!(
            r#"{{"cookie": "a=b", "user_agent": "ua", "classroom_id": 4, "max_parallel": {}}}"#,
            Semaphore::MAX_PERMITS + 1
        );
        assert!(matches!(parse(&raw), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn test_unvalidated_huge_durations_fall_back_to_defaults() {
        let mut config = parse(minimal()).ok().unwrap();
        config.tick_interval_secs = 1e20;
        config.request_timeout_secs = f64::NAN;

        assert_eq!(config.playback_policy().tick_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = PlaybackPolicy {
            tick_interval: Duration::from_secs(5),
            max_retries: 5,
            retry_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(3),
        };

        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(3));
        assert_eq!(policy.backoff_for(40), Duration::from_secs(3));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load(Some(&dir.path().join("config.json")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(minimal().as_bytes()).unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.user_agent, "Mozilla/5.0");
    }
}
