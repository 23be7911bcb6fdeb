use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_SESSION_DIR: &str = "/tmp/cc_notifier";
pub const DEFAULT_DEDUP_THRESHOLD_SECONDS: f64 = 2.0;
pub const DEFAULT_IDLE_CHECKPOINTS: &[u64] = &[3];
pub const RETENTION: Duration = Duration::from_secs(5 * 24 * 60 * 60);
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
pub const IDLE_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub const HAMMERSPOON_CLI: &str = "/Applications/Hammerspoon.app/Contents/Frameworks/hs/hs";
pub const TERMINAL_NOTIFIER: &str = "/opt/homebrew/bin/terminal-notifier";

const PUSH_TOKEN_ENV: &str = "PUSHOVER_API_TOKEN";
const PUSH_USER_ENV: &str = "PUSHOVER_USER_KEY";
const SSH_INDICATORS: [&str; 3] = ["SSH_CONNECTION", "SSH_CLIENT", "SSH_TTY"];

/// Pushover credentials. Only constructed when both halves are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    pub token: String,
    pub user: String,
}

impl PushConfig {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let token = non_empty(lookup(PUSH_TOKEN_ENV))?;
        let user = non_empty(lookup(PUSH_USER_ENV))?;
        Some(Self { token, user })
    }
}

/// Per-invocation configuration threaded through every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub debug: bool,
    pub remote: bool,
    pub session_dir: PathBuf,
    pub log_path: PathBuf,
    pub dedup_threshold: f64,
    pub idle_checkpoints: Vec<u64>,
    pub command_timeout: Duration,
    pub push: Option<PushConfig>,
}

impl Settings {
    pub fn from_env(debug: bool) -> Self {
        Self {
            debug,
            remote: is_remote_session(),
            session_dir: session_dir(),
            log_path: log_path(),
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD_SECONDS,
            idle_checkpoints: idle_checkpoints(),
            command_timeout: COMMAND_TIMEOUT,
            push: PushConfig::from_env(),
        }
    }
}

pub fn notifier_home() -> PathBuf {
    if let Some(custom) = non_empty(env::var("CC_NOTIFIER_HOME").ok()) {
        return PathBuf::from(custom);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cc-notifier")
}

pub fn log_path() -> PathBuf {
    notifier_home().join("cc-notifier.log")
}

pub fn session_dir() -> PathBuf {
    non_empty(env::var("CC_NOTIFIER_SESSION_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_DIR))
}

pub fn is_remote_session() -> bool {
    is_remote_session_from(|name| env::var(name).ok())
}

pub fn is_remote_session_from(lookup: impl Fn(&str) -> Option<String>) -> bool {
    SSH_INDICATORS
        .iter()
        .any(|name| non_empty(lookup(name)).is_some())
}

fn idle_checkpoints() -> Vec<u64> {
    let Some(raw) = non_empty(env::var("CC_NOTIFIER_IDLE_CHECKPOINTS").ok()) else {
        return DEFAULT_IDLE_CHECKPOINTS.to_vec();
    };
    match parse_checkpoints(&raw) {
        Some(parsed) => parsed,
        None => {
            warn!(value = %raw, "ignoring invalid CC_NOTIFIER_IDLE_CHECKPOINTS");
            DEFAULT_IDLE_CHECKPOINTS.to_vec()
        }
    }
}

/// Parses `"3,30,120"`. Values must be positive and strictly ascending.
pub fn parse_checkpoints(raw: &str) -> Option<Vec<u64>> {
    let mut parsed = Vec::new();
    for part in raw.split(',') {
        let value = part.trim().parse::<u64>().ok().filter(|v| *v > 0)?;
        if parsed.last().is_some_and(|last| *last >= value) {
            return None;
        }
        parsed.push(value);
    }
    Some(parsed)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn push_config_requires_both_credentials() {
        assert_eq!(PushConfig::from_lookup(lookup_from(&[])), None);
        assert_eq!(
            PushConfig::from_lookup(lookup_from(&[("PUSHOVER_API_TOKEN", "tok")])),
            None
        );
        assert_eq!(
            PushConfig::from_lookup(lookup_from(&[
                ("PUSHOVER_API_TOKEN", "tok"),
                ("PUSHOVER_USER_KEY", "  "),
            ])),
            None
        );
        assert_eq!(
            PushConfig::from_lookup(lookup_from(&[
                ("PUSHOVER_API_TOKEN", "tok"),
                ("PUSHOVER_USER_KEY", "usr"),
            ])),
            Some(PushConfig {
                token: "tok".to_string(),
                user: "usr".to_string(),
            })
        );
    }

    #[test]
    fn remote_detection_accepts_any_ssh_indicator() {
        assert!(!is_remote_session_from(lookup_from(&[])));
        assert!(is_remote_session_from(lookup_from(&[(
            "SSH_CONNECTION",
            "1.2.3.4 12345 5.6.7.8 22"
        )])));
        assert!(is_remote_session_from(lookup_from(&[(
            "SSH_CLIENT",
            "1.2.3.4 12345 22"
        )])));
        assert!(is_remote_session_from(lookup_from(&[("SSH_TTY", "/dev/pts/0")])));
    }

    #[test]
    fn checkpoints_must_ascend() {
        assert_eq!(parse_checkpoints("3"), Some(vec![3]));
        assert_eq!(parse_checkpoints("3, 30,120"), Some(vec![3, 30, 120]));
        assert_eq!(parse_checkpoints("30,3"), None);
        assert_eq!(parse_checkpoints("3,3"), None);
        assert_eq!(parse_checkpoints("0"), None);
        assert_eq!(parse_checkpoints("abc"), None);
    }
}
