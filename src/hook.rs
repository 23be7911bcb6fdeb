use serde::Deserialize;

use crate::error::{NotifierError, Result};

pub const DEFAULT_EVENT_NAME: &str = "Stop";
pub const NOTIFICATION_EVENT: &str = "Notification";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    pub session_id: String,
    pub cwd: String,
    pub hook_event_name: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct RawHookEvent {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    hook_event_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HookEvent {
    /// Parses the stdin payload. Unknown keys are ignored and empty strings
    /// count as absent.
    pub fn parse(input: &str) -> Result<Self> {
        let raw: RawHookEvent = serde_json::from_str(input)
            .map_err(|err| NotifierError::InvalidInput(format!("invalid JSON on stdin: {err}")))?;

        let session_id = present(raw.session_id)
            .ok_or_else(|| NotifierError::InvalidInput("missing session_id".to_string()))?;

        Ok(Self {
            session_id,
            cwd: present(raw.cwd).unwrap_or_default(),
            hook_event_name: present(raw.hook_event_name)
                .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            message: present(raw.message).unwrap_or_default(),
        })
    }

    pub fn is_notification_request(&self) -> bool {
        self.hook_event_name == NOTIFICATION_EVENT
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_known_fields() {
        let event = HookEvent::parse(
            r#"{"session_id":"abc","cwd":"/work/proj","hook_event_name":"Notification","message":"Needs input"}"#,
        )
        .expect("parse");
        assert_eq!(event.session_id, "abc");
        assert_eq!(event.cwd, "/work/proj");
        assert!(event.is_notification_request());
        assert_eq!(event.message, "Needs input");
    }

    #[test]
    fn defaults_apply_and_unknown_keys_are_ignored() {
        let event = HookEvent::parse(
            r#"{"session_id":"abc","transcript_path":"/x.jsonl","hook_event_name":"","stop_hook_active":false}"#,
        )
        .expect("parse");
        assert_eq!(event.cwd, "");
        assert_eq!(event.hook_event_name, "Stop");
        assert_eq!(event.message, "");
    }

    #[test]
    fn missing_session_id_is_an_input_error() {
        let err = HookEvent::parse(r#"{"invalid":"missing session_id"}"#).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");

        let err = HookEvent::parse(r#"{"session_id":""}"#).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn malformed_json_is_an_input_error() {
        let err = HookEvent::parse("not valid json at all").unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }
}
