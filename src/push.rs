use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::{PUSH_TIMEOUT, PushConfig};
use crate::util::truncate_chars;

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const MAX_TITLE_CHARS: usize = 250;
const MAX_MESSAGE_CHARS: usize = 1024;

pub trait PushSink {
    /// Returns whether the service accepted the message. Never fails loudly.
    fn send(&self, title: &str, message: &str) -> bool;
}

pub struct Pushover {
    config: PushConfig,
    agent: ureq::Agent,
    url: String,
}

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: Option<i64>,
}

impl Pushover {
    pub fn new(config: PushConfig) -> Self {
        Self::with_timeout(config, PUSH_TIMEOUT)
    }

    pub fn with_timeout(config: PushConfig, timeout: Duration) -> Self {
        Self {
            config,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: PUSHOVER_URL.to_string(),
        }
    }

    fn post(&self, title: &str, message: &str) -> Result<bool, String> {
        let title = truncate_chars(title, MAX_TITLE_CHARS);
        let message = truncate_chars(message, MAX_MESSAGE_CHARS);

        let response = self
            .agent
            .post(&self.url)
            .send_form(&[
                ("token", self.config.token.as_str()),
                ("user", self.config.user.as_str()),
                ("title", title.as_str()),
                ("message", message.as_str()),
            ])
            .map_err(|err| err.to_string())?;

        let status = response.status();
        if status != 200 {
            return Err(format!("http status {status}"));
        }
        let body = response
            .into_string()
            .map_err(|err| format!("unreadable body: {err}"))?;
        accepted(&body)
    }
}

impl PushSink for Pushover {
    fn send(&self, title: &str, message: &str) -> bool {
        match self.post(title, message) {
            Ok(success) => {
                debug!(success, "push notification result");
                success
            }
            Err(reason) => {
                debug!(error = %reason, success = false, "push notification result");
                false
            }
        }
    }
}

fn accepted(body: &str) -> Result<bool, String> {
    let parsed: PushoverResponse =
        serde_json::from_str(body).map_err(|err| format!("invalid JSON: {err}"))?;
    Ok(parsed.status == Some(1))
}
