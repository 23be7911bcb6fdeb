use std::path::Path;

use tracing::{debug, warn};

use crate::compose::Notification;
use crate::config::TERMINAL_NOTIFIER;
use crate::error::Result;
use crate::focus::focus_command;
use crate::util::{shell_join, spawn_background};

const ERROR_TITLE: &str = "cc-notifier Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    pub content: Notification,
    /// Window to bring back when the notification is clicked.
    pub focus_window: Option<String>,
}

pub trait DesktopNotifier {
    fn notify(&self, notification: &LocalNotification) -> Result<()>;

    /// Best effort; failures are only logged.
    fn notify_error(&self, message: &str, log_path: &Path);
}

pub struct TerminalNotifier {
    binary: String,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self {
            binary: TERMINAL_NOTIFIER.to_string(),
        }
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopNotifier for TerminalNotifier {
    fn notify(&self, notification: &LocalNotification) -> Result<()> {
        let args = notification_args(notification);
        spawn_background(&self.binary, &args)
            .inspect(|_| debug!(focus_window = ?notification.focus_window, "notification sent"))
            .inspect_err(|err| debug!(error = %err, "notification failed"))
    }

    fn notify_error(&self, message: &str, log_path: &Path) {
        let args = error_args(message, log_path);
        if spawn_background(&self.binary, &args).is_ok() {
            return;
        }
        if let Err(err) = spawn_background("osascript", &osascript_error_args(message)) {
            warn!(error = %err, "failed to raise error notification");
        }
    }
}

pub fn notification_args(notification: &LocalNotification) -> Vec<String> {
    let content = &notification.content;
    let mut args: Vec<String> = [
        "-title",
        content.title.as_str(),
        "-subtitle",
        content.subtitle.as_str(),
        "-message",
        content.body.as_str(),
        "-sound",
        "Glass",
        "-ignoreDnD",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    if let Some(command) = notification
        .focus_window
        .as_deref()
        .and_then(focus_command)
        .and_then(|argv| shell_join(&argv).ok())
    {
        args.push("-execute".to_string());
        args.push(command);
    }
    args
}

fn error_args(message: &str, log_path: &Path) -> Vec<String> {
    let mut args = vec![
        "-title".to_string(),
        ERROR_TITLE.to_string(),
        "-message".to_string(),
        message.to_string(),
        "-sound".to_string(),
        "Basso".to_string(),
    ];
    let log = log_path.to_string_lossy();
    if let Ok(open_log) = shell_join(&["open", &*log]) {
        args.push("-execute".to_string());
        args.push(open_log);
    }
    args
}

fn osascript_error_args(message: &str) -> Vec<String> {
    vec![
        "-e".to_string(),
        format!(
            "display notification \"{}\" with title \"{ERROR_TITLE}\" sound name \"Basso\"",
            escape_applescript(message)
        ),
    ]
}

fn escape_applescript(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}
