use std::path::Path;

use chrono::{DateTime, Local};

use crate::hook::HookEvent;

pub const LOCAL_TITLE: &str = "Claude Code 🔔";
pub const FALLBACK_SUBTITLE: &str = "Task Completed";
pub const FALLBACK_BODY: &str = "Completed task";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Local,
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

pub fn compose(event: &HookEvent, channel: Channel, debug: bool, now: DateTime<Local>) -> Notification {
    let subtitle = project_label(&event.cwd);
    let body = if event.is_notification_request() && !event.message.is_empty() {
        event.message.clone()
    } else {
        FALLBACK_BODY.to_string()
    };

    let title = match channel {
        // terminal-notifier treats a leading `[` specially, hence the escape.
        Channel::Local if debug => format!("\\[DEBUG] {LOCAL_TITLE}"),
        Channel::Local => LOCAL_TITLE.to_string(),
        Channel::Push => format!("{subtitle} [{}]", push_timestamp(now, debug)),
    };

    Notification {
        title,
        subtitle,
        body,
    }
}

fn project_label(cwd: &str) -> String {
    if cwd.is_empty() {
        return FALLBACK_SUBTITLE.to_string();
    }
    Path::new(cwd)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| FALLBACK_SUBTITLE.to_string())
}

fn push_timestamp(now: DateTime<Local>, debug: bool) -> String {
    if debug {
        now.format("%H:%M:%S%.3f").to_string()
    } else {
        now.format("%-I:%M %p").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(name: &str, message: &str, cwd: &str) -> HookEvent {
        HookEvent {
            session_id: "s".to_string(),
            cwd: cwd.to_string(),
            hook_event_name: name.to_string(),
            message: message.to_string(),
        }
    }

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 3, 14, h, m, s)
            .single()
            .expect("unambiguous local time")
            + chrono::Duration::milliseconds(ms as i64)
    }

    #[test]
    fn notification_event_uses_its_message() {
        let n = compose(&event("Notification", "X", "/work/proj"), Channel::Local, false, at(9, 5, 0, 0));
        assert_eq!(n.body, "X");
        assert_eq!(n.subtitle, "proj");
        assert_eq!(n.title, LOCAL_TITLE);
    }

    #[test]
    fn stop_event_falls_back_to_completed_task() {
        let n = compose(&event("Stop", "ignored", ""), Channel::Local, false, at(9, 5, 0, 0));
        assert_eq!(n.body, "Completed task");
        assert_eq!(n.subtitle, "Task Completed");

        let n = compose(&event("Notification", "", "/p"), Channel::Local, false, at(9, 5, 0, 0));
        assert_eq!(n.body, "Completed task");
    }

    #[test]
    fn debug_marks_local_title() {
        let n = compose(&event("Stop", "", "/p"), Channel::Local, true, at(9, 5, 0, 0));
        assert_eq!(n.title, "\\[DEBUG] Claude Code 🔔");
    }

    #[test]
    fn push_title_frames_project_with_time() {
        let n = compose(&event("Stop", "", "/work/proj"), Channel::Push, false, at(9, 5, 7, 0));
        assert_eq!(n.title, "proj [9:05 AM]");

        let n = compose(&event("Stop", "", "/work/proj"), Channel::Push, false, at(21, 30, 0, 0));
        assert_eq!(n.title, "proj [9:30 PM]");

        let n = compose(&event("Stop", "", "/work/proj"), Channel::Push, true, at(21, 30, 4, 42));
        assert_eq!(n.title, "proj [21:30:04.042]");
    }
}
