use std::io::Read;
use std::time::SystemTime;

use chrono::Local;
use tracing::{debug, error};

use crate::cli::Commands;
use crate::compose::{Channel, compose};
use crate::config::{RETENTION, Settings};
use crate::dedup::DedupGuard;
use crate::error::{NotifierError, Result};
use crate::focus::{WindowFocus, is_remote_window};
use crate::hook::HookEvent;
use crate::idle::{EscalationState, IdleEscalation, IdleSource, Sleeper};
use crate::notifier::{DesktopNotifier, LocalNotification};
use crate::push::PushSink;
use crate::session::{SessionId, SessionStore, Touch};
use crate::sweep::{SweepReport, sweep};

pub struct Collaborators<'a> {
    pub focus: &'a dyn WindowFocus,
    pub notifier: &'a dyn DesktopNotifier,
    pub push: Option<&'a dyn PushSink>,
    pub idle: &'a dyn IdleSource,
    pub sleeper: &'a dyn Sleeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Duplicate,
    Evaluated { local_sent: bool, push: PushOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Disabled,
    UserActive,
    Sent { accepted: bool },
}

/// Runs one command and maps failures to a log entry, an error notification
/// and exit status 1.
pub fn dispatch(
    command: Commands,
    stdin: &mut dyn Read,
    settings: &Settings,
    deps: &Collaborators<'_>,
) -> u8 {
    let result = read_input(stdin).and_then(|input| match command {
        Commands::Init => init(&input, settings, deps),
        Commands::Notify => notify(&input, settings, deps).map(|_| ()),
        Commands::Cleanup => cleanup(&input, settings).map(|_| ()),
    });

    match result {
        Ok(()) => 0,
        Err(err) => {
            let message = format!("Command '{}' failed", command.name());
            error!(command = command.name(), kind = err.kind(), error = %err, "{message}");
            deps.notifier.notify_error(&message, &settings.log_path);
            1
        }
    }
}

pub fn init(input: &str, settings: &Settings, deps: &Collaborators<'_>) -> Result<()> {
    let event = HookEvent::parse(input)?;
    let session_id = SessionId::parse(&event.session_id)?;
    let window_id = deps.focus.focused_window()?;
    SessionStore::new(&settings.session_dir).create(&session_id, &window_id)
}

pub fn notify(input: &str, settings: &Settings, deps: &Collaborators<'_>) -> Result<NotifyOutcome> {
    let event = HookEvent::parse(input)?;
    debug!(session = %event.session_id, event = %event.hook_event_name, "hook received");
    let session_id = SessionId::parse(&event.session_id)?;
    let store = SessionStore::new(&settings.session_dir);

    // The timestamp is refreshed here, before any side effect, so a slow
    // notification cannot let a sibling invocation through.
    let record = match DedupGuard::new(settings.dedup_threshold).evaluate(&store, &session_id)? {
        Touch::Proceed(record) => record,
        Touch::Duplicate(_) => return Ok(NotifyOutcome::Duplicate),
    };

    let local_sent = send_local_if_switched(&event, &record.window_id, settings, deps)?;

    let push = match deps.push {
        Some(sink) => {
            debug!("checking for push notification");
            escalate_to_push(&event, settings, deps, sink)?
        }
        None => PushOutcome::Disabled,
    };

    Ok(NotifyOutcome::Evaluated { local_sent, push })
}

/// Age-based sweep of the session directory. The hook's session id is not
/// used for deletion: it does not reliably match the file written by `init`.
pub fn cleanup(input: &str, settings: &Settings) -> Result<SweepReport> {
    let event = HookEvent::parse(input)?;
    debug!(session = %event.session_id, "cleanup requested");
    let report = sweep(&settings.session_dir, SystemTime::now(), RETENTION);
    if report.removed > 0 || settings.debug {
        debug!(removed = report.removed, "removed old session files");
    }
    Ok(report)
}

fn send_local_if_switched(
    event: &HookEvent,
    original_window: &str,
    settings: &Settings,
    deps: &Collaborators<'_>,
) -> Result<bool> {
    let current_window = deps.focus.focused_window()?;

    if is_remote_window(original_window) || is_remote_window(&current_window) {
        debug!("remote session: no local window to return to");
        return Ok(false);
    }
    if original_window == current_window {
        debug!("user still on original window - no local notification needed");
        return Ok(false);
    }

    let content = compose(event, Channel::Local, settings.debug, Local::now());
    debug!(
        original_window,
        current_window = %current_window,
        title = %content.title,
        subtitle = %content.subtitle,
        body = %content.body,
        "sending local notification"
    );
    deps.notifier.notify(&LocalNotification {
        content,
        focus_window: Some(original_window.to_string()),
    })?;
    Ok(true)
}

fn escalate_to_push(
    event: &HookEvent,
    settings: &Settings,
    deps: &Collaborators<'_>,
    sink: &dyn PushSink,
) -> Result<PushOutcome> {
    let outcome = IdleEscalation::begin(&settings.idle_checkpoints, deps.idle)?
        .run(deps.idle, deps.sleeper);
    if outcome != EscalationState::Escalated {
        return Ok(PushOutcome::UserActive);
    }

    let content = compose(event, Channel::Push, settings.debug, Local::now());
    debug!(title = %content.title, "sending push notification");
    let accepted = sink.send(&content.title, &content.body);
    Ok(PushOutcome::Sent { accepted })
}

fn read_input(stdin: &mut dyn Read) -> Result<String> {
    let mut input = String::new();
    stdin
        .read_to_string(&mut input)
        .map_err(|err| NotifierError::io("failed to read hook input from stdin", err))?;
    Ok(input)
}
