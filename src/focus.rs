use std::time::Duration;

use tracing::debug;

use crate::config::HAMMERSPOON_CLI;
use crate::error::{NotifierError, Result};
use crate::util::run_command;

pub const REMOTE_WINDOW: &str = "REMOTE";

const FOCUSED_WINDOW_SCRIPT: &str =
    "local w=hs.window.focusedWindow(); print(w and w:id() or 'ERROR')";

pub trait WindowFocus {
    fn focused_window(&self) -> Result<String>;
}

pub fn is_remote_window(window_id: &str) -> bool {
    window_id == REMOTE_WINDOW
}

pub struct Hammerspoon {
    cli: String,
    timeout: Duration,
}

impl Hammerspoon {
    pub fn new(timeout: Duration) -> Self {
        Self {
            cli: HAMMERSPOON_CLI.to_string(),
            timeout,
        }
    }
}

impl WindowFocus for Hammerspoon {
    fn focused_window(&self) -> Result<String> {
        let output = run_command(&self.cli, &["-c", FOCUSED_WINDOW_SCRIPT], self.timeout)?;
        parse_focused_window(&output)
    }
}

pub struct SessionFocus<F> {
    remote: bool,
    local: F,
}

impl<F: WindowFocus> SessionFocus<F> {
    pub fn new(remote: bool, local: F) -> Self {
        Self { remote, local }
    }
}

impl<F: WindowFocus> WindowFocus for SessionFocus<F> {
    fn focused_window(&self) -> Result<String> {
        if self.remote {
            debug!("remote session: using {REMOTE_WINDOW} placeholder window");
            return Ok(REMOTE_WINDOW.to_string());
        }
        self.local.focused_window()
    }
}

fn parse_focused_window(output: &str) -> Result<String> {
    let window_id = output.trim();
    if window_id.is_empty() || window_id == "ERROR" {
        return Err(NotifierError::ToolFailed {
            command: "hs".to_string(),
            reason: "no focused window reported".to_string(),
        });
    }
    Ok(window_id.to_string())
}

/// Lua that focuses `window_id` even when it lives on another Space.
// `setCurrentSpace(nil)` can hang Hammerspoon, so windows are searched through
// two filters instead.
pub fn focus_script(window_id: &str) -> String {
    format!(
        "local current = require('hs.window.filter').new():setCurrentSpace(true):getWindows()
local other = require('hs.window.filter').new():setCurrentSpace(false):getWindows()
for _,w in pairs(other) do table.insert(current, w) end
for _,w in pairs(current) do
  if w:id()=={window_id} then
    w:focus()
    require('hs.timer').usleep(300000)
    return
  end
end"
    )
}

/// `None` unless `window_id` is a plain numeric Hammerspoon id; anything
/// else would be spliced into Lua source.
pub fn focus_command(window_id: &str) -> Option<Vec<String>> {
    if window_id.is_empty() || !window_id.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    Some(vec![
        HAMMERSPOON_CLI.to_string(),
        "-c".to_string(),
        focus_script(window_id),
    ])
}
