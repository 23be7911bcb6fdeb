use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use cc_notifier::app::{self, Collaborators};
use cc_notifier::cli::Cli;
use cc_notifier::config::{self, IDLE_QUERY_TIMEOUT, Settings};
use cc_notifier::focus::{Hammerspoon, SessionFocus};
use cc_notifier::idle::{ThreadSleeper, idle_source};
use cc_notifier::logging::setup_tracing;
use cc_notifier::notifier::TerminalNotifier;
use cc_notifier::push::{PushSink, Pushover};

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("cc-notifier error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<u8> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(if err.use_stderr() { 1 } else { 0 });
        }
    };
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(1);
    };

    setup_tracing(&config::log_path(), cli.debug);
    let settings = Settings::from_env(cli.debug);

    let focus = SessionFocus::new(settings.remote, Hammerspoon::new(settings.command_timeout));
    let notifier = TerminalNotifier::new();
    let push = settings.push.clone().map(Pushover::new);
    let idle = idle_source(settings.remote, IDLE_QUERY_TIMEOUT);
    let deps = Collaborators {
        focus: &focus,
        notifier: &notifier,
        push: push.as_ref().map(|sink| sink as &dyn PushSink),
        idle: &*idle,
        sleeper: &ThreadSleeper,
    };

    Ok(app::dispatch(command, &mut io::stdin().lock(), &settings, &deps))
}
