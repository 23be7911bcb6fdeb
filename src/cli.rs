use clap::{Arg, ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cc-notifier",
    version,
    disable_version_flag = true,
    arg = Arg::new("version")
        .short('v')
        .long("version")
        .action(ArgAction::Version)
        .help("Show version information"),
    about = "macOS notification system for Claude Code hooks with push notification support",
    after_help = "Set PUSHOVER_API_TOKEN and PUSHOVER_USER_KEY to enable push notifications."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging with timestamps.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Initialize session (capture focused window).
    Init,
    /// Send notification if user switched away (local + push).
    Notify,
    /// Clean up session files.
    Cleanup,
}

impl Commands {
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Notify => "notify",
            Self::Cleanup => "cleanup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn debug_flag_is_accepted_on_either_side() {
        let cli = Cli::try_parse_from(["cc-notifier", "--debug", "notify"]).expect("parse");
        assert!(cli.debug);
        assert_eq!(cli.command, Some(Commands::Notify));

        let cli = Cli::try_parse_from(["cc-notifier", "init", "--debug"]).expect("parse");
        assert!(cli.debug);
        assert_eq!(cli.command, Some(Commands::Init));
    }

    #[test]
    fn short_and_long_version_flags() {
        for flag in ["-v", "--version"] {
            let err = Cli::try_parse_from(["cc-notifier", flag]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        }
    }

    #[test]
    fn missing_and_unknown_commands() {
        let cli = Cli::try_parse_from(["cc-notifier"]).expect("parse");
        assert_eq!(cli.command, None);

        let err = Cli::try_parse_from(["cc-notifier", "bogus"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
