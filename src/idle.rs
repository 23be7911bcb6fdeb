use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::error::{NotifierError, Result};
use crate::util::run_command;

pub trait IdleSource {
    fn idle_seconds(&self) -> Result<u64>;
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub struct HidIdle {
    timeout: Duration,
}

impl HidIdle {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl IdleSource for HidIdle {
    fn idle_seconds(&self) -> Result<u64> {
        let output = run_command("ioreg", &["-c", "IOHIDSystem"], self.timeout)?;
        parse_hid_idle(&output)
    }
}

fn parse_hid_idle(output: &str) -> Result<u64> {
    output
        .lines()
        .find(|line| line.contains("HIDIdleTime"))
        .and_then(|line| line.split_once('='))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(|nanos| nanos / 1_000_000_000)
        .ok_or_else(|| NotifierError::ToolFailed {
            command: "ioreg".to_string(),
            reason: "HIDIdleTime not found in output".to_string(),
        })
}

/// Seconds since the controlling terminal was last read. Used over SSH,
/// where HID idle time reflects the remote machine's console.
pub struct TtyIdle {
    path: PathBuf,
}

impl TtyIdle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        let path = env::var("SSH_TTY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "/dev/tty".to_string());
        Self::new(path)
    }
}

impl IdleSource for TtyIdle {
    fn idle_seconds(&self) -> Result<u64> {
        let accessed = std::fs::metadata(&self.path)
            .and_then(|meta| meta.accessed())
            .map_err(|err| {
                NotifierError::io(format!("failed to stat {}", self.path.display()), err)
            })?;
        Ok(SystemTime::now()
            .duration_since(accessed)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0))
    }
}

pub fn idle_source(remote: bool, timeout: Duration) -> Box<dyn IdleSource> {
    if remote {
        Box::new(TtyIdle::from_env())
    } else {
        Box::new(HidIdle::new(timeout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationState {
    BaselineCaptured { baseline: Option<u64> },
    CheckpointPending(usize),
    Aborted { checkpoint: u64, idle: Option<u64> },
    Escalated,
}

impl EscalationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::Escalated)
    }
}

pub struct IdleEscalation {
    checkpoints: Vec<u64>,
    state: EscalationState,
}

impl IdleEscalation {
    pub fn begin(checkpoints: &[u64], idle: &dyn IdleSource) -> Result<Self> {
        if checkpoints.is_empty() {
            return Err(NotifierError::EmptyCheckpoints);
        }
        let baseline = idle
            .idle_seconds()
            .inspect_err(|err| debug!(error = %err, "baseline idle sample failed"))
            .ok();
        debug!(?baseline, ?checkpoints, "idle escalation started");
        Ok(Self {
            checkpoints: checkpoints.to_vec(),
            state: EscalationState::BaselineCaptured { baseline },
        })
    }

    pub fn state(&self) -> &EscalationState {
        &self.state
    }

    pub fn step(&mut self, idle: &dyn IdleSource, sleeper: &dyn Sleeper) -> &EscalationState {
        self.state = match self.state {
            EscalationState::BaselineCaptured { .. } => EscalationState::CheckpointPending(0),
            EscalationState::CheckpointPending(index) => self.check(index, idle, sleeper),
            ref terminal => terminal.clone(),
        };
        &self.state
    }

    pub fn run(mut self, idle: &dyn IdleSource, sleeper: &dyn Sleeper) -> EscalationState {
        while !self.state.is_terminal() {
            self.step(idle, sleeper);
        }
        self.state
    }

    fn check(&self, index: usize, idle: &dyn IdleSource, sleeper: &dyn Sleeper) -> EscalationState {
        let checkpoint = self.checkpoints[index];
        let previous = index
            .checked_sub(1)
            .map(|prev| self.checkpoints[prev])
            .unwrap_or(0);
        sleeper.sleep(Duration::from_secs(checkpoint.saturating_sub(previous)));

        // A failed sample counts as activity.
        let sample = idle
            .idle_seconds()
            .inspect_err(|err| debug!(error = %err, checkpoint, "idle sample failed"))
            .ok();
        match sample {
            Some(seconds) if seconds >= checkpoint => {
                if index + 1 == self.checkpoints.len() {
                    debug!(checkpoint, idle = seconds, "user away through all checkpoints");
                    EscalationState::Escalated
                } else {
                    EscalationState::CheckpointPending(index + 1)
                }
            }
            other => {
                debug!(checkpoint, idle = ?other, "user active, skipping push");
                EscalationState::Aborted {
                    checkpoint,
                    idle: other,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedIdle {
        samples: RefCell<VecDeque<Result<u64>>>,
    }

    impl ScriptedIdle {
        fn new(samples: Vec<Result<u64>>) -> Self {
            Self {
                samples: RefCell::new(samples.into()),
            }
        }

        fn of(samples: &[u64]) -> Self {
            Self::new(samples.iter().map(|s| Ok(*s)).collect())
        }
    }

    impl IdleSource for ScriptedIdle {
        fn idle_seconds(&self) -> Result<u64> {
            self.samples
                .borrow_mut()
                .pop_front()
                .expect("unexpected idle sample")
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.borrow_mut().push(duration);
        }
    }

    #[test]
    fn empty_checkpoints_are_rejected() {
        let err = IdleEscalation::begin(&[], &ScriptedIdle::of(&[])).err().expect("error");
        assert_eq!(err.kind(), "EmptyCheckpoints");
    }

    #[test]
    fn input_after_baseline_aborts() {
        let idle = ScriptedIdle::of(&[30, 2]);
        let sleeper = RecordingSleeper::default();
        let escalation = IdleEscalation::begin(&[3], &idle).expect("begin");
        assert_eq!(
            escalation.state(),
            &EscalationState::BaselineCaptured { baseline: Some(30) }
        );

        let outcome = escalation.run(&idle, &sleeper);
        assert_eq!(
            outcome,
            EscalationState::Aborted {
                checkpoint: 3,
                idle: Some(2)
            }
        );
        assert_eq!(*sleeper.slept.borrow(), vec![Duration::from_secs(3)]);
    }

    #[test]
    fn staying_idle_escalates() {
        let idle = ScriptedIdle::of(&[30, 30]);
        let sleeper = RecordingSleeper::default();
        let outcome = IdleEscalation::begin(&[3], &idle)
            .expect("begin")
            .run(&idle, &sleeper);
        assert_eq!(outcome, EscalationState::Escalated);
    }

    #[test]
    fn sleeps_the_gaps_between_checkpoints() {
        let idle = ScriptedIdle::of(&[0, 3, 10, 60]);
        let sleeper = RecordingSleeper::default();
        let mut escalation = IdleEscalation::begin(&[3, 10, 60], &idle).expect("begin");

        assert_eq!(escalation.step(&idle, &sleeper), &EscalationState::CheckpointPending(0));
        assert_eq!(escalation.step(&idle, &sleeper), &EscalationState::CheckpointPending(1));
        assert_eq!(escalation.step(&idle, &sleeper), &EscalationState::CheckpointPending(2));
        assert_eq!(escalation.step(&idle, &sleeper), &EscalationState::Escalated);
        assert_eq!(escalation.step(&idle, &sleeper), &EscalationState::Escalated);
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![
                Duration::from_secs(3),
                Duration::from_secs(7),
                Duration::from_secs(50)
            ]
        );
    }

    #[test]
    fn activity_at_later_checkpoint_stops_early() {
        let idle = ScriptedIdle::of(&[100, 5, 4]);
        let sleeper = RecordingSleeper::default();
        let outcome = IdleEscalation::begin(&[3, 10, 60], &idle)
            .expect("begin")
            .run(&idle, &sleeper);
        assert_eq!(
            outcome,
            EscalationState::Aborted {
                checkpoint: 10,
                idle: Some(4)
            }
        );
        assert_eq!(sleeper.slept.borrow().len(), 2);
    }

    #[test]
    fn failed_sample_counts_as_activity() {
        let idle = ScriptedIdle::new(vec![
            Ok(30),
            Err(NotifierError::ToolFailed {
                command: "ioreg".to_string(),
                reason: "boom".to_string(),
            }),
        ]);
        let outcome = IdleEscalation::begin(&[3], &idle)
            .expect("begin")
            .run(&idle, &RecordingSleeper::default());
        assert_eq!(
            outcome,
            EscalationState::Aborted {
                checkpoint: 3,
                idle: None
            }
        );
    }

    #[test]
    fn parses_hid_idle_nanoseconds() {
        let output = "    | |   \"HIDIdleTime\" = 25000000000\n    | |   \"HIDIdleTimeDelta\" = 1";
        assert_eq!(parse_hid_idle(output).expect("parse"), 25);
        assert_eq!(parse_hid_idle("nothing here").unwrap_err().kind(), "ToolFailed");
    }

    #[test]
    fn tty_idle_reads_access_time() {
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let accessed = SystemTime::now() - Duration::from_secs(25);
        let times = std::fs::FileTimes::new().set_accessed(accessed);
        tmp.as_file().set_times(times).expect("set atime");

        let idle = TtyIdle::new(tmp.path()).idle_seconds().expect("idle");
        assert!((25..=27).contains(&idle), "idle was {idle}");
    }
}
