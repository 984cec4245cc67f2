//! Three-stage confirmation gate that must approve every deletion.
//!
//! The state machine is pure: [`GateState::next`] takes the next line of
//! input and returns the following state, so it can be driven by a terminal,
//! a scripted prompter in tests, or anything else that yields lines.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rand::Rng;
use tracing::debug;

use crate::errors::{CoreError, Result};

/// The literal word required by the last stage. Case-sensitive.
pub const CONFIRM_WORD: &str = "DELETE";

const OPERAND_MIN: u64 = 1_000_000;
const OPERAND_MAX: u64 = 10_000_000;

/// Held for the lifetime of a session; one live session per process.
static SESSION_SLOT: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    PathMismatch,
    MathMismatch,
    WordMismatch,
    /// Input ended (EOF) or the user cancelled explicitly.
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PathMismatch => "path confirmation did not match",
            Self::MathMismatch => "incorrect answer",
            Self::WordMismatch => "confirmation word did not match",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Two operands whose sum must be typed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub a: u64,
    pub b: u64,
}

impl Challenge {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            a: rng.gen_range(OPERAND_MIN..OPERAND_MAX),
            b: rng.gen_range(OPERAND_MIN..OPERAND_MAX),
        }
    }

    pub fn answer(&self) -> u64 {
        self.a + self.b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    PathConfirmPending,
    MathPending,
    WordConfirmPending,
    Approved,
    Aborted(AbortReason),
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Aborted(_))
    }

    /// Advances on one line of input. `None` means input ended.
    ///
    /// `Idle` ignores its input and opens the first stage; terminal states
    /// never move.
    pub fn next(self, input: Option<&str>, target: &str, challenge: &Challenge) -> GateState {
        if self.is_terminal() {
            return self;
        }
        if self == Self::Idle {
            return Self::PathConfirmPending;
        }
        let Some(raw) = input else {
            return Self::Aborted(AbortReason::Cancelled);
        };
        let line = raw.trim_end_matches(['\n', '\r']);

        match self {
            Self::PathConfirmPending if line == target => Self::MathPending,
            Self::PathConfirmPending => Self::Aborted(AbortReason::PathMismatch),
            Self::MathPending => match line.trim().parse::<u64>() {
                Ok(value) if value == challenge.answer() => Self::WordConfirmPending,
                _ => Self::Aborted(AbortReason::MathMismatch),
            },
            Self::WordConfirmPending if line == CONFIRM_WORD => Self::Approved,
            Self::WordConfirmPending => Self::Aborted(AbortReason::WordMismatch),
            other => other,
        }
    }
}

/// Source of confirmation answers.
pub trait ConfirmationPrompter {
    /// Shows `prompt` and returns the next line, or `None` at end of input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Shows an informational line that expects no answer.
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// Prompter over any line reader and writer, e.g. locked stdin and stderr.
pub struct StreamPrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StreamPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: BufRead, W: Write> ConfirmationPrompter for StreamPrompter<R, W> {
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.writer, "{prompt}")
            .and_then(|_| self.writer.flush())
            .map_err(|err| CoreError::io("<prompt>", err))?;
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|err| CoreError::io("<stdin>", err))?;
        Ok((read > 0).then_some(line))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "{message}").map_err(|err| CoreError::io("<prompt>", err))
    }
}

/// Ephemeral, per-invocation confirmation state. Never persisted.
#[derive(Debug)]
pub struct ConfirmationSession {
    target: PathBuf,
    challenge: Challenge,
    state: GateState,
}

impl ConfirmationSession {
    pub fn new<R: Rng + ?Sized>(target: &Path, rng: &mut R) -> Self {
        Self::with_challenge(target, Challenge::generate(rng))
    }

    pub fn with_challenge(target: &Path, challenge: Challenge) -> Self {
        Self {
            target: target.to_path_buf(),
            challenge,
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn challenge(&self) -> Challenge {
        self.challenge
    }

    /// Feeds one input into the state machine.
    pub fn submit(&mut self, input: Option<&str>) -> GateState {
        let target = self.target.to_string_lossy();
        let next = self.state.next(input, &target, &self.challenge);
        debug!(from = ?self.state, to = ?next, "confirmation gate transition");
        self.state = next;
        next
    }

    /// Prompt for the current stage, if it expects input.
    pub fn prompt(&self) -> Option<String> {
        match self.state {
            GateState::PathConfirmPending => Some("Type the full path to confirm: ".to_string()),
            GateState::MathPending => Some(format!(
                "Solve: {} + {} = ",
                self.challenge.a, self.challenge.b
            )),
            GateState::WordConfirmPending => Some(format!("Type '{CONFIRM_WORD}' to proceed: ")),
            _ => None,
        }
    }

    /// Drives the session to a terminal state. Returns `Ok(())` only when
    /// approved; every other ending is an [`CoreError::Aborted`].
    pub fn run(mut self, prompter: &mut dyn ConfirmationPrompter) -> Result<()> {
        let _slot = SESSION_SLOT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        prompter.notify(&format!(
            "safe-rm: about to move to trash: {}",
            self.target.display()
        ))?;
        self.submit(None);
        while let Some(prompt) = self.prompt() {
            let answer = prompter.ask(&prompt)?;
            self.submit(answer.as_deref());
        }

        match self.state {
            GateState::Approved => Ok(()),
            GateState::Aborted(reason) => {
                prompter.notify(&format!("safe-rm: {reason}, nothing was deleted"))?;
                Err(CoreError::Aborted(reason))
            }
            other => Err(CoreError::conflict(format!(
                "confirmation ended in non-terminal state {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TARGET: &str = "/tmp/foo.txt";
    const CHALLENGE: Challenge = Challenge { a: 3_847_291, b: 5_192_847 };

    fn step(state: GateState, input: &str) -> GateState {
        state.next(Some(input), TARGET, &CHALLENGE)
    }

    #[test]
    fn happy_path_walks_every_stage() {
        let mut state = GateState::Idle.next(None, TARGET, &CHALLENGE);
        assert_eq!(state, GateState::PathConfirmPending);
        state = step(state, "/tmp/foo.txt\n");
        assert_eq!(state, GateState::MathPending);
        state = step(state, "9040138\n");
        assert_eq!(state, GateState::WordConfirmPending);
        state = step(state, "DELETE\n");
        assert_eq!(state, GateState::Approved);
    }

    #[test]
    fn each_stage_aborts_on_mismatch() {
        assert_eq!(
            step(GateState::PathConfirmPending, "/tmp/foo.tx"),
            GateState::Aborted(AbortReason::PathMismatch)
        );
        assert_eq!(
            step(GateState::PathConfirmPending, " /tmp/foo.txt"),
            GateState::Aborted(AbortReason::PathMismatch)
        );
        assert_eq!(
            step(GateState::MathPending, "9040137"),
            GateState::Aborted(AbortReason::MathMismatch)
        );
        assert_eq!(
            step(GateState::MathPending, "yes"),
            GateState::Aborted(AbortReason::MathMismatch)
        );
        assert_eq!(
            step(GateState::WordConfirmPending, "delete"),
            GateState::Aborted(AbortReason::WordMismatch)
        );
        assert_eq!(
            GateState::MathPending.next(None, TARGET, &CHALLENGE),
            GateState::Aborted(AbortReason::Cancelled)
        );
    }

    #[test]
    fn terminal_states_do_not_move() {
        assert_eq!(step(GateState::Approved, "anything"), GateState::Approved);
        let aborted = GateState::Aborted(AbortReason::WordMismatch);
        assert_eq!(step(aborted, "DELETE"), aborted);
    }

    #[test]
    fn challenge_operands_are_large() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let challenge = Challenge::generate(&mut rng);
            assert!((OPERAND_MIN..OPERAND_MAX).contains(&challenge.a));
            assert!((OPERAND_MIN..OPERAND_MAX).contains(&challenge.b));
        }
    }

    #[test]
    fn run_with_stream_prompter_approves() {
        let input = Cursor::new("/tmp/foo.txt\n9040138\nDELETE\n");
        let mut prompter = StreamPrompter::new(input, Vec::new());
        let session = ConfirmationSession::with_challenge(Path::new(TARGET), CHALLENGE);
        session.run(&mut prompter).unwrap();

        let shown = String::from_utf8(prompter.into_writer()).unwrap();
        assert!(shown.contains("Solve: 3847291 + 5192847 = "));
        assert!(shown.contains("Type 'DELETE' to proceed"));
    }

    #[test]
    fn run_stops_at_first_mismatch() {
        let input = Cursor::new("/tmp/foo.txt\n1\nDELETE\n");
        let mut prompter = StreamPrompter::new(input, Vec::new());
        let session = ConfirmationSession::with_challenge(Path::new(TARGET), CHALLENGE);
        let err = session.run(&mut prompter).unwrap_err();
        assert!(matches!(err, CoreError::Aborted(AbortReason::MathMismatch)));

        let shown = String::from_utf8(prompter.into_writer()).unwrap();
        assert!(!shown.contains("Type 'DELETE'"));
    }

    #[test]
    fn run_treats_eof_as_cancel() {
        let mut prompter = StreamPrompter::new(Cursor::new(""), Vec::new());
        let session = ConfirmationSession::with_challenge(Path::new(TARGET), CHALLENGE);
        assert!(matches!(
            session.run(&mut prompter),
            Err(CoreError::Aborted(AbortReason::Cancelled))
        ));
    }
}
