//! Reference terminal confirmation port.
//!
//! [`CliConfirmationPort`] prints the action to a text output and reads a
//! `y`/`n` answer from a line-based input (stdin by default). It exists for
//! manual testing and as the fallback when nothing else is configured; real
//! frontends should bring their own [`ConfirmationPort`].
//!
//! # Deadlines and abandoned input
//!
//! The whole prompt loop runs on tokio's blocking pool, and the evaluator's
//! deadline covers all of it: typing, invalid answers and re-prompts do not
//! extend it.
//!
//! A blocking read cannot be interrupted. When the deadline elapses the read
//! keeps waiting on its worker thread until input arrives or the source
//! closes, and whatever it reads then is thrown away. The port marks itself
//! abandoned at that point and every later [`confirm`](ConfirmationPort::confirm)
//! fails with [`ConfirmationError::InputAbandoned`], which the evaluator
//! turns into a denial. Build a fresh port over a fresh input to recover.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::action::ActionDescriptor;
use crate::error::ConfirmationError;
use crate::port::ConfirmationPort;

type SharedInput = Arc<Mutex<Box<dyn BufRead + Send>>>;
type SharedOutput = Arc<Mutex<Box<dyn Write + Send>>>;

/// Interactive yes/no prompt over a text input and output.
#[derive(Clone)]
pub struct CliConfirmationPort {
    input: SharedInput,
    output: SharedOutput,
    abandoned: Arc<AtomicBool>,
}

impl CliConfirmationPort {
    /// Prompt on stdout and read answers from stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stdout())
    }

    /// Prompt on `output` and read answers from `input`.
    pub fn with_io<R, W>(input: R, output: W) -> Self
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
            output: Arc::new(Mutex::new(Box::new(output))),
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a timed-out prompt has abandoned the input source.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }
}

impl Default for CliConfirmationPort {
    fn default() -> Self {
        Self::stdio()
    }
}

impl std::fmt::Debug for CliConfirmationPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfirmationPort")
            .field("abandoned", &self.is_abandoned())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ConfirmationPort for CliConfirmationPort {
    async fn confirm(&self, action: &ActionDescriptor) -> Result<bool, ConfirmationError> {
        if self.is_abandoned() {
            return Err(ConfirmationError::InputAbandoned);
        }

        let input = Arc::clone(&self.input);
        let output = Arc::clone(&self.output);
        let action = action.clone();

        let mut pending = PendingPrompt::new(Arc::clone(&self.abandoned), action.name());
        let handle = tokio::task::spawn_blocking(move || {
            let mut input = input.lock().unwrap_or_else(PoisonError::into_inner);
            let mut output = output.lock().unwrap_or_else(PoisonError::into_inner);
            prompt(&action, &mut **input, &mut **output)
        });

        let result = handle.await;
        pending.disarm();

        match result {
            Ok(answer) => answer,
            Err(e) => Err(ConfirmationError::Internal(format!(
                "prompt worker failed: {e}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "cli"
    }

    fn is_available(&self) -> bool {
        !self.is_abandoned()
    }
}

/// Marks the port abandoned if dropped while its prompt is still running.
struct PendingPrompt {
    abandoned: Arc<AtomicBool>,
    action: String,
    armed: bool,
}

impl PendingPrompt {
    fn new(abandoned: Arc<AtomicBool>, action: &str) -> Self {
        Self {
            abandoned,
            action: action.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingPrompt {
    fn drop(&mut self) {
        if self.armed {
            self.abandoned.store(true, Ordering::SeqCst);
            warn!(
                action = %self.action,
                "Confirmation prompt abandoned; terminal input is no longer usable"
            );
        }
    }
}

/// Parsed answer to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Empty,
    Invalid,
}

fn parse_answer(line: &str) -> Answer {
    match line.trim().to_lowercase().as_str() {
        "" => Answer::Empty,
        "y" | "yes" => Answer::Yes,
        "n" | "no" => Answer::No,
        _ => Answer::Invalid,
    }
}

fn render(action: &ActionDescriptor, output: &mut dyn Write) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "--- Confirmation Required ---")?;
    writeln!(output, "  Action:      {}", action.name())?;
    if !action.description().is_empty() {
        writeln!(output, "  Description: {}", action.description())?;
    }
    if let Some(client) = action.client() {
        writeln!(output, "  Client:      {client}")?;
    }
    if !action.arguments().is_empty() {
        let arguments = action
            .pretty_arguments()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(output, "  Arguments:")?;
        for line in arguments.lines() {
            writeln!(output, "    {line}")?;
        }
    }
    writeln!(output, "-----------------------------")?;
    output.flush()
}

/// Run the prompt loop to completion. Blocks on `input`.
fn prompt(
    action: &ActionDescriptor,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<bool, ConfirmationError> {
    render(action, output)?;

    let mut line = String::new();
    loop {
        write!(output, "Approve? (y/n): ")?;
        output.flush()?;

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => return Ok(cancelled(output)),
            Ok(_) => {},
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(cancelled(output)),
            Err(e) => return Err(e.into()),
        }

        match parse_answer(&line) {
            Answer::Yes => {
                debug!(action = %action.name(), "Approved at terminal");
                return Ok(true);
            },
            Answer::No => {
                debug!(action = %action.name(), "Rejected at terminal");
                return Ok(false);
            },
            Answer::Empty => {},
            Answer::Invalid => writeln!(output, "Invalid input. Enter y or n")?,
        }
    }
}

fn cancelled(output: &mut dyn Write) -> bool {
    // Best effort; the answer is a rejection either way.
    let _ = writeln!(output);
    let _ = writeln!(output, "Cancelled (treated as rejection)");
    let _ = output.flush();
    false
}
