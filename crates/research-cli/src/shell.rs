//! Interactive Shell
//!
//! Line-oriented read-eval-print loop. Each line is a full user turn and
//! runs to completion before the next prompt. Turn errors are printed and
//! the loop carries on.

use std::io::{self, BufRead, Write};

use agent_core::{Agent, Session};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

pub const BANNER: &str = "\n=== 🧠 MiniResearchAgent (Gemini Edition) ===\n\
Ask research or factual questions. Type 'exit' to quit.\n";

const PROMPT: &str = "You: ";
const GOODBYE: &str = "Agent: Goodbye! 👋";
const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "bye"];

/// Shell lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellState {
    AwaitingInput,
    Processing,
    Exiting,
}

/// Whole-line, case-insensitive match against the exit words
pub fn is_exit_command(line: &str) -> bool {
    let line = line.to_lowercase();
    EXIT_COMMANDS.contains(&line.as_str())
}

/// Outcome of one read
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// A line, without its terminator
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// End of input
    Eof,
}

/// Where the shell's lines come from
pub trait LineSource {
    /// Read one line, showing `prompt` if the source draws its own prompt
    fn read_line(&mut self, prompt: &str) -> io::Result<Input>;

    /// Whether `read_line` displays the prompt itself
    fn shows_prompt(&self) -> bool {
        true
    }
}

/// Interactive terminal with line editing and in-memory history
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> io::Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_error)?;
        Ok(Self { editor })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(e) => Err(readline_error(e)),
        }
    }
}

fn readline_error(e: ReadlineError) -> io::Error {
    match e {
        ReadlineError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

/// Reads lines from any buffered reader, such as piped stdin.
///
/// The shell writes the prompt to its own output for this source.
pub struct LineReader<R> {
    reader: R,
}

impl<R: BufRead> LineReader<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for LineReader<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Input> {
        let mut raw = String::new();
        if self.reader.read_line(&mut raw)? == 0 {
            return Ok(Input::Eof);
        }
        Ok(Input::Line(raw.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn shows_prompt(&self) -> bool {
        false
    }
}

pub struct Shell<L, W> {
    agent: Agent,
    session: Session,
    input: L,
    output: W,
    state: ShellState,
}

impl<L: LineSource, W: Write> Shell<L, W> {
    pub fn new(agent: Agent, input: L, output: W) -> Self {
        Self {
            agent,
            session: Session::new(),
            input,
            output,
            state: ShellState::AwaitingInput,
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Print the banner and loop until an exit command or end of input
    pub async fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "{BANNER}")?;

        while self.state != ShellState::Exiting {
            self.step().await?;
        }

        Ok(())
    }

    /// Read one line and act on it
    pub async fn step(&mut self) -> io::Result<ShellState> {
        if !self.input.shows_prompt() {
            write!(self.output, "{PROMPT}")?;
        }
        self.output.flush()?;

        let line = match self.input.read_line(PROMPT)? {
            Input::Line(line) => line,
            Input::Interrupted => {
                writeln!(self.output, "^C (type 'exit' to quit)")?;
                return Ok(self.state);
            }
            Input::Eof => {
                writeln!(self.output)?;
                self.state = ShellState::Exiting;
                return Ok(self.state);
            }
        };

        if is_exit_command(&line) {
            writeln!(self.output, "{GOODBYE}")?;
            self.state = ShellState::Exiting;
            return Ok(self.state);
        }

        if line.trim().is_empty() {
            return Ok(self.state);
        }

        self.state = ShellState::Processing;
        match self.session.ask(&self.agent, &line).await {
            Ok(answer) => writeln!(self.output, "\nAgent: {answer}\n")?,
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), error = %e, "Turn failed");
                writeln!(self.output, "[Error] {e}")?;
            }
        }
        self.state = ShellState::AwaitingInput;

        Ok(self.state)
    }
}

#[cfg(test)]
impl<L, W> Shell<L, W> {
    const fn state(&self) -> ShellState {
        self.state
    }

    const fn output(&self) -> &W {
        &self.output
    }
}
