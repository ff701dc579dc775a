//! Asking the operator how to resolve a rejected edit.

use std::io::{self, BufRead, Write};

/// Operator decision after validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Reopen the editor on the staged file.
    Edit,
    /// Discard the staged changes and leave the target alone.
    Exit,
    /// Commit the rejected content anyway.
    ForceCommit,
}

/// Source of operator decisions.
pub trait Operator {
    /// Blocks until the operator picks a [`Choice`].
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while talking to the operator.
    fn choose(&mut self) -> io::Result<Choice>;
}

/// Line-oriented prompt: `e` edits again, `x` exits, `Q` forces a commit.
///
/// Answers are read as raw bytes and only the first byte of the line counts,
/// so a leading blank or a non-UTF-8 answer is simply not a choice. Anything
/// else lists the options and asks again; end of input means exit.
#[derive(Debug)]
pub struct Prompt<R, W> {
    input: R,
    output: W,
    subject: String,
    allow_force_commit: bool,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    /// Creates a prompt that names `subject` in its option list.
    pub fn new(input: R, output: W, subject: impl Into<String>) -> Self {
        Self {
            input,
            output,
            subject: subject.into(),
            allow_force_commit: true,
        }
    }

    /// Offers or withholds the force-commit option.
    #[must_use]
    pub fn allow_force_commit(mut self, allowed: bool) -> Self {
        self.allow_force_commit = allowed;
        self
    }

    fn interpret(&self, answer: &[u8]) -> Option<Choice> {
        match answer.first()? {
            b'e' => Some(Choice::Edit),
            b'x' => Some(Choice::Exit),
            b'Q' if self.allow_force_commit => Some(Choice::ForceCommit),
            _ => None,
        }
    }

    fn list_options(&mut self) -> io::Result<()> {
        writeln!(self.output, "Options are:")?;
        writeln!(self.output, "  (e)dit {} again", self.subject)?;
        writeln!(self.output, "  e(x)it without saving changes to {}", self.subject)?;
        if self.allow_force_commit {
            writeln!(
                self.output,
                "  (Q)uit and save changes to {} (DANGER!)",
                self.subject
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Operator for Prompt<R, W> {
    fn choose(&mut self) -> io::Result<Choice> {
        loop {
            write!(self.output, "What now? ")?;
            self.output.flush()?;

            let mut answer = Vec::new();
            if self.input.read_until(b'\n', &mut answer)? == 0 {
                writeln!(self.output)?;
                return Ok(Choice::Exit);
            }
            if let Some(choice) = self.interpret(&answer) {
                return Ok(choice);
            }
            self.list_options()?;
        }
    }
}
