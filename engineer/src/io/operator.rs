//! Questions put to the human operator.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow};

/// Source of operator answers. Tests use scripted implementations.
pub trait Operator {
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Operator reached through a reader/writer pair (stdin/stderr in the CLI).
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalOperator<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        writeln!(self.output, "{question}").context("write question")?;
        self.output.flush().context("flush question")?;
        let mut line = String::new();
        let n = self.input.read_line(&mut line).context("read answer")?;
        if n == 0 {
            return Err(anyhow!("no answer: operator input closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_one_line_and_echoes_question() {
        let mut out = Vec::new();
        let mut op = TerminalOperator::new(&b"build a todo app\nsecond\n"[..], &mut out);
        assert_eq!(op.ask("What?").expect("ask"), "build a todo app");
        assert_eq!(String::from_utf8(out).expect("utf8"), "What?\n");
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut op = TerminalOperator::new(&b""[..], Vec::new());
        assert!(op.ask("What?").is_err());
    }
}
