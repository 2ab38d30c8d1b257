//! Interactive question loop.
//!
//! Reads questions until the quit sentinel or end of input. Generic over
//! reader and writer so the loop is testable without a terminal.

use std::io::{BufRead, Write};

use anyhow::Result;
use issuewise_agent::AgentEngine;

/// Exact input that terminates the loop.
const QUIT_SENTINEL: &str = "q";

/// Prompt shown before each question.
const PROMPT: &str = "Ask a question about github issues (q to quit): ";

/// Run the question loop until the sentinel or EOF.
///
/// Only the line terminator is stripped: the sentinel is an exact match,
/// and blank or whitespace lines are submitted like any other question.
/// A failed answer propagates; there is no per-question resilience layer.
pub async fn run<R: BufRead, W: Write>(
    engine: &AgentEngine,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // EOF behaves like the sentinel.
            writeln!(output)?;
            return Ok(());
        }

        let question = line.strip_suffix('\n').unwrap_or(&line);
        let question = question.strip_suffix('\r').unwrap_or(question);
        if question == QUIT_SENTINEL {
            return Ok(());
        }

        let answer = engine.ask(question).await?;
        writeln!(output, "\n{}\n", answer)?;
    }
}
