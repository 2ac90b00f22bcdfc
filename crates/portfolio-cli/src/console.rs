//! Terminal input and rendering of streamed agent output

use agent_core::{Result, RunContext, SegmentStream};
use agent_workflow::RelayedSegment;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub const RULE_WIDTH: usize = 70;
pub const QUIT: &str = "quit";

pub fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

/// Line-oriented prompt on stdin
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Show `prompt` and read one line
    ///
    /// Returns `None` at end of input or when the user typed the quit word.
    pub async fn read(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;

        match self.lines.next_line().await? {
            Some(line) if line.trim() == QUIT => Ok(None),
            Some(line) => Ok(Some(line)),
            None => {
                println!();
                Ok(None)
            }
        }
    }
}

/// Drive `turn` to completion, cancelling `ctx` if Ctrl-C arrives first
///
/// The turn is still awaited after cancellation so that it can unwind and
/// report `Cancelled` itself.
pub async fn interruptible<F, T>(ctx: &RunContext, turn: F) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(turn);
    tokio::select! {
        out = &mut turn => return out,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, cancelling the running turn");
            ctx.cancel();
        }
    }
    turn.await
}

/// Write every fragment of a single agent's stream as it arrives
pub async fn write_segments<W: Write>(out: &mut W, mut stream: SegmentStream<'_>) -> Result<String> {
    let mut text = String::new();
    while let Some(segment) = stream.next().await {
        let segment = segment?;
        text.push_str(&segment.text);
        write_flushed(out, &segment.text);
    }
    Ok(text)
}

/// Write a relayed workflow stream, opening a section per producing agent
pub async fn write_relay<W, S>(out: &mut W, mut relay: S) -> Result<()>
where
    W: Write,
    S: Stream<Item = Result<RelayedSegment>> + Unpin,
{
    let mut sections = 0usize;
    while let Some(relayed) = relay.next().await {
        let relayed = relayed?;
        if relayed.new_attribution {
            if sections > 0 {
                write_flushed(out, &format!("\n{}\n\n", rule('-')));
            }
            sections += 1;
            write_flushed(
                out,
                &format!("[{}]\n{}\n", relayed.segment.agent_name, rule('-')),
            );
        }
        write_flushed(out, &relayed.segment.text);
    }
    Ok(())
}

fn write_flushed<W: Write>(out: &mut W, text: &str) {
    if text.is_empty() {
        return;
    }
    // Console write failures are logged and otherwise ignored
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        tracing::debug!(error = %e, "Failed to write to the console");
    }
}
