//! Line-oriented terminal front-end.
//!
//! Generic over reader/writer so the whole loop can be driven from tests.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use tracing::{error, info};

use crate::error::SessionError;
use crate::prompts::{menu_text, AnalysisOption};
use crate::session::{Exchange, Session};

/// Typing this (any case) ends the conversation.
pub const QUIT_COMMAND: &str = "quit";

/// Shows the menu until a valid option is entered. `None` on end of input.
pub fn prompt_for_option<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<AnalysisOption>> {
    loop {
        write!(output, "{}", menu_text())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match line.parse::<AnalysisOption>() {
            Ok(option) => return Ok(Some(option)),
            Err(e) => writeln!(output, "{}", e)?,
        }
    }
}

pub fn print_exchange<W: Write>(output: &mut W, exchange: &Exchange) -> io::Result<()> {
    writeln!(output, "Assistant: {}", exchange.response)?;
    if let Some(url) = &exchange.artifacts.image_url {
        writeln!(output, "Image URL: {}", url)?;
    }
    if let Some(summary) = &exchange.artifacts.executive_summary {
        writeln!(output, "Executive Summary: {}", summary)?;
    }
    Ok(())
}

/// Runs one conversation: pick an analysis, upload `file`, then exchange turns until `quit`.
pub async fn run_chat<R: BufRead, W: Write>(
    session: &mut Session,
    option: Option<AnalysisOption>,
    file: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    let option = match option {
        Some(option) => option,
        None => match prompt_for_option(input, output)? {
            Some(option) => option,
            None => {
                info!("Input closed before an analysis was selected");
                return Ok(());
            }
        },
    };

    let exchange = match session.start(option, file).await {
        Ok(exchange) => exchange,
        Err(SessionError::Upload(e)) => {
            writeln!(output, "Error uploading file: {}", e)?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to start the analysis: {}", e);
            writeln!(output, "Error: {}", e)?;
            return Ok(());
        }
    };
    writeln!(output, "Conversation started: {}", option.label())?;
    print_exchange(output, &exchange)?;

    loop {
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.eq_ignore_ascii_case(QUIT_COMMAND) {
            break;
        }
        if message.is_empty() {
            continue;
        }

        match session.send(message).await {
            Ok(exchange) => print_exchange(output, &exchange)?,
            Err(e) => {
                error!("Turn failed: {}", e);
                writeln!(output, "Error: {}", e)?;
            }
        }
    }

    session.end();
    writeln!(output, "Conversation ended.")?;
    Ok(())
}
