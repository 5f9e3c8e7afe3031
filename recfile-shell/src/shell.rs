//! Line-oriented command loop
//!
//! Each command is a single letter on its own line, followed by one line per
//! argument:
//!
//! ```text
//! i          insert: key, label, attribute
//! c          query: key
//! r          remove: key
//! p          print live records
//! d          dump every slot
//! e          exit
//! ```

use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use tracing::{debug, error};

use recfile_engine::operations::{Dispatcher, OperationCode, OperationRequest, Reply};
use recfile_engine::storage::Backend;

use crate::render::render;

/// Reasons a command could not be turned into a request
#[derive(Debug, PartialEq, Eq)]
enum ParseError {
    /// Input ended in the middle of a command
    Truncated,
    Invalid(String),
}

fn next_line<R: BufRead>(lines: &mut std::io::Lines<R>) -> Result<Option<String>> {
    Ok(lines.next().transpose()?)
}

fn read_request<R: BufRead>(
    code: OperationCode,
    lines: &mut std::io::Lines<R>,
) -> Result<std::result::Result<OperationRequest, ParseError>> {
    let mut args = Vec::with_capacity(code.arity());
    for _ in 0..code.arity() {
        match next_line(lines)? {
            Some(line) => args.push(line),
            None => return Ok(Err(ParseError::Truncated)),
        }
    }

    let key = |text: &str| {
        text.trim()
            .parse::<u32>()
            .map_err(|_| ParseError::Invalid(format!("invalid key: {}", text.trim())))
    };

    Ok(match code {
        OperationCode::Insert => {
            let attribute = args[2].trim();
            match (key(&args[0]), attribute.parse::<u8>()) {
                (Ok(k), Ok(a)) => Ok(OperationRequest::insert(k, args[1].clone(), a)),
                (Err(e), _) => Err(e),
                (_, Err(_)) => Err(ParseError::Invalid(format!(
                    "invalid attribute: {} (expected 0-255)",
                    attribute
                ))),
            }
        }
        OperationCode::Query => key(&args[0]).map(OperationRequest::query),
        OperationCode::Remove => key(&args[0]).map(OperationRequest::remove),
        other => Ok(OperationRequest::new(other)),
    })
}

/// Read commands from `input` until `e` or end of input
///
/// Errors that mean the file can no longer be trusted end the loop with an
/// error; everything else is reported and the loop carries on.
pub fn run<B, R, W>(dispatcher: &mut Dispatcher<B>, input: R, mut out: W, unit: &str) -> Result<()>
where
    B: Backend,
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();

    while let Some(line) = next_line(&mut lines)? {
        if line.trim().is_empty() {
            continue;
        }
        let code = OperationCode::from_raw(&line);

        let request = match read_request(code, &mut lines)? {
            Ok(request) => request,
            Err(ParseError::Truncated) => {
                debug!("Input ended inside '{}' command", code.as_raw());
                break;
            }
            Err(ParseError::Invalid(message)) => {
                writeln!(out, "{}", message)?;
                continue;
            }
        };

        let response = dispatcher.execute(request);
        for text in render(&response, unit) {
            writeln!(out, "{}", text)?;
        }
        out.flush()?;

        match (&response.result, response.status()) {
            (Ok(Reply::Stop), _) => break,
            (Err(e), Some(kind)) if !kind.is_recoverable() => {
                error!("Stopping after unrecoverable error: {}", e);
                bail!("{}", e);
            }
            _ => {}
        }
    }

    Ok(())
}
