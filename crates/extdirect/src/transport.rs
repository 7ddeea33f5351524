//! Newline-delimited router transport.
//!
//! Each input line is a complete router body (a call object or a batch
//! array); each output line is the matching response. This lets a provider
//! be driven over pipes or sockets without an HTTP layer:
//!
//! ```text
//! > {"action":"myclass","method":"myview","data":[1,2,3,4],"tid":1}
//! < {"type":"rpc","tid":1,"action":"myclass","method":"myview","result":13.37}
//! ```

use std::io::{self, BufRead, Read, Write};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dispatch::{DispatchError, RouterResponse, RpcResponse};
use crate::provider::Provider;

/// Tracing target for transport operations.
pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Errors raised while serving a stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading requests or writing responses failed.
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes router responses as JSONL lines.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps an output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_response(&mut self, response: &RouterResponse) -> Result<(), TransportError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Serves router bodies read line by line until EOF.
///
/// Blank lines are skipped. A line longer than the configured
/// `max_request_bytes` is answered with the malformed envelope and ends the
/// stream, since the remainder of that line cannot be resynchronised
/// cheaply. Reads interrupted by signals are retried.
///
/// Returns the number of requests answered.
///
/// # Errors
///
/// Returns [`TransportError`] when the underlying reader or writer fails.
pub fn serve_lines<C, R, W>(
    provider: &Provider<C>,
    context: &C,
    mut reader: R,
    writer: W,
) -> Result<usize, TransportError>
where
    R: BufRead,
    W: Write,
{
    let limit = provider.config().max_request_bytes();
    let mut writer = ResponseWriter::new(writer);
    let mut line = Vec::new();
    let mut served = 0_usize;

    loop {
        line.clear();
        if read_request_line(&mut reader, &mut line, limit)? == 0 {
            debug!(target: TRANSPORT_TARGET, served, "input closed");
            break;
        }

        let body = strip_line_ending(&line);
        if body.len() > limit {
            let error = DispatchError::request_too_large(body.len(), limit);
            warn!(target: TRANSPORT_TARGET, %error, "closing stream after oversized line");
            writer.write_response(&RouterResponse::Single(RpcResponse::malformed(
                Value::Null,
                &error,
            )))?;
            served += 1;
            break;
        }
        if body.trim_ascii().is_empty() {
            continue;
        }

        let response = provider.dispatcher().route(body, context);
        writer.write_response(&response)?;
        writer.flush()?;
        served += 1;
    }

    writer.flush()?;
    Ok(served)
}

/// Reads one line, consuming at most `limit` bytes plus a `\r\n` ending.
///
/// A return of zero means EOF. `BufRead::read_until` retries interrupted
/// reads itself.
fn read_request_line<R: BufRead>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    limit: usize,
) -> io::Result<usize> {
    let bound = u64::try_from(limit.saturating_add(2)).unwrap_or(u64::MAX);
    reader.by_ref().take(bound).read_until(b'\n', buffer)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
