//! Line-oriented SCPI transport (spec.md §4.1).
//!
//! `send` appends a newline and writes the whole buffer; `receive_line`
//! reads until newline; `get_block` reads a 488.2 block (§4.2.1);
//! `get_opc` issues `*OPC?` and blocks until `1` is returned.

use std::time::Duration;

use scope_model::error::{Error, Result};
use scope_proto::ieee4882;

/// Implemented by any line-oriented instrument connection: serial ports,
/// USB-TMC pipes wrapped in a byte stream, or a mock for tests.
pub trait ScpiTransport {
    /// Append `\n` and write the whole buffer. Never blocks longer than an
    /// implementation-defined write timeout.
    fn send(&mut self, line: &str) -> Result<()>;

    /// Read until (and including) the next `\n`, honoring `timeout`.
    /// Returns the line with trailing `\r\n`/`\n` stripped.
    fn receive_line(&mut self, timeout: Duration) -> Result<String>;

    /// Read exactly `max_len`-capped raw bytes, bypassing line framing.
    /// Used for block payload reads after the header has been parsed.
    fn receive_raw(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>>;
}

/// Read a 488.2 definite-length block: header via `receive_line`-style
/// byte-at-a-time scanning isn't appropriate for binary payloads, so the
/// header bytes are read directly off the stream and the payload follows.
pub fn get_block<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
    max_len: usize,
) -> Result<Vec<u8>> {
    // The header is at most 2 + 9 = 11 bytes (`#` + one digit-count digit +
    // up to 9 length digits); read a small probe window first.
    let probe = transport.receive_raw(11, timeout)?;
    let header = ieee4882::parse_header(&probe, max_len)?;
    let mut payload = probe[header.header_bytes..].to_vec();
    if payload.len() < header.length {
        let remaining = header.length - payload.len();
        let rest = transport.receive_raw(remaining, timeout)?;
        payload.extend_from_slice(&rest);
    } else {
        payload.truncate(header.length);
    }
    // Consume the trailing linefeed.
    let _ = transport.receive_raw(1, timeout);
    Ok(payload)
}

/// Issue `*OPC?` and block until `1` is returned (spec.md §4.1).
pub fn get_opc<T: ScpiTransport + ?Sized>(transport: &mut T, timeout: Duration) -> Result<()> {
    transport.send("*OPC?")?;
    let line = transport.receive_line(timeout)?;
    if line.trim() == "1" {
        Ok(())
    } else {
        Err(Error::bad_format(format!("*OPC? returned {line:?}, expected \"1\"")))
    }
}
