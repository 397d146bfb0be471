//! Juntek JDS6600 DDS generator control (spec.md §4.2.4, §8 scenario:
//! identify + waveform set).
//!
//! Identify reads two registers: `r00` (max output frequency, Hz) and `r01`
//! (serial number). The serial number is the one Juntek field that isn't a
//! numeric parameter with an implicit scale -- it's an opaque alphanumeric
//! string -- so it's parsed directly off the wire line rather than through
//! `scope_proto::juntek::parse_response`'s numeric value list.

use std::time::Duration;

use scope_model::error::{Error, Result};
use scope_proto::juntek::{check_matches, Insn, Request, Response};
use scope_transport::ScpiTransport;

/// In-memory shadow of JDS6600 state (spec.md §3's mirror-state concept,
/// specialized to the fields this driver family exposes).
#[derive(Debug, Clone, PartialEq)]
pub struct JdsMirror {
    /// Register 0 reports this directly in MHz (spec.md §8 scenario: a
    /// response value of `60` is a 60 MHz ceiling, not 60 Hz).
    pub max_frequency_mhz: f64,
    pub serial: String,
    /// Waveform index per channel (CH1 = index 0, CH2 = index 1), per
    /// spec.md §4.2.4's `w2{channel}` waveform-select parameter.
    pub waveform_index: [u8; 2],
}

impl Default for JdsMirror {
    fn default() -> Self {
        Self {
            max_frequency_mhz: 0.0,
            serial: String::new(),
            waveform_index: [0, 0],
        }
    }
}

fn send_line<T: ScpiTransport + ?Sized>(transport: &mut T, req: &Request) -> Result<String> {
    let line = req.encode();
    let line = line.trim_end_matches(['\r', '\n']);
    transport.send(line)?;
    transport.receive_line(Duration::from_secs(1))
}

/// Pull `r01`'s response apart by hand: `:r01=<serial>.`, tolerating the
/// trailing `.` and either line terminator (already stripped by
/// `receive_line`).
fn parse_serial_response(line: &str, expected_index: u8) -> Result<String> {
    let body = line
        .strip_prefix(":r")
        .ok_or_else(|| Error::bad_format(format!("expected ':r' prefix in serial response {line:?}")))?;
    if body.len() < 2 {
        return Err(Error::bad_format(format!("serial response too short: {line:?}")));
    }
    let (index_str, tail) = body.split_at(2);
    let index: u8 = index_str
        .parse()
        .map_err(|_| Error::bad_format(format!("non-numeric index in {line:?}")))?;
    if index != expected_index {
        return Err(Error::bad_format(format!(
            "serial response index {index} doesn't match request {expected_index}"
        )));
    }
    let tail = tail
        .strip_prefix('=')
        .ok_or_else(|| Error::bad_format(format!("serial response missing '=' in {line:?}")))?;
    Ok(tail.strip_suffix('.').unwrap_or(tail).to_string())
}

fn read_numeric(transport: &mut dyn ScpiTransport, index: u8) -> Result<i64> {
    let req = Request::new(Insn::Read, index, vec![0]);
    let line = send_line(transport, &req)?;
    let response = scope_proto::juntek::parse_response(&line)?;
    check_matches(&req, &response)?;
    match response {
        Response::Value { values, .. } => values
            .first()
            .copied()
            .ok_or_else(|| Error::bad_format(format!("empty value list in response to r{index:02}"))),
        Response::Ok => Err(Error::bad_format(format!("unexpected ':ok' reply to r{index:02} read"))),
    }
}

/// `*IDN?`-equivalent for a JDS6600: max frequency (register 0, Hz) and
/// serial number (register 1, opaque string).
pub fn identify(transport: &mut dyn ScpiTransport, mirror: &mut JdsMirror) -> Result<()> {
    mirror.max_frequency_mhz = read_numeric(transport, 0)? as f64;

    let req = Request::new(Insn::Read, 1, vec![0]);
    let line = send_line(transport, &req)?;
    mirror.serial = parse_serial_response(&line, 1)?;

    tracing::debug!(max_frequency_mhz = mirror.max_frequency_mhz, serial = %mirror.serial, "jds6600 identified");
    Ok(())
}

/// Select CH1/CH2's waveform by catalog index (spec.md §4.2.4 `w2{channel}`).
pub fn set_waveform<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    mirror: &mut JdsMirror,
    channel: usize,
    waveform_index: u8,
) -> Result<()> {
    let slot = mirror
        .waveform_index
        .get_mut(channel)
        .ok_or_else(|| Error::invalid_state(format!("no waveform channel {channel}")))?;
    let param_index = 21 + channel as u8;
    let req = Request::new(Insn::Write, param_index, vec![waveform_index as i64]);
    let line = send_line(transport, &req)?;
    let response = scope_proto::juntek::parse_response(&line)?;
    check_matches(&req, &response)?;
    *slot = waveform_index;
    Ok(())
}
