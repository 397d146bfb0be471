//! Juntek textual request/response protocol (spec.md §4.2.4), used by the
//! JDS6600-class DDS generator.
//!
//! Grammar: `":" insn digit{2} "=" value {"," value} "."? EOL`, where
//! `insn ∈ {'w','r','a','b'}`. Write-responses may shorten to `":ok"`.
//! Responses tolerate either `<LF>` or `<CR><LF>`.

use scope_model::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insn {
    Write,
    Read,
    WaveformA,
    WaveformB,
}

impl Insn {
    fn to_char(self) -> char {
        match self {
            Insn::Write => 'w',
            Insn::Read => 'r',
            Insn::WaveformA => 'a',
            Insn::WaveformB => 'b',
        }
    }

    fn from_char(c: char) -> Result<Self> {
        match c {
            'w' => Ok(Insn::Write),
            'r' => Ok(Insn::Read),
            'a' => Ok(Insn::WaveformA),
            'b' => Ok(Insn::WaveformB),
            other => Err(Error::BadFormat(format!("unknown instruction char '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub insn: Insn,
    pub index: u8,
    pub values: Vec<i64>,
}

impl Request {
    pub fn new(insn: Insn, index: u8, values: Vec<i64>) -> Self {
        Self { insn, index, values }
    }

    /// Full form with trailing `.` then `<CR><LF>`, the most compatible
    /// encoding (spec.md §6).
    pub fn encode(&self) -> String {
        let values = self
            .values
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(":{}{:02}={}.\r\n", self.insn.to_char(), self.index, values)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Value {
        insn: Insn,
        index: u8,
        values: Vec<i64>,
    },
}

/// Parse a single response line, tolerant of a trailing `.`, and of either
/// `<LF>` or `<CR><LF>` termination.
pub fn parse_response(line: &str) -> Result<Response> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed == ":ok" {
        return Ok(Response::Ok);
    }
    let body = trimmed
        .strip_prefix(':')
        .ok_or_else(|| Error::BadFormat("response missing ':' prefix".into()))?;
    let mut chars = body.chars();
    let insn_char = chars
        .next()
        .ok_or_else(|| Error::BadFormat("empty response body".into()))?;
    let insn = Insn::from_char(insn_char)?;
    let rest: String = chars.collect();
    if rest.len() < 2 {
        return Err(Error::BadFormat("response too short for two-digit index".into()));
    }
    let (index_str, tail) = rest.split_at(2);
    let index: u8 = index_str
        .parse()
        .map_err(|_| Error::BadFormat(format!("non-numeric index {index_str:?}")))?;
    let tail = tail
        .strip_prefix('=')
        .ok_or_else(|| Error::BadFormat("response missing '=' after index".into()))?;
    let tail = tail.strip_suffix('.').unwrap_or(tail);
    let values = tail
        .split(',')
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| Error::BadFormat(format!("non-numeric value {v:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Response::Value { insn, index, values })
}

/// Confirm a response's opcode and index match the originating request
/// (spec.md §4.2.4: "rejects responses whose opcode or index does not match
/// the request").
pub fn check_matches(request: &Request, response: &Response) -> Result<()> {
    match response {
        Response::Ok => Ok(()),
        Response::Value { insn, index, .. } => {
            if *insn != request.insn || *index != request.index {
                Err(Error::BadFormat(format!(
                    "response {insn:?}{index:02} doesn't match request {:?}{:02}",
                    request.insn, request.index
                )))
            } else {
                Ok(())
            }
        }
    }
}

/// Frequency is encoded as centi-Hz while it fits in the exact-precision
/// range (<= 1 MHz), and falls back to hecto-Hz (100 Hz units) above that
/// to keep the encoded magnitude bounded, matching spec.md §8's round-trip
/// tolerances (0.01 Hz <= 1 MHz, 100 Hz <= 60 MHz).
const FREQUENCY_SCALE_THRESHOLD_HZ: f64 = 1_000_000.0;

pub fn encode_frequency(freq_hz: f64) -> (i64, u8) {
    if freq_hz.abs() <= FREQUENCY_SCALE_THRESHOLD_HZ {
        ((freq_hz * 100.0).round() as i64, 0)
    } else {
        ((freq_hz / 100.0).round() as i64, 1)
    }
}

pub fn decode_frequency(value: i64, scale_index: u8) -> f64 {
    match scale_index {
        0 => value as f64 / 100.0,
        _ => value as f64 * 100.0,
    }
}

/// Voltages as millivolts.
pub fn encode_voltage(volts: f64) -> i64 {
    (volts * 1000.0).round() as i64
}

pub fn decode_voltage(value: i64) -> f64 {
    value as f64 / 1000.0
}

/// Biases as centi-volts biased by +10 V.
pub fn encode_bias(bias_volts: f64) -> i64 {
    ((bias_volts + 10.0) * 100.0).round() as i64
}

pub fn decode_bias(value: i64) -> f64 {
    value as f64 / 100.0 - 10.0
}

/// Duties as per-mille, clamped to the physical range [0, 1] (spec.md
/// §4.2.4: "rejects values outside the physical range by clamping in set").
pub fn encode_duty(duty_fraction: f64) -> i64 {
    (duty_fraction.clamp(0.0, 1.0) * 1000.0).round() as i64
}

pub fn decode_duty(value: i64) -> f64 {
    value as f64 / 1000.0
}

/// Phases as deci-degrees, clamped to [0, 360) degrees.
pub fn encode_phase(phase_degrees: f64) -> i64 {
    let clamped = phase_degrees.rem_euclid(360.0);
    (clamped * 10.0).round() as i64
}

pub fn decode_phase(value: i64) -> f64 {
    value as f64 / 10.0
}
