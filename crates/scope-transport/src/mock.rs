//! An in-memory scripted transport for exercising the acquisition state
//! machine and codecs without real hardware (spec.md §8's end-to-end
//! scenarios are written directly against this).

use std::collections::VecDeque;
use std::time::Duration;

use scope_model::error::{Error, Result};

use crate::scpi::ScpiTransport;

enum Expect {
    Exact(String),
    Any,
}

struct ScriptStep {
    expect: Expect,
    response: Vec<u8>,
}

/// A transport whose responses are scripted in advance, consumed strictly
/// in the order they were recorded.
#[derive(Default)]
pub struct MockTransport {
    steps: VecDeque<ScriptStep>,
    buffer: VecDeque<u8>,
    pub sent: Vec<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the next `send` to equal `cmd` exactly, then queue `response`
    /// bytes to be drained by subsequent `receive_line`/`receive_raw` calls.
    pub fn expect(mut self, cmd: &str, response: impl Into<Vec<u8>>) -> Self {
        self.steps.push_back(ScriptStep {
            expect: Expect::Exact(cmd.to_string()),
            response: response.into(),
        });
        self
    }

    /// Like [`Self::expect`] but accepts any command (used when the exact
    /// line isn't interesting to a test).
    pub fn expect_any(mut self, response: impl Into<Vec<u8>>) -> Self {
        self.steps.push_back(ScriptStep {
            expect: Expect::Any,
            response: response.into(),
        });
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

impl ScpiTransport for MockTransport {
    fn send(&mut self, line: &str) -> Result<()> {
        self.sent.push(line.to_string());
        let step = self
            .steps
            .pop_front()
            .ok_or_else(|| Error::invalid_state("mock transport script exhausted"))?;
        if let Expect::Exact(cmd) = &step.expect {
            if cmd != line {
                return Err(Error::invalid_state(format!(
                    "mock transport expected {cmd:?}, got {line:?}"
                )));
            }
        }
        self.buffer.extend(step.response);
        Ok(())
    }

    fn receive_line(&mut self, _timeout: Duration) -> Result<String> {
        let mut line = Vec::new();
        loop {
            match self.buffer.pop_front() {
                Some(b'\n') => break,
                Some(b) => line.push(b),
                None => return Err(Error::Timeout),
            }
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line).map_err(|e| Error::bad_format(format!("non-utf8 line: {e}")))
    }

    fn receive_raw(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>> {
        if self.buffer.len() < len {
            return Err(Error::ShortRead {
                expected: len,
                actual: self.buffer.len(),
            });
        }
        Ok(self.buffer.drain(..len).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_scripted_exchange() {
        let mut t = MockTransport::new().expect("*IDN?", "RIGOL,DS2072,SN1,FW1\n".as_bytes().to_vec());
        t.send("*IDN?").unwrap();
        let line = t.receive_line(Duration::from_secs(1)).unwrap();
        assert_eq!(line, "RIGOL,DS2072,SN1,FW1");
    }

    #[test]
    fn rejects_unexpected_command() {
        let mut t = MockTransport::new().expect("*IDN?", vec![]);
        assert!(t.send(":WAV:DATA?").is_err());
    }
}
