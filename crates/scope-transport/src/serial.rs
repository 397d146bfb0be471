//! Serial-line transport (spec.md §4.1): identical contract to line-oriented
//! SCPI, but with flush semantics and per-chunk read timeouts; tolerates an
//! optional `<CR>` before `<LF>` and a trailing `.`.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use scope_model::error::{Error, Result};

use crate::scpi::ScpiTransport;

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32, open_timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(open_timeout)
            .open()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(Self { port })
    }

    fn read_byte(&mut self, deadline: Instant) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
            match self.port.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

impl ScpiTransport for SerialTransport {
    fn send(&mut self, line: &str) -> Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }

    fn receive_line(&mut self, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        loop {
            let byte = self.read_byte(deadline)?;
            if byte == b'\n' {
                break;
            }
            line.push(byte);
        }
        // Tolerate an optional trailing `<CR>` before the `<LF>` and a
        // trailing `.` terminator some firmwares append.
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.last() == Some(&b'.') {
            line.pop();
        }
        String::from_utf8(line).map_err(|e| Error::bad_format(format!("non-utf8 line: {e}")))
    }

    fn receive_raw(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut buf = Vec::with_capacity(len);
        while buf.len() < len {
            buf.push(self.read_byte(deadline)?);
        }
        Ok(buf)
    }
}
