//! Siglent descriptor block (spec.md §4.2.2).
//!
//! A fixed 363-byte preamble precedes waveform samples. At offset 36 lies a
//! little-endian 32-bit "descriptor length"; at offset 60 lies a 32-bit
//! "data length". Samples follow at `block_header_size = descriptor_length
//! + 15`.

use scope_model::error::{Error, Result};

pub const PREAMBLE_LEN: usize = 363;
const DESCRIPTOR_LENGTH_OFFSET: usize = 36;
const DATA_LENGTH_OFFSET: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiglentDescriptor {
    pub descriptor_length: u32,
    pub data_length: u32,
    /// Offset from the start of the preamble at which sample bytes begin.
    pub block_header_size: u32,
}

pub fn parse_preamble(buf: &[u8]) -> Result<SiglentDescriptor> {
    if buf.len() < PREAMBLE_LEN {
        return Err(Error::BadFormat(format!(
            "preamble too short: {} < {PREAMBLE_LEN}",
            buf.len()
        )));
    }
    let descriptor_length = read_u32_le(buf, DESCRIPTOR_LENGTH_OFFSET)?;
    let data_length = read_u32_le(buf, DATA_LENGTH_OFFSET)?;
    Ok(SiglentDescriptor {
        descriptor_length,
        data_length,
        block_header_size: descriptor_length + 15,
    })
}

fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = buf
        .get(offset..offset + 4)
        .ok_or_else(|| Error::BadFormat(format!("buffer too short to read u32 at {offset}")))?
        .try_into()
        .expect("slice of len 4");
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preamble_with(descriptor_length: u32, data_length: u32) -> Vec<u8> {
        let mut buf = vec![0u8; PREAMBLE_LEN];
        buf[DESCRIPTOR_LENGTH_OFFSET..DESCRIPTOR_LENGTH_OFFSET + 4]
            .copy_from_slice(&descriptor_length.to_le_bytes());
        buf[DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + 4].copy_from_slice(&data_length.to_le_bytes());
        buf
    }

    #[test]
    fn parses_descriptor_and_computes_header_size() {
        let buf = preamble_with(346, 1400);
        let d = parse_preamble(&buf).unwrap();
        assert_eq!(d.descriptor_length, 346);
        assert_eq!(d.data_length, 1400);
        assert_eq!(d.block_header_size, 361);
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = vec![0u8; 10];
        assert!(parse_preamble(&buf).is_err());
    }
}
