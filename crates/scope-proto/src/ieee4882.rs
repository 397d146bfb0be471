//! IEEE-488.2 "definite-length arbitrary block" header parsing
//! (spec.md §4.2.1).
//!
//! Header is `#NDDDDDDDD` where `N` is an ASCII digit 1-9 giving the count
//! of decimal digits that follow; those digits give the payload byte count.
//! Payload is raw bytes followed by a trailing linefeed.

use scope_model::error::{Error, Result};

/// A parsed block header: the declared payload length and the number of
/// bytes the header itself occupied on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub length: usize,
    pub header_bytes: usize,
}

/// What to do with a just-parsed block, per spec.md §4.2.1's short-block
/// policy for Rigol DS2000 at slow timebases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block looks like the expected frame size; caller should read
    /// `length` payload bytes followed by the trailing LF.
    Full,
    /// Firmware emitted a short block: discard `length + 1` bytes
    /// (including the trailing LF) and await the next header.
    Short,
}

/// Parse a `#NDDDDDDDD` header from the front of `buf`.
///
/// Fails with `BadHeader` if the first byte isn't `#`, the digit-count digit
/// is `0` or non-digit, or the stated length exceeds `max_length`.
pub fn parse_header(buf: &[u8], max_length: usize) -> Result<BlockHeader> {
    if buf.is_empty() || buf[0] != b'#' {
        return Err(Error::bad_header("missing '#' prefix"));
    }
    let digit_count_byte = *buf
        .get(1)
        .ok_or_else(|| Error::bad_header("truncated before digit-count byte"))?;
    if !digit_count_byte.is_ascii_digit() || digit_count_byte == b'0' {
        return Err(Error::bad_header(format!(
            "digit-count byte must be ascii '1'..='9', got {digit_count_byte:#04x}"
        )));
    }
    let digit_count = (digit_count_byte - b'0') as usize;

    let digits = buf
        .get(2..2 + digit_count)
        .ok_or_else(|| Error::bad_header("truncated before length digits"))?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::bad_header("length field contains non-digit bytes"));
    }
    let length_str = std::str::from_utf8(digits).expect("ascii digits are valid utf8");
    let length: usize = length_str
        .parse()
        .map_err(|_| Error::bad_header("length field doesn't fit in usize"))?;

    if length > max_length {
        return Err(Error::bad_header(format!(
            "declared length {length} exceeds cap {max_length}"
        )));
    }

    Ok(BlockHeader {
        length,
        header_bytes: 2 + digit_count,
    })
}

/// Decide whether a parsed header represents a usable ("full") block or a
/// short one that should be discarded (spec.md §4.2.1).
pub fn classify(header: &BlockHeader, expected_frame_size: usize) -> BlockOutcome {
    if header.length < expected_frame_size {
        BlockOutcome::Short
    } else {
        BlockOutcome::Full
    }
}

/// Number of bytes to discard for a short block: the payload plus its
/// trailing linefeed.
pub fn short_block_discard_len(header: &BlockHeader) -> usize {
    header.length + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_header() {
        let h = parse_header(b"#41400<payload...", 1_000_000).unwrap();
        assert_eq!(h.length, 1400);
        assert_eq!(h.header_bytes, 6);
    }

    #[test]
    fn rejects_missing_hash() {
        assert!(parse_header(b"41400", 1_000_000).is_err());
    }

    /// A block header `#10` is rejected (spec.md §8 boundary behavior):
    /// digit-count `0` is invalid.
    #[test]
    fn rejects_zero_digit_count() {
        let err = parse_header(b"#10", 1_000_000).unwrap_err();
        assert!(matches!(err, Error::BadHeader(_)));
    }

    #[test]
    fn rejects_non_digit_length() {
        assert!(parse_header(b"#4abcd", 1_000_000).is_err());
    }

    #[test]
    fn rejects_length_over_cap() {
        assert!(parse_header(b"#72000000", 100).is_err());
    }

    /// A block declaring 2000 bytes is classified `Short` against a
    /// 1400-sample expected frame only if 2000 < 1400 -- doesn't apply here;
    /// use the inverse case from spec.md's DS2072 scenario: `#41300`
    /// declares 1300 bytes against an expected 1400-sample frame.
    #[test]
    fn short_block_is_classified_and_sized_correctly() {
        let h = parse_header(b"#41300", 1_000_000).unwrap();
        assert_eq!(h.length, 1300);
        assert_eq!(classify(&h, 1400), BlockOutcome::Short);
        assert_eq!(short_block_discard_len(&h), 1301);
    }

    #[test]
    fn full_block_is_classified_full() {
        let h = parse_header(b"#41400", 1_000_000).unwrap();
        assert_eq!(classify(&h, 1400), BlockOutcome::Full);
    }
}
