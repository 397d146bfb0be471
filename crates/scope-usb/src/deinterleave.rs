//! DSLogic deinterleave contract (spec.md §4.4).
//!
//! For each 64-sample aligned window, the device emits `enabled_channel_count`
//! consecutive 64-bit little-endian words, lowest-indexed enabled channel
//! first. Bit `k` of logic sample `i` is bit `i mod 64` of the `k`-th
//! channel's word for window `i / 64`. Disabled channel bits are zero.

use scope_model::error::{Error, Result};

const WORD_BYTES: usize = 8;
const WINDOW_SAMPLES: usize = 64;

/// Deinterleave one payload chunk into 16-bit logic samples.
///
/// `enabled_channels` lists channel indices in ascending order (the order
/// the device emits their words in); each must be `< 16` since the output
/// unit is `u16` (spec.md §6: `unitsize` is 1 or 2 bytes for non-DSLogic
/// sources, but DSLogic's own stream is always 16-bit-packed per channel
/// bit here and narrowed to `unitsize` bytes by the caller when emitting
/// packets).
pub fn deinterleave(payload: &[u8], enabled_channels: &[usize]) -> Result<Vec<u16>> {
    for &ch in enabled_channels {
        if ch >= 16 {
            return Err(Error::invalid_state(format!(
                "channel index {ch} out of range for 16-bit deinterleave output"
            )));
        }
    }
    let words_per_window = enabled_channels.len();
    let window_bytes = words_per_window * WORD_BYTES;
    if window_bytes == 0 || payload.len() % window_bytes != 0 {
        return Err(Error::bad_format(format!(
            "payload length {} isn't a multiple of window size {window_bytes}",
            payload.len()
        )));
    }
    let windows = payload.len() / window_bytes;
    let mut out = vec![0u16; windows * WINDOW_SAMPLES];

    for (w, window_bytes_slice) in payload.chunks_exact(window_bytes).enumerate() {
        for (word_index, &ch) in enabled_channels.iter().enumerate() {
            let start = word_index * WORD_BYTES;
            let word_bytes: [u8; 8] = window_bytes_slice[start..start + WORD_BYTES]
                .try_into()
                .expect("slice of len 8");
            let word = u64::from_le_bytes(word_bytes);
            for i in 0..WINDOW_SAMPLES {
                if (word >> i) & 1 == 1 {
                    out[w * WINDOW_SAMPLES + i] |= 1u16 << ch;
                }
            }
        }
    }
    Ok(out)
}

/// Pack a window's worth of 64-bit per-channel words the way the device
/// would, for constructing synthetic test buffers.
pub fn interleave_window(channel_words: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(channel_words.len() * WORD_BYTES);
    for word in channel_words {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// The deinterleaver is the inverse of the device's interleaver: given
    /// each channel's own known 64-bit pattern, extracting that channel's
    /// bit back out of every window's output samples reconstructs the
    /// pattern exactly (spec.md §8).
    #[test]
    fn recovers_per_channel_pattern_with_distinct_words() {
        let patterns: [u64; 4] = [0xA5A5_A5A5_A5A5_A5A5, 0x0000_0000_FFFF_FFFF, 1, u64::MAX];
        let enabled = [0, 1, 2, 3];
        let payload = interleave_window(&patterns);
        let samples = deinterleave(&payload, &enabled).unwrap();
        assert_eq!(samples.len(), 64);
        for (ch, &pattern) in enabled.iter().zip(patterns.iter()) {
            for i in 0..64 {
                let expected_bit = (pattern >> i) & 1;
                let got_bit = (samples[i] >> ch) & 1;
                assert_eq!(got_bit as u64, expected_bit, "channel {ch} sample {i}");
            }
        }
    }

    #[test]
    fn disabled_channel_bits_are_always_zero() {
        let patterns: [u64; 2] = [u64::MAX, u64::MAX];
        // Only channels 0 and 2 are "enabled" (word order still ascending).
        let enabled = [0, 2];
        let payload = interleave_window(&patterns);
        let samples = deinterleave(&payload, &enabled).unwrap();
        for sample in samples {
            assert_eq!((sample >> 1) & 1, 0, "channel 1 must stay zero");
            assert_eq!((sample >> 3) & 1, 0, "channel 3 must stay zero");
        }
    }

    #[test]
    fn rejects_misaligned_payload() {
        let enabled = [0, 1];
        assert!(deinterleave(&[0u8; 10], &enabled).is_err());
    }

    proptest! {
        #[test]
        fn every_window_round_trips_for_arbitrary_patterns(
            p0: u64, p1: u64, p2: u64,
        ) {
            let patterns = [p0, p1, p2];
            let enabled = [0usize, 1, 2];
            let payload = interleave_window(&patterns);
            let samples = deinterleave(&payload, &enabled).unwrap();
            for (ch, &pattern) in enabled.iter().zip(patterns.iter()) {
                for i in 0..64 {
                    let expected_bit = (pattern >> i) & 1;
                    let got_bit = (samples[i] >> ch) & 1;
                    prop_assert_eq!(got_bit as u64, expected_bit);
                }
            }
        }
    }
}
