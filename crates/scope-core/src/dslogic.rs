//! DSLogic-class USB logic analyzer acquisition (spec.md §4.3's
//! `WAIT_TRIG_POS` state, §4.4 USB transfer pool/deinterleave/splitter,
//! §4.7 trigger compiler).

use std::time::Duration;

use scope_model::error::{Error, Result};
use scope_usb::{deinterleave, SplitItem, TriggerOffsetSplitter};
use scope_transport::usb::{UsbTransferOutcome, UsbTransport};

use crate::packet::Packet;

fn submit_and_wait<T: UsbTransport + ?Sized>(transport: &mut T, endpoint: u8, buf_len: usize, timeout: Duration) -> Result<Vec<u8>> {
    transport.submit_in(endpoint, buf_len, timeout)?;
    let completion = transport
        .poll_completions()
        .into_iter()
        .next()
        .ok_or_else(|| Error::invalid_state("no usb completion available"))?;
    match completion.outcome {
        UsbTransferOutcome::Ok | UsbTransferOutcome::TimedOutPartial => Ok(completion.payload),
        UsbTransferOutcome::NoDevice => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "device disconnected mid-transfer",
        ))),
        UsbTransferOutcome::TimedOutEmpty => Err(Error::Timeout),
        UsbTransferOutcome::Cancelled => Err(Error::invalid_state("transfer cancelled")),
    }
}

fn pack_logic_samples(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// One `WAIT_TRIG_POS -> READ_BLOCK -> NEXT_CHANNEL -> FRAME_END` cycle for
/// a DSLogic capture fitting in a single bulk-in transfer (spec.md §8
/// scenario: DSLogic 16-channel 100 MHz capture with mid-buffer trigger).
///
/// `trigger_endpoint` carries an 8-byte little-endian trigger-position
/// descriptor; `data_endpoint` then carries the interleaved sample stream.
/// Returns one frame's packets, `FrameBegin..FrameEnd`, without the final
/// `End`.
fn capture_one_frame<T: UsbTransport + ?Sized>(
    transport: &mut T,
    trigger_endpoint: u8,
    data_endpoint: u8,
    enabled_channels: &[usize],
    limit_samples: u64,
) -> Result<Vec<Packet>> {
    let descriptor = submit_and_wait(transport, trigger_endpoint, 8, Duration::from_secs(3))?;
    if descriptor.len() < 8 {
        return Err(Error::ShortRead {
            expected: 8,
            actual: descriptor.len(),
        });
    }
    let trigger_pos = u64::from_le_bytes(descriptor[..8].try_into().expect("checked len"));
    tracing::debug!(trigger_pos, "dslogic trigger descriptor received");

    let windows = (limit_samples as usize).div_ceil(64);
    let payload_len = windows * enabled_channels.len() * 8;
    let payload = submit_and_wait(transport, data_endpoint, payload_len, Duration::from_secs(3))?;

    let mut samples = deinterleave(&payload, enabled_channels)?;
    samples.truncate(limit_samples as usize);

    let mut splitter = TriggerOffsetSplitter::new();
    splitter.set_trigger_position(trigger_pos);

    let mut packets = vec![Packet::FrameBegin];
    for item in splitter.feed(&samples) {
        match item {
            SplitItem::Samples(chunk) => packets.push(Packet::Logic {
                unitsize: 2,
                bytes: pack_logic_samples(&chunk),
            }),
            SplitItem::Trigger => packets.push(Packet::Trigger),
        }
    }
    packets.push(Packet::FrameEnd);
    Ok(packets)
}

/// `FRAME_END -> (loop | STOP)` (spec.md §4.3): repeats a full
/// `capture_one_frame` cycle, each with its own trigger-position wait, up
/// to `frame_limit` times, then emits the closing `End`.
pub fn run_single_transfer_capture<T: UsbTransport + ?Sized>(
    transport: &mut T,
    trigger_endpoint: u8,
    data_endpoint: u8,
    enabled_channels: &[usize],
    limit_samples: u64,
    frame_limit: u64,
) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    for frame in 0..frame_limit {
        tracing::debug!(frame, "dslogic frame capture starting");
        packets.extend(capture_one_frame(transport, trigger_endpoint, data_endpoint, enabled_channels, limit_samples)?);
    }
    packets.push(Packet::End);
    Ok(packets)
}
