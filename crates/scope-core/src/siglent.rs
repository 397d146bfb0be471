//! Siglent SDS E-series descriptor-block acquisition (spec.md §4.2.2,
//! `ProtocolFlavor::SiglentBlock`): single-shot stop-wait (spec.md §4.3
//! "Single-shot stop wait"), then a fixed 363-byte descriptor preamble
//! followed by signed int8 samples, instead of the generic `#NDDD`
//! length-header/unsigned-byte IEEE-488.2 path.

use std::time::Duration;

use scope_model::descriptor::InstrumentModel;
use scope_model::error::{Error, Result};
use scope_model::mirror::MirrorState;
use scope_proto::scale::siglent_sample_to_volts;
use scope_proto::siglent::{self, PREAMBLE_LEN};
use scope_transport::ScpiTransport;

use crate::ieee4882::wait_for_single_shot_stop;
use crate::packet::{Packet, Quantity};

fn read_channel<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &MirrorState,
    channel: usize,
    max_block_len: usize,
) -> Result<Packet> {
    let chan = &mirror.analog[channel];
    transport.send(&format!(":WAV:SOUR CHAN{}", channel + 1))?;
    transport.send(":WAV:DATA?")?;

    let preamble = transport.receive_raw(PREAMBLE_LEN, Duration::from_secs(3))?;
    let descriptor = siglent::parse_preamble(&preamble)?;
    if descriptor.data_length as usize > max_block_len {
        return Err(Error::bad_format(format!(
            "siglent data_length {} exceeds cap {max_block_len}",
            descriptor.data_length
        )));
    }

    // The preamble already covers `block_header_size` bytes unless the
    // descriptor declares a header longer than the fixed preamble.
    let header_remainder = (descriptor.block_header_size as usize).saturating_sub(PREAMBLE_LEN);
    if header_remainder > 0 {
        transport.receive_raw(header_remainder, Duration::from_secs(3))?;
    }

    let raw = transport.receive_raw(descriptor.data_length as usize, Duration::from_secs(3))?;
    let _ = transport.receive_raw(1, Duration::from_secs(1)); // trailing LF

    let vdiv = model.vdivs[chan.vdiv_index];
    let samples: Vec<f32> = raw
        .iter()
        .map(|&b| siglent_sample_to_volts(b as i8, vdiv, chan.vertical_offset) as f32)
        .collect();

    tracing::debug!(channel, samples = samples.len(), "siglent block read complete");

    Ok(Packet::Analog {
        channel,
        quantity: Quantity::for_probe_unit(chan.probe_unit),
        unit: chan.probe_unit,
        digits: scope_proto::scale::suggested_digits(vdiv, true),
        samples,
    })
}

/// `ARM -> WAIT_TRIGGER (single-shot stop wait) -> READ_BLOCK ->
/// NEXT_CHANNEL -> FRAME_END -> (loop | STOP)` (spec.md §4.3, §4.2.2),
/// rotated over every enabled analog channel, looped to `mirror.frame_limit`
/// frames.
pub fn run_acquisition<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &MirrorState,
    max_block_len: usize,
) -> Result<Vec<Packet>> {
    let enabled_channels: Vec<usize> = mirror
        .analog
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, _)| i)
        .collect();
    if enabled_channels.is_empty() {
        return Err(Error::invalid_state("no analog channel enabled"));
    }

    let mut packets = Vec::new();
    for frame in 0..mirror.frame_limit {
        wait_for_single_shot_stop(transport, model.frame_size, 3)?;
        tracing::debug!(frame, "siglent single-shot stop confirmed");

        packets.push(Packet::FrameBegin);
        for &channel in &enabled_channels {
            packets.push(read_channel(transport, model, mirror, channel, max_block_len)?);
        }
        packets.push(Packet::FrameEnd);
    }
    packets.push(Packet::End);
    Ok(packets)
}
