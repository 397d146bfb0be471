//! Legacy (pre-488.2) Rigol scope acquisition (spec.md §4.3, `LegacyRaw`
//! protocol flavor): `(128 − raw)` scaling, raw unframed waveform payload
//! (no `#NDDD` header -- spec.md §6 "waveform fetch (legacy)").

use std::time::Duration;

use scope_model::descriptor::InstrumentModel;
use scope_model::error::{Error, Result};
use scope_model::mirror::MirrorState;
use scope_proto::scale::legacy_sample_to_volts;
use scope_transport::ScpiTransport;

use crate::packet::{Packet, Quantity};
use crate::trigger_wait::wait_for_trigger;

fn read_channel<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &MirrorState,
    channel: usize,
) -> Result<Packet> {
    let chan = &mirror.analog[channel];

    // READ_BLOCK: legacy raw payload has no length header, just
    // `frame_size` bytes followed by a trailing linefeed.
    transport.send(&format!(":WAV:DATA? CHAN{}", channel + 1))?;
    let raw = transport.receive_raw(model.frame_size as usize, Duration::from_secs(3))?;
    let _ = transport.receive_raw(1, Duration::from_secs(1)); // trailing LF

    let samples: Vec<f32> = raw
        .iter()
        .map(|&b| legacy_sample_to_volts(b, model.vdivs[chan.vdiv_index], chan.vertical_offset) as f32)
        .collect();

    tracing::debug!(channel, samples = samples.len(), "legacy block read complete");

    Ok(Packet::Analog {
        channel,
        quantity: Quantity::for_probe_unit(chan.probe_unit),
        unit: chan.probe_unit,
        digits: scope_proto::scale::suggested_digits(model.vdivs[chan.vdiv_index], false),
        samples,
    })
}

/// `IDLE -> ARM -> WAIT_TRIGGER -> READ_BLOCK -> NEXT_CHANNEL -> FRAME_END
/// -> (loop | STOP)` (spec.md §4.3), specialized for legacy raw devices:
/// rotates over every enabled analog channel within a frame (one trigger
/// wait per frame, not per channel, to keep channel data phase-coherent)
/// and loops frames until `mirror.frame_limit` is reached.
pub fn run_acquisition<T: ScpiTransport + ?Sized>(transport: &mut T, model: &InstrumentModel, mirror: &MirrorState) -> Result<Vec<Packet>> {
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
        // ARM
        transport.send(":WAV:FORM BYTE")?;
        transport.send(":RUN")?;
        tracing::debug!(frame, "legacy acquisition armed");

        // WAIT_TRIGGER: one trigger wait per frame.
        wait_for_trigger(transport, mirror.timebase, model.horizontal_divisions, Duration::from_secs(1), Duration::from_secs(3))?;

        // READ_BLOCK -> NEXT_CHANNEL, rotated over every enabled channel.
        packets.push(Packet::FrameBegin);
        for &channel in &enabled_channels {
            packets.push(read_channel(transport, model, mirror, channel)?);
        }
        packets.push(Packet::FrameEnd);
    }
    packets.push(Packet::End);
    Ok(packets)
}
