//! IEEE-488.2 block-protocol scope acquisition (spec.md §4.3, `Ieee4882Block`
//! protocol flavor): covers DS2000 short-block retry, Siglent E-series
//! single-shot stop-wait with `*ESR?` recovery, and Hameg dual-POD logic
//! capture.

use std::time::Duration;

use scope_model::descriptor::InstrumentModel;
use scope_model::error::{Error, Result};
use scope_model::mirror::MirrorState;
use scope_proto::ieee4882::{self, BlockOutcome};
use scope_proto::scale::ieee4882_sample_to_volts;
use scope_transport::scpi::get_block;
use scope_transport::ScpiTransport;

use crate::packet::{Packet, Quantity};
use crate::trigger_wait::wait_for_trigger;

/// `WAIT_TRIGGER -> READ_BLOCK` for one analog channel, with the
/// `#4013000`-style short-block discard-and-retry policy (spec.md §4.2.1,
/// §8 scenario: DS2072 two-channel frame with short-block skip).
pub fn read_analog_block_with_retry<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &MirrorState,
    channel: usize,
    vref: u8,
    max_len: usize,
) -> Result<Vec<f32>> {
    let chan = mirror
        .analog
        .get(channel)
        .ok_or_else(|| Error::invalid_state(format!("no analog channel {channel}")))?;
    transport.send(&format!(":WAV:SOUR CHAN{}", channel + 1))?;
    loop {
        transport.send(":WAV:DATA?")?;
        let probe = transport.receive_raw(11, Duration::from_secs(3))?;
        let header = ieee4882::parse_header(&probe, max_len)?;
        let mut payload = probe[header.header_bytes..].to_vec();
        if payload.len() < header.length {
            let remaining = header.length - payload.len();
            let rest = transport.receive_raw(remaining, Duration::from_secs(3))?;
            payload.extend_from_slice(&rest);
        } else {
            payload.truncate(header.length);
        }
        let _ = transport.receive_raw(1, Duration::from_secs(1)); // trailing LF

        match ieee4882::classify(&header, model.frame_size as usize) {
            BlockOutcome::Short => {
                tracing::warn!(length = header.length, "short block, discarding and awaiting next header");
                continue;
            }
            BlockOutcome::Full => {
                let vdiv = model.vdivs[chan.vdiv_index];
                let samples = payload
                    .iter()
                    .map(|&b| ieee4882_sample_to_volts(b, vref, vdiv, chan.vertical_offset) as f32)
                    .collect();
                return Ok(samples);
            }
        }
    }
}

/// `IDLE -> ARM -> WAIT_TRIGGER -> READ_BLOCK -> NEXT_CHANNEL -> FRAME_END
/// -> (loop | STOP)` (spec.md §4.3) for IEEE-488.2 block-protocol scopes:
/// rotates over every enabled analog channel within a frame (one trigger
/// wait per frame), advances to the digital POD group once analog channels
/// are exhausted if any POD is enabled, and loops frames up to
/// `mirror.frame_limit`.
pub fn run_acquisition<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &MirrorState,
    vref: u8,
    max_block_len: usize,
) -> Result<Vec<Packet>> {
    let enabled_channels: Vec<usize> = mirror
        .analog
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, _)| i)
        .collect();
    let fetch_digital = mirror.pods.first().map(|p| p.enabled).unwrap_or(false);
    if enabled_channels.is_empty() && !fetch_digital {
        return Err(Error::invalid_state("no analog channel or pod enabled"));
    }

    let mut packets = Vec::new();
    for frame in 0..mirror.frame_limit {
        transport.send(":WAV:FORM BYTE")?;
        transport.send(":WAV:MODE NORM")?;
        transport.send(":RUN")?;
        tracing::debug!(frame, "ieee4882 acquisition armed");

        wait_for_trigger(transport, mirror.timebase, model.horizontal_divisions, Duration::from_secs(1), Duration::from_secs(3))?;

        packets.push(Packet::FrameBegin);
        for &channel in &enabled_channels {
            let chan = &mirror.analog[channel];
            let samples = read_analog_block_with_retry(transport, model, mirror, channel, vref, max_block_len)?;
            packets.push(Packet::Analog {
                channel,
                quantity: Quantity::for_probe_unit(chan.probe_unit),
                unit: chan.probe_unit,
                digits: scope_proto::scale::suggested_digits(model.vdivs[chan.vdiv_index], model.series == "E-series"),
                samples,
            });
        }
        if fetch_digital {
            packets.push(read_logic_pods(transport, mirror, max_block_len)?);
        }
        packets.push(Packet::FrameEnd);
    }
    packets.push(Packet::End);
    Ok(packets)
}

/// Single-shot stop wait with `*ESR?` recovery (spec.md §4.3 "Single-shot
/// stop wait", §8 scenario: SDS1202X-E stop-on-error retry). Bit `0x10`
/// ("execution error") means firmware believed there was no usable
/// waveform; soft-recover by sleeping 500 ms and reissuing `:SING`.
pub fn wait_for_single_shot_stop<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    expected_points: u64,
    max_retries: u32,
) -> Result<()> {
    transport.send(":SING")?;
    let mut retries = 0u32;
    loop {
        loop {
            transport.send(":TRIG:STAT?")?;
            let status = transport.receive_line(Duration::from_secs(1))?;
            if status.trim().starts_with('S') {
                break;
            }
        }
        transport.send(&format!(":WAV:POIN {expected_points};*OPC"))?;
        transport.send("*ESR?")?;
        let esr_line = transport.receive_line(Duration::from_secs(1))?;
        let esr: u32 = esr_line
            .trim()
            .parse()
            .map_err(|_| Error::bad_format(format!("non-numeric *ESR? reply {esr_line:?}")))?;
        if esr & 0x10 != 0 {
            retries += 1;
            tracing::warn!(retries, "firmware execution error after single-shot, retrying");
            if retries > max_retries {
                return Err(Error::FirmwareError { retries });
            }
            std::thread::sleep(Duration::from_millis(500));
            transport.send(":SING")?;
            continue;
        }
        return Ok(());
    }
}

fn read_pod_block<T: ScpiTransport + ?Sized>(transport: &mut T, pod: usize, max_len: usize) -> Result<Vec<u8>> {
    transport.send(&format!(":LA:POD{pod}:DATA?"))?;
    get_block(transport, Duration::from_secs(3), max_len)
}

/// Dual-POD logic capture (spec.md §8 scenario: Hameg HMO3054). Both PODs
/// enabled interleaves per-sample with POD0 in the low byte, `unitsize=2`;
/// only POD0 enabled passes its bytes through unchanged, `unitsize=1`.
pub fn read_logic_pods<T: ScpiTransport + ?Sized>(transport: &mut T, mirror: &MirrorState, max_len: usize) -> Result<Packet> {
    let pod0_enabled = mirror.pods.first().map(|p| p.enabled).unwrap_or(false);
    let pod1_enabled = mirror.pods.get(1).map(|p| p.enabled).unwrap_or(false);
    if !pod0_enabled {
        return Err(Error::invalid_state("POD0 must be enabled to read logic data"));
    }
    let pod0_bytes = read_pod_block(transport, 0, max_len)?;
    if pod1_enabled {
        let pod1_bytes = read_pod_block(transport, 1, max_len)?;
        let bytes = pod0_bytes
            .iter()
            .zip(pod1_bytes.iter())
            .flat_map(|(&lo, &hi)| [lo, hi])
            .collect();
        Ok(Packet::Logic { unitsize: 2, bytes })
    } else {
        Ok(Packet::Logic { unitsize: 1, bytes: pod0_bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_model::catalog::Catalog;
    use scope_transport::mock::MockTransport;

    fn block_wire(declared_len: usize, payload_len: usize) -> Vec<u8> {
        let header = format!("#{}{:0width$}", declared_len.to_string().len(), declared_len, width = declared_len.to_string().len());
        let mut wire = header.into_bytes();
        wire.extend(std::iter::repeat(0xABu8).take(payload_len));
        wire.push(b'\n');
        wire
    }

    /// spec.md §8 scenario 2: DS2072 two-channel frame with short-block skip.
    #[test]
    fn ds2072_short_block_is_discarded_then_full_block_decoded() {
        let model = Catalog::with_builtins().lookup("Rigol Technologies", "DS2072").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.analog[0].vdiv_index = model.vdivs.iter().position(|&v| v == 1.0).unwrap();

        let short_wire = block_wire(1300, 1300);
        let full_wire = block_wire(1400, 1400);

        let mut t = MockTransport::new()
            .expect(":WAV:SOUR CHAN1", Vec::new())
            .expect(":WAV:DATA?", short_wire)
            .expect(":WAV:DATA?", full_wire);

        let samples = read_analog_block_with_retry(&mut t, &model, &mirror, 0, 128, 1_000_000).unwrap();
        assert_eq!(samples.len(), 1400);
    }

    /// spec.md §8 scenario 5: Siglent SDS1202X-E stop-on-error retry.
    #[test]
    fn siglent_retries_single_shot_on_execution_error() {
        let mut t = MockTransport::new()
            .expect(":SING", Vec::new())
            .expect(":TRIG:STAT?", b"S\n".to_vec())
            .expect(":WAV:POIN 1400;*OPC", Vec::new())
            .expect("*ESR?", b"16\n".to_vec())
            .expect(":SING", Vec::new())
            .expect(":TRIG:STAT?", b"S\n".to_vec())
            .expect(":WAV:POIN 1400;*OPC", Vec::new())
            .expect("*ESR?", b"0\n".to_vec());

        wait_for_single_shot_stop(&mut t, 1400, 3).unwrap();
        assert!(t.is_exhausted());
    }

    #[test]
    fn siglent_gives_up_after_max_retries() {
        let mut t = MockTransport::new()
            .expect(":SING", Vec::new())
            .expect(":TRIG:STAT?", b"S\n".to_vec())
            .expect(":WAV:POIN 10;*OPC", Vec::new())
            .expect("*ESR?", b"16\n".to_vec())
            .expect(":SING", Vec::new())
            .expect(":TRIG:STAT?", b"S\n".to_vec())
            .expect(":WAV:POIN 10;*OPC", Vec::new())
            .expect("*ESR?", b"16\n".to_vec());

        let err = wait_for_single_shot_stop(&mut t, 10, 1).unwrap_err();
        assert!(matches!(err, Error::FirmwareError { .. }));
    }

    /// DS2072 two enabled channels, two frames: one `FrameBegin`/`FrameEnd`
    /// pair per frame, one `Analog` packet per enabled channel inside it.
    #[test]
    fn rotates_channels_within_frame_and_loops_frames() {
        let model = Catalog::with_builtins().lookup("Rigol Technologies", "DS2072").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.timebase = 0.1; // above the fast-timebase threshold: exercises the poll path
        mirror.frame_limit = 2;
        mirror.analog[0].enabled = true;
        mirror.analog[1].enabled = true;

        let wire = block_wire(1400, 1400);
        let mut t = MockTransport::new();
        for _ in 0..2 {
            t = t
                .expect(":WAV:FORM BYTE", Vec::new())
                .expect(":WAV:MODE NORM", Vec::new())
                .expect(":RUN", Vec::new())
                .expect(":TRIG:STAT?", b"T\n".to_vec())
                .expect(":WAV:SOUR CHAN1", Vec::new())
                .expect(":WAV:DATA?", wire.clone())
                .expect(":WAV:SOUR CHAN2", Vec::new())
                .expect(":WAV:DATA?", wire.clone());
        }

        let packets = run_acquisition(&mut t, &model, &mirror, 128, 1_000_000).unwrap();
        assert_eq!(packets.len(), 2 * 4 + 1);
        assert_eq!(packets[0], Packet::FrameBegin);
        assert!(matches!(packets[1], Packet::Analog { channel: 0, .. }));
        assert!(matches!(packets[2], Packet::Analog { channel: 1, .. }));
        assert_eq!(packets[3], Packet::FrameEnd);
        assert_eq!(packets[4], Packet::FrameBegin);
        assert!(matches!(packets[5], Packet::Analog { channel: 0, .. }));
        assert!(matches!(packets[6], Packet::Analog { channel: 1, .. }));
        assert_eq!(packets[7], Packet::FrameEnd);
        assert_eq!(packets[8], Packet::End);
        assert!(t.is_exhausted());
    }

    /// HMO3054 with one analog channel and both PODs enabled: the digital
    /// group is fetched after the analog channel, within the same frame.
    #[test]
    fn advances_to_digital_group_after_analog_channels() {
        let model = Catalog::with_builtins().lookup("HAMEG Instruments", "HMO3054").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.timebase = 0.1; // above the fast-timebase threshold: exercises the poll path
        mirror.frame_limit = 1;
        mirror.analog[0].enabled = true;
        mirror.pods[0].enabled = true;

        let analog_wire = block_wire(1210, 1210);
        let pod0 = block_wire(4, 4);

        let mut t = MockTransport::new()
            .expect(":WAV:FORM BYTE", Vec::new())
            .expect(":WAV:MODE NORM", Vec::new())
            .expect(":RUN", Vec::new())
            .expect(":TRIG:STAT?", b"T\n".to_vec())
            .expect(":WAV:SOUR CHAN1", Vec::new())
            .expect(":WAV:DATA?", analog_wire)
            .expect(":LA:POD0:DATA?", pod0);

        let packets = run_acquisition(&mut t, &model, &mirror, 128, 1_000_000).unwrap();
        assert_eq!(packets[0], Packet::FrameBegin);
        assert!(matches!(packets[1], Packet::Analog { channel: 0, .. }));
        assert!(matches!(packets[2], Packet::Logic { unitsize: 1, .. }));
        assert_eq!(packets[3], Packet::FrameEnd);
        assert_eq!(packets[4], Packet::End);
        assert!(t.is_exhausted());
    }

    /// spec.md §8 scenario 6: Hameg HMO3054 dual-POD logic capture.
    #[test]
    fn dual_pod_interleaves_with_pod0_in_low_byte() {
        let model = Catalog::with_builtins().lookup("HAMEG Instruments", "HMO3054").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.pods[0].enabled = true;
        mirror.pods[1].enabled = true;

        let pod0 = block_wire(4, 4);
        let pod1 = block_wire(4, 4);
        let mut t = MockTransport::new()
            .expect(":LA:POD0:DATA?", pod0)
            .expect(":LA:POD1:DATA?", pod1);

        let packet = read_logic_pods(&mut t, &mirror, 1_000_000).unwrap();
        match packet {
            Packet::Logic { unitsize, bytes } => {
                assert_eq!(unitsize, 2);
                assert_eq!(bytes.len(), 8);
                assert_eq!(bytes[0], 0xAB); // pod0 byte, low
                assert_eq!(bytes[1], 0xAB); // pod1 byte, high
            }
            other => panic!("expected Logic packet, got {other:?}"),
        }
    }

    #[test]
    fn single_pod_passes_through_without_interleaving() {
        let model = Catalog::with_builtins().lookup("HAMEG Instruments", "HMO3054").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.pods[0].enabled = true;

        let pod0 = block_wire(4, 4);
        let mut t = MockTransport::new().expect(":LA:POD0:DATA?", pod0);

        let packet = read_logic_pods(&mut t, &mirror, 1_000_000).unwrap();
        match packet {
            Packet::Logic { unitsize, bytes } => {
                assert_eq!(unitsize, 1);
                assert_eq!(bytes.len(), 4);
            }
            other => panic!("expected Logic packet, got {other:?}"),
        }
    }
}
