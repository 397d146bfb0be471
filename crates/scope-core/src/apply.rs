//! Mirror state and configuration-apply path (spec.md §4.5, C5).
//!
//! Config-get serves from the mirror without device I/O (not modeled here:
//! callers just read `MirrorState` fields directly). Config-set validates
//! against the model's enumerated set or a clamping range, writes the
//! mirror, and issues the corresponding device command; some instruments
//! need a settling gap between writes (DS1052E scrambles otherwise), so
//! this layer sleeps unconditionally after every write it issues.

use std::time::Duration;

use scope_model::descriptor::InstrumentModel;
use scope_model::error::{Error, Result};
use scope_model::mirror::MirrorState;
use scope_transport::ScpiTransport;

/// Settling gap after every write command (spec.md §4.5).
pub const POST_WRITE_DELAY: Duration = Duration::from_millis(100);

fn post_write_delay() {
    std::thread::sleep(POST_WRITE_DELAY);
}

/// Find `value`'s index in the model's vdiv table, or `Unsupported` if it
/// isn't one of the listed rationals (spec.md §3 invariant).
pub fn validate_vdiv_index(model: &InstrumentModel, value: f64) -> Result<usize> {
    model
        .vdivs
        .iter()
        .position(|&v| (v - value).abs() < 1e-12)
        .ok_or_else(|| Error::unsupported(format!("{value} is not one of this model's vdiv settings")))
}

/// Clamping range: `min_timebase ..= max_timebase`.
pub fn validate_timebase(model: &InstrumentModel, value: f64) -> Result<()> {
    if value < model.min_timebase || value > model.max_timebase {
        Err(Error::unsupported(format!(
            "timebase {value} outside model range [{}, {}]",
            model.min_timebase, model.max_timebase
        )))
    } else {
        Ok(())
    }
}

/// Trigger position must be in `[0.0, 1.0]`; out-of-range is `Unsupported`,
/// not clamped (spec.md §8 boundary behavior -- unlike the Juntek textual
/// parameters in `scope_proto::juntek`, which do clamp).
pub fn validate_trigger_position(value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::unsupported(format!(
            "trigger position {value} outside [0.0, 1.0]"
        )))
    }
}

pub fn apply_vdiv<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &mut MirrorState,
    channel: usize,
    value: f64,
) -> Result<()> {
    let index = validate_vdiv_index(model, value)?;
    let chan = mirror
        .analog
        .get_mut(channel)
        .ok_or_else(|| Error::invalid_state(format!("no analog channel {channel}")))?;
    chan.vdiv_index = index;
    transport.send(&format!(":CHAN{}:SCAL {:e}", channel + 1, value))?;
    post_write_delay();
    Ok(())
}

pub fn apply_timebase<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &mut MirrorState,
    value: f64,
) -> Result<()> {
    validate_timebase(model, value)?;
    mirror.timebase = value;
    transport.send(&format!(":TIM:SCAL {value:e}"))?;
    post_write_delay();
    Ok(())
}

pub fn apply_trigger_position<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &mut MirrorState,
    position: f64,
) -> Result<()> {
    validate_trigger_position(position)?;
    mirror.horizontal_trigger_position = position;
    let offset_seconds = mirror.trigger_offset_seconds(model.horizontal_divisions);
    transport.send(&format!(":TIM:OFFS {offset_seconds:e}"))?;
    post_write_delay();
    Ok(())
}

pub fn apply_analog_channel_enable<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    mirror: &mut MirrorState,
    channel: usize,
    enabled: bool,
) -> Result<()> {
    let chan = mirror
        .analog
        .get_mut(channel)
        .ok_or_else(|| Error::invalid_state(format!("no analog channel {channel}")))?;
    chan.enabled = enabled;
    transport.send(&format!(
        ":CHAN{}:DISP {}",
        channel + 1,
        if enabled { "ON" } else { "OFF" }
    ))?;
    post_write_delay();
    Ok(())
}

/// Enables/disables one logic channel, resyncing POD enable as a side
/// effect, and issues the device command for both the channel and (if it
/// changed) the POD it belongs to (spec.md §3 invariant, §8 boundary
/// behavior).
pub fn apply_logic_channel_enable<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    mirror: &mut MirrorState,
    channel: usize,
    enabled: bool,
) -> Result<()> {
    if channel >= mirror.logic_enabled.len() {
        return Err(Error::invalid_state(format!("no logic channel {channel}")));
    }
    let pods_before: Vec<bool> = mirror.pods.iter().map(|p| p.enabled).collect();
    mirror.enable_logic_channel(channel, enabled);
    transport.send(&format!(":LA:DIG{channel}:DISP {}", if enabled { "ON" } else { "OFF" }))?;
    post_write_delay();
    for (pod_index, pod) in mirror.pods.iter().enumerate() {
        if pods_before.get(pod_index) != Some(&pod.enabled) {
            transport.send(&format!(
                ":LA:POD{pod_index}:DISP {}",
                if pod.enabled { "ON" } else { "OFF" }
            ))?;
            post_write_delay();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_model::catalog::Catalog;
    use scope_transport::mock::MockTransport;

    fn ds1102d() -> InstrumentModel {
        Catalog::with_builtins()
            .lookup("Rigol Technologies", "DS1102D")
            .unwrap()
            .clone()
    }

    #[test]
    fn vdiv_apply_writes_mirror_and_sends_command() {
        let model = ds1102d();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        let mut t = MockTransport::new().expect_any(Vec::<u8>::new());
        apply_vdiv(&mut t, &model, &mut mirror, 0, 1.0).unwrap();
        assert_eq!(mirror.analog[0].vdiv_index, model.vdivs.iter().position(|&v| v == 1.0).unwrap());
    }

    #[test]
    fn vdiv_rejects_value_not_in_table() {
        let model = ds1102d();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        let mut t = MockTransport::new();
        assert!(apply_vdiv(&mut t, &model, &mut mirror, 0, 0.123456).is_err());
    }

    #[test]
    fn trigger_position_out_of_range_is_unsupported() {
        let model = ds1102d();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        let mut t = MockTransport::new();
        let err = apply_trigger_position(&mut t, &model, &mut mirror, 1.5).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    /// Enabling the 9th logic channel on a dual-POD model auto-enables
    /// POD1 and issues its command too (spec.md §8).
    #[test]
    fn ninth_channel_auto_enables_second_pod_command() {
        let model = Catalog::with_builtins().lookup("HAMEG Instruments", "HMO3054").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        let mut t = MockTransport::new().expect_any(Vec::<u8>::new()).expect_any(Vec::<u8>::new());
        apply_logic_channel_enable(&mut t, &mut mirror, 8, true).unwrap();
        assert!(mirror.pods[1].enabled);
        assert_eq!(t.sent.len(), 2);
        assert!(t.sent[1].contains("POD1"));
    }
}
