//! Open-time mirror synchronization (spec.md §4.5: "On open, the driver
//! polls every mirrored field from the instrument and stores values in the
//! mirror"), one SCPI read per field, bounded by `DriverConfig::open_timeout`.

use std::time::Duration;

use scope_model::descriptor::InstrumentModel;
use scope_model::error::{Error, Result};
use scope_model::mirror::MirrorState;
use scope_transport::ScpiTransport;

fn read_numeric<T: ScpiTransport + ?Sized>(transport: &mut T, query: &str, timeout: Duration) -> Result<f64> {
    transport.send(query)?;
    let line = transport.receive_line(timeout)?;
    line.trim().parse().map_err(|_| Error::bad_format(format!("non-numeric reply to {query}: {line:?}")))
}

fn closest_vdiv_index(vdivs: &[f64], value: f64) -> usize {
    vdivs
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (**a - value).abs().partial_cmp(&(**b - value).abs()).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Poll the timebase and every analog channel's enable/vdiv fields
/// (spec.md §4.5), storing the results in `mirror`.
pub fn sync_scpi_mirror<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    model: &InstrumentModel,
    mirror: &mut MirrorState,
    timeout: Duration,
) -> Result<()> {
    mirror.timebase = read_numeric(transport, ":TIM:SCAL?", timeout)?;

    for channel in 0..model.analog_channel_count {
        transport.send(&format!(":CHAN{}:DISP?", channel + 1))?;
        let disp = transport.receive_line(timeout)?;
        mirror.analog[channel].enabled = disp.trim() == "1";

        let vdiv = read_numeric(transport, &format!(":CHAN{}:SCAL?", channel + 1), timeout)?;
        mirror.analog[channel].vdiv_index = closest_vdiv_index(&model.vdivs, vdiv);
    }

    tracing::debug!(timebase = mirror.timebase, "mirror synced from device");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_model::catalog::Catalog;
    use scope_transport::mock::MockTransport;

    #[test]
    fn polls_timebase_and_every_channel() {
        let model = Catalog::with_builtins()
            .lookup("Rigol Technologies", "DS1102D")
            .unwrap()
            .clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);

        let mut t = MockTransport::new()
            .expect(":TIM:SCAL?", b"5.000E-4\n".to_vec())
            .expect(":CHAN1:DISP?", b"1\n".to_vec())
            .expect(":CHAN1:SCAL?", b"1.000E0\n".to_vec())
            .expect(":CHAN2:DISP?", b"0\n".to_vec())
            .expect(":CHAN2:SCAL?", b"2.000E-2\n".to_vec());

        sync_scpi_mirror(&mut t, &model, &mut mirror, Duration::from_secs(1)).unwrap();

        assert_eq!(mirror.timebase, 5.0e-4);
        assert!(mirror.analog[0].enabled);
        assert_eq!(mirror.analog[0].vdiv_index, model.vdivs.iter().position(|&v| v == 1.0).unwrap());
        assert!(!mirror.analog[1].enabled);
        assert_eq!(mirror.analog[1].vdiv_index, model.vdivs.iter().position(|&v| v == 0.02).unwrap());
        assert!(t.is_exhausted());
    }

    #[test]
    fn rejects_non_numeric_timebase() {
        let model = Catalog::with_builtins()
            .lookup("Rigol Technologies", "DS1102D")
            .unwrap()
            .clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        let mut t = MockTransport::new().expect(":TIM:SCAL?", b"garbage\n".to_vec());
        assert!(sync_scpi_mirror(&mut t, &model, &mut mirror, Duration::from_secs(1)).is_err());
    }
}
