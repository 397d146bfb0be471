//! Driver dispatch (spec.md §9 design note: "a tagged-variant enum over the
//! protocol flavors, not a trait-object/vtable dispatch" -- the set of
//! protocol flavors is closed and known at compile time, so a `match` on a
//! tag costs nothing extra and keeps each family's state inline).

use scope_model::descriptor::InstrumentModel;
use scope_model::error::Result;
use scope_model::mirror::MirrorState;
use scope_transport::{ScpiTransport, UsbTransport};

use crate::config::DriverConfig;
use crate::jds::{self, JdsMirror};
use crate::packet::Packet;
use crate::{dslogic, ieee4882, legacy, open, siglent};

/// One open instrument, tagged by the protocol flavor its model descriptor
/// declares (spec.md §3 `ProtocolFlavor`). Each variant owns the transport
/// and mirror state needed to run its own acquisition path.
pub enum Driver {
    Legacy {
        transport: Box<dyn ScpiTransport>,
        model: InstrumentModel,
        mirror: MirrorState,
        config: DriverConfig,
    },
    Ieee4882 {
        transport: Box<dyn ScpiTransport>,
        model: InstrumentModel,
        mirror: MirrorState,
        vref: u8,
        config: DriverConfig,
    },
    Siglent {
        transport: Box<dyn ScpiTransport>,
        model: InstrumentModel,
        mirror: MirrorState,
        config: DriverConfig,
    },
    Dslogic {
        transport: Box<dyn UsbTransport>,
        model: InstrumentModel,
        mirror: MirrorState,
        trigger_endpoint: u8,
        data_endpoint: u8,
        config: DriverConfig,
    },
    Jds {
        transport: Box<dyn ScpiTransport>,
        mirror: JdsMirror,
        config: DriverConfig,
    },
}

impl Driver {
    pub fn model(&self) -> Option<&InstrumentModel> {
        match self {
            Driver::Legacy { model, .. } => Some(model),
            Driver::Ieee4882 { model, .. } => Some(model),
            Driver::Siglent { model, .. } => Some(model),
            Driver::Dslogic { model, .. } => Some(model),
            Driver::Jds { .. } => None,
        }
    }

    /// Poll every mirrored field from the device and store it in the
    /// mirror (spec.md §4.5 "on open"), bounded by
    /// `DriverConfig::open_timeout`. A no-op for protocol flavors with no
    /// SCPI mirror to poll.
    pub fn sync_mirror(&mut self) -> Result<()> {
        match self {
            Driver::Legacy { transport, model, mirror, config } => open::sync_scpi_mirror(transport.as_mut(), model, mirror, config.open_timeout),
            Driver::Ieee4882 {
                transport, model, mirror, config, ..
            } => open::sync_scpi_mirror(transport.as_mut(), model, mirror, config.open_timeout),
            Driver::Siglent { transport, model, mirror, config } => open::sync_scpi_mirror(transport.as_mut(), model, mirror, config.open_timeout),
            Driver::Dslogic { .. } => Ok(()),
            Driver::Jds { .. } => Ok(()),
        }
    }

    /// Run a full analog acquisition (spec.md §4.3's state machine): one
    /// `FrameBegin`/`FrameEnd` pair per frame up to `mirror.frame_limit`,
    /// rotated over every enabled analog channel within each frame.
    /// `LegacyRaw`/`Ieee4882Block`/`SiglentBlock` flavors only.
    pub fn capture_analog_frame(&mut self) -> Result<Vec<Packet>> {
        match self {
            Driver::Legacy { transport, model, mirror, .. } => legacy::run_acquisition(transport.as_mut(), model, mirror),
            Driver::Ieee4882 {
                transport,
                model,
                mirror,
                vref,
                config,
            } => ieee4882::run_acquisition(transport.as_mut(), model, mirror, *vref, config.max_block_len),
            Driver::Siglent { transport, model, mirror, config } => siglent::run_acquisition(transport.as_mut(), model, mirror, config.max_block_len),
            Driver::Dslogic { .. } => Err(scope_model::error::Error::invalid_state(
                "capture_analog_frame called on a DslogicUsb driver",
            )),
            Driver::Jds { .. } => Err(scope_model::error::Error::invalid_state("capture_analog_frame called on a JdsText driver")),
        }
    }

    /// Run the full logic acquisition (spec.md §4.3 `WAIT_TRIG_POS`,
    /// `DslogicUsb` flavor only): one frame cycle per `mirror.frame_limit`.
    pub fn capture_logic_frame(&mut self, enabled_channels: &[usize], limit_samples: u64) -> Result<Vec<Packet>> {
        match self {
            Driver::Dslogic {
                transport,
                trigger_endpoint,
                data_endpoint,
                mirror,
                ..
            } => dslogic::run_single_transfer_capture(
                transport.as_mut(),
                *trigger_endpoint,
                *data_endpoint,
                enabled_channels,
                limit_samples,
                mirror.frame_limit,
            ),
            _ => Err(scope_model::error::Error::invalid_state("capture_logic_frame called on a non-DslogicUsb driver")),
        }
    }

    /// Identify (spec.md §6 identity exchange), `JdsText` flavor only.
    pub fn jds_identify(&mut self) -> Result<()> {
        match self {
            Driver::Jds { transport, mirror, .. } => jds::identify(transport.as_mut(), mirror),
            _ => Err(scope_model::error::Error::invalid_state("jds_identify called on a non-JdsText driver")),
        }
    }

    pub fn jds_set_waveform(&mut self, channel: usize, waveform_index: u8) -> Result<()> {
        match self {
            Driver::Jds { transport, mirror, .. } => jds::set_waveform(transport.as_mut(), mirror, channel, waveform_index),
            _ => Err(scope_model::error::Error::invalid_state("jds_set_waveform called on a non-JdsText driver")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_model::catalog::Catalog;
    use scope_transport::mock::MockTransport;

    #[test]
    fn legacy_variant_dispatches_to_run_acquisition() {
        let model = Catalog::with_builtins().lookup("Rigol Technologies", "DS1102D").unwrap().clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.frame_limit = 1;
        mirror.analog[0].enabled = true;

        let mut raw = vec![0u8; 600];
        raw.push(b'\n');
        // default mirror timebase (1e-3) is below the fast-timebase
        // threshold, so no `:TRIG:STAT?` poll is sent.
        let transport = MockTransport::new()
            .expect(":WAV:FORM BYTE", Vec::new())
            .expect(":RUN", Vec::new())
            .expect(":WAV:DATA? CHAN1", raw);

        let mut driver = Driver::Legacy {
            transport: Box::new(transport),
            model,
            mirror,
            config: DriverConfig::default(),
        };
        let packets = driver.capture_analog_frame().unwrap();
        assert!(packets[0].is_frame_begin());
        assert!(packets.last().unwrap().is_end());
    }

    #[test]
    fn jds_variant_rejects_analog_capture() {
        let transport = MockTransport::new();
        let mut driver = Driver::Jds {
            transport: Box::new(transport),
            mirror: JdsMirror::default(),
            config: DriverConfig::default(),
        };
        assert!(driver.capture_analog_frame().is_err());
    }

    #[test]
    fn siglent_variant_dispatches_to_siglent_run_acquisition() {
        let model = Catalog::with_builtins()
            .lookup("Siglent Technologies", "SDS1202X-E")
            .unwrap()
            .clone();
        let mut mirror = MirrorState::defaults_for(model.analog_channel_count, model.digital_channel_count, model.pod_count);
        mirror.frame_limit = 1;
        mirror.analog[0].enabled = true;

        let mut preamble = vec![0u8; scope_proto::siglent::PREAMBLE_LEN];
        preamble[36..40].copy_from_slice(&346u32.to_le_bytes());
        preamble[60..64].copy_from_slice(&1u32.to_le_bytes());
        preamble.push(0u8);
        preamble.push(b'\n');

        let transport = MockTransport::new()
            .expect(":SING", Vec::new())
            .expect(":TRIG:STAT?", b"S\n".to_vec())
            .expect(":WAV:POIN 1400;*OPC", Vec::new())
            .expect("*ESR?", b"0\n".to_vec())
            .expect(":WAV:SOUR CHAN1", Vec::new())
            .expect(":WAV:DATA?", preamble);

        let mut driver = Driver::Siglent {
            transport: Box::new(transport),
            model,
            mirror,
            config: DriverConfig::default(),
        };
        let packets = driver.capture_analog_frame().unwrap();
        assert!(packets[0].is_frame_begin());
        assert!(packets.last().unwrap().is_end());
    }
}
