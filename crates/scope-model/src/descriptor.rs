//! Static instrument model descriptors (spec.md §3 "Instrument model
//! descriptor"). Immutable after scan; produced by the model catalog
//! (`crate::catalog`) and never mutated by the acquisition or config-apply
//! paths.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Protocol capability gates used by config-list (spec.md §4.6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ModelCaps: u32 {
        /// Exposes a `memory` (deep-memory) data source, not just `live`.
        const MEMORY_SOURCE      = 1 << 0;
        /// Exposes a `segmented` data source.
        const SEGMENTED_SOURCE   = 1 << 1;
        /// POD thresholds are queried/set with two significant digits
        /// (E-series logic pods) rather than a coarse preset index.
        const PRECISE_POD_THRESHOLD = 1 << 2;
        /// Channel-enable word in the DSLogic TLV config is 32 bits (v2
        /// layout) instead of 16 bits (v1 layout).
        const WIDE_CHANNEL_ENABLE = 1 << 3;
        /// Half/quarter-rate samplerate modes are available.
        const FRACTIONAL_SAMPLERATE = 1 << 4;
        /// Device supports streaming (continuous) capture, not just a
        /// bounded ring buffer.
        const STREAMING = 1 << 5;
    }
}

/// Wire-protocol dialect a model speaks; selects which per-family state
/// machine and codec `scope-core` dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolFlavor {
    /// Pre-488.2 Rigol scopes (DS1000/DS1052E family): `(128 − raw)` scaling,
    /// raw unframed waveform payload.
    LegacyRaw,
    /// IEEE-488.2 "definite-length arbitrary block" scopes (DS2000,
    /// Hameg HMO).
    Ieee4882Block,
    /// Siglent SDS E-series: 363-byte descriptor preamble (spec.md §4.2.2)
    /// instead of a `#NDDD` length header, signed int8 samples.
    SiglentBlock,
    /// DSLogic-class USB logic analyzers: vendor control transfers, FPGA
    /// TLV config, bulk-in sample stream.
    DslogicUsb,
    /// Juntek JDS textual protocol DDS generators.
    JdsText,
}

/// A single analog or logic channel (spec.md §3 "Channel descriptor").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// 0-based index within its kind (not global across analog+logic).
    pub index: usize,
    pub kind: ChannelKind,
    pub label: String,
    pub enabled: bool,
    /// POD/group index for channels that share threshold and enable state.
    /// `None` for analog channels and for single-group logic devices.
    pub group: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Analog,
    Logic,
}

/// A digital channel group sharing threshold/enable (spec.md glossary "POD").
/// Always 8 logic channels per POD.
pub const CHANNELS_PER_POD: usize = 8;

/// Static, immutable instrument model descriptor (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentModel {
    pub vendor: String,
    pub model: String,
    /// Product series/family identifier, e.g. "DS2000", "DSLogic", "E-series".
    pub series: String,
    pub protocol: ProtocolFlavor,
    pub analog_channel_count: usize,
    pub digital_channel_count: usize,
    pub pod_count: usize,
    pub min_timebase: f64,
    pub max_timebase: f64,
    pub min_vdiv: f64,
    /// The discrete set of selectable vdiv rationals (spec.md §3 invariant:
    /// "vdiv index is always one of the listed vdiv rationals").
    pub vdivs: Vec<f64>,
    pub horizontal_divisions: u32,
    pub memory_depth: u64,
    /// Frame size in samples/bytes per spec.md §3's per-model table
    /// (DS1000 600 B, DS2000 1400 B/channel, digital 1210 B, Hantek
    /// 10240/32768/65536 as configured).
    pub frame_size: u64,
    pub half_rate_samplerate: Option<f64>,
    pub quarter_rate_samplerate: Option<f64>,
    pub caps: ModelCaps,
    /// DSLogic TLV layout version (spec.md §4.2.3); meaningless for other
    /// protocol flavors.
    pub dslogic_tlv_version: TlvVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlvVersion {
    V1,
    V2,
}

impl InstrumentModel {
    pub fn has_pods(&self) -> bool {
        self.pod_count > 0
    }

    /// Total logic channels implied by `pod_count`, independent of how many
    /// are presently enabled.
    pub fn pod_channel_capacity(&self) -> usize {
        self.pod_count * CHANNELS_PER_POD
    }
}
