//! Model catalog lookup (spec.md §4.6): a static table of descriptors keyed
//! by `(vendor, model-string)` as reported by `*IDN?`. Treated as input data
//! by spec.md §1 ("the instrument-model catalog (treated as input data)");
//! this module owns only the *lookup and gating* behavior, not a claim to
//! exhaustively enumerate every real-world model.

use std::collections::HashMap;

use crate::descriptor::{InstrumentModel, ModelCaps, ProtocolFlavor, TlvVersion};

/// Case-sensitive `(vendor, model)` key, matching the literal tokens
/// `*IDN?` returns (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub vendor: String,
    pub model: String,
}

impl ModelKey {
    pub fn new(vendor: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            model: model.into(),
        }
    }
}

/// An immutable catalog of known instrument models.
pub struct Catalog {
    entries: HashMap<ModelKey, InstrumentModel>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, model: InstrumentModel) {
        let key = ModelKey::new(model.vendor.clone(), model.model.clone());
        self.entries.insert(key, model);
    }

    /// Look up by the exact vendor/model tokens from `*IDN?`. Returns `None`
    /// for "unsupported" (spec.md §4.6); the caller turns that into
    /// `Error::Unsupported`.
    pub fn lookup(&self, vendor: &str, model: &str) -> Option<&InstrumentModel> {
        self.entries.get(&ModelKey::new(vendor, model))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A small built-in seed set covering one representative model per
    /// protocol flavor, enough to drive the end-to-end scenarios in
    /// spec.md §8. A production deployment would load a much larger table
    /// from the out-of-scope catalog data source (spec.md §1).
    pub fn with_builtins() -> Self {
        let mut cat = Self::new();
        cat.insert(builtin_ds1102d());
        cat.insert(builtin_ds2072());
        cat.insert(builtin_sds1202x_e());
        cat.insert(builtin_hmo3054());
        cat.insert(builtin_dslogic_u3pro16());
        cat.insert(builtin_jds6600());
        cat
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_ds1102d() -> InstrumentModel {
    InstrumentModel {
        vendor: "Rigol Technologies".into(),
        model: "DS1102D".into(),
        series: "DS1000".into(),
        protocol: ProtocolFlavor::LegacyRaw,
        analog_channel_count: 2,
        digital_channel_count: 16,
        pod_count: 2,
        min_timebase: 2.0e-9,
        max_timebase: 50.0,
        min_vdiv: 2.0e-3,
        vdivs: vec![
            0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0,
        ],
        horizontal_divisions: 12,
        memory_depth: 1_000_000,
        frame_size: 600,
        half_rate_samplerate: None,
        quarter_rate_samplerate: None,
        caps: ModelCaps::empty(),
        dslogic_tlv_version: TlvVersion::V1,
    }
}

fn builtin_ds2072() -> InstrumentModel {
    InstrumentModel {
        vendor: "Rigol Technologies".into(),
        model: "DS2072".into(),
        series: "DS2000".into(),
        protocol: ProtocolFlavor::Ieee4882Block,
        analog_channel_count: 2,
        digital_channel_count: 0,
        pod_count: 0,
        min_timebase: 1.0e-9,
        max_timebase: 1000.0,
        min_vdiv: 1.0e-3,
        vdivs: vec![0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0],
        horizontal_divisions: 14,
        memory_depth: 14_000_000,
        frame_size: 1400,
        half_rate_samplerate: None,
        quarter_rate_samplerate: None,
        caps: ModelCaps::MEMORY_SOURCE | ModelCaps::SEGMENTED_SOURCE,
        dslogic_tlv_version: TlvVersion::V1,
    }
}

fn builtin_sds1202x_e() -> InstrumentModel {
    InstrumentModel {
        vendor: "Siglent Technologies".into(),
        model: "SDS1202X-E".into(),
        series: "E-series".into(),
        protocol: ProtocolFlavor::SiglentBlock,
        analog_channel_count: 2,
        digital_channel_count: 0,
        pod_count: 0,
        min_timebase: 2.0e-9,
        max_timebase: 100.0,
        min_vdiv: 5.0e-4,
        vdivs: vec![0.0005, 0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0],
        horizontal_divisions: 14,
        memory_depth: 14_000_000,
        frame_size: 1400,
        half_rate_samplerate: None,
        quarter_rate_samplerate: None,
        caps: ModelCaps::PRECISE_POD_THRESHOLD,
        dslogic_tlv_version: TlvVersion::V1,
    }
}

fn builtin_hmo3054() -> InstrumentModel {
    InstrumentModel {
        vendor: "HAMEG Instruments".into(),
        model: "HMO3054".into(),
        series: "HMO".into(),
        protocol: ProtocolFlavor::Ieee4882Block,
        analog_channel_count: 4,
        digital_channel_count: 16,
        pod_count: 2,
        min_timebase: 1.0e-9,
        max_timebase: 50.0,
        min_vdiv: 1.0e-3,
        vdivs: vec![0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0],
        horizontal_divisions: 10,
        memory_depth: 10_000_000,
        frame_size: 1210,
        half_rate_samplerate: None,
        quarter_rate_samplerate: None,
        caps: ModelCaps::empty(),
        dslogic_tlv_version: TlvVersion::V1,
    }
}

fn builtin_dslogic_u3pro16() -> InstrumentModel {
    InstrumentModel {
        vendor: "DreamSourceLab".into(),
        model: "DSLogic U3Pro16".into(),
        series: "DSLogic".into(),
        protocol: ProtocolFlavor::DslogicUsb,
        analog_channel_count: 0,
        digital_channel_count: 16,
        pod_count: 2,
        min_timebase: 0.0,
        max_timebase: 0.0,
        min_vdiv: 0.0,
        vdivs: vec![],
        horizontal_divisions: 0,
        memory_depth: 256 * 1024 * 1024,
        frame_size: 32768,
        half_rate_samplerate: Some(50.0e6),
        quarter_rate_samplerate: Some(25.0e6),
        caps: ModelCaps::WIDE_CHANNEL_ENABLE | ModelCaps::STREAMING | ModelCaps::FRACTIONAL_SAMPLERATE,
        dslogic_tlv_version: TlvVersion::V2,
    }
}

fn builtin_jds6600() -> InstrumentModel {
    InstrumentModel {
        vendor: "Juntek".into(),
        model: "JDS6600".into(),
        series: "JDS6600".into(),
        protocol: ProtocolFlavor::JdsText,
        analog_channel_count: 2,
        digital_channel_count: 0,
        pod_count: 0,
        min_timebase: 0.0,
        max_timebase: 0.0,
        min_vdiv: 0.0,
        vdivs: vec![],
        horizontal_divisions: 0,
        memory_depth: 0,
        frame_size: 0,
        half_rate_samplerate: None,
        quarter_rate_samplerate: None,
        caps: ModelCaps::empty(),
        dslogic_tlv_version: TlvVersion::V1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_hits_and_misses() {
        let cat = Catalog::with_builtins();
        assert!(cat.lookup("Rigol Technologies", "DS2072").is_some());
        assert!(cat.lookup("Rigol Technologies", "DS9999").is_none());
        assert!(cat.lookup("Nonexistent Corp", "X1").is_none());
    }

    #[test]
    fn ds2000_exposes_memory_source_only_among_rigols() {
        let cat = Catalog::with_builtins();
        let ds2072 = cat.lookup("Rigol Technologies", "DS2072").unwrap();
        let ds1102d = cat.lookup("Rigol Technologies", "DS1102D").unwrap();
        assert!(ds2072.caps.contains(ModelCaps::MEMORY_SOURCE));
        assert!(!ds1102d.caps.contains(ModelCaps::MEMORY_SOURCE));
    }

    #[test]
    fn dslogic_uses_wide_channel_enable() {
        let cat = Catalog::with_builtins();
        let dslogic = cat.lookup("DreamSourceLab", "DSLogic U3Pro16").unwrap();
        assert_eq!(dslogic.dslogic_tlv_version, TlvVersion::V2);
        assert!(dslogic.caps.contains(ModelCaps::WIDE_CHANNEL_ENABLE));
    }
}
