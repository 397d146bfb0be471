//! Mirror state: the in-memory shadow of instrument configuration
//! (spec.md §3 "Mirror state", §4.5). One instance per open instrument.
//! Writer = config-apply path (`scope-core::apply`), readers = acquisition
//! and list-config paths. Never mutated concurrently with acquisition (the
//! host framework guarantees config-set is refused while acquisition is
//! active).

use serde::{Deserialize, Serialize};

use crate::descriptor::CHANNELS_PER_POD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coupling {
    Ac,
    AcLimited,
    Dc,
    DcLimited,
    Ground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeUnit {
    Volt,
    Ampere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSlope {
    Rising,
    Falling,
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Live,
    Memory,
    Segmented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    Channel(usize),
    External,
    Line,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogChannelState {
    pub enabled: bool,
    pub coupling: Coupling,
    /// Index into the model's `vdivs` table.
    pub vdiv_index: usize,
    pub vertical_offset: f64,
    /// Only meaningful for IEEE-488.2 scopes (spec.md §3).
    pub reference_code: u8,
    pub probe_attenuation: f64,
    pub probe_unit: ProbeUnit,
}

impl Default for AnalogChannelState {
    fn default() -> Self {
        Self {
            enabled: false,
            coupling: Coupling::Dc,
            vdiv_index: 0,
            vertical_offset: 0.0,
            reference_code: 128,
            probe_attenuation: 1.0,
            probe_unit: ProbeUnit::Volt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodState {
    pub enabled: bool,
    pub threshold_preset: usize,
    pub user_threshold: f64,
}

impl Default for PodState {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_preset: 0,
            user_threshold: 1.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorState {
    pub analog: Vec<AnalogChannelState>,
    pub logic_enabled: Vec<bool>,
    pub pods: Vec<PodState>,
    pub timebase: f64,
    pub horizontal_trigger_position: f64,
    pub trigger_source: TriggerSource,
    pub trigger_slope: TriggerSlope,
    pub trigger_level: f64,
    pub trigger_pattern: Option<String>,
    pub sample_rate: f64,
    pub frame_limit: u64,
    pub sample_limit: u64,
    pub data_source: DataSource,
}

impl MirrorState {
    /// Build the power-on-shaped default mirror for a model with the given
    /// channel counts. Used by tests and as a starting point before the
    /// open-time poll (spec.md §4.5) fills in real values.
    pub fn defaults_for(analog_channels: usize, logic_channels: usize, pod_count: usize) -> Self {
        Self {
            analog: vec![AnalogChannelState::default(); analog_channels],
            logic_enabled: vec![false; logic_channels],
            pods: vec![PodState::default(); pod_count],
            timebase: 1.0e-3,
            horizontal_trigger_position: 0.5,
            trigger_source: TriggerSource::Channel(0),
            trigger_slope: TriggerSlope::Rising,
            trigger_level: 0.0,
            trigger_pattern: None,
            sample_rate: 0.0,
            frame_limit: 1,
            sample_limit: 0,
            data_source: DataSource::Live,
        }
    }

    /// `(0.5 − pos) × timebase × num_hdivs` (spec.md §3 invariant).
    pub fn trigger_offset_seconds(&self, horizontal_divisions: u32) -> f64 {
        (0.5 - self.horizontal_trigger_position) * self.timebase * horizontal_divisions as f64
    }

    /// Recompute each POD's enable flag as the OR of its 8 logic channels'
    /// enables (spec.md §3 invariant, and the boundary behavior in §8:
    /// enabling the 9th logic channel on a dual-POD model auto-enables
    /// POD1; disabling all 8 channels of a POD auto-disables it).
    pub fn resync_pod_enables(&mut self) {
        for (pod_index, pod) in self.pods.iter_mut().enumerate() {
            let start = pod_index * CHANNELS_PER_POD;
            let end = (start + CHANNELS_PER_POD).min(self.logic_enabled.len());
            pod.enabled = self.logic_enabled[start..end].iter().any(|&e| e);
        }
    }

    pub fn enable_logic_channel(&mut self, index: usize, enabled: bool) {
        if let Some(slot) = self.logic_enabled.get_mut(index) {
            *slot = enabled;
        }
        self.resync_pod_enables();
    }

    pub fn enabled_analog_count(&self) -> usize {
        self.analog.iter().filter(|c| c.enabled).count()
    }

    pub fn enabled_logic_count(&self) -> usize {
        self.logic_enabled.iter().filter(|&&e| e).count()
    }

    pub fn enabled_pod_count(&self) -> usize {
        self.pods.iter().filter(|p| p.enabled).count()
    }
}
