//! DSLogic FPGA configuration TLV (spec.md §4.2.3) and the logic trigger
//! compiler (spec.md §4.7) that populates its trigger-stage words.
//!
//! A packed struct sent as a single bulk transfer, bracketed by
//! `0xF5A5F5A5` (start) and `0xFA5AFA5A` (end), containing 16-bit
//! tag-length-value tuples where the tag encodes
//! `(variable_id << 8) | word_count`. Host byte order is little-endian on
//! the wire regardless of platform.

use scope_model::descriptor::TlvVersion;

pub const START_MARKER: u32 = 0xF5A5_F5A5;
pub const END_MARKER: u32 = 0xFA5A_FA5A;

pub const TRIGGER_STAGE_COUNT: usize = 16;
/// Words per trigger stage: `mask0, mask1, value0, value1, edge0, edge1`
/// cover up to 64 channels (two 32-bit banks each), the remaining four are
/// reserved/logic words, initialized to zero for an identity ("don't-care")
/// stage.
pub const WORDS_PER_STAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerStage {
    pub words: [u32; WORDS_PER_STAGE],
}

impl TriggerStage {
    /// All-don't-care identity stage (spec.md §4.7: "stages >= 1 are
    /// initialized to the identity").
    pub fn identity() -> Self {
        Self::default()
    }
}

/// One channel's desired match condition for trigger stage 0 (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMatch {
    Zero,
    One,
    Rising,
    Falling,
    Edge,
}

impl ChannelMatch {
    /// `(mask_bit, value_bit, edge_bit)` per spec.md §4.7's table.
    fn bits(self) -> (bool, bool, bool) {
        match self {
            ChannelMatch::One => (false, true, false),
            ChannelMatch::Zero => (false, false, false),
            ChannelMatch::Rising => (false, true, true),
            ChannelMatch::Falling => (false, false, true),
            ChannelMatch::Edge => (true, false, true),
        }
    }
}

/// Variable tags (`variable_id`) laid into the TLV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VariableId {
    Mode = 0,
    Divider = 1,
    SampleCount = 2,
    TriggerPosition = 3,
    TriggerGlobal = 4,
    ChannelEnable = 5,
    TriggerStage = 6,
}

fn tag(version: TlvVersion, variable: VariableId, word_count: u16) -> u16 {
    match version {
        TlvVersion::V1 => ((variable as u16) << 8) | word_count,
        // v2 shifts the variable id up by one byte-lane to make room for the
        // 32-bit channel-enable word without truncating the tag space.
        TlvVersion::V2 => ((variable as u16) << 9) | word_count,
    }
}

#[derive(Debug, Clone)]
pub struct DslogicConfig {
    pub version: TlvVersion,
    pub mode: u32,
    pub divider: u32,
    pub sample_count: u32,
    pub trigger_position: u32,
    pub trigger_global: u32,
    /// 16 bits on v1, 32 bits used (upper bits zero) on v1; full 32 bits on v2.
    pub channel_enable: u32,
    pub stages: [TriggerStage; TRIGGER_STAGE_COUNT],
}

impl DslogicConfig {
    /// `trig_glb` packs the enabled-channel count with the stage-used count
    /// (spec.md §4.7): bits 4.. on v1, bits 8.. on v2 hold the channel
    /// count; the low nibble (v1) or low byte (v2) holds the stage count.
    pub fn pack_trigger_global(version: TlvVersion, enabled_channels: u32, stages_used: u32) -> u32 {
        match version {
            TlvVersion::V1 => (enabled_channels << 4) | (stages_used & 0xF),
            TlvVersion::V2 => (enabled_channels << 8) | (stages_used & 0xFF),
        }
    }

    fn push_tlv(&self, out: &mut Vec<u8>, variable: VariableId, words: &[u32]) {
        let word_count = words.len() as u16;
        out.extend_from_slice(&tag(self.version, variable, word_count).to_le_bytes());
        for w in words {
            out.extend_from_slice(&w.to_le_bytes());
        }
    }

    /// Serialize to the wire format: start marker, TLV tuples, end marker.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&START_MARKER.to_le_bytes());
        self.push_tlv(&mut out, VariableId::Mode, &[self.mode]);
        self.push_tlv(&mut out, VariableId::Divider, &[self.divider]);
        self.push_tlv(&mut out, VariableId::SampleCount, &[self.sample_count]);
        self.push_tlv(&mut out, VariableId::TriggerPosition, &[self.trigger_position]);
        self.push_tlv(&mut out, VariableId::TriggerGlobal, &[self.trigger_global]);
        let enable_words: &[u32] = match self.version {
            TlvVersion::V1 => &[self.channel_enable & 0xFFFF],
            TlvVersion::V2 => &[self.channel_enable],
        };
        self.push_tlv(&mut out, VariableId::ChannelEnable, enable_words);
        for stage in &self.stages {
            self.push_tlv(&mut out, VariableId::TriggerStage, &stage.words);
        }
        out.extend_from_slice(&END_MARKER.to_le_bytes());
        out
    }
}

/// Compile a logic trigger's primary-stage channel matches into stage 0's
/// mask/value/edge words, leaving stages 1.. at identity (spec.md §4.7).
pub fn compile_trigger(matches: &[ChannelMatch]) -> [TriggerStage; TRIGGER_STAGE_COUNT] {
    let mut stages = [TriggerStage::identity(); TRIGGER_STAGE_COUNT];
    let stage0 = &mut stages[0];
    for (k, m) in matches.iter().enumerate() {
        let (mask_bit, value_bit, edge_bit) = m.bits();
        let (mask_word, value_word, edge_word) = if k < 32 { (0, 2, 4) } else { (1, 3, 5) };
        let bit = k % 32;
        set_bit(&mut stage0.words[mask_word], bit, mask_bit);
        set_bit(&mut stage0.words[value_word], bit, value_bit);
        set_bit(&mut stage0.words[edge_word], bit, edge_bit);
    }
    stages
}

fn set_bit(word: &mut u32, bit: usize, value: bool) {
    if value {
        *word |= 1 << bit;
    } else {
        *word &= !(1 << bit);
    }
}
