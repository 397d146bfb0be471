//! Wire-format codecs shared across driver families (spec.md §4.2): the
//! IEEE-488.2 definite-length block header, the Siglent descriptor block,
//! the DSLogic FPGA configuration TLV (plus the logic trigger compiler that
//! feeds it), the Juntek textual request/response grammar, and the
//! raw-sample-to-volts scaling used by all analog decoders.

pub mod dslogic_tlv;
pub mod ieee4882;
pub mod juntek;
pub mod scale;
pub mod siglent;
