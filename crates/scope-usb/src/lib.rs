//! USB transfer pool, deinterleaver, trigger-offset splitter, and
//! deinterleave-worker hand-off for DSLogic-class logic analyzers
//! (spec.md §4.4, C4).

pub mod deinterleave;
pub mod handoff;
pub mod pool;
pub mod splitter;

pub use deinterleave::deinterleave;
pub use handoff::{DeinterleaveHandoff, HandoffOutcome, WorkerOutcome};
pub use pool::{PoolOutcome, TransferPool};
pub use splitter::{SplitItem, TriggerOffsetSplitter};
