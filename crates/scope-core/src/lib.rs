//! Acquisition state machine, mirror/config-apply, and driver dispatch
//! (spec.md §4.3 C3, §4.5 C5, §4.7 C7).

pub mod apply;
pub mod config;
pub mod driver;
pub mod dslogic;
pub mod ieee4882;
pub mod jds;
pub mod legacy;
pub mod open;
pub mod packet;
pub mod siglent;
pub mod trigger_wait;

pub use config::DriverConfig;
pub use driver::Driver;
pub use jds::JdsMirror;
pub use packet::{Packet, Quantity};
