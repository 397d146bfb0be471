//! Transport abstraction over line-oriented SCPI, serial, and USB bulk
//! endpoints (spec.md §4.1). All transports are driven from a single event
//! source per the session's poll loop; no transport callback blocks longer
//! than its declared read timeout.

pub mod mock;
pub mod scpi;
pub mod usb;

#[cfg(feature = "serial")]
pub mod serial;

pub use scpi::ScpiTransport;
pub use usb::UsbTransport;
