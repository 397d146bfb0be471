//! Driver open configuration (spec.md §9's "explicit framework context"
//! design note, formalized in the ambient spec as `DriverConfig`). Opening
//! a driver takes this explicitly rather than reaching into global state;
//! there is no process-wide libusb context or device list held anywhere in
//! this crate. Each `Driver` variant carries its own copy: `open_timeout`
//! bounds `Driver::sync_mirror`'s SCPI reads (`crate::open`), and
//! `max_block_len` caps the length IEEE-488.2/Siglent block parsing will
//! accept (`crate::ieee4882`, `crate::siglent`).

use std::time::Duration;

/// Configuration the host framework's enumeration step passes when opening
/// a driver. Carries no file-based configuration format of its own --
/// persisted state is out of scope (spec.md §6).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How long to wait for the open-time mirror poll (spec.md §4.5) before
    /// giving up.
    pub open_timeout: Duration,
    /// Cap on declared block lengths the wire codecs will accept
    /// (spec.md §4.2.1); guards against a corrupt header claiming an
    /// unreasonable payload size.
    pub max_block_len: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(3),
            max_block_len: 16 * 1024 * 1024,
        }
    }
}
