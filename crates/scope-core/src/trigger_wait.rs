//! Trigger wait (spec.md §4.3 transition 2, `ARM -> WAIT_TRIGGER`).
//!
//! Polls `:TRIG:STAT?` at `poll_interval` steps up to `total_timeout`;
//! `Timeout` is non-fatal (spec.md §7) and the caller is expected to retry
//! on its next tick rather than treat it as an acquisition failure.
//!
//! At timebases below 50 ms/div the poll is skipped entirely: a fixed sleep
//! of `0.85 × timebase × hdivs` microseconds substitutes for it (spec.md
//! §4.3 transition 2), since the acquisition completes faster than a round
//! trip to the instrument would take to confirm it.
//!
//! The source firmware's own edge-detection nuance ("observe non-triggered
//! then observe triggered", spec.md §9 open question) is not reproduced
//! here: the source itself flags the exact predicate as unconfirmed against
//! firmware behavior, so this implementation takes the status literally --
//! any poll returning a triggered status ends the wait.

use std::time::{Duration, Instant};

use scope_model::error::{Error, Result};
use scope_transport::ScpiTransport;

/// Timebases below this many seconds/division skip the `:TRIG:STAT?` poll
/// (spec.md §4.3 transition 2's "< 50 ms/div" threshold).
const FAST_TIMEBASE_THRESHOLD: f64 = 0.050;

fn is_triggered(status: &str) -> bool {
    let s = status.trim();
    s.starts_with('T') || s.starts_with('A')
}

/// Fixed sleep substituting for the trigger-status poll at fast timebases
/// (spec.md §4.3 transition 2): `0.85 × timebase × hdivs`, stated in
/// microseconds.
fn fast_timebase_sleep(timebase: f64, horizontal_divisions: u32) -> Duration {
    let micros = 0.85 * timebase * horizontal_divisions as f64;
    Duration::from_secs_f64((micros / 1_000_000.0).max(0.0))
}

pub fn wait_for_trigger<T: ScpiTransport + ?Sized>(
    transport: &mut T,
    timebase: f64,
    horizontal_divisions: u32,
    poll_interval: Duration,
    total_timeout: Duration,
) -> Result<()> {
    if timebase < FAST_TIMEBASE_THRESHOLD {
        let sleep = fast_timebase_sleep(timebase, horizontal_divisions);
        tracing::debug!(timebase, horizontal_divisions, ?sleep, "fast timebase, sleeping instead of polling trigger status");
        std::thread::sleep(sleep);
        return Ok(());
    }

    let deadline = Instant::now() + total_timeout;
    loop {
        transport.send(":TRIG:STAT?")?;
        let status = transport.receive_line(poll_interval)?;
        tracing::debug!(status = %status, "trigger status poll");
        if is_triggered(&status) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout);
        }
    }
}
