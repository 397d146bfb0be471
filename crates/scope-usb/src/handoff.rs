//! Two-state worker hand-off (spec.md §5): the USB completion thread must
//! not block on deinterleaving, so each completed payload is handed to a
//! dedicated worker thread through a small state machine built on a
//! `Mutex` + `Condvar`, mirroring the thread-per-submission pattern used
//! for USB transport completions (`scope_transport::usb`).
//!
//! `IDLE <-> START_REQUESTED -> RUNNING -> {IDLE | MAX_SAMPLES_REACHED |
//! ABORT_REQUESTED}`. Only one payload is ever in flight; `submit` blocks
//! the caller until the worker has driven the state back to `Idle` (or a
//! terminal outcome), so completions are naturally throttled to the
//! worker's pace.

use std::sync::{Condvar, Mutex};

enum HandoffState {
    Idle,
    StartRequested(Vec<u8>),
    Running,
    MaxSamplesReached,
    AbortRequested,
    Shutdown,
}

/// Outcome reported back to the USB completion thread after a hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    Continue,
    MaxSamplesReached,
    Aborted,
}

/// Outcome the worker reports when it finishes processing a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    Done,
    MaxSamplesReached,
    Aborted,
}

pub struct DeinterleaveHandoff {
    state: Mutex<HandoffState>,
    condvar: Condvar,
}

impl DeinterleaveHandoff {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HandoffState::Idle),
            condvar: Condvar::new(),
        }
    }

    /// USB completion thread side: hand off `payload`, blocking until the
    /// worker returns to `Idle` or a terminal state.
    pub fn submit(&self, payload: Vec<u8>) -> HandoffOutcome {
        let mut state = self.state.lock().unwrap();
        *state = HandoffState::StartRequested(payload);
        self.condvar.notify_all();
        loop {
            match &*state {
                HandoffState::StartRequested(_) | HandoffState::Running => {
                    state = self.condvar.wait(state).unwrap();
                }
                HandoffState::Idle => return HandoffOutcome::Continue,
                HandoffState::MaxSamplesReached => {
                    *state = HandoffState::Idle;
                    return HandoffOutcome::MaxSamplesReached;
                }
                HandoffState::AbortRequested => {
                    *state = HandoffState::Idle;
                    return HandoffOutcome::Aborted;
                }
                HandoffState::Shutdown => return HandoffOutcome::Aborted,
            }
        }
    }

    /// Worker side: block until a payload is ready, take it, and move to
    /// `Running`. Returns `None` once the pool has been shut down.
    pub fn take(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        loop {
            match &*state {
                HandoffState::StartRequested(_) => {
                    let prev = std::mem::replace(&mut *state, HandoffState::Running);
                    let HandoffState::StartRequested(payload) = prev else {
                        unreachable!("just matched StartRequested")
                    };
                    return Some(payload);
                }
                HandoffState::Shutdown => return None,
                _ => state = self.condvar.wait(state).unwrap(),
            }
        }
    }

    /// Worker side: report the result of processing the taken payload.
    pub fn complete(&self, outcome: WorkerOutcome) {
        let mut state = self.state.lock().unwrap();
        *state = match outcome {
            WorkerOutcome::Done => HandoffState::Idle,
            WorkerOutcome::MaxSamplesReached => HandoffState::MaxSamplesReached,
            WorkerOutcome::Aborted => HandoffState::AbortRequested,
        };
        self.condvar.notify_all();
    }

    /// Wake the worker for shutdown; any blocked `submit` call also
    /// returns immediately with `Aborted`.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        *state = HandoffState::Shutdown;
        self.condvar.notify_all();
    }
}

impl Default for DeinterleaveHandoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn round_trip_through_worker_thread() {
        let handoff = Arc::new(DeinterleaveHandoff::new());
        let worker_handoff = Arc::clone(&handoff);
        let worker = thread::spawn(move || {
            let payload = worker_handoff.take().expect("payload");
            assert_eq!(payload, vec![1, 2, 3]);
            worker_handoff.complete(WorkerOutcome::Done);
            assert!(worker_handoff.take().is_none());
        });

        let outcome = handoff.submit(vec![1, 2, 3]);
        assert_eq!(outcome, HandoffOutcome::Continue);
        handoff.shutdown();
        worker.join().unwrap();
    }

    #[test]
    fn max_samples_reached_propagates_to_submitter() {
        let handoff = Arc::new(DeinterleaveHandoff::new());
        let worker_handoff = Arc::clone(&handoff);
        let worker = thread::spawn(move || {
            let _ = worker_handoff.take().expect("payload");
            worker_handoff.complete(WorkerOutcome::MaxSamplesReached);
        });

        let outcome = handoff.submit(vec![9]);
        assert_eq!(outcome, HandoffOutcome::MaxSamplesReached);
        worker.join().unwrap();
    }

    #[test]
    fn only_one_payload_in_flight_at_a_time() {
        let handoff = Arc::new(DeinterleaveHandoff::new());
        let worker_handoff = Arc::clone(&handoff);
        let worker = thread::spawn(move || {
            for _ in 0..3 {
                let payload = worker_handoff.take().expect("payload");
                assert_eq!(payload.len(), 1);
                worker_handoff.complete(WorkerOutcome::Done);
            }
            assert!(worker_handoff.take().is_none());
        });

        for i in 0..3u8 {
            assert_eq!(handoff.submit(vec![i]), HandoffOutcome::Continue);
        }
        handoff.shutdown();
        worker.join().unwrap();
    }
}
