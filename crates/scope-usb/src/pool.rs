//! USB bulk transfer pool (spec.md §4.4): a ring of in-flight bulk-in
//! transfers with resubmission, cancellation, and empty-transfer
//! backpressure. Transfer records live in an arena indexed by opaque
//! handles (spec.md §9) rather than back-pointers, so the pool owns the
//! arena and the device context only ever holds handles.

use std::collections::HashSet;
use std::time::Duration;

use scope_model::error::Result;
use scope_transport::usb::{Completion, TransferHandle, UsbTransferOutcome, UsbTransport};

/// Bytes transferred per sample across all enabled channels: each 64-sample
/// window carries one 64-bit (8 byte) word per enabled channel.
fn bytes_per_sample(enabled_channels: usize) -> f64 {
    enabled_channels as f64 / 8.0
}

/// `block_size = enabled_channel_count × 512` bytes (spec.md §4.4).
pub fn block_size(enabled_channels: usize) -> usize {
    enabled_channels * 512
}

/// `ceil(10ms_worth / block_size) × block_size`.
pub fn per_transfer_size(sample_rate_hz: f64, enabled_channels: usize) -> usize {
    let ten_ms_worth_bytes = (sample_rate_hz / 100.0) * bytes_per_sample(enabled_channels);
    let block = block_size(enabled_channels).max(1);
    let blocks = (ten_ms_worth_bytes / block as f64).ceil().max(1.0) as usize;
    blocks * block
}

/// `num_transfers = min(pool_cap, ceil(100ms_worth / per_transfer_size))`.
pub fn num_transfers(sample_rate_hz: f64, enabled_channels: usize, pool_cap: usize) -> usize {
    let hundred_ms_worth_bytes = (sample_rate_hz / 10.0) * bytes_per_sample(enabled_channels);
    let per_transfer = per_transfer_size(sample_rate_hz, enabled_channels).max(1);
    let n = (hundred_ms_worth_bytes / per_transfer as f64).ceil().max(1.0) as usize;
    n.min(pool_cap)
}

/// `1.25 × (total_buffer_size / per-ms-throughput)`.
pub fn transfer_timeout(total_buffer_size: usize, sample_rate_hz: f64, enabled_channels: usize) -> Duration {
    let per_ms_throughput = (sample_rate_hz / 1000.0) * bytes_per_sample(enabled_channels);
    if per_ms_throughput <= 0.0 {
        return Duration::from_secs(1);
    }
    let millis = 1.25 * (total_buffer_size as f64 / per_ms_throughput);
    Duration::from_secs_f64((millis / 1000.0).max(0.0))
}

/// Result of processing a batch of transfer completions.
#[derive(Debug)]
pub enum PoolOutcome {
    /// Still running; these payloads are ready for deinterleave.
    Continue(Vec<Vec<u8>>),
    /// `MAX_EMPTY_TRANSFERS` consecutive empty timeouts: device stalled.
    Stalled,
    /// Submission failure or `NO_DEVICE`.
    Aborted,
}

pub struct TransferPool {
    endpoint: u8,
    per_transfer_size: usize,
    timeout: Duration,
    num_transfers: usize,
    max_empty_transfers: u32,
    empty_count: u32,
    submitted: HashSet<TransferHandle>,
    aborted: bool,
}

impl TransferPool {
    pub fn new(
        endpoint: u8,
        sample_rate_hz: f64,
        enabled_channels: usize,
        pool_cap: usize,
        total_buffer_size: usize,
    ) -> Self {
        let n = num_transfers(sample_rate_hz, enabled_channels, pool_cap);
        Self {
            endpoint,
            per_transfer_size: per_transfer_size(sample_rate_hz, enabled_channels),
            timeout: transfer_timeout(total_buffer_size, sample_rate_hz, enabled_channels),
            num_transfers: n,
            // "approx 2x pool size" (spec.md §4.4).
            max_empty_transfers: (2 * n).max(1) as u32,
            empty_count: 0,
            submitted: HashSet::new(),
            aborted: false,
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.len()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn is_drained(&self) -> bool {
        self.submitted.is_empty()
    }

    /// Fill the ring at acquisition start.
    pub fn fill<T: UsbTransport>(&mut self, transport: &mut T) -> Result<()> {
        for _ in 0..self.num_transfers {
            self.submit_one(transport)?;
        }
        Ok(())
    }

    fn submit_one<T: UsbTransport>(&mut self, transport: &mut T) -> Result<()> {
        if self.aborted {
            return Ok(());
        }
        match transport.submit_in(self.endpoint, self.per_transfer_size, self.timeout) {
            Ok(handle) => {
                self.submitted.insert(handle);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "usb transfer submission failed, aborting pool");
                self.aborted = true;
                Err(e)
            }
        }
    }

    /// Feed a batch of completions observed this tick. Resubmits completed
    /// or partially-timed-out transfers; declares the device stalled after
    /// `max_empty_transfers` consecutive zero-payload timeouts.
    pub fn handle_completions<T: UsbTransport>(
        &mut self,
        transport: &mut T,
        completions: Vec<Completion>,
    ) -> PoolOutcome {
        let mut ready = Vec::new();
        for completion in completions {
            self.submitted.remove(&completion.handle);
            if self.aborted {
                continue;
            }
            match completion.outcome {
                UsbTransferOutcome::Ok => {
                    self.empty_count = 0;
                    ready.push(completion.payload);
                    if self.submit_one(transport).is_err() {
                        return PoolOutcome::Aborted;
                    }
                }
                UsbTransferOutcome::TimedOutPartial => {
                    self.empty_count = 0;
                    ready.push(completion.payload);
                    if self.submit_one(transport).is_err() {
                        return PoolOutcome::Aborted;
                    }
                }
                UsbTransferOutcome::TimedOutEmpty => {
                    self.empty_count += 1;
                    tracing::warn!(count = self.empty_count, "empty usb transfer");
                    if self.empty_count >= self.max_empty_transfers {
                        self.aborted = true;
                        return PoolOutcome::Stalled;
                    }
                    if self.submit_one(transport).is_err() {
                        return PoolOutcome::Aborted;
                    }
                }
                UsbTransferOutcome::NoDevice => {
                    self.aborted = true;
                    return PoolOutcome::Aborted;
                }
                UsbTransferOutcome::Cancelled => {}
            }
        }
        PoolOutcome::Continue(ready)
    }

    /// `acquisition_stop` (spec.md §5): cancel every outstanding transfer;
    /// the caller must keep polling completions until `is_drained()`.
    pub fn abort<T: UsbTransport>(&mut self, transport: &mut T) {
        self.aborted = true;
        for handle in self.submitted.iter().copied().collect::<Vec<_>>() {
            let _ = transport.cancel(handle);
        }
    }
}
