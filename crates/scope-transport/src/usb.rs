//! USB bulk/control transport (spec.md §4.1).
//!
//! `submit_in` queues a transfer; completions surface later through
//! `poll_completions`, driven by the session's periodic tick (USB has no
//! native readiness file descriptor the way a serial port does).
//! `control_in`/`control_out` are synchronous, used for FPGA config and
//! status reads.

use std::time::Duration;

use scope_model::error::Result;

pub type TransferHandle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbTransferOutcome {
    /// Transfer completed; payload length is carried separately.
    Ok,
    /// Timed out with zero payload (spec.md §4.4 empty-transfer backpressure).
    TimedOutEmpty,
    /// Timed out with a partial payload.
    TimedOutPartial,
    /// Device disappeared mid-transfer.
    NoDevice,
    /// Transfer was cancelled by `cancel`.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub handle: TransferHandle,
    pub outcome: UsbTransferOutcome,
    pub payload: Vec<u8>,
}

/// Implemented by any USB bulk/control backend: a real libusb-backed
/// device, or a scripted mock for tests.
pub trait UsbTransport {
    fn submit_in(&mut self, endpoint: u8, buf_len: usize, timeout: Duration) -> Result<TransferHandle>;
    fn cancel(&mut self, handle: TransferHandle) -> Result<()>;
    fn control_in(&mut self, request: u8, value: u16, index: u16, len: usize) -> Result<Vec<u8>>;
    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<()>;
    fn bulk_out(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Drain transfer completions observed since the last call. Called from
    /// the session's periodic tick (spec.md §4.1, §5).
    fn poll_completions(&mut self) -> Vec<Completion>;
}

#[cfg(feature = "usb")]
pub mod rusb_backend {
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use rusb::{DeviceHandle, GlobalContext};

    use super::*;

    /// A real device handle, driving bulk-in reads on a dedicated thread
    /// per spec.md §9's "channel or condition variable receiving completion
    /// events" design note, rather than porting libusb's raw async-transfer
    /// callback API.
    pub struct RusbTransport {
        handle: Arc<Mutex<DeviceHandle<GlobalContext>>>,
        next_handle: TransferHandle,
        completions_tx: Sender<Completion>,
        completions_rx: Receiver<Completion>,
    }

    impl RusbTransport {
        pub fn new(handle: DeviceHandle<GlobalContext>) -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                handle: Arc::new(Mutex::new(handle)),
                next_handle: 0,
                completions_tx: tx,
                completions_rx: rx,
            }
        }
    }

    impl UsbTransport for RusbTransport {
        fn submit_in(&mut self, endpoint: u8, buf_len: usize, timeout: Duration) -> Result<TransferHandle> {
            let handle_id = self.next_handle;
            self.next_handle = self.next_handle.wrapping_add(1);
            let device = Arc::clone(&self.handle);
            let tx = self.completions_tx.clone();
            thread::spawn(move || {
                let mut buf = vec![0u8; buf_len];
                let guard = device.lock().expect("usb device mutex poisoned");
                let completion = match guard.read_bulk(endpoint, &mut buf, timeout) {
                    Ok(n) => {
                        buf.truncate(n);
                        Completion {
                            handle: handle_id,
                            outcome: UsbTransferOutcome::Ok,
                            payload: buf,
                        }
                    }
                    Err(rusb::Error::Timeout) => Completion {
                        handle: handle_id,
                        outcome: UsbTransferOutcome::TimedOutEmpty,
                        payload: Vec::new(),
                    },
                    Err(rusb::Error::NoDevice) => Completion {
                        handle: handle_id,
                        outcome: UsbTransferOutcome::NoDevice,
                        payload: Vec::new(),
                    },
                    Err(_) => Completion {
                        handle: handle_id,
                        outcome: UsbTransferOutcome::NoDevice,
                        payload: Vec::new(),
                    },
                };
                let _ = tx.send(completion);
            });
            Ok(handle_id)
        }

        fn cancel(&mut self, handle: TransferHandle) -> Result<()> {
            // The blocking-read backend can't interrupt an in-flight read;
            // a cancelled transfer is simply dropped when it eventually
            // completes or times out (the pool ignores completions for
            // handles it has already freed).
            let _ = handle;
            Ok(())
        }

        fn control_in(&mut self, request: u8, value: u16, index: u16, len: usize) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; len];
            let guard = self.handle.lock().expect("usb device mutex poisoned");
            let n = guard
                .read_control(
                    rusb::request_type(rusb::Direction::In, rusb::RequestType::Vendor, rusb::Recipient::Device),
                    request,
                    value,
                    index,
                    &mut buf,
                    Duration::from_secs(1),
                )
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            buf.truncate(n);
            Ok(buf)
        }

        fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<()> {
            let guard = self.handle.lock().expect("usb device mutex poisoned");
            guard
                .write_control(
                    rusb::request_type(rusb::Direction::Out, rusb::RequestType::Vendor, rusb::Recipient::Device),
                    request,
                    value,
                    index,
                    data,
                    Duration::from_secs(1),
                )
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            Ok(())
        }

        fn bulk_out(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize> {
            let guard = self.handle.lock().expect("usb device mutex poisoned");
            guard
                .write_bulk(endpoint, data, timeout)
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
        }

        fn poll_completions(&mut self) -> Vec<Completion> {
            self.completions_rx.try_iter().collect()
        }
    }
}

/// A scripted `UsbTransport` for exercising the transfer pool and
/// deinterleaver (`scope-usb`) without real hardware.
pub mod mock {
    use std::collections::VecDeque;

    use super::*;

    pub struct MockUsbTransport {
        next_handle: TransferHandle,
        pending: VecDeque<Completion>,
        in_flight: Vec<TransferHandle>,
        pub submissions: usize,
    }

    impl MockUsbTransport {
        pub fn new() -> Self {
            Self {
                next_handle: 0,
                pending: VecDeque::new(),
                in_flight: Vec::new(),
                submissions: 0,
            }
        }

        /// Queue a completion to be returned, in FIFO order, on the next
        /// `submit_in` call (one completion consumed per submission, then
        /// surfaced by the following `poll_completions`).
        pub fn queue_completion(&mut self, outcome: UsbTransferOutcome, payload: Vec<u8>) {
            self.pending.push_back(Completion {
                handle: 0,
                outcome,
                payload,
            });
        }

        pub fn in_flight_count(&self) -> usize {
            self.in_flight.len()
        }
    }

    impl Default for MockUsbTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UsbTransport for MockUsbTransport {
        fn submit_in(&mut self, _endpoint: u8, _buf_len: usize, _timeout: Duration) -> Result<TransferHandle> {
            let handle = self.next_handle;
            self.next_handle = self.next_handle.wrapping_add(1);
            self.in_flight.push(handle);
            self.submissions += 1;
            Ok(handle)
        }

        fn cancel(&mut self, handle: TransferHandle) -> Result<()> {
            self.in_flight.retain(|&h| h != handle);
            Ok(())
        }

        fn control_in(&mut self, _request: u8, _value: u16, _index: u16, len: usize) -> Result<Vec<u8>> {
            Ok(vec![0u8; len])
        }

        fn control_out(&mut self, _request: u8, _value: u16, _index: u16, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn bulk_out(&mut self, _endpoint: u8, data: &[u8], _timeout: Duration) -> Result<usize> {
            Ok(data.len())
        }

        fn poll_completions(&mut self) -> Vec<Completion> {
            let mut out = Vec::new();
            // Pair each still-in-flight transfer with the next scripted
            // completion, oldest transfer first.
            while let Some(mut completion) = self.pending.pop_front() {
                if self.in_flight.is_empty() {
                    self.pending.push_front(completion);
                    break;
                }
                completion.handle = self.in_flight.remove(0);
                out.push(completion);
            }
            out
        }
    }
}
