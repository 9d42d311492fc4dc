//! Trigger coalescing for regenerate storms: rapid-fire triggers collapse
//! into one callback invocation once a quiescence window passes with no new
//! trigger.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Quiescence window used by generators between form edits and a rebuild.
pub const REGENERATE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Runs a callback on a worker thread after `quiet` elapses without a new
/// [`trigger`](Self::trigger). Triggers that land while a window is open
/// restart it, so a burst produces exactly one invocation.
///
/// Dropping the debouncer stops the worker; a window still open at drop time
/// is discarded without firing.
#[derive(Debug)]
pub struct Debouncer {
    tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new<F>(quiet: Duration, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let worker = std::thread::spawn(move || {
            while rx.recv().is_ok() {
                // A window is open; keep restarting it while triggers arrive.
                loop {
                    match rx.recv_timeout(quiet) {
                        Ok(()) => {}
                        Err(RecvTimeoutError::Timeout) => {
                            callback();
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    pub fn trigger(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(());
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
