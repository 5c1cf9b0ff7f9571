//! Periodic checkpoint task
//!
//! Owned background thread with a stop channel, joined on shutdown.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

use crate::error::{Result, StashError};

/// Runs a checkpoint closure once on start and then every `interval`
///
/// Dropping the sender wakes the thread immediately; `stop` (or `Drop`)
/// does that and joins it.
pub struct Checkpointer {
    /// Dropped to signal the thread
    stop_tx: Option<Sender<()>>,

    handle: Option<JoinHandle<()>>,
}

impl Checkpointer {
    /// Spawn the checkpoint thread. A zero interval is rejected.
    pub fn spawn<F>(interval: Duration, mut checkpoint: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if interval.is_zero() {
            return Err(StashError::Config(
                "snapshot interval must be greater than zero".to_string(),
            ));
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("kvstash-checkpoint".to_string())
            .spawn(move || {
                tracing::debug!(interval_ms = interval.as_millis() as u64, "checkpoint thread started");

                checkpoint();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => checkpoint(),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                tracing::debug!("checkpoint thread stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the thread has not been stopped yet
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signal the thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        drop(self.stop_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("checkpoint thread panicked");
            }
        }
    }
}

impl Drop for Checkpointer {
    fn drop(&mut self) {
        self.stop();
    }
}
