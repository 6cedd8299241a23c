//! Background writeback thread (§4.4, §9).
//!
//! A single worker thread wakes up on a fixed interval and calls back
//! into the cache to flush whatever's dirty. Shutdown is a channel send
//! rather than an atomic flag plus park/unpark, so `Drop` can't race with
//! the worker deciding whether to sleep again.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Result;

/// Owns the worker thread for as long as it's kept alive; dropping it
/// blocks until the thread has woken up, observed the shutdown signal,
/// and exited.
pub struct Flusher {
    shutdown: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    /// Spawn the worker. `flush` is called once per `interval` tick; a
    /// failure is logged but doesn't stop the thread, since a transient
    /// I/O error on one tick shouldn't take down writeback permanently.
    pub fn spawn<F>(interval: Duration, mut flush: F) -> Self
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let (shutdown, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("cache-flusher".into())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if let Err(e) = flush() {
                            log::warn!(target: "treecache::flusher", "background flush failed: {e}");
                        }
                    }
                }
            })
            .expect("failed to spawn background flusher thread");
        Flusher {
            shutdown,
            handle: Some(handle),
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
