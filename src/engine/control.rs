//! Cooperative Control and Progress
//!
//! The stop/pause flags polled by every phase and the progress channel that
//! publishes append-only partial results to the caller. Both are cheap
//! cloneable handles around shared state so workers, the engine and the
//! embedding application can hold them concurrently.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::constants::engine::PAUSE_POLL_MS;
use crate::types::Finding;

/// Callback receiving the current partial-results snapshot
///
/// Invoked at heartbeats and phase ends; callers must tolerate repeated
/// invocations and append-only growth.
pub type ProgressCallback = Arc<dyn Fn(&[Finding]) + Send + Sync>;

#[derive(Default)]
struct ControlState {
    stop: AtomicBool,
    pause: AtomicBool,
}

/// Shared stop/pause signal
#[derive(Clone, Default)]
pub struct ScanControl {
    state: Arc<ControlState>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.state.stop.store(true, Ordering::SeqCst);
    }

    pub fn request_pause(&self) {
        self.state.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.state.pause.store(false, Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.state.stop.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.state.pause.load(Ordering::SeqCst)
    }

    /// Suspension point: sleeps in small increments while paused, then
    /// reports whether the operation should stop
    pub fn checkpoint(&self) -> bool {
        while self.is_paused() && !self.should_stop() {
            std::thread::sleep(Duration::from_millis(PAUSE_POLL_MS));
        }
        self.should_stop()
    }
}

/// Append-only partial results plus the optional progress callback
pub struct Progress {
    callback: Option<ProgressCallback>,
    partial: Mutex<Vec<Finding>>,
    since_flush: AtomicUsize,
}

impl Progress {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            partial: Mutex::new(Vec::new()),
            since_flush: AtomicUsize::new(0),
        }
    }

    /// Append one finding without flushing
    pub fn push(&self, finding: Finding) {
        if let Ok(mut partial) = self.partial.lock() {
            partial.push(finding);
        }
        self.since_flush.fetch_add(1, Ordering::Relaxed);
    }

    /// Append one finding and flush when `every` findings have accumulated
    /// since the last flush
    pub fn push_with_heartbeat(&self, finding: Finding, every: usize) {
        self.push(finding);
        if self.since_flush.load(Ordering::Relaxed) >= every {
            self.flush();
        }
    }

    /// Invoke the callback with the current snapshot
    pub fn flush(&self) {
        self.since_flush.store(0, Ordering::Relaxed);
        if let Some(callback) = &self.callback
            && let Ok(partial) = self.partial.lock()
        {
            callback(&partial);
        }
    }

    pub fn snapshot(&self) -> Vec<Finding> {
        self.partial.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.partial.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
