//! Frame clocks
//!
//! The timeline controller never ticks by itself; it asks a `FrameClock` for
//! the next frame. Production binds time to the video element (`ExternalClock`),
//! headless playback uses `TokioFrameClock`, and tests step a `ManualClock`.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Callback run when a requested frame is due
pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

/// Source of animation frames.
///
/// Implementations must never run the callback from inside `request_frame`.
pub trait FrameClock: Send + Sync {
    /// Schedule `callback` for the next frame
    fn request_frame(&self, callback: FrameCallback) -> FrameId;

    /// Cancel a pending frame. Unknown or already-run ids are ignored.
    fn cancel(&self, id: FrameId);
}

// =============================================================================
// Manual clock
// =============================================================================

/// Clock stepped explicitly by the caller
#[derive(Default)]
pub struct ManualClock {
    next_id: AtomicU64,
    pending: Mutex<BTreeMap<u64, FrameCallback>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every frame that is currently due. Frames requested by those
    /// callbacks wait for the next call. Returns how many callbacks ran.
    pub fn advance(&self) -> usize {
        let due = std::mem::take(&mut *self.pending.lock());
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }

    /// Advance until nothing is pending or `max_frames` frames have run
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.advance() > 0 {
            frames += 1;
        }
        frames
    }

    /// Number of frames waiting to run
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl FrameClock for ManualClock {
    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().insert(id, callback);
        FrameId(id)
    }

    fn cancel(&self, id: FrameId) {
        self.pending.lock().remove(&id.0);
    }
}

// =============================================================================
// Tokio clock
// =============================================================================

/// Clock that fires frames on a tokio runtime after a fixed interval
pub struct TokioFrameClock {
    handle: Handle,
    interval: Duration,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioFrameClock {
    pub fn new(handle: Handle, interval: Duration) -> Self {
        Self {
            handle,
            interval,
            next_id: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Clock on the runtime of the calling task, if there is one
    pub fn from_current(interval: Duration) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(handle, interval))
    }
}

impl FrameClock for TokioFrameClock {
    fn request_frame(&self, callback: FrameCallback) -> FrameId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let interval = self.interval;
        let tasks = Arc::clone(&self.tasks);

        // Hold the map while spawning so the task cannot remove itself first.
        let mut guard = self.tasks.lock();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(interval).await;
            tasks.lock().remove(&id);
            callback();
        });
        guard.insert(id, task);

        FrameId(id)
    }

    fn cancel(&self, id: FrameId) {
        if let Some(task) = self.tasks.lock().remove(&id.0) {
            task.abort();
        }
    }
}

impl Drop for TokioFrameClock {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

// =============================================================================
// External clock
// =============================================================================

/// Clock that never fires.
///
/// Used while a video element is bound: the video is the clock and the
/// controller only moves through `seek`.
#[derive(Default)]
pub struct ExternalClock {
    next_id: AtomicU64,
}

impl ExternalClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for ExternalClock {
    fn request_frame(&self, _callback: FrameCallback) -> FrameId {
        FrameId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn cancel(&self, _id: FrameId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_manual_clock_runs_and_cancels() {
        let clock = ManualClock::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        clock.request_frame(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = hits.clone();
        let cancelled = clock.request_frame(Box::new(move || {
            h.fetch_add(10, Ordering::SeqCst);
        }));
        clock.cancel(cancelled);

        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.advance(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(clock.advance(), 0);
    }

    #[tokio::test]
    async fn test_tokio_clock_fires_after_interval() {
        let clock = TokioFrameClock::from_current(Duration::from_millis(1)).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        clock.request_frame(Box::new(move || {
            let _ = tx.send(());
        }));

        tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("frame did not fire")
            .unwrap();
    }

    #[tokio::test]
    async fn test_tokio_clock_cancel() {
        let clock = TokioFrameClock::from_current(Duration::from_millis(20)).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        let id = clock.request_frame(Box::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        }));
        clock.cancel(id);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_external_clock_never_fires() {
        let clock = ExternalClock::new();
        let a = clock.request_frame(Box::new(|| panic!("external clock must not fire")));
        let b = clock.request_frame(Box::new(|| {}));
        assert_ne!(a, b);
    }
}
