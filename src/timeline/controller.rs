//! Timeline controller
//!
//! Renderer-agnostic playhead state machine: current position, duration and
//! play state, plus subscribers notified on every time change. It knows
//! nothing about video elements or replay engines; time only moves through
//! `seek` or through frames delivered by its `FrameClock`.

use super::clock::{FrameClock, FrameId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Default playhead advance per frame (about 60fps)
pub const DEFAULT_FRAME_STEP_MS: f64 = 16.0;

/// Snapshot of the playhead
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineState {
    pub current_time_ms: f64,
    pub duration_ms: f64,
    pub is_playing: bool,
}

struct Subscriber {
    callback: Box<dyn Fn(f64) + Send + Sync>,
    /// One past the revision of the last delivered change, 0 before the first
    seen: AtomicU64,
}

impl Subscriber {
    /// Deliver `time` unless this subscriber already saw the same or a newer change
    fn deliver(&self, time: f64, revision: u64) {
        if self.seen.fetch_max(revision + 1, Ordering::AcqRel) > revision {
            return;
        }
        (self.callback)(time);
    }
}

struct Playback {
    state: TimelineState,
    /// Token of the frame this controller is waiting on, and the clock's id for it
    pending_frame: Option<(u64, FrameId)>,
    next_token: u64,
    /// Bumped on every broadcast time change
    revision: u64,
    /// Changes not yet delivered, in the order they were made
    outbox: VecDeque<(f64, u64)>,
    /// Set while some caller is draining `outbox`
    dispatching: bool,
}

impl Playback {
    /// Record a time change for delivery
    fn publish(&mut self, time: f64) {
        self.revision += 1;
        self.outbox.push_back((time, self.revision));
    }
}

struct Inner {
    playback: Mutex<Playback>,
    subscribers: Mutex<BTreeMap<u64, Arc<Subscriber>>>,
    next_subscriber: AtomicU64,
    clock: Arc<dyn FrameClock>,
    frame_step_ms: f64,
}

/// Shared handle to a timeline. Clones control the same playhead.
#[derive(Clone)]
pub struct TimelineController {
    inner: Arc<Inner>,
}

impl TimelineController {
    /// Create a paused timeline at position 0
    pub fn new(duration_ms: f64, clock: Arc<dyn FrameClock>) -> Self {
        Self::with_frame_step(duration_ms, clock, DEFAULT_FRAME_STEP_MS)
    }

    pub fn with_frame_step(duration_ms: f64, clock: Arc<dyn FrameClock>, frame_step_ms: f64) -> Self {
        let frame_step_ms = if frame_step_ms.is_finite() && frame_step_ms > 0.0 {
            frame_step_ms
        } else {
            DEFAULT_FRAME_STEP_MS
        };

        Self {
            inner: Arc::new(Inner {
                playback: Mutex::new(Playback {
                    state: TimelineState {
                        current_time_ms: 0.0,
                        duration_ms: sanitize_duration(duration_ms),
                        is_playing: false,
                    },
                    pending_frame: None,
                    next_token: 0,
                    revision: 0,
                    outbox: VecDeque::new(),
                    dispatching: false,
                }),
                subscribers: Mutex::new(BTreeMap::new()),
                next_subscriber: AtomicU64::new(0),
                clock,
                frame_step_ms,
            }),
        }
    }

    pub fn state(&self) -> TimelineState {
        self.inner.playback.lock().state
    }

    pub fn current_time(&self) -> f64 {
        self.state().current_time_ms
    }

    pub fn duration(&self) -> f64 {
        self.state().duration_ms
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing
    }

    /// Playhead position as a fraction of the duration
    pub fn progress(&self) -> f64 {
        let state = self.state();
        if state.duration_ms > 0.0 {
            state.current_time_ms / state.duration_ms
        } else {
            0.0
        }
    }

    /// Time under a scrub-bar position given as a fraction of its width
    pub fn time_at_fraction(&self, fraction: f64) -> f64 {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        fraction * self.duration()
    }

    /// Start advancing. No-op when already playing or at the end.
    pub fn play(&self) {
        let mut playback = self.inner.playback.lock();
        if playback.state.is_playing {
            return;
        }
        if playback.state.current_time_ms >= playback.state.duration_ms {
            tracing::trace!("play() at end of timeline ignored");
            return;
        }

        playback.state.is_playing = true;
        self.schedule_frame(&mut playback);
    }

    /// Stop advancing and drop the pending frame
    pub fn pause(&self) {
        let pending = {
            let mut playback = self.inner.playback.lock();
            playback.state.is_playing = false;
            playback.pending_frame.take()
        };

        if let Some((_, frame)) = pending {
            self.inner.clock.cancel(frame);
        }
    }

    /// Move the playhead, clamped into `[0, duration]`. Always notifies.
    pub fn seek(&self, time_ms: f64) {
        let pending = {
            let mut playback = self.inner.playback.lock();
            let time = clamp_time(time_ms, playback.state.duration_ms);
            playback.state.current_time_ms = time;
            playback.publish(time);

            let mut pending = None;
            if playback.state.is_playing && time >= playback.state.duration_ms {
                playback.state.is_playing = false;
                pending = playback.pending_frame.take();
            }
            pending
        };

        if let Some((_, frame)) = pending {
            self.inner.clock.cancel(frame);
        }
        self.dispatch();
    }

    pub fn restart(&self) {
        self.pause();
        self.seek(0.0);
    }

    /// Replace the duration, e.g. once the video reports it.
    ///
    /// The playhead is pulled back inside the new range; subscribers are only
    /// notified if it moved.
    pub fn set_duration(&self, duration_ms: f64) {
        let (moved, pending) = {
            let mut playback = self.inner.playback.lock();
            let duration = sanitize_duration(duration_ms);
            playback.state.duration_ms = duration;

            let mut moved = false;
            if playback.state.current_time_ms > duration {
                playback.state.current_time_ms = duration;
                playback.publish(duration);
                moved = true;
            }

            let mut pending = None;
            if playback.state.is_playing && playback.state.current_time_ms >= duration {
                playback.state.is_playing = false;
                pending = playback.pending_frame.take();
            }
            (moved, pending)
        };

        if let Some((_, frame)) = pending {
            self.inner.clock.cancel(frame);
        }
        if moved {
            self.dispatch();
        }
    }

    /// Register a time observer.
    ///
    /// The callback runs once right away with the current time, then on every
    /// change. Callbacks run outside internal locks and may call back into the
    /// controller. Changes reach every subscriber in the order they were
    /// made: a seek issued from inside a callback is delivered once the
    /// current notification has reached everyone, and a subscriber never
    /// sees an older time after a newer one.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber {
            callback: Box::new(callback),
            seen: AtomicU64::new(0),
        });
        self.inner.subscribers.lock().insert(id, Arc::clone(&subscriber));

        let (time, revision) = {
            let playback = self.inner.playback.lock();
            (playback.state.current_time_ms, playback.revision)
        };
        subscriber.deliver(time, revision);

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Pause and drop every subscriber. Safe to call repeatedly.
    pub fn destroy(&self) {
        self.pause();
        self.inner.subscribers.lock().clear();
    }

    fn schedule_frame(&self, playback: &mut Playback) {
        let token = playback.next_token;
        playback.next_token += 1;

        let weak = Arc::downgrade(&self.inner);
        let frame = self.inner.clock.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                TimelineController { inner }.advance_frame(token);
            }
        }));
        playback.pending_frame = Some((token, frame));
    }

    fn advance_frame(&self, token: u64) {
        let (time, reached_end) = {
            let mut playback = self.inner.playback.lock();
            // Stale frame from before a pause/seek, or a racing clock.
            if playback.pending_frame.map(|(t, _)| t) != Some(token) {
                return;
            }
            playback.pending_frame = None;
            if !playback.state.is_playing {
                return;
            }

            let duration = playback.state.duration_ms;
            let next = (playback.state.current_time_ms + self.inner.frame_step_ms).min(duration);
            playback.state.current_time_ms = next;
            playback.publish(next);

            let reached_end = next >= duration;
            if reached_end {
                playback.state.is_playing = false;
            } else {
                self.schedule_frame(&mut playback);
            }
            (next, reached_end)
        };

        self.dispatch();
        if reached_end {
            tracing::debug!("Timeline reached end at {}ms, paused", time);
        }
    }

    /// Drain the outbox unless another caller already is. Callbacks run with
    /// no lock held; changes they cause are queued and drained by this loop.
    fn dispatch(&self) {
        {
            let mut playback = self.inner.playback.lock();
            if playback.dispatching {
                return;
            }
            playback.dispatching = true;
        }
        let _guard = DispatchGuard(&self.inner);

        loop {
            let next = {
                let mut playback = self.inner.playback.lock();
                let next = playback.outbox.pop_front();
                if next.is_none() {
                    playback.dispatching = false;
                }
                next
            };
            let Some((time, revision)) = next else {
                return;
            };

            let subscribers: Vec<Arc<Subscriber>> =
                self.inner.subscribers.lock().values().cloned().collect();
            for subscriber in subscribers {
                subscriber.deliver(time, revision);
            }
        }
    }
}

/// Releases the dispatcher role if a callback panics
struct DispatchGuard<'a>(&'a Inner);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.playback.lock().dispatching = false;
        }
    }
}

/// Registration returned by `TimelineController::subscribe`
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Remove this callback only. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Clamp a requested time into `[0, duration]`. NaN maps to 0.
pub fn clamp_time(time_ms: f64, duration_ms: f64) -> f64 {
    if time_ms.is_nan() {
        return 0.0;
    }
    time_ms.clamp(0.0, duration_ms)
}

fn sanitize_duration(duration_ms: f64) -> f64 {
    if duration_ms.is_finite() && duration_ms > 0.0 {
        duration_ms
    } else {
        0.0
    }
}
