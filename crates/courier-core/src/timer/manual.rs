//! Virtual-time timer service.
//!
//! [`ManualClock`] owns a queue of pending expiries ordered by deadline.
//! Time only moves when [`ManualClock::advance`] is called, which fires every
//! timer whose deadline falls inside the advanced window, in deadline order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use super::{OneShotTimer, TimerCallback};

new_key_type! {
    /// A unique identifier for a timer registered with a [`ManualClock`].
    pub struct TimerId;
}

/// Internal timer data.
struct TimerData {
    /// The expiry callback.
    callback: Option<TimerCallback>,
    /// Virtual time at which the pending expiry fires, if armed.
    deadline: Option<Duration>,
    /// Bumped on every arm/disarm so stale queue entries can be skipped.
    generation: u64,
}

/// An entry in the expiry queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Duration,
    generation: u64,
    /// Insertion order, breaks ties between equal deadlines.
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct ClockInner {
    now: Duration,
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
    next_seq: u64,
}

impl ClockInner {
    fn arm(&mut self, id: TimerId, duration: Duration) {
        let fire_time = self.now + duration;
        let seq = self.next_seq;
        self.next_seq += 1;

        let Some(timer) = self.timers.get_mut(id) else {
            return;
        };
        timer.generation += 1;
        timer.deadline = Some(fire_time);

        self.queue.push(TimerQueueEntry {
            id,
            fire_time,
            generation: timer.generation,
            seq,
        });
    }

    fn disarm(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(id)
            && timer.deadline.take().is_some()
        {
            timer.generation += 1;
        }
    }

    /// Pop the next live expiry due at or before `until`.
    ///
    /// The timer is marked disarmed and virtual time moves to its deadline.
    fn pop_due(&mut self, until: Duration) -> Option<(TimerId, Option<TimerCallback>)> {
        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > until {
                return None;
            }
            self.queue.pop();

            let Some(timer) = self.timers.get_mut(entry.id) else {
                continue;
            };
            if timer.generation != entry.generation || timer.deadline.is_none() {
                continue;
            }

            timer.deadline = None;
            self.now = entry.fire_time;
            return Some((entry.id, timer.callback.clone()));
        }
        None
    }
}

/// A virtual clock driving any number of [`ManualTimer`]s.
///
/// Cloning the clock yields another handle to the same virtual time.
#[derive(Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ClockInner>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock at virtual time zero with no timers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                now: Duration::ZERO,
                timers: SlotMap::with_key(),
                queue: BinaryHeap::new(),
                next_seq: 0,
            })),
        }
    }

    /// Register a new, disarmed timer on this clock.
    pub fn timer(&self) -> ManualTimer {
        let id = self.inner.lock().timers.insert(TimerData {
            callback: None,
            deadline: None,
            generation: 0,
        });
        ManualTimer {
            clock: self.inner.clone(),
            id,
        }
    }

    /// Current virtual time since the clock was created.
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    /// Advance virtual time by `by`, firing every expiry that falls due.
    ///
    /// Expiries fire in deadline order; timers armed by a callback during the
    /// advance fire in the same call if their deadline is inside the window.
    /// Returns the number of callbacks fired.
    #[tracing::instrument(skip(self), target = "courier_core::timer", level = "trace")]
    pub fn advance(&self, by: Duration) -> usize {
        let until = self.inner.lock().now + by;
        let mut fired = 0;

        loop {
            // The lock is released before the callback runs.
            let due = self.inner.lock().pop_due(until);
            let Some((id, callback)) = due else {
                break;
            };

            tracing::trace!(target: "courier_core::timer", ?id, "timer fired");
            fired += 1;
            if let Some(callback) = callback {
                callback();
            }
        }

        self.inner.lock().now = until;
        fired
    }

    /// Time until the next pending expiry, if any.
    pub fn time_until_next(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        inner
            .timers
            .values()
            .filter_map(|t| t.deadline)
            .min()
            .map(|deadline| deadline.saturating_sub(inner.now))
    }

    /// Number of timers with a pending expiry.
    pub fn armed_count(&self) -> usize {
        self.inner
            .lock()
            .timers
            .values()
            .filter(|t| t.deadline.is_some())
            .count()
    }
}

impl std::fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ManualClock")
            .field("now", &inner.now)
            .field("timers", &inner.timers.len())
            .finish()
    }
}

/// A one-shot timer driven by a [`ManualClock`].
pub struct ManualTimer {
    clock: Arc<Mutex<ClockInner>>,
    id: TimerId,
}

impl ManualTimer {
    /// The identifier of this timer on its clock.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Virtual time remaining until this timer fires, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        let inner = self.clock.lock();
        inner
            .timers
            .get(self.id)
            .and_then(|t| t.deadline)
            .map(|deadline| deadline.saturating_sub(inner.now))
    }
}

impl OneShotTimer for ManualTimer {
    fn set_callback(&self, callback: TimerCallback) {
        if let Some(timer) = self.clock.lock().timers.get_mut(self.id) {
            timer.callback = Some(callback);
        }
    }

    fn arm(&self, duration: Duration) {
        self.clock.lock().arm(self.id, duration);
    }

    fn disarm(&self) {
        self.clock.lock().disarm(self.id);
    }

    fn is_armed(&self) -> bool {
        self.clock
            .lock()
            .timers
            .get(self.id)
            .is_some_and(|t| t.deadline.is_some())
    }
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        self.clock.lock().timers.remove(self.id);
    }
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimer")
            .field("id", &self.id)
            .field("remaining", &self.remaining())
            .finish()
    }
}
