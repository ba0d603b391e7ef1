//! Repeating timers driven by the editor's event loop.
//!
//! A timer fires at most once per [`TimerQueue::advance`] call and is then
//! re-armed one interval after `now`, whether its callback succeeded,
//! failed, or panicked.

use crate::context::{HookContext, HookFn};
use crate::error::{PluginError, guard};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct Timer {
    id: TimerId,
    owner: String,
    interval: Duration,
    due: Instant,
    callback: HookFn,
}

pub struct TimerQueue {
    timers: Vec<Timer>,
    /// Time of the last `advance` (or construction); new timers count from here.
    clock: Instant,
    next_id: u64,
}

impl TimerQueue {
    pub fn new(start: Instant) -> Self {
        Self {
            timers: Vec::new(),
            clock: start,
            next_id: 1,
        }
    }

    pub fn schedule(&mut self, owner: &str, interval: Duration, callback: HookFn) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            owner: owner.to_string(),
            interval,
            due: self.clock + interval,
            callback,
        });
        log::debug!("{owner}: scheduled {id} every {interval:?}");
        id
    }

    /// Cancel `id` if it belongs to `owner`.
    pub fn cancel(&mut self, owner: &str, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| !(t.id == id && t.owner == owner));
        before != self.timers.len()
    }

    /// Fire every timer due at `now`. Returns the failures by owner.
    pub fn advance(&mut self, now: Instant, ctx: &mut HookContext<'_>) -> Vec<(String, PluginError)> {
        if now > self.clock {
            self.clock = now;
        }
        let mut failures = Vec::new();
        for timer in self.timers.iter_mut().filter(|t| t.due <= now) {
            log::trace!("{}: firing {}", timer.owner, timer.id);
            let callback = &mut timer.callback;
            if let Err(err) = guard(|| callback(ctx)) {
                failures.push((timer.owner.clone(), err));
            }
            timer.due = now + timer.interval;
        }
        failures
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.due).min()
    }

    pub fn owned_by(&self, owner: &str) -> Vec<TimerId> {
        self.timers.iter().filter(|t| t.owner == owner).map(|t| t.id).collect()
    }

    /// Drop every timer of `owner`. Returns how many were dropped.
    pub(crate) fn cancel_all(&mut self, owner: &str) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.owner != owner);
        before - self.timers.len()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
