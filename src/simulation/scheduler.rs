//! Cooperative timers driven by an injectable clock.
//!
//! Nothing here sleeps or spawns. The harness asks for [`Scheduler::next_deadline`],
//! waits until then, and calls [`Scheduler::take_due`] until it returns `None`.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary origin
pub trait Clock {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall clock anchored at construction
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Convert a clock reading back to an `Instant` for the event loop
    pub fn instant_at(&self, at: Duration) -> Instant {
        self.origin + at
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-advanced clock for deterministic tests
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct ManualClock {
    now: Cell<Duration>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// The two logical timers of a simulation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Periodic, advances the simulation by one generation
    Tick,
    /// Single-shot, (re)starts the simulation
    Restart,
}

#[derive(Clone, Copy, Debug, Default)]
struct Timer {
    deadline: Option<Duration>,
    /// `Some` for periodic timers
    interval: Option<Duration>,
}

impl Timer {
    /// Consume one firing if due, rescheduling periodic timers
    fn fire(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = self.interval.map(|interval| {
                    let following = deadline + interval;
                    // Fell behind: skip missed periods instead of bursting
                    if following <= now {
                        now + interval
                    } else {
                        following
                    }
                });
                true
            }
            _ => false,
        }
    }
}

/// Tick and restart timers sharing one clock
pub struct Scheduler<C: Clock> {
    clock: C,
    tick: Timer,
    restart: Timer,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            tick: Timer::default(),
            restart: Timer::default(),
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Fire once after `delay`; replaces any pending deadline
    pub fn arm_once(&mut self, kind: TimerKind, delay: Duration) {
        let deadline = self.now() + delay;
        *self.timer_mut(kind) = Timer {
            deadline: Some(deadline),
            interval: None,
        };
    }

    /// Fire every `interval`, first after one interval; replaces any pending deadline
    pub fn arm_periodic(&mut self, kind: TimerKind, interval: Duration) {
        let deadline = self.now() + interval;
        *self.timer_mut(kind) = Timer {
            deadline: Some(deadline),
            interval: Some(interval),
        };
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        *self.timer_mut(kind) = Timer::default();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timer(kind).deadline.is_some()
    }

    /// Earliest pending deadline of either timer
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.restart.deadline, self.tick.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Pop the earliest due timer. Restart wins ties so a pending restart is never
    /// preceded by a tick against the old grid.
    pub fn take_due(&mut self) -> Option<TimerKind> {
        let now = self.now();
        let restart_due = self.restart.deadline.filter(|&d| d <= now);
        let tick_due = self.tick.deadline.filter(|&d| d <= now);

        let kind = match (restart_due, tick_due) {
            (Some(r), Some(t)) if t < r => TimerKind::Tick,
            (Some(_), _) => TimerKind::Restart,
            (None, Some(_)) => TimerKind::Tick,
            (None, None) => return None,
        };
        self.timer_mut(kind).fire(now);
        Some(kind)
    }

    fn timer(&self, kind: TimerKind) -> &Timer {
        match kind {
            TimerKind::Tick => &self.tick,
            TimerKind::Restart => &self.restart,
        }
    }

    fn timer_mut(&mut self, kind: TimerKind) -> &mut Timer {
        match kind {
            TimerKind::Tick => &mut self.tick,
            TimerKind::Restart => &mut self.restart,
        }
    }
}
