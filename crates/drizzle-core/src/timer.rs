use std::time::{Duration, Instant};

/// Which of the node's periodic duties a [`Timer`] drives.
///
/// The original implementation stores a bound callable on each `Timer`; in
/// Rust that would mean boxing a closure that captures `&mut Node`, which
/// doesn't typecheck against a `HashMap<SocketAddr, Peer>` also borrowed
/// mutably in the same loop. Naming the two duties instead lets
/// [`crate::Node::run_timers`] match on the kind and borrow exactly what it
/// needs, while keeping the same "a timer is an interval plus a thing to do
/// when it fires" shape as the original `Timer` class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Runs the keep-alive and state-refresh timer over every peer
    /// (`PT_RESOLUTION`).
    PeerTick,
    /// Runs the connection sweep that arbitrates INDIRECT peers through a
    /// broker (`CONNECT_INTERVAL`).
    ConnectionSweep,
}

/// An interval timer that fires at most once per `Run` call, no matter how
/// late it's checked (spec §4.2 / §4.5).
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    kind: TimerKind,
    interval: Duration,
    next_fire: Instant,
}

impl Timer {
    /// Create a timer of `kind` that first fires after `interval` has
    /// elapsed from now.
    pub fn new(kind: TimerKind, interval: Duration) -> Self {
        Self {
            kind,
            interval,
            next_fire: Instant::now() + interval,
        }
    }

    /// Which duty this timer drives.
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    /// True if the timer is due to fire.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_fire
    }

    /// Reschedule the timer's next firing, `interval` from `now`. Call this
    /// immediately after running the timer's duty.
    pub fn reschedule(&mut self, now: Instant) {
        self.next_fire = now + self.interval;
    }
}
