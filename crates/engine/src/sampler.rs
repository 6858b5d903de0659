// Periodic position sampling

use std::time::{Duration, Instant};

/// Owned, cancellable periodic sampler driven by the engine loop.
///
/// The engine asks how long it may block before the next tick and calls
/// [`PositionSampler::poll`] after every wakeup. A position is reported only
/// when it differs from the last reported one.
#[derive(Debug)]
pub(crate) struct PositionSampler {
    interval: Duration,
    next_tick: Option<Instant>,
    last_emitted: Option<i64>,
}

impl PositionSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
            last_emitted: None,
        }
    }

    /// (Re)start sampling. The first tick is due immediately.
    pub fn start(&mut self, now: Instant) {
        log::debug!("[sampler] started, interval {:?}", self.interval);
        self.next_tick = Some(now);
        self.last_emitted = None;
    }

    pub fn cancel(&mut self) {
        if self.next_tick.take().is_some() {
            log::debug!("[sampler] cancelled");
        }
        self.last_emitted = None;
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// How long the engine may wait for messages before the next tick.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|due| due.saturating_duration_since(now))
    }

    /// Run a tick if one is due. Returns the position to report, if any.
    pub fn poll(&mut self, now: Instant, read_position: impl FnOnce() -> i64) -> Option<i64> {
        let due = self.next_tick?;
        if now < due {
            return None;
        }

        // Don't try to catch up on missed ticks
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_tick = Some(next);

        let position = read_position();
        if self.last_emitted == Some(position) {
            return None;
        }
        self.last_emitted = Some(position);
        Some(position)
    }
}
