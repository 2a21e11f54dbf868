//! # Tick Clock
//!
//! Real-time pacing for hosts that drive a [`World`]. The world itself never
//! reads the wall clock; the clock decides when [`World::tick`] runs and,
//! when the host has fallen too far behind, drops the backlog through
//! [`World::skip_ticks`] so the tick-end event reports the gap instead of
//! the simulation racing to catch up.

use std::time::{Duration, Instant};

use crate::world::{TickSummary, World};

/// Backlog, in ticks, the clock will work through before skipping.
pub const DEFAULT_MAX_BACKLOG: u64 = 5;

/// What the host should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pace {
    /// Nothing is due for this long.
    Wait(Duration),
    /// One tick is due.
    Run,
    /// The backlog was too long: skip this many ticks, then run one.
    Skip(u64),
}

/// Timing of the ticks a clock has driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks run.
    pub ticks: u64,
    /// Ticks dropped from a backlog.
    pub skipped: u64,
    /// Ticks that took longer than their budget.
    pub late: u64,
    /// Longest tick, in microseconds.
    pub max_tick_us: u64,
    /// Time spent inside ticks, in microseconds.
    pub busy_us: u64,
}

impl TickStats {
    /// Mean tick duration in microseconds.
    #[must_use]
    pub fn mean_tick_us(&self) -> u64 {
        self.busy_us.checked_div(self.ticks).unwrap_or(0)
    }
}

/// Fixed-rate scheduler for [`World::tick`].
#[derive(Debug)]
pub struct TickClock {
    tick_duration: Duration,
    max_backlog: u64,
    next_due: Instant,
    stats: TickStats,
}

impl TickClock {
    /// Creates a clock for `tick_rate` ticks per second whose first tick is
    /// due one period from now.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            max_backlog: DEFAULT_MAX_BACKLOG,
            next_due: Instant::now() + tick_duration,
            stats: TickStats::default(),
        }
    }

    /// Sets how many owed ticks are still run one by one before the rest
    /// are skipped. At least one.
    #[must_use]
    pub fn with_max_backlog(mut self, ticks: u64) -> Self {
        self.max_backlog = ticks.max(1);
        self
    }

    /// Budget of one tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Timing so far.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Decides what is due at `now` and consumes it.
    pub fn poll(&mut self, now: Instant) -> Pace {
        if now < self.next_due {
            return Pace::Wait(self.next_due - now);
        }
        let behind = (now - self.next_due).as_nanos() / self.tick_duration.as_nanos().max(1);
        let owed = u64::try_from(behind).unwrap_or(u64::MAX).saturating_add(1);
        if owed <= self.max_backlog {
            self.next_due += self.tick_duration;
            return Pace::Run;
        }
        let skipped = owed - 1;
        self.next_due = now + self.tick_duration;
        Pace::Skip(skipped)
    }

    /// Runs, skips or sleeps as the clock dictates. Returns the summary of
    /// the tick that ran, if any.
    pub fn drive(&mut self, world: &mut World) -> Option<TickSummary> {
        match self.poll(Instant::now()) {
            Pace::Wait(remaining) => {
                std::thread::sleep(remaining);
                None
            }
            Pace::Run => Some(self.timed_tick(world)),
            Pace::Skip(count) => {
                tracing::warn!(
                    tick = world.tick_count(),
                    skipped = count,
                    "host fell behind, skipping ticks"
                );
                world.skip_ticks(count);
                self.stats.skipped += count;
                Some(self.timed_tick(world))
            }
        }
    }

    fn timed_tick(&mut self, world: &mut World) -> TickSummary {
        let start = Instant::now();
        let summary = world.tick();
        self.record(start.elapsed());
        summary
    }

    fn record(&mut self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.stats.ticks += 1;
        self.stats.busy_us = self.stats.busy_us.saturating_add(us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(us);
        if elapsed > self.tick_duration {
            self.stats.late += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCategory, EventFilter, GameEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_poll_runs_owed_ticks_in_order() {
        let mut clock = TickClock::new(20);
        let period = clock.tick_duration();
        assert_eq!(period, Duration::from_millis(50));

        let due = clock.next_due;
        assert_eq!(clock.poll(due - period / 2), Pace::Wait(period / 2));
        // Two periods late, within the backlog: both run.
        let now = due + period;
        assert_eq!(clock.poll(now), Pace::Run);
        assert_eq!(clock.poll(now), Pace::Run);
        assert_eq!(clock.poll(now), Pace::Wait(period));
    }

    #[test]
    fn test_poll_skips_long_backlog() {
        let mut clock = TickClock::new(20).with_max_backlog(3);
        let period = clock.tick_duration();
        let now = clock.next_due + period * 9;

        assert_eq!(clock.poll(now), Pace::Skip(9));
        assert_eq!(clock.poll(now), Pace::Wait(period));
    }

    #[test]
    fn test_drive_reports_skip_on_tick_end() {
        let mut world = World::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        world.on(EventFilter::category(EventCategory::TickEnd), move |_, event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });

        let mut clock = TickClock::new(20).with_max_backlog(2);
        let period = clock.tick_duration();
        clock.next_due = Instant::now()
            .checked_sub(period * 10)
            .expect("monotonic clock has ten periods of history");

        let summary = clock.drive(&mut world).expect("a tick was due");
        assert_eq!(summary.tick, 10);
        assert_eq!(world.tick_count(), 11);
        assert_eq!(clock.stats().skipped, 10);
        assert_eq!(clock.stats().ticks, 1);
        assert_eq!(
            *seen.borrow(),
            vec![GameEvent::TickEnd {
                tick: 10,
                skipped: 10
            }]
        );
    }

    #[test]
    fn test_stats_track_late_ticks() {
        let mut clock = TickClock::new(20);
        clock.record(Duration::from_millis(10));
        clock.record(Duration::from_millis(80));

        let stats = clock.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.max_tick_us, 80_000);
        assert_eq!(stats.mean_tick_us(), 45_000);
        assert_eq!(stats.late, 1);
    }
}
