#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick-driven sequencer releasing the points of a spawn plan over time.

use std::{collections::VecDeque, time::Duration};

use party_grid_core::{Event, RoundPhase, SpawnPoint};
use party_grid_system_spawn_search::SpawnPlan;

/// Configuration parameters required to construct the sequencer.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    release_interval: Duration,
}

impl Config {
    /// Creates a configuration releasing one point per `release_interval`.
    ///
    /// A zero interval releases every queued point on the next round update.
    #[must_use]
    pub const fn new(release_interval: Duration) -> Self {
        Self { release_interval }
    }
}

/// Pure system that releases queued spawn points while a round is running.
#[derive(Debug)]
pub struct SpawnSequencer {
    release_interval: Duration,
    accumulator: Duration,
    queue: VecDeque<(usize, SpawnPoint)>,
    released: usize,
}

impl SpawnSequencer {
    /// Creates an idle sequencer using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            release_interval: config.release_interval,
            accumulator: Duration::ZERO,
            queue: VecDeque::new(),
            released: 0,
        }
    }

    /// Replaces the queue with the points of `plan` in draw order.
    pub fn load(&mut self, plan: SpawnPlan) {
        self.queue = plan.into_points().into_iter().enumerate().collect();
        self.accumulator = Duration::ZERO;
        self.released = 0;
        log::debug!("spawn sequencer loaded {} points", self.queue.len());
    }

    /// Number of points still waiting to be released.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of points released since the last load.
    #[must_use]
    pub const fn released(&self) -> usize {
        self.released
    }

    /// Whether every loaded point has been released.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Consumes events and the current round phase to emit due spawn points.
    ///
    /// Elapsed time is read from [`Event::TimeAdvanced`]. A
    /// [`Event::RoundEnded`] drops every pending point.
    pub fn handle(&mut self, events: &[Event], phase: RoundPhase, out: &mut Vec<Event>) {
        if events.iter().any(|event| matches!(event, Event::RoundEnded)) {
            if !self.queue.is_empty() {
                log::debug!("round ended with {} spawn points pending", self.queue.len());
            }
            self.queue.clear();
            self.accumulator = Duration::ZERO;
            return;
        }

        if phase != RoundPhase::Round {
            self.accumulator = Duration::ZERO;
            return;
        }

        if self.queue.is_empty() {
            return;
        }

        if self.release_interval.is_zero() {
            self.release(self.queue.len(), out);
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        let due = self.resolve_due_releases();
        self.release(due, out);
    }

    /// Advances the sequencer by `dt` without an event stream.
    pub fn tick(&mut self, dt: Duration, phase: RoundPhase, out: &mut Vec<Event>) {
        self.handle(&[Event::TimeAdvanced { dt }], phase, out);
    }

    fn resolve_due_releases(&mut self) -> usize {
        if self.release_interval.is_zero() {
            return 0;
        }

        let mut due = 0;
        while self.accumulator >= self.release_interval {
            self.accumulator -= self.release_interval;
            due += 1;
        }
        due
    }

    fn release(&mut self, due: usize, out: &mut Vec<Event>) {
        for _ in 0..due {
            let Some((order, point)) = self.queue.pop_front() else {
                self.accumulator = Duration::ZERO;
                return;
            };
            self.released += 1;
            out.push(Event::SpawnReleased { order, point });
        }
    }
}
