/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! The periodic tick behind forward and reverse playback.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// The periodic tick driving forward or reverse playback. At most one
/// interval exists; starting a new one replaces the old.
#[derive(Debug, Default)]
pub struct LoopTimer {
    interval: Option<Interval>,
    period: Duration,
}

impl LoopTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking every `period`, first tick one period from now. A slow
    /// tick delays the next one instead of bursting to catch up.
    pub fn start(&mut self, period: Duration) {
        let period = period.max(Duration::from_micros(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.period = period;
    }

    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(|_| self.period)
    }

    /// Resolves on the next tick. Never resolves while cancelled.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

/// Longest tick period; slower playback than this is clamped.
pub const MAX_FRAME_PERIOD: Duration = Duration::from_secs(3600);

/// Tick period for a track at `frame_rate` played at `speed`. Never panics:
/// periods too long for `Duration` clamp to `MAX_FRAME_PERIOD` and an
/// infinite rate gives a zero period, which `LoopTimer::start` raises to 1us.
pub fn frame_period(frame_rate: f64, speed: f64) -> Duration {
    let rate = frame_rate * speed;
    if rate.is_nan() || rate <= 0.0 {
        return Duration::from_secs(1);
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_or(MAX_FRAME_PERIOD, |period| period.min(MAX_FRAME_PERIOD))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_scales_with_speed() {
        assert_eq!(frame_period(10.0, 1.0), Duration::from_millis(100));
        assert_eq!(frame_period(10.0, 2.0), Duration::from_millis(50));
        assert_eq!(frame_period(0.0, 1.0), Duration::from_secs(1));
    }

    #[test]
    fn extreme_speeds_do_not_overflow() {
        assert_eq!(frame_period(10.0, 1e-21), MAX_FRAME_PERIOD);
        assert_eq!(frame_period(10.0, f64::MIN_POSITIVE), MAX_FRAME_PERIOD);
        assert!(frame_period(10.0, 1e-4) > Duration::from_secs(999));
        assert_eq!(frame_period(10.0, f64::MAX), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let mut timer = LoopTimer::new();
        timer.start(Duration::from_millis(100));
        let started = Instant::now();
        timer.tick().await;
        assert_eq!(started.elapsed(), Duration::from_millis(100));
        timer.tick().await;
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = LoopTimer::new();
        timer.start(Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.is_active());
        let fired = tokio::time::timeout(Duration::from_secs(1), timer.tick()).await;
        assert!(fired.is_err());
    }
}
