//! Cancellable countdown timer
//!
//! The timer only measures time. It knows nothing about haptics or dispatch;
//! the coordinator reacts to each [`CountdownTick`].

use vigil_core::effects::PhysicalTimeEffects;
use vigil_core::CancelSignal;

/// One step of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// An interval passed; this many remain
    Remaining(u32),
    /// The final interval passed
    Elapsed,
    /// The countdown was cancelled before elapsing
    Cancelled,
}

/// Counts `seconds` intervals down to zero using the time effect
#[derive(Debug)]
pub struct CountdownTimer<T> {
    time: T,
    remaining: u32,
    interval_ms: u64,
    signal: CancelSignal,
    finished: Option<CountdownTick>,
}

impl<T: PhysicalTimeEffects> CountdownTimer<T> {
    /// Timer of `seconds` intervals of `interval_ms`, stopped by `signal`
    pub fn new(time: T, seconds: u32, interval_ms: u64, signal: CancelSignal) -> Self {
        Self {
            time,
            remaining: seconds,
            interval_ms,
            signal,
            finished: (seconds == 0).then_some(CountdownTick::Elapsed),
        }
    }

    /// Intervals still to run
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Wait for the next interval.
    ///
    /// Cancellation wins over an interval that completes at the same instant.
    /// Once `Elapsed` or `Cancelled` has been returned, the same value is
    /// returned again without waiting.
    pub async fn tick(&mut self) -> CountdownTick {
        if let Some(done) = self.finished {
            return done;
        }
        if self.signal.is_cancelled() {
            return self.finish(CountdownTick::Cancelled);
        }

        let mut signal = self.signal.clone();
        let cancelled = tokio::select! {
            biased;
            _ = signal.cancelled() => true,
            _ = self.time.sleep_ms(self.interval_ms) => false,
        };
        if cancelled || self.signal.is_cancelled() {
            return self.finish(CountdownTick::Cancelled);
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.finish(CountdownTick::Elapsed)
        } else {
            CountdownTick::Remaining(self.remaining)
        }
    }

    fn finish(&mut self, tick: CountdownTick) -> CountdownTick {
        self.finished = Some(tick);
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_core::SubscriptionHandle;
    use vigil_effects::SimulatedTimeHandler;

    #[tokio::test(start_paused = true)]
    async fn counts_down_to_elapsed() {
        let (_handle, signal) = SubscriptionHandle::new();
        let mut timer = CountdownTimer::new(Arc::new(SimulatedTimeHandler::default()), 3, 1000, signal);

        let started = tokio::time::Instant::now();
        assert_eq!(timer.tick().await, CountdownTick::Remaining(2));
        assert_eq!(timer.tick().await, CountdownTick::Remaining(1));
        assert_eq!(timer.tick().await, CountdownTick::Elapsed);
        assert_eq!(started.elapsed().as_millis(), 3000);
        assert_eq!(timer.tick().await, CountdownTick::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_immediately() {
        let (handle, signal) = SubscriptionHandle::new();
        let mut timer = CountdownTimer::new(Arc::new(SimulatedTimeHandler::default()), 10, 1000, signal);
        assert_eq!(timer.tick().await, CountdownTick::Remaining(9));

        handle.cancel();
        let before = tokio::time::Instant::now();
        assert_eq!(timer.tick().await, CountdownTick::Cancelled);
        assert_eq!(before.elapsed().as_millis(), 0);
        assert_eq!(timer.remaining(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_interval_interrupts_sleep() {
        let (handle, signal) = SubscriptionHandle::new();
        let mut timer = CountdownTimer::new(Arc::new(SimulatedTimeHandler::default()), 5, 1000, signal);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(400)).await;
            handle.cancel();
            handle
        });
        assert_eq!(timer.tick().await, CountdownTick::Cancelled);
        let _handle = canceller.await.unwrap();
    }

    #[tokio::test]
    async fn zero_seconds_is_already_elapsed() {
        let (_handle, signal) = SubscriptionHandle::new();
        let mut timer = CountdownTimer::new(Arc::new(SimulatedTimeHandler::default()), 0, 1000, signal);
        assert_eq!(timer.tick().await, CountdownTick::Elapsed);
    }
}
