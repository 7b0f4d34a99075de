//! Repeating-work scheduling for the heartbeat loop

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Work invoked on every tick; return `false` to stop the schedule
pub type RepeatingWork = Box<dyn FnMut() -> BoxFuture<'static, bool> + Send>;

/// Fires work roughly every period until the work asks to stop
#[async_trait]
pub trait Repeater: Send + Sync {
    async fn run(&self, period: Duration, work: RepeatingWork);
}

/// Interval-based schedule; holds cadence independent of work duration
#[derive(Debug, Default)]
pub struct SteadyRepeater;

#[async_trait]
impl Repeater for SteadyRepeater {
    async fn run(&self, period: Duration, mut work: RepeatingWork) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the interval fires immediately; the first beat waits a full period
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !work().await {
                break;
            }
        }
    }
}

/// Sleep-based fallback; re-arms after each completed run
#[derive(Debug, Default)]
pub struct DelayRepeater;

#[async_trait]
impl Repeater for DelayRepeater {
    async fn run(&self, period: Duration, mut work: RepeatingWork) {
        loop {
            sleep(period).await;
            if !work().await {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_work(count: Arc<AtomicUsize>, stop_after: usize) -> RepeatingWork {
        Box::new(move || {
            let count = count.clone();
            async move { count.fetch_add(1, Ordering::SeqCst) + 1 < stop_after }.boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn steady_repeater_stops_when_work_asks() {
        let count = Arc::new(AtomicUsize::new(0));
        SteadyRepeater
            .run(Duration::from_secs(1), counting_work(count.clone(), 3))
            .await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_repeater_stops_when_work_asks() {
        let count = Arc::new(AtomicUsize::new(0));
        DelayRepeater
            .run(Duration::from_secs(1), counting_work(count.clone(), 3))
            .await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn steady_repeater_fires_once_per_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = count.clone();
        let task = tokio::spawn(async move {
            SteadyRepeater
                .run(
                    Duration::from_secs(1),
                    Box::new(move || {
                        let ticks = ticks.clone();
                        async move {
                            ticks.fetch_add(1, Ordering::SeqCst);
                            true
                        }
                        .boxed()
                    }),
                )
                .await;
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        task.abort();
    }
}
