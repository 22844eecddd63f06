//! Per-question countdown.
//!
//! A [`Countdown`] is a stream of remaining seconds driven by a spawned tokio
//! task. [`Timer`] holds at most one of them so a session never has two
//! countdowns running for the same question.

use std::future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Spacing between ticks.
pub const TICK: Duration = Duration::from_secs(1);

/// Stream of remaining seconds: `start(3)` yields 2, 1, 0 and then ends.
pub struct Countdown {
    rx: mpsc::Receiver<u32>,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl Countdown {
    pub fn start(seconds: u32) -> Self {
        // One slot is enough: the task waits a full second between sends.
        let (tx, rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut remaining = seconds;
            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;
                if tx.send(remaining).await.is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            task,
            cancelled: false,
        }
    }

    /// Stop the countdown. Buffered ticks are discarded too.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.task.abort();
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Stream for Countdown {
    type Item = u32;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<u32>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Owner of the active countdown, if any.
#[derive(Default)]
pub struct Timer {
    active: Option<Countdown>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is running and start a fresh countdown.
    pub fn restart(&mut self, seconds: u32) {
        self.cancel();
        self.active = Some(Countdown::start(seconds));
    }

    pub fn cancel(&mut self) {
        if let Some(mut countdown) = self.active.take() {
            countdown.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Next remaining-seconds value. Pending forever while idle, so it can be
    /// used as a `select!` branch.
    pub async fn tick(&mut self) -> u32 {
        let next = match self.active.as_mut() {
            Some(countdown) => countdown.next().await,
            None => None,
        };
        match next {
            Some(remaining) => remaining,
            None => {
                self.active = None;
                future::pending().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_emits_down_to_zero_then_ends() {
        let started = Instant::now();
        let mut countdown = Countdown::start(3);

        let mut seen = Vec::new();
        while let Some(remaining) = countdown.next().await {
            seen.push((remaining, started.elapsed().as_secs()));
        }

        assert_eq!(seen, vec![(2, 1), (1, 2), (0, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let mut countdown = Countdown::start(5);
        assert_eq!(countdown.next().await, Some(4));

        countdown.cancel();
        countdown.cancel();
        assert!(countdown.is_cancelled());

        time::advance(Duration::from_secs(10)).await;
        assert_eq!(countdown.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_seconds_yields_nothing() {
        let mut countdown = Countdown::start(0);
        assert_eq!(countdown.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_running_countdown() {
        let mut timer = Timer::new();
        timer.restart(10);
        assert_eq!(timer.tick().await, 9);

        timer.restart(2);
        assert_eq!(timer.tick().await, 1);
        assert_eq!(timer.tick().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timer_stays_pending() {
        let mut timer = Timer::new();
        timer.restart(1);
        assert_eq!(timer.tick().await, 0);

        let waited = time::timeout(Duration::from_secs(5), timer.tick()).await;
        assert!(waited.is_err());
        assert!(!timer.is_running());

        timer.restart(3);
        timer.cancel();
        timer.cancel();
        let waited = time::timeout(Duration::from_secs(5), timer.tick()).await;
        assert!(waited.is_err());
    }
}
