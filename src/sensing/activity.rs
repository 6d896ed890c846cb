use log::info;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::stats::StatsRecorder;

const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Input and visibility signals forwarded from the embedding shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    /// Pointer, keyboard or touch input.
    Input,
    /// Document visibility flipped; `hidden` is the new state.
    Visibility { hidden: bool },
}

/// Cheap cloneable handle the shell uses to push activity events into the
/// watcher.
#[derive(Clone)]
pub struct ActivityHandle {
    tx: mpsc::UnboundedSender<ActivityEvent>,
}

impl ActivityHandle {
    pub(super) fn new(tx: mpsc::UnboundedSender<ActivityEvent>) -> Self {
        Self { tx }
    }

    pub fn notify_input(&self) {
        let _ = self.tx.send(ActivityEvent::Input);
    }

    pub fn notify_visibility(&self, hidden: bool) {
        let _ = self.tx.send(ActivityEvent::Visibility { hidden });
    }
}

/// Watches for idle gaps and tab switches. A full 15 s window with no input
/// counts one idle timeout and restarts the window; any input restarts it
/// first. Each visibility transition to hidden counts one tab switch.
pub(super) async fn activity_loop(
    mut rx: mpsc::UnboundedReceiver<ActivityEvent>,
    stats: StatsRecorder,
    cancel_token: CancellationToken,
) {
    let mut idle_deadline = Instant::now() + IDLE_TIMEOUT;

    loop {
        tokio::select! {
            _ = sleep_until(idle_deadline) => {
                stats.record_idle_timeout().await;
                idle_deadline = Instant::now() + IDLE_TIMEOUT;
            }
            event = rx.recv() => match event {
                Some(ActivityEvent::Input) => {
                    idle_deadline = Instant::now() + IDLE_TIMEOUT;
                }
                Some(ActivityEvent::Visibility { hidden }) => {
                    if hidden {
                        stats.record_tab_switch().await;
                    }
                }
                None => break,
            },
            _ = cancel_token.cancelled() => {
                info!("activity watcher shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    async fn drain_scheduler() {
        // Give the watcher task a chance to process queued events.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_counts_once_per_gap() {
        let stats = StatsRecorder::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let worker = tokio::spawn(activity_loop(rx, stats.clone(), token.clone()));

        // Let the worker reach its first await so the idle deadline is
        // registered at t=0 before virtual time is advanced.
        drain_scheduler().await;
        advance(Duration::from_secs(15)).await;
        drain_scheduler().await;
        assert_eq!(stats.snapshot().await.idle_timeout_count, 1);

        // The timer restarted; a second full gap counts again.
        advance(Duration::from_secs(15)).await;
        drain_scheduler().await;
        assert_eq!(stats.snapshot().await.idle_timeout_count, 2);

        token.cancel();
        drop(tx);
        worker.await.expect("watcher exits cleanly");
    }

    #[tokio::test(start_paused = true)]
    async fn input_just_before_the_deadline_resets_the_timer() {
        let stats = StatsRecorder::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let worker = tokio::spawn(activity_loop(rx, stats.clone(), token.clone()));

        advance(Duration::from_millis(14_900)).await;
        tx.send(ActivityEvent::Input).expect("send input");
        drain_scheduler().await;

        // 14.9 s into the fresh window: still nothing.
        advance(Duration::from_millis(14_800)).await;
        drain_scheduler().await;
        assert_eq!(stats.snapshot().await.idle_timeout_count, 0);

        // Crossing the restarted deadline fires.
        advance(Duration::from_millis(300)).await;
        drain_scheduler().await;
        assert_eq!(stats.snapshot().await.idle_timeout_count, 1);

        token.cancel();
        drop(tx);
        worker.await.expect("watcher exits cleanly");
    }

    #[tokio::test(start_paused = true)]
    async fn tab_switches_count_per_hide_transition() {
        let stats = StatsRecorder::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let worker = tokio::spawn(activity_loop(rx, stats.clone(), token.clone()));

        tx.send(ActivityEvent::Visibility { hidden: true }).unwrap();
        tx.send(ActivityEvent::Visibility { hidden: false }).unwrap();
        tx.send(ActivityEvent::Visibility { hidden: true }).unwrap();
        drain_scheduler().await;

        assert_eq!(stats.snapshot().await.tab_switch_count, 2);

        token.cancel();
        drop(tx);
        worker.await.expect("watcher exits cleanly");
    }
}
