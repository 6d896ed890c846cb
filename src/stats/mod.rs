use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::vision::AttentionState;

const THROTTLE_WINDOW: Duration = Duration::from_secs(1);

/// Throttled counter keys. Idle timeouts and tab switches are not listed:
/// their sources already fire at most once per 15 s gap / hide transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StatKey {
    DistractionSeconds,
    LookedAway,
    PhoneDetected,
}

/// Counter totals for one monitoring session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub distraction_seconds: u64,
    pub looked_away_count: u64,
    pub phone_detected_count: u64,
    pub idle_timeout_count: u64,
    pub tab_switch_count: u64,
}

struct StatsState {
    counts: SessionStats,
    last_update: HashMap<StatKey, Instant>,
    gated: bool,
}

/// Single-owner aggregator for the session counters. The face loop, object
/// loop and activity watcher all hold clones of this handle; every mutation
/// goes through one lock, and every mutation checks the break gate first.
///
/// Each throttled key carries its own timestamp, so counters can update
/// independently within the same tick.
pub struct StatsRecorder {
    inner: Arc<Mutex<StatsState>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatsState {
                counts: SessionStats::default(),
                last_update: HashMap::new(),
                gated: false,
            })),
        }
    }

    /// Record one classifier result. Non-attentive states count toward
    /// distraction seconds; looking away additionally bumps its own counter
    /// under an independent throttle window.
    pub async fn record_attention(&self, state: AttentionState) {
        if !state.is_distracted() {
            return;
        }

        let mut guard = self.inner.lock().await;
        if guard.gated {
            return;
        }

        let now = Instant::now();
        if throttle_allows(&mut guard.last_update, StatKey::DistractionSeconds, now) {
            guard.counts.distraction_seconds += 1;
        }
        if state == AttentionState::LookingAway
            && throttle_allows(&mut guard.last_update, StatKey::LookedAway, now)
        {
            guard.counts.looked_away_count += 1;
        }
    }

    pub async fn record_phone_detection(&self) {
        let mut guard = self.inner.lock().await;
        if guard.gated {
            return;
        }

        let now = Instant::now();
        if throttle_allows(&mut guard.last_update, StatKey::PhoneDetected, now) {
            guard.counts.phone_detected_count += 1;
        }
    }

    /// Called by the activity watcher after a full 15 s gap with no input.
    pub async fn record_idle_timeout(&self) {
        let mut guard = self.inner.lock().await;
        if guard.gated {
            return;
        }
        guard.counts.idle_timeout_count += 1;
    }

    /// Called once per visibility transition to hidden.
    pub async fn record_tab_switch(&self) {
        let mut guard = self.inner.lock().await;
        if guard.gated {
            return;
        }
        guard.counts.tab_switch_count += 1;
    }

    /// Break gate: while set, every counter mutation is suppressed.
    pub async fn set_gated(&self, gated: bool) {
        self.inner.lock().await.gated = gated;
    }

    pub async fn snapshot(&self) -> SessionStats {
        self.inner.lock().await.counts.clone()
    }

    /// Zero all counters and throttle timestamps for a fresh session.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        guard.counts = SessionStats::default();
        guard.last_update.clear();
        guard.gated = false;
    }
}

impl Clone for StatsRecorder {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn throttle_allows(last_update: &mut HashMap<StatKey, Instant>, key: StatKey, now: Instant) -> bool {
    match last_update.get(&key) {
        Some(last) if now.duration_since(*last) < THROTTLE_WINDOW => false,
        _ => {
            last_update.insert(key, now);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn repeated_ticks_within_one_second_coalesce() {
        let stats = StatsRecorder::new();

        for _ in 0..30 {
            stats.record_attention(AttentionState::EyesClosed).await;
            advance(Duration::from_millis(30)).await;
        }

        // 30 ticks over ~900 ms produce exactly one increment.
        assert_eq!(stats.snapshot().await.distraction_seconds, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_spaced_a_second_apart_each_count() {
        let stats = StatsRecorder::new();

        for _ in 0..5 {
            stats.record_attention(AttentionState::LookingDown).await;
            advance(Duration::from_secs(1)).await;
        }

        assert_eq!(stats.snapshot().await.distraction_seconds, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn looked_away_throttles_independently_of_distraction() {
        let stats = StatsRecorder::new();

        // A looking-down tick opens the distraction window first.
        stats.record_attention(AttentionState::LookingDown).await;
        advance(Duration::from_millis(500)).await;

        // Looking away inside the distraction window: its own counter still
        // increments because the windows are per key.
        stats.record_attention(AttentionState::LookingAway).await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.distraction_seconds, 1);
        assert_eq!(snapshot.looked_away_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn phone_detections_are_throttled() {
        let stats = StatsRecorder::new();

        stats.record_phone_detection().await;
        stats.record_phone_detection().await;
        advance(Duration::from_secs(1)).await;
        stats.record_phone_detection().await;

        assert_eq!(stats.snapshot().await.phone_detected_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn attentive_ticks_never_count() {
        let stats = StatsRecorder::new();

        for _ in 0..3 {
            stats.record_attention(AttentionState::Attentive).await;
            advance(Duration::from_secs(2)).await;
        }

        assert_eq!(stats.snapshot().await, SessionStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn gate_suppresses_every_counter() {
        let stats = StatsRecorder::new();
        stats.set_gated(true).await;

        stats.record_attention(AttentionState::EyesClosed).await;
        stats.record_attention(AttentionState::LookingAway).await;
        stats.record_phone_detection().await;
        stats.record_idle_timeout().await;
        stats.record_tab_switch().await;

        assert_eq!(stats.snapshot().await, SessionStats::default());

        stats.set_gated(false).await;
        stats.record_tab_switch().await;
        assert_eq!(stats.snapshot().await.tab_switch_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_counts_and_windows() {
        let stats = StatsRecorder::new();

        stats.record_attention(AttentionState::Confused).await;
        stats.reset().await;

        // The throttle window was cleared too, so the next tick counts
        // immediately.
        stats.record_attention(AttentionState::Confused).await;
        assert_eq!(stats.snapshot().await.distraction_seconds, 1);
    }
}
