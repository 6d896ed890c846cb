use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Focus percent below which the one-shot break prompt triggers.
pub const BREAK_PROMPT_THRESHOLD: u8 = 96;

/// Length of the on-break countdown. Cosmetic; resuming early is always
/// allowed and the break never auto-resumes.
pub const BREAK_DURATION_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MonitorPhase {
    Idle,
    Running,
    OnBreak,
    Ended,
}

impl MonitorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorPhase::Idle => "idle",
            MonitorPhase::Running => "running",
            MonitorPhase::OnBreak => "onBreak",
            MonitorPhase::Ended => "ended",
        }
    }
}

/// Everything needed to start one monitoring run.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub user_id: String,
    pub session_name: String,
    pub duration_min: u32,
    pub video_url: Option<String>,
}

/// Outcome of one 1 Hz tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Focus dropped below the threshold for the first time this session.
    BreakPrompt,
    /// Countdown reached zero.
    Finished,
}

/// The session state machine, kept pure so every transition is testable
/// without a camera. The controller owns the clock and persistence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: MonitorPhase,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub session_name: String,
    pub video_url: Option<String>,
    pub duration_min: u32,
    pub planned_duration_secs: u64,
    pub remaining_secs: u64,
    pub focus_percent: u8,
    pub break_prompt_fired: bool,
    pub break_remaining_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: MonitorPhase::Idle,
            session_id: None,
            user_id: None,
            session_name: String::new(),
            video_url: None,
            duration_min: 0,
            planned_duration_secs: 0,
            remaining_secs: 0,
            focus_percent: 100,
            break_prompt_fired: false,
            break_remaining_secs: 0,
            started_at: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, session_id: String, plan: &SessionPlan, started_at: DateTime<Utc>) {
        let planned_duration_secs = u64::from(plan.duration_min) * 60;
        *self = Self {
            phase: MonitorPhase::Running,
            session_id: Some(session_id),
            user_id: Some(plan.user_id.clone()),
            session_name: plan.session_name.clone(),
            video_url: plan.video_url.clone(),
            duration_min: plan.duration_min,
            planned_duration_secs,
            remaining_secs: planned_duration_secs,
            focus_percent: 100,
            break_prompt_fired: false,
            break_remaining_secs: 0,
            started_at: Some(started_at),
        };
    }

    /// Advance the machine by one second. While running this decrements the
    /// countdown and recomputes focus; on break it only runs the cosmetic
    /// break countdown. Session end wins over a same-tick break trigger.
    pub fn tick(&mut self, distraction_seconds: u64) -> TickOutcome {
        match self.phase {
            MonitorPhase::Running => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                self.focus_percent =
                    compute_focus_percent(distraction_seconds, self.planned_duration_secs);

                if self.remaining_secs == 0 {
                    return TickOutcome::Finished;
                }

                if !self.break_prompt_fired && self.focus_percent < BREAK_PROMPT_THRESHOLD {
                    self.break_prompt_fired = true;
                    self.phase = MonitorPhase::OnBreak;
                    self.break_remaining_secs = BREAK_DURATION_SECS;
                    return TickOutcome::BreakPrompt;
                }

                TickOutcome::Continue
            }
            MonitorPhase::OnBreak => {
                self.break_remaining_secs = self.break_remaining_secs.saturating_sub(1);
                TickOutcome::Continue
            }
            MonitorPhase::Idle | MonitorPhase::Ended => TickOutcome::Continue,
        }
    }

    /// Manual break. Does not consume the one-shot automatic trigger.
    pub fn pause(&mut self) -> bool {
        if self.phase != MonitorPhase::Running {
            return false;
        }
        self.phase = MonitorPhase::OnBreak;
        self.break_remaining_secs = BREAK_DURATION_SECS;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != MonitorPhase::OnBreak {
            return false;
        }
        self.phase = MonitorPhase::Running;
        self.break_remaining_secs = 0;
        true
    }

    /// Transition to Ended, recomputing the final focus percent and awarding
    /// one point per elapsed minute.
    pub fn finalize(&mut self, distraction_seconds: u64) -> u32 {
        self.focus_percent = compute_focus_percent(distraction_seconds, self.planned_duration_secs);
        self.phase = MonitorPhase::Ended;
        compute_points(self.planned_duration_secs, self.remaining_secs)
    }
}

/// `round(clamp(0, 100, 100 − distraction/planned × 100))`.
pub fn compute_focus_percent(distraction_seconds: u64, planned_duration_secs: u64) -> u8 {
    if planned_duration_secs == 0 {
        return 100;
    }
    let raw = 100.0 - (distraction_seconds as f64 / planned_duration_secs as f64) * 100.0;
    raw.clamp(0.0, 100.0).round() as u8
}

/// One point per elapsed minute, rounded.
pub fn compute_points(planned_duration_secs: u64, remaining_secs: u64) -> u32 {
    let elapsed = planned_duration_secs.saturating_sub(remaining_secs);
    (elapsed as f64 / 60.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(duration_min: u32) -> SessionPlan {
        SessionPlan {
            user_id: "user-1".into(),
            session_name: "Math Practice".into(),
            duration_min,
            video_url: None,
        }
    }

    fn running_state(duration_min: u32) -> SessionState {
        let mut state = SessionState::new();
        state.begin("session-1".into(), &plan(duration_min), Utc::now());
        state
    }

    #[test]
    fn focus_percent_is_clamped() {
        assert_eq!(compute_focus_percent(0, 600), 100);
        assert_eq!(compute_focus_percent(300, 600), 50);
        // Ten times the planned duration clamps to zero, never negative.
        assert_eq!(compute_focus_percent(6000, 600), 0);
        assert_eq!(compute_focus_percent(5, 0), 100);
    }

    #[test]
    fn points_track_elapsed_minutes() {
        assert_eq!(compute_points(600, 0), 10);
        assert_eq!(compute_points(600, 360), 4);
        assert_eq!(compute_points(600, 600), 0);
        // Half a minute rounds up.
        assert_eq!(compute_points(600, 570), 1);
    }

    #[test]
    fn countdown_finishes_at_zero() {
        let mut state = running_state(1);
        for _ in 0..59 {
            assert_eq!(state.tick(0), TickOutcome::Continue);
        }
        assert_eq!(state.tick(0), TickOutcome::Finished);
        assert_eq!(state.remaining_secs, 0);
    }

    #[test]
    fn break_prompt_fires_once_and_latches() {
        let mut state = running_state(10);

        // Enough distraction to push focus to round(100 - 30/6) = 95.
        assert_eq!(state.tick(30), TickOutcome::BreakPrompt);
        assert_eq!(state.phase, MonitorPhase::OnBreak);
        assert!(state.break_prompt_fired);
        assert_eq!(state.break_remaining_secs, BREAK_DURATION_SECS);

        assert!(state.resume());

        // Focus keeps oscillating below the threshold; the latch holds.
        for distraction in [40, 10, 80, 200] {
            assert_eq!(state.tick(distraction), TickOutcome::Continue);
            assert_eq!(state.phase, MonitorPhase::Running);
        }
    }

    #[test]
    fn focus_just_at_threshold_does_not_trigger() {
        let mut state = running_state(10);
        // round(100 - 27/6) = 96, not below the threshold.
        assert_eq!(state.tick(27), TickOutcome::Continue);
        assert_eq!(state.focus_percent, 96);
        assert!(!state.break_prompt_fired);
    }

    #[test]
    fn break_ticks_do_not_touch_the_countdown() {
        let mut state = running_state(10);
        assert_eq!(state.tick(0), TickOutcome::Continue);
        let remaining = state.remaining_secs;

        assert!(state.pause());
        for _ in 0..30 {
            assert_eq!(state.tick(0), TickOutcome::Continue);
        }
        assert_eq!(state.remaining_secs, remaining);
        assert_eq!(state.break_remaining_secs, BREAK_DURATION_SECS - 30);

        assert!(state.resume());
        state.tick(0);
        assert_eq!(state.remaining_secs, remaining - 1);
    }

    #[test]
    fn manual_pause_keeps_the_automatic_trigger_armed() {
        let mut state = running_state(10);
        assert!(state.pause());
        assert!(!state.break_prompt_fired);
        assert!(state.resume());

        assert_eq!(state.tick(30), TickOutcome::BreakPrompt);
    }

    #[test]
    fn finalize_computes_final_focus_and_points() {
        let mut state = running_state(10);
        for _ in 0..240 {
            state.tick(0);
        }

        let points = state.finalize(300);
        assert_eq!(state.phase, MonitorPhase::Ended);
        assert_eq!(state.focus_percent, 50);
        assert_eq!(points, 4);
    }

    #[test]
    fn pause_and_resume_reject_wrong_phases() {
        let mut state = SessionState::new();
        assert!(!state.pause());
        assert!(!state.resume());

        let mut state = running_state(10);
        assert!(!state.resume());
        assert!(state.pause());
        assert!(!state.pause());
    }

    #[test]
    fn end_wins_over_break_on_the_final_tick() {
        let mut state = running_state(1);
        for _ in 0..59 {
            state.tick(0);
        }
        // Final tick with heavy distraction: Finished, not BreakPrompt.
        assert_eq!(state.tick(500), TickOutcome::Finished);
    }
}
