use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use uuid::Uuid;

use crate::db::Database;
use crate::error::MonitorError;
use crate::events::{EventReceiver, EventSender, MonitorEvent};
use crate::models::Session;
use crate::sensing::{ActivityHandle, SensingController};
use crate::stats::StatsRecorder;
use crate::vision::CapabilityProvider;

use super::state::{MonitorPhase, SessionPlan, SessionState, TickOutcome};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Drives one monitoring session: owns the state machine, the 1 Hz ticker,
/// the sensing controller and the stats recorder. Handed by reference to
/// whatever needs to start, pause, resume or stop monitoring; there is no
/// ambient global state.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    db: Database,
    stats: StatsRecorder,
    sensing: Arc<Mutex<SensingController>>,
    events: EventSender,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl SessionController {
    pub fn new(db: Database) -> Self {
        let debug_mode = std::env::var("SMARTFOCUS_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            db,
            stats: StatsRecorder::new(),
            sensing: Arc::new(Mutex::new(SensingController::new())),
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn stats_snapshot(&self) -> crate::stats::SessionStats {
        self.stats.snapshot().await
    }

    /// Activity handle for the shell to forward input/visibility events;
    /// `None` while no session is being monitored.
    pub async fn activity_handle(&self) -> Option<ActivityHandle> {
        self.sensing.lock().await.activity_handle()
    }

    pub async fn set_mesh_enabled(&self, enabled: bool) {
        self.sensing.lock().await.set_mesh_enabled(enabled);
    }

    /// Start monitoring. Acquires the camera and both inference backends,
    /// zeroes the counters and begins the countdown. Initialization failures
    /// propagate; the controller stays Idle.
    pub async fn start(
        &self,
        plan: SessionPlan,
        provider: &dyn CapabilityProvider,
    ) -> Result<SessionState, MonitorError> {
        if plan.duration_min == 0 {
            return Err(MonitorError::InvalidPlan(
                "duration must be greater than zero",
            ));
        }

        {
            let state = self.state.lock().await;
            if state.phase != MonitorPhase::Idle {
                return Err(MonitorError::AlreadyActive);
            }
        }

        self.stats.reset().await;

        self.sensing
            .lock()
            .await
            .start_sensing(provider, self.stats.clone(), self.events.clone())
            .await?;

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        {
            let mut state = self.state.lock().await;
            state.begin(session_id.clone(), &plan, started_at);
        }

        self.spawn_ticker().await;
        self.emit_phase_changed().await;

        info!(
            "Monitoring session {} started ({} min)",
            session_id, plan.duration_min
        );

        Ok(self.get_state().await)
    }

    /// Manual break: pauses the countdown and gates every counter.
    pub async fn pause(&self) -> Result<SessionState, MonitorError> {
        {
            let mut state = self.state.lock().await;
            if !state.pause() {
                return Err(MonitorError::InvalidTransition {
                    action: "pause",
                    phase: state.phase.as_str(),
                });
            }
        }

        self.stats.set_gated(true).await;
        self.emit_phase_changed().await;
        Ok(self.get_state().await)
    }

    /// Leave the break: resumes the countdown and un-gates the counters.
    /// This is the only way out of a break, automatic or manual.
    pub async fn resume(&self) -> Result<SessionState, MonitorError> {
        {
            let mut state = self.state.lock().await;
            if !state.resume() {
                return Err(MonitorError::InvalidTransition {
                    action: "resume",
                    phase: state.phase.as_str(),
                });
            }
        }

        self.stats.set_gated(false).await;
        self.emit_phase_changed().await;
        Ok(self.get_state().await)
    }

    /// Explicit stop. Tears monitoring down, persists the session record and
    /// awards points for the elapsed minutes.
    pub async fn stop(&self) -> Result<Session, MonitorError> {
        let finished = finalize_session(
            &self.state,
            &self.db,
            &self.stats,
            &self.sensing,
            &self.events,
        )
        .await;

        let ticker = self.ticker.lock().await.take();
        if let Some(handle) = ticker {
            match &finished {
                // This call claimed the finish; the ticker is parked between
                // ticks and will observe the Ended phase, abort is safe.
                Some(_) => handle.abort(),
                // The countdown path may have claimed it and be mid-teardown;
                // let it run to completion.
                None => {
                    let _ = handle.await;
                }
            }
        }

        match finished {
            Some(session) => Ok(session),
            None => {
                // Nothing was running (or the countdown already ended it).
                // Teardown is idempotent, so make sure sensing is down.
                if let Err(err) = self.sensing.lock().await.stop_sensing().await {
                    error!("Failed to stop sensing: {err:?}");
                }
                Err(MonitorError::NotActive)
            }
        }
    }

    /// Return an Ended controller to Idle so a fresh session can start; the
    /// engine equivalent of navigating back to the setup screen.
    pub async fn reset(&self) -> Result<(), MonitorError> {
        let mut state = self.state.lock().await;
        match state.phase {
            MonitorPhase::Idle => Ok(()),
            MonitorPhase::Ended => {
                *state = SessionState::new();
                Ok(())
            }
            phase => Err(MonitorError::InvalidTransition {
                action: "reset",
                phase: phase.as_str(),
            }),
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = Arc::clone(&self.state);
        let db = self.db.clone();
        let stats = self.stats.clone();
        let sensing = Arc::clone(&self.sensing);
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            // The first tick of a tokio interval completes immediately;
            // consume it so the countdown starts a full second after start.
            interval.tick().await;
            let mut ticks: u32 = 0;

            loop {
                interval.tick().await;

                let distraction_seconds = stats.snapshot().await.distraction_seconds;

                let (outcome, snapshot) = {
                    let mut guard = state.lock().await;
                    if matches!(guard.phase, MonitorPhase::Idle | MonitorPhase::Ended) {
                        break;
                    }
                    let outcome = guard.tick(distraction_seconds);
                    (outcome, guard.clone())
                };

                match outcome {
                    TickOutcome::Continue => {
                        ticks = ticks.wrapping_add(1);
                        if ticks % heartbeat_every == 0 {
                            let _ = events.send(MonitorEvent::Heartbeat {
                                state: snapshot,
                                stats: stats.snapshot().await,
                            });
                        }
                    }
                    TickOutcome::BreakPrompt => {
                        info!(
                            "Focus dropped to {}%, prompting a break",
                            snapshot.focus_percent
                        );
                        stats.set_gated(true).await;
                        let _ = events.send(MonitorEvent::BreakPrompt {
                            focus_percent: snapshot.focus_percent,
                        });
                        let _ = events.send(MonitorEvent::PhaseChanged { state: snapshot });
                    }
                    TickOutcome::Finished => {
                        finalize_session(&state, &db, &stats, &sensing, &events).await;
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn emit_phase_changed(&self) {
        let state = self.state.lock().await.clone();
        let _ = self.events.send(MonitorEvent::PhaseChanged { state });
    }
}

/// Shared end-of-session path for explicit stops and countdown expiry.
/// Claims the Ended phase under the state lock, so whichever caller gets
/// there first performs teardown and persistence; the other sees `None`.
async fn finalize_session(
    state: &Arc<Mutex<SessionState>>,
    db: &Database,
    stats: &StatsRecorder,
    sensing: &Arc<Mutex<SensingController>>,
    events: &EventSender,
) -> Option<Session> {
    let final_stats = stats.snapshot().await;

    let (snapshot, points) = {
        let mut guard = state.lock().await;
        if matches!(guard.phase, MonitorPhase::Idle | MonitorPhase::Ended) {
            return None;
        }
        let points = guard.finalize(final_stats.distraction_seconds);
        (guard.clone(), points)
    };

    if let Err(err) = sensing.lock().await.stop_sensing().await {
        error!("Failed to stop sensing: {err:?}");
    }

    let (Some(session_id), Some(user_id)) = (snapshot.session_id.clone(), snapshot.user_id.clone())
    else {
        error!("Session ended without identifiers; nothing to persist");
        return None;
    };

    let ended_at = Utc::now();
    let session = Session {
        id: session_id,
        user_id,
        session_name: snapshot.session_name.clone(),
        duration_min: snapshot.duration_min,
        stats: final_stats,
        focus_percent: snapshot.focus_percent,
        points_awarded: points,
        video_url: snapshot.video_url.clone(),
        started_at: snapshot.started_at.unwrap_or(ended_at),
        ended_at,
        created_at: ended_at,
    };

    // At-most-once writes: a failed insert or point award is logged and the
    // user still gets the completion acknowledgment.
    if let Err(err) = db.insert_session(&session).await {
        error!("Failed to save session {}: {err:?}", session.id);
    }
    if points > 0 {
        if let Err(err) = db.add_points(&session.user_id, points).await {
            error!("Failed to award {points} points to {}: {err:?}", session.user_id);
        }
    }

    info!(
        "Session {} ended: focus {}%, {} points",
        session.id, session.focus_percent, session.points_awarded
    );

    let _ = events.send(MonitorEvent::PhaseChanged {
        state: state.lock().await.clone(),
    });
    let _ = events.send(MonitorEvent::SessionCompleted {
        session: session.clone(),
    });

    Some(session)
}
