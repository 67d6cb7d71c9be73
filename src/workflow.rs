//! Sleep-session workflow
//!
//! A night moves through three states:
//!
//! ```text
//! Planning --confirm_plan--> Sleeping --wake_up--> MorningRitual --complete_*--> Planning
//! ```
//!
//! Every remote write is awaited before the state moves. When a write fails
//! the state and the device markers are left exactly as they were, so the
//! caller can retry. Marker writes are best-effort: a failure is logged and
//! the transition still happens.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::cache::{Markers, SleepMarkers};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::context::{Notice, OverlayController, SessionContext};
use crate::error::{Error, Result};
use crate::models::{NightPlan, SessionId, SessionUpdate};
use crate::plan::validate_plan;
use crate::ritual::{gratitude_text, MeditationMinutes, RitualOutcome, SleepDuration};
use crate::route::Route;
use crate::store::{RecordStore, SessionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepState {
    Planning,
    Sleeping {
        sleep_start: DateTime<Utc>,
        session: Option<SessionId>,
    },
    MorningRitual {
        sleep_start: DateTime<Utc>,
        sleep_end: DateTime<Utc>,
        session: Option<SessionId>,
    },
}

impl SleepState {
    pub fn name(&self) -> &'static str {
        match self {
            SleepState::Planning => "planning",
            SleepState::Sleeping { .. } => "sleeping",
            SleepState::MorningRitual { .. } => "in the morning ritual",
        }
    }

    /// Screen this state belongs on, if it pins one.
    pub fn route(&self) -> Option<Route> {
        match self {
            SleepState::Planning => None,
            SleepState::Sleeping { .. } => Some(Route::Sleeping),
            SleepState::MorningRitual { .. } => Some(Route::Morning),
        }
    }

    pub fn sleep_start(&self) -> Option<DateTime<Utc>> {
        match self {
            SleepState::Planning => None,
            SleepState::Sleeping { sleep_start, .. }
            | SleepState::MorningRitual { sleep_start, .. } => Some(*sleep_start),
        }
    }

    fn from_markers(markers: &SleepMarkers) -> Option<Self> {
        let sleep_start = markers.sleep_start?;
        Some(match markers.sleep_end {
            Some(sleep_end) => SleepState::MorningRitual {
                sleep_start,
                sleep_end,
                session: markers.session_id,
            },
            None => SleepState::Sleeping {
                sleep_start,
                session: markers.session_id,
            },
        })
    }
}

/// Tunables taken from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// A session whose start is older than this on relaunch is closed as abandoned.
    pub abandon_after: Duration,
    pub required_gratitude_entries: usize,
}

impl WorkflowPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        let abandon_after = Duration::try_minutes(config.abandon_after_minutes).unwrap_or_else(|| {
            tracing::warn!(
                minutes = config.abandon_after_minutes,
                "abandon bound out of range, using the default"
            );
            default_abandon_after()
        });
        Self {
            abandon_after,
            required_gratitude_entries: config.required_gratitude_entries,
        }
    }
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            abandon_after: default_abandon_after(),
            required_gratitude_entries: 1,
        }
    }
}

fn default_abandon_after() -> Duration {
    Duration::minutes(crate::config::DEFAULT_ABANDON_AFTER_MINUTES)
}

/// What [`SleepWorkflow::recover`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing was in flight.
    Idle,
    /// An in-flight session was restored or kept.
    Resumed(SleepState),
    /// A stale session was closed with zero duration.
    Abandoned { sleep_start: DateTime<Utc> },
}

pub struct SleepWorkflow {
    ctx: SessionContext,
    store: Arc<dyn RecordStore>,
    markers: Markers,
    clock: Arc<dyn Clock>,
    overlay: Arc<dyn OverlayController>,
    policy: WorkflowPolicy,
    state: SleepState,
    current_route: Option<Route>,
}

impl SleepWorkflow {
    pub fn new(
        ctx: SessionContext,
        store: Arc<dyn RecordStore>,
        markers: Markers,
        clock: Arc<dyn Clock>,
        overlay: Arc<dyn OverlayController>,
    ) -> Self {
        Self {
            ctx,
            store,
            markers,
            clock,
            overlay,
            policy: WorkflowPolicy::default(),
            state: SleepState::Planning,
            current_route: None,
        }
    }

    pub fn with_policy(mut self, policy: WorkflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> &SleepState {
        &self.state
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Commits tomorrow's plan and starts the night.
    pub async fn confirm_plan(&mut self, plan: NightPlan) -> Result<SessionId> {
        if !matches!(self.state, SleepState::Planning) {
            return Err(self.invalid("confirm a plan"));
        }
        validate_plan(&plan)?;

        let sleep_start = self.clock.now();
        let session = self
            .store
            .create_session(&self.ctx.user_id, sleep_start, &plan)
            .await
            .map_err(|e| self.save_failed("create sleep session", e))?;

        tracing::info!(
            user_id = %self.ctx.user_id,
            session_id = session,
            mode = ?plan.mode(),
            %sleep_start,
            "plan committed, sleep started"
        );

        best_effort(
            "write sleep markers",
            self.markers.begin_sleep(sleep_start, Some(session)).await,
        );
        self.state = SleepState::Sleeping {
            sleep_start,
            session: Some(session),
        };
        self.note_route(Route::Sleeping).await;
        self.overlay.show(Notice::PlanSaved);
        Ok(session)
    }

    /// Stamps the wake time. Waking twice keeps the first stamp.
    pub async fn wake_up(&mut self) -> Result<DateTime<Utc>> {
        if matches!(self.state, SleepState::Planning) {
            self.restore_from_markers().await?;
        }

        match self.state {
            SleepState::Planning => Err(Error::MissingSession),
            SleepState::MorningRitual { sleep_end, .. } => {
                tracing::debug!(%sleep_end, "already awake");
                Ok(sleep_end)
            }
            SleepState::Sleeping {
                sleep_start,
                session,
            } => {
                let sleep_end = self.clock.now();
                best_effort("write wake marker", self.markers.set_sleep_end(sleep_end).await);
                self.state = SleepState::MorningRitual {
                    sleep_start,
                    sleep_end,
                    session,
                };
                tracing::info!(session_id = ?session, %sleep_start, %sleep_end, "woke up");
                self.note_route(Route::Morning).await;
                Ok(sleep_end)
            }
        }
    }

    /// Closes the night with a gratitude journal.
    pub async fn complete_gratitude<S: AsRef<str>>(&mut self, entries: &[S]) -> Result<SessionUpdate> {
        let text = gratitude_text(entries, self.policy.required_gratitude_entries)?;
        self.finish(RitualOutcome::Gratitude(text)).await
    }

    /// Closes the night with a meditation.
    pub async fn complete_meditation(&mut self, minutes: MeditationMinutes) -> Result<SessionUpdate> {
        self.finish(RitualOutcome::Meditation(minutes)).await
    }

    async fn finish(&mut self, outcome: RitualOutcome) -> Result<SessionUpdate> {
        if matches!(self.state, SleepState::Planning) {
            self.restore_from_markers().await?;
        }

        let (sleep_start, sleep_end, session) = match self.state {
            SleepState::MorningRitual {
                sleep_start,
                sleep_end,
                session,
            } => (sleep_start, sleep_end, session),
            _ => return Err(self.invalid("finish the morning ritual")),
        };

        let duration = SleepDuration::between(sleep_start, sleep_end);
        let mut update = SessionUpdate {
            sleep_end: Some(sleep_end),
            duration_hours: Some(duration.hours),
            duration_minutes: Some(duration.minutes),
            ..Default::default()
        };
        match outcome {
            RitualOutcome::Gratitude(text) => update.gratitude_text = Some(text),
            RitualOutcome::Meditation(minutes) => {
                update.meditation_minutes = Some(i64::from(minutes.get()))
            }
        }

        let key = SessionKey::for_session(session, &self.ctx.user_id, sleep_start);
        self.store
            .update_session(&key, &update)
            .await
            .map_err(|e| self.save_failed("close sleep session", e))?;

        tracing::info!(
            session_id = ?session,
            duration_hours = duration.hours,
            duration_minutes = duration.minutes,
            "morning ritual complete"
        );

        best_effort("clear sleep markers", self.markers.clear_sleep().await);
        best_effort("set morning flag", self.markers.set_morning_done().await);
        self.state = SleepState::Planning;
        self.note_route(Route::Home).await;
        self.overlay.show(Notice::MorningRitualDone);
        Ok(update)
    }

    /// Reconciles in-memory state with the device markers. Runs on cold start
    /// and whenever the app returns to the foreground.
    ///
    /// A night still asleep that started longer ago than the abandonment bound
    /// is closed remotely with a zero duration and its markers are dropped.
    /// A night already woken from is always resumed so the ritual can record
    /// its real duration.
    pub async fn recover(&mut self) -> Result<Recovery> {
        let candidate = match self.state {
            SleepState::Planning => match self.markers.sleep().await {
                Ok(markers) if markers.active => SleepState::from_markers(&markers),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read sleep markers");
                    None
                }
            },
            in_flight => Some(in_flight),
        };

        let (sleep_start, session) = match candidate {
            None | Some(SleepState::Planning) => return Ok(Recovery::Idle),
            Some(SleepState::Sleeping {
                sleep_start,
                session,
            }) if self.is_stale(sleep_start) => (sleep_start, session),
            Some(resumed) => {
                if self.state != resumed {
                    tracing::info!(state = resumed.name(), "resumed sleep session");
                }
                self.state = resumed;
                return Ok(Recovery::Resumed(resumed));
            }
        };

        let key = SessionKey::for_session(session, &self.ctx.user_id, sleep_start);
        self.store
            .update_session(&key, &SessionUpdate::abandoned())
            .await
            .map_err(|e| self.save_failed("close abandoned session", e))?;

        tracing::warn!(
            %sleep_start,
            age_minutes = (self.clock.now() - sleep_start).num_minutes(),
            "closed abandoned sleep session"
        );

        best_effort("clear sleep markers", self.markers.clear_sleep().await);
        self.state = SleepState::Planning;
        self.note_route(Route::Home).await;
        self.overlay.show(Notice::SessionAbandoned { sleep_start });
        Ok(Recovery::Abandoned { sleep_start })
    }

    /// Where to send the user on launch. An in-flight session pins its own
    /// screen; otherwise the last remembered screen, unless that belongs to
    /// a night that is over.
    pub async fn resume_route(&self) -> Route {
        if let Some(route) = self.state.route() {
            return route;
        }
        match self.markers.last_route().await {
            Ok(Some(route)) if !route.is_sleep_flow() => route,
            Ok(_) => Route::Home,
            Err(e) => {
                tracing::warn!(error = %e, "could not read last route");
                Route::Home
            }
        }
    }

    /// Records the screen the user is on.
    pub async fn remember_route(&mut self, route: Route) {
        self.note_route(route).await;
    }

    /// Persists the current screen before the app is suspended.
    pub async fn flush_route(&self) {
        if let Some(route) = self.current_route.or_else(|| self.state.route()) {
            best_effort("write last route", self.markers.set_last_route(route).await);
        }
    }

    async fn note_route(&mut self, route: Route) {
        self.current_route = Some(route);
        best_effort("write last route", self.markers.set_last_route(route).await);
    }

    /// Fills an empty in-memory state from the markers, applying the same
    /// checks as [`SleepWorkflow::recover`]. Fails with
    /// [`Error::MissingSession`] when there is nothing to restore.
    async fn restore_from_markers(&mut self) -> Result<()> {
        match self.recover().await? {
            Recovery::Resumed(state) => {
                tracing::info!(state = state.name(), "restored sleep session from markers");
                Ok(())
            }
            Recovery::Abandoned { .. } => Err(Error::MissingSession),
            Recovery::Idle => {
                tracing::error!(user_id = %self.ctx.user_id, "no sleep session in progress");
                self.overlay.show(Notice::SessionLost);
                Err(Error::MissingSession)
            }
        }
    }

    fn is_stale(&self, sleep_start: DateTime<Utc>) -> bool {
        self.clock.now() - sleep_start > self.policy.abandon_after
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn save_failed(&self, what: &str, err: Error) -> Error {
        tracing::error!(error = %err, "failed to {}", what);
        self.overlay.show(Notice::SaveFailed(err.to_string()));
        err
    }
}

fn best_effort(what: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to {}", what);
    }
}
