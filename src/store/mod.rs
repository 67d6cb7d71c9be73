//! Remote record store
//!
//! Everything that outlives a night is kept remotely. The workflow and the
//! services only see the [`RecordStore`] trait; [`SupabaseStore`] is the
//! PostgREST-backed implementation.

mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Feedback, NightPlan, OnboardingAnswer, SessionId, SessionUpdate, SettingsPatch, SleepSession,
    UserState, UserStatePatch,
};

pub use supabase::SupabaseStore;

pub const SLEEP_LOGS: &str = "sleep_logs";
pub const USER_STATE: &str = "user_state";
pub const USER_SETTINGS: &str = "user_settings";
pub const ONBOARDING_ANSWERS: &str = "onboarding_answers";
pub const FEEDBACK: &str = "feedback";

/// How to find the row to close.
///
/// Sessions restored from markers written before the row id was known fall
/// back to the `(user_id, sleep_start)` pair, which is unique per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKey {
    Id(SessionId),
    UserStart {
        user_id: String,
        sleep_start: DateTime<Utc>,
    },
}

impl SessionKey {
    pub fn for_session(id: Option<SessionId>, user_id: &str, sleep_start: DateTime<Utc>) -> Self {
        match id {
            Some(id) => SessionKey::Id(id),
            None => SessionKey::UserStart {
                user_id: user_id.to_string(),
                sleep_start,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionOrder {
    #[default]
    CreatedAt,
    SleepStart,
}

impl SessionOrder {
    pub fn column(self) -> &'static str {
        match self {
            SessionOrder::CreatedAt => "created_at",
            SessionOrder::SleepStart => "sleep_start",
        }
    }
}

/// Listing parameters. Results always come back newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionQuery {
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    pub order_by: SessionOrder,
    pub limit: Option<u32>,
}

impl SessionQuery {
    pub fn newest(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn by_sleep_start(mut self) -> Self {
        self.order_by = SessionOrder::SleepStart;
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a session row at plan commit and returns its id.
    async fn create_session(
        &self,
        user_id: &str,
        sleep_start: DateTime<Utc>,
        plan: &NightPlan,
    ) -> Result<SessionId>;

    async fn update_session(&self, key: &SessionKey, update: &SessionUpdate) -> Result<()>;

    async fn latest_session(&self, user_id: &str) -> Result<Option<SleepSession>>;

    async fn list_sessions(&self, user_id: &str, query: &SessionQuery) -> Result<Vec<SleepSession>>;

    /// The user's flags, defaulted when no row exists yet.
    async fn user_state(&self, user_id: &str) -> Result<UserState>;

    async fn upsert_user_state(&self, user_id: &str, patch: UserStatePatch) -> Result<()>;

    async fn upsert_settings(&self, user_id: &str, patch: &SettingsPatch) -> Result<()>;

    async fn save_onboarding_answer(&self, answer: &OnboardingAnswer) -> Result<()>;

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()>;
}
