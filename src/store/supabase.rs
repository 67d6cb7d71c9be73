use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use nightly_ritual_postgrest::{first_row, PostgrestClient, SortOrder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    RecordStore, SessionKey, SessionQuery, FEEDBACK, ONBOARDING_ANSWERS, SLEEP_LOGS, USER_SETTINGS,
    USER_STATE,
};
use crate::config::AppConfig;
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::models::{
    Feedback, NewSleepSession, NightPlan, OnboardingAnswer, SessionId, SessionUpdate,
    SettingsPatch, SleepSession, UserState, UserStatePatch,
};

#[derive(Deserialize)]
struct InsertedId {
    id: SessionId,
}

#[derive(Serialize)]
struct UserStateRow<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    patch: UserStatePatch,
}

#[derive(Serialize)]
struct SettingsRow<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    patch: &'a SettingsPatch,
    updated_at: DateTime<Utc>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// [`RecordStore`] over the hosted PostgREST endpoint, acting as the signed-in user.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    http_client: Client,
    access_token: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig, http_client: Client, ctx: &SessionContext) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            anon_key: config.anon_key.clone(),
            http_client,
            access_token: ctx.access_token.clone(),
        }
    }

    fn from(&self, table: &str) -> Result<PostgrestClient> {
        let client = PostgrestClient::new(
            &self.base_url,
            &self.anon_key,
            table,
            self.http_client.clone(),
        )?
        .with_auth(&self.access_token)?;
        Ok(client)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn create_session(
        &self,
        user_id: &str,
        sleep_start: DateTime<Utc>,
        plan: &NightPlan,
    ) -> Result<SessionId> {
        let row = NewSleepSession::new(user_id, sleep_start, plan);
        let inserted = self.from(SLEEP_LOGS)?.select("id").insert(&row).await?;
        let InsertedId { id } = first_row(inserted)?;
        tracing::debug!(session_id = id, "sleep session created");
        Ok(id)
    }

    async fn update_session(&self, key: &SessionKey, update: &SessionUpdate) -> Result<()> {
        let query = match key {
            SessionKey::Id(id) => self.from(SLEEP_LOGS)?.eq("id", &id.to_string()),
            SessionKey::UserStart {
                user_id,
                sleep_start,
            } => self
                .from(SLEEP_LOGS)?
                .eq("user_id", user_id)
                .eq("sleep_start", &timestamp(*sleep_start)),
        };

        match query.select("id").update(update).await? {
            Value::Array(rows) if rows.is_empty() => {
                tracing::warn!(?key, "update matched no sleep session");
                Err(Error::MissingSession)
            }
            _ => Ok(()),
        }
    }

    async fn latest_session(&self, user_id: &str) -> Result<Option<SleepSession>> {
        let latest = self
            .from(SLEEP_LOGS)?
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", SortOrder::Descending)
            .limit(1)
            .maybe_single::<SleepSession>()
            .await?;
        Ok(latest)
    }

    async fn list_sessions(&self, user_id: &str, query: &SessionQuery) -> Result<Vec<SleepSession>> {
        let mut request = self
            .from(SLEEP_LOGS)?
            .select("*")
            .eq("user_id", user_id)
            .order(query.order_by.column(), SortOrder::Descending);
        if let Some(from) = query.from {
            request = request.gte("created_at", &timestamp(from));
        }
        if let Some(to) = query.to {
            request = request.lte("created_at", &timestamp(to));
        }
        if let Some(limit) = query.limit {
            request = request.limit(limit);
        }
        Ok(request.execute::<SleepSession>().await?)
    }

    async fn user_state(&self, user_id: &str) -> Result<UserState> {
        let state = self
            .from(USER_STATE)?
            .select("user_id,has_onboarded,has_paid")
            .eq("user_id", user_id)
            .maybe_single::<UserState>()
            .await?;
        Ok(state.unwrap_or_else(|| UserState {
            user_id: user_id.to_string(),
            ..Default::default()
        }))
    }

    async fn upsert_user_state(&self, user_id: &str, patch: UserStatePatch) -> Result<()> {
        self.from(USER_STATE)?
            .on_conflict("user_id")
            .upsert(UserStateRow { user_id, patch })
            .await?;
        Ok(())
    }

    async fn upsert_settings(&self, user_id: &str, patch: &SettingsPatch) -> Result<()> {
        let row = SettingsRow {
            user_id,
            patch,
            updated_at: Utc::now(),
        };
        self.from(USER_SETTINGS)?
            .on_conflict("user_id")
            .upsert(row)
            .await?;
        Ok(())
    }

    async fn save_onboarding_answer(&self, answer: &OnboardingAnswer) -> Result<()> {
        self.from(ONBOARDING_ANSWERS)?
            .on_conflict("user_id,key")
            .upsert(answer)
            .await?;
        Ok(())
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.from(FEEDBACK)?.insert(feedback).await?;
        Ok(())
    }
}
