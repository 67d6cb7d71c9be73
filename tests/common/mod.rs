#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nightly_ritual::cache::KeyValueStore;
use nightly_ritual::error::{Error, Result};
use nightly_ritual::models::{
    Feedback, NewSleepSession, NightPlan, OnboardingAnswer, SessionId, SessionUpdate,
    SettingsPatch, SleepSession, UserState, UserStatePatch,
};
use nightly_ritual::store::{RecordStore, SessionKey, SessionOrder, SessionQuery};
use nightly_ritual_postgrest::PostgrestError;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn unavailable() -> Error {
    Error::Postgrest(PostgrestError::UnparsedApiError {
        message: "service unavailable".to_string(),
        status: StatusCode::SERVICE_UNAVAILABLE,
    })
}

/// In-memory record store that can be told to reject writes.
#[derive(Default)]
pub struct FakeStore {
    sessions: Mutex<Vec<SleepSession>>,
    user_states: Mutex<HashMap<String, UserState>>,
    pub settings: Mutex<Vec<(String, SettingsPatch)>>,
    pub answers: Mutex<Vec<OnboardingAnswer>>,
    pub feedback: Mutex<Vec<Feedback>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> Vec<SleepSession> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn session(&self, id: SessionId) -> Option<SleepSession> {
        self.sessions().into_iter().find(|s| s.id == id)
    }

    pub fn insert(&self, session: SleepSession) {
        self.sessions.lock().unwrap().push(session);
    }

    pub fn state_of(&self, user_id: &str) -> Option<UserState> {
        self.user_states.lock().unwrap().get(user_id).cloned()
    }

    fn write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn create_session(
        &self,
        user_id: &str,
        sleep_start: DateTime<Utc>,
        plan: &NightPlan,
    ) -> Result<SessionId> {
        self.write()?;
        let row = NewSleepSession::new(user_id, sleep_start, plan);
        let mut sessions = self.sessions.lock().unwrap();
        let id = sessions.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        sessions.push(SleepSession {
            id,
            user_id: row.user_id,
            sleep_start: row.sleep_start,
            sleep_end: None,
            duration_hours: None,
            duration_minutes: None,
            planned_plan: row.planned_plan,
            todo_list: row.todo_list,
            gratitude_text: None,
            meditation_minutes: None,
            created_at: Some(sleep_start),
        });
        Ok(id)
    }

    async fn update_session(&self, key: &SessionKey, update: &SessionUpdate) -> Result<()> {
        self.write()?;
        let mut sessions = self.sessions.lock().unwrap();
        let row = sessions
            .iter_mut()
            .find(|s| match key {
                SessionKey::Id(id) => s.id == *id,
                SessionKey::UserStart {
                    user_id,
                    sleep_start,
                } => &s.user_id == user_id && s.sleep_start == *sleep_start,
            })
            .ok_or(Error::MissingSession)?;

        if let Some(end) = update.sleep_end {
            row.sleep_end = Some(end);
        }
        if let Some(hours) = update.duration_hours {
            row.duration_hours = Some(hours);
        }
        if let Some(minutes) = update.duration_minutes {
            row.duration_minutes = Some(minutes);
        }
        if let Some(text) = &update.gratitude_text {
            row.gratitude_text = Some(text.clone());
        }
        if let Some(minutes) = update.meditation_minutes {
            row.meditation_minutes = Some(minutes);
        }
        Ok(())
    }

    async fn latest_session(&self, user_id: &str) -> Result<Option<SleepSession>> {
        let query = SessionQuery::newest(1);
        Ok(self.list_sessions(user_id, &query).await?.into_iter().next())
    }

    async fn list_sessions(&self, user_id: &str, query: &SessionQuery) -> Result<Vec<SleepSession>> {
        let mut rows: Vec<SleepSession> = self
            .sessions()
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| query.from.map_or(true, |from| s.logged_at() >= from))
            .filter(|s| query.to.map_or(true, |to| s.logged_at() <= to))
            .collect();
        match query.order_by {
            SessionOrder::CreatedAt => rows.sort_by_key(|s| std::cmp::Reverse(s.logged_at())),
            SessionOrder::SleepStart => rows.sort_by_key(|s| std::cmp::Reverse(s.sleep_start)),
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn user_state(&self, user_id: &str) -> Result<UserState> {
        Ok(self.state_of(user_id).unwrap_or_else(|| UserState {
            user_id: user_id.to_string(),
            ..Default::default()
        }))
    }

    async fn upsert_user_state(&self, user_id: &str, patch: UserStatePatch) -> Result<()> {
        self.write()?;
        let mut states = self.user_states.lock().unwrap();
        let state = states.entry(user_id.to_string()).or_insert_with(|| UserState {
            user_id: user_id.to_string(),
            ..Default::default()
        });
        if let Some(onboarded) = patch.has_onboarded {
            state.has_onboarded = onboarded;
        }
        if let Some(paid) = patch.has_paid {
            state.has_paid = paid;
        }
        Ok(())
    }

    async fn upsert_settings(&self, user_id: &str, patch: &SettingsPatch) -> Result<()> {
        self.write()?;
        self.settings
            .lock()
            .unwrap()
            .push((user_id.to_string(), patch.clone()));
        Ok(())
    }

    async fn save_onboarding_answer(&self, answer: &OnboardingAnswer) -> Result<()> {
        self.write()?;
        let mut answers = self.answers.lock().unwrap();
        answers.retain(|a| !(a.user_id == answer.user_id && a.question_key == answer.question_key));
        answers.push(answer.clone());
        Ok(())
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.write()?;
        self.feedback.lock().unwrap().push(feedback.clone());
        Ok(())
    }
}

/// Local store whose writes always fail; reads see nothing.
#[derive(Default)]
pub struct BrokenCache;

#[async_trait]
impl KeyValueStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: &str) -> Result<()> {
        Err(Error::cache(format!("disk full writing {}", key)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Err(Error::cache(format!("disk full removing {}", key)))
    }
}
