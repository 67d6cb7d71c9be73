//! Rows exchanged with the remote datastore and the plan types they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned primary key of a `sleep_logs` row.
pub type SessionId = i64;

/// One half-hour slot of a planner-mode plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSlot {
    /// `HH:MM`, 24-hour clock
    pub time: String,
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Tomorrow's plan. A session carries exactly one of the two modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightPlan {
    Planner(Vec<PlanSlot>),
    Todo(Vec<TodoItem>),
}

impl NightPlan {
    pub fn mode(&self) -> PlanMode {
        match self {
            NightPlan::Planner(_) => PlanMode::Planner,
            NightPlan::Todo(_) => PlanMode::Todo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    Planner,
    Todo,
}

/// A `sleep_logs` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub id: SessionId,
    pub user_id: String,
    pub sleep_start: DateTime<Utc>,
    #[serde(default)]
    pub sleep_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub planned_plan: Option<Vec<PlanSlot>>,
    #[serde(default)]
    pub todo_list: Option<Vec<TodoItem>>,
    #[serde(default)]
    pub gratitude_text: Option<String>,
    #[serde(default)]
    pub meditation_minutes: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SleepSession {
    /// The plan stored on the row. A non-empty planner column wins if a
    /// legacy row carries both.
    pub fn plan(&self) -> Option<NightPlan> {
        match (&self.planned_plan, &self.todo_list) {
            (Some(slots), _) if !slots.is_empty() => Some(NightPlan::Planner(slots.clone())),
            (_, Some(items)) if !items.is_empty() => Some(NightPlan::Todo(items.clone())),
            _ => None,
        }
    }

    /// Closed with a zero duration after being found stale.
    pub fn is_abandoned(&self) -> bool {
        self.duration_minutes == Some(0)
    }

    /// When the history screens date this entry.
    pub fn logged_at(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or(self.sleep_start)
    }
}

/// Insert payload for a freshly committed plan. The unused plan column is
/// written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSleepSession {
    pub user_id: String,
    pub sleep_start: DateTime<Utc>,
    pub planned_plan: Option<Vec<PlanSlot>>,
    pub todo_list: Option<Vec<TodoItem>>,
}

impl NewSleepSession {
    pub fn new(user_id: &str, sleep_start: DateTime<Utc>, plan: &NightPlan) -> Self {
        let (planned_plan, todo_list) = match plan {
            NightPlan::Planner(slots) => (Some(slots.clone()), None),
            NightPlan::Todo(items) => (None, Some(items.clone())),
        };
        Self {
            user_id: user_id.to_string(),
            sleep_start,
            planned_plan,
            todo_list,
        }
    }
}

/// Columns written when a session is closed. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gratitude_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meditation_minutes: Option<i64>,
}

impl SessionUpdate {
    /// Zeroed duration for a session found stale on relaunch.
    pub fn abandoned() -> Self {
        Self {
            duration_hours: Some(0.0),
            duration_minutes: Some(0),
            ..Default::default()
        }
    }
}

/// A `user_state` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub user_id: String,
    #[serde(default)]
    pub has_onboarded: bool,
    #[serde(default)]
    pub has_paid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_onboarded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_paid: Option<bool>,
}

impl UserStatePatch {
    pub fn onboarded() -> Self {
        Self {
            has_onboarded: Some(true),
            has_paid: None,
        }
    }

    pub fn paid() -> Self {
        Self {
            has_onboarded: Some(true),
            has_paid: Some(true),
        }
    }
}

/// What plays when the morning ritual is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Celebration {
    None,
    Youtube { link: String },
    Video { url: String },
}

impl Celebration {
    pub fn kind(&self) -> &'static str {
        match self {
            Celebration::None => "none",
            Celebration::Youtube { .. } => "youtube",
            Celebration::Video { .. } => "video",
        }
    }
}

/// Partial `user_settings` row for an upsert. `Some(None)` writes `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsPatch {
    #[serde(rename = "celebrationType", skip_serializing_if = "Option::is_none")]
    pub celebration_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_link: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_minute: Option<u32>,
}

impl SettingsPatch {
    pub fn celebration(celebration: &Celebration) -> Self {
        let (youtube_link, video_url) = match celebration {
            Celebration::None => (None, None),
            Celebration::Youtube { link } => (Some(link.clone()), None),
            Celebration::Video { url } => (None, Some(url.clone())),
        };
        Self {
            celebration_type: Some(celebration.kind().to_string()),
            youtube_link: Some(youtube_link),
            video_url: Some(video_url),
            ..Default::default()
        }
    }

    pub fn reminder(hour: u32, minute: u32) -> Self {
        Self {
            reminder_hour: Some(hour),
            reminder_minute: Some(minute),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingAnswer {
    pub user_id: String,
    #[serde(rename = "key")]
    pub question_key: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub user_id: String,
    pub feedback_text: String,
}
