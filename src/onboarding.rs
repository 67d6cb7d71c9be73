//! First-run questionnaire answers and the "onboarded" flag.

use std::sync::Arc;

use crate::context::SessionContext;
use crate::error::{Result, ValidationError};
use crate::models::{OnboardingAnswer, SettingsPatch, UserStatePatch};
use crate::store::RecordStore;

/// Answer key whose value also becomes the celebration setting.
pub const CELEBRATION_KEY: &str = "celebration_type";
/// Answer key whose value also becomes the stored YouTube link.
pub const YOUTUBE_LINK_KEY: &str = "youtube_link";
/// Celebration answer that asks for a link as a follow-up.
pub const VIDEO_ANSWER: &str = "Video";

pub struct Onboarding {
    store: Arc<dyn RecordStore>,
    ctx: SessionContext,
}

impl Onboarding {
    pub fn new(store: Arc<dyn RecordStore>, ctx: SessionContext) -> Self {
        Self { store, ctx }
    }

    /// Saves one answer; answering again replaces the earlier one.
    pub async fn answer(&self, question_key: &str, answer: &str) -> Result<()> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(ValidationError::Other(format!("{} needs an answer", question_key)).into());
        }

        self.store
            .save_onboarding_answer(&OnboardingAnswer {
                user_id: self.ctx.user_id.clone(),
                question_key: question_key.to_string(),
                answer: answer.to_string(),
            })
            .await?;

        let mirrored = match question_key {
            CELEBRATION_KEY => Some(SettingsPatch {
                celebration_type: Some(answer.to_string()),
                ..Default::default()
            }),
            YOUTUBE_LINK_KEY => Some(SettingsPatch {
                youtube_link: Some(Some(answer.to_string())),
                ..Default::default()
            }),
            _ => None,
        };
        if let Some(patch) = mirrored {
            self.store.upsert_settings(&self.ctx.user_id, &patch).await?;
        }

        tracing::debug!(question_key, "onboarding answer saved");
        Ok(())
    }

    /// Whether the link question should be asked after `celebration_answer`.
    pub fn wants_link(celebration_answer: &str) -> bool {
        celebration_answer == VIDEO_ANSWER
    }

    pub async fn set_reminder_time(&self, hour: u32, minute: u32) -> Result<()> {
        if hour > 23 || minute > 59 {
            return Err(
                ValidationError::InvalidReminderTime(format!("{:02}:{:02}", hour, minute)).into(),
            );
        }
        self.store
            .upsert_settings(&self.ctx.user_id, &SettingsPatch::reminder(hour, minute))
            .await
    }

    pub async fn complete(&self) -> Result<()> {
        self.store
            .upsert_user_state(&self.ctx.user_id, UserStatePatch::onboarded())
            .await?;
        tracing::info!(user_id = %self.ctx.user_id, "onboarding complete");
        Ok(())
    }
}
