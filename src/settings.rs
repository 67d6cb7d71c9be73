//! Celebration preference and in-app feedback.

use std::sync::Arc;

use crate::context::{Notice, OverlayController, SessionContext};
use crate::error::{Result, ValidationError};
use crate::models::{Celebration, Feedback, SettingsPatch};
use crate::store::RecordStore;

pub struct SettingsService {
    store: Arc<dyn RecordStore>,
    ctx: SessionContext,
}

impl SettingsService {
    pub fn new(store: Arc<dyn RecordStore>, ctx: SessionContext) -> Self {
        Self { store, ctx }
    }

    /// Stores the celebration choice. Only the source matching the choice is kept.
    pub async fn save(&self, celebration: &Celebration) -> Result<()> {
        if let Celebration::Youtube { link } | Celebration::Video { url: link } = celebration {
            if link.trim().is_empty() {
                return Err(ValidationError::Other("a link is required".to_string()).into());
            }
        }
        self.store
            .upsert_settings(&self.ctx.user_id, &SettingsPatch::celebration(celebration))
            .await?;
        tracing::info!(kind = celebration.kind(), "celebration saved");
        Ok(())
    }
}

pub struct FeedbackService {
    store: Arc<dyn RecordStore>,
    overlay: Arc<dyn OverlayController>,
    ctx: SessionContext,
}

impl FeedbackService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        overlay: Arc<dyn OverlayController>,
        ctx: SessionContext,
    ) -> Self {
        Self {
            store,
            overlay,
            ctx,
        }
    }

    pub async fn submit(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyFeedback.into());
        }
        self.store
            .submit_feedback(&Feedback {
                user_id: self.ctx.user_id.clone(),
                feedback_text: text.to_string(),
            })
            .await?;
        self.overlay
            .show(Notice::Info("Thanks for your feedback!".to_string()));
        Ok(())
    }
}
