//! One-time unlock purchase.
//!
//! A hosted function creates the payment intent; the device's payment sheet
//! collects the card. Only a completed payment marks the account as paid.

use async_trait::async_trait;
use nightly_ritual_functions::{FunctionOptions, FunctionsClient, FunctionsError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::{Notice, OverlayController, SessionContext};
use crate::error::{Error, Result};
use crate::models::UserStatePatch;
use crate::store::RecordStore;

pub const CREATE_PAYMENT_INTENT: &str = "create-payment-intent";
pub const MERCHANT_DISPLAY_NAME: &str = "DayAhead";

#[derive(Debug, Serialize)]
struct IntentRequest {
    amount: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentResponse {
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Canceled,
    Failed(String),
}

/// The hosted payment sheet on the device.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    /// Prepares and shows the sheet for `client_secret`, resolving when the
    /// user finishes or dismisses it. Errors mean the sheet could not be shown.
    async fn present(&self, client_secret: &str, merchant_display_name: &str)
        -> Result<PaymentOutcome>;
}

pub struct PaywallFlow {
    functions: FunctionsClient,
    sheet: Arc<dyn PaymentSheet>,
    store: Arc<dyn RecordStore>,
    overlay: Arc<dyn OverlayController>,
    ctx: SessionContext,
    amount_cents: u32,
}

impl PaywallFlow {
    pub fn new(
        functions: FunctionsClient,
        sheet: Arc<dyn PaymentSheet>,
        store: Arc<dyn RecordStore>,
        overlay: Arc<dyn OverlayController>,
        ctx: SessionContext,
        amount_cents: u32,
    ) -> Self {
        Self {
            functions,
            sheet,
            store,
            overlay,
            ctx,
            amount_cents,
        }
    }

    /// Runs the purchase. A canceled sheet returns `Canceled` and writes nothing.
    pub async fn purchase(&self) -> Result<PaymentOutcome> {
        let client_secret = self.create_intent().await?;

        let outcome = self
            .sheet
            .present(&client_secret, MERCHANT_DISPLAY_NAME)
            .await?;

        match &outcome {
            PaymentOutcome::Completed => {
                self.store
                    .upsert_user_state(&self.ctx.user_id, UserStatePatch::paid())
                    .await?;
                tracing::info!(user_id = %self.ctx.user_id, "unlock purchased");
                self.overlay
                    .show(Notice::Info("Payment successful!".to_string()));
                Ok(outcome)
            }
            PaymentOutcome::Canceled => {
                tracing::debug!("payment sheet dismissed");
                Ok(outcome)
            }
            PaymentOutcome::Failed(message) => {
                tracing::warn!(%message, "payment failed");
                self.overlay
                    .show(Notice::Info(format!("Payment failed: {}", message)));
                Err(Error::payment(message))
            }
        }
    }

    /// Dismisses the paywall without paying; onboarding still counts as done.
    pub async fn skip(&self) -> Result<()> {
        self.store
            .upsert_user_state(&self.ctx.user_id, UserStatePatch::onboarded())
            .await
    }

    async fn create_intent(&self) -> Result<String> {
        let options = FunctionOptions {
            access_token: Some(self.ctx.access_token.clone()),
            headers: None,
        };
        let response = self
            .functions
            .invoke::<IntentResponse, _>(
                CREATE_PAYMENT_INTENT,
                Some(IntentRequest {
                    amount: self.amount_cents,
                }),
                Some(options),
            )
            .await
            .map_err(|e| match e {
                FunctionsError::FunctionError { message, .. } => Error::payment(message),
                other => Error::Function(other),
            })?;

        match response {
            IntentResponse {
                client_secret: Some(secret),
                ..
            } if !secret.is_empty() => Ok(secret),
            IntentResponse {
                error: Some(message),
                ..
            } => Err(Error::payment(message)),
            _ => Err(Error::payment("payment intent has no client secret")),
        }
    }
}
