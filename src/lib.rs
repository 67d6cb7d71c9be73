//! Nightly ritual client library
//!
//! Plan tomorrow before bed, track the night, and close it in the morning with
//! a gratitude journal or a meditation. Records live in a hosted backend; the
//! device only keeps the markers needed to resume an unfinished night.

pub mod account;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod models;
pub mod onboarding;
pub mod payment;
pub mod plan;
pub mod reminders;
pub mod ritual;
pub mod route;
pub mod settings;
pub mod store;
pub mod workflow;

use reqwest::Client;
use std::sync::Arc;

pub use nightly_ritual_auth::{Auth, AuthOptions};
pub use nightly_ritual_functions::FunctionsClient;

use crate::account::AuthManager;
use crate::cache::{KeyValueStore, Markers};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::context::{OverlayController, SessionContext};
use crate::display::{DisplaySnapshot, DisplayTicker};
use crate::error::Result;
use crate::models::PlanSlot;
use crate::payment::{PaymentSheet, PaywallFlow};
use crate::reminders::{NotificationService, ReminderScheduler};
use crate::store::{RecordStore, SupabaseStore};
use crate::workflow::{SleepWorkflow, WorkflowPolicy};

/// Entry point: one configured HTTP client shared by every service.
pub struct NightlyRitual {
    config: AppConfig,
    http_client: Client,
}

impl NightlyRitual {
    /// Creates the client from a validated configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nightly_ritual::{config::AppConfig, NightlyRitual};
    ///
    /// let config = AppConfig::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// let app = NightlyRitual::new(config).unwrap();
    /// ```
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional `NIGHTLY_*` overrides.
    pub fn from_env() -> Result<Self> {
        Self::new(AppConfig::from_env()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn auth(&self) -> Auth {
        Auth::new(
            self.config.base_url(),
            &self.config.anon_key,
            self.http_client.clone(),
            AuthOptions::default(),
        )
    }

    pub fn auth_manager(&self, cache: Arc<dyn KeyValueStore>) -> AuthManager {
        AuthManager::new(self.auth(), cache)
    }

    pub fn functions(&self) -> FunctionsClient {
        FunctionsClient::new(
            self.config.base_url(),
            &self.config.anon_key,
            self.http_client.clone(),
        )
    }

    /// The signed-in user's records.
    pub fn store(&self, ctx: &SessionContext) -> SupabaseStore {
        SupabaseStore::new(&self.config, self.http_client.clone(), ctx)
    }

    pub fn workflow(
        &self,
        ctx: SessionContext,
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        overlay: Arc<dyn OverlayController>,
    ) -> SleepWorkflow {
        SleepWorkflow::new(ctx, store, Markers::new(cache), clock, overlay)
            .with_policy(WorkflowPolicy::from_config(&self.config))
    }

    pub fn paywall(
        &self,
        ctx: SessionContext,
        store: Arc<dyn RecordStore>,
        sheet: Arc<dyn PaymentSheet>,
        overlay: Arc<dyn OverlayController>,
    ) -> PaywallFlow {
        PaywallFlow::new(
            self.functions(),
            sheet,
            store,
            overlay,
            ctx,
            self.config.payment_amount_cents,
        )
    }

    pub fn reminders(
        &self,
        notifications: Arc<dyn NotificationService>,
        cache: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> ReminderScheduler {
        ReminderScheduler::new(
            notifications,
            Markers::new(cache),
            clock,
            self.config.utc_offset,
        )
        .with_time(self.config.reminder_hour, self.config.reminder_minute)
    }

    /// Starts recomputing the home screen's display state at the configured
    /// refresh period. Must be called inside a tokio runtime.
    pub fn display_ticker<F>(
        &self,
        clock: Arc<dyn Clock>,
        slots: Vec<PlanSlot>,
        on_tick: F,
    ) -> DisplayTicker
    where
        F: FnMut(DisplaySnapshot) + Send + 'static,
    {
        DisplayTicker::spawn(
            self.config.display_refresh,
            clock,
            self.config.utc_offset,
            slots,
            on_tick,
        )
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::cache::{FileStore, KeyValueStore, Markers, MemoryStore};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::AppConfig;
    pub use crate::context::{Notice, OverlayController, SessionContext};
    pub use crate::error::{Error, Result, ValidationError};
    pub use crate::lifecycle::{LifecycleEvent, LifecycleHandler, LifecycleRegistry};
    pub use crate::models::{NightPlan, PlanSlot, SleepSession, TodoItem};
    pub use crate::ritual::MeditationMinutes;
    pub use crate::route::Route;
    pub use crate::store::{RecordStore, SupabaseStore};
    pub use crate::workflow::{Recovery, SleepState, SleepWorkflow};
    pub use crate::NightlyRitual;
}
