//! App lifecycle dispatch.
//!
//! The host forwards its lifecycle callbacks here; each registered handler
//! reacts in turn.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::workflow::SleepWorkflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    ColdStart,
    Foreground,
    Background,
}

#[async_trait]
pub trait LifecycleHandler: Send {
    async fn on_event(&mut self, event: LifecycleEvent) -> Result<()>;
}

pub type SharedHandler = Arc<Mutex<dyn LifecycleHandler>>;

#[derive(Default, Clone)]
pub struct LifecycleRegistry {
    handlers: Vec<SharedHandler>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: SharedHandler) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs every handler in registration order. A failing handler does not
    /// stop the others; all failures are returned.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Vec<Error> {
        tracing::debug!(?event, handlers = self.handlers.len(), "lifecycle event");
        let mut failures = Vec::new();
        for handler in &self.handlers {
            if let Err(e) = handler.lock().await.on_event(event).await {
                tracing::warn!(?event, error = %e, "lifecycle handler failed");
                failures.push(e);
            }
        }
        failures
    }
}

#[async_trait]
impl LifecycleHandler for SleepWorkflow {
    async fn on_event(&mut self, event: LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::ColdStart | LifecycleEvent::Foreground => {
                self.recover().await?;
            }
            LifecycleEvent::Background => self.flush_route().await,
        }
        Ok(())
    }
}
