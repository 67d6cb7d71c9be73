//! Explicit context handed to services at construction time.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Who is signed in. Built from the auth session and passed to every service
/// that talks to the backend on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    pub access_token: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

/// Something the user should see: a confirmation, a recovered error, an explanation.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    PlanSaved,
    MorningRitualDone,
    /// A sleep left running past the bound was closed with zero duration.
    SessionAbandoned { sleep_start: DateTime<Utc> },
    /// No in-flight session was found where one was expected.
    SessionLost,
    /// A remote write failed; nothing moved and a retry is possible.
    SaveFailed(String),
    Info(String),
}

/// Overlay surface owned by the presentation layer.
pub trait OverlayController: Send + Sync {
    fn show(&self, notice: Notice);
    fn clear(&self);
}

/// Overlay that ignores everything, for headless use.
#[derive(Debug, Default)]
pub struct SilentOverlay;

impl OverlayController for SilentOverlay {
    fn show(&self, _notice: Notice) {}
    fn clear(&self) {}
}

/// Keeps every notice shown so far, newest last.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    shown: Mutex<Vec<Notice>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.shown.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices().pop()
    }
}

impl OverlayController for RecordingOverlay {
    fn show(&self, notice: Notice) {
        self.shown
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(notice);
    }

    fn clear(&self) {
        self.shown.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}
