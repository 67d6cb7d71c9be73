//! Error handling for the nightly-ritual client

use std::fmt;
use thiserror::Error;

/// User input that fails a precondition. Never reaches the remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("add at least one task to your plan")]
    EmptyPlan,

    #[error("add at least one item to your to-do list")]
    EmptyTodoList,

    #[error("to-do item {index} is blank")]
    BlankTodoItem { index: usize },

    #[error("write at least {required} gratitude entries (got {given})")]
    NotEnoughGratitude { required: usize, given: usize },

    #[error("meditation must last at least one minute")]
    MeditationTooShort,

    #[error("'{0}' is not a number of minutes")]
    InvalidMinutes(String),

    #[error("{0} is not a valid reminder time")]
    InvalidReminderTime(String),

    #[error("feedback cannot be empty")]
    EmptyFeedback,

    #[error("{0}")]
    Other(String),
}

/// Unified error type for the nightly-ritual client
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Remote datastore read or write failed
    #[error("Database error: {0}")]
    Postgrest(#[from] nightly_ritual_postgrest::PostgrestError),

    #[error("Authentication error: {0}")]
    Auth(#[from] nightly_ritual_auth::AuthError),

    #[error("Function error: {0}")]
    Function(#[from] nightly_ritual_functions::FunctionsError),

    /// A transition expected an in-flight sleep session and found none
    #[error("No sleep session in progress")]
    MissingSession,

    /// The action is not valid from the current workflow state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Local storage error: {0}")]
    Cache(String),

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn cache<T: fmt::Display>(msg: T) -> Self {
        Error::Cache(msg.to_string())
    }

    pub fn payment<T: fmt::Display>(msg: T) -> Self {
        Error::Payment(msg.to_string())
    }

    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn notification<T: fmt::Display>(msg: T) -> Self {
        Error::Notification(msg.to_string())
    }

    /// Failures of a remote collaborator: the state must not advance and a retry may succeed.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Postgrest(_) | Error::Auth(_) | Error::Function(_) | Error::Http(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
