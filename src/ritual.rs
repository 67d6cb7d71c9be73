//! Morning ritual inputs and the sleep-duration arithmetic.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;

/// One full turn of the meditation dial.
pub const DIAL_MINUTES_PER_TURN: f64 = 60.0;

/// How the user chose to close the night.
#[derive(Debug, Clone, PartialEq)]
pub enum RitualOutcome {
    /// Trimmed entries joined with `", "`
    Gratitude(String),
    Meditation(MeditationMinutes),
}

/// A validated meditation length, at least one minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MeditationMinutes(u32);

impl MeditationMinutes {
    pub fn new(minutes: i64) -> Result<Self, ValidationError> {
        if minutes < 1 {
            return Err(ValidationError::MeditationTooShort);
        }
        u32::try_from(minutes)
            .map(Self)
            .map_err(|_| ValidationError::InvalidMinutes(minutes.to_string()))
    }

    /// Manual numeric entry, e.g. `"15"`.
    pub fn from_manual(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let minutes = trimmed
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidMinutes(trimmed.to_string()))?;
        Self::new(minutes)
    }

    /// Rotary gesture: total rotation in degrees, a full turn is an hour.
    /// Rounds to the nearest minute.
    pub fn from_dial_degrees(degrees: f64) -> Result<Self, ValidationError> {
        if !degrees.is_finite() {
            return Err(ValidationError::InvalidMinutes(degrees.to_string()));
        }
        let minutes = (degrees / 360.0 * DIAL_MINUTES_PER_TURN).round();
        Self::new(minutes as i64)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Joins the non-blank entries, trimmed, with `", "`.
///
/// Fails when fewer than `required` entries carry text.
pub fn gratitude_text<S: AsRef<str>>(
    entries: &[S],
    required: usize,
) -> Result<String, ValidationError> {
    let kept: Vec<&str> = entries
        .iter()
        .map(|entry| entry.as_ref().trim())
        .filter(|entry| !entry.is_empty())
        .collect();

    let required = required.max(1);
    if kept.len() < required {
        return Err(ValidationError::NotEnoughGratitude {
            required,
            given: kept.len(),
        });
    }
    Ok(kept.join(", "))
}

/// Elapsed sleep between the two stamps.
///
/// Hours are rounded half away from zero to two decimals; minutes are
/// truncated. An end at or before the start counts as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepDuration {
    pub hours: f64,
    pub minutes: i64,
}

impl SleepDuration {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let seconds = (end - start).num_seconds().max(0);
        let hours = ((seconds as f64 / 3600.0) * 100.0).round() / 100.0;
        Self {
            hours,
            minutes: seconds / 60,
        }
    }
}
