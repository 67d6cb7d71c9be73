//! Configuration for the nightly-ritual client

use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Sleep sessions older than this on relaunch are force-closed.
pub const DEFAULT_ABANDON_AFTER_MINUTES: i64 = 720;
pub const DEFAULT_REMINDER_HOUR: u32 = 21;
pub const DEFAULT_PAYMENT_AMOUNT_CENTS: u32 = 500;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the hosted backend project
    pub url: Url,

    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,

    /// HTTP request timeout; the workflow adds none of its own
    pub request_timeout: Option<Duration>,

    /// Offset used for calendar questions (which day is "today", slot times)
    pub utc_offset: FixedOffset,

    /// Staleness bound for an in-progress sleep session
    pub abandon_after_minutes: i64,

    /// Minimum non-blank gratitude entries to close a session
    pub required_gratitude_entries: usize,

    pub reminder_hour: u32,
    pub reminder_minute: u32,

    /// Price of the unlock, in cents
    pub payment_amount_cents: u32,

    /// How often derived display state is recomputed
    pub display_refresh: Duration,
}

impl AppConfig {
    /// Creates a configuration with defaults, validating the URL and key.
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            utc_offset: utc(),
            abandon_after_minutes: DEFAULT_ABANDON_AFTER_MINUTES,
            required_gratitude_entries: 1,
            reminder_hour: DEFAULT_REMINDER_HOUR,
            reminder_minute: 0,
            payment_amount_cents: DEFAULT_PAYMENT_AMOUNT_CENTS,
            display_refresh: Duration::from_secs(30),
        })
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`, plus optional `NIGHTLY_*` overrides.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;
        let mut config = Self::new(&url, &key)?;

        if let Some(minutes) = env_parse::<i32>("NIGHTLY_UTC_OFFSET_MINUTES")? {
            config = config.with_utc_offset_minutes(minutes)?;
        }
        if let Some(minutes) = env_parse::<i64>("NIGHTLY_ABANDON_AFTER_MINUTES")? {
            config = config.with_abandon_after_minutes(minutes)?;
        }
        if let Some(count) = env_parse::<usize>("NIGHTLY_GRATITUDE_ENTRIES")? {
            config = config.with_required_gratitude_entries(count)?;
        }
        if let Some(hour) = env_parse::<u32>("NIGHTLY_REMINDER_HOUR")? {
            let minute = env_parse::<u32>("NIGHTLY_REMINDER_MINUTE")?.unwrap_or(0);
            config = config.with_reminder(hour, minute)?;
        }
        if let Some(secs) = env_parse::<u64>("NIGHTLY_DISPLAY_REFRESH_SECS")? {
            config = config.with_display_refresh(Duration::from_secs(secs))?;
        }
        if let Some(secs) = env_parse::<u64>("NIGHTLY_REQUEST_TIMEOUT_SECS")? {
            config = config.with_request_timeout(Some(Duration::from_secs(secs)));
        }
        Ok(config)
    }

    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Result<Self> {
        self.utc_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::config(format!("utc offset {} minutes out of range", minutes)))?;
        Ok(self)
    }

    pub fn with_abandon_after_minutes(mut self, minutes: i64) -> Result<Self> {
        if minutes <= 0 {
            return Err(Error::config("abandon bound must be positive"));
        }
        TimeDelta::try_minutes(minutes)
            .ok_or_else(|| Error::config(format!("abandon bound {} minutes out of range", minutes)))?;
        self.abandon_after_minutes = minutes;
        Ok(self)
    }

    pub fn with_required_gratitude_entries(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::config("at least one gratitude entry must be required"));
        }
        self.required_gratitude_entries = count;
        Ok(self)
    }

    pub fn with_reminder(mut self, hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::config(format!(
                "reminder time {:02}:{:02} is invalid",
                hour, minute
            )));
        }
        self.reminder_hour = hour;
        self.reminder_minute = minute;
        Ok(self)
    }

    pub fn with_payment_amount_cents(mut self, cents: u32) -> Self {
        self.payment_amount_cents = cents;
        self
    }

    pub fn with_display_refresh(mut self, value: Duration) -> Result<Self> {
        if value.is_zero() {
            return Err(Error::config("display refresh period must be non-zero"));
        }
        self.display_refresh = value;
        Ok(self)
    }

    /// Base URL without the trailing slash `Url` adds to bare hosts.
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
