use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use super::KeyValueStore;
use crate::error::Result;
use crate::models::SessionId;
use crate::route::Route;

pub const SLEEP_START: &str = "sleep_start";
pub const SLEEP_END: &str = "sleep_end";
pub const SLEEP_SESSION_ID: &str = "sleep_session_id";
pub const SLEEP_STATE_ACTIVE: &str = "sleep_state_active";
pub const LAST_ROUTE: &str = "last_route";
pub const MORNING_ROUTINE_DONE: &str = "morning_routine_done";
pub const LAST_NOTIFICATION_DATE: &str = "last_notification_date";
pub const AUTH_SESSION: &str = "supabase_session";

/// Every marker tied to one in-flight sleep session.
pub const SLEEP_KEYS: [&str; 4] = [SLEEP_START, SLEEP_END, SLEEP_SESSION_ID, SLEEP_STATE_ACTIVE];

/// What the device remembers about an unfinished night.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SleepMarkers {
    pub active: bool,
    pub sleep_start: Option<DateTime<Utc>>,
    pub sleep_end: Option<DateTime<Utc>>,
    pub session_id: Option<SessionId>,
}

/// Typed access to the marker keys.
#[derive(Clone)]
pub struct Markers {
    store: Arc<dyn KeyValueStore>,
}

impl Markers {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    async fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let raw = match self.store.get(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(key, value = %raw, error = %e, "ignoring unreadable timestamp marker");
                Ok(None)
            }
        }
    }

    pub async fn sleep(&self) -> Result<SleepMarkers> {
        let active = self.store.get(SLEEP_STATE_ACTIVE).await?.as_deref() == Some("true");
        let session_id = self
            .store
            .get(SLEEP_SESSION_ID)
            .await?
            .and_then(|raw| raw.parse::<SessionId>().ok());

        Ok(SleepMarkers {
            active,
            sleep_start: self.timestamp(SLEEP_START).await?,
            sleep_end: self.timestamp(SLEEP_END).await?,
            session_id,
        })
    }

    /// Written at plan commit.
    pub async fn begin_sleep(
        &self,
        sleep_start: DateTime<Utc>,
        session_id: Option<SessionId>,
    ) -> Result<()> {
        self.store.set(SLEEP_START, &sleep_start.to_rfc3339()).await?;
        if let Some(id) = session_id {
            self.store.set(SLEEP_SESSION_ID, &id.to_string()).await?;
        }
        self.store.set(SLEEP_STATE_ACTIVE, "true").await
    }

    pub async fn set_sleep_end(&self, sleep_end: DateTime<Utc>) -> Result<()> {
        self.store.set(SLEEP_END, &sleep_end.to_rfc3339()).await
    }

    pub async fn clear_sleep(&self) -> Result<()> {
        self.store.remove_many(&SLEEP_KEYS).await
    }

    pub async fn last_route(&self) -> Result<Option<Route>> {
        Ok(self
            .store
            .get(LAST_ROUTE)
            .await?
            .and_then(|raw| Route::from_path(&raw)))
    }

    pub async fn set_last_route(&self, route: Route) -> Result<()> {
        self.store.set(LAST_ROUTE, route.as_path()).await
    }

    pub async fn set_morning_done(&self) -> Result<()> {
        self.store.set(MORNING_ROUTINE_DONE, "true").await
    }

    /// Reads and clears the one-time "just finished the morning routine" flag.
    pub async fn take_morning_done(&self) -> Result<bool> {
        let set = self.store.get(MORNING_ROUTINE_DONE).await?.is_some();
        if set {
            self.store.remove(MORNING_ROUTINE_DONE).await?;
        }
        Ok(set)
    }

    pub async fn last_notification_date(&self) -> Result<Option<NaiveDate>> {
        Ok(self
            .store
            .get(LAST_NOTIFICATION_DATE)
            .await?
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()))
    }

    pub async fn set_last_notification_date(&self, date: NaiveDate) -> Result<()> {
        self.store
            .set(LAST_NOTIFICATION_DATE, &date.format("%Y-%m-%d").to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn markers() -> Markers {
        Markers::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn sleep_markers_roundtrip_and_clear() {
        let markers = markers();
        let start: DateTime<Utc> = "2024-01-01T22:00:00Z".parse().unwrap();

        assert_eq!(markers.sleep().await.unwrap(), SleepMarkers::default());

        markers.begin_sleep(start, Some(42)).await.unwrap();
        let snapshot = markers.sleep().await.unwrap();
        assert!(snapshot.active);
        assert_eq!(snapshot.sleep_start, Some(start));
        assert_eq!(snapshot.session_id, Some(42));
        assert_eq!(snapshot.sleep_end, None);

        markers.store().set(LAST_ROUTE, "/sleeping").await.unwrap();
        markers.clear_sleep().await.unwrap();
        assert_eq!(markers.sleep().await.unwrap(), SleepMarkers::default());
        assert_eq!(markers.last_route().await.unwrap(), Some(Route::Sleeping));
    }

    #[tokio::test]
    async fn unreadable_timestamp_reads_as_absent() {
        let markers = markers();
        markers.store().set(SLEEP_START, "yesterday").await.unwrap();
        assert_eq!(markers.sleep().await.unwrap().sleep_start, None);
    }

    #[tokio::test]
    async fn morning_flag_is_one_time() {
        let markers = markers();
        assert!(!markers.take_morning_done().await.unwrap());
        markers.set_morning_done().await.unwrap();
        assert!(markers.take_morning_done().await.unwrap());
        assert!(!markers.take_morning_done().await.unwrap());
    }
}
