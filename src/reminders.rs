//! Daily bedtime reminder.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use std::sync::Arc;

use crate::cache::Markers;
use crate::clock::Clock;
use crate::error::{Error, Result};

pub const REMINDER_TITLE: &str = "Time to unwind";
pub const REMINDER_BODY: &str = "Prepare for sleep with your nightly ritual";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

/// OS notification scheduler.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn cancel_all(&self) -> Result<()>;

    async fn schedule(&self, reminder: &Reminder) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// A reminder was already scheduled today.
    AlreadyScheduled,
    Scheduled(DateTime<Utc>),
    /// The notification service refused; the next launch tries again.
    Failed,
}

/// First `hour:minute` in `offset` local time strictly after `now`.
pub fn next_trigger(
    now: DateTime<Utc>,
    offset: FixedOffset,
    hour: u32,
    minute: u32,
) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
        Error::notification(format!("{:02}:{:02} is not a time of day", hour, minute))
    })?;
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive().and_time(time);
    let mut trigger = offset
        .from_local_datetime(&today)
        .single()
        .ok_or_else(|| Error::notification("ambiguous local time"))?;
    if trigger <= local_now {
        trigger += Duration::days(1);
    }
    Ok(trigger.with_timezone(&Utc))
}

pub struct ReminderScheduler {
    notifications: Arc<dyn NotificationService>,
    markers: Markers,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    hour: u32,
    minute: u32,
}

impl ReminderScheduler {
    pub fn new(
        notifications: Arc<dyn NotificationService>,
        markers: Markers,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            notifications,
            markers,
            clock,
            offset,
            hour: crate::config::DEFAULT_REMINDER_HOUR,
            minute: 0,
        }
    }

    /// Sets the time [`ReminderScheduler::schedule_configured`] uses.
    pub fn with_time(mut self, hour: u32, minute: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self
    }

    /// Schedules at the configured time of day.
    pub async fn schedule_configured(&self) -> ReminderOutcome {
        self.schedule_daily(self.hour, self.minute).await
    }

    /// Schedules the next reminder at most once per local day.
    ///
    /// Never fails: problems are logged and reported as [`ReminderOutcome::Failed`].
    pub async fn schedule_daily(&self, hour: u32, minute: u32) -> ReminderOutcome {
        match self.try_schedule(hour, minute).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, hour, minute, "could not schedule daily reminder");
                ReminderOutcome::Failed
            }
        }
    }

    async fn try_schedule(&self, hour: u32, minute: u32) -> Result<ReminderOutcome> {
        let now = self.clock.now();
        let today = now.with_timezone(&self.offset).date_naive();
        if self.markers.last_notification_date().await? == Some(today) {
            return Ok(ReminderOutcome::AlreadyScheduled);
        }

        let fire_at = next_trigger(now, self.offset, hour, minute)?;
        self.notifications.cancel_all().await?;
        self.notifications
            .schedule(&Reminder {
                title: REMINDER_TITLE.to_string(),
                body: REMINDER_BODY.to_string(),
                fire_at,
            })
            .await?;
        self.markers.set_last_notification_date(today).await?;

        tracing::info!(%fire_at, "daily reminder scheduled");
        Ok(ReminderOutcome::Scheduled(fire_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::clock::ManualClock;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeNotifications {
        scheduled: Mutex<Vec<Reminder>>,
        cancels: Mutex<usize>,
        refuse: bool,
    }

    #[async_trait]
    impl NotificationService for FakeNotifications {
        async fn cancel_all(&self) -> Result<()> {
            *self.cancels.lock().unwrap() += 1;
            self.scheduled.lock().unwrap().clear();
            Ok(())
        }

        async fn schedule(&self, reminder: &Reminder) -> Result<()> {
            if self.refuse {
                return Err(Error::notification("permission denied"));
            }
            self.scheduled.lock().unwrap().push(reminder.clone());
            Ok(())
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn scheduler(
        notifications: Arc<FakeNotifications>,
        clock: Arc<ManualClock>,
    ) -> (ReminderScheduler, Markers) {
        let markers = Markers::new(Arc::new(MemoryStore::new()));
        let offset = FixedOffset::east_opt(0).unwrap();
        (
            ReminderScheduler::new(notifications, markers.clone(), clock, offset),
            markers,
        )
    }

    #[test]
    fn trigger_rolls_to_tomorrow_once_passed() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            next_trigger(at("2024-03-01T18:00:00Z"), utc, 21, 0).unwrap(),
            at("2024-03-01T21:00:00Z")
        );
        assert_eq!(
            next_trigger(at("2024-03-01T21:00:00Z"), utc, 21, 0).unwrap(),
            at("2024-03-02T21:00:00Z")
        );

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            next_trigger(at("2024-03-01T18:00:00Z"), plus_two, 21, 30).unwrap(),
            at("2024-03-01T19:30:00Z")
        );
        assert!(next_trigger(at("2024-03-01T18:00:00Z"), utc, 24, 0).is_err());
    }

    #[tokio::test]
    async fn schedules_once_per_day() {
        let notifications = Arc::new(FakeNotifications::default());
        let clock = Arc::new(ManualClock::new(at("2024-03-01T08:00:00Z")));
        let (scheduler, markers) = scheduler(notifications.clone(), clock.clone());

        assert_eq!(
            scheduler.schedule_daily(21, 0).await,
            ReminderOutcome::Scheduled(at("2024-03-01T21:00:00Z"))
        );
        assert_eq!(
            scheduler.schedule_daily(21, 0).await,
            ReminderOutcome::AlreadyScheduled
        );
        assert_eq!(*notifications.cancels.lock().unwrap(), 1);

        let scheduled = notifications.scheduled.lock().unwrap().clone();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].title, REMINDER_TITLE);
        assert_eq!(scheduled[0].body, REMINDER_BODY);
        assert_eq!(
            markers.last_notification_date().await.unwrap(),
            Some(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );

        clock.advance(Duration::days(1));
        assert!(matches!(
            scheduler.schedule_daily(21, 0).await,
            ReminderOutcome::Scheduled(_)
        ));
    }

    #[tokio::test]
    async fn refusal_is_swallowed_and_retried() {
        let notifications = Arc::new(FakeNotifications {
            refuse: true,
            ..Default::default()
        });
        let clock = Arc::new(ManualClock::new(at("2024-03-01T08:00:00Z")));
        let (scheduler, markers) = scheduler(notifications, clock);

        assert_eq!(scheduler.schedule_daily(21, 0).await, ReminderOutcome::Failed);
        assert_eq!(markers.last_notification_date().await.unwrap(), None);
    }

    #[tokio::test]
    async fn configured_time_is_used() {
        let notifications = Arc::new(FakeNotifications::default());
        let clock = Arc::new(ManualClock::new(at("2024-03-01T08:00:00Z")));
        let (scheduler, _) = scheduler(notifications.clone(), clock);

        let scheduler = scheduler.with_time(22, 15);
        assert_eq!(
            scheduler.schedule_configured().await,
            ReminderOutcome::Scheduled(at("2024-03-01T22:15:00Z"))
        );
        assert_eq!(notifications.scheduled.lock().unwrap().len(), 1);
    }
}
