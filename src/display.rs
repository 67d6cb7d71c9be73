//! Derived display state for the home screen.
//!
//! Nothing here is stored: the period of day and the highlighted slot are
//! recomputed from the clock, either on demand or by a [`DisplayTicker`].

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::context::SessionContext;
use crate::error::Result;
use crate::models::{NightPlan, PlanSlot, TodoItem};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=9 => DayPeriod::Morning,
            10..=16 => DayPeriod::Afternoon,
            17..=19 => DayPeriod::Evening,
            _ => DayPeriod::Night,
        }
    }

    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::from_hour(now.with_timezone(&offset).hour())
    }

    pub fn background(self) -> &'static str {
        match self {
            DayPeriod::Morning => "#FFF7D1",
            DayPeriod::Afternoon => "#FFFFFF",
            DayPeriod::Evening => "#FFD6A5",
            DayPeriod::Night => "#1A237E",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            DayPeriod::Night => "#FFFFFF",
            _ => "#000000",
        }
    }
}

/// Minutes after midnight for `"21:30"`, `"9:30 pm"` or `"12:15am"`.
pub fn parse_clock_time(input: &str) -> Option<u32> {
    let lower = input.trim().to_ascii_lowercase();
    let pm = lower.ends_with("pm");
    let am = lower.ends_with("am");
    let digits = lower.trim_end_matches("pm").trim_end_matches("am").trim();

    let (hour, minute) = match digits.split_once(':') {
        Some((h, m)) => (h.trim().parse::<u32>().ok()?, m.trim().parse::<u32>().ok()?),
        None => (digits.parse::<u32>().ok()?, 0),
    };
    if minute > 59 {
        return None;
    }

    let hour = match (am, pm, hour) {
        (false, false, h) if h < 24 => h,
        (true, _, 12) => 0,
        (_, true, 12) => 12,
        (_, true, h) if (1..12).contains(&h) => h + 12,
        (true, _, h) if (1..12).contains(&h) => h,
        _ => return None,
    };
    Some(hour * 60 + minute)
}

/// Index of the slot that is under way: the last non-blank one whose time
/// has been reached.
pub fn active_slot(slots: &[PlanSlot], minutes_now: u32) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| !slot.task.trim().is_empty())
        .filter_map(|(i, slot)| parse_clock_time(&slot.time).map(|at| (i, at)))
        .filter(|(_, at)| *at <= minutes_now)
        .map(|(i, _)| i)
        .last()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub at: DateTime<Utc>,
    pub period: DayPeriod,
    pub active_slot: Option<usize>,
}

impl DisplaySnapshot {
    pub fn derive(now: DateTime<Utc>, offset: FixedOffset, slots: &[PlanSlot]) -> Self {
        let local = now.with_timezone(&offset);
        Self {
            at: now,
            period: DayPeriod::from_hour(local.hour()),
            active_slot: active_slot(slots, local.hour() * 60 + local.minute()),
        }
    }
}

/// Shortest period a [`DisplayTicker`] will tick at.
pub const MIN_DISPLAY_REFRESH: Duration = Duration::from_millis(1);

/// Pushes a fresh [`DisplaySnapshot`] on every tick. Stops when dropped.
pub struct DisplayTicker {
    handle: JoinHandle<()>,
}

impl DisplayTicker {
    pub fn spawn<F>(
        every: Duration,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        slots: Vec<PlanSlot>,
        mut on_tick: F,
    ) -> Self
    where
        F: FnMut(DisplaySnapshot) + Send + 'static,
    {
        let every = every.max(MIN_DISPLAY_REFRESH);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                on_tick(DisplaySnapshot::derive(clock.now(), offset, &slots));
            }
        });
        Self { handle }
    }

    pub fn stop(self) {}
}

impl Drop for DisplayTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// What the home screen lists for the current plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeView {
    Planner(Vec<PlanSlot>),
    Todo(Vec<TodoItem>),
}

/// The latest session's plan with blank entries left out.
pub async fn home_view(store: &dyn RecordStore, ctx: &SessionContext) -> Result<Option<HomeView>> {
    let latest = store.latest_session(&ctx.user_id).await?;
    Ok(latest.and_then(|session| session.plan()).map(|plan| match plan {
        NightPlan::Planner(slots) => HomeView::Planner(
            slots
                .into_iter()
                .filter(|slot| !slot.task.trim().is_empty())
                .collect(),
        ),
        NightPlan::Todo(items) => HomeView::Todo(
            items
                .into_iter()
                .filter(|item| !item.text.trim().is_empty())
                .collect(),
        ),
    }))
}
