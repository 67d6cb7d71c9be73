//! Past nights: journal and meditation logs, the weekly chart and the streak.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::SessionContext;
use crate::error::Result;
use crate::models::{SessionId, SleepSession};
use crate::store::{RecordStore, SessionQuery};

#[derive(Debug, Clone, PartialEq)]
pub struct GratitudeEntry {
    pub session: SessionId,
    pub date: NaiveDate,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeditationEntry {
    pub session: SessionId,
    pub date: NaiveDate,
    pub minutes: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationFilter {
    #[default]
    All,
    /// Under 10 minutes
    Short,
    /// 10 to 30 minutes
    Medium,
    /// Over 30 minutes
    Long,
}

impl DurationFilter {
    pub fn matches(self, minutes: i64) -> bool {
        match self {
            DurationFilter::All => true,
            DurationFilter::Short => minutes < 10,
            DurationFilter::Medium => (10..=30).contains(&minutes),
            DurationFilter::Long => minutes > 30,
        }
    }

    /// The filter the toggle moves to next.
    pub fn next(self) -> Self {
        match self {
            DurationFilter::All => DurationFilter::Short,
            DurationFilter::Short => DurationFilter::Medium,
            DurationFilter::Medium => DurationFilter::Long,
            DurationFilter::Long => DurationFilter::All,
        }
    }
}

/// Inclusive calendar-date bounds; an open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// One bar of the weekly chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBar {
    pub day: Weekday,
    pub hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyChart {
    /// Monday first
    pub bars: [DayBar; 7],
    pub total_hours: i64,
}

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Sessions with a journal entry, split into items, in the order given.
pub fn gratitude_entries(
    sessions: &[SleepSession],
    offset: FixedOffset,
    range: DateRange,
) -> Vec<GratitudeEntry> {
    sessions
        .iter()
        .filter_map(|session| {
            let text = session.gratitude_text.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            let date = session.logged_at().with_timezone(&offset).date_naive();
            Some(GratitudeEntry {
                session: session.id,
                date,
                items: text.split(',').map(|item| item.trim().to_string()).collect(),
            })
        })
        .filter(|entry| range.contains(entry.date))
        .collect()
}

pub fn meditation_entries(
    sessions: &[SleepSession],
    offset: FixedOffset,
    range: DateRange,
    filter: DurationFilter,
) -> Vec<MeditationEntry> {
    sessions
        .iter()
        .filter_map(|session| {
            let minutes = session.meditation_minutes.filter(|m| *m > 0)?;
            Some(MeditationEntry {
                session: session.id,
                date: session.logged_at().with_timezone(&offset).date_naive(),
                minutes,
            })
        })
        .filter(|entry| range.contains(entry.date) && filter.matches(entry.minutes))
        .collect()
}

/// Buckets up to the seven given sessions by the weekday they started on.
///
/// Sessions are expected newest first; when two share a weekday the one
/// processed last (the older) fills the bar. Hours are truncated.
pub fn weekly_chart(sessions: &[SleepSession], offset: FixedOffset) -> WeeklyChart {
    let mut hours = [0i64; 7];
    for session in sessions.iter().take(7) {
        let day = session
            .sleep_start
            .with_timezone(&offset)
            .weekday()
            .num_days_from_monday() as usize;
        hours[day] = session.duration_hours.map_or(0, |h| h.trunc() as i64);
    }

    let bars = WEEK.map(|day| DayBar {
        day,
        hours: hours[day.num_days_from_monday() as usize],
    });
    WeeklyChart {
        bars,
        total_hours: hours.iter().sum(),
    }
}

/// Consecutive calendar days with a session, counting back from `today`.
///
/// A run that ended yesterday still counts, so the streak survives until the
/// user misses a whole day.
pub fn streak(sessions: &[SleepSession], offset: FixedOffset, today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = sessions
        .iter()
        .map(|s| s.sleep_start.with_timezone(&offset).date_naive())
        .collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut count = 0;
    while days.contains(&day) {
        count += 1;
        day -= Duration::days(1);
    }
    count
}

pub struct History {
    store: Arc<dyn RecordStore>,
    ctx: SessionContext,
    offset: FixedOffset,
}

impl History {
    pub fn new(store: Arc<dyn RecordStore>, ctx: SessionContext, offset: FixedOffset) -> Self {
        Self { store, ctx, offset }
    }

    pub async fn gratitude(&self, range: DateRange) -> Result<Vec<GratitudeEntry>> {
        let sessions = self
            .store
            .list_sessions(&self.ctx.user_id, &SessionQuery::default())
            .await?;
        Ok(gratitude_entries(&sessions, self.offset, range))
    }

    pub async fn meditation(
        &self,
        range: DateRange,
        filter: DurationFilter,
    ) -> Result<Vec<MeditationEntry>> {
        let sessions = self
            .store
            .list_sessions(&self.ctx.user_id, &SessionQuery::default())
            .await?;
        Ok(meditation_entries(&sessions, self.offset, range, filter))
    }

    /// The last seven nights by start time, as chart and streak.
    pub async fn week(&self, today: NaiveDate) -> Result<(WeeklyChart, u32)> {
        let sessions = self
            .store
            .list_sessions(
                &self.ctx.user_id,
                &SessionQuery::newest(7).by_sleep_start(),
            )
            .await?;
        Ok((
            weekly_chart(&sessions, self.offset),
            streak(&sessions, self.offset, today),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn session(id: SessionId, start: &str) -> SleepSession {
        let sleep_start: DateTime<Utc> = start.parse().unwrap();
        SleepSession {
            id,
            user_id: "u-1".to_string(),
            sleep_start,
            sleep_end: None,
            duration_hours: None,
            duration_minutes: None,
            planned_plan: None,
            todo_list: None,
            gratitude_text: None,
            meditation_minutes: None,
            created_at: Some(sleep_start),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn gratitude_splits_and_skips_blank() {
        let mut a = session(1, "2024-03-04T22:00:00Z");
        a.gratitude_text = Some("tea, sun ,friends".to_string());
        let mut b = session(2, "2024-03-03T22:00:00Z");
        b.gratitude_text = Some("   ".to_string());
        let c = session(3, "2024-03-02T22:00:00Z");

        let entries = gratitude_entries(&[a, b, c], utc(), DateRange::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].items, vec!["tea", "sun", "friends"]);
        assert_eq!(entries[0].date, date("2024-03-04"));
    }

    #[test]
    fn meditation_filters_by_length_and_date() {
        let sessions: Vec<SleepSession> = [(1, 5), (2, 10), (3, 30), (4, 31), (5, 0)]
            .into_iter()
            .map(|(id, minutes)| {
                let mut s = session(id, &format!("2024-03-0{}T22:00:00Z", id));
                s.meditation_minutes = Some(minutes);
                s
            })
            .collect();

        let ids = |filter, range| -> Vec<SessionId> {
            meditation_entries(&sessions, utc(), range, filter)
                .into_iter()
                .map(|e| e.session)
                .collect()
        };

        assert_eq!(ids(DurationFilter::All, DateRange::default()), vec![1, 2, 3, 4]);
        assert_eq!(ids(DurationFilter::Short, DateRange::default()), vec![1]);
        assert_eq!(ids(DurationFilter::Medium, DateRange::default()), vec![2, 3]);
        assert_eq!(ids(DurationFilter::Long, DateRange::default()), vec![4]);

        let range = DateRange {
            from: Some(date("2024-03-02")),
            to: Some(date("2024-03-03")),
        };
        assert_eq!(ids(DurationFilter::All, range), vec![2, 3]);
    }

    #[test]
    fn duration_filter_cycles() {
        let mut filter = DurationFilter::All;
        for _ in 0..4 {
            filter = filter.next();
        }
        assert_eq!(filter, DurationFilter::All);
    }

    #[test]
    fn weekly_chart_truncates_and_oldest_duplicate_wins() {
        // 2024-03-04 is a Monday
        let mut mon_new = session(3, "2024-03-11T22:00:00Z");
        mon_new.duration_hours = Some(8.9);
        let mut wed = session(2, "2024-03-06T22:00:00Z");
        wed.duration_hours = Some(6.5);
        let mut mon_old = session(1, "2024-03-04T22:00:00Z");
        mon_old.duration_hours = Some(7.2);

        let chart = weekly_chart(&[mon_new, wed, mon_old], utc());
        assert_eq!(chart.bars[0], DayBar { day: Weekday::Mon, hours: 7 });
        assert_eq!(chart.bars[2].hours, 6);
        assert_eq!(chart.bars[6].day, Weekday::Sun);
        assert_eq!(chart.total_hours, 13);
    }

    #[test]
    fn streak_counts_back_from_today_or_yesterday() {
        let sessions = vec![
            session(4, "2024-03-09T22:00:00Z"),
            session(3, "2024-03-08T22:00:00Z"),
            session(2, "2024-03-08T23:30:00Z"),
            session(1, "2024-03-06T22:00:00Z"),
        ];
        assert_eq!(streak(&sessions, utc(), date("2024-03-09")), 2);
        assert_eq!(streak(&sessions, utc(), date("2024-03-10")), 2);
        assert_eq!(streak(&sessions, utc(), date("2024-03-11")), 0);
        assert_eq!(streak(&[], utc(), date("2024-03-11")), 0);
    }
}
