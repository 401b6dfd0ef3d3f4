// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, UtcOffset};

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Sunday => "sunday",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monday" => Some(Self::Monday),
            "sunday" => Some(Self::Sunday),
            _ => None,
        }
    }

    fn offset_of(self, date: Date) -> i64 {
        let offset = match self {
            Self::Monday => date.weekday().number_days_from_monday(),
            Self::Sunday => date.weekday().number_days_from_sunday(),
        };
        i64::from(offset)
    }
}

/// How a calendar selection relates to the week currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarEvent {
    /// The selected day is in a different week; the log must be refetched.
    WeekChange,
    DateChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSelection {
    pub date: Date,
    pub event: CalendarEvent,
}

pub fn week_start_of(date: Date, week_start: WeekStart) -> Result<Date> {
    date.checked_sub(Duration::days(week_start.offset_of(date)))
        .ok_or_else(|| anyhow!("week containing {date} starts before the supported date range"))
}

/// The seven consecutive days of the week containing `date`.
pub fn week_window(date: Date, week_start: WeekStart) -> Result<[Date; DAYS_PER_WEEK]> {
    let first = week_start_of(date, week_start)?;
    let mut days = [first; DAYS_PER_WEEK];
    for (offset, day) in days.iter_mut().enumerate().skip(1) {
        *day = first
            .checked_add(Duration::days(offset as i64))
            .ok_or_else(|| anyhow!("week containing {date} ends after the supported date range"))?;
    }
    Ok(days)
}

pub fn same_week(left: Date, right: Date, week_start: WeekStart) -> bool {
    match (
        week_start_of(left, week_start),
        week_start_of(right, week_start),
    ) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn classify(from: Date, to: Date, week_start: WeekStart) -> CalendarSelection {
    let event = if same_week(from, to, week_start) {
        CalendarEvent::DateChange
    } else {
        CalendarEvent::WeekChange
    };
    CalendarSelection { date: to, event }
}

/// Moves the selection by `days`, flagging a week change when the move leaves
/// the current week.
pub fn step_day(selected: Date, days: i64, week_start: WeekStart) -> Option<CalendarSelection> {
    let next = selected.checked_add(Duration::days(days))?;
    Some(classify(selected, next, week_start))
}

pub fn step_week(selected: Date, weeks: i64) -> Option<CalendarSelection> {
    let next = selected.checked_add(Duration::weeks(weeks))?;
    Some(CalendarSelection {
        date: next,
        event: CalendarEvent::WeekChange,
    })
}

pub fn jump_to(selected: Date, target: Date, week_start: WeekStart) -> CalendarSelection {
    classify(selected, target, week_start)
}

/// The machine's UTC offset, or UTC when it cannot be determined. Resolve it
/// before spawning threads: on Unix the lookup fails once other threads exist.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn today_at(offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(offset).date()
}

#[cfg(test)]
mod tests {
    use super::{
        CalendarEvent, WeekStart, jump_to, same_week, step_day, step_week, today_at, week_window,
    };
    use anyhow::Result;
    use time::{Date, Duration, Month, UtcOffset, Weekday};

    #[test]
    fn today_follows_the_offset() -> Result<()> {
        let east = today_at(UtcOffset::from_hms(14, 0, 0)?);
        let west = today_at(UtcOffset::from_hms(-12, 0, 0)?);
        assert!((1..=2).contains(&(east - west).whole_days()));
        Ok(())
    }

    #[test]
    fn week_window_starts_on_monday_by_default() -> Result<()> {
        let thursday = Date::from_calendar_date(2024, Month::March, 7)?;
        let days = week_window(thursday, WeekStart::default())?;

        assert_eq!(days[0], Date::from_calendar_date(2024, Month::March, 4)?);
        assert_eq!(days[0].weekday(), Weekday::Monday);
        assert_eq!(days[6].weekday(), Weekday::Sunday);
        assert!(days.contains(&thursday));
        for pair in days.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
        Ok(())
    }

    #[test]
    fn week_window_honors_sunday_start() -> Result<()> {
        let sunday = Date::from_calendar_date(2024, Month::March, 10)?;
        let days = week_window(sunday, WeekStart::Sunday)?;
        assert_eq!(days[0], sunday);
        assert_eq!(days[6].weekday(), Weekday::Saturday);
        Ok(())
    }

    #[test]
    fn week_window_spans_year_boundary() -> Result<()> {
        let new_year = Date::from_calendar_date(2025, Month::January, 1)?;
        let days = week_window(new_year, WeekStart::Monday)?;
        assert_eq!(days[0], Date::from_calendar_date(2024, Month::December, 30)?);
        assert_eq!(days[6], Date::from_calendar_date(2025, Month::January, 5)?);
        Ok(())
    }

    #[test]
    fn step_day_flags_week_change_at_boundary() -> Result<()> {
        let sunday = Date::from_calendar_date(2024, Month::March, 10)?;
        let within = step_day(sunday, -1, WeekStart::Monday).expect("in range");
        assert_eq!(within.event, CalendarEvent::DateChange);

        let crossing = step_day(sunday, 1, WeekStart::Monday).expect("in range");
        assert_eq!(crossing.event, CalendarEvent::WeekChange);
        assert_eq!(crossing.date.weekday(), Weekday::Monday);

        assert!(same_week(sunday, within.date, WeekStart::Monday));
        assert!(!same_week(sunday, crossing.date, WeekStart::Monday));
        assert!(same_week(sunday, crossing.date, WeekStart::Sunday));
        Ok(())
    }

    #[test]
    fn step_week_and_jump() -> Result<()> {
        let day = Date::from_calendar_date(2024, Month::March, 6)?;
        let next = step_week(day, 1).expect("in range");
        assert_eq!(next.date, Date::from_calendar_date(2024, Month::March, 13)?);
        assert_eq!(next.event, CalendarEvent::WeekChange);

        let same = jump_to(day, day, WeekStart::Monday);
        assert_eq!(same.event, CalendarEvent::DateChange);
        Ok(())
    }
}
