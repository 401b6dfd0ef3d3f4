// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use time::Date;

use crate::{DAYS_PER_WEEK, ListData, LogEntry, LogEntryId, WeekStart, week_window};

/// Placeholder log, one bucket per weekday position of the week window.
const STATIC_WEEK: [&[(&str, &str)]; DAYS_PER_WEEK] = [
    &[
        ("Morning run", "5 km along the river, easy pace"),
        ("Standup", "Sprint planning moved to Wednesday"),
        ("Groceries", "Oats, coffee, spinach, lemons"),
    ],
    &[
        ("Dentist", "Cleaning at 09:30, next visit in six months"),
        ("Code review", "Pagination fix for the export endpoint"),
    ],
    &[
        ("Sprint planning", "Carried over two stories from last week"),
        ("Yoga", "Evening class, 60 minutes"),
        ("Call with Sam", "Weekend trip logistics"),
        ("Reading", "Two chapters of the systems book"),
    ],
    &[],
    &[
        ("Release", "Tagged 1.4.0 and published notes"),
        ("Team lunch", "Noodle place around the corner"),
    ],
    &[
        ("Hike", "Ridge loop, 14 km, clear skies"),
        ("Laundry", "Bedding and towels"),
    ],
    &[("Meal prep", "Lentil soup and roasted vegetables for the week")],
];

pub fn static_week() -> [Vec<LogEntry>; DAYS_PER_WEEK] {
    let mut next_id = 1_i64;
    STATIC_WEEK.map(|bucket| {
        bucket
            .iter()
            .map(|(label, desc)| {
                let entry = LogEntry {
                    id: LogEntryId::new(next_id),
                    label: (*label).to_owned(),
                    desc: (*desc).to_owned(),
                };
                next_id += 1;
                entry
            })
            .collect()
    })
}

/// Builds the week window around `date` with [`static_week`] buckets.
pub fn static_list(date: Date, week_start: WeekStart) -> Result<ListData> {
    let mut list = ListData::new();
    for (day, entries) in week_window(date, week_start)?.into_iter().zip(static_week()) {
        list.push_day(day, entries)?;
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::{static_list, static_week};
    use crate::{WeekStart, format_day_label};
    use anyhow::Result;
    use std::collections::BTreeSet;
    use time::{Date, Duration, Month};

    #[test]
    fn static_week_ids_are_unique() {
        let ids = static_week()
            .iter()
            .flatten()
            .map(|entry| entry.id)
            .collect::<Vec<_>>();
        let unique = ids.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), unique.len());
        assert!(static_week()[3].is_empty());
    }

    #[test]
    fn static_list_keys_are_the_seven_days_of_the_week() -> Result<()> {
        let monday = Date::from_calendar_date(2024, Month::March, 4)?;
        let list = static_list(monday + Duration::days(3), WeekStart::Monday)?;

        let expected = (0..7)
            .map(|offset| format_day_label(monday + Duration::days(offset)))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(list.keys().collect::<Vec<_>>(), expected);
        assert_eq!(list.sections()[0].entries, static_week()[0]);
        Ok(())
    }

    #[test]
    fn sunday_weeks_put_bucket_zero_on_sunday() -> Result<()> {
        let wednesday = Date::from_calendar_date(2024, Month::March, 6)?;
        let list = static_list(wednesday, WeekStart::Sunday)?;
        assert_eq!(list.keys().next(), Some("03 March 2024"));
        assert_eq!(list.sections()[0].entries, static_week()[0]);
        Ok(())
    }
}
