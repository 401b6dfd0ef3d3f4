// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::ids::LogEntryId;

/// Section key format, `dd MMMM yyyy` (for example `05 March 2024`).
const DAY_LABEL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:zero] [month repr:long] [year]");

pub fn format_day_label(date: Date) -> Result<String> {
    date.format(DAY_LABEL_FORMAT)
        .with_context(|| format!("format day label for {date}"))
}

pub fn parse_day_label(label: &str) -> Result<Date> {
    Date::parse(label, DAY_LABEL_FORMAT)
        .with_context(|| format!("parse day label {label:?}; expected e.g. \"05 March 2024\""))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub label: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySection {
    pub date: Date,
    pub label: String,
    pub entries: Vec<LogEntry>,
}

/// Day sections keyed by label, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListData {
    sections: Vec<DaySection>,
}

impl ListData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a day. Days must be pushed in strictly increasing order so the
    /// labels stay unique and the key order stays chronological.
    pub fn push_day(&mut self, date: Date, entries: Vec<LogEntry>) -> Result<()> {
        if let Some(last) = self.sections.last()
            && last.date >= date
        {
            bail!(
                "day {date} pushed after {}; list days must be strictly increasing",
                last.date
            );
        }

        self.sections.push(DaySection {
            date,
            label: format_day_label(date)?,
            entries,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|section| section.label.as_str())
    }

    pub fn sections(&self) -> &[DaySection] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&DaySection> {
        self.sections.get(index)
    }

    pub fn index_of_label(&self, label: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.label == label)
    }

    pub fn total_entries(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.entries.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{ListData, LogEntry, format_day_label, parse_day_label};
    use crate::LogEntryId;
    use anyhow::Result;
    use time::{Date, Duration, Month};

    fn entry(id: i64, label: &str) -> LogEntry {
        LogEntry {
            id: LogEntryId::new(id),
            label: label.to_owned(),
            desc: format!("{label} details"),
        }
    }

    #[test]
    fn day_label_uses_padded_day_and_long_month() -> Result<()> {
        let date = Date::from_calendar_date(2024, Month::March, 5)?;
        assert_eq!(format_day_label(date)?, "05 March 2024");
        Ok(())
    }

    #[test]
    fn day_label_round_trips_across_leap_years() -> Result<()> {
        let mut date = Date::from_calendar_date(2023, Month::December, 25)?;
        let end = Date::from_calendar_date(2025, Month::March, 10)?;
        while date <= end {
            let label = format_day_label(date)?;
            assert_eq!(parse_day_label(&label)?, date, "label {label}");
            date += Duration::days(1);
        }
        Ok(())
    }

    #[test]
    fn parse_day_label_rejects_other_formats() {
        for raw in ["2024-03-05", "5 March", "05 march 2024", ""] {
            let error = parse_day_label(raw).expect_err("non-label input should fail");
            assert!(error.to_string().contains("parse day label"), "{raw}");
        }
    }

    #[test]
    fn list_keys_keep_insertion_order() -> Result<()> {
        let monday = Date::from_calendar_date(2024, Month::March, 4)?;
        let mut list = ListData::new();
        list.push_day(monday, vec![entry(1, "Run")])?;
        list.push_day(monday + Duration::days(1), Vec::new())?;

        let keys = list.keys().collect::<Vec<_>>();
        assert_eq!(keys, vec!["04 March 2024", "05 March 2024"]);
        assert_eq!(list.index_of_label("05 March 2024"), Some(1));
        assert_eq!(list.index_of_label("06 March 2024"), None);
        assert_eq!(list.sections()[0].entries.len(), 1);
        assert_eq!(list.total_entries(), 1);
        Ok(())
    }

    #[test]
    fn push_day_rejects_out_of_order_days() -> Result<()> {
        let day = Date::from_calendar_date(2024, Month::March, 4)?;
        let mut list = ListData::new();
        list.push_day(day, Vec::new())?;

        let error = list
            .push_day(day, Vec::new())
            .expect_err("duplicate day should fail");
        assert!(error.to_string().contains("strictly increasing"));
        assert_eq!(list.len(), 1);
        Ok(())
    }
}
