// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use time::{Date, Month};
use weeklog_app::{ListData, LogEntry, LogEntryId, WeekStart, week_window};

const ACTIVITIES: [&str; 14] = [
    "Morning run",
    "Standup",
    "Code review",
    "Groceries",
    "Gym",
    "Reading",
    "Cooking",
    "Call with family",
    "Laundry",
    "Cycling",
    "Doctor visit",
    "Meditation",
    "Budget review",
    "Garden work",
];

const DETAILS: [&str; 12] = [
    "Took longer than planned",
    "Quick and easy",
    "Rescheduled from yesterday",
    "Felt great afterwards",
    "Needs a follow-up next week",
    "Done before breakfast",
    "With a friend",
    "Skipped the last part",
    "Tried a new route",
    "Notes saved to the shared folder",
    "Short on time, kept it brief",
    "Finished early",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible log entries.
#[derive(Debug, Clone)]
pub struct LogFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl LogFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn entry(&mut self) -> LogEntry {
        let id = LogEntryId::new(self.next_id);
        self.next_id += 1;
        LogEntry {
            id,
            label: self.pick(&ACTIVITIES).to_owned(),
            desc: self.pick(&DETAILS).to_owned(),
        }
    }

    /// Between zero and `max` entries.
    pub fn day(&mut self, max: usize) -> Vec<LogEntry> {
        let count = self.rng.int_n(max + 1);
        (0..count).map(|_| self.entry()).collect()
    }

    pub fn week(&mut self, date: Date, week_start: WeekStart, max: usize) -> Result<ListData> {
        let mut list = ListData::new();
        for day in week_window(date, week_start)? {
            let entries = self.day(max);
            list.push_day(day, entries)?;
        }
        Ok(list)
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// Monday 4 March 2024.
pub fn fixture_monday() -> Date {
    Date::from_calendar_date(2024, Month::March, 4).unwrap_or(Date::MIN)
}

pub fn temp_journal_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("journal.json");
    Ok((dir, path))
}
