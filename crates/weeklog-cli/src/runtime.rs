// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{debug, warn};
use weeklog_app::{FetchRequest, ListData, LogEntry, WeekStart, week_window};
use weeklog_tui::{AppRuntime, InternalEvent};

const JOURNAL_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Provider of one week window of log entries.
pub trait LogSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn fetch_week(&self, date: Date) -> Result<ListData>;
}

/// Placeholder entries laid out by weekday position.
#[derive(Debug, Clone)]
pub struct StaticSource {
    week_start: WeekStart,
    latency: Duration,
}

impl StaticSource {
    pub fn new(week_start: WeekStart, latency: Duration) -> Self {
        Self {
            week_start,
            latency,
        }
    }
}

impl LogSource for StaticSource {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn fetch_week(&self, date: Date) -> Result<ListData> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        weeklog_app::static_list(date, self.week_start)
    }
}

/// JSON journal keyed by ISO date. Re-read on every fetch so edits show up on
/// the next week change.
#[derive(Debug, Clone)]
pub struct JournalSource {
    path: PathBuf,
    week_start: WeekStart,
}

impl JournalSource {
    pub fn new(path: impl Into<PathBuf>, week_start: WeekStart) -> Self {
        Self {
            path: path.into(),
            week_start,
        }
    }

    fn read_journal(&self) -> Result<BTreeMap<Date, Vec<LogEntry>>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read journal {}", self.path.display()))?;
        parse_journal(&raw).with_context(|| format!("parse journal {}", self.path.display()))
    }
}

impl LogSource for JournalSource {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn fetch_week(&self, date: Date) -> Result<ListData> {
        let mut journal = self.read_journal()?;
        let mut list = ListData::new();
        for day in week_window(date, self.week_start)? {
            list.push_day(day, journal.remove(&day).unwrap_or_default())?;
        }
        Ok(list)
    }
}

fn parse_journal(raw: &str) -> Result<BTreeMap<Date, Vec<LogEntry>>> {
    let by_key: BTreeMap<String, Vec<LogEntry>> =
        serde_json::from_str(raw).context("decode journal JSON")?;
    by_key
        .into_iter()
        .map(|(key, entries)| {
            let date = Date::parse(&key, JOURNAL_DATE_FORMAT)
                .with_context(|| format!("journal key {key:?} is not a YYYY-MM-DD date"))?;
            Ok((date, entries))
        })
        .collect()
}

/// Runs fetches from a [`LogSource`] on worker threads.
#[derive(Clone)]
pub struct SourceRuntime {
    source: Arc<dyn LogSource>,
}

impl SourceRuntime {
    pub fn new(source: impl LogSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

impl AppRuntime for SourceRuntime {
    fn fetch_week(&mut self, date: Date) -> Result<ListData> {
        self.source.fetch_week(date)
    }

    fn spawn_fetch_week(
        &mut self,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let source = Arc::clone(&self.source);
        thread::Builder::new()
            .name("weeklog-fetch".to_owned())
            .spawn(move || {
                let event = match source.fetch_week(request.date) {
                    Ok(list) => {
                        debug!(source = source.name(), date = %request.date, "week fetched");
                        InternalEvent::WeekLoaded {
                            request_id: request.request_id,
                            list,
                        }
                    }
                    Err(error) => {
                        warn!(
                            source = source.name(),
                            date = %request.date,
                            "week fetch failed: {error:#}"
                        );
                        InternalEvent::WeekLoadFailed {
                            request_id: request.request_id,
                            error: format!("{error:#}"),
                        }
                    }
                };
                let _ = tx.send(event);
            })
            .map_err(|error| anyhow!("spawn fetch worker: {error}"))?;
        Ok(())
    }
}
