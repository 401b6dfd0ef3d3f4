// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

use time::Date;
use tracing::{debug, warn};

use crate::{
    CalendarEvent, DelayedTasks, FetchRequestId, ListData, format_day_label, parse_day_label,
};

/// Who is driving the selected date right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    /// A calendar selection set the date; list viewability must not override it.
    DayPressed,
    ScrollStart,
    ScrollEnd,
}

impl InteractionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DayPressed => "day pressed",
            Self::ScrollStart => "scrolling",
            Self::ScrollEnd => "idle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub debounce: Duration,
    pub press_scroll_delay: Duration,
    pub fetch_scroll_delay: Duration,
    pub retry_delay: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1300),
            press_scroll_delay: Duration::from_millis(400),
            fetch_scroll_delay: Duration::from_millis(600),
            retry_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewToken {
    pub key: String,
    pub index: usize,
    pub is_viewable: bool,
}

/// One viewability report from the list: the currently viewable items in index
/// order plus the items whose viewability flipped since the previous report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewabilityBatch {
    pub viewable: Vec<ViewToken>,
    pub changed: Vec<ViewToken>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollFailure {
    pub index: usize,
    pub average_item_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub request_id: FetchRequestId,
    pub date: Date,
}

/// Side effects the host applies after each controller call.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEffect {
    SelectedDateChanged(Date),
    ModeChanged(InteractionMode),
    FetchWeek(FetchRequest),
    ListReplaced,
    ScrollToIndex(usize),
    ScrollToOffset(f64),
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTask {
    ScrollAfterFetch,
    ScrollAfterPress,
    ScrollRetry,
    ViewabilityDebounce,
}

impl SyncTask {
    const SCROLLS: [Self; 3] = [Self::ScrollAfterFetch, Self::ScrollAfterPress, Self::ScrollRetry];
}

#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    ScrollToIndex(usize),
    Viewability(ViewabilityBatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOrigin {
    Load,
    DayPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightFetch {
    request_id: FetchRequestId,
    origin: FetchOrigin,
}

/// Keeps the calendar's selected date and the log list's scroll position in
/// step.
///
/// Every input is a method call carrying the current elapsed time; every call
/// returns the effects the host must apply, in order. Delayed work lives in a
/// [`DelayedTasks`] queue that the host drains through [`SyncController::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncController {
    mode: InteractionMode,
    selected_date: Date,
    list: ListData,
    timings: SyncTimings,
    tasks: DelayedTasks<SyncTask, Deferred>,
    last_request_id: FetchRequestId,
    in_flight: Option<InFlightFetch>,
}

impl SyncController {
    pub fn new(selected_date: Date, timings: SyncTimings) -> Self {
        Self {
            mode: InteractionMode::ScrollEnd,
            selected_date,
            list: ListData::default(),
            timings,
            tasks: DelayedTasks::new(),
            last_request_id: FetchRequestId::new(0),
            in_flight: None,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn selected_date(&self) -> Date {
        self.selected_date
    }

    pub fn list(&self) -> &ListData {
        &self.list
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_task_pending(&self, task: SyncTask) -> bool {
        self.tasks.is_pending(task)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.tasks.next_due()
    }

    /// Fetches the week around the current selection.
    pub fn on_initial_load(&mut self) -> Vec<SyncEffect> {
        vec![self.issue_fetch(self.selected_date, FetchOrigin::Load)]
    }

    pub fn on_calendar_day_press(
        &mut self,
        date: Date,
        event: CalendarEvent,
        now: Duration,
    ) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        self.set_mode(InteractionMode::DayPressed, &mut effects);
        self.set_selected_date(date, &mut effects);

        if event == CalendarEvent::WeekChange {
            self.cancel_scrolls();
            effects.push(self.issue_fetch(date, FetchOrigin::DayPress));
            return effects;
        }

        if let Some(in_flight) = self.in_flight.as_mut() {
            // The list is about to be replaced; scroll once the new week lands.
            in_flight.origin = FetchOrigin::DayPress;
            self.cancel_scrolls();
            return effects;
        }

        let index = self.target_index(date);
        self.schedule_scroll(
            SyncTask::ScrollAfterPress,
            index,
            now,
            self.timings.press_scroll_delay,
        );
        effects
    }

    pub fn on_week_loaded(
        &mut self,
        request_id: FetchRequestId,
        list: ListData,
        now: Duration,
    ) -> Vec<SyncEffect> {
        let Some(in_flight) = self.take_in_flight(request_id) else {
            return Vec::new();
        };

        self.list = list;
        let index = self.target_index(self.selected_date);
        let (task, delay) = match in_flight.origin {
            FetchOrigin::Load => (SyncTask::ScrollAfterFetch, self.timings.fetch_scroll_delay),
            FetchOrigin::DayPress => (SyncTask::ScrollAfterPress, self.timings.press_scroll_delay),
        };
        self.schedule_scroll(task, index, now, delay);
        debug!(
            request_id = request_id.get(),
            days = self.list.len(),
            entries = self.list.total_entries(),
            "week applied"
        );
        vec![SyncEffect::ListReplaced]
    }

    pub fn on_week_load_failed(
        &mut self,
        request_id: FetchRequestId,
        error: impl Into<String>,
    ) -> Vec<SyncEffect> {
        if self.take_in_flight(request_id).is_none() {
            return Vec::new();
        }

        let error = error.into();
        warn!(request_id = request_id.get(), %error, "week fetch failed");
        vec![SyncEffect::LoadFailed(error)]
    }

    /// Recovers from a scroll to an item the list has not measured yet: jump to
    /// an estimated offset now, retry the precise scroll shortly after.
    pub fn on_scroll_to_index_failed(
        &mut self,
        failure: ScrollFailure,
        now: Duration,
    ) -> Vec<SyncEffect> {
        let offset = failure.average_item_length * failure.index as f64;
        debug!(
            index = failure.index,
            average = failure.average_item_length,
            offset,
            "scroll to index failed; retrying"
        );
        self.tasks.schedule(
            SyncTask::ScrollRetry,
            Deferred::ScrollToIndex(failure.index),
            now,
            self.timings.retry_delay,
        );
        vec![SyncEffect::ScrollToOffset(offset)]
    }

    pub fn on_viewable_items_changed(&mut self, batch: ViewabilityBatch, now: Duration) {
        self.tasks.schedule(
            SyncTask::ViewabilityDebounce,
            Deferred::Viewability(batch),
            now,
            self.timings.debounce,
        );
    }

    // A drag is always user intent, so it also ends a pending day press and
    // drops the scroll that press queued.
    pub fn on_scroll_begin_drag(&mut self) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        self.cancel_scrolls();
        self.set_mode(InteractionMode::ScrollStart, &mut effects);
        effects
    }

    pub fn on_momentum_scroll_end(&mut self) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        if self.mode != InteractionMode::DayPressed {
            self.set_mode(InteractionMode::ScrollEnd, &mut effects);
        }
        effects
    }

    /// Runs every delayed task due at `now`.
    pub fn tick(&mut self, now: Duration) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        for (task, deferred) in self.tasks.take_due(now) {
            match deferred {
                Deferred::ScrollToIndex(index) => {
                    debug!(?task, index, "scroll to index");
                    effects.push(SyncEffect::ScrollToIndex(index));
                }
                Deferred::Viewability(batch) => {
                    self.apply_viewability(&batch, &mut effects);
                }
            }
        }
        effects
    }

    fn apply_viewability(&mut self, batch: &ViewabilityBatch, effects: &mut Vec<SyncEffect>) {
        if self.mode == InteractionMode::DayPressed {
            debug!("viewability ignored after day press");
            return;
        }
        if batch.changed.is_empty() {
            return;
        }
        let Some(first) = batch.viewable.first() else {
            return;
        };

        match parse_day_label(&first.key) {
            Ok(date) => self.set_selected_date(date, effects),
            Err(error) => warn!(key = %first.key, "viewable key is not a day label: {error:#}"),
        }
    }

    fn issue_fetch(&mut self, date: Date, origin: FetchOrigin) -> SyncEffect {
        self.last_request_id = self.last_request_id.next();
        if let Some(previous) = self.in_flight {
            debug!(
                superseded = previous.request_id.get(),
                "week fetch superseded"
            );
        }
        self.in_flight = Some(InFlightFetch {
            request_id: self.last_request_id,
            origin,
        });
        SyncEffect::FetchWeek(FetchRequest {
            request_id: self.last_request_id,
            date,
        })
    }

    fn take_in_flight(&mut self, request_id: FetchRequestId) -> Option<InFlightFetch> {
        match self.in_flight {
            Some(in_flight) if in_flight.request_id == request_id => self.in_flight.take(),
            _ => {
                debug!(
                    request_id = request_id.get(),
                    latest = self.last_request_id.get(),
                    "stale week response dropped"
                );
                None
            }
        }
    }

    /// Exact label match against the list keys, falling back to the top.
    fn target_index(&self, date: Date) -> usize {
        match format_day_label(date) {
            Ok(label) => self.list.index_of_label(&label).unwrap_or(0),
            Err(error) => {
                warn!(%date, "cannot label selected date: {error:#}");
                0
            }
        }
    }

    // Only the newest scroll request may run; older ones would fight it.
    fn schedule_scroll(&mut self, task: SyncTask, index: usize, now: Duration, delay: Duration) {
        self.cancel_scrolls();
        self.tasks
            .schedule(task, Deferred::ScrollToIndex(index), now, delay);
    }

    fn cancel_scrolls(&mut self) {
        for task in SyncTask::SCROLLS {
            self.tasks.cancel_key(task);
        }
    }

    fn set_mode(&mut self, mode: InteractionMode, effects: &mut Vec<SyncEffect>) {
        if self.mode != mode {
            debug!(from = self.mode.as_str(), to = mode.as_str(), "interaction mode");
            self.mode = mode;
            effects.push(SyncEffect::ModeChanged(mode));
        }
    }

    fn set_selected_date(&mut self, date: Date, effects: &mut Vec<SyncEffect>) {
        if self.selected_date != date {
            self.selected_date = date;
            effects.push(SyncEffect::SelectedDateChanged(date));
        }
    }
}
