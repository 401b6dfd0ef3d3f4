// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod list_view;

pub use list_view::{DEFAULT_SECTION_ROWS, SectionListView, ViewabilityConfig, section_rows};

use anyhow::{Context, Result, anyhow};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, UtcOffset};
use tracing::{debug, info};
use weeklog_app::{
    CalendarSelection, DelayedTasks, FetchRequest, FetchRequestId, ListData, SyncController,
    SyncEffect, SyncTimings, WeekStart, format_day_label, jump_to, step_day, step_week,
    today_at, week_window,
};

const MONTH_TITLE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:long] [year]");
const FRAME_INTERVAL: Duration = Duration::from_millis(40);
const MOUSE_SCROLL_ROWS: isize = 3;
const NO_DATA_TEXT: &str = "No data found.";

/// Source of the week windows shown in the log.
pub trait AppRuntime {
    fn fetch_week(&mut self, date: Date) -> Result<ListData>;

    /// Starts a fetch whose outcome arrives later on `tx`. The default runs the
    /// fetch inline; runtimes with slow sources move it to a worker thread.
    fn spawn_fetch_week(
        &mut self,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let event = match self.fetch_week(request.date) {
            Ok(list) => InternalEvent::WeekLoaded {
                request_id: request.request_id,
                list,
            },
            Err(error) => InternalEvent::WeekLoadFailed {
                request_id: request.request_id,
                error: format!("{error:#}"),
            },
        };
        tx.send(event)
            .map_err(|_| anyhow!("week event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    WeekLoaded {
        request_id: FetchRequestId,
        list: ListData,
    },
    WeekLoadFailed {
        request_id: FetchRequestId,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub week_start: WeekStart,
    pub timings: SyncTimings,
    pub viewability: ViewabilityConfig,
    /// Scroll input quiet time after which momentum counts as finished.
    pub momentum_settle: Duration,
    pub status_ttl: Duration,
    /// Offset used to resolve "today" for the jump key.
    pub utc_offset: UtcOffset,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Monday,
            timings: SyncTimings::default(),
            viewability: ViewabilityConfig::default(),
            momentum_settle: Duration::from_millis(250),
            status_ttl: Duration::from_secs(4),
            utc_offset: UtcOffset::UTC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiTask {
    MomentumEnd,
}

#[derive(Debug, Clone, PartialEq)]
struct Session {
    controller: SyncController,
    list_view: SectionListView,
    ui_tasks: DelayedTasks<UiTask, ()>,
    options: UiOptions,
    scrolling: bool,
    status_line: Option<String>,
    status_token: u64,
    help_visible: bool,
}

impl Session {
    fn new(selected_date: Date, options: UiOptions) -> Self {
        Self {
            controller: SyncController::new(selected_date, options.timings),
            list_view: SectionListView::new(options.viewability),
            ui_tasks: DelayedTasks::new(),
            options,
            scrolling: false,
            status_line: None,
            status_token: 0,
            help_visible: false,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    start_date: Date,
    options: UiOptions,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let started = Instant::now();
    let mut session = Session::new(start_date, options);
    let (internal_tx, internal_rx) = mpsc::channel();

    let effects = session.controller.on_initial_load();
    apply_effects(
        &mut session,
        runtime,
        &internal_tx,
        effects,
        started.elapsed(),
    );

    let mut result = Ok(());
    loop {
        step(
            &mut session,
            runtime,
            &internal_tx,
            &internal_rx,
            started.elapsed(),
        );

        if let Err(error) = terminal.draw(|frame| render(frame, &mut session)) {
            result = Err(error).context("draw frame");
            break;
        }

        let timeout = poll_timeout(&session, started.elapsed());
        let has_event = match event::poll(timeout).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }

        let now = started.elapsed();
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(&mut session, runtime, &internal_tx, key, now) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                handle_mouse_event(&mut session, runtime, &internal_tx, mouse, now);
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        terminal::LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leave alternate screen")?;
    result
}

/// One loop iteration minus drawing and input.
fn step<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
    now: Duration,
) {
    process_internal_events(session, runtime, tx, rx, now);

    let effects = session.controller.tick(now);
    apply_effects(session, runtime, tx, effects, now);

    for (task, ()) in session.ui_tasks.take_due(now) {
        match task {
            UiTask::MomentumEnd => {
                session.scrolling = false;
                let effects = session.controller.on_momentum_scroll_end();
                apply_effects(session, runtime, tx, effects, now);
            }
        }
    }

    if let Some(batch) = session.list_view.poll_viewability(now) {
        debug!(
            viewable = batch.viewable.len(),
            changed = batch.changed.len(),
            "viewable sections changed"
        );
        session.controller.on_viewable_items_changed(batch, now);
    }
}

/// Wakes for the next delayed task, waiting at most one frame.
fn poll_timeout(session: &Session, now: Duration) -> Duration {
    [session.controller.next_due(), session.ui_tasks.next_due()]
        .into_iter()
        .flatten()
        .map(|due| due.saturating_sub(now))
        .fold(FRAME_INTERVAL, Duration::min)
}

fn process_internal_events<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
    now: Duration,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == session.status_token => {
                session.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::WeekLoaded { request_id, list } => {
                let effects = session.controller.on_week_loaded(request_id, list, now);
                apply_effects(session, runtime, tx, effects, now);
            }
            InternalEvent::WeekLoadFailed { request_id, error } => {
                let effects = session.controller.on_week_load_failed(request_id, error);
                apply_effects(session, runtime, tx, effects, now);
            }
        }
    }
}

fn apply_effects<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    effects: Vec<SyncEffect>,
    now: Duration,
) {
    let mut queue = VecDeque::from(effects);
    while let Some(effect) = queue.pop_front() {
        match effect {
            SyncEffect::SelectedDateChanged(_) | SyncEffect::ModeChanged(_) => {}
            SyncEffect::FetchWeek(request) => {
                if let Err(error) = runtime.spawn_fetch_week(request, tx.clone()) {
                    queue.extend(
                        session
                            .controller
                            .on_week_load_failed(request.request_id, format!("{error:#}")),
                    );
                }
            }
            SyncEffect::ListReplaced => {
                session.list_view.set_sections(session.controller.list());
            }
            SyncEffect::ScrollToIndex(index) => {
                if let Err(failure) = session.list_view.scroll_to_index(index) {
                    queue.extend(session.controller.on_scroll_to_index_failed(failure, now));
                }
            }
            SyncEffect::ScrollToOffset(offset) => {
                session.list_view.scroll_to_offset(offset);
            }
            SyncEffect::LoadFailed(error) => {
                info!(%error, "showing load failure");
                emit_status(session, tx, format!("load failed: {error}"));
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, ttl: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(ttl);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    session: &mut Session,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    session.status_line = Some(message.into());
    session.status_token = session.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, session.status_token, session.options.status_ttl);
}

fn handle_key_event<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Duration,
) -> bool {
    if session.help_visible {
        session.help_visible = false;
        return false;
    }

    let selected = session.controller.selected_date();
    let week_start = session.options.week_start;
    let half_page = (session.list_view.viewport() / 2).max(1) as isize;

    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
        (KeyCode::Char('d'), KeyModifiers::CONTROL) | (KeyCode::PageDown, _) => {
            scroll_list(session, runtime, internal_tx, half_page, now);
        }
        (KeyCode::Char('u'), KeyModifiers::CONTROL) | (KeyCode::PageUp, _) => {
            scroll_list(session, runtime, internal_tx, -half_page, now);
        }
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return true,
        (KeyCode::Char('?'), _) => {
            session.help_visible = true;
        }
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => {
            let selection = step_day(selected, -1, week_start);
            press_day(session, runtime, internal_tx, selection, now);
        }
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => {
            let selection = step_day(selected, 1, week_start);
            press_day(session, runtime, internal_tx, selection, now);
        }
        (KeyCode::Char('H'), _) | (KeyCode::Char('['), _) => {
            press_day(session, runtime, internal_tx, step_week(selected, -1), now);
        }
        (KeyCode::Char('L'), _) | (KeyCode::Char(']'), _) => {
            press_day(session, runtime, internal_tx, step_week(selected, 1), now);
        }
        (KeyCode::Char('t'), _) => {
            let today = today_at(session.options.utc_offset);
            let selection = jump_to(selected, today, week_start);
            press_day(session, runtime, internal_tx, Some(selection), now);
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => {
            scroll_list(session, runtime, internal_tx, 1, now);
        }
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
            scroll_list(session, runtime, internal_tx, -1, now);
        }
        _ => {}
    }
    false
}

fn handle_mouse_event<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
    now: Duration,
) {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            scroll_list(session, runtime, internal_tx, MOUSE_SCROLL_ROWS, now);
        }
        MouseEventKind::ScrollUp => {
            scroll_list(session, runtime, internal_tx, -MOUSE_SCROLL_ROWS, now);
        }
        _ => {}
    }
}

fn press_day<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    selection: Option<CalendarSelection>,
    now: Duration,
) {
    let Some(selection) = selection else {
        emit_status(session, internal_tx, "date out of range");
        return;
    };
    // A press closes any scroll burst so the next scroll input is a new drag.
    session.scrolling = false;
    session.ui_tasks.cancel_key(UiTask::MomentumEnd);
    let effects = session
        .controller
        .on_calendar_day_press(selection.date, selection.event, now);
    apply_effects(session, runtime, internal_tx, effects, now);
}

/// User scroll: the first input of a burst begins a drag, and the burst ends
/// once input has been quiet for the momentum settle time.
fn scroll_list<R: AppRuntime>(
    session: &mut Session,
    runtime: &mut R,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
    now: Duration,
) {
    if !session.scrolling {
        session.scrolling = true;
        let effects = session.controller.on_scroll_begin_drag();
        apply_effects(session, runtime, internal_tx, effects, now);
    }
    session.list_view.scroll_by(delta);
    session
        .ui_tasks
        .schedule(UiTask::MomentumEnd, (), now, session.options.momentum_settle);
}

fn render(frame: &mut ratatui::Frame<'_>, session: &mut Session) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = session.controller.selected_date();
    let strip = Paragraph::new(week_strip_line(selected, session.options.week_start)).block(
        Block::default()
            .title(format!("weeklog | {}", month_title(selected)))
            .borders(Borders::ALL),
    );
    frame.render_widget(strip, layout[0]);

    let list_area = layout[1];
    session
        .list_view
        .layout(usize::from(list_area.height.saturating_sub(2)));
    let width = usize::from(list_area.width.saturating_sub(2));
    let lines = section_lines(
        session.controller.list(),
        selected,
        session.controller.is_loading(),
        width,
    );
    let scroll = u16::try_from(session.list_view.offset()).unwrap_or(u16::MAX);
    let list = Paragraph::new(lines)
        .block(Block::default().title("log").borders(Borders::ALL))
        .scroll((scroll, 0));
    frame.render_widget(list, list_area);

    let status_widget = Paragraph::new(status_text(session))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if session.help_visible {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn month_title(date: Date) -> String {
    date.format(MONTH_TITLE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

fn week_strip_line(selected: Date, week_start: WeekStart) -> Line<'static> {
    let Ok(days) = week_window(selected, week_start) else {
        return Line::from(selected.to_string());
    };

    let mut spans = Vec::with_capacity(days.len() * 2);
    for day in days {
        let weekday = day.weekday().to_string();
        let text = format!(" {} {:02} ", &weekday[..3], day.day());
        let style = if day == selected {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(text, style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

/// Rows of the log, laid out exactly as [`section_rows`] counts them.
fn section_lines(
    list: &ListData,
    selected: Date,
    loading: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for section in list.sections() {
        let header_style = if section.date == selected {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::styled(section.label.clone(), header_style));

        if section.entries.is_empty() {
            let placeholder = if loading { "" } else { NO_DATA_TEXT };
            lines.push(Line::styled(
                format!("  {placeholder}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        for entry in &section.entries {
            let label = format!("  {}", entry.label);
            let room = width.saturating_sub(label.chars().count() + 3).max(1);
            lines.push(Line::from(vec![
                Span::raw(label),
                Span::raw("   "),
                Span::styled(
                    truncate_label(&entry.desc, room),
                    Style::default().fg(Color::Gray),
                ),
            ]));
        }
        lines.push(Line::raw(""));
    }
    lines
}

fn status_text(session: &Session) -> String {
    if session.help_visible {
        return String::new();
    }

    let selected = session.controller.selected_date();
    let label = format_day_label(selected).unwrap_or_else(|_| selected.to_string());
    let mode = session.controller.mode().as_str();
    let loading = if session.controller.is_loading() {
        " | loading"
    } else {
        ""
    };
    let hints = "h/l day | H/L week | t today | j/k scroll | ? help | q quit";
    match &session.status_line {
        Some(status) => format!("{label} | {mode}{loading} | {status} | {hints}"),
        None => format!("{label} | {mode}{loading} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "calendar: h/l or left/right day | H/L or [/] week | t today\n\
log: j/k or up/down row | ctrl+d/u or pgdn/pgup half page | mouse wheel\n\
global: ? help | q/esc/ctrl+c quit\n\
help: any key close"
}

fn truncate_label(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
