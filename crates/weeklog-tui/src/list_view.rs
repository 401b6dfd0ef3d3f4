// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

use weeklog_app::{ListData, ScrollFailure, ViewToken, ViewabilityBatch};

/// Row estimate for sections that have not been laid out yet.
pub const DEFAULT_SECTION_ROWS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewabilityConfig {
    /// Percent of a section's rows that must be on screen.
    pub visible_threshold: u8,
    pub minimum_view_time: Duration,
    /// Hold back reports until the user has scrolled the list once.
    pub wait_for_interaction: bool,
}

impl Default for ViewabilityConfig {
    fn default() -> Self {
        Self {
            visible_threshold: 70,
            minimum_view_time: Duration::from_millis(100),
            wait_for_interaction: true,
        }
    }
}

/// Header, entries (or a placeholder line), and a separator.
pub fn section_rows(entries: usize) -> usize {
    2 + entries.max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    indices: Vec<usize>,
    since: Duration,
}

/// Row-based scroll model over the day sections of the log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionListView {
    keys: Vec<String>,
    heights: Vec<usize>,
    measured: usize,
    offset: usize,
    viewport: usize,
    config: ViewabilityConfig,
    interacted: bool,
    candidate: Option<Candidate>,
    reported: Vec<usize>,
}

impl SectionListView {
    pub fn new(config: ViewabilityConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replaces every section. Layout must run again before sections can be
    /// targeted by index.
    pub fn set_sections(&mut self, list: &ListData) {
        self.keys = list.keys().map(str::to_owned).collect();
        self.heights = list
            .sections()
            .iter()
            .map(|section| section_rows(section.entries.len()))
            .collect();
        self.measured = 0;
        self.offset = 0;
        self.candidate = None;
        self.reported.clear();
    }

    /// Records the viewport height and measures every section that starts
    /// within one screen past the bottom edge.
    pub fn layout(&mut self, viewport: usize) {
        self.viewport = viewport;
        let horizon = self.offset + viewport.saturating_mul(2);
        let mut start = 0;
        let mut reached = 0;
        for (index, height) in self.heights.iter().enumerate() {
            if start > horizon {
                break;
            }
            reached = index + 1;
            start += height;
        }
        self.measured = self.measured.max(reached);
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    pub fn measured(&self) -> usize {
        self.measured
    }

    pub fn total_rows(&self) -> usize {
        self.heights.iter().sum()
    }

    pub fn max_offset(&self) -> usize {
        self.total_rows().saturating_sub(self.viewport)
    }

    pub fn section_start(&self, index: usize) -> usize {
        self.heights.iter().take(index).sum()
    }

    pub fn average_item_length(&self) -> f64 {
        if self.measured == 0 {
            return DEFAULT_SECTION_ROWS;
        }
        let rows: usize = self.heights.iter().take(self.measured).sum();
        rows as f64 / self.measured as f64
    }

    /// Puts the section at the top of the viewport. Fails for sections that
    /// have not been measured yet.
    pub fn scroll_to_index(&mut self, index: usize) -> Result<(), ScrollFailure> {
        if self.keys.is_empty() {
            return Ok(());
        }
        let index = index.min(self.keys.len() - 1);
        if index >= self.measured {
            return Err(ScrollFailure {
                index,
                average_item_length: self.average_item_length(),
            });
        }
        self.offset = self.section_start(index).min(self.max_offset());
        Ok(())
    }

    pub fn scroll_to_offset(&mut self, offset: f64) {
        let rows = if offset.is_finite() && offset > 0.0 {
            offset.round() as usize
        } else {
            0
        };
        self.offset = rows.min(self.max_offset());
    }

    /// User scrolling. Returns whether the offset moved.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        self.interacted = true;
        let next = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset());
        let moved = next != self.offset;
        self.offset = next;
        moved
    }

    /// Sections meeting the visibility threshold, in index order. A section
    /// taller than the viewport counts once it fills the viewport.
    pub fn viewable_indices(&self) -> Vec<usize> {
        if self.viewport == 0 {
            return Vec::new();
        }
        let top = self.offset;
        let bottom = self.offset + self.viewport;
        let threshold = usize::from(self.config.visible_threshold);

        let mut viewable = Vec::new();
        let mut start = 0;
        for (index, height) in self.heights.iter().copied().enumerate() {
            let end = start + height;
            let visible = end.min(bottom).saturating_sub(start.max(top));
            if height > 0
                && (visible * 100 >= threshold * height || visible >= self.viewport)
            {
                viewable.push(index);
            }
            start = end;
        }
        viewable
    }

    /// Reports a new viewable set once it has held steady for the minimum
    /// view time.
    pub fn poll_viewability(&mut self, now: Duration) -> Option<ViewabilityBatch> {
        let current = self.viewable_indices();
        match &self.candidate {
            Some(candidate) if candidate.indices == current => {}
            _ => {
                self.candidate = Some(Candidate {
                    indices: current,
                    since: now,
                });
            }
        }

        if self.config.wait_for_interaction && !self.interacted {
            return None;
        }
        let candidate = self.candidate.as_ref()?;
        if candidate.indices == self.reported
            || now.saturating_sub(candidate.since) < self.config.minimum_view_time
        {
            return None;
        }

        let indices = candidate.indices.clone();
        let mut changed = indices
            .iter()
            .filter(|index| !self.reported.contains(index))
            .map(|index| self.token(*index, true))
            .chain(
                self.reported
                    .iter()
                    .filter(|index| !indices.contains(index))
                    .map(|index| self.token(*index, false)),
            )
            .collect::<Vec<_>>();
        changed.sort_by_key(|token| token.index);

        let viewable = indices
            .iter()
            .map(|index| self.token(*index, true))
            .collect();
        self.reported = indices;
        Some(ViewabilityBatch { viewable, changed })
    }

    fn token(&self, index: usize, is_viewable: bool) -> ViewToken {
        ViewToken {
            key: self.keys.get(index).cloned().unwrap_or_default(),
            index,
            is_viewable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SECTION_ROWS, SectionListView, ViewabilityConfig, section_rows};
    use anyhow::Result;
    use std::time::Duration;
    use weeklog_app::{ScrollFailure, WeekStart, static_list};
    use weeklog_testkit::{LogFaker, fixture_monday};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn view_for_week() -> Result<SectionListView> {
        let mut view = SectionListView::new(ViewabilityConfig::default());
        view.set_sections(&static_list(fixture_monday(), WeekStart::Monday)?);
        Ok(view)
    }

    #[test]
    fn section_rows_reserve_a_placeholder_line() {
        assert_eq!(section_rows(0), 3);
        assert_eq!(section_rows(1), 3);
        assert_eq!(section_rows(4), 6);
    }

    #[test]
    fn scroll_to_index_fails_before_layout() -> Result<()> {
        let mut view = view_for_week()?;
        assert_eq!(
            view.scroll_to_index(5),
            Err(ScrollFailure {
                index: 5,
                average_item_length: DEFAULT_SECTION_ROWS,
            })
        );

        view.layout(12);
        assert!(view.scroll_to_index(2).is_ok());
        assert_eq!(view.offset(), view.section_start(2));
        Ok(())
    }

    #[test]
    fn layout_measures_one_screen_ahead() -> Result<()> {
        let mut view = view_for_week()?;
        view.layout(4);
        assert!(view.measured() < view.len());
        let failure = view.scroll_to_index(6).expect_err("section 6 is not measured");
        assert_eq!(failure.index, 6);
        assert!(failure.average_item_length > 0.0);

        view.scroll_to_offset(failure.average_item_length * 6.0);
        view.layout(4);
        assert!(view.scroll_to_index(6).is_ok());
        Ok(())
    }

    #[test]
    fn offsets_are_clamped() -> Result<()> {
        let mut view = view_for_week()?;
        view.layout(10);
        view.scroll_to_offset(10_000.0);
        assert_eq!(view.offset(), view.max_offset());
        view.scroll_to_offset(-5.0);
        assert_eq!(view.offset(), 0);
        assert!(!view.scroll_by(-3));
        assert!(view.scroll_by(3));
        assert_eq!(view.offset(), 3);
        Ok(())
    }

    #[test]
    fn viewability_waits_for_interaction_and_minimum_view_time() -> Result<()> {
        let mut view = view_for_week()?;
        view.layout(10);
        assert!(view.poll_viewability(ms(0)).is_none());
        assert!(view.poll_viewability(ms(500)).is_none());

        let thursday_start = view.section_start(3);
        view.scroll_by(thursday_start as isize);
        assert!(view.poll_viewability(ms(1000)).is_none());
        assert!(view.poll_viewability(ms(1099)).is_none());

        let batch = view.poll_viewability(ms(1100)).expect("settled batch");
        assert_eq!(batch.viewable[0].index, 3);
        assert_eq!(batch.viewable[0].key, "07 March 2024");
        assert!(batch.changed.iter().all(|token| token.is_viewable));

        assert!(view.poll_viewability(ms(2000)).is_none());
        Ok(())
    }

    #[test]
    fn viewability_reports_sections_that_left() -> Result<()> {
        let mut view = view_for_week()?;
        view.layout(10);
        view.scroll_by(0);
        let first = view.poll_viewability(ms(0));
        assert!(first.is_none());
        let first = view.poll_viewability(ms(100)).expect("initial batch");
        assert_eq!(first.viewable[0].index, 0);

        view.scroll_by(view.section_start(4) as isize);
        view.poll_viewability(ms(200));
        let second = view.poll_viewability(ms(300)).expect("batch after scroll");
        assert!(
            second
                .changed
                .iter()
                .any(|token| token.index == 0 && !token.is_viewable)
        );
        assert!(second.viewable.iter().all(|token| token.index >= 4));
        Ok(())
    }

    #[test]
    fn generated_weeks_scroll_to_every_section_once_measured() -> Result<()> {
        for seed in 1..=8 {
            let list = LogFaker::new(seed).week(fixture_monday(), WeekStart::Monday, 6)?;
            let mut view = SectionListView::new(ViewabilityConfig::default());
            view.set_sections(&list);
            let expected: usize = list
                .sections()
                .iter()
                .map(|section| section_rows(section.entries.len()))
                .sum();
            assert_eq!(view.total_rows(), expected);

            view.layout(expected);
            view.layout(3);
            assert_eq!(view.measured(), view.len());
            for index in 0..view.len() {
                assert!(view.scroll_to_index(index).is_ok(), "seed {seed} index {index}");
                assert_eq!(
                    view.offset(),
                    view.section_start(index).min(view.max_offset())
                );
            }
        }
        Ok(())
    }

    #[test]
    fn sections_taller_than_the_viewport_count_when_filling_it() -> Result<()> {
        let mut view = view_for_week()?;
        view.layout(2);
        let wednesday_start = view.section_start(2);
        view.scroll_to_offset(wednesday_start as f64 + 1.0);
        assert_eq!(view.viewable_indices(), vec![2]);
        Ok(())
    }
}
