//! Page cursor for one filter generation.
//!
//! Pages advance sequentially from a (possibly random) start page. Past the
//! `max_page` hint the cursor wraps once to page 1 when the start was above 1,
//! and is exhausted when it comes back around to the start page. A committed
//! page is only recorded on a successful fetch, so a failed page is retried.

use hunger_core::PageCursor;

/// Next page to request, and whether requesting it wraps the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStep {
    pub page: u32,
    pub wraps: bool,
}

#[derive(Debug, Clone)]
pub struct FetchCursor {
    page: PageCursor,
    start_page: u32,
    /// Whether `page.page_number` has been fetched (vs. only planned).
    started: bool,
    wrapped: bool,
    exhausted: bool,
    empty_streak: u32,
    max_empty_page_skips: u32,
}

impl FetchCursor {
    pub fn new(start_page: u32, page_size: u32, max_page: u32, max_empty_page_skips: u32) -> Self {
        let page = PageCursor::new(start_page, page_size, max_page);
        Self {
            start_page: page.page_number,
            page,
            started: false,
            wrapped: false,
            exhausted: false,
            empty_streak: 0,
            max_empty_page_skips,
        }
    }

    pub fn page(&self) -> PageCursor {
        self.page
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The page the next fetch should request, `None` once exhausted.
    pub fn next_step(&self) -> Option<PageStep> {
        if self.exhausted {
            return None;
        }
        if !self.started {
            return Some(PageStep {
                page: self.page.page_number,
                wraps: false,
            });
        }

        let candidate = self.page.page_number.saturating_add(1);
        if self.wrapped {
            (candidate < self.start_page && candidate <= self.page.max_page).then_some(PageStep {
                page: candidate,
                wraps: false,
            })
        } else if candidate <= self.page.max_page {
            Some(PageStep {
                page: candidate,
                wraps: false,
            })
        } else if self.start_page > 1 {
            Some(PageStep {
                page: 1,
                wraps: true,
            })
        } else {
            None
        }
    }

    /// Record a successful fetch of `step`.
    ///
    /// `reported_page_size` only feeds the `max_page` calculation; requests
    /// keep the configured size. `appended` is the number of new items the
    /// page contributed. Pages that add nothing count toward the empty-page
    /// bound.
    pub fn commit(
        &mut self,
        step: PageStep,
        total_count: u64,
        reported_page_size: u32,
        appended: usize,
    ) {
        self.page.page_number = step.page;
        self.started = true;
        if step.wraps {
            self.wrapped = true;
        }
        let page_size = if reported_page_size > 0 {
            reported_page_size
        } else {
            self.page.page_size
        };
        self.page.max_page = PageCursor::max_page_for(total_count, page_size);

        if appended == 0 {
            self.empty_streak += 1;
            if self.empty_streak > self.max_empty_page_skips {
                self.exhausted = true;
                return;
            }
        } else {
            self.empty_streak = 0;
        }

        if self.next_step().is_none() {
            self.exhausted = true;
        }
    }

    /// Pages not yet fetched in this cycle, as an estimate.
    pub fn remaining_pages(&self) -> u32 {
        if self.exhausted {
            return 0;
        }
        let max_page = self.page.max_page;
        let current = self.page.page_number;
        let fetched_current = u32::from(self.started);
        if self.wrapped {
            self.start_page
                .min(max_page + 1)
                .saturating_sub(current + fetched_current)
        } else {
            let ahead = (max_page + 1).saturating_sub(current + fetched_current);
            ahead + self.start_page.saturating_sub(1).min(max_page)
        }
    }

    /// Approximate number of items still to be served.
    pub fn remaining_estimate(&self, buffered: usize) -> u64 {
        u64::from(self.remaining_pages()) * u64::from(self.page.page_size) + buffered as u64
    }
}
