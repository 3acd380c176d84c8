//! Synchronous buffer state machine.
//!
//! Owns the queue, the filter, the generation counter, the page cursor and the
//! selection. Every mutation is a plain method call; the async controller wraps
//! this in a mutex and runs the network calls outside of it.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info, trace};

use hunger_core::{
    CandidateItem, FilterConfig, Generation, ItemId, Page, PageRequest, RandomSource, Result,
};

use crate::config::BufferConfig;
use crate::cursor::{FetchCursor, PageStep};
use crate::selection::{Direction, RangeSelection, SelectionManager};

/// Loading / ready / empty status as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferStatus {
    /// Buffer empty while a fetch is pending or stalled.
    Loading,
    /// At least one item is available.
    Ready,
    /// Buffer empty and nothing left to fetch for this filter.
    NoItemsLeft,
}

/// Read-only view published to the UI after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferSnapshot {
    pub status: BufferStatus,
    pub generation: Generation,
    pub len: usize,
    /// Approximate, the remote total moves under concurrent annotation.
    pub remaining: u64,
    pub fetch_pending: bool,
    pub page: u32,
    pub max_page: u32,
    pub selected: usize,
    pub last_error: Option<String>,
}

/// A planned fetch, tagged with the generation it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: Generation,
    pub step: PageStep,
    pub request: PageRequest,
}

/// What applying a fetch response did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response belonged to a superseded generation and was dropped.
    Stale {
        response_generation: Generation,
        live_generation: Generation,
        page: u32,
    },
    /// Page applied. `exhausted` is set the first time the cursor runs out.
    Applied {
        page: u32,
        appended: usize,
        duplicates: usize,
        exhausted: bool,
    },
    /// Fetch failed; the cursor stays on the last good page.
    Failed { page: u32, error: String },
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    generation: Generation,
    page: u32,
}

pub struct BufferState {
    config: BufferConfig,
    filter: FilterConfig,
    generation: Generation,
    items: VecDeque<CandidateItem>,
    ids: HashSet<ItemId>,
    /// Ids answered or consumed in this generation.
    retired: HashSet<ItemId>,
    /// Ids answered but still waiting out their eviction delay.
    pending_eviction: HashSet<ItemId>,
    cursor: FetchCursor,
    in_flight: Option<InFlight>,
    exhaustion_reported: bool,
    last_error: Option<String>,
    selection: SelectionManager,
}

impl BufferState {
    /// Start generation 1 for `filter`.
    pub fn new(config: BufferConfig, filter: FilterConfig, random: &dyn RandomSource) -> Self {
        let filter = filter.normalized();
        let cursor = new_cursor(&config, &filter, random);
        Self {
            config,
            filter,
            generation: Generation::new(1),
            items: VecDeque::new(),
            ids: HashSet::new(),
            retired: HashSet::new(),
            pending_eviction: HashSet::new(),
            cursor,
            in_flight: None,
            exhaustion_reported: false,
            last_error: None,
            selection: SelectionManager::new(),
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn cursor(&self) -> &FetchCursor {
        &self.cursor
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn fetch_pending(&self) -> bool {
        self.in_flight
            .is_some_and(|f| f.generation == self.generation)
    }

    /// Replace the filter. Returns the new generation, or `None` when the
    /// filter is structurally unchanged.
    pub fn set_filter(
        &mut self,
        filter: FilterConfig,
        random: &dyn RandomSource,
    ) -> Option<Generation> {
        let filter = filter.normalized();
        if filter == self.filter {
            return None;
        }

        self.generation = self.generation.next();
        self.cursor = new_cursor(&self.config, &filter, random);
        self.filter = filter;
        self.items.clear();
        self.ids.clear();
        self.retired.clear();
        self.pending_eviction.clear();
        self.in_flight = None;
        self.exhaustion_reported = false;
        self.last_error = None;
        self.selection.reset();

        info!(
            subsystem = "buffer",
            component = "state",
            op = "set_filter",
            generation = self.generation.value(),
            source = self.filter.source.as_str(),
            start_page = self.cursor.start_page(),
            "Filter changed, buffer reset"
        );
        Some(self.generation)
    }

    /// Plan the next fetch if the buffer is below threshold, nothing is in
    /// flight for this generation and the cursor has pages left.
    pub fn plan_fetch(&mut self) -> Option<FetchTicket> {
        if self.items.len() >= self.config.threshold {
            return None;
        }
        if self.fetch_pending() {
            debug!(generation = self.generation.value(), "Refill skipped, fetch already pending");
            return None;
        }
        let step = self.cursor.next_step()?;

        self.in_flight = Some(InFlight {
            generation: self.generation,
            page: step.page,
        });
        debug!(
            generation = self.generation.value(),
            page = step.page,
            wraps = step.wraps,
            buffer_len = self.items.len(),
            "Refill planned"
        );
        Some(FetchTicket {
            generation: self.generation,
            step,
            request: PageRequest {
                filter: self.filter.clone(),
                page: step.page,
                page_size: self.config.page_size,
            },
        })
    }

    /// Apply a fetch response. Responses for other generations never touch
    /// the buffer.
    pub fn apply_fetch(&mut self, ticket: &FetchTicket, result: Result<Page>) -> FetchOutcome {
        if ticket.generation != self.generation {
            return FetchOutcome::Stale {
                response_generation: ticket.generation,
                live_generation: self.generation,
                page: ticket.step.page,
            };
        }
        if self
            .in_flight
            .is_some_and(|f| f.generation == ticket.generation && f.page == ticket.step.page)
        {
            self.in_flight = None;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                let error = e.to_string();
                self.last_error = Some(error.clone());
                return FetchOutcome::Failed {
                    page: ticket.step.page,
                    error,
                };
            }
        };

        let received = page.items.len();
        let mut appended = 0;
        for item in page.items {
            if self.ids.contains(&item.id) || self.retired.contains(&item.id) {
                trace!(item_id = %item.id, "Duplicate candidate dropped");
                continue;
            }
            self.ids.insert(item.id.clone());
            self.items.push_back(CandidateItem {
                selected: false,
                ..item
            });
            appended += 1;
        }

        self.cursor
            .commit(ticket.step, page.total_count, page.page_size, appended);
        self.last_error = None;

        let exhausted = self.cursor.is_exhausted() && !self.exhaustion_reported;
        if exhausted {
            self.exhaustion_reported = true;
            info!(
                generation = self.generation.value(),
                page = ticket.step.page,
                buffer_len = self.items.len(),
                "No more pages for this filter"
            );
        }

        FetchOutcome::Applied {
            page: ticket.step.page,
            appended,
            duplicates: received - appended,
            exhausted,
        }
    }

    // ─── Reads ─────────────────────────────────────────────────────────────

    pub fn current_item(&self) -> Option<CandidateItem> {
        self.items.front().map(|item| self.with_selection(item))
    }

    pub fn current_batch(&self) -> Vec<CandidateItem> {
        self.items
            .iter()
            .map(|item| self.with_selection(item))
            .collect()
    }

    pub fn item(&self, id: &ItemId) -> Option<CandidateItem> {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| self.with_selection(item))
    }

    pub fn order(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn status(&self) -> BufferStatus {
        if !self.items.is_empty() {
            BufferStatus::Ready
        } else if self.cursor.is_exhausted() && !self.fetch_pending() {
            BufferStatus::NoItemsLeft
        } else {
            BufferStatus::Loading
        }
    }

    pub fn remaining(&self) -> u64 {
        self.cursor.remaining_estimate(self.items.len())
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        let page = self.cursor.page();
        BufferSnapshot {
            status: self.status(),
            generation: self.generation,
            len: self.items.len(),
            remaining: self.remaining(),
            fetch_pending: self.fetch_pending(),
            page: page.page_number,
            max_page: page.max_page,
            selected: self.selection.len(),
            last_error: self.last_error.clone(),
        }
    }

    fn with_selection(&self, item: &CandidateItem) -> CandidateItem {
        CandidateItem {
            selected: self.selection.is_selected(&item.id),
            ..item.clone()
        }
    }

    // ─── Eviction ──────────────────────────────────────────────────────────

    /// Claim `id` for an answer. Returns `None` when the item is not buffered
    /// or already answered and waiting to be evicted.
    pub fn claim_for_answer(&mut self, id: &ItemId) -> Option<CandidateItem> {
        if self.pending_eviction.contains(id) {
            return None;
        }
        let item = self.item(id)?;
        self.pending_eviction.insert(id.clone());
        self.selection.remove(id);
        Some(item)
    }

    pub fn is_pending_eviction(&self, id: &ItemId) -> bool {
        self.pending_eviction.contains(id)
    }

    /// Remove the head item.
    pub fn consume(&mut self) -> Option<CandidateItem> {
        let item = self.items.pop_front()?;
        self.retire(&item.id);
        Some(item)
    }

    /// Remove items by id, wherever they are in the queue. Returns the ids
    /// actually removed.
    pub fn evict(&mut self, ids: &[ItemId]) -> Vec<ItemId> {
        let targets: HashSet<&ItemId> = ids.iter().filter(|id| self.ids.contains(*id)).collect();
        if targets.is_empty() {
            return Vec::new();
        }
        let mut removed = Vec::with_capacity(targets.len());
        self.items.retain(|item| {
            if targets.contains(&item.id) {
                removed.push(item.id.clone());
                false
            } else {
                true
            }
        });
        for id in &removed {
            self.retire(id);
        }
        removed
    }

    fn retire(&mut self, id: &ItemId) {
        self.ids.remove(id);
        self.pending_eviction.remove(id);
        self.retired.insert(id.clone());
        self.selection.remove(id);
    }

    // ─── Selection ─────────────────────────────────────────────────────────

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    /// Selected ids in display order, minus those already answered.
    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.selection
            .selected_in(&self.order())
            .into_iter()
            .filter(|id| !self.pending_eviction.contains(id))
            .collect()
    }

    pub fn toggle(&mut self, id: &ItemId) -> bool {
        let order = self.order();
        self.selection.toggle(&order, id)
    }

    pub fn extend_range(&mut self, id: &ItemId, shift: bool) -> Option<RangeSelection> {
        let order = self.order();
        self.selection.extend_range(&order, id, shift)
    }

    pub fn extend_by_keyboard(&mut self, direction: Direction) -> bool {
        let order = self.order();
        self.selection.extend_by_keyboard(&order, direction)
    }

    pub fn select_all(&mut self) {
        let order = self.order();
        self.selection.select_all(&order);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
}

fn new_cursor(config: &BufferConfig, filter: &FilterConfig, random: &dyn RandomSource) -> FetchCursor {
    if filter.is_by_code() {
        return FetchCursor::new(1, config.page_size, 1, config.max_empty_page_skips);
    }
    let start = if config.randomize_start {
        random.start_page(config.start_page_ceiling)
    } else {
        1
    };
    FetchCursor::new(
        start,
        config.page_size,
        config.start_page_ceiling,
        config.max_empty_page_skips,
    )
}
