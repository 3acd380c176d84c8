//! Async buffer controller.
//!
//! Wraps [`BufferState`] behind a mutex and runs page fetches and delayed
//! evictions as Tokio tasks. The mutex is never held across an await: the
//! state plans a fetch, the task awaits the remote call, then the state
//! applies the response only if its generation is still live.
//!
//! Must be used from within a Tokio runtime.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use hunger_core::{
    defaults, AnnotationDecision, AnnotationEvent, AnnotationSink, AnnotationValue, CandidateItem, Error,
    EventBus, FilterConfig, Generation, ItemId, ItemKind, Page, PageSource, RandomSource, Result,
    ThreadRandom,
};

use crate::config::BufferConfig;
use crate::selection::{Direction, RangeSelection};
use crate::state::{BufferSnapshot, BufferState, BufferStatus, FetchOutcome, FetchTicket};
use crate::submitter::AnnotationSubmitter;

/// One judgment applied to every selected item.
///
/// Items stay visible for [`defaults::BATCH_PENDING_DELAY_MS`] before they
/// are evicted, unless another delay is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAnswer {
    pub value: AnnotationValue,
    pub pending_delay_ms: Option<u64>,
    pub annotation_type: Option<String>,
    pub label: Option<String>,
}

impl BatchAnswer {
    pub fn new(value: AnnotationValue) -> Self {
        Self {
            value,
            pending_delay_ms: Some(defaults::BATCH_PENDING_DELAY_MS),
            annotation_type: None,
            label: None,
        }
    }

    pub fn with_pending_delay(mut self, ms: u64) -> Self {
        self.pending_delay_ms = Some(ms);
        self
    }

    pub fn with_annotation_type(mut self, annotation_type: impl Into<String>) -> Self {
        self.annotation_type = Some(annotation_type.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn decision_for(&self, id: ItemId) -> AnnotationDecision {
        AnnotationDecision {
            item_id: id,
            value: self.value,
            pending_delay_ms: self.pending_delay_ms,
            annotation_type: self.annotation_type.clone(),
            label: self.label.clone(),
        }
    }
}

/// Builder for [`BufferController`].
pub struct BufferControllerBuilder {
    source: Arc<dyn PageSource>,
    sink: Arc<dyn AnnotationSink>,
    config: BufferConfig,
    random: Arc<dyn RandomSource>,
    events: EventBus,
}

impl BufferControllerBuilder {
    pub fn config(mut self, config: BufferConfig) -> Self {
        self.config = config;
        self
    }

    /// Source of the randomized start page.
    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Create the controller for `filter` and issue the first fetch.
    pub fn start(self, filter: FilterConfig) -> BufferController {
        let state = BufferState::new(self.config.clone(), filter, self.random.as_ref());
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let submitter = AnnotationSubmitter::new(self.sink, self.events.clone())
            .with_dry_run(self.config.dry_run);

        info!(
            subsystem = "buffer",
            component = "controller",
            op = "start",
            source = state.filter().source.as_str(),
            threshold = self.config.threshold,
            page_size = self.config.page_size,
            start_page = state.cursor().start_page(),
            dry_run = submitter.is_dry_run(),
            "Starting annotation buffer"
        );
        self.events.emit(AnnotationEvent::FilterChanged {
            generation: state.generation(),
            source: state.filter().source,
            start_page: state.cursor().start_page(),
        });

        let controller = BufferController {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                source: self.source,
                submitter,
                random: self.random,
                events: self.events,
                snapshot_tx,
            }),
        };
        controller.refill();
        controller
    }
}

/// Handle to a running annotation buffer. Cheap to clone.
#[derive(Clone)]
pub struct BufferController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<BufferState>,
    source: Arc<dyn PageSource>,
    submitter: AnnotationSubmitter,
    random: Arc<dyn RandomSource>,
    events: EventBus,
    snapshot_tx: watch::Sender<BufferSnapshot>,
}

impl BufferController {
    pub fn builder(
        source: Arc<dyn PageSource>,
        sink: Arc<dyn AnnotationSink>,
    ) -> BufferControllerBuilder {
        BufferControllerBuilder {
            source,
            sink,
            config: BufferConfig::default(),
            random: Arc::new(ThreadRandom),
            events: EventBus::default(),
        }
    }

    // ─── Filter ────────────────────────────────────────────────────────────

    /// Switch filters. Returns `false` when the filter is structurally
    /// unchanged and nothing was reset.
    pub fn set_filter(&self, filter: FilterConfig) -> bool {
        let (generation, source, start_page, ticket) = {
            let mut state = self.inner.lock();
            let Some(generation) = state.set_filter(filter, self.inner.random.as_ref()) else {
                return false;
            };
            let ticket = state.plan_fetch();
            self.inner.publish(&state);
            (
                generation,
                state.filter().source,
                state.cursor().start_page(),
                ticket,
            )
        };

        self.inner.events.emit(AnnotationEvent::FilterChanged {
            generation,
            source,
            start_page,
        });
        self.inner.launch(ticket);
        true
    }

    pub fn filter(&self) -> FilterConfig {
        self.inner.lock().filter().clone()
    }

    pub fn generation(&self) -> Generation {
        self.inner.lock().generation()
    }

    // ─── Reads ─────────────────────────────────────────────────────────────

    /// Head of the buffer.
    pub fn current_item(&self) -> Option<CandidateItem> {
        self.inner.lock().current_item()
    }

    /// Whole buffer in display order, with selection flags set.
    pub fn current_batch(&self) -> Vec<CandidateItem> {
        self.inner.lock().current_batch()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn status(&self) -> BufferStatus {
        self.inner.lock().status()
    }

    /// Approximate count of items left for this filter.
    pub fn remaining(&self) -> u64 {
        self.inner.lock().remaining()
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<BufferSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&BufferSnapshot) -> bool,
    ) -> BufferSnapshot {
        let mut rx = self.subscribe();
        let result = rx.wait_for(|snapshot| predicate(snapshot)).await;
        match result {
            Ok(snapshot) => (*snapshot).clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    // ─── Mutations ─────────────────────────────────────────────────────────

    /// Drop the head item without annotating it.
    pub fn consume(&self) -> Option<CandidateItem> {
        let (item, ticket) = {
            let mut state = self.inner.lock();
            let item = state.consume();
            let ticket = state.plan_fetch();
            self.inner.publish(&state);
            (item, ticket)
        };
        self.inner.launch(ticket);
        item
    }

    /// Alias of [`Self::consume`] for "skip to next".
    pub fn next(&self) -> Option<CandidateItem> {
        self.consume()
    }

    /// Retry a stalled refill. Returns whether a fetch was issued.
    pub fn refill(&self) -> bool {
        let ticket = {
            let mut state = self.inner.lock();
            let ticket = state.plan_fetch();
            self.inner.publish(&state);
            ticket
        };
        let issued = ticket.is_some();
        self.inner.launch(ticket);
        issued
    }

    /// Answer one item.
    pub fn answer(&self, decision: AnnotationDecision) -> Result<()> {
        let id = decision.item_id.clone();
        match self.answer_many(vec![decision]) {
            0 => Err(Error::InvalidInput(format!(
                "Item {} is not in the buffer or was already answered",
                id
            ))),
            _ => Ok(()),
        }
    }

    /// Answer several items in one submission. Items no longer in the buffer,
    /// or already answered and waiting out their delay, are skipped. Returns
    /// the number of decisions accepted.
    ///
    /// The submission runs in the background; each item is evicted after its
    /// pending delay whatever the remote outcome.
    pub fn answer_many(&self, decisions: Vec<AnnotationDecision>) -> usize {
        let mut records = Vec::with_capacity(decisions.len());
        let mut evictions: BTreeMap<u64, Vec<ItemId>> = BTreeMap::new();
        let generation = {
            let mut state = self.inner.lock();
            for decision in &decisions {
                let Some(item) = state.claim_for_answer(&decision.item_id) else {
                    debug!(item_id = %decision.item_id, "Answer for unknown or answered item ignored");
                    continue;
                };
                if item.kind != ItemKind::Product {
                    records.push(decision.to_record(&item));
                }
                evictions
                    .entry(decision.pending_delay_ms.unwrap_or(0))
                    .or_default()
                    .push(decision.item_id.clone());
            }
            self.inner.publish(&state);
            state.generation()
        };

        let accepted: usize = evictions.values().map(Vec::len).sum();
        if accepted == 0 {
            return 0;
        }
        if !records.is_empty() {
            self.inner.submitter.submit(records);
        }

        for (delay_ms, ids) in evictions {
            if delay_ms == 0 {
                self.inner.evict(generation, &ids);
            } else {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    inner.evict(generation, &ids);
                });
            }
        }
        accepted
    }

    /// Apply one judgment to every selected item.
    pub fn answer_selected(&self, answer: BatchAnswer) -> usize {
        let decisions = self
            .selected_ids()
            .into_iter()
            .map(|id| answer.decision_for(id))
            .collect();
        self.answer_many(decisions)
    }

    // ─── Selection ─────────────────────────────────────────────────────────

    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.inner.lock().selected_ids()
    }

    pub fn toggle(&self, id: &ItemId) -> bool {
        self.with_state(|state| state.toggle(id))
    }

    /// Click with an optional shift modifier.
    pub fn extend_range(&self, id: &ItemId, shift: bool) -> Option<RangeSelection> {
        self.with_state(|state| state.extend_range(id, shift))
    }

    pub fn extend_by_keyboard(&self, direction: Direction) -> bool {
        self.with_state(|state| state.extend_by_keyboard(direction))
    }

    pub fn select_all(&self) {
        self.with_state(|state| state.select_all())
    }

    pub fn clear_selection(&self) {
        self.with_state(|state| state.clear_selection())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BufferState) -> T) -> T {
        let mut state = self.inner.lock();
        let out = f(&mut state);
        self.inner.publish(&state);
        out
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &BufferState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }

    fn launch(self: &Arc<Self>, ticket: Option<FetchTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = inner.source.fetch_page(&ticket.request).await;
            inner.complete(ticket, result);
        });
    }

    fn complete(self: &Arc<Self>, ticket: FetchTicket, result: Result<Page>) {
        let (outcome, next) = {
            let mut state = self.lock();
            let outcome = state.apply_fetch(&ticket, result);
            let next = match outcome {
                FetchOutcome::Applied { .. } => state.plan_fetch(),
                _ => None,
            };
            self.publish(&state);
            (outcome, next)
        };

        match outcome {
            FetchOutcome::Stale {
                response_generation,
                live_generation,
                page,
            } => {
                debug!(
                    generation = response_generation.value(),
                    live_generation = live_generation.value(),
                    page,
                    "Stale response discarded"
                );
                self.events.emit(AnnotationEvent::StaleResponseDiscarded {
                    response_generation,
                    live_generation,
                    page,
                });
            }
            FetchOutcome::Failed { page, error } => {
                warn!(
                    generation = ticket.generation.value(),
                    page,
                    error = %error,
                    "Page fetch failed, buffer stalled until next refill"
                );
                self.events.emit(AnnotationEvent::FetchFailed {
                    generation: ticket.generation,
                    page,
                    error,
                });
            }
            FetchOutcome::Applied {
                page,
                appended,
                duplicates,
                exhausted,
            } => {
                self.events.emit(AnnotationEvent::PageAppended {
                    generation: ticket.generation,
                    page,
                    appended,
                    duplicates,
                });
                if exhausted {
                    self.events.emit(AnnotationEvent::Exhausted {
                        generation: ticket.generation,
                    });
                }
            }
        }

        self.launch(next);
    }

    fn evict(self: &Arc<Self>, generation: Generation, ids: &[ItemId]) {
        let ticket = {
            let mut state = self.lock();
            if state.generation() != generation {
                debug!(
                    generation = generation.value(),
                    live_generation = state.generation().value(),
                    "Eviction skipped, filter changed"
                );
                return;
            }
            let removed = state.evict(ids);
            debug!(item_count = removed.len(), buffer_len = state.len(), "Items evicted");
            let ticket = state.plan_fetch();
            self.publish(&state);
            ticket
        };
        self.launch(ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunger_core::FixedStartPage;
    use hunger_remote::mock::{MockAnnotationSink, MockPageSource};

    fn controller(source: &MockPageSource, sink: &MockAnnotationSink) -> BufferController {
        BufferController::builder(Arc::new(source.clone()), Arc::new(sink.clone()))
            .config(BufferConfig::default().with_threshold(10).with_page_size(50))
            .random(Arc::new(FixedStartPage(1)))
            .start(FilterConfig::questions())
    }

    #[tokio::test]
    async fn test_start_fetches_first_page() {
        let source = MockPageSource::new().with_catalog_size(120);
        let sink = MockAnnotationSink::new();
        let controller = controller(&source, &sink);

        let snapshot = controller.wait_for(|s| s.status == BufferStatus::Ready).await;
        assert_eq!(snapshot.len, 50);
        assert_eq!(snapshot.max_page, 3);
        assert_eq!(source.requested_pages(), vec![1]);
        assert_eq!(controller.current_item().unwrap().id.as_str(), "item-0");
    }

    #[tokio::test]
    async fn test_answer_unknown_item_is_invalid_input() {
        let source = MockPageSource::new().with_catalog_size(5);
        let sink = MockAnnotationSink::new();
        let controller = controller(&source, &sink);
        controller.wait_for(|s| s.len == 5).await;

        let result = controller.answer(AnnotationDecision::new("nope", AnnotationValue::Affirmative));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(controller.len(), 5);
    }

    #[tokio::test]
    async fn test_answer_product_evicts_without_submission() {
        let source = MockPageSource::new()
            .with_catalog_size(3)
            .with_kind(ItemKind::Product);
        let sink = MockAnnotationSink::new();
        let controller = controller(&source, &sink);
        controller.wait_for(|s| s.len == 3).await;

        controller
            .answer(AnnotationDecision::new("item-0", AnnotationValue::Affirmative))
            .unwrap();
        assert_eq!(controller.len(), 2);
        tokio::task::yield_now().await;
        assert_eq!(sink.call_count(), 0);
    }

    #[test]
    fn test_batch_answer_uses_default_delay() {
        let decision = BatchAnswer::new(AnnotationValue::Negative).decision_for(ItemId::new("q1"));
        assert_eq!(decision.pending_delay_ms, Some(defaults::BATCH_PENDING_DELAY_MS));
    }

    #[tokio::test]
    async fn test_batch_answer_builder() {
        let answer = BatchAnswer::new(AnnotationValue::Affirmative)
            .with_pending_delay(250)
            .with_annotation_type("label")
            .with_label("en:organic");
        let decision = answer.decision_for(ItemId::new("logo-1"));
        assert_eq!(decision.pending_delay_ms, Some(250));
        assert_eq!(decision.label.as_deref(), Some("en:organic"));
    }
}
