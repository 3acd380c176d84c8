//! Mock page source and annotation sink for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hunger_core::{FilterConfig, PageRequest, PageSource};
//! use hunger_remote::mock::MockPageSource;
//!
//! #[tokio::test]
//! async fn test_with_mock_source() {
//!     let source = MockPageSource::new().with_catalog_size(120);
//!     let page = source
//!         .fetch_page(&PageRequest { filter: FilterConfig::questions(), page: 3, page_size: 50 })
//!         .await
//!         .unwrap();
//!     assert_eq!(page.items.len(), 20);
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use hunger_core::{
    AnnotationRecord, AnnotationSink, CandidateItem, Error, FilterConfig, ItemId, ItemKind,
    ItemPayload, Page, PageRequest, PageSource, Result,
};

/// A synthetic catalog of `size` items named `{prefix}-{index}`.
#[derive(Debug, Clone)]
struct Catalog {
    prefix: String,
    size: usize,
    /// Reported total, when it should differ from `size`.
    reported_total: Option<u64>,
    kind: ItemKind,
}

impl Catalog {
    fn page(&self, page: u32, page_size: u32) -> Page {
        let page_size_usize = page_size.max(1) as usize;
        let start = (page.max(1) as usize - 1) * page_size_usize;
        let end = (start + page_size_usize).min(self.size);
        let items = (start..end)
            .map(|i| {
                CandidateItem::new(format!("{}-{}", self.prefix, i), self.kind).with_payload(
                    ItemPayload {
                        text: Some(format!("Item {}", i)),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Page {
            items,
            total_count: self.reported_total.unwrap_or(self.size as u64),
            page_size,
        }
    }
}

#[derive(Default)]
struct MockSourceState {
    page_overrides: HashMap<u32, Vec<CandidateItem>>,
    failing_pages: HashSet<u32>,
    fail_all: bool,
    calls: Vec<PageRequest>,
}

/// Mock [`PageSource`] with a call log, failure injection and a hold gate.
#[derive(Clone)]
pub struct MockPageSource {
    default_catalog: Arc<Catalog>,
    catalogs: Arc<HashMap<FilterConfig, Catalog>>,
    latency_ms: u64,
    state: Arc<Mutex<MockSourceState>>,
    gate: Arc<watch::Sender<bool>>,
    call_count: Arc<watch::Sender<usize>>,
}

impl Default for MockPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageSource {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        let (call_count, _) = watch::channel(0);
        Self {
            default_catalog: Arc::new(Catalog {
                prefix: "item".to_string(),
                size: 0,
                reported_total: None,
                kind: ItemKind::Insight,
            }),
            catalogs: Arc::new(HashMap::new()),
            latency_ms: 0,
            state: Arc::new(Mutex::new(MockSourceState::default())),
            gate: Arc::new(gate),
            call_count: Arc::new(call_count),
        }
    }

    /// Size of the catalog served for unregistered filters.
    pub fn with_catalog_size(mut self, size: usize) -> Self {
        Arc::make_mut(&mut self.default_catalog).size = size;
        self
    }

    /// Total count reported for unregistered filters.
    pub fn with_reported_total(mut self, total: u64) -> Self {
        Arc::make_mut(&mut self.default_catalog).reported_total = Some(total);
        self
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        Arc::make_mut(&mut self.default_catalog).kind = kind;
        self
    }

    /// Serve a distinct catalog for one filter.
    pub fn with_catalog_for(mut self, filter: FilterConfig, prefix: &str, size: usize) -> Self {
        let kind = self.default_catalog.kind;
        Arc::make_mut(&mut self.catalogs).insert(
            filter,
            Catalog {
                prefix: prefix.to_string(),
                size,
                reported_total: None,
                kind,
            },
        );
        self
    }

    /// Simulated latency per fetch.
    pub fn with_latency(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Replace the contents of one page, whatever the filter.
    pub fn set_page(&self, page: u32, items: Vec<CandidateItem>) {
        self.lock().page_overrides.insert(page, items);
    }

    /// Make one page fail until [`Self::clear_failures`].
    pub fn fail_page(&self, page: u32) {
        self.lock().failing_pages.insert(page);
    }

    pub fn fail_all(&self, fail: bool) {
        self.lock().fail_all = fail;
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failing_pages.clear();
        state.fail_all = false;
    }

    /// Block fetches until [`Self::release`]. Calls are still logged.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// All requests received so far.
    pub fn calls(&self) -> Vec<PageRequest> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.borrow()
    }

    /// Requested page numbers, in call order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.lock().calls.iter().map(|c| c.page).collect()
    }

    /// Wait until at least `n` fetches have been received.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockSourceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn catalog_for(&self, filter: &FilterConfig) -> &Catalog {
        self.catalogs
            .get(&filter.normalized())
            .unwrap_or(&self.default_catalog)
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        {
            let mut state = self.lock();
            state.calls.push(request.clone());
        }
        self.call_count.send_modify(|count| *count += 1);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }

        let state = self.lock();
        if state.fail_all || state.failing_pages.contains(&request.page) {
            return Err(Error::FetchFailed(format!(
                "mock failure on page {}",
                request.page
            )));
        }

        let catalog = self.catalog_for(&request.filter);
        let mut page = catalog.page(request.page, request.page_size);
        if let Some(items) = state.page_overrides.get(&request.page) {
            page.items = items.clone();
        }
        Ok(page)
    }
}

// =============================================================================
// ANNOTATION SINK
// =============================================================================

/// Mock [`AnnotationSink`] that records every batch it receives.
#[derive(Clone)]
pub struct MockAnnotationSink {
    batches: Arc<Mutex<Vec<Vec<AnnotationRecord>>>>,
    fail: Arc<Mutex<bool>>,
    latency_ms: u64,
    call_count: Arc<watch::Sender<usize>>,
}

impl Default for MockAnnotationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnnotationSink {
    pub fn new() -> Self {
        let (call_count, _) = watch::channel(0);
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
            latency_ms: 0,
            call_count: Arc::new(call_count),
        }
    }

    pub fn with_latency(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn batches(&self) -> Vec<Vec<AnnotationRecord>> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every item id submitted, flattened in order.
    pub fn submitted_ids(&self) -> Vec<ItemId> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|r| r.item_id)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.borrow()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

#[async_trait]
impl AnnotationSink for MockAnnotationSink {
    async fn annotate(&self, records: &[AnnotationRecord]) -> Result<()> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        let failing = *self.fail.lock().unwrap_or_else(|e| e.into_inner());
        let result = if failing {
            Err(Error::SubmissionFailed("mock submission failure".to_string()))
        } else {
            self.batches
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(records.to_vec());
            Ok(())
        };
        self.call_count.send_modify(|count| *count += 1);
        result
    }
}
