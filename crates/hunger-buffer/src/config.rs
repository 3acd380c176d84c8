//! Buffer controller configuration.

use hunger_core::defaults;

/// Configuration for the buffer controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Buffer length below which the next page is fetched.
    pub threshold: usize,
    /// Number of candidates requested per page.
    pub page_size: u32,
    /// Upper bound of the randomized start page, and the initial `max_page` hint.
    pub start_page_ceiling: u32,
    /// Whether new filter generations start on a random page.
    pub randomize_start: bool,
    /// Consecutive empty pages skipped before the cursor is exhausted.
    pub max_empty_page_skips: u32,
    /// Log decisions instead of sending them.
    pub dry_run: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::BUFFER_THRESHOLD,
            page_size: defaults::PAGE_SIZE,
            start_page_ceiling: defaults::START_PAGE_CEILING,
            randomize_start: true,
            max_empty_page_skips: defaults::MAX_EMPTY_PAGE_SKIPS,
            dry_run: false,
        }
    }
}

impl BufferConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `HUNGER_BUFFER_THRESHOLD` | `10` | Refill trigger point |
    /// | `HUNGER_PAGE_SIZE` | `50` | Items per page |
    /// | `HUNGER_START_PAGE_CEILING` | `100` | Random start page bound |
    /// | `HUNGER_RANDOM_START` | `true` | Randomize the start page |
    /// | `HUNGER_MAX_EMPTY_PAGES` | `5` | Empty pages skipped before giving up |
    /// | `HUNGER_DRY_RUN` | `false` | Log decisions without sending them |
    pub fn from_env() -> Self {
        let threshold = std::env::var("HUNGER_BUFFER_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::BUFFER_THRESHOLD);

        let page_size = std::env::var("HUNGER_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::PAGE_SIZE)
            .max(1);

        let start_page_ceiling = std::env::var("HUNGER_START_PAGE_CEILING")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::START_PAGE_CEILING)
            .max(1);

        let randomize_start = std::env::var("HUNGER_RANDOM_START")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_empty_page_skips = std::env::var("HUNGER_MAX_EMPTY_PAGES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::MAX_EMPTY_PAGE_SKIPS);

        let dry_run = std::env::var("HUNGER_DRY_RUN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            threshold,
            page_size,
            start_page_ceiling,
            randomize_start,
            max_empty_page_skips,
            dry_run,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_start_page_ceiling(mut self, ceiling: u32) -> Self {
        self.start_page_ceiling = ceiling.max(1);
        self
    }

    pub fn with_randomize_start(mut self, randomize: bool) -> Self {
        self.randomize_start = randomize;
        self
    }

    pub fn with_max_empty_page_skips(mut self, skips: u32) -> Self {
        self.max_empty_page_skips = skips;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
