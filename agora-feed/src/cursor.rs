//! Pagination state machine with a single-flight fetch gate.

/// Whether a page request is currently outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Fetching,
}

/// Result of asking the gate for permission to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Fetch page `page` with `limit` records. The cursor is now `Fetching`
    /// and must be settled with `complete_page` or `fail_page`.
    Admitted { page: i64, limit: i64 },
    /// A fetch is outstanding. The call is dropped, not queued; retry on a
    /// later tick or user action.
    InFlight,
    /// The server reported no further pages. Sticky until `reset`.
    Exhausted,
}

/// Tracks fetch progress for one feed view.
///
/// Because admission moves the cursor to `Fetching` and nothing else can be
/// admitted until the result is observed, page N+1 is never requested before
/// page N settles.
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    next_page: i64,
    items_per_page: i64,
    total_count: i64,
    has_more: bool,
    phase: FetchPhase,
}

impl PaginationCursor {
    pub fn new(items_per_page: i64) -> Self {
        Self {
            next_page: 1,
            items_per_page,
            total_count: 0,
            has_more: true,
            phase: FetchPhase::Idle,
        }
    }

    /// The single-flight gate.
    pub fn try_admit(&mut self) -> Admission {
        if self.phase == FetchPhase::Fetching {
            return Admission::InFlight;
        }
        if !self.has_more {
            return Admission::Exhausted;
        }
        self.phase = FetchPhase::Fetching;
        Admission::Admitted {
            page: self.next_page,
            limit: self.items_per_page,
        }
    }

    /// Success path: advance past the fetched page. `total_count` and
    /// `has_more` come from the response and are authoritative.
    pub fn complete_page(&mut self, has_more: bool, total_count: i64) {
        self.phase = FetchPhase::Idle;
        self.next_page += 1;
        self.has_more = has_more;
        self.total_count = total_count.max(0);
    }

    /// Failure path: the same page stays next, ready for a manual retry.
    /// Nothing retries automatically.
    pub fn fail_page(&mut self) {
        self.phase = FetchPhase::Idle;
    }

    /// Back to page 1 with everything forgotten, as on a filter change.
    pub fn reset(&mut self) {
        *self = Self::new(self.items_per_page);
    }

    /// Settle into the exhausted state around an unpaginated load.
    pub fn mark_exhausted(&mut self, total_count: i64) {
        self.phase = FetchPhase::Idle;
        self.next_page = 1;
        self.has_more = false;
        self.total_count = total_count.max(0);
    }

    /// Account for a locally observed deletion.
    pub fn decrement_total(&mut self) {
        self.total_count = (self.total_count - 1).max(0);
    }

    pub fn next_page(&self) -> i64 {
        self.next_page
    }

    pub fn items_per_page(&self) -> i64 {
        self.items_per_page
    }

    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn in_flight(&self) -> bool {
        self.phase == FetchPhase::Fetching
    }
}

// ============================================================================
// TESTS
// ============================================================================
