//! The feed session service object.
//!
//! One `FeedSession` owns the cache, cursor, and ledger for an authenticated
//! session and is injected into consumers (shared via `Arc`) instead of being
//! reached through ambient context. State lives behind a mutex that is never
//! held across an await point: admission and commit are synchronous critical
//! sections around the suspended network call.

use crate::cache::FeedCache;
use crate::cursor::{Admission, PaginationCursor};
use crate::ledger::VoteLedger;
use agora_api::{
    Ack, ApiClientError, ListPoliciesRequest, PolicyPage, RemoteDataSource, UpvoteReply,
};
use agora_core::{FilterSpec, Policy, PolicyDraft, PolicyId};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

// ============================================================================
// CONFIG
// ============================================================================

/// When the visible vote count changes relative to server confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStrategy {
    /// Bump the cached count before the network call resolves. Used by
    /// multi-item views where latency would make voting feel dead.
    Optimistic,
    /// Defer the visible change until the server confirms. Used by the
    /// single-record detail view.
    Confirmed,
}

/// Construction parameters for a [`FeedSession`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub items_per_page: i64,
    pub vote_strategy: VoteStrategy,
    pub filters: FilterSpec,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            items_per_page: 10,
            vote_strategy: VoteStrategy::Optimistic,
            filters: FilterSpec::default(),
        }
    }
}

impl FeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items_per_page(mut self, items_per_page: i64) -> Self {
        self.items_per_page = items_per_page;
        self
    }

    pub fn with_vote_strategy(mut self, strategy: VoteStrategy) -> Self {
        self.vote_strategy = strategy;
        self
    }

    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }
}

// ============================================================================
// OUTCOME AND ERROR TYPES
// ============================================================================

/// Result of a `fetch_next` call. Expected conditions are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was merged.
    Fetched {
        /// Records newly appended to the cache.
        appended: usize,
        /// Authoritative collection size from the response.
        total_count: i64,
        has_more: bool,
    },
    /// Another fetch holds the gate; this call was dropped.
    InFlight,
    /// The cursor is exhausted; nothing was requested.
    Exhausted,
    /// The view was invalidated while the page was in flight; the result
    /// was discarded without touching state.
    Superseded,
}

/// Result of an `upvote` call.
#[derive(Debug)]
pub enum VoteOutcome {
    /// The vote is recorded (optimistically or confirmed).
    Applied,
    /// The ledger or the server already holds a vote for this id; nothing
    /// changed.
    AlreadyVoted,
    /// The network call failed. Any optimistic bump was reverted and the
    /// reservation released, so the vote may be retried.
    Failed(ApiClientError),
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("remote request failed: {0}")]
    Remote(#[from] ApiClientError),
    #[error("session state poisoned")]
    StatePoisoned,
}

pub type FeedResult<T> = Result<T, FeedError>;

/// A cached record decorated with the session's vote status.
#[derive(Debug, Clone)]
pub struct PolicyView {
    pub policy: Policy,
    /// Confirmed vote (locally observed or server-taught).
    pub has_voted: bool,
    /// A vote for this record is awaiting confirmation.
    pub vote_pending: bool,
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug)]
struct SessionState {
    filters: FilterSpec,
    cache: FeedCache,
    cursor: PaginationCursor,
    ledger: VoteLedger,
    /// Bumped on every invalidation; async resumptions compare it before
    /// committing so a torn-down view is never mutated.
    epoch: u64,
}

pub struct FeedSession<R> {
    remote: Arc<R>,
    vote_strategy: VoteStrategy,
    state: Mutex<SessionState>,
}

impl<R: RemoteDataSource> FeedSession<R> {
    pub fn new(remote: Arc<R>, config: FeedConfig) -> Self {
        Self {
            remote,
            vote_strategy: config.vote_strategy,
            state: Mutex::new(SessionState {
                filters: config.filters,
                cache: FeedCache::new(),
                cursor: PaginationCursor::new(config.items_per_page),
                ledger: VoteLedger::new(),
                epoch: 0,
            }),
        }
    }

    fn state(&self) -> FeedResult<MutexGuard<'_, SessionState>> {
        self.state.lock().map_err(|_| FeedError::StatePoisoned)
    }

    // ------------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------------

    /// Fetch and merge the next page of the feed.
    ///
    /// At most one fetch is in flight per session; concurrent callers get
    /// [`FetchOutcome::InFlight`] back immediately. On a remote failure the
    /// cursor stays at the failed page (retryable) and the error is returned;
    /// the cache is untouched.
    pub async fn fetch_next(&self) -> FeedResult<FetchOutcome> {
        let (request, epoch) = {
            let mut state = self.state()?;
            match state.cursor.try_admit() {
                Admission::InFlight => return Ok(FetchOutcome::InFlight),
                Admission::Exhausted => return Ok(FetchOutcome::Exhausted),
                Admission::Admitted { page, limit } => (
                    ListPoliciesRequest {
                        page,
                        limit,
                        filters: state.filters.clone(),
                    },
                    state.epoch,
                ),
            }
        };

        debug!(page = request.page, "fetching feed page");
        let result = self.remote.list_policies(&request).await;

        let mut state = self.state()?;
        if state.epoch != epoch {
            // The view this page was fetched for no longer exists; the
            // reset already returned the cursor to Idle.
            debug!(page = request.page, "discarding page for superseded view");
            return Ok(FetchOutcome::Superseded);
        }
        match result {
            Ok(PolicyPage {
                policies,
                has_more,
                total_policies,
            }) => {
                let appended = state.cache.merge(policies);
                state.cursor.complete_page(has_more, total_policies);
                debug!(
                    page = request.page,
                    appended,
                    total = total_policies,
                    "feed page merged"
                );
                Ok(FetchOutcome::Fetched {
                    appended,
                    total_count: total_policies,
                    has_more,
                })
            }
            Err(err) => {
                state.cursor.fail_page();
                warn!(page = request.page, error = %err, "feed page fetch failed");
                Err(FeedError::Remote(err))
            }
        }
    }

    /// Swap the active filter criteria. A change resets the cache and
    /// cursor and invalidates any in-flight work; an equal spec is a no-op.
    /// The vote ledger is user-scoped and survives.
    pub fn set_filters(&self, filters: FilterSpec) -> FeedResult<bool> {
        let mut state = self.state()?;
        if state.filters == filters {
            return Ok(false);
        }
        debug!("filter change, resetting feed view");
        state.filters = filters;
        state.epoch = state.epoch.wrapping_add(1);
        state.cache.reset();
        state.cursor.reset();
        Ok(true)
    }

    /// Teardown hook: discard the view's cache and pagination progress and
    /// invalidate in-flight resumptions. The ledger survives.
    pub fn invalidate(&self) -> FeedResult<()> {
        let mut state = self.state()?;
        state.epoch = state.epoch.wrapping_add(1);
        state.cache.reset();
        state.cursor.reset();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Votes
    // ------------------------------------------------------------------------

    /// Cast an upvote for `id`.
    ///
    /// The id is reserved in the ledger synchronously, before the network
    /// call is dispatched, so a concurrent duplicate returns
    /// [`VoteOutcome::AlreadyVoted`] instead of racing the server. Under
    /// [`VoteStrategy::Optimistic`] the cached count is bumped by exactly 1
    /// ahead of confirmation and reverted on failure; the server's record,
    /// when it arrives, is assigned absolutely so the count is never double
    /// applied. The ledger is session-scoped, so vote settlement ignores
    /// view invalidation; only cache commits are epoch-guarded.
    pub async fn upvote(&self, id: &PolicyId) -> FeedResult<VoteOutcome> {
        let epoch = {
            let mut state = self.state()?;
            if !state.ledger.reserve(id.clone()) {
                return Ok(VoteOutcome::AlreadyVoted);
            }
            if self.vote_strategy == VoteStrategy::Optimistic {
                state.cache.apply_optimistic_vote(id);
            }
            state.epoch
        };

        debug!(policy = %id, "dispatching upvote");
        let result = self.remote.upvote_policy(id).await;

        let mut state = self.state()?;
        let live = state.epoch == epoch;
        match result {
            Ok(UpvoteReply::Updated(policy)) => {
                state.ledger.confirm(id);
                if live {
                    state.cache.replace(policy);
                }
                Ok(VoteOutcome::Applied)
            }
            Ok(UpvoteReply::Conflict { message }) => {
                // The server is the source of truth for duplicates: keep the
                // vote on record locally and undo the speculative bump.
                if live {
                    state.cache.revert_optimistic_vote(id);
                }
                state.ledger.confirm(id);
                warn!(policy = %id, %message, "upvote conflict");
                Ok(VoteOutcome::AlreadyVoted)
            }
            Err(err) => {
                if live {
                    state.cache.revert_optimistic_vote(id);
                }
                state.ledger.release(id);
                warn!(policy = %id, error = %err, "upvote failed");
                Ok(VoteOutcome::Failed(err))
            }
        }
    }

    /// Union the server's record of this user's votes into the ledger.
    /// Returns how many were new locally.
    pub async fn hydrate_votes(&self) -> FeedResult<usize> {
        let votes = self.remote.user_votes().await?;
        let mut state = self.state()?;
        Ok(state.ledger.hydrate(votes))
    }

    // ------------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------------

    /// Fetch a single record. Mutates nothing.
    pub async fn get_policy(&self, id: &PolicyId) -> FeedResult<Policy> {
        Ok(self.remote.get_policy(id).await?)
    }

    /// Replace the feed view with the authenticated user's own records
    /// (dashboard). The endpoint is unpaginated, so the cursor settles
    /// exhausted; the dashboard pages client-side.
    pub async fn load_user_policies(&self) -> FeedResult<usize> {
        let policies = self.remote.user_policies().await?;
        let mut state = self.state()?;
        state.epoch = state.epoch.wrapping_add(1);
        state.cache.reset();
        let count = state.cache.merge(policies);
        state.cursor.mark_exhausted(count as i64);
        Ok(count)
    }

    /// Create a record and append the server's copy to the feed.
    pub async fn create_policy(&self, draft: &PolicyDraft) -> FeedResult<Policy> {
        let policy = self.remote.create_policy(draft).await?;
        let mut state = self.state()?;
        state.cache.merge(std::iter::once(policy.clone()));
        Ok(policy)
    }

    /// Update a record. The server acknowledges without returning the
    /// record, so the cached copy refreshes on the next fetch cycle.
    pub async fn update_policy(&self, id: &PolicyId, draft: &PolicyDraft) -> FeedResult<Ack> {
        Ok(self.remote.update_policy(id, draft).await?)
    }

    /// Delete a record and drop it from the feed.
    pub async fn delete_policy(&self, id: &PolicyId) -> FeedResult<Ack> {
        let ack = self.remote.delete_policy(id).await?;
        let mut state = self.state()?;
        if state.cache.remove(id) {
            state.cursor.decrement_total();
        }
        Ok(ack)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// The cached records in feed order, decorated with vote status.
    pub fn snapshot(&self) -> FeedResult<Vec<PolicyView>> {
        let state = self.state()?;
        Ok(state
            .cache
            .iter()
            .map(|policy| PolicyView {
                has_voted: state.ledger.has_voted(&policy.policy_id),
                vote_pending: state.ledger.is_pending(&policy.policy_id),
                policy: policy.clone(),
            })
            .collect())
    }

    pub fn has_voted(&self, id: &PolicyId) -> FeedResult<bool> {
        Ok(self.state()?.ledger.is_settled(id))
    }

    pub fn filters(&self) -> FeedResult<FilterSpec> {
        Ok(self.state()?.filters.clone())
    }

    pub fn cached_len(&self) -> FeedResult<usize> {
        Ok(self.state()?.cache.len())
    }

    pub fn has_more(&self) -> FeedResult<bool> {
        Ok(self.state()?.cursor.has_more())
    }

    pub fn total_count(&self) -> FeedResult<i64> {
        Ok(self.state()?.cursor.total_count())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::Owner;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Semaphore;

    fn sample_policy(id: &str, votes: i64) -> Policy {
        Policy {
            policy_id: PolicyId::from(id),
            title: format!("Policy {}", id),
            description: "test".to_string(),
            category: "Civic".to_string(),
            vote_count: votes,
            owner: Owner {
                owner_id: "u1".to_string(),
                name: "A".to_string(),
                email: "a@example.org".to_string(),
            },
            created_at: chrono::Utc::now(),
        }
    }

    fn page(ids: &[(&str, i64)], has_more: bool, total: i64) -> PolicyPage {
        PolicyPage {
            policies: ids.iter().map(|(id, v)| sample_policy(id, *v)).collect(),
            has_more,
            total_policies: total,
        }
    }

    fn network_error() -> ApiClientError {
        ApiClientError::InvalidResponse("HTTP 500: boom".to_string())
    }

    /// Scripted remote: answers from queues, optionally parking each call on
    /// a semaphore so tests can observe in-flight state.
    #[derive(Default)]
    struct ScriptedRemote {
        pages: StdMutex<VecDeque<Result<PolicyPage, ApiClientError>>>,
        upvotes: StdMutex<VecDeque<Result<UpvoteReply, ApiClientError>>>,
        list_calls: AtomicUsize,
        upvote_calls: AtomicUsize,
        last_request: StdMutex<Option<ListPoliciesRequest>>,
        gate: StdMutex<Option<Arc<Semaphore>>>,
    }

    impl ScriptedRemote {
        fn push_page(&self, page: Result<PolicyPage, ApiClientError>) {
            self.pages.lock().unwrap().push_back(page);
        }

        fn push_upvote(&self, reply: Result<UpvoteReply, ApiClientError>) {
            self.upvotes.lock().unwrap().push_back(reply);
        }

        fn gate_on(&self, semaphore: Arc<Semaphore>) {
            *self.gate.lock().unwrap() = Some(semaphore);
        }

        async fn wait_at_gate(&self) {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(semaphore) = gate {
                semaphore.acquire().await.unwrap().forget();
            }
        }
    }

    #[async_trait]
    impl RemoteDataSource for ScriptedRemote {
        async fn list_policies(
            &self,
            request: &ListPoliciesRequest,
        ) -> Result<PolicyPage, ApiClientError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.wait_at_gate().await;
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiClientError::InvalidResponse("unscripted".into())))
        }

        async fn get_policy(&self, _id: &PolicyId) -> Result<Policy, ApiClientError> {
            Err(ApiClientError::InvalidResponse("unscripted".into()))
        }

        async fn user_policies(&self) -> Result<Vec<Policy>, ApiClientError> {
            Err(ApiClientError::InvalidResponse("unscripted".into()))
        }

        async fn user_votes(&self) -> Result<Vec<PolicyId>, ApiClientError> {
            Ok(vec![])
        }

        async fn upvote_policy(&self, _id: &PolicyId) -> Result<UpvoteReply, ApiClientError> {
            self.upvote_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_at_gate().await;
            self.upvotes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiClientError::InvalidResponse("unscripted".into())))
        }

        async fn create_policy(&self, _draft: &PolicyDraft) -> Result<Policy, ApiClientError> {
            Err(ApiClientError::InvalidResponse("unscripted".into()))
        }

        async fn update_policy(
            &self,
            _id: &PolicyId,
            _draft: &PolicyDraft,
        ) -> Result<Ack, ApiClientError> {
            Err(ApiClientError::InvalidResponse("unscripted".into()))
        }

        async fn delete_policy(&self, _id: &PolicyId) -> Result<Ack, ApiClientError> {
            Err(ApiClientError::InvalidResponse("unscripted".into()))
        }
    }

    fn session(remote: Arc<ScriptedRemote>) -> Arc<FeedSession<ScriptedRemote>> {
        Arc::new(FeedSession::new(remote, FeedConfig::new()))
    }

    async fn wait_until(counter: &AtomicUsize, value: usize) {
        while counter.load(Ordering::SeqCst) < value {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_fetch_merges_and_advances() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Ok(page(&[("p1", 1), ("p2", 2)], true, 4)));
        let session = session(remote.clone());

        let outcome = session.fetch_next().await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Fetched {
                appended: 2,
                total_count: 4,
                has_more: true
            }
        );
        assert_eq!(session.cached_len().unwrap(), 2);
        assert_eq!(session.total_count().unwrap(), 4);
        let request = remote.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.page, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_retryable_at_same_page() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Err(network_error()));
        remote.push_page(Ok(page(&[("p1", 1)], false, 1)));
        let session = session(remote.clone());

        assert!(matches!(
            session.fetch_next().await,
            Err(FeedError::Remote(_))
        ));
        assert_eq!(session.cached_len().unwrap(), 0);

        // Same page again, no skipped records.
        session.fetch_next().await.unwrap();
        let request = remote.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(session.cached_len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_single_flight_drops_concurrent_fetch() {
        let remote = Arc::new(ScriptedRemote::default());
        let gate = Arc::new(Semaphore::new(0));
        remote.gate_on(gate.clone());
        remote.push_page(Ok(page(&[("p1", 1)], false, 1)));
        let session = session(remote.clone());

        let background = {
            let session = session.clone();
            tokio::spawn(async move { session.fetch_next().await })
        };
        wait_until(&remote.list_calls, 1).await;

        // The gate holds the first call; everyone else is dropped.
        assert_eq!(session.fetch_next().await.unwrap(), FetchOutcome::InFlight);
        assert_eq!(session.fetch_next().await.unwrap(), FetchOutcome::InFlight);
        assert_eq!(remote.list_calls.load(Ordering::SeqCst), 1);

        gate.add_permits(1);
        let outcome = background.await.unwrap().unwrap();
        assert!(matches!(outcome, FetchOutcome::Fetched { appended: 1, .. }));
        assert_eq!(remote.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_filter_change_supersedes_in_flight_page() {
        let remote = Arc::new(ScriptedRemote::default());
        let gate = Arc::new(Semaphore::new(0));
        remote.gate_on(gate.clone());
        remote.push_page(Ok(page(&[("p1", 1)], true, 10)));
        let session = session(remote.clone());

        let background = {
            let session = session.clone();
            tokio::spawn(async move { session.fetch_next().await })
        };
        wait_until(&remote.list_calls, 1).await;

        let changed = session
            .set_filters(FilterSpec::new().with_category("Energy"))
            .unwrap();
        assert!(changed);

        gate.add_permits(1);
        let outcome = background.await.unwrap().unwrap();
        assert_eq!(outcome, FetchOutcome::Superseded);
        assert_eq!(session.cached_len().unwrap(), 0);
        assert_eq!(session.total_count().unwrap(), 0);

        // The next fetch starts over at page 1 under the new spec.
        gate.add_permits(1);
        remote.push_page(Ok(page(&[("p9", 0)], false, 1)));
        session.fetch_next().await.unwrap();
        let request = remote.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.page, 1);
        assert!(request.filters.categories.contains("Energy"));
    }

    #[tokio::test]
    async fn test_set_filters_same_spec_is_noop() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Ok(page(&[("p1", 1)], true, 10)));
        let session = session(remote.clone());
        session.fetch_next().await.unwrap();

        let changed = session.set_filters(FilterSpec::new()).unwrap();
        assert!(!changed);
        assert_eq!(session.cached_len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_optimistic_upvote_applied() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Ok(page(&[("p1", 4)], false, 1)));
        remote.push_upvote(Ok(UpvoteReply::Updated(sample_policy("p1", 5))));
        let session = session(remote.clone());
        session.fetch_next().await.unwrap();

        let id = PolicyId::from("p1");
        let outcome = session.upvote(&id).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::Applied));

        let views = session.snapshot().unwrap();
        assert_eq!(views[0].policy.vote_count, 5);
        assert!(views[0].has_voted);
        assert!(!views[0].vote_pending);

        // Repeat is a local no-op; the scripted queue is untouched.
        let outcome = session.upvote(&id).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::AlreadyVoted));
        assert_eq!(remote.upvote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_upvote_rejected_while_first_in_flight() {
        let remote = Arc::new(ScriptedRemote::default());
        let gate = Arc::new(Semaphore::new(0));
        remote.push_page(Ok(page(&[("p1", 4)], false, 1)));
        let session = session(remote.clone());
        session.fetch_next().await.unwrap();

        remote.gate_on(gate.clone());
        remote.push_upvote(Ok(UpvoteReply::Updated(sample_policy("p1", 5))));

        let id = PolicyId::from("p1");
        let background = {
            let session = session.clone();
            let id = id.clone();
            tokio::spawn(async move { session.upvote(&id).await })
        };
        wait_until(&remote.upvote_calls, 1).await;

        // Optimistic bump is already visible, and the reservation blocks a
        // duplicate before the first call resolves.
        let views = session.snapshot().unwrap();
        assert_eq!(views[0].policy.vote_count, 5);
        assert!(views[0].vote_pending);
        let second = session.upvote(&id).await.unwrap();
        assert!(matches!(second, VoteOutcome::AlreadyVoted));

        gate.add_permits(1);
        let first = background.await.unwrap().unwrap();
        assert!(matches!(first, VoteOutcome::Applied));
        assert_eq!(remote.upvote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.snapshot().unwrap()[0].policy.vote_count, 5);
    }

    #[tokio::test]
    async fn test_upvote_conflict_reverts_and_records_vote() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Ok(page(&[("p1", 4)], false, 1)));
        remote.push_upvote(Ok(UpvoteReply::Conflict {
            message: "You have already voted.".to_string(),
        }));
        let session = session(remote.clone());
        session.fetch_next().await.unwrap();

        let id = PolicyId::from("p1");
        let outcome = session.upvote(&id).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::AlreadyVoted));

        // Count restored, vote on record per the server.
        let views = session.snapshot().unwrap();
        assert_eq!(views[0].policy.vote_count, 4);
        assert!(views[0].has_voted);
    }

    #[tokio::test]
    async fn test_upvote_failure_rolls_back_and_allows_retry() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Ok(page(&[("p1", 4)], false, 1)));
        remote.push_upvote(Err(network_error()));
        remote.push_upvote(Ok(UpvoteReply::Updated(sample_policy("p1", 5))));
        let session = session(remote.clone());
        session.fetch_next().await.unwrap();

        let id = PolicyId::from("p1");
        let outcome = session.upvote(&id).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::Failed(_)));

        let views = session.snapshot().unwrap();
        assert_eq!(views[0].policy.vote_count, 4);
        assert!(!views[0].has_voted);
        assert!(!views[0].vote_pending);

        // The reservation was released; a retry goes through.
        let outcome = session.upvote(&id).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::Applied));
        assert_eq!(session.snapshot().unwrap()[0].policy.vote_count, 5);
    }

    #[tokio::test]
    async fn test_confirmed_strategy_defers_visible_count() {
        let remote = Arc::new(ScriptedRemote::default());
        let gate = Arc::new(Semaphore::new(0));
        remote.push_page(Ok(page(&[("p1", 4)], false, 1)));
        let session = Arc::new(FeedSession::new(
            remote.clone(),
            FeedConfig::new().with_vote_strategy(VoteStrategy::Confirmed),
        ));
        session.fetch_next().await.unwrap();

        remote.gate_on(gate.clone());
        remote.push_upvote(Ok(UpvoteReply::Updated(sample_policy("p1", 5))));

        let id = PolicyId::from("p1");
        let background = {
            let session = session.clone();
            let id = id.clone();
            tokio::spawn(async move { session.upvote(&id).await })
        };
        wait_until(&remote.upvote_calls, 1).await;

        // No visible change until the server confirms, but the reservation
        // still blocks duplicates.
        assert_eq!(session.snapshot().unwrap()[0].policy.vote_count, 4);
        let second = session.upvote(&id).await.unwrap();
        assert!(matches!(second, VoteOutcome::AlreadyVoted));

        gate.add_permits(1);
        let first = background.await.unwrap().unwrap();
        assert!(matches!(first, VoteOutcome::Applied));
        assert_eq!(session.snapshot().unwrap()[0].policy.vote_count, 5);
    }

    #[tokio::test]
    async fn test_invalidate_discards_view_but_keeps_ledger() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_page(Ok(page(&[("p1", 4)], true, 10)));
        remote.push_upvote(Ok(UpvoteReply::Updated(sample_policy("p1", 5))));
        let session = session(remote.clone());
        session.fetch_next().await.unwrap();
        session.upvote(&PolicyId::from("p1")).await.unwrap();

        session.invalidate().unwrap();
        assert_eq!(session.cached_len().unwrap(), 0);
        assert!(session.has_voted(&PolicyId::from("p1")).unwrap());

        // Pagination starts over.
        remote.push_page(Ok(page(&[("p1", 5)], false, 1)));
        session.fetch_next().await.unwrap();
        let request = remote.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.page, 1);
    }

    #[tokio::test]
    async fn test_upvote_of_uncached_record_still_settles_ledger() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.push_upvote(Ok(UpvoteReply::Updated(sample_policy("p7", 3))));
        let session = session(remote.clone());

        let id = PolicyId::from("p7");
        let outcome = session.upvote(&id).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::Applied));
        assert!(session.has_voted(&id).unwrap());
        // The authoritative record was inserted via replace.
        assert_eq!(session.cached_len().unwrap(), 1);
    }
}
