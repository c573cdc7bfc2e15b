//! Agora feed engine.
//!
//! Maintains a deduplicated, order-stable local view of the remote policy
//! collection, paginates through it behind a single-flight gate, tracks the
//! session's votes, and applies optimistic vote mutations with rollback.
//!
//! Consumers construct a [`FeedSession`] around any
//! [`agora_api::RemoteDataSource`] and share it via `Arc`; there is no
//! ambient global state.

pub mod cache;
pub mod cursor;
pub mod ledger;
pub mod session;

pub use cache::FeedCache;
pub use cursor::{Admission, FetchPhase, PaginationCursor};
pub use ledger::VoteLedger;
pub use session::{
    FeedConfig, FeedError, FeedResult, FeedSession, FetchOutcome, PolicyView, VoteOutcome,
    VoteStrategy,
};
