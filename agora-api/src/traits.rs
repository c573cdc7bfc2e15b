//! The remote data source seam.

use crate::error::ApiClientError;
use crate::types::{Ack, ListPoliciesRequest, PolicyPage, UpvoteReply};
use agora_core::{Policy, PolicyDraft, PolicyId};
use async_trait::async_trait;

/// Everything the feed engine needs from the server.
///
/// Implemented by [`crate::RestClient`] for production and by programmable
/// mocks in engine tests. All methods return normalized payloads; the
/// `{success, message, data}` envelopes are resolved behind this boundary.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// One page of the feed under the request's filters.
    async fn list_policies(
        &self,
        request: &ListPoliciesRequest,
    ) -> Result<PolicyPage, ApiClientError>;

    /// A single record by id.
    async fn get_policy(&self, id: &PolicyId) -> Result<Policy, ApiClientError>;

    /// The authenticated user's own records.
    async fn user_policies(&self) -> Result<Vec<Policy>, ApiClientError>;

    /// Ids of every policy the authenticated user has upvoted.
    async fn user_votes(&self) -> Result<Vec<PolicyId>, ApiClientError>;

    /// Register an upvote. A duplicate vote is reported in-band as
    /// [`UpvoteReply::Conflict`], not as an error.
    async fn upvote_policy(&self, id: &PolicyId) -> Result<UpvoteReply, ApiClientError>;

    /// Create a record, returning the server's authoritative copy.
    async fn create_policy(&self, draft: &PolicyDraft) -> Result<Policy, ApiClientError>;

    /// Update a record. The server acknowledges without returning the record.
    async fn update_policy(
        &self,
        id: &PolicyId,
        draft: &PolicyDraft,
    ) -> Result<Ack, ApiClientError>;

    /// Delete a record.
    async fn delete_policy(&self, id: &PolicyId) -> Result<Ack, ApiClientError>;
}
