//! Vote wire types.

use agora_core::{Policy, PolicyId};
use serde::{Deserialize, Serialize};

/// The current user's recorded votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesResponse {
    pub votes: Vec<PolicyId>,
}

/// Reply to an upvote request.
///
/// A conflict ("already voted") is in-band data, not a transport failure:
/// the server is the source of truth for duplicate votes across sessions
/// and devices.
#[derive(Debug, Clone, PartialEq)]
pub enum UpvoteReply {
    /// The authoritative record after the vote was counted.
    Updated(Policy),
    /// The server refused the vote as a duplicate.
    Conflict { message: String },
}

/// Raw upvote response body. The endpoint answers with either a bare policy
/// record or a `{success, message}` envelope, so parsing is untagged.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UpvoteWire {
    Policy(Policy),
    Envelope {
        success: bool,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        data: Option<Policy>,
    },
}

impl UpvoteWire {
    pub(crate) fn into_reply(self) -> Result<UpvoteReply, crate::error::ApiClientError> {
        match self {
            UpvoteWire::Policy(policy) => Ok(UpvoteReply::Updated(policy)),
            UpvoteWire::Envelope {
                success: true,
                data: Some(policy),
                ..
            } => Ok(UpvoteReply::Updated(policy)),
            UpvoteWire::Envelope {
                success: false,
                message,
                ..
            } => Ok(UpvoteReply::Conflict {
                message: message.unwrap_or_else(|| "already voted".to_string()),
            }),
            UpvoteWire::Envelope { data: None, .. } => Err(
                crate::error::ApiClientError::InvalidResponse(
                    "upvote reply carried no record".to_string(),
                ),
            ),
        }
    }
}
