//! Legacy response envelope normalization.

use crate::error::ApiClientError;
use serde::Deserialize;

/// The server's ad hoc `{success, message, data}` envelope.
///
/// Several endpoints wrap their payload in this shape with per-endpoint
/// variations in which fields are present. It is normalized into a plain
/// `Result` at the client boundary and never returned to callers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Normalize to the payload, mapping `success: false` to a rejection.
    pub fn into_result(self) -> Result<T, ApiClientError> {
        if !self.success {
            return Err(ApiClientError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        self.data.ok_or_else(|| {
            ApiClientError::InvalidResponse("successful envelope carried no data".to_string())
        })
    }

    /// Normalize to the server message, for endpoints that return no record.
    pub fn into_ack(self) -> Result<super::Ack, ApiClientError> {
        if !self.success {
            return Err(ApiClientError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        Ok(super::Ack {
            message: self.message.unwrap_or_default(),
        })
    }
}
