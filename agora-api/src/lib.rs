//! Remote data source for the Agora policy feed.
//!
//! The feed engine never talks HTTP directly: it consumes the
//! [`RemoteDataSource`] trait, implemented here by [`RestClient`] and by
//! programmable mocks in tests. Authentication, retry, and rate limiting are
//! the server's concern; this layer injects a bearer token and a timeout,
//! nothing more.

pub mod client;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use client::RestClient;
pub use config::{AuthConfig, ClientConfig, ConfigError};
pub use error::ApiClientError;
pub use traits::RemoteDataSource;
pub use types::*;
