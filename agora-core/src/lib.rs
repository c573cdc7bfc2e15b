//! Agora Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Server-issued policy identifier.
///
/// The server mints these (Mongo-style object ids on the wire); the client
/// never generates one. Treated as an opaque, ordered, hashable string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PolicyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PolicyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// ENUMS
// ============================================================================

/// Sort key for feed queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest first
    #[default]
    Date,
    /// Highest vote count first
    Votes,
}

impl SortKey {
    /// Wire value used in query strings.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Votes => "votes",
        }
    }
}

// ============================================================================
// CORE ENTITY STRUCTS
// ============================================================================

/// Author of a policy. Opaque reference data, never mutated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "_id")]
    pub owner_id: String,
    pub name: String,
    pub email: String,
}

/// A votable policy proposal.
///
/// Identity is `policy_id`. Every field is immutable client-side except
/// `vote_count`, which only the feed engine's mutation protocol may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "_id")]
    pub policy_id: PolicyId,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "votes")]
    pub vote_count: i64,
    pub owner: Owner,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
}

/// Payload for creating or updating a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDraft {
    pub title: String,
    pub description: String,
    pub category: String,
}

// ============================================================================
// FILTER SPEC
// ============================================================================

/// The active filter/sort criteria scoping one feed view.
///
/// Value type: equality is by content, so two specs built from the same
/// categories in a different order compare equal. Any change to a spec
/// invalidates the pagination state of the view it scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub categories: BTreeSet<String>,
    pub years: BTreeSet<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: SortKey,
}

impl FilterSpec {
    /// Unfiltered spec: all categories, all years, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.years.insert(year.into());
        self
    }

    pub fn with_sort(mut self, sort_by: SortKey) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// True when no category or year constraint is active.
    pub fn is_unconstrained(&self) -> bool {
        self.categories.is_empty() && self.years.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
