//! Deduplicated, insertion-ordered policy cache for one feed view.

use agora_core::{Policy, PolicyId};

#[derive(Debug, Clone)]
struct FeedEntry {
    policy: Policy,
    /// Prior authoritative vote count while an optimistic bump is in flight.
    pending_vote: Option<i64>,
}

/// The records visible to consumers of one feed view.
///
/// Keyed by id, no duplicates. Once appended, a record keeps its relative
/// position: order reflects first-seen page order, not server sort, except
/// immediately after [`FeedCache::reset`]. `merge` never overwrites fields
/// of a record that is already present - after first insertion the vote
/// protocol is the only writer of `vote_count`.
#[derive(Debug, Clone, Default)]
pub struct FeedCache {
    entries: Vec<FeedEntry>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &PolicyId) -> Option<usize> {
        self.entries.iter().position(|e| &e.policy.policy_id == id)
    }

    /// Append records whose id is not already present, in the order
    /// received. Returns how many were appended.
    pub fn merge(&mut self, records: impl IntoIterator<Item = Policy>) -> usize {
        let mut appended = 0;
        for record in records {
            if self.position(&record.policy_id).is_none() {
                self.entries.push(FeedEntry {
                    policy: record,
                    pending_vote: None,
                });
                appended += 1;
            }
        }
        appended
    }

    /// Overwrite by id with an authoritative server record, or insert at the
    /// tail if absent. The vote count is assigned absolutely - never summed
    /// with a local increment - and any pending marker is cleared.
    pub fn replace(&mut self, record: Policy) {
        match self.position(&record.policy_id) {
            Some(index) => {
                self.entries[index] = FeedEntry {
                    policy: record,
                    pending_vote: None,
                };
            }
            None => {
                self.entries.push(FeedEntry {
                    policy: record,
                    pending_vote: None,
                });
            }
        }
    }

    /// Drop the record if present. Returns whether anything was removed.
    pub fn remove(&mut self, id: &PolicyId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Clear all records.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Bump the record's vote count by exactly 1 ahead of confirmation,
    /// remembering the prior authoritative count. Returns false if the
    /// record is absent or a bump is already pending.
    pub fn apply_optimistic_vote(&mut self, id: &PolicyId) -> bool {
        match self.position(id) {
            Some(index) => {
                let entry = &mut self.entries[index];
                if entry.pending_vote.is_some() {
                    return false;
                }
                entry.pending_vote = Some(entry.policy.vote_count);
                entry.policy.vote_count += 1;
                true
            }
            None => false,
        }
    }

    /// Restore the prior authoritative count. Returns false if no bump was
    /// pending.
    pub fn revert_optimistic_vote(&mut self, id: &PolicyId) -> bool {
        match self.position(id) {
            Some(index) => {
                let entry = &mut self.entries[index];
                match entry.pending_vote.take() {
                    Some(prior) => {
                        entry.policy.vote_count = prior;
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    pub fn vote_pending(&self, id: &PolicyId) -> bool {
        self.position(id)
            .map(|index| self.entries[index].pending_vote.is_some())
            .unwrap_or(false)
    }

    pub fn get(&self, id: &PolicyId) -> Option<&Policy> {
        self.position(id).map(|index| &self.entries[index].policy)
    }

    pub fn contains(&self, id: &PolicyId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.entries.iter().map(|e| &e.policy)
    }

    pub fn ids(&self) -> Vec<PolicyId> {
        self.entries
            .iter()
            .map(|e| e.policy.policy_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
