//! Per-session record of the user's votes.

use agora_core::PolicyId;
use std::collections::HashSet;

/// Which policies this session has upvoted, plus in-flight reservations.
///
/// The voted set grows monotonically within a session - there is no unvote.
/// Reservations close the check-then-act race: an id is marked pending
/// synchronously at admission, before the network call is dispatched, so a
/// concurrent duplicate is rejected immediately instead of racing the
/// server. The ledger outlives filter changes; it is scoped to the
/// authenticated session, not to a feed view.
#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    voted: HashSet<PolicyId>,
    pending: HashSet<PolicyId>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, id: &PolicyId) -> bool {
        self.voted.contains(id)
    }

    pub fn is_pending(&self, id: &PolicyId) -> bool {
        self.pending.contains(id)
    }

    /// Voted or reserved - either way a new vote must be refused.
    pub fn is_settled(&self, id: &PolicyId) -> bool {
        self.voted.contains(id) || self.pending.contains(id)
    }

    /// Atomically claim the id for an in-flight vote. Returns false if the
    /// id is already voted or reserved; nothing changes in that case.
    pub fn reserve(&mut self, id: PolicyId) -> bool {
        if self.is_settled(&id) {
            return false;
        }
        self.pending.insert(id);
        true
    }

    /// Settle a reservation (or a server-taught vote) into the voted set.
    pub fn confirm(&mut self, id: &PolicyId) {
        self.pending.remove(id);
        self.voted.insert(id.clone());
    }

    /// Drop a reservation after a failed dispatch so the vote can be
    /// retried. Returns whether a reservation existed.
    pub fn release(&mut self, id: &PolicyId) -> bool {
        self.pending.remove(id)
    }

    /// Union server-known votes into the voted set. Returns how many were
    /// new locally. Never removes anything.
    pub fn hydrate(&mut self, ids: impl IntoIterator<Item = PolicyId>) -> usize {
        let mut added = 0;
        for id in ids {
            if self.voted.insert(id) {
                added += 1;
            }
        }
        added
    }

    pub fn voted_count(&self) -> usize {
        self.voted.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
