use std::collections::BTreeSet;

use crate::domain::entities::ThreadId;

/// Rooms a channel should be in, independent of the live connection.
///
/// The connection task diffs this against the rooms it has actually joined,
/// so membership survives reconnects and repeated joins emit nothing.
#[derive(Debug, Default, Clone)]
pub struct RoomRegistry {
    desired: BTreeSet<ThreadId>,
}

/// Frames needed to bring a connection in line with the registry.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RoomDiff {
    pub join: Vec<ThreadId>,
    pub leave: Vec<ThreadId>,
}

impl RoomDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.join.is_empty() && self.leave.is_empty()
    }
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the room was already wanted.
    pub fn join(&mut self, thread_id: &ThreadId) -> bool {
        self.desired.insert(thread_id.clone())
    }

    pub fn leave(&mut self, thread_id: &ThreadId) -> bool {
        self.desired.remove(thread_id)
    }

    pub fn clear(&mut self) -> usize {
        let count = self.desired.len();
        self.desired.clear();
        count
    }

    #[must_use]
    pub fn contains(&self, thread_id: &ThreadId) -> bool {
        self.desired.contains(thread_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.desired.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }

    #[must_use]
    pub fn diff(&self, joined: &BTreeSet<ThreadId>) -> RoomDiff {
        RoomDiff {
            join: self.desired.difference(joined).cloned().collect(),
            leave: joined.difference(&self.desired).cloned().collect(),
        }
    }
}
