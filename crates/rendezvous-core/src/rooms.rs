//! Room table: room id → ordered members, at most [`ROOM_CAPACITY`] of them.
//!
//! The table owns its synchronisation. Rooms live in a [`DashMap`], so every
//! read-modify-write below runs under the write lock of the shard holding
//! that room id: operations on one room are serialised, operations on rooms in
//! other shards proceed in parallel. Stored rooms are never empty.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::ids::{RoomId, SessionId};

/// Maximum members per room.
pub const ROOM_CAPACITY: usize = 2;

/// Result of [`RoomTable::join_or_reject`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The room already holds [`ROOM_CAPACITY`] sessions; nothing changed.
    Full,
    /// The session was already in the room; nothing changed.
    AlreadyMember,
    /// The session is now the only member.
    Waiting,
    /// The session is the second member; `other` is the one already there.
    Paired {
        /// The member that joined first.
        other: SessionId,
    },
}

impl JoinOutcome {
    /// Whether the session is a member of the room after this outcome.
    pub fn is_member(&self) -> bool {
        !matches!(self, Self::Full)
    }
}

/// Result of a successful [`RoomTable::remove_member`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Members left behind, in join order. Empty means the room was deleted.
    pub remaining: Vec<SessionId>,
}

impl LeaveOutcome {
    /// Whether the removal emptied (and therefore deleted) the room.
    pub fn room_deleted(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Process-wide room table.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: DashMap<RoomId, Vec<SessionId>>,
}

impl RoomTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current members of `room` in join order (empty if the room does not exist).
    pub fn members(&self, room: &RoomId) -> Vec<SessionId> {
        self.rooms
            .get(room)
            .map(|members| members.value().clone())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room exists.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Ids of every room that currently lists `session`.
    pub fn rooms_containing(&self, session: &SessionId) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().contains(session))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Atomically add `session` to `room` unless the room is full.
    ///
    /// `on_commit` runs with the outcome before the room's lock is released,
    /// so whatever it sends is ordered against every other operation on the
    /// same room. It must not call back into this table.
    pub fn join_or_reject<F>(&self, room: &RoomId, session: &SessionId, on_commit: F) -> JoinOutcome
    where
        F: FnOnce(&JoinOutcome),
    {
        match self.rooms.entry(room.clone()) {
            Entry::Occupied(mut entry) => {
                let members = entry.get_mut();
                let outcome = if members.len() >= ROOM_CAPACITY {
                    JoinOutcome::Full
                } else if members.contains(session) {
                    JoinOutcome::AlreadyMember
                } else {
                    members.push(session.clone());
                    match members.iter().find(|m| *m != session) {
                        Some(other) if members.len() == ROOM_CAPACITY => JoinOutcome::Paired {
                            other: other.clone(),
                        },
                        _ => JoinOutcome::Waiting,
                    }
                };
                on_commit(&outcome);
                outcome
            }
            Entry::Vacant(entry) => {
                let _guard = entry.insert(vec![session.clone()]);
                let outcome = JoinOutcome::Waiting;
                on_commit(&outcome);
                outcome
            }
        }
    }

    /// Atomically remove `session` from `room`, deleting the room if it empties.
    ///
    /// Returns `None` (and skips `on_commit`) when the room does not exist or
    /// `session` is not a member. `on_commit` runs under the room's lock, after
    /// the removal and before the room is deleted or its members persisted.
    pub fn remove_member<F>(
        &self,
        room: &RoomId,
        session: &SessionId,
        on_commit: F,
    ) -> Option<LeaveOutcome>
    where
        F: FnOnce(&LeaveOutcome),
    {
        let Entry::Occupied(mut entry) = self.rooms.entry(room.clone()) else {
            return None;
        };
        let members = entry.get_mut();
        let index = members.iter().position(|m| m == session)?;
        let _ = members.remove(index);
        let outcome = LeaveOutcome {
            remaining: members.clone(),
        };
        on_commit(&outcome);
        if outcome.room_deleted() {
            let _ = entry.remove();
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    fn rid(s: &str) -> RoomId {
        RoomId::from(s)
    }

    #[test]
    fn first_join_creates_room() {
        let table = RoomTable::new();
        let outcome = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        assert_eq!(outcome, JoinOutcome::Waiting);
        assert_eq!(table.members(&rid("r1")), vec![sid("a")]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn second_join_pairs_with_first() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let outcome = table.join_or_reject(&rid("r1"), &sid("b"), |_| {});
        assert_eq!(outcome, JoinOutcome::Paired { other: sid("a") });
        assert_eq!(table.members(&rid("r1")), vec![sid("a"), sid("b")]);
    }

    #[test]
    fn third_join_is_rejected() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let _ = table.join_or_reject(&rid("r1"), &sid("b"), |_| {});
        let outcome = table.join_or_reject(&rid("r1"), &sid("c"), |_| {});
        assert_eq!(outcome, JoinOutcome::Full);
        assert!(!outcome.is_member());
        assert_eq!(table.members(&rid("r1")), vec![sid("a"), sid("b")]);
    }

    #[test]
    fn repeat_join_does_not_duplicate() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let outcome = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        assert_eq!(outcome, JoinOutcome::AlreadyMember);
        assert_eq!(table.members(&rid("r1")), vec![sid("a")]);
    }

    #[test]
    fn full_room_rejects_even_existing_member() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let _ = table.join_or_reject(&rid("r1"), &sid("b"), |_| {});
        let outcome = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        assert_eq!(outcome, JoinOutcome::Full);
    }

    #[test]
    fn on_commit_sees_outcome() {
        let table = RoomTable::new();
        let mut seen = None;
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |o| seen = Some(o.clone()));
        assert_eq!(seen, Some(JoinOutcome::Waiting));
    }

    #[test]
    fn remove_preserves_order_of_rest() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let _ = table.join_or_reject(&rid("r1"), &sid("b"), |_| {});
        let outcome = table.remove_member(&rid("r1"), &sid("a"), |_| {}).unwrap();
        assert_eq!(outcome.remaining, vec![sid("b")]);
        assert!(!outcome.room_deleted());
        assert_eq!(table.members(&rid("r1")), vec![sid("b")]);
    }

    #[test]
    fn removing_last_member_deletes_room() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let outcome = table.remove_member(&rid("r1"), &sid("a"), |_| {}).unwrap();
        assert!(outcome.room_deleted());
        assert!(table.is_empty());
        assert!(table.members(&rid("r1")).is_empty());
    }

    #[test]
    fn remove_non_member_is_noop() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let mut called = false;
        let outcome = table.remove_member(&rid("r1"), &sid("z"), |_| called = true);
        assert!(outcome.is_none());
        assert!(!called);
        assert_eq!(table.members(&rid("r1")), vec![sid("a")]);
    }

    #[test]
    fn remove_from_unknown_room_is_noop() {
        let table = RoomTable::new();
        assert!(table.remove_member(&rid("ghost"), &sid("a"), |_| {}).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn rooms_containing_finds_every_room() {
        let table = RoomTable::new();
        let _ = table.join_or_reject(&rid("r1"), &sid("a"), |_| {});
        let _ = table.join_or_reject(&rid("r2"), &sid("a"), |_| {});
        let _ = table.join_or_reject(&rid("r3"), &sid("b"), |_| {});
        let mut rooms = table.rooms_containing(&sid("a"));
        rooms.sort();
        assert_eq!(rooms, vec![rid("r1"), rid("r2")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_respect_capacity() {
        let table = Arc::new(RoomTable::new());
        let pairings = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for i in 0..32 {
            let table = Arc::clone(&table);
            let pairings = Arc::clone(&pairings);
            handles.push(tokio::spawn(async move {
                table.join_or_reject(&RoomId::from("hot"), &SessionId::from(format!("s{i}")), |o| {
                    if matches!(o, JoinOutcome::Paired { .. }) {
                        let _ = pairings.fetch_add(1, Ordering::SeqCst);
                    }
                })
            }));
        }
        let mut members = 0;
        for handle in handles {
            if handle.await.unwrap().is_member() {
                members += 1;
            }
        }
        assert_eq!(members, ROOM_CAPACITY);
        assert_eq!(pairings.load(Ordering::SeqCst), 1);
        assert_eq!(table.members(&RoomId::from("hot")).len(), ROOM_CAPACITY);
    }
}
