use crate::acl::UserRecord;
use crate::workflow::{CandidateItem, FolderChoice, ProfileChoice, WorkflowState};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(120);

/// Closed set of per-user slot names. All slots for one user form a single
/// logical transaction: they are created across one workflow run and cleared
/// together at the end or on abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    State,
    Candidates,
    SelectedCandidate,
    Options,
    SelectedProfile,
    SelectedMonitor,
    SelectedType,
    SelectedFolder,
    AclCandidates,
    AclSelection,
}

/// Typed slot values; the variant doubles as a schema check, so a slot read
/// back with the wrong shape is treated the same as a missing slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    State(WorkflowState),
    Candidates(Vec<CandidateItem>),
    CandidateId(usize),
    Profiles(Vec<ProfileChoice>),
    Folders(Vec<FolderChoice>),
    Labels(Vec<String>),
    ProfileId(i64),
    Label(String),
    Folder(FolderChoice),
    AclUsers(Vec<UserRecord>),
    AclUser(UserRecord),
}

#[derive(Debug, Clone)]
struct Entry {
    value: SlotValue,
    expires_at: Instant,
}

/// Ephemeral per-user session store with a fixed TTL window. Expiry is the
/// only cancellation mechanism besides an explicit abort: a slot that has
/// aged out behaves exactly like one that was never written.
#[derive(Debug)]
pub struct SessionCache {
    ttl: Duration,
    entries: HashMap<i64, HashMap<Slot, Entry>>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn set(&mut self, user_id: i64, slot: Slot, value: SlotValue) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .entry(user_id)
            .or_default()
            .insert(slot, Entry { value, expires_at });
    }

    pub fn get(&self, user_id: i64, slot: Slot) -> Option<&SlotValue> {
        let entry = self.entries.get(&user_id)?.get(&slot)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(&entry.value)
    }

    pub fn state(&self, user_id: i64) -> Option<WorkflowState> {
        match self.get(user_id, Slot::State) {
            Some(SlotValue::State(state)) => Some(*state),
            _ => None,
        }
    }

    /// Drops every slot for the user in one call.
    pub fn clear_user(&mut self, user_id: i64) {
        self.entries.remove(&user_id);
    }

    /// Checkperiod sweep: drops expired entries and empty user maps. Called
    /// from the poll loop between messages.
    pub fn sweep(&mut self) {
        let now = Instant::now();
        for slots in self.entries.values_mut() {
            slots.retain(|_, entry| entry.expires_at > now);
        }
        self.entries.retain(|_, slots| !slots.is_empty());
    }

    #[cfg(test)]
    fn slot_count(&self, user_id: i64) -> usize {
        self.entries.get(&user_id).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{AddStep, MediaKind};

    fn state_value() -> SlotValue {
        SlotValue::State(WorkflowState::Add(MediaKind::Series, AddStep::Confirm))
    }

    #[test]
    fn slots_are_isolated_per_user() {
        let mut cache = SessionCache::default();
        cache.set(1, Slot::State, state_value());
        cache.set(2, Slot::SelectedMonitor, SlotValue::Label("all".to_string()));

        assert!(cache.get(1, Slot::State).is_some());
        assert!(cache.get(2, Slot::State).is_none());
        cache.clear_user(1);
        assert!(cache.get(1, Slot::State).is_none());
        assert!(cache.get(2, Slot::SelectedMonitor).is_some());
    }

    #[test]
    fn expired_slots_read_as_missing() {
        let mut cache = SessionCache::new(Duration::ZERO);
        cache.set(1, Slot::State, state_value());
        assert!(cache.get(1, Slot::State).is_none());
        assert!(cache.state(1).is_none());
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let mut cache = SessionCache::new(Duration::ZERO);
        cache.set(1, Slot::State, state_value());
        cache.set(1, Slot::SelectedMonitor, SlotValue::Label("none".to_string()));
        assert_eq!(cache.slot_count(1), 2);
        cache.sweep();
        assert_eq!(cache.slot_count(1), 0);
    }

    #[test]
    fn clear_user_removes_the_whole_transaction() {
        let mut cache = SessionCache::default();
        cache.set(1, Slot::State, state_value());
        cache.set(1, Slot::SelectedCandidate, SlotValue::CandidateId(3));
        cache.set(1, Slot::SelectedProfile, SlotValue::ProfileId(4));
        cache.clear_user(1);
        assert_eq!(cache.slot_count(1), 0);
    }

    #[test]
    fn writing_a_slot_refreshes_its_value() {
        let mut cache = SessionCache::default();
        cache.set(1, Slot::SelectedMonitor, SlotValue::Label("first".to_string()));
        cache.set(1, Slot::SelectedMonitor, SlotValue::Label("latest".to_string()));
        assert_eq!(
            cache.get(1, Slot::SelectedMonitor),
            Some(&SlotValue::Label("latest".to_string()))
        );
    }
}
