use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{IntakeState, Transition};

/// Outcome of routing one message through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No live state existed; a fresh intake was opened and the message
    /// itself was discarded.
    Started,
    Moved(Transition),
}

struct Slot {
    state: IntakeState,
    last_activity: Instant,
}

/// In-flight intakes keyed by chat id.
pub struct IntakeRegistry {
    slots: DashMap<i64, Slot>,
    idle_timeout: Option<Duration>,
}

impl IntakeRegistry {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            slots: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        self.idle_timeout
            .is_some_and(|t| now.saturating_duration_since(slot.last_activity) >= t)
    }

    pub fn step_at(&self, chat_id: i64, input: Option<&str>, now: Instant) -> Step {
        match self.slots.entry(chat_id) {
            Entry::Occupied(mut entry) => {
                if self.is_expired(entry.get(), now) {
                    tracing::debug!("Intake for chat {} expired, restarting", chat_id);
                    entry.insert(Slot {
                        state: IntakeState::new(),
                        last_activity: now,
                    });
                    return Step::Started;
                }
                let slot = entry.get_mut();
                slot.last_activity = now;
                Step::Moved(slot.state.accept(input))
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot {
                    state: IntakeState::new(),
                    last_activity: now,
                });
                Step::Started
            }
        }
    }

    /// Open a fresh intake, discarding any partial one.
    pub fn restart_at(&self, chat_id: i64, now: Instant) {
        self.slots.insert(
            chat_id,
            Slot {
                state: IntakeState::new(),
                last_activity: now,
            },
        );
    }

    /// Drop the chat's intake. Returns true if one was live.
    pub fn clear(&self, chat_id: i64) -> bool {
        self.slots.remove(&chat_id).is_some()
    }

    #[cfg(test)]
    pub fn stage_at(&self, chat_id: i64, now: Instant) -> Option<super::Stage> {
        self.slots
            .get(&chat_id)
            .filter(|slot| !self.is_expired(slot, now))
            .map(|slot| slot.state.stage())
    }

    /// Remove every expired intake. Returns how many were dropped.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !self.is_expired(slot, now));
        before.saturating_sub(self.slots.len())
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }
}
