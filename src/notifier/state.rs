use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::api::Reminder;

pub const DEFAULT_SHOWN_CAPACITY: usize = 100;

/// A reminder id paired with the `HH:MM` it fired in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationKey {
    pub reminder_id: i64,
    pub minute: String,
}

impl NotificationKey {
    pub fn new(reminder_id: i64, minute: impl Into<String>) -> Self {
        Self {
            reminder_id,
            minute: minute.into(),
        }
    }
}

/// Insertion-ordered set of keys that already produced a notification.
///
/// Holds at most `capacity` keys; inserting past that evicts the oldest.
#[derive(Debug, Clone)]
pub struct ShownSet {
    capacity: usize,
    members: HashSet<NotificationKey>,
    order: VecDeque<NotificationKey>,
}

impl Default for ShownSet {
    fn default() -> Self {
        Self::new(DEFAULT_SHOWN_CAPACITY)
    }
}

impl ShownSet {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            members: HashSet::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.members.contains(key)
    }

    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: NotificationKey) -> bool {
        if !self.members.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DueOrigin {
    /// Matched the current minute during a regular check.
    Scheduled,
    /// Re-shown after a snooze delay.
    Snoozed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReminderEvent {
    Due {
        reminder: Reminder,
        origin: DueOrigin,
        key: Option<NotificationKey>,
    },
}

impl ReminderEvent {
    pub fn reminder(&self) -> &Reminder {
        match self {
            ReminderEvent::Due { reminder, .. } => reminder,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}
