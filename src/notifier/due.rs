//! Minute-granularity due check.

use chrono::{Local, NaiveTime, Timelike};

use crate::api::Reminder;

/// Wall-clock source for the due check.
pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// The machine's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl WallClock for LocalClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// `HH:MM` of `now`, seconds dropped.
pub fn minute_label(now: NaiveTime) -> String {
    format!("{:02}:{:02}", now.hour(), now.minute())
}

/// True when the reminder's `timeOfDay` falls in the same minute as `current_minute`.
pub fn is_due_at(reminder: &Reminder, current_minute: &str) -> bool {
    reminder.due_minute() == Some(current_minute)
}
