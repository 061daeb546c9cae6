pub mod commands;
pub mod controller;
pub mod due;
pub mod loop_worker;
pub mod state;

pub use controller::{DueScheduler, SchedulerConfig};
pub use due::{LocalClock, WallClock};
pub use state::{
    DueOrigin, NotificationKey, ReminderEvent, SchedulerStatus, ShownSet, DEFAULT_SHOWN_CAPACITY,
};
