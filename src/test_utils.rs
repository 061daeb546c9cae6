//! Shared fakes for unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::NaiveTime;

use crate::{
    api::{ApiError, ApiResult, Reminder, ReminderSource, ReminderStatus},
    notifier::WallClock,
};

pub fn reminder_at(id: i64, time_of_day: &str) -> Reminder {
    Reminder {
        id,
        user_id: Some(1),
        medicine_name: format!("Medicine {id}"),
        dosage: "1 tablet".into(),
        frequency: "Daily".into(),
        start_date: None,
        end_date: None,
        time_of_day: Some(time_of_day.into()),
        notes: None,
        status: ReminderStatus::Active,
        created_at: None,
    }
}

/// In-memory `ReminderSource` that counts calls and can be told to fail.
#[derive(Default)]
pub struct FakeSource {
    reminders: Mutex<Vec<Reminder>>,
    unauthorized: AtomicBool,
    today_calls: AtomicUsize,
    all_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: Mutex::new(reminders),
            ..Self::default()
        }
    }

    pub fn replace(&self, reminders: Vec<Reminder>) {
        *self.reminders.lock().unwrap() = reminders;
    }

    pub fn set_status(&self, id: i64, status: ReminderStatus) {
        for reminder in self.reminders.lock().unwrap().iter_mut() {
            if reminder.id == id {
                reminder.status = status;
            }
        }
    }

    pub fn fail_with_unauthorized(&self, fail: bool) {
        self.unauthorized.store(fail, Ordering::SeqCst);
    }

    pub fn today_calls(&self) -> usize {
        self.today_calls.load(Ordering::SeqCst)
    }

    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> ApiResult<Vec<Reminder>> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        Ok(self.reminders.lock().unwrap().clone())
    }
}

#[async_trait]
impl ReminderSource for FakeSource {
    async fn fetch_today(&self) -> ApiResult<Vec<Reminder>> {
        self.today_calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }

    async fn fetch_all(&self) -> ApiResult<Vec<Reminder>> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }
}

pub struct FixedClock {
    now: Mutex<NaiveTime>,
}

impl FixedClock {
    pub fn at(now: NaiveTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveTime) {
        *self.now.lock().unwrap() = now;
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> NaiveTime {
        *self.now.lock().unwrap()
    }
}
