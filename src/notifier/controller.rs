use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use tokio::{
    sync::{mpsc::UnboundedSender, Mutex as AsyncMutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{ApiError, Reminder, ReminderSource},
    settings::Settings,
};

use super::{
    due::{is_due_at, minute_label, LocalClock, WallClock},
    loop_worker::{polling_loop, resurface_after_snooze},
    state::{DueOrigin, NotificationKey, ReminderEvent, SchedulerStatus, ShownSet},
    DEFAULT_SHOWN_CAPACITY,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub snooze_delay: Duration,
    pub shown_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            snooze_delay: Duration::from_secs(5 * 60),
            shown_capacity: DEFAULT_SHOWN_CAPACITY,
        }
    }
}

impl From<&Settings> for SchedulerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            snooze_delay: settings.snooze_delay(),
            shown_capacity: settings.shown_capacity,
        }
    }
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

struct SnoozeTask {
    reminder_id: i64,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Polls the reminder source and emits a `Due` event once per reminder per matching minute.
#[derive(Clone)]
pub struct DueScheduler {
    source: Arc<dyn ReminderSource>,
    clock: Arc<dyn WallClock>,
    events: UnboundedSender<ReminderEvent>,
    config: SchedulerConfig,
    shown: Arc<Mutex<ShownSet>>,
    status: Arc<Mutex<SchedulerStatus>>,
    ticker: Arc<AsyncMutex<Option<Ticker>>>,
    snoozes: Arc<Mutex<Vec<SnoozeTask>>>,
}

impl DueScheduler {
    pub fn new(
        source: Arc<dyn ReminderSource>,
        events: UnboundedSender<ReminderEvent>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            clock: Arc::new(LocalClock),
            events,
            config,
            shown: Arc::new(Mutex::new(ShownSet::new(config.shown_capacity))),
            status: Arc::new(Mutex::new(SchedulerStatus::Idle)),
            ticker: Arc::new(AsyncMutex::new(None)),
            snoozes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn WallClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn status(&self) -> SchedulerStatus {
        *lock(&self.status)
    }

    pub fn shown_len(&self) -> usize {
        lock(&self.shown).len()
    }

    pub fn was_shown(&self, key: &NotificationKey) -> bool {
        lock(&self.shown).contains(key)
    }

    /// Run a check now, then every `poll_interval` until [`stop`](Self::stop).
    pub async fn start(&self) -> Result<()> {
        let mut ticker_guard = self.ticker.lock().await;
        if ticker_guard.is_some() {
            bail!("reminder scheduler already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            self.clone(),
            self.config.poll_interval,
            cancel_token.clone(),
        ));

        *ticker_guard = Some(Ticker {
            handle,
            cancel_token,
        });
        *lock(&self.status) = SchedulerStatus::Running;
        log_info!(
            "Reminder scheduler started (every {}s)",
            self.config.poll_interval.as_secs()
        );
        Ok(())
    }

    /// Cancel the polling loop and every pending snooze.
    pub async fn stop(&self) -> Result<()> {
        let snoozes = std::mem::take(&mut *lock(&self.snoozes));
        for task in &snoozes {
            task.cancel_token.cancel();
        }
        for task in snoozes {
            if let Err(err) = task.handle.await {
                log_warn!("snooze task for reminder {} ended badly: {err}", task.reminder_id);
            }
        }

        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel_token.cancel();
            ticker
                .handle
                .await
                .context("reminder polling task failed to join")?;
            log_info!("Reminder scheduler stopped");
        }

        let mut status = lock(&self.status);
        if *status == SchedulerStatus::Running {
            *status = SchedulerStatus::Stopped;
        }
        Ok(())
    }

    /// Fetch today's reminders and return the ones newly due this minute.
    ///
    /// Fetch failures are logged and yield an empty list; the next tick retries.
    pub async fn check_due(&self) -> Vec<Reminder> {
        let reminders = match self.source.fetch_today().await {
            Ok(reminders) => reminders,
            Err(ApiError::Unauthorized) => {
                log_debug!("skipping reminder check: not authenticated");
                return Vec::new();
            }
            Err(err) => {
                log_warn!("reminder check failed: {err}");
                return Vec::new();
            }
        };

        // Evaluated after the fetch returns, so a slow response lands in the new minute.
        self.collect_due(reminders, self.clock.now())
    }

    /// Mark and emit every reminder due at `now` that has not fired this minute.
    pub fn collect_due(&self, reminders: Vec<Reminder>, now: chrono::NaiveTime) -> Vec<Reminder> {
        let minute = minute_label(now);
        let mut due = Vec::new();

        {
            let mut shown = lock(&self.shown);
            for reminder in reminders {
                if !is_due_at(&reminder, &minute) {
                    continue;
                }
                let key = NotificationKey::new(reminder.id, minute.as_str());
                if !shown.insert(key.clone()) {
                    continue;
                }
                due.push((reminder, key));
            }
        }

        due.into_iter()
            .map(|(reminder, key)| {
                log_info!(
                    "Reminder {} ({}) due at {}",
                    reminder.id,
                    reminder.medicine_name,
                    key.minute
                );
                self.emit(ReminderEvent::Due {
                    reminder: reminder.clone(),
                    origin: DueOrigin::Scheduled,
                    key: Some(key),
                });
                reminder
            })
            .collect()
    }

    /// Re-show `reminder_id` after the snooze delay if it is still active.
    ///
    /// Bypasses the per-minute dedup entirely.
    pub fn snooze(&self, reminder_id: i64) {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(resurface_after_snooze(
            self.source.clone(),
            self.events.clone(),
            reminder_id,
            self.config.snooze_delay,
            cancel_token.clone(),
        ));

        let mut snoozes = lock(&self.snoozes);
        snoozes.retain(|task| !task.handle.is_finished());
        snoozes.push(SnoozeTask {
            reminder_id,
            handle,
            cancel_token,
        });
        log_info!(
            "Reminder {} snoozed for {}s",
            reminder_id,
            self.config.snooze_delay.as_secs()
        );
    }

    /// Cancel pending snoozes for one reminder, e.g. after it was marked taken.
    pub fn cancel_snooze(&self, reminder_id: i64) -> usize {
        let mut snoozes = lock(&self.snoozes);
        let before = snoozes.len();
        snoozes.retain(|task| {
            if task.reminder_id == reminder_id {
                task.cancel_token.cancel();
                false
            } else {
                !task.handle.is_finished()
            }
        });
        before - snoozes.len()
    }

    pub fn pending_snoozes(&self) -> usize {
        lock(&self.snoozes)
            .iter()
            .filter(|task| !task.handle.is_finished())
            .count()
    }

    fn emit(&self, event: ReminderEvent) {
        if self.events.send(event).is_err() {
            log_debug!("no listener for reminder events");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
