use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc::UnboundedSender, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::ReminderSource;

use super::{
    controller::DueScheduler,
    state::{DueOrigin, ReminderEvent},
};

// Set to false to silence the per-tick logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Ticks immediately, then every `poll_interval`. Each check finishes before
/// the next tick is taken, so checks never overlap.
pub async fn polling_loop(
    scheduler: DueScheduler,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("reminder polling loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => {
                        log_info!("reminder check abandoned: scheduler stopping");
                        break;
                    }
                    due = scheduler.check_due() => {
                        log_debug!("reminder check complete, {} due", due.len());
                    }
                }
            }
        }
    }
}

/// Waits out the snooze, re-fetches every reminder and re-emits `reminder_id`
/// if it still exists and is ACTIVE.
pub async fn resurface_after_snooze(
    source: Arc<dyn ReminderSource>,
    events: UnboundedSender<ReminderEvent>,
    reminder_id: i64,
    delay: Duration,
    cancel_token: CancellationToken,
) {
    tokio::select! {
        _ = cancel_token.cancelled() => return,
        _ = tokio::time::sleep(delay) => {}
    }

    let fetched = tokio::select! {
        _ = cancel_token.cancelled() => return,
        fetched = source.fetch_all() => fetched,
    };

    let reminders = match fetched {
        Ok(reminders) => reminders,
        Err(err) => {
            log_error!("Error fetching reminder {reminder_id} after snooze: {err}");
            return;
        }
    };

    match reminders.into_iter().find(|r| r.id == reminder_id) {
        Some(reminder) if reminder.status.is_active() => {
            log_info!("Snoozed reminder {} ({}) is due again", reminder.id, reminder.medicine_name);
            let event = ReminderEvent::Due {
                reminder,
                origin: DueOrigin::Snoozed,
                key: None,
            };
            if events.send(event).is_err() {
                log_debug!("no listener for snoozed reminder {reminder_id}");
            }
        }
        Some(reminder) => {
            log_info!(
                "Snoozed reminder {} is now {:?}; not showing it again",
                reminder_id,
                reminder.status
            );
        }
        None => log_info!("Snoozed reminder {reminder_id} no longer exists"),
    }
}
