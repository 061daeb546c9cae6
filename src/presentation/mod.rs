//! Console presentation of due reminders: card, chime, auto-dismiss.

pub mod card;

pub use card::NotificationCard;

use std::{
    collections::HashMap,
    fmt,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::{audio::AudioEngineHandle, notifier::ReminderEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Closed,
    Snoozed,
    Taken,
    TimedOut,
}

impl fmt::Display for DismissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DismissReason::Closed => "closed",
            DismissReason::Snoozed => "snoozed",
            DismissReason::Taken => "taken",
            DismissReason::TimedOut => "timed out",
        };
        f.write_str(label)
    }
}

struct OpenCard {
    card: NotificationCard,
    dismiss_token: CancellationToken,
}

pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Clone)]
pub struct ConsolePresenter {
    out: SharedWriter,
    audio: Option<AudioEngineHandle>,
    sound_enabled: Arc<AtomicBool>,
    open: Arc<Mutex<HashMap<i64, OpenCard>>>,
    auto_dismiss: Duration,
    snooze_minutes: u64,
}

impl ConsolePresenter {
    pub fn new(
        out: Box<dyn Write + Send>,
        audio: Option<AudioEngineHandle>,
        auto_dismiss: Duration,
        snooze_minutes: u64,
    ) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            sound_enabled: Arc::new(AtomicBool::new(audio.is_some())),
            audio,
            open: Arc::new(Mutex::new(HashMap::new())),
            auto_dismiss,
            snooze_minutes,
        }
    }

    pub fn stdout(
        audio: Option<AudioEngineHandle>,
        auto_dismiss: Duration,
        snooze_minutes: u64,
    ) -> Self {
        Self::new(Box::new(std::io::stdout()), audio, auto_dismiss, snooze_minutes)
    }

    pub fn snooze_minutes(&self) -> u64 {
        self.snooze_minutes
    }

    /// Toggle the chime; a presenter built without audio stays silent.
    pub fn set_sound(&self, enabled: bool) -> bool {
        let effective = enabled && self.audio.is_some();
        self.sound_enabled.store(effective, Ordering::SeqCst);
        effective
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled.load(Ordering::SeqCst)
    }

    /// Show the card for a due reminder. Must be called inside a tokio runtime.
    pub fn show(&self, event: ReminderEvent) {
        let ReminderEvent::Due {
            reminder, origin, ..
        } = event;
        let card = NotificationCard::new(reminder, origin);
        let id = card.reminder_id();

        if let Some(audio) = self.audio.as_ref().filter(|_| self.sound_enabled()) {
            if let Err(err) = audio.play_chime() {
                warn!("Error playing notification sound: {err}");
            }
        }
        self.write_line(&card.render(self.snooze_minutes));

        let dismiss_token = CancellationToken::new();
        let previous = lock(&self.open).insert(
            id,
            OpenCard {
                card,
                dismiss_token: dismiss_token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.dismiss_token.cancel();
        }

        if self.auto_dismiss.is_zero() {
            return;
        }
        let presenter = self.clone();
        let delay = self.auto_dismiss;
        tokio::spawn(async move {
            tokio::select! {
                _ = dismiss_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    presenter.dismiss(id, DismissReason::TimedOut);
                }
            }
        });
    }

    /// Close the card for `reminder_id`. Returns false if none was open.
    pub fn dismiss(&self, reminder_id: i64, reason: DismissReason) -> bool {
        let removed = lock(&self.open).remove(&reminder_id);
        match removed {
            Some(open) => {
                open.dismiss_token.cancel();
                debug!("card for reminder {reminder_id} {reason}");
                self.write_line(&format!(
                    "✕ {} reminder {reason}",
                    open.card.reminder.medicine_name
                ));
                true
            }
            None => false,
        }
    }

    pub fn toast(&self, message: &str) {
        self.write_line(&format!("» {message}"));
    }

    pub fn open_cards(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = lock(&self.open).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn shutdown(&self) {
        for (_, open) in lock(&self.open).drain() {
            open.dismiss_token.cancel();
        }
        if let Some(audio) = &self.audio {
            audio.stop();
        }
    }

    pub fn write_line(&self, text: &str) {
        let mut out = lock(&self.out);
        if let Err(err) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            warn!("Failed to write to console: {err}");
        }
    }
}

/// Forward scheduler events to the presenter until the channel closes.
pub async fn present_events(
    presenter: ConsolePresenter,
    mut events: UnboundedReceiver<ReminderEvent>,
) {
    while let Some(event) = events.recv().await {
        presenter.show(event);
    }
    debug!("reminder event channel closed");
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
