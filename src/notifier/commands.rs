//! User actions typed at the prompt: snooze, mark taken, reminder CRUD, status.

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveTime};

use crate::{
    api::{ApiError, Reminder, ReminderDraft},
    presentation::DismissReason,
    AppState,
};

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Snooze(i64),
    Taken(i64),
    Dismiss(i64),
    List,
    Today,
    CheckNow,
    Add(ReminderDraft),
    Edit(i64, ReminderDraft),
    Delete(i64),
    Login { email: String, password: String },
    Register { email: String, password: String, full_name: String },
    Logout,
    Sound(bool),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "\
commands:
  snooze <id>        hide the reminder and show it again later
  taken <id>         mark the reminder as taken
  dismiss <id>       close the reminder card
  list | today       show all / today's reminders
  check              check for due reminders now
  add HH:MM <medicine>; <dosage>; <frequency>[; <notes>]
  edit <id> HH:MM <medicine>; <dosage>; <frequency>[; <notes>]
  delete <id>        delete a reminder
  login <email> <password> | logout
  register <email> <password> <full name>
  sound on|off       toggle the chime
  status             scheduler and session state
  help | quit";

pub fn parse_command(line: &str, today: NaiveDate) -> Result<UserCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "snooze" => parse_id(rest).map(UserCommand::Snooze),
        "taken" => parse_id(rest).map(UserCommand::Taken),
        "dismiss" | "close" => parse_id(rest).map(UserCommand::Dismiss),
        "delete" => parse_id(rest).map(UserCommand::Delete),
        "list" => Ok(UserCommand::List),
        "today" => Ok(UserCommand::Today),
        "check" => Ok(UserCommand::CheckNow),
        "add" => parse_draft(rest, today).map(UserCommand::Add),
        "edit" => {
            let (id, draft) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: edit <id> HH:MM <medicine>; <dosage>; <frequency>[; <notes>]")?;
            Ok(UserCommand::Edit(parse_id(id)?, parse_draft(draft.trim(), today)?))
        }
        "login" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(email), Some(password), None) => Ok(UserCommand::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err("usage: login <email> <password>".into()),
            }
        }
        "register" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            match (parts.next(), parts.next(), parts.next().map(str::trim)) {
                (Some(email), Some(password), Some(full_name))
                    if !email.is_empty() && !password.is_empty() && !full_name.is_empty() =>
                {
                    Ok(UserCommand::Register {
                        email: email.to_string(),
                        password: password.to_string(),
                        full_name: full_name.to_string(),
                    })
                }
                _ => Err("usage: register <email> <password> <full name>".into()),
            }
        }
        "logout" => Ok(UserCommand::Logout),
        "sound" => match rest {
            "on" => Ok(UserCommand::Sound(true)),
            "off" => Ok(UserCommand::Sound(false)),
            _ => Err("usage: sound on|off".into()),
        },
        "status" => Ok(UserCommand::Status),
        "help" | "?" => Ok(UserCommand::Help),
        "quit" | "exit" => Ok(UserCommand::Quit),
        "" => Err("empty command".into()),
        other => Err(format!("unknown command `{other}`; type `help`")),
    }
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|_| format!("expected a reminder id, got `{raw}`"))
}

fn parse_draft(raw: &str, today: NaiveDate) -> Result<ReminderDraft, String> {
    const USAGE: &str = "usage: add HH:MM <medicine>; <dosage>; <frequency>[; <notes>]";

    let (time, rest) = raw.split_once(char::is_whitespace).ok_or(USAGE)?;
    let time_of_day = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| format!("invalid time `{time}`, expected HH:MM"))?;

    let fields: Vec<&str> = rest.split(';').map(str::trim).collect();
    if fields.len() < 3 || fields.len() > 4 || fields[..3].iter().any(|f| f.is_empty()) {
        return Err(USAGE.into());
    }

    Ok(ReminderDraft {
        medicine_name: fields[0].to_string(),
        dosage: fields[1].to_string(),
        frequency: fields[2].to_string(),
        start_date: today,
        end_date: None,
        time_of_day,
        notes: fields.get(3).filter(|n| !n.is_empty()).map(|n| n.to_string()),
        status: None,
    })
}

pub async fn execute(state: &AppState, command: UserCommand) -> Result<Flow> {
    let presenter = &state.presenter;

    match command {
        UserCommand::Snooze(id) => {
            presenter.dismiss(id, DismissReason::Snoozed);
            state.scheduler.snooze(id);
            presenter.toast(&format!(
                "Reminder snoozed for {} minutes",
                presenter.snooze_minutes()
            ));
        }
        UserCommand::Taken(id) => match state.api.mark_taken(id).await {
            Ok(()) => {
                presenter.dismiss(id, DismissReason::Taken);
                state.scheduler.cancel_snooze(id);
                presenter.toast("✅ Marked as taken!");
            }
            Err(err) => presenter.toast(&format!("Could not mark reminder {id} as taken: {err}")),
        },
        UserCommand::Dismiss(id) => {
            if !presenter.dismiss(id, DismissReason::Closed) {
                presenter.toast(&format!("No open reminder {id}"));
            }
        }
        UserCommand::List => {
            let result = state.api.list_reminders().await;
            if let Ok(reminders) = &result {
                let stats = ReminderStats::tally(reminders, Local::now().date_naive());
                presenter.write_line(&stats.to_string());
            }
            show_list(state, result, "reminders");
        }
        UserCommand::Today => show_list(state, state.api.today_reminders().await, "today"),
        UserCommand::CheckNow => {
            let due = state.scheduler.check_due().await;
            if due.is_empty() {
                presenter.toast("Nothing due right now");
            }
        }
        UserCommand::Add(draft) => match state.api.create_reminder(&draft).await {
            Ok(reminder) => presenter.toast(&format!(
                "Reminder #{} added for {}",
                reminder.id,
                reminder.time_of_day.as_deref().unwrap_or("?")
            )),
            Err(err) => presenter.toast(&format!("Error saving reminder: {err}")),
        },
        UserCommand::Edit(id, draft) => match update_keeping_dates(state, id, draft).await {
            Ok(()) => presenter.toast(&format!("Reminder #{id} updated")),
            Err(err) => presenter.toast(&format!("Error saving reminder: {err}")),
        },
        UserCommand::Delete(id) => match state.api.delete_reminder(id).await {
            Ok(()) => {
                presenter.dismiss(id, DismissReason::Closed);
                state.scheduler.cancel_snooze(id);
                presenter.toast("Reminder deleted");
            }
            Err(err) => presenter.toast(&format!("Error deleting reminder: {err}")),
        },
        UserCommand::Login { email, password } => match state.api.login(&email, &password).await {
            Ok(user) => {
                let name = display_name(&user.full_name, &user.email);
                presenter.toast(&format!("Welcome, {name}"));
            }
            Err(err) => presenter.toast(&format!("Login failed: {err}")),
        },
        UserCommand::Register {
            email,
            password,
            full_name,
        } => match state.api.register(&full_name, &email, &password).await {
            Ok(()) => presenter.toast("Registration successful! You can now log in."),
            Err(err) => presenter.toast(&format!("Registration failed: {err}")),
        },
        UserCommand::Logout => {
            if let Err(err) = state.api.logout().await {
                presenter.toast(&format!("Logged out locally ({err})"));
            } else {
                presenter.toast("Logged out");
            }
        }
        UserCommand::Sound(enabled) => {
            let effective = presenter.set_sound(enabled);
            state.settings.update(|s| s.sound.enabled = enabled)?;
            presenter.toast(if effective { "Sound on" } else { "Sound off" });
        }
        UserCommand::Status => presenter.write_line(&status_line(state)),
        UserCommand::Help => presenter.write_line(HELP),
        UserCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

fn show_list(state: &AppState, result: Result<Vec<Reminder>, ApiError>, label: &str) {
    let presenter = &state.presenter;
    match result {
        Ok(reminders) if reminders.is_empty() => presenter.toast(&format!("No {label} found")),
        Ok(reminders) => {
            for reminder in &reminders {
                presenter.write_line(&format_row(reminder));
            }
        }
        Err(ApiError::Unauthorized) => {
            presenter.toast("Not logged in; use `login <email> <password>`")
        }
        Err(err) => presenter.toast(&format!("Error loading {label}: {err}")),
    }
}

/// Keep the start and end dates the reminder already has; the prompt only edits the rest.
async fn update_keeping_dates(
    state: &AppState,
    id: i64,
    mut draft: ReminderDraft,
) -> Result<(), ApiError> {
    let reminders = state.api.list_reminders().await?;
    let existing = reminders
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| ApiError::Rejected(format!("Reminder {id} not found")))?;
    if let Some(start) = existing.start_date {
        draft.start_date = start;
    }
    draft.end_date = existing.end_date;
    state.api.update_reminder(id, &draft).await
}

/// Counts shown above the reminder list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReminderStats {
    pub total: usize,
    pub due_today: usize,
    pub active: usize,
}

impl ReminderStats {
    /// A reminder is due today when it is ACTIVE and `today` lies within its
    /// start and (open-ended if missing) end date.
    pub fn tally(reminders: &[Reminder], today: NaiveDate) -> Self {
        let active = reminders.iter().filter(|r| r.status.is_active());
        let due_today = active
            .clone()
            .filter(|r| r.start_date.is_some_and(|start| start <= today))
            .filter(|r| r.end_date.map_or(true, |end| end >= today))
            .count();
        Self {
            total: reminders.len(),
            due_today,
            active: active.count(),
        }
    }
}

impl std::fmt::Display for ReminderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total: {}  Due today: {}  Active: {}",
            self.total, self.due_today, self.active
        )
    }
}

fn status_line(state: &AppState) -> String {
    let session = state.api.session();
    let account = match session.user() {
        Some(user) => display_name(&user.full_name, &user.email).to_string(),
        None if session.is_authenticated() => "configured session".to_string(),
        None => "not logged in".to_string(),
    };
    let scheduler = &state.scheduler;
    let config = scheduler.config();
    format!(
        "scheduler {:?} (every {}s), {}/{} shown, {} snoozed; {} @ {}",
        scheduler.status(),
        config.poll_interval.as_secs(),
        scheduler.shown_len(),
        config.shown_capacity,
        scheduler.pending_snoozes(),
        account,
        state.api.base_url()
    )
}

fn format_row(reminder: &Reminder) -> String {
    format!(
        "#{:<4} {:<5}  {:<20} {:<10} {:<14} {:?}",
        reminder.id,
        reminder.due_minute().unwrap_or("--:--"),
        reminder.medicine_name,
        reminder.dosage,
        reminder.frequency,
        reminder.status
    )
}

fn display_name<'a>(full_name: &'a str, email: &'a str) -> &'a str {
    if full_name.trim().is_empty() {
        email
    } else {
        full_name
    }
}
