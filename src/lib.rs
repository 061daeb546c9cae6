pub mod api;
pub mod audio;
pub mod notifier;
pub mod presentation;
pub mod session;
pub mod settings;
mod utils;

#[cfg(test)]
mod test_utils;

use std::{env, sync::Arc};

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use api::ApiClient;
use audio::AudioEngineHandle;
use notifier::{
    commands::{execute, parse_command, Flow, HELP},
    DueScheduler, SchedulerConfig,
};
use presentation::{present_events, ConsolePresenter};
use session::SessionStore;
use settings::{Settings, SettingsStore};

pub use utils::logging::init as init_logging;

pub struct AppState {
    pub api: ApiClient,
    pub scheduler: DueScheduler,
    pub presenter: ConsolePresenter,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    /// Wire the client, scheduler and presenter from settings. The scheduler is not started.
    pub fn build(
        settings_store: Arc<SettingsStore>,
        settings: &Settings,
        presenter: ConsolePresenter,
    ) -> Result<(Self, mpsc::UnboundedReceiver<notifier::ReminderEvent>)> {
        let session = match &settings.session_id {
            Some(token) => SessionStore::with_token(token.clone()),
            None => SessionStore::new(),
        };
        let api = ApiClient::new(&settings.api_base_url, session, settings.request_timeout())
            .context("failed to build HTTP client")?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scheduler = DueScheduler::new(
            Arc::new(api.clone()),
            events_tx,
            SchedulerConfig::from(settings),
        );

        Ok((
            Self {
                api,
                scheduler,
                presenter,
                settings: settings_store,
            },
            events_rx,
        ))
    }
}

pub fn run() -> Result<()> {
    init_logging();
    info!("medreminder starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(run_async())
}

async fn run_async() -> Result<()> {
    let settings_store = Arc::new(SettingsStore::new(settings::default_path())?);
    let mut settings = settings_store.get();
    settings.apply_env_overrides();
    info!(
        "Using reminder API at {} (settings: {})",
        settings.api_base_url,
        settings_store.path().display()
    );

    let audio = settings
        .sound
        .enabled
        .then(|| AudioEngineHandle::new(settings.sound.volume));
    let presenter =
        ConsolePresenter::stdout(audio, settings.auto_dismiss(), settings.snooze_minutes);

    let (state, events_rx) = AppState::build(settings_store, &settings, presenter.clone())?;

    if !state.api.session().is_authenticated() {
        login_from_env(&state).await;
    }

    let pump = tokio::spawn(present_events(presenter.clone(), events_rx));
    state.scheduler.start().await?;
    presenter.write_line("Type `help` for commands.");

    let result = command_loop(&state).await;

    // Teardown runs even when the command loop failed.
    if let Err(err) = state.scheduler.stop().await {
        warn!("Failed to stop reminder scheduler cleanly: {err:#}");
    }
    presenter.shutdown();
    pump.abort();
    info!("medreminder stopped");
    result
}

async fn login_from_env(state: &AppState) {
    let (Ok(email), Ok(password)) = (
        env::var("MEDREMINDER_EMAIL"),
        env::var("MEDREMINDER_PASSWORD"),
    ) else {
        state
            .presenter
            .toast("Not logged in; use `login <email> <password>`");
        return;
    };

    match state.api.login(&email, &password).await {
        Ok(user) => state.presenter.toast(&format!("Logged in as {}", user.email)),
        Err(err) => state.presenter.toast(&format!("Login failed: {err}")),
    }
}

async fn command_loop(state: &AppState) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; shutting down");
                return Ok(());
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line, Local::now().date_naive()) {
                    Ok(command) => {
                        if execute(state, command).await? == Flow::Quit {
                            return Ok(());
                        }
                    }
                    Err(message) => {
                        state.presenter.toast(&message);
                        state.presenter.write_line(HELP);
                    }
                }
            }
        }
    }
}
