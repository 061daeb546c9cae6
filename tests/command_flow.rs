//! Prompt commands driven end to end: HTTP mock, scheduler and presenter.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use medreminder_lib::api::{Reminder, ReminderDraft};
use medreminder_lib::notifier::commands::{execute, Flow, UserCommand};
use medreminder_lib::notifier::{DueOrigin, ReminderEvent};
use medreminder_lib::presentation::ConsolePresenter;
use medreminder_lib::settings::{Settings, SettingsStore};
use medreminder_lib::AppState;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Harness {
    state: AppState,
    out: Captured,
    _dir: TempDir,
}

fn harness(server: &MockServer) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
    let settings = Settings {
        api_base_url: server.uri(),
        session_id: Some("t".into()),
        ..Settings::default()
    };

    let out = Captured::default();
    let presenter = ConsolePresenter::new(
        Box::new(out.clone()),
        None,
        Duration::from_secs(120),
        settings.snooze_minutes,
    );
    let (state, _events) = AppState::build(store, &settings, presenter).unwrap();
    Harness {
        state,
        out,
        _dir: dir,
    }
}

fn reminder_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "medicineName": format!("Medicine {id}"),
        "dosage": "1 tablet",
        "frequency": "Daily",
        "startDate": "2024-01-01",
        "endDate": "2024-12-31",
        "timeOfDay": "09:00:00",
        "status": "ACTIVE"
    })
}

fn show_card(state: &AppState, id: i64) {
    let reminder: Reminder = serde_json::from_value(reminder_json(id)).unwrap();
    state.presenter.show(ReminderEvent::Due {
        reminder,
        origin: DueOrigin::Scheduled,
        key: None,
    });
}

async fn run(state: &AppState, command: UserCommand) {
    assert_eq!(execute(state, command).await.unwrap(), Flow::Continue);
}

// ── Reminder actions ──────────────────────────────────────────────

#[tokio::test]
async fn snooze_closes_card_and_queues_resurface() {
    let server = MockServer::start().await;
    let h = harness(&server);
    show_card(&h.state, 1);
    assert_eq!(h.state.presenter.open_cards(), vec![1]);

    run(&h.state, UserCommand::Snooze(1)).await;

    assert!(h.state.presenter.open_cards().is_empty());
    assert_eq!(h.state.scheduler.pending_snoozes(), 1);
    assert!(h.out.text().contains("Reminder snoozed for 5 minutes"));
}

#[tokio::test]
async fn taken_only_closes_after_server_confirms() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reminders/1/taken"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "Database unavailable"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/reminders/2/taken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Reminder marked as taken"
        })))
        .mount(&server)
        .await;

    let h = harness(&server);
    for id in [1, 2] {
        h.state.scheduler.snooze(id);
        show_card(&h.state, id);
    }
    assert_eq!(h.state.scheduler.pending_snoozes(), 2);

    run(&h.state, UserCommand::Taken(1)).await;
    assert_eq!(h.state.presenter.open_cards(), vec![1, 2]);
    assert_eq!(h.state.scheduler.pending_snoozes(), 2);
    assert!(h.out.text().contains("Database unavailable"));

    run(&h.state, UserCommand::Taken(2)).await;
    assert_eq!(h.state.presenter.open_cards(), vec![1]);
    assert_eq!(h.state.scheduler.pending_snoozes(), 1);
    assert!(h.out.text().contains("Marked as taken"));
}

#[tokio::test]
async fn delete_cancels_pending_snooze() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/reminders/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Reminder deleted successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    h.state.scheduler.snooze(3);
    h.state.scheduler.snooze(4);

    run(&h.state, UserCommand::Delete(3)).await;
    assert_eq!(h.state.scheduler.pending_snoozes(), 1);
    assert!(h.out.text().contains("Reminder deleted"));
}

#[tokio::test]
async fn edit_keeps_existing_dates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [reminder_json(9)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/reminders/9"))
        .and(body_json(json!({
            "medicineName": "Melatonin",
            "dosage": "3mg",
            "frequency": "Daily",
            "startDate": "2024-01-01",
            "endDate": "2024-12-31",
            "timeOfDay": "21:00"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Reminder updated successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let draft = ReminderDraft {
        medicine_name: "Melatonin".into(),
        dosage: "3mg".into(),
        frequency: "Daily".into(),
        start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        end_date: None,
        time_of_day: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        notes: None,
        status: None,
    };

    run(&h.state, UserCommand::Edit(9, draft.clone())).await;
    assert!(h.out.text().contains("Reminder #9 updated"));

    run(&h.state, UserCommand::Edit(404, draft)).await;
    assert!(h.out.text().contains("Reminder 404 not found"));
}

// ── Listing and session ───────────────────────────────────────────

#[tokio::test]
async fn list_prints_summary_before_rows() {
    let server = MockServer::start().await;
    let mut done = reminder_json(2);
    done["status"] = json!("COMPLETED");
    Mock::given(method("GET"))
        .and(path("/api/reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reminder_json(1), done])))
        .mount(&server)
        .await;

    let h = harness(&server);
    run(&h.state, UserCommand::List).await;

    let text = h.out.text();
    let summary = text.find("Total: 2").unwrap();
    let row = text.find("Medicine 1").unwrap();
    assert!(summary < row);
    assert!(text.contains("Active: 1"));
}

#[tokio::test]
async fn expired_session_is_logged_out_on_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reminders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Unauthorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    assert!(h.state.api.session().is_authenticated());

    run(&h.state, UserCommand::List).await;
    assert!(!h.state.api.session().is_authenticated());
    assert!(h.out.text().contains("Not logged in"));

    // No token left, so nothing reaches the server.
    run(&h.state, UserCommand::List).await;

    run(&h.state, UserCommand::Status).await;
    assert!(h.out.text().contains("not logged in @ http://"));
}

#[tokio::test]
async fn quit_ends_the_loop() {
    let server = MockServer::start().await;
    let h = harness(&server);
    assert_eq!(execute(&h.state, UserCommand::Quit).await.unwrap(), Flow::Quit);
}
