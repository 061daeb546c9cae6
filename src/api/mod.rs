//! Client for the EliteCure reminder REST API.
//!
//! Endpoint groups live in sibling files as `impl ApiClient` blocks:
//! `auth.rs` for login/register/logout, `reminders.rs` for reminder CRUD.

mod auth;
pub mod error;
pub mod models;
mod reminders;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, RequestBuilder, StatusCode};
use log::warn;
use serde_json::Value;

use crate::session::SessionStore;

pub use error::{ApiError, ApiResult};
pub use models::{Reminder, ReminderDraft, ReminderStatus, UserSession};

use models::Envelope;

/// Where the scheduler gets its reminders from.
#[async_trait]
pub trait ReminderSource: Send + Sync {
    /// Reminders scheduled for today (`GET /api/reminders/today`).
    async fn fetch_today(&self) -> ApiResult<Vec<Reminder>>;

    /// Every reminder of the user (`GET /api/reminders`).
    async fn fetch_all(&self) -> ApiResult<Vec<Reminder>>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.session.token().ok_or(ApiError::Unauthorized)?;
        Ok(request.header(AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, request: RequestBuilder) -> ApiResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            // The token is dead; drop it so later calls stop sending it.
            if self.session.is_authenticated() {
                warn!("Session rejected by server; logging out");
                self.session.clear();
            }
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            if let Some(message) = error_message(&body) {
                return Err(ApiError::Rejected(message));
            }
            return Err(ApiError::Status { status, body });
        }
        Ok(body)
    }
}

#[async_trait]
impl ReminderSource for ApiClient {
    async fn fetch_today(&self) -> ApiResult<Vec<Reminder>> {
        self.today_reminders().await
    }

    async fn fetch_all(&self) -> ApiResult<Vec<Reminder>> {
        self.list_reminders().await
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Envelope<Value>>(body)
        .ok()
        .filter(|envelope| !envelope.success)
        .and_then(|envelope| envelope.error)
}

/// Accepts `{success: true, data: [...]}` or a bare array.
pub(crate) fn decode_reminder_list(body: &str) -> ApiResult<Vec<Reminder>> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| ApiError::Malformed(err.to_string()))?;

    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut fields) => {
            let success = fields.get("success").and_then(Value::as_bool).unwrap_or(false);
            if !success {
                let message = fields
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("request was not successful")
                    .to_string();
                return Err(ApiError::Rejected(message));
            }
            match fields.remove("data") {
                Some(data @ Value::Array(_)) => data,
                _ => return Err(ApiError::Malformed("`data` is not an array".into())),
            }
        }
        other => {
            return Err(ApiError::Malformed(format!(
                "expected reminder array, got {}",
                kind_of(&other)
            )))
        }
    };

    serde_json::from_value(list).map_err(|err| ApiError::Malformed(err.to_string()))
}

/// Decode `{success, message?}` acknowledgements of mutating calls.
pub(crate) fn decode_ack(body: &str) -> ApiResult<Option<String>> {
    let envelope: Envelope<Value> =
        serde_json::from_str(body).map_err(|err| ApiError::Malformed(err.to_string()))?;
    if envelope.success {
        Ok(envelope.message)
    } else {
        Err(ApiError::Rejected(
            envelope.error.unwrap_or_else(|| "request was not successful".into()),
        ))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_accepts_envelope_and_bare_array() {
        let bare = r#"[{"id":1,"medicineName":"A","timeOfDay":"09:00"}]"#;
        let wrapped = r#"{"success":true,"data":[{"id":1,"medicineName":"A","timeOfDay":"09:00"}]}"#;
        assert_eq!(decode_reminder_list(bare).unwrap().len(), 1);
        assert_eq!(decode_reminder_list(wrapped).unwrap()[0].medicine_name, "A");
    }

    #[test]
    fn list_rejects_non_arrays() {
        assert!(matches!(
            decode_reminder_list(r#""oops""#),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(
            decode_reminder_list(r#"{"success":true,"data":{"id":1}}"#),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(
            decode_reminder_list("<html>"),
            Err(ApiError::Malformed(_))
        ));
    }

    #[test]
    fn list_surfaces_server_error() {
        match decode_reminder_list(r#"{"success":false,"error":"Unauthorized"}"#) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Unauthorized"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn ack_reports_message_or_error() {
        assert_eq!(
            decode_ack(r#"{"success":true,"message":"Reminder marked as taken"}"#).unwrap(),
            Some("Reminder marked as taken".into())
        );
        assert!(matches!(
            decode_ack(r#"{"success":false,"error":"Reminder not found"}"#),
            Err(ApiError::Rejected(_))
        ));
    }
}
