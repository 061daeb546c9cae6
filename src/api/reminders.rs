use log::debug;

use super::{
    decode_ack, decode_reminder_list,
    error::{ApiError, ApiResult},
    models::{Envelope, Reminder, ReminderDraft},
    ApiClient,
};

impl ApiClient {
    pub async fn list_reminders(&self) -> ApiResult<Vec<Reminder>> {
        let request = self.authorized(self.http.get(self.url("/api/reminders")))?;
        let body = self.send(request).await?;
        decode_reminder_list(&body)
    }

    pub async fn today_reminders(&self) -> ApiResult<Vec<Reminder>> {
        let request = self.authorized(self.http.get(self.url("/api/reminders/today")))?;
        let body = self.send(request).await?;
        decode_reminder_list(&body)
    }

    pub async fn create_reminder(&self, draft: &ReminderDraft) -> ApiResult<Reminder> {
        let request = self.authorized(self.http.post(self.url("/api/reminders")).json(draft))?;
        let body = self.send(request).await?;
        let envelope: Envelope<Reminder> =
            serde_json::from_str(&body).map_err(|err| ApiError::Malformed(err.to_string()))?;
        match (envelope.success, envelope.data) {
            (true, Some(reminder)) => {
                debug!("created reminder {} ({})", reminder.id, reminder.medicine_name);
                Ok(reminder)
            }
            (true, None) => Err(ApiError::Malformed("created reminder missing `data`".into())),
            (false, _) => Err(ApiError::Rejected(
                envelope.error.unwrap_or_else(|| "create failed".into()),
            )),
        }
    }

    pub async fn update_reminder(&self, id: i64, draft: &ReminderDraft) -> ApiResult<()> {
        let request = self.authorized(
            self.http
                .put(self.url(&format!("/api/reminders/{id}")))
                .json(draft),
        )?;
        let body = self.send(request).await?;
        decode_ack(&body).map(|_| ())
    }

    pub async fn delete_reminder(&self, id: i64) -> ApiResult<()> {
        let request =
            self.authorized(self.http.delete(self.url(&format!("/api/reminders/{id}"))))?;
        let body = self.send(request).await?;
        decode_ack(&body).map(|_| ())
    }

    /// `POST /api/reminders/{id}/taken`; the server flips the reminder to COMPLETED.
    pub async fn mark_taken(&self, id: i64) -> ApiResult<()> {
        let request =
            self.authorized(self.http.post(self.url(&format!("/api/reminders/{id}/taken"))))?;
        let body = self.send(request).await?;
        decode_ack(&body).map(|_| ())
    }
}
