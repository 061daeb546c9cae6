use log::{info, warn};

use super::{
    decode_ack,
    error::{ApiError, ApiResult},
    models::{Envelope, LoginRequest, RegisterRequest, UserSession},
    ApiClient,
};

impl ApiClient {
    /// Log in and keep the returned session id for later calls.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<UserSession> {
        let request = self
            .http
            .post(self.url("/api/login"))
            .json(&LoginRequest { email, password });
        let body = self.send(request).await?;

        let envelope: Envelope<UserSession> =
            serde_json::from_str(&body).map_err(|err| ApiError::Malformed(err.to_string()))?;
        let user = match (envelope.success, envelope.data) {
            (true, Some(user)) => user,
            (true, None) => return Err(ApiError::Malformed("login response missing `data`".into())),
            (false, _) => {
                return Err(ApiError::Rejected(
                    envelope.error.unwrap_or_else(|| "login failed".into()),
                ))
            }
        };

        info!("Logged in as {} (user {})", user.email, user.id);
        self.session.establish(user.clone());
        Ok(user)
    }

    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> ApiResult<()> {
        let request = self.http.post(self.url("/api/register")).json(&RegisterRequest {
            full_name,
            email,
            password,
        });
        let body = self.send(request).await?;
        decode_ack(&body).map(|_| ())
    }

    /// Invalidate the server session. The local session is cleared either way.
    pub async fn logout(&self) -> ApiResult<()> {
        let result = match self.authorized(self.http.post(self.url("/api/logout"))) {
            Ok(request) => self.send(request).await.map(|_| ()),
            Err(ApiError::Unauthorized) => Ok(()),
            Err(err) => Err(err),
        };
        self.session.clear();
        if let Err(err) = &result {
            warn!("Logout request failed, local session cleared anyway: {err}");
        }
        result
    }
}
