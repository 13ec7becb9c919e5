//! # registration — Registration API client
//!
//! Forwards sign-up forms to the external registration service:
//!
//! ```text
//! POST <REGISTRATION_API_URL>/user/registration
//! x-client-id: <REGISTRATION_CLIENT_ID>
//! { "firstName": ..., "lastName": ..., "email": ..., "phone": ..., "password": ... }
//! ```
//!
//! `confirmPassword` is checked locally and never sent.  A non-2xx answer
//! carries `{ "message": ... }`, surfaced as [`AppError::Upstream`].
//! Development builds answer with a local mock result when the service is
//! unset or unreachable.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Environment, RegistrationConfig};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub first_name:       String,
    pub last_name:        String,
    pub email:            String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone:            Option<String>,
    pub password:         String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl RegistrationRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(AppError::BadRequest("A valid email is required".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::BadRequest("Password is required".into()));
        }
        if self.password != self.confirm_password {
            return Err(AppError::BadRequest("Passwords do not match".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationResult {
    /// Body returned by the registration service (or the mock stand-in).
    pub data: Value,
    pub mock: bool,
}

pub struct RegistrationClient {
    http:        Client,
    config:      RegistrationConfig,
    environment: Environment,
}

impl RegistrationClient {
    pub fn new(http: Client, config: RegistrationConfig, environment: Environment) -> Self {
        Self { http, config, environment }
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Result<RegistrationResult, AppError> {
        request.validate()?;

        let Some(base) = &self.config.api_url else {
            return self.mock_or(request, "REGISTRATION_API_URL is not configured");
        };

        let resp = match self
            .http
            .post(format!("{base}/user/registration"))
            .header("x-client-id", &self.config.client_id)
            .json(request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => return self.mock_or(request, &format!("registration service unreachable: {err}")),
        };

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Registration failed ({status})"));
            warn!(%status, message = %message, "❌ registration rejected");
            return Err(AppError::Upstream(message));
        }

        info!(email = %request.email, "📝 user registered");
        Ok(RegistrationResult { data: body, mock: false })
    }

    fn mock_or(&self, request: &RegistrationRequest, reason: &str) -> Result<RegistrationResult, AppError> {
        if !self.environment.is_development() {
            return Err(AppError::Upstream(reason.to_string()));
        }
        warn!(reason, "⚠️ using mock registration");
        Ok(RegistrationResult {
            data: json!({
                "message": "Registration successful (mock)",
                "userId":  Uuid::new_v4(),
                "email":   request.email,
            }),
            mock: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationRequest {
        RegistrationRequest {
            first_name:       "Asha".into(),
            last_name:        "Rao".into(),
            email:            "asha@example.com".into(),
            phone:            None,
            password:         "s3cret!".into(),
            confirm_password: "s3cret!".into(),
        }
    }

    fn client(env: Environment, api_url: Option<&str>) -> RegistrationClient {
        RegistrationClient::new(
            Client::new(),
            RegistrationConfig { api_url: api_url.map(str::to_string), client_id: "web".into() },
            env,
        )
    }

    #[test]
    fn test_body_omits_confirm_password() {
        let v = serde_json::to_value(form()).unwrap();
        assert_eq!(v["firstName"], "Asha");
        assert!(v.get("confirmPassword").is_none());
        assert!(v.get("phone").is_none());
    }

    #[tokio::test]
    async fn test_password_mismatch_is_local_error() {
        let mut f = form();
        f.confirm_password = "other".into();
        let err = client(Environment::Development, None).register(&f).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_falls_back_in_development_only() {
        let ok = client(Environment::Development, None).register(&form()).await.unwrap();
        assert!(ok.mock);
        assert_eq!(ok.data["email"], "asha@example.com");

        let err = client(Environment::Production, None).register(&form()).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
