//! Login and logout.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tienda_core::validation::validate_required;
use tienda_core::{FormErrors, Session};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

const LOGIN_PATH: &str = "/login";

/// What the login form submits.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if let Err(e) = validate_required("username", &self.username) {
            errors.push(e);
        }
        if let Err(e) = validate_required("password", &self.password) {
            errors.push(e);
        }
        errors.into_result(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        AuthService { api }
    }

    /// Posts the credentials form-encoded and adopts the returned token.
    ///
    /// A 401 here is a credential rejection and does not touch any
    /// existing session.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Session> {
        credentials.validate()?;

        let form = [
            ("username", credentials.username.trim()),
            ("password", credentials.password.as_str()),
        ];
        let response: LoginResponse = match self.api.post_form(LOGIN_PATH, &form).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username = %credentials.username, error = %e, "Login failed");
                return Err(e);
            }
        };

        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Decode("No se recibió token en la respuesta".into()))?;

        let session = self.api.session().establish(&token)?;
        info!(username = %session.username, "Logged in");
        Ok(session)
    }

    pub fn logout(&self) {
        self.api.session().logout();
    }

    /// Restores a stored session at startup. Never fails.
    pub fn check_auth(&self) -> bool {
        self.api.session().check_auth()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.session().is_authenticated()
    }

    pub fn current_user(&self) -> Option<Session> {
        self.api.session().current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credentials_rejected_locally() {
        let errors = Credentials::new(" ", "").validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.field("username").is_some());
        assert!(errors.field("password").is_some());
        assert!(Credentials::new("ana", "secreto").validate().is_ok());
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("ana", "secreto"));
        assert!(rendered.contains("ana"));
        assert!(!rendered.contains("secreto"));
    }
}
