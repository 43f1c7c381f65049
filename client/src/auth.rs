//! Account authentication: sign-up, e-mail verification, login and logout.
//!
//! The backend hands out bearer tokens; the caller stores them (the CLI keeps
//! them in the current context) and builds an authenticated [`Client`](crate::Client).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    error::{Error, Result},
    http::HttpClient,
};

/// Shortest password the backend accepts at sign-up.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Length of the numeric code sent by e-mail.
pub const OTP_LEN: usize = 6;

/// Bearer credential issued by login, sign-up or verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

/// Result of a sign-up.
///
/// Depending on the deployment the backend either signs the user in right
/// away or mails a one-time code first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignupOutcome {
    SignedIn(AuthToken),
    VerificationRequired {
        require_verification: bool,
        email: String,
    },
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    verify_password: &'a str,
}

#[derive(Serialize)]
struct VerifyOtpRequest<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Authentication service.
pub struct AuthService {
    http: Arc<HttpClient>,
}

impl AuthService {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Exchanges e-mail and password for a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthToken> {
        check_email(email)?;
        if password.is_empty() {
            return Err(Error::Validation("Please enter your password".to_string()));
        }
        let token: AuthToken = self
            .http
            .post("/api/auth/login", &Credentials { email, password })
            .await?;
        info!("logged in as {}", email);
        Ok(token)
    }

    /// Creates an account.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        verify_password: &str,
    ) -> Result<SignupOutcome> {
        check_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if password != verify_password {
            return Err(Error::Validation("Passwords do not match".to_string()));
        }

        let request = SignupRequest {
            email,
            password,
            verify_password,
        };
        self.http.post("/api/auth/signup", &request).await
    }

    /// Confirms the e-mailed code and returns a token.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<AuthToken> {
        check_email(email)?;
        if otp.len() != OTP_LEN || !otp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation(format!(
                "The code must be {} digits",
                OTP_LEN
            )));
        }
        self.http
            .post("/api/auth/verify-otp", &VerifyOtpRequest { email, otp })
            .await
    }

    /// Asks the backend to mail a fresh code.
    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        check_email(email)?;
        let _: serde_json::Value = self
            .http
            .post("/api/auth/resend-otp", &EmailRequest { email })
            .await?;
        Ok(())
    }

    /// Ends the server-side session. The caller discards its token.
    pub async fn logout(&self) -> Result<Option<String>> {
        let resp: MessageResponse = self
            .http
            .post("/api/auth/logout", &serde_json::json!({}))
            .await?;
        Ok(resp.message)
    }
}

fn check_email(email: &str) -> Result<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid e-mail address {:?}", email)))
    }
}
