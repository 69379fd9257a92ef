use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use tracing::info;

use exam_core::model::UserId;

use crate::api::{ApiClient, AuthContext};
use crate::error::AuthError;

/// Result of a successful OTP verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub is_new_user: bool,
}

/// Profile returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Identity read from the access token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Option<UserId>,
    pub role: Option<String>,
    pub email: Option<String>,
}

impl SessionUser {
    /// Teachers and admins may author and publish tests.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role.as_deref(), Some("TEACHER" | "admin"))
    }
}

/// OTP login flow and token inspection.
#[derive(Clone, Debug)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn context(&self) -> &AuthContext {
        self.api.auth()
    }

    /// Create a password account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyName`/`EmptyEmail` for blank input,
    /// `AuthError::WeakPassword` if the password fails the strength rules,
    /// or `AuthError::Api`.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        let request = RegisterRequest::new(name, email, password)?;
        self.api.post_unit("/auth/register", &request).await?;
        info!("account registered");
        Ok(())
    }

    /// Ask the server to email a one-time code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyEmail` for a blank address, or `AuthError::Api`.
    pub async fn send_otp(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        self.api
            .post_unit("/auth/send-otp", &SendOtpRequest { email })
            .await?;
        info!("one-time code requested");
        Ok(())
    }

    /// Exchange the one-time code for an access token and store it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyEmail`/`EmptyOtp` for blank input,
    /// `AuthError::EmptyToken` if the server returns no token, or `AuthError::Api`.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<LoginOutcome, AuthError> {
        let email = email.trim();
        let otp = otp.trim();
        if email.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        if otp.is_empty() {
            return Err(AuthError::EmptyOtp);
        }

        let response: VerifyOtpResponse = self
            .api
            .post_json("/auth/verify-otp", &VerifyOtpRequest { email, otp })
            .await?;
        if response.access_token.trim().is_empty() {
            return Err(AuthError::EmptyToken);
        }

        self.context().set_token(response.access_token);
        info!(new_user = response.is_new_user, "logged in");
        Ok(LoginOutcome {
            is_new_user: response.is_new_user,
        })
    }

    /// Fetch the profile of the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotLoggedIn` without a token, or `AuthError::Api`.
    pub async fn me(&self) -> Result<UserProfile, AuthError> {
        if !self.context().is_logged_in() {
            return Err(AuthError::NotLoggedIn);
        }
        let response: MeResponse = self.api.get_json("/auth/me", &[]).await?;
        Ok(response.user)
    }

    pub fn logout(&self) {
        self.context().clear();
        info!("logged out");
    }

    /// Decode the identity claims of the stored token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotLoggedIn` without a token, or
    /// `AuthError::InvalidToken` if the token is not a readable JWT.
    pub fn session_user(&self) -> Result<SessionUser, AuthError> {
        let token = self.context().token().ok_or(AuthError::NotLoggedIn)?;
        read_claims(&token)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.session_user().is_ok_and(|user| user.is_admin())
    }
}

/// Read the claims without checking the signature; the API verifies tokens,
/// the client only needs to know who it is talking as.
fn read_claims(token: &str) -> Result<SessionUser, AuthError> {
    let header = decode_header(token)?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    let claims = data.claims;
    Ok(SessionUser {
        id: claims.sub.and_then(SubjectClaim::user_id),
        role: claims.role,
        email: claims.email,
    })
}

const PASSWORD_SPECIALS: &str = "!@#$%^&*";

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < 6 {
        return Err(AuthError::WeakPassword("use at least 6 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AuthError::WeakPassword("include an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AuthError::WeakPassword("include a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword("include a number"));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(AuthError::WeakPassword("include one of !@#$%^&*"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

impl<'a> RegisterRequest<'a> {
    fn new(name: &'a str, email: &'a str, password: &'a str) -> Result<Self, AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AuthError::EmptyName);
        }
        if email.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        check_password(password)?;
        Ok(Self {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Serialize)]
struct SendOtpRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyOtpRequest<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyOtpResponse {
    access_token: String,
    #[serde(rename = "isNewUser", default)]
    is_new_user: bool,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<SubjectClaim>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubjectClaim {
    Number(u64),
    Text(String),
}

impl SubjectClaim {
    fn user_id(self) -> Option<UserId> {
        match self {
            SubjectClaim::Number(id) => Some(UserId::new(id)),
            SubjectClaim::Text(raw) => raw.parse().ok(),
        }
    }
}
