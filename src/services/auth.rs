//! Account service: login, registration, logout and profile edits.
//!
//! Every successful auth call is mirrored into the [`AuthStore`] so guards
//! and user-aware commands see the new session immediately.

use reqwest::Method;
use tracing::{info, warn};

use super::{ServiceError, ValidationError, check_email, require};
use crate::client::{ApiClient, LOGIN_ENDPOINT, REGISTER_ENDPOINT};
use crate::session::AuthStore;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserRole};

pub const LOGOUT_ENDPOINT: &str = "/api/v1/auth/logout";
pub const PROFILE_ENDPOINT: &str = "/api/v1/auth/profile";

pub const MIN_PASSWORD_LEN: usize = 8;

/// Seller sign-up form as entered, before validation.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Check the form and build the request. Sellers always register with
    /// the `shop` role.
    ///
    /// # Errors
    ///
    /// Returns the first rule the form breaks.
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        require(&self.full_name, "full name")?;
        check_email(&self.email)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LEN });
        }
        let phone = self
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned);
        Ok(RegisterRequest {
            full_name: self.full_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone,
            password: self.password.clone(),
            role: UserRole::Shop,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
    store: AuthStore,
}

impl AuthService {
    pub fn new(client: ApiClient, store: AuthStore) -> Self {
        Self { client, store }
    }

    /// # Errors
    ///
    /// Fails on empty credentials, or with the server's message when the
    /// login is refused.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        check_email(email)?;
        require(password, "password")?;
        let body = LoginRequest { email: email.trim().to_owned(), password: password.to_owned() };
        let auth: AuthResponse = self.client.post(LOGIN_ENDPOINT, &body).await?;
        self.store.set_auth(&auth);
        Ok(auth.user)
    }

    /// # Errors
    ///
    /// Fails on an invalid form (no request is sent) or with the server's
    /// message when registration is refused.
    pub async fn register(&self, form: &RegisterForm) -> Result<User, ServiceError> {
        let body = form.validate()?;
        let auth: AuthResponse = self.client.post(REGISTER_ENDPOINT, &body).await?;
        info!(user_id = %auth.user.id, "seller registered");
        self.store.set_auth(&auth);
        Ok(auth.user)
    }

    /// Tell the server, then drop local credentials whatever it said.
    pub async fn logout(&self) {
        if self.store.tokens().access_token().is_some() {
            if let Err(e) = self.client.send_discarding(Method::POST, LOGOUT_ENDPOINT).await {
                warn!(error = %e, "server logout failed; clearing local session anyway");
            }
        }
        self.store.logout();
    }

    /// # Errors
    ///
    /// Returns the client error when the edit is refused; the cached
    /// profile is left unchanged in that case.
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> Result<User, ServiceError> {
        let user: User = self.client.put(PROFILE_ENDPOINT, update).await?;
        self.store.update_user(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
