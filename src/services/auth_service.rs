//! Domain service for account creation, sign-in and identity lookup.

use serde::Serialize;
use thiserror::Error;

use crate::db::RepoError;
use crate::entities::users;
use crate::services::token::TokenError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid user credentials")]
    InvalidCredentials,

    #[error("User is not active yet")]
    Inactive,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Repository(#[from] RepoError),
}

/// Fields required to open an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// A signed bearer token for a freshly authenticated user.
#[derive(Debug, Clone, Serialize)]
pub struct SignInResult {
    pub token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
    #[serde(skip)]
    pub user: users::Model,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an inactive account with hashed credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateEmail`] if the email is taken.
    async fn signup(&self, new_user: NewUser) -> Result<users::Model, AuthError>;

    /// Checks email, then the active flag, then the password, and issues a token.
    async fn signin(&self, email: &str, password: &str) -> Result<SignInResult, AuthError>;

    /// Loads the current record of an authenticated user.
    async fn identity(&self, user_id: &str) -> Result<users::Model, AuthError>;
}
