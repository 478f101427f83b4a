//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use sea_orm::Set;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{RepoError, Store};
use crate::entities::users;
use crate::services::auth_service::{AuthError, AuthService, NewUser, SignInResult};
use crate::services::token::TokenService;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: TokenService, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, new_user: NewUser) -> Result<users::Model, AuthError> {
        let users = self.store.users();
        let email = new_user.email.trim().to_lowercase();

        if users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let user = users::ActiveModel {
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            email: Set(email),
            role: Set(None),
            is_active: Set(false),
            ..Default::default()
        };

        let created = users
            .create_with_password(user, &new_user.password, &self.security)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent signup for the same address.
                RepoError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %created.id, "User signed up");
        Ok(created)
    }

    async fn signin(&self, email: &str, password: &str) -> Result<SignInResult, AuthError> {
        let users = self.store.users();
        let email = email.trim().to_lowercase();

        let Some(user) = users.find_by_email(&email).await? else {
            warn!("Sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        if !users.verify_password(&user.id, password).await? {
            warn!(user_id = %user.id, "Sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, "User signed in");

        Ok(SignInResult {
            token,
            expires_in: self.tokens.expires_in_secs(),
            user,
        })
    }

    async fn identity(&self, user_id: &str) -> Result<users::Model, AuthError> {
        match self.store.users().find_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(RepoError::NotFound { .. }) => Err(AuthError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }
}
