use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, QueryFilter, Set,
    TransactionTrait,
};
use tokio::task;

use super::crud::{CrudRepository, Resource, insert_as, new_id};
use super::filter::{Filter, Inclusions};
use super::relations::HasMany;
use crate::config::SecurityConfig;
use crate::db::RepoError;
use crate::entities::{prelude::*, reviews, user_credentials, users};

impl Resource for Users {
    const NAME: &'static str = "User";

    fn id_column() -> users::Column {
        users::Column::Id
    }

    fn column(field: &str) -> Option<users::Column> {
        Some(match field {
            "id" => users::Column::Id,
            "firstName" => users::Column::FirstName,
            "lastName" => users::Column::LastName,
            "email" => users::Column::Email,
            "role" => users::Column::Role,
            "isActive" => users::Column::IsActive,
            "createdAt" => users::Column::CreatedAt,
            "updatedAt" => users::Column::UpdatedAt,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UserWithRelations {
    pub user: users::Model,
    pub reviews: Option<Vec<reviews::Model>>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
    crud: CrudRepository<Users>,
}

impl UserRepository {
    pub const INCLUDES: &'static [&'static str] = &["reviews"];

    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            crud: CrudRepository::new(conn.clone()),
            conn,
        }
    }

    #[must_use]
    pub const fn crud(&self) -> &CrudRepository<Users> {
        &self.crud
    }

    #[must_use]
    pub fn reviews(&self, user_id: &str) -> HasMany<Users, Reviews> {
        HasMany::new(self.conn.clone(), user_id, reviews::Column::UserId)
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<UserWithRelations>, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let users = self.crud.find(filter).await?;
        self.resolve(users, &inclusions).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<users::Model, RepoError> {
        self.crud.find_by_id(id).await
    }

    async fn resolve(
        &self,
        users: Vec<users::Model>,
        inclusions: &Inclusions,
    ) -> Result<Vec<UserWithRelations>, RepoError> {
        let reviews: Vec<Option<Vec<reviews::Model>>> = if inclusions.has("reviews") {
            users
                .load_many(Reviews, &self.conn)
                .await?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; users.len()]
        };

        Ok(users
            .into_iter()
            .zip(reviews)
            .map(|(user, reviews)| UserWithRelations { user, reviews })
            .collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, RepoError> {
        Ok(Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await?)
    }

    /// Creates a user and its credentials in one transaction.
    /// Hashing runs on the blocking pool.
    pub async fn create_with_password(
        &self,
        mut user: users::ActiveModel,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<users::Model, RepoError> {
        let password = password.to_owned();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config)).await??;

        let now = chrono::Utc::now().to_rfc3339();
        user.created_at = Set(now.clone());
        user.updated_at = Set(now);

        let txn = self.conn.begin().await?;

        let created = insert_as(&txn, &new_id(), user).await?;
        user_credentials::ActiveModel {
            id: Set(new_id()),
            user_id: Set(created.id.clone()),
            password_hash: Set(password_hash),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(created)
    }

    /// The user's credentials, if any were ever stored.
    pub async fn credentials(
        &self,
        user_id: &str,
    ) -> Result<Option<user_credentials::Model>, RepoError> {
        Ok(UserCredentials::find()
            .filter(user_credentials::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await?)
    }

    /// Hashes `password` and stores it as the user's credentials, replacing any existing hash.
    pub async fn set_credentials(
        &self,
        user_id: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<(), RepoError> {
        self.crud.find_by_id(user_id).await?;

        let password = password.to_owned();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config)).await??;

        match self.credentials(user_id).await? {
            Some(existing) => {
                let mut active: user_credentials::ActiveModel = existing.into();
                active.password_hash = Set(password_hash);
                active.update(&self.conn).await?;
            }
            None => {
                user_credentials::ActiveModel {
                    id: Set(new_id()),
                    user_id: Set(user_id.to_owned()),
                    password_hash: Set(password_hash),
                }
                .insert(&self.conn)
                .await?;
            }
        }
        Ok(())
    }

    /// Checks `password` against the stored hash on the blocking pool.
    /// A user without credentials never matches.
    pub async fn verify_password(&self, user_id: &str, password: &str) -> Result<bool, RepoError> {
        let Some(credentials) = self.credentials(user_id).await? else {
            return Ok(false);
        };

        let password_hash = credentials.password_hash;
        let password = password.to_owned();

        task::spawn_blocking(move || verify_password(&password_hash, &password)).await?
    }

    /// Partial update; bumps `updatedAt` when anything changed.
    pub async fn update_by_id(
        &self,
        id: &str,
        mut changes: users::ActiveModel,
    ) -> Result<users::Model, RepoError> {
        if changes.is_changed() {
            changes.updated_at = Set(chrono::Utc::now().to_rfc3339());
        }
        self.crud.update_by_id(id, changes).await
    }

    pub async fn set_active_by_email(
        &self,
        email: &str,
        is_active: bool,
    ) -> Result<users::Model, RepoError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| RepoError::not_found(Users::NAME, email))?;

        self.update_by_id(
            &user.id,
            users::ActiveModel {
                is_active: Set(is_active),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_role_by_email(
        &self,
        email: &str,
        role: Option<String>,
    ) -> Result<users::Model, RepoError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| RepoError::not_found(Users::NAME, email))?;

        self.update_by_id(
            &user.id,
            users::ActiveModel {
                role: Set(role),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes a user together with its credentials and reviews.
    pub async fn delete_by_id(&self, id: &str) -> Result<(), RepoError> {
        let txn = self.conn.begin().await?;

        Reviews::delete_many()
            .filter(reviews::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        UserCredentials::delete_many()
            .filter(user_credentials::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = Users::delete_many()
            .filter(users::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            return Err(RepoError::not_found(Users::NAME, id));
        }

        txn.commit().await?;
        Ok(())
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String, RepoError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| RepoError::Internal(format!("Invalid Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| RepoError::Internal(format!("Failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Verifies against a PHC string; the parameters are read from the hash itself.
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool, RepoError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| RepoError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
