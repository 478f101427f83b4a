use std::fmt;
use std::str::FromStr;

use sea_orm::{ActiveValue::Set, DatabaseConnection, LoaderTrait, ModelTrait};
use serde::{Deserialize, Serialize};

use super::crud::{CrudRepository, Resource, ensure_exists};
use super::filter::{Filter, Inclusions};
use super::relations::HasMany;
use crate::db::RepoError;
use crate::entities::{movies, prelude::*, reviews, users};

impl Resource for Reviews {
    const NAME: &'static str = "Review";

    fn id_column() -> reviews::Column {
        reviews::Column::Id
    }

    fn column(field: &str) -> Option<reviews::Column> {
        Some(match field {
            "id" => reviews::Column::Id,
            "reviewScore" => reviews::Column::ReviewScore,
            "description" => reviews::Column::Description,
            "posted_date" => reviews::Column::PostedDate,
            "status" => reviews::Column::Status,
            "movieId" => reviews::Column::MovieId,
            "userId" => reviews::Column::UserId,
            _ => return None,
        })
    }
}

/// Moderation state of a review. New reviews always start as `Checking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Checking,
    Approved,
    Declined,
}

impl ReviewStatus {
    pub const ALL: [Self; 3] = [Self::Checking, Self::Approved, Self::Declined];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown review status: {s}"))
    }
}

#[derive(Debug, Clone)]
pub struct ReviewWithRelations {
    pub review: reviews::Model,
    pub user: Option<users::Model>,
    pub movie: Option<movies::Model>,
}

pub struct ReviewRepository {
    conn: DatabaseConnection,
    crud: CrudRepository<Reviews>,
}

impl ReviewRepository {
    pub const INCLUDES: &'static [&'static str] = &["user", "movie"];

    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            crud: CrudRepository::new(conn.clone()),
            conn,
        }
    }

    #[must_use]
    pub const fn crud(&self) -> &CrudRepository<Reviews> {
        &self.crud
    }

    /// Records a review by `user_id` on `movie_id`. Status and posting date are
    /// assigned here, whatever the caller put in `review`.
    pub async fn create(
        &self,
        movie_id: &str,
        user_id: &str,
        mut review: reviews::ActiveModel,
    ) -> Result<reviews::Model, RepoError> {
        ensure_exists::<Users, _>(&self.conn, user_id).await?;

        review.user_id = Set(user_id.to_owned());
        review.status = Set(ReviewStatus::Checking.to_string());
        review.posted_date = Set(chrono::Utc::now().to_rfc3339());

        HasMany::<Movies, Reviews>::new(self.conn.clone(), movie_id, reviews::Column::MovieId)
            .create(review)
            .await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<ReviewWithRelations>, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let reviews = self.crud.find(filter).await?;
        self.resolve(reviews, &inclusions).await
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        filter: &Filter,
    ) -> Result<ReviewWithRelations, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let review = self.crud.find_by_id(id).await?;
        let mut resolved = self.resolve(vec![review], &inclusions).await?;
        resolved
            .pop()
            .ok_or_else(|| RepoError::not_found(Reviews::NAME, id))
    }

    async fn resolve(
        &self,
        reviews: Vec<reviews::Model>,
        inclusions: &Inclusions,
    ) -> Result<Vec<ReviewWithRelations>, RepoError> {
        let users = if inclusions.has("user") {
            reviews.load_one(Users, &self.conn).await?
        } else {
            vec![None; reviews.len()]
        };

        let movies = if inclusions.has("movie") {
            reviews.load_one(Movies, &self.conn).await?
        } else {
            vec![None; reviews.len()]
        };

        Ok(reviews
            .into_iter()
            .zip(users)
            .zip(movies)
            .map(|((review, user), movie)| ReviewWithRelations {
                review,
                user,
                movie,
            })
            .collect())
    }

    /// The author of a review.
    pub async fn user(&self, review_id: &str) -> Result<users::Model, RepoError> {
        let review = self.crud.find_by_id(review_id).await?;
        review
            .find_related(Users)
            .one(&self.conn)
            .await?
            .ok_or_else(|| RepoError::not_found(Users::NAME, review.user_id))
    }

    pub async fn update_by_id(
        &self,
        id: &str,
        changes: reviews::ActiveModel,
    ) -> Result<reviews::Model, RepoError> {
        self.crud.update_by_id(id, changes).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), RepoError> {
        self.crud.delete_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in ReviewStatus::ALL {
            assert_eq!(status.as_str().parse::<ReviewStatus>(), Ok(status));
        }
        assert!("pending".parse::<ReviewStatus>().is_err());
        assert!("Approved".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn test_default_status_is_checking() {
        assert_eq!(ReviewStatus::default(), ReviewStatus::Checking);
        assert_eq!(
            serde_json::to_string(&ReviewStatus::Declined).unwrap(),
            "\"declined\""
        );
    }
}
