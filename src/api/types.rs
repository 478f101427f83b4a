use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::repositories::actor::ActorWithRelations;
use crate::db::repositories::movie::MovieWithRelations;
use crate::db::repositories::review::ReviewWithRelations;
use crate::db::repositories::user::UserWithRelations;
use crate::entities::{actors, movies, reviews, users};

/// Keeps an explicit `null` apart from an absent key: absent stays `None`
/// (via `#[serde(default)]`), `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Payload of responses that carry no record.
pub type NoData = Vec<serde_json::Value>;

/// Envelope wrapped around every JSON response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: bool,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            status: true,
            message: message.into(),
        }
    }
}

impl ApiResponse<NoData> {
    pub fn empty(message: impl Into<String>) -> Self {
        Self::success(Vec::new(), message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            status: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountDto {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct LinkDto {
    pub linked: bool,
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorDto {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub age: i32,
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movies: Option<Vec<MovieDto>>,
}

impl From<actors::Model> for ActorDto {
    fn from(actor: actors::Model) -> Self {
        Self {
            id: actor.id,
            first_name: actor.first_name,
            last_name: actor.last_name,
            gender: actor.gender,
            age: actor.age,
            image: actor.image,
            movies: None,
        }
    }
}

impl From<ActorWithRelations> for ActorDto {
    fn from(resolved: ActorWithRelations) -> Self {
        Self {
            movies: resolved
                .movies
                .map(|movies| movies.into_iter().map(MovieDto::from).collect()),
            ..Self::from(resolved.actor)
        }
    }
}

/// Body of actor create and patch requests. Unknown keys such as `id` are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    /// `null` clears the image.
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
}

impl ActorInput {
    /// Every present field becomes `Set`; absent ones stay `NotSet`.
    #[must_use]
    pub fn into_active_model(self) -> actors::ActiveModel {
        actors::ActiveModel {
            id: NotSet,
            first_name: self.first_name.map_or(NotSet, |v| Set(v.trim().to_string())),
            last_name: self.last_name.map_or(NotSet, |v| Set(v.trim().to_string())),
            gender: self.gender.map_or(NotSet, |v| Set(v.trim().to_string())),
            age: self
                .age
                .and_then(|v| i32::try_from(v).ok())
                .map_or(NotSet, Set),
            image: self.image.map_or(NotSet, Set),
        }
    }
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MovieDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cost: Option<f64>,
    pub released_date: String,
    pub duration: i32,
    pub image: String,
    #[serde(rename = "actorIds", skip_serializing_if = "Option::is_none")]
    pub actor_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<ActorDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewDto>>,
}

impl From<movies::Model> for MovieDto {
    fn from(movie: movies::Model) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            cost: movie.cost,
            released_date: movie.released_date,
            duration: movie.duration,
            image: movie.image,
            actor_ids: None,
            actors: None,
            reviews: None,
        }
    }
}

impl From<MovieWithRelations> for MovieDto {
    fn from(resolved: MovieWithRelations) -> Self {
        Self {
            actor_ids: Some(resolved.actor_ids),
            actors: resolved
                .actors
                .map(|actors| actors.into_iter().map(ActorDto::from).collect()),
            reviews: resolved
                .reviews
                .map(|reviews| reviews.into_iter().map(ReviewDto::from).collect()),
            ..Self::from(resolved.movie)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieInput {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `null` clears the cost.
    #[serde(default, deserialize_with = "nullable")]
    pub cost: Option<Option<f64>>,
    pub released_date: Option<String>,
    pub duration: Option<i64>,
    pub image: Option<String>,
    /// Replaces the linked actor set when present.
    #[serde(rename = "actorIds")]
    pub actor_ids: Option<Vec<String>>,
}

impl MovieInput {
    #[must_use]
    pub fn into_active_model(self) -> movies::ActiveModel {
        movies::ActiveModel {
            id: NotSet,
            title: self.title.map_or(NotSet, |v| Set(v.trim().to_string())),
            description: self.description.map_or(NotSet, Set),
            cost: self.cost.map_or(NotSet, Set),
            released_date: self
                .released_date
                .map_or(NotSet, |v| Set(v.trim().to_string())),
            duration: self
                .duration
                .and_then(|v| i32::try_from(v).ok())
                .map_or(NotSet, Set),
            image: self.image.map_or(NotSet, Set),
        }
    }
}

/// An actor reference in a bulk link body: a bare id or an object carrying `id`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ActorRef {
    Id(String),
    Object { id: String },
}

impl ActorRef {
    #[must_use]
    pub fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActorIdsInput {
    #[serde(rename = "actorIds")]
    pub actor_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id: String,
    #[serde(rename = "reviewScore")]
    pub review_score: i32,
    pub description: String,
    pub posted_date: String,
    pub status: String,
    #[serde(rename = "movieId")]
    pub movie_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie: Option<MovieDto>,
}

impl From<reviews::Model> for ReviewDto {
    fn from(review: reviews::Model) -> Self {
        Self {
            id: review.id,
            review_score: review.review_score,
            description: review.description,
            posted_date: review.posted_date,
            status: review.status,
            movie_id: review.movie_id,
            user_id: review.user_id,
            user: None,
            movie: None,
        }
    }
}

impl From<ReviewWithRelations> for ReviewDto {
    fn from(resolved: ReviewWithRelations) -> Self {
        Self {
            user: resolved.user.map(UserDto::from),
            movie: resolved.movie.map(MovieDto::from),
            ..Self::from(resolved.review)
        }
    }
}

/// Review body. `status`, `userId` and `posted_date` are not accepted from
/// authors on create; `status` is only honored on moderator updates.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(rename = "reviewScore")]
    pub review_score: Option<i64>,
    pub description: Option<String>,
    #[serde(rename = "movieId")]
    pub movie_id: Option<String>,
    pub status: Option<String>,
}

impl ReviewInput {
    /// Score and description only; the repository and handlers own the rest.
    #[must_use]
    pub fn into_active_model(self) -> reviews::ActiveModel {
        reviews::ActiveModel {
            review_score: self
                .review_score
                .and_then(|v| i32::try_from(v).ok())
                .map_or(NotSet, Set),
            description: self.description.map_or(NotSet, Set),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewDto>>,
}

impl From<users::Model> for UserDto {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
            reviews: None,
        }
    }
}

impl From<UserWithRelations> for UserDto {
    fn from(resolved: UserWithRelations) -> Self {
        Self {
            reviews: resolved
                .reviews
                .map(|reviews| reviews.into_iter().map(ReviewDto::from).collect()),
            ..Self::from(resolved.user)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Partial user update. `role` and `isActive` are admin-only.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    #[must_use]
    pub const fn touches_privileges(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }

    #[must_use]
    pub fn into_active_model(self) -> users::ActiveModel {
        users::ActiveModel {
            first_name: self.first_name.map_or(NotSet, |v| Set(v.trim().to_string())),
            last_name: self.last_name.map_or(NotSet, |v| Set(v.trim().to_string())),
            email: self
                .email
                .map_or(NotSet, |v| Set(v.trim().to_lowercase())),
            role: self.role.map_or(NotSet, |v| Set(Some(v))),
            is_active: self.is_active.map_or(NotSet, Set),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub database: bool,
    pub uptime_secs: u64,
    pub version: &'static str,
}
