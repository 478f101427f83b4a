use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::ApiError;
use super::types::{ActorInput, MovieInput, ReviewInput, SignupRequest, UserPatch};
use crate::db::repositories::review::ReviewStatus;

const MAX_AGE: i64 = 150;
const MAX_REVIEW_SCORE: i64 = 10;

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.+-]+@([\w-]+\.)+[\w-]{2,}$").expect("Invalid regex"))
}

/// One failing field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Whether absent fields are errors (create) or left untouched (patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Patch,
}

/// Turns collected field errors into a single 400 naming each field.
pub fn ensure_valid(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        return Ok(());
    }

    let details = errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(ApiError::validation(format!("Invalid fields: {details}")))
}

fn required_text(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<&String>,
    mode: Mode,
) {
    match value {
        None if mode == Mode::Create => errors.push(FieldError::new(field, "is required")),
        Some(v) if v.trim().is_empty() => errors.push(FieldError::new(field, "must not be empty")),
        _ => {}
    }
}

fn is_valid_date(value: &str) -> bool {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(value).is_ok()
}

#[must_use]
pub fn validate_actor(actor: &ActorInput, mode: Mode) -> Vec<FieldError> {
    let mut errors = Vec::new();

    required_text(&mut errors, "firstName", actor.first_name.as_ref(), mode);
    required_text(&mut errors, "lastName", actor.last_name.as_ref(), mode);
    required_text(&mut errors, "gender", actor.gender.as_ref(), mode);

    match actor.age {
        None if mode == Mode::Create => errors.push(FieldError::new("age", "is required")),
        Some(age) if !(0..=MAX_AGE).contains(&age) => errors.push(FieldError::new(
            "age",
            format!("must be between 0 and {MAX_AGE}"),
        )),
        _ => {}
    }

    errors
}

#[must_use]
pub fn validate_movie(movie: &MovieInput, mode: Mode) -> Vec<FieldError> {
    let mut errors = Vec::new();

    required_text(&mut errors, "title", movie.title.as_ref(), mode);
    required_text(&mut errors, "description", movie.description.as_ref(), mode);
    required_text(&mut errors, "image", movie.image.as_ref(), mode);

    match movie.released_date.as_deref() {
        None if mode == Mode::Create => {
            errors.push(FieldError::new("released_date", "is required"));
        }
        Some(date) if !is_valid_date(date) => errors.push(FieldError::new(
            "released_date",
            "must be a YYYY-MM-DD date or an RFC 3339 timestamp",
        )),
        _ => {}
    }

    match movie.duration {
        None if mode == Mode::Create => errors.push(FieldError::new("duration", "is required")),
        Some(minutes) if minutes <= 0 || i32::try_from(minutes).is_err() => {
            errors.push(FieldError::new("duration", "must be a positive number of minutes"));
        }
        _ => {}
    }

    if let Some(Some(cost)) = movie.cost
        && (!cost.is_finite() || cost < 0.0)
    {
        errors.push(FieldError::new("cost", "must be a non-negative number"));
    }

    if let Some(ids) = &movie.actor_ids
        && ids.iter().any(|id| id.trim().is_empty())
    {
        errors.push(FieldError::new("actorIds", "must not contain empty ids"));
    }

    errors
}

/// `movie_id_required` is false when the movie comes from the path.
#[must_use]
pub fn validate_review(review: &ReviewInput, mode: Mode, movie_id_required: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match review.review_score {
        None if mode == Mode::Create => errors.push(FieldError::new("reviewScore", "is required")),
        Some(score) if !(0..=MAX_REVIEW_SCORE).contains(&score) => errors.push(FieldError::new(
            "reviewScore",
            format!("must be between 0 and {MAX_REVIEW_SCORE}"),
        )),
        _ => {}
    }

    required_text(&mut errors, "description", review.description.as_ref(), mode);

    if movie_id_required {
        required_text(&mut errors, "movieId", review.movie_id.as_ref(), mode);
    }

    if let Some(status) = &review.status
        && status.parse::<ReviewStatus>().is_err()
    {
        errors.push(FieldError::new(
            "status",
            "must be one of checking, approved, declined",
        ));
    }

    errors
}

fn validate_email(errors: &mut Vec<FieldError>, email: Option<&String>, mode: Mode) {
    match email {
        None if mode == Mode::Create => errors.push(FieldError::new("email", "is required")),
        Some(email) if !email_pattern().is_match(email.trim()) => {
            errors.push(FieldError::new("email", "is invalid"));
        }
        _ => {}
    }
}

#[must_use]
pub fn validate_signup(signup: &SignupRequest, password_min_length: usize) -> Vec<FieldError> {
    let mut errors = Vec::new();

    required_text(&mut errors, "firstName", signup.first_name.as_ref(), Mode::Create);
    required_text(&mut errors, "lastName", signup.last_name.as_ref(), Mode::Create);
    validate_email(&mut errors, signup.email.as_ref(), Mode::Create);

    match signup.password.as_deref() {
        None | Some("") => errors.push(FieldError::new("password", "is required")),
        Some(password) if password.chars().count() < password_min_length => {
            errors.push(FieldError::new(
                "password",
                format!("must be at least {password_min_length} characters"),
            ));
        }
        _ => {}
    }

    errors
}

#[must_use]
pub fn validate_user_patch(patch: &UserPatch) -> Vec<FieldError> {
    let mut errors = Vec::new();

    required_text(&mut errors, "firstName", patch.first_name.as_ref(), Mode::Patch);
    required_text(&mut errors, "lastName", patch.last_name.as_ref(), Mode::Patch);
    validate_email(&mut errors, patch.email.as_ref(), Mode::Patch);

    if let Some(role) = &patch.role
        && role.trim().is_empty()
    {
        errors.push(FieldError::new("role", "must not be empty"));
    }

    errors
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }
    Ok(trimmed)
}
