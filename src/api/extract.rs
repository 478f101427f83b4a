use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::Deserialize;

use super::ApiError;
use crate::db::{Filter, Where};

/// `Json<T>` whose rejections render as enveloped 400s.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(rejection.body_text())),
        }
    }
}

/// `?filter=<json>` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub filter: Option<String>,
}

impl FilterQuery {
    pub fn parse(&self) -> Result<Filter, ApiError> {
        match self.filter.as_deref().map(str::trim) {
            None | Some("") => Ok(Filter::default()),
            Some(raw) => Ok(Filter::parse(raw)?),
        }
    }
}

/// `?where=<json>` on bulk patch and delete endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct WhereQuery {
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
}

impl WhereQuery {
    pub fn parse(&self) -> Result<Option<Where>, ApiError> {
        match self.where_clause.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str::<Where>(raw)
                .map(Some)
                .map_err(|e| ApiError::validation(format!("Invalid filter: {e}"))),
        }
    }
}
