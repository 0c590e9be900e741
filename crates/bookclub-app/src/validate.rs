use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use garde::{Report, Validate};
use http::StatusCode;
use serde_json::json;
use std::fmt::{Display, Formatter};
use std::ops::{Deref, DerefMut};

use crate::error::field_errors;
use crate::state::AppState;

/// Extractor wrapper that runs the payload through its validation rules
/// before the handler sees it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Garde<E>(pub E);

impl<E> Deref for Garde<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> DerefMut for Garde<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<E: Display> Display for Garde<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> Garde<E> {
    pub fn into_inner(self) -> E {
        self.0
    }
}

#[derive(Debug)]
pub enum GardeRejection<E> {
    /// The payload was parsed but failed validation.
    Invalid(Report),
    /// The inner extractor itself failed.
    Inner(E),
}

impl<E: Display> Display for GardeRejection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GardeRejection::Invalid(errors) => write!(f, "{errors}"),
            GardeRejection::Inner(error) => write!(f, "{error}"),
        }
    }
}

impl<E> From<Report> for GardeRejection<E> {
    fn from(value: Report) -> Self {
        Self::Invalid(value)
    }
}

impl<E: IntoResponse> IntoResponse for GardeRejection<E> {
    fn into_response(self) -> Response {
        match self {
            GardeRejection::Invalid(report) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({"errors": field_errors(&report)})),
            )
                .into_response(),
            GardeRejection::Inner(e) => e.into_response(),
        }
    }
}

impl<Extractor, T> FromRequest<AppState> for Garde<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequest<AppState>,
{
    type Rejection = GardeRejection<<Extractor as FromRequest<AppState>>::Rejection>;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request(req, state)
            .await
            .map_err(GardeRejection::Inner)?;

        inner.deref().validate()?;
        Ok(Garde(inner))
    }
}

impl<Extractor, T> FromRequestParts<AppState> for Garde<Extractor>
where
    T: Validate<Context = ()>,
    Extractor: Deref<Target = T> + FromRequestParts<AppState>,
{
    type Rejection = GardeRejection<<Extractor as FromRequestParts<AppState>>::Rejection>;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let inner = Extractor::from_request_parts(parts, state)
            .await
            .map_err(GardeRejection::Inner)?;

        inner.deref().validate()?;
        Ok(Garde(inner))
    }
}
