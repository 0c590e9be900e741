pub mod books;
pub mod home;
pub mod render;
pub mod users;

use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;
use tracing::error;

pub type PageResult<T> = Result<T, PageError>;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<bookclub_dal::Error> for PageError {
    fn from(value: bookclub_dal::Error) -> Self {
        match value {
            bookclub_dal::Error::RecordNotFound(entity) => PageError::NotFound(entity),
            other => PageError::Internal(other.into()),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Html(render::error_page(&format!("{what} not found."))),
            )
                .into_response(),
            PageError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(render::error_page("You are not allowed to do this.")),
            )
                .into_response(),
            PageError::Internal(e) => {
                error!("Page failure: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(render::error_page("Something went wrong.")),
                )
                    .into_response()
            }
        }
    }
}
