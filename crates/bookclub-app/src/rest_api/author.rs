use bookclub_dal::author::{AuthorRepository, CreateAuthor};

use crate::auth::{Identity, RequireAdmin};
use crate::state::AppState;
#[allow(unused_imports)]
use axum::routing::{delete, get, post};

crate::repository_from_request!(AuthorRepository);

mod crud_api {
    use super::*;
    use crate::error::ApiResult;
    use crate::validate::Garde;
    use axum::{extract::Path, response::IntoResponse, Json};
    use http::StatusCode;

    pub async fn create(
        repository: AuthorRepository,
        _admin: RequireAdmin,
        Garde(Json(payload)): Garde<Json<CreateAuthor>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.create(payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn get_one(
        Path(id): Path<i64>,
        repository: AuthorRepository,
        _user: Identity,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(id).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn delete_one(
        Path(id): Path<i64>,
        repository: AuthorRepository,
        _admin: RequireAdmin,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete(id).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", post(crud_api::create))
        .route("/{id}", get(crud_api::get_one).delete(crud_api::delete_one))
}
