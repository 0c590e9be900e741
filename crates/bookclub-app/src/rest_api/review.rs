use bookclub_dal::review::{newest_first, CreateReview, ReviewRepository, UpdateReview};

use crate::auth::Identity;
use crate::state::AppState;
#[allow(unused_imports)]
use axum::routing::{delete, get, post, put};

crate::repository_from_request!(ReviewRepository);

mod crud_api {
    use super::*;
    use crate::error::ApiResult;
    use crate::rest_api::{listing_params, Page, Pager, Paging};
    use crate::validate::Garde;
    use axum::{
        extract::{Path, Query, State},
        response::IntoResponse,
        Json,
    };
    use http::StatusCode;

    pub async fn list(
        repository: ReviewRepository,
        State(state): State<AppState>,
        _user: Identity,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        let page_size = paging.page_size(state.config().default_page_size);
        let total = repository.count().await?;
        let pager = Pager::new(paging.clamped_page(total, page_size), page_size, total);
        let rows = repository
            .list(listing_params(pager.page, page_size, newest_first()))
            .await?;
        let endpoint = state.build_url("/api/reviews")?;
        Ok((
            StatusCode::OK,
            Json(Page::new(pager, rows, &endpoint, None)),
        ))
    }

    pub async fn get_one(
        Path(id): Path<i64>,
        repository: ReviewRepository,
        _user: Identity,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.get(id).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    // TODO: tie user_id to the session user and restrict mutation to the
    // review owner, the page surface already does; clients currently may act
    // on any user's behalf here.
    pub async fn create(
        repository: ReviewRepository,
        _user: Identity,
        Garde(Json(payload)): Garde<Json<CreateReview>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.create(payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn update(
        Path(id): Path<i64>,
        repository: ReviewRepository,
        _user: Identity,
        Garde(Json(payload)): Garde<Json<CreateReview>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.update(id, payload).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn update_partial(
        Path(id): Path<i64>,
        repository: ReviewRepository,
        _user: Identity,
        Garde(Json(payload)): Garde<Json<UpdateReview>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.update_partial(id, payload).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn delete_one(
        Path(id): Path<i64>,
        repository: ReviewRepository,
        _user: Identity,
    ) -> ApiResult<impl IntoResponse> {
        repository.delete(id).await?;

        Ok((StatusCode::NO_CONTENT, ()))
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/{id}",
            get(crud_api::get_one)
                .put(crud_api::update)
                .patch(crud_api::update_partial)
                .delete(crud_api::delete_one),
        )
}
