use bookclub_dal::{
    author::AuthorRepository,
    book::{Book, BookRepository, CreateBook},
    Order,
};
use serde::Serialize;

use crate::auth::{Identity, RequireAdmin};
use crate::state::AppState;
#[allow(unused_imports)]
use axum::routing::{delete, get, post, put};

crate::repository_from_request!(BookRepository);

/// Detail shape, the flat catalog record plus its linked authors.
#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<bookclub_dal::author::AuthorShort>,
}

fn by_id() -> Vec<Order> {
    vec![Order::Asc("id".to_string())]
}

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
        repository: BookRepository,
        State(state): State<AppState>,
        _user: Identity,
        Garde(Query(paging)): Garde<Query<Paging>>,
    ) -> ApiResult<impl IntoResponse> {
        let page_size = paging.page_size(state.config().default_page_size);
        let total = repository.count(paging.query()).await?;
        let pager = Pager::new(paging.clamped_page(total, page_size), page_size, total);
        let rows = repository
            .list(listing_params(pager.page, page_size, by_id()), paging.query())
            .await?;
        let endpoint = state.build_url("/api/books")?;
        Ok((
            StatusCode::OK,
            Json(Page::new(pager, rows, &endpoint, paging.query())),
        ))
    }

    pub async fn get_one(
        Path(id): Path<i64>,
        repository: BookRepository,
        author_repository: AuthorRepository,
        _user: Identity,
    ) -> ApiResult<impl IntoResponse> {
        let book = repository.get(id).await?;
        let authors = author_repository.list_by_book(id).await?;

        Ok((StatusCode::OK, Json(BookDetail { book, authors })))
    }

    pub async fn create(
        repository: BookRepository,
        _admin: RequireAdmin,
        Garde(Json(payload)): Garde<Json<CreateBook>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.create(payload).await?;

        Ok((StatusCode::CREATED, Json(record)))
    }

    pub async fn update(
        Path(id): Path<i64>,
        repository: BookRepository,
        _admin: RequireAdmin,
        Garde(Json(payload)): Garde<Json<CreateBook>>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.update(id, payload).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    pub async fn delete_one(
        Path(id): Path<i64>,
        repository: BookRepository,
        _admin: RequireAdmin,
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
                .delete(crud_api::delete_one),
        )
}
