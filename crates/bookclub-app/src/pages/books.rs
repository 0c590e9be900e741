use std::fmt::Write as _;

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Form,
};
use bookclub_dal::{
    author::{AuthorRepository, AuthorShort},
    book::{Book, BookRepository},
    review::{newest_first, CreateReview, Review, ReviewRepository, UpdateReview},
    ListingParams, Order,
};
use bookclub_types::claim::UserClaim;
use garde::Validate as _;
use serde::Deserialize;

use crate::{
    auth::{MaybeUser, PageUser},
    error::field_errors,
    pages::{
        render::{self, escape, FieldErrors},
        PageError, PageResult,
    },
    rest_api::{listing_params, Pager, Paging},
    state::AppState,
    validate::Garde,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewForm {
    pub stars_given: i32,
    pub comment: String,
}

impl Default for ReviewForm {
    fn default() -> Self {
        Self {
            stars_given: 5,
            comment: String::new(),
        }
    }
}

pub async fn list(
    repository: BookRepository,
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> PageResult<impl IntoResponse> {
    let page_size = paging.page_size(state.config().default_page_size);
    let total = repository.count(paging.query()).await?;
    let pager = Pager::new(paging.clamped_page(total, page_size), page_size, total);
    let books = repository
        .list(
            listing_params(pager.page, page_size, vec![Order::Asc("id".to_string())]),
            paging.query(),
        )
        .await?;
    Ok(Html(render_list(
        user.as_ref(),
        &books,
        &pager,
        paging.query(),
    )))
}

pub async fn detail(
    Path(id): Path<i64>,
    repository: BookRepository,
    author_repository: AuthorRepository,
    review_repository: ReviewRepository,
    MaybeUser(user): MaybeUser,
) -> PageResult<impl IntoResponse> {
    let book = repository.get(id).await?;
    let authors = author_repository.list_by_book(id).await?;
    let reviews = review_repository
        .list_by_book(id, ListingParams::default().with_order(newest_first()))
        .await?;
    Ok(Html(render_detail(
        user.as_ref(),
        &book,
        &authors,
        &reviews,
        &ReviewForm::default(),
        &FieldErrors::new(),
    )))
}

pub async fn add_review(
    Path(id): Path<i64>,
    repository: BookRepository,
    author_repository: AuthorRepository,
    review_repository: ReviewRepository,
    PageUser(user): PageUser,
    Form(form): Form<ReviewForm>,
) -> PageResult<axum::response::Response> {
    let book = repository.get(id).await?;
    let payload = CreateReview {
        stars_given: form.stars_given,
        comment: form.comment.clone(),
        user_id: user.id,
        book_id: book.id,
    };
    if let Err(report) = payload.validate() {
        let authors = author_repository.list_by_book(id).await?;
        let reviews = review_repository
            .list_by_book(id, ListingParams::default().with_order(newest_first()))
            .await?;
        return Ok(Html(render_detail(
            Some(&user),
            &book,
            &authors,
            &reviews,
            &form,
            &field_errors(&report),
        ))
        .into_response());
    }
    review_repository.create(payload).await?;
    Ok(Redirect::to(&format!("/books/{id}")).into_response())
}

pub async fn edit_review_form(
    Path((book_id, review_id)): Path<(i64, i64)>,
    review_repository: ReviewRepository,
    PageUser(user): PageUser,
) -> PageResult<impl IntoResponse> {
    let review = owned_review(&review_repository, book_id, review_id, &user).await?;
    let form = ReviewForm {
        stars_given: review.stars_given,
        comment: review.comment.clone(),
    };
    Ok(Html(render_edit(
        &user,
        &review,
        &form,
        &FieldErrors::new(),
    )))
}

pub async fn edit_review(
    Path((book_id, review_id)): Path<(i64, i64)>,
    review_repository: ReviewRepository,
    PageUser(user): PageUser,
    Form(form): Form<ReviewForm>,
) -> PageResult<axum::response::Response> {
    let review = owned_review(&review_repository, book_id, review_id, &user).await?;
    let payload = UpdateReview {
        stars_given: Some(form.stars_given),
        comment: Some(form.comment.clone()),
    };
    if let Err(report) = payload.validate() {
        return Ok(Html(render_edit(&user, &review, &form, &field_errors(&report)))
            .into_response());
    }
    review_repository.update_partial(review_id, payload).await?;
    Ok(Redirect::to(&format!("/books/{book_id}")).into_response())
}

pub async fn confirm_delete_review(
    Path((book_id, review_id)): Path<(i64, i64)>,
    review_repository: ReviewRepository,
    PageUser(user): PageUser,
) -> PageResult<impl IntoResponse> {
    let review = owned_review(&review_repository, book_id, review_id, &user).await?;
    Ok(Html(render_confirm_delete(&user, &review)))
}

pub async fn delete_review(
    Path((book_id, review_id)): Path<(i64, i64)>,
    review_repository: ReviewRepository,
    PageUser(user): PageUser,
) -> PageResult<impl IntoResponse> {
    owned_review(&review_repository, book_id, review_id, &user).await?;
    review_repository.delete(review_id).await?;
    Ok(Redirect::to(&format!("/books/{book_id}")))
}

/// Loads a review, checking it belongs to the given book and is owned by the
/// acting user.
async fn owned_review(
    repository: &ReviewRepository,
    book_id: i64,
    review_id: i64,
    user: &UserClaim,
) -> PageResult<Review> {
    let review = repository.get(review_id).await?;
    if review.book.id != book_id {
        return Err(PageError::NotFound("Review".to_string()));
    }
    if review.user.id != user.id {
        return Err(PageError::Forbidden);
    }
    Ok(review)
}

fn render_list(
    user: Option<&UserClaim>,
    books: &[Book],
    pager: &Pager,
    query: Option<&str>,
) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<h1>Books</h1>
<form method="get" action="/books"><input type="text" name="q" value="{}" placeholder="Search books"><button type="submit">Search</button></form>"#,
        escape(query.unwrap_or("")),
    );
    if books.is_empty() {
        body.push_str("<p>No books found.</p>");
    } else {
        body.push_str("<ul>");
        for book in books {
            let _ = write!(
                body,
                r#"<li><a href="/books/{id}">{title}</a> (ISBN {isbn})</li>"#,
                id = book.id,
                title = escape(&book.title),
                isbn = escape(&book.isbn),
            );
        }
        body.push_str("</ul>");
        body.push_str(&render::pager_nav(pager, "/books", query));
    }
    render::layout("Books", user, &body)
}

fn render_review_items(reviews: &[Review]) -> String {
    let mut items = String::from("<ul>");
    for review in reviews {
        let _ = write!(
            items,
            r#"<li id="review-{id}">{stars} stars by <b>{username}</b> on {created}: {comment}
<a href="/books/{book_id}/reviews/{id}/edit">Edit</a>
<a href="/books/{book_id}/reviews/{id}/delete/confirm">Delete</a></li>"#,
            id = review.id,
            stars = review.stars_given,
            username = escape(&review.user.username),
            created = review.created_at,
            comment = escape(&review.comment),
            book_id = review.book.id,
        );
    }
    items.push_str("</ul>");
    items
}

fn render_detail(
    user: Option<&UserClaim>,
    book: &Book,
    authors: &[AuthorShort],
    reviews: &[Review],
    form: &ReviewForm,
    errors: &FieldErrors,
) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<h1>{title}</h1>
<img src="/media/{cover}" alt="cover">
<p>{description}</p>
<p>ISBN: {isbn}</p>"#,
        title = escape(&book.title),
        cover = escape(&book.cover),
        description = escape(&book.description),
        isbn = escape(&book.isbn),
    );
    if !authors.is_empty() {
        let names: Vec<String> = authors
            .iter()
            .map(|a| escape(&format!("{} {}", a.first_name, a.last_name)))
            .collect();
        let _ = write!(body, "<p>By {}</p>", names.join(", "));
    }
    body.push_str("<h2>Reviews</h2>");
    if reviews.is_empty() {
        body.push_str("<p>No reviews yet.</p>");
    } else {
        body.push_str(&render_review_items(reviews));
    }
    match user {
        Some(_) => {
            let _ = write!(
                body,
                r#"<h2>Add a review</h2>
<form method="post" action="/books/{id}/reviews">
<label>Stars {stars}</label>{stars_errors}
<label>Comment <textarea name="comment">{comment}</textarea></label>{comment_errors}
<button type="submit">Submit</button>
</form>"#,
                id = book.id,
                stars = render::stars_select(form.stars_given),
                stars_errors = render::field_error_list(errors, "stars_given"),
                comment = escape(&form.comment),
                comment_errors = render::field_error_list(errors, "comment"),
            );
        }
        None => {
            let _ = write!(
                body,
                r#"<p><a href="/users/login?next=/books/{id}">Log in</a> to add a review.</p>"#,
                id = book.id,
            );
        }
    }
    render::layout(&book.title, user, &body)
}

fn render_edit(
    user: &UserClaim,
    review: &Review,
    form: &ReviewForm,
    errors: &FieldErrors,
) -> String {
    let body = format!(
        r#"<h1>Edit review of {title}</h1>
<form method="post" action="/books/{book_id}/reviews/{id}/edit">
<label>Stars {stars}</label>{stars_errors}
<label>Comment <textarea name="comment">{comment}</textarea></label>{comment_errors}
<button type="submit">Save</button>
</form>"#,
        title = escape(&review.book.title),
        book_id = review.book.id,
        id = review.id,
        stars = render::stars_select(form.stars_given),
        stars_errors = render::field_error_list(errors, "stars_given"),
        comment = escape(&form.comment),
        comment_errors = render::field_error_list(errors, "comment"),
    );
    render::layout("Edit review", Some(user), &body)
}

fn render_confirm_delete(user: &UserClaim, review: &Review) -> String {
    let body = format!(
        r#"<h1>Delete review?</h1>
<p>Your review of <b>{title}</b>: {comment}</p>
<p><a href="/books/{book_id}/reviews/{id}/delete">Yes, delete it</a>
<a href="/books/{book_id}">Cancel</a></p>"#,
        title = escape(&review.book.title),
        comment = escape(&review.comment),
        book_id = review.book.id,
        id = review.id,
    );
    render::layout("Delete review", Some(user), &body)
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list))
        .route("/{book_id}", get(detail))
        .route("/{book_id}/reviews", axum::routing::post(add_review))
        .route(
            "/{book_id}/reviews/{review_id}/edit",
            get(edit_review_form).post(edit_review),
        )
        .route(
            "/{book_id}/reviews/{review_id}/delete/confirm",
            get(confirm_delete_review),
        )
        .route("/{book_id}/reviews/{review_id}/delete", get(delete_review))
}
