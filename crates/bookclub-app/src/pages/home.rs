use std::fmt::Write as _;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
};
use bookclub_dal::review::{newest_first, Review, ReviewRepository};
use bookclub_types::claim::UserClaim;

use crate::{
    auth::MaybeUser,
    pages::{
        render::{self, escape},
        PageResult,
    },
    rest_api::{listing_params, Pager, Paging},
    state::AppState,
    validate::Garde,
};

/// Home page, a feed of the most recent reviews.
pub async fn home(
    repository: ReviewRepository,
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> PageResult<impl IntoResponse> {
    let page_size = paging.page_size(state.config().default_page_size);
    let total = repository.count().await?;
    let pager = Pager::new(paging.clamped_page(total, page_size), page_size, total);
    let reviews = repository
        .list(listing_params(pager.page, page_size, newest_first()))
        .await?;
    Ok(Html(render_home(user.as_ref(), &reviews, &pager)))
}

fn render_home(user: Option<&UserClaim>, reviews: &[Review], pager: &Pager) -> String {
    let mut body = String::from("<h1>Recent reviews</h1>");
    if reviews.is_empty() {
        body.push_str("<p>No reviews yet.</p>");
    } else {
        body.push_str("<ul>");
        for review in reviews {
            let _ = write!(
                body,
                r#"<li>{stars} stars for <a href="/books/{book_id}">{title}</a> by <b>{username}</b>: {comment}</li>"#,
                stars = review.stars_given,
                book_id = review.book.id,
                title = escape(&review.book.title),
                username = escape(&review.user.username),
                comment = escape(&review.comment),
            );
        }
        body.push_str("</ul>");
        body.push_str(&render::pager_nav(pager, "/", None));
    }
    render::layout("Home", user, &body)
}
