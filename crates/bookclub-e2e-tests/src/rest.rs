use anyhow::Result;
use bookclub_dal::{author::Author, book::Book, review::Review};
use reqwest::Url;
use serde_json::json;
use tracing::info;

pub async fn create_book(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
    description: &str,
    isbn: &str,
) -> Result<Book> {
    let payload = json!({"title": title, "description": description, "isbn": isbn});
    let api_url = base_url.join("api/books")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Book response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);

    let new_book: Book = response.json().await?;
    Ok(new_book)
}

pub async fn create_review(
    client: &reqwest::Client,
    base_url: &Url,
    stars_given: i32,
    comment: &str,
    user_id: i64,
    book_id: i64,
) -> Result<Review> {
    let payload = json!({
        "stars_given": stars_given,
        "comment": comment,
        "user_id": user_id,
        "book_id": book_id,
    });
    let api_url = base_url.join("api/reviews")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Review response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);

    let new_review: Review = response.json().await?;
    Ok(new_review)
}

pub async fn create_author(
    client: &reqwest::Client,
    base_url: &Url,
    first_name: &str,
    last_name: &str,
) -> Result<Author> {
    let payload = json!({
        "first_name": first_name,
        "last_name": last_name,
        "email": format!("{}@example.com", first_name.to_lowercase()),
    });
    let api_url = base_url.join("api/authors")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Author response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);

    let new_author: Author = response.json().await?;
    Ok(new_author)
}
