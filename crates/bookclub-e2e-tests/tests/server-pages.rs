use bookclub_e2e_tests::{
    TestUser, anonymous_client, launch_env, log_in, prepare_env, rest::create_book, seed_user,
    spawn_server,
};
use reqwest::StatusCode;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_empty_catalog_indicator() {
    let (args, _config_guard) = prepare_env("test_empty_catalog").await.unwrap();
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let client = anonymous_client().unwrap();
    let body = client
        .get(base_url.join("books").unwrap())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("No books found."));
}

#[tokio::test]
#[traced_test]
async fn test_catalog_listing_and_search() {
    let (args, _config_guard) = prepare_env("test_catalog_listing").await.unwrap();
    let base_url = args.base_url.clone();

    let conn = bookclub_dal::new_pool(&args.database_url()).await.unwrap();
    for (title, isbn) in [("book1", "1234234"), ("book2", "2222222"), ("book3", "3333333")] {
        sqlx::query("INSERT INTO book (title, description, isbn) VALUES (?, ?, ?)")
            .bind(title)
            .bind("description")
            .bind(isbn)
            .execute(&conn)
            .await
            .unwrap();
    }
    spawn_server(args).await.unwrap();

    let client = anonymous_client().unwrap();
    let mut list_url = base_url.join("books").unwrap();
    list_url.set_query(Some("page_size=2"));
    let body = client.get(list_url).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("book1"));
    assert!(body.contains("book2"));
    assert!(!body.contains("book3"));
    assert!(body.contains("Next"));

    let mut search_url = base_url.join("books").unwrap();
    search_url.set_query(Some("q=BOOK3"));
    let body = client.get(search_url).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("book3"));
    assert!(!body.contains("book1"));
}

#[tokio::test]
#[traced_test]
async fn test_review_lifecycle_via_forms() {
    let (args, _config_guard) = prepare_env("test_review_lifecycle_forms").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _user) = launch_env(args, TestUser::Admin).await.unwrap();

    let book = create_book(&client, &base_url, "sport", "description1", "1234234")
        .await
        .unwrap();
    let detail_url = base_url.join(&format!("books/{}", book.id)).unwrap();

    // create through the detail page form
    let response = client
        .post(base_url.join(&format!("books/{}/reviews", book.id)).unwrap())
        .form(&[("stars_given", "3"), ("comment", "Nice book")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let body = client
        .get(detail_url.clone())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Nice book"));
    assert!(body.contains("3 stars"));

    // the review id is needed for the edit and delete URLs
    let page: serde_json::Value = client
        .get(base_url.join("api/reviews").unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let review_id = page["results"][0]["id"].as_i64().unwrap();

    // edit
    let edit_url = base_url
        .join(&format!("books/{}/reviews/{}/edit", book.id, review_id))
        .unwrap();
    let body = client
        .get(edit_url.clone())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Nice book"));

    let response = client
        .post(edit_url)
        .form(&[("stars_given", "4"), ("comment", "Useful book")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let body = client
        .get(detail_url.clone())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Useful book"));
    assert!(!body.contains("Nice book"));

    // two step delete: confirmation page first, then the delete action
    let confirm_url = base_url
        .join(&format!(
            "books/{}/reviews/{}/delete/confirm",
            book.id, review_id
        ))
        .unwrap();
    let body = client
        .get(confirm_url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Delete review?"));
    assert!(body.contains("Useful book"));

    let delete_url = base_url
        .join(&format!("books/{}/reviews/{}/delete", book.id, review_id))
        .unwrap();
    let response = client.get(delete_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let body = client
        .get(detail_url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!body.contains("Useful book"));
    assert!(body.contains("No reviews yet."));
}

#[tokio::test]
#[traced_test]
async fn test_review_form_validation() {
    let (args, _config_guard) = prepare_env("test_review_form_validation").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _user) = launch_env(args, TestUser::Admin).await.unwrap();

    let book = create_book(&client, &base_url, "sport", "description1", "1234234")
        .await
        .unwrap();

    let response = client
        .post(base_url.join(&format!("books/{}/reviews", book.id)).unwrap())
        .form(&[("stars_given", "6"), ("comment", "Nice book")])
        .send()
        .await
        .unwrap();
    // the form is re-rendered with field errors instead of persisting
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"class="errors""#));

    let page: serde_json::Value = client
        .get(base_url.join("api/reviews").unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["count"].as_u64().unwrap(), 0);
}

#[tokio::test]
#[traced_test]
async fn test_review_mutation_requires_login() {
    let (args, _config_guard) = prepare_env("test_review_requires_login").await.unwrap();
    let base_url = args.base_url.clone();

    let conn = bookclub_dal::new_pool(&args.database_url()).await.unwrap();
    sqlx::query("INSERT INTO book (title, description, isbn) VALUES ('sport', 'description1', '1234234')")
        .execute(&conn)
        .await
        .unwrap();
    spawn_server(args).await.unwrap();

    let client = anonymous_client().unwrap();
    let response = client
        .post(base_url.join("books/1/reviews").unwrap())
        .form(&[("stars_given", "3"), ("comment", "Nice book")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get("Location")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("/users/login?next="));
}

#[tokio::test]
#[traced_test]
async fn test_review_edit_is_owner_only() {
    let (args, _config_guard) = prepare_env("test_review_owner_only").await.unwrap();
    let base_url = args.base_url.clone();

    seed_user(&args, TestUser::Reader).await.unwrap();
    let (owner_client, owner) = launch_env(args, TestUser::Admin).await.unwrap();

    let book = create_book(&owner_client, &base_url, "sport", "description1", "1234234")
        .await
        .unwrap();
    let review = bookclub_e2e_tests::rest::create_review(
        &owner_client,
        &base_url,
        5,
        "Very good",
        owner.id,
        book.id,
    )
    .await
    .unwrap();

    let other_client = anonymous_client().unwrap();
    log_in(&other_client, &base_url, "reader").await.unwrap();

    let edit_url = base_url
        .join(&format!("books/{}/reviews/{}/edit", book.id, review.id))
        .unwrap();
    let response = other_client.get(edit_url.clone()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = other_client
        .post(edit_url)
        .form(&[("stars_given", "1"), ("comment", "mine now")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let delete_url = base_url
        .join(&format!("books/{}/reviews/{}/delete", book.id, review.id))
        .unwrap();
    let response = other_client.get(delete_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // the owner still can
    let response = owner_client
        .get(base_url
            .join(&format!("books/{}/reviews/{}/edit", book.id, review.id))
            .unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[traced_test]
async fn test_home_feed() {
    let (args, _config_guard) = prepare_env("test_home_feed").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, user) = launch_env(args, TestUser::Admin).await.unwrap();

    let body = client
        .get(base_url.clone())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("No reviews yet."));

    let book = create_book(&client, &base_url, "sport", "description1", "1234234")
        .await
        .unwrap();
    for comment in ["Very good", "Useful book", "Nice book"] {
        bookclub_e2e_tests::rest::create_review(&client, &base_url, 4, comment, user.id, book.id)
            .await
            .unwrap();
    }

    // newest first, two per page by default
    let mut home_url = base_url.clone();
    home_url.set_query(Some("page_size=2"));
    let body = client.get(home_url).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("Nice book"));
    assert!(body.contains("Useful book"));
    assert!(!body.contains("Very good"));
}
