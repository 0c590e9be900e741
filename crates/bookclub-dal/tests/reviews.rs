use bookclub_dal::{ListingParams, review::newest_first};
use futures::TryStreamExt as _;
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username, first_name, last_name, email, password)
VALUES (1,'sayitkamol','Sayitkamol','Azimjonov','sayitkamol@example.com',NULL);
INSERT INTO users (id, username, first_name, last_name, email, password)
VALUES (2,'jasur','Jasur','Ismoilov','jasur@example.com',NULL);

INSERT INTO book (id, title, description, isbn) VALUES (1,'book1','description1','12334543');
INSERT INTO book (id, title, description, isbn) VALUES (2,'book2','description2','2222222');
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

fn new_review(stars_given: i32, comment: &str, user_id: i64, book_id: i64) -> bookclub_dal::review::CreateReview {
    bookclub_dal::review::CreateReview {
        stars_given,
        comment: comment.to_string(),
        user_id,
        book_id,
    }
}

#[tokio::test]
async fn test_review_roundtrip() {
    let conn = init_db().await;
    let repo = bookclub_dal::review::ReviewRepositoryImpl::new(conn);

    let created = repo.create(new_review(4, "very good", 1, 1)).await.unwrap();
    assert_eq!(created.stars_given, 4);
    assert_eq!(created.comment, "very good");
    assert_eq!(created.book.id, 1);
    assert_eq!(created.book.title, "book1");
    assert_eq!(created.book.isbn, "12334543");
    assert_eq!(created.user.id, 1);
    assert_eq!(created.user.username, "sayitkamol");

    let fetched = repo.get(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.stars_given, created.stars_given);
    assert_eq!(fetched.comment, created.comment);
    assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn test_review_missing_references() {
    let conn = init_db().await;
    let repo = bookclub_dal::review::ReviewRepositoryImpl::new(conn);

    let err = repo.create(new_review(4, "very good", 55, 1)).await.unwrap_err();
    assert!(matches!(err, bookclub_dal::Error::RecordNotFound(_)));

    let err = repo.create(new_review(4, "very good", 1, 55)).await.unwrap_err();
    assert!(matches!(err, bookclub_dal::Error::RecordNotFound(_)));

    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_review_list_newest_first() {
    let conn = init_db().await;

    // created_at deliberately out of id order for the first row
    const REVIEWS: &str = r#"
    INSERT INTO book_review (id, user_id, book_id, stars_given, comment, created_at)
    VALUES (1,1,1,5,'Very good','2026-03-03 10:00:00');
    INSERT INTO book_review (id, user_id, book_id, stars_given, comment, created_at)
    VALUES (2,1,1,4,'Useful book','2026-03-01 10:00:00');
    INSERT INTO book_review (id, user_id, book_id, stars_given, comment, created_at)
    VALUES (3,2,2,3,'Nice book','2026-03-02 10:00:00');
    "#;
    conn.execute_many(REVIEWS)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    let repo = bookclub_dal::review::ReviewRepositoryImpl::new(conn);
    let params = ListingParams::default().with_order(newest_first());
    let all = repo.list(params).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 2]);

    let book_one = repo
        .list_by_book(1, ListingParams::default().with_order(newest_first()))
        .await
        .unwrap();
    let ids: Vec<i64> = book_one.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(repo.count_by_book(1).await.unwrap(), 2);
}

#[tokio::test]
async fn test_review_same_timestamp_tiebreak() {
    let conn = init_db().await;
    let repo = bookclub_dal::review::ReviewRepositoryImpl::new(conn);

    let first = repo.create(new_review(4, "very good", 1, 1)).await.unwrap();
    let second = repo.create(new_review(2, "Not good", 2, 1)).await.unwrap();

    let all = repo
        .list(ListingParams::default().with_order(newest_first()))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);
}

#[tokio::test]
async fn test_review_update() {
    let conn = init_db().await;
    let repo = bookclub_dal::review::ReviewRepositoryImpl::new(conn);

    let created = repo.create(new_review(5, "very good", 1, 1)).await.unwrap();

    let patched = repo
        .update_partial(
            created.id,
            bookclub_dal::review::UpdateReview {
                stars_given: Some(4),
                comment: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.stars_given, 4);
    assert_eq!(patched.comment, "very good");

    let replaced = repo
        .update(created.id, new_review(2, "Not good", 2, 1))
        .await
        .unwrap();
    assert_eq!(replaced.stars_given, 2);
    assert_eq!(replaced.comment, "Not good");
    assert_eq!(replaced.user.id, 2);

    let err = repo
        .update(999, new_review(2, "Not good", 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, bookclub_dal::Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_review_delete_terminal() {
    let conn = init_db().await;
    let repo = bookclub_dal::review::ReviewRepositoryImpl::new(conn);

    let created = repo.create(new_review(3, "Nice book", 1, 1)).await.unwrap();
    repo.delete(created.id).await.unwrap();

    let err = repo.get(created.id).await.unwrap_err();
    assert!(matches!(err, bookclub_dal::Error::RecordNotFound(_)));
    let err = repo.delete(created.id).await.unwrap_err();
    assert!(matches!(err, bookclub_dal::Error::RecordNotFound(_)));
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cascade_on_book_delete() {
    let conn = init_db().await;
    let reviews = bookclub_dal::review::ReviewRepositoryImpl::new(conn.clone());
    let books = bookclub_dal::book::BookRepositoryImpl::new(conn);

    reviews.create(new_review(5, "Very good", 1, 1)).await.unwrap();
    reviews.create(new_review(4, "Useful book", 2, 1)).await.unwrap();
    let other = reviews.create(new_review(3, "Nice book", 1, 2)).await.unwrap();

    books.delete(1).await.unwrap();

    assert_eq!(reviews.count().await.unwrap(), 1);
    assert_eq!(reviews.get(other.id).await.unwrap().id, other.id);
}

#[tokio::test]
async fn test_cascade_on_user_delete() {
    let conn = init_db().await;
    let reviews = bookclub_dal::review::ReviewRepositoryImpl::new(conn.clone());
    let users = bookclub_dal::user::UserRepositoryImpl::new(conn);

    reviews.create(new_review(5, "Very good", 1, 1)).await.unwrap();
    let kept = reviews.create(new_review(4, "Useful book", 2, 2)).await.unwrap();

    users.delete(1).await.unwrap();

    assert_eq!(reviews.count().await.unwrap(), 1);
    assert_eq!(reviews.get(kept.id).await.unwrap().user.username, "jasur");
}
