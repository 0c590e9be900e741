use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _};

use crate::{
    ChosenRow, Error, ListingParams, book::BookShort, error::Result, user::UserShort,
};

const VALID_ORDER_FIELDS: &[&str] = &["id", "created_at", "stars_given"];

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateReview {
    #[garde(range(min = 1, max = 5))]
    pub stars_given: i32,
    #[garde(length(min = 1, max = 5000))]
    pub comment: String,
    #[garde(range(min = 1))]
    pub user_id: i64,
    #[garde(range(min = 1))]
    pub book_id: i64,
}

/// Partial update, absent fields keep their stored value.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateReview {
    #[garde(range(min = 1, max = 5))]
    pub stars_given: Option<i32>,
    #[garde(length(min = 1, max = 5000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    pub id: i64,
    pub stars_given: i32,
    pub comment: String,
    pub created_at: time::PrimitiveDateTime,
    pub book: BookShort,
    pub user: UserShort,
}

impl sqlx::FromRow<'_, ChosenRow> for Review {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let book = BookShort {
            id: row.try_get("book_id")?,
            title: row.try_get("book_title")?,
            description: row.try_get("book_description")?,
            isbn: row.try_get("book_isbn")?,
        };
        let user = UserShort {
            id: row.try_get("user_id")?,
            first_name: row.try_get("user_first_name")?,
            username: row.try_get("user_username")?,
        };
        Ok(Review {
            id: row.try_get("id")?,
            stars_given: row.try_get("stars_given")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
            book,
            user,
        })
    }
}

const REVIEW_SELECT: &str = "\
    SELECT r.id, r.stars_given, r.comment, r.created_at, \
    b.id AS book_id, b.title AS book_title, b.description AS book_description, b.isbn AS book_isbn, \
    u.id AS user_id, u.first_name AS user_first_name, u.username AS user_username \
    FROM book_review r \
    JOIN book b ON r.book_id = b.id \
    JOIN users u ON r.user_id = u.id";

pub type ReviewRepository = ReviewRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Creates a review for an existing user and book, stamping it with the
    /// current time.
    pub async fn create(&self, payload: CreateReview) -> Result<Review> {
        self.check_reference("users", "User", payload.user_id).await?;
        self.check_reference("book", "Book", payload.book_id).await?;
        let result = sqlx::query(
            "INSERT INTO book_review (user_id, book_id, stars_given, comment, created_at) \
             VALUES (?, ?, ?, ?, datetime('now'))",
        )
        .bind(payload.user_id)
        .bind(payload.book_id)
        .bind(payload.stars_given)
        .bind(&payload.comment)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Review> {
        let record = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))?;
        Ok(record)
    }

    /// Full replace, every field of the payload is written.
    pub async fn update(&self, id: i64, payload: CreateReview) -> Result<Review> {
        self.check_reference("users", "User", payload.user_id).await?;
        self.check_reference("book", "Book", payload.book_id).await?;
        let result = sqlx::query(
            "UPDATE book_review SET user_id = ?, book_id = ?, stars_given = ?, comment = ? \
             WHERE id = ?",
        )
        .bind(payload.user_id)
        .bind(payload.book_id)
        .bind(payload.stars_given)
        .bind(&payload.comment)
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn update_partial(&self, id: i64, payload: UpdateReview) -> Result<Review> {
        let mut assignments = Vec::new();
        if payload.stars_given.is_some() {
            assignments.push("stars_given = ?");
        }
        if payload.comment.is_some() {
            assignments.push("comment = ?");
        }
        if assignments.is_empty() {
            return self.get(id).await;
        }
        let sql = format!(
            "UPDATE book_review SET {} WHERE id = ?",
            assignments.join(", ")
        );
        let mut query = sqlx::query(&sql);
        if let Some(stars_given) = payload.stars_given {
            query = query.bind(stars_given);
        }
        if let Some(comment) = &payload.comment {
            query = query.bind(comment);
        }
        let result = query.bind(id).execute(&self.executor).await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM book_review WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn list(&self, params: ListingParams) -> Result<Vec<Review>> {
        let ordering = params.ordering(VALID_ORDER_FIELDS)?;
        let records = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} {ordering} LIMIT ? OFFSET ?"
        ))
        .bind(params.limit)
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    pub async fn list_by_book(&self, book_id: i64, params: ListingParams) -> Result<Vec<Review>> {
        let ordering = params.ordering(VALID_ORDER_FIELDS)?;
        let records = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.book_id = ? {ordering} LIMIT ? OFFSET ?"
        ))
        .bind(book_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM book_review")
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    pub async fn count_by_book(&self, book_id: i64) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM book_review WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    async fn check_reference(&self, table: &str, entity: &str, id: i64) -> Result<()> {
        let found = sqlx::query_scalar::<_, i64>(&format!("SELECT id FROM {table} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(Error::RecordNotFound(entity.to_string())),
        }
    }
}

/// Newest first, ties broken towards the later insert.
pub fn newest_first() -> Vec<crate::Order> {
    vec![
        crate::Order::Desc("created_at".to_string()),
        crate::Order::Desc("id".to_string()),
    ]
}
