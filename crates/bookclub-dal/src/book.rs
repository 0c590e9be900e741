use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Acquire as _;
use sqlx::Pool;

use crate::{Error, ListingParams, error::Result};

const VALID_ORDER_FIELDS: &[&str] = &["id", "title"];

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateBook {
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    #[garde(length(min = 1, max = 5000))]
    pub description: String,
    #[garde(length(min = 1, max = 17))]
    pub isbn: String,
    #[garde(length(min = 1, max = 1023))]
    pub cover: Option<String>,
    #[garde(inner(inner(range(min = 1))))]
    pub authors: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub isbn: String,
    pub cover: String,
}

/// Nested shape used inside a review.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct BookShort {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub isbn: String,
}

pub type BookRepository = BookRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = crate::ChosenDB> + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateBook) -> Result<Book> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result = sqlx::query(
            "INSERT INTO book (title, description, isbn, cover) \
             VALUES (?, ?, ?, coalesce(?, 'default_cover.jpg'))",
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.isbn)
        .bind(&payload.cover)
        .execute(&mut *transaction)
        .await?;

        let id = result.last_insert_rowid();
        if let Some(authors) = payload.authors {
            link_authors(&mut transaction, id, &authors).await?;
        }
        let record = get(id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(record)
    }

    pub async fn update(&self, id: i64, payload: CreateBook) -> Result<Book> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result = sqlx::query(
            "UPDATE book SET title = ?, description = ?, isbn = ?, \
             cover = coalesce(?, cover) WHERE id = ?",
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.isbn)
        .bind(&payload.cover)
        .bind(id)
        .execute(&mut *transaction)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Book".to_string()));
        }
        if let Some(authors) = payload.authors {
            sqlx::query("DELETE FROM book_authors WHERE book_id = ?")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            link_authors(&mut transaction, id, &authors).await?;
        }
        let record = get(id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(record)
    }

    /// Removes the book together with its reviews and author links.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        sqlx::query("DELETE FROM book_review WHERE book_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("DELETE FROM book_authors WHERE book_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        let result = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Book".to_string()))
        } else {
            transaction.commit().await?;
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        get(id, &self.executor).await
    }

    /// Pages through the catalog, optionally narrowed to a case-insensitive
    /// title substring.
    pub async fn list(&self, params: ListingParams, filter: Option<&str>) -> Result<Vec<Book>> {
        let ordering = params.ordering(VALID_ORDER_FIELDS)?;
        let where_clause = match filter {
            Some(_) => "WHERE title LIKE ?",
            None => "",
        };
        let sql = format!(
            "SELECT id, title, description, isbn, cover FROM book \
             {where_clause} {ordering} LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query_as::<_, Book>(&sql);
        if let Some(filter) = filter {
            query = query.bind(format!("%{}%", filter));
        }
        let records = query
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    pub async fn count(&self, filter: Option<&str>) -> Result<u64> {
        let count: u64 = match filter {
            Some(filter) => {
                sqlx::query_scalar("SELECT count(*) FROM book WHERE title LIKE ?")
                    .bind(format!("%{}%", filter))
                    .fetch_one(&self.executor)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT count(*) FROM book")
                    .fetch_one(&self.executor)
                    .await?
            }
        };
        Ok(count)
    }
}

async fn get<'c, E>(id: i64, executor: E) -> Result<Book>
where
    E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    let record = sqlx::query_as::<_, Book>(
        "SELECT id, title, description, isbn, cover FROM book WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::RecordNotFound("Book".to_string()))?;
    Ok(record)
}

async fn link_authors(
    transaction: &mut sqlx::Transaction<'_, crate::ChosenDB>,
    book_id: i64,
    authors: &[i64],
) -> Result<()> {
    for author_id in authors {
        sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(author_id)
            .execute(&mut **transaction)
            .await?;
    }
    Ok(())
}
