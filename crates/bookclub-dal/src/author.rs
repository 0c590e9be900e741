use futures::TryStreamExt as _;
use bookclub_types::general::ValidEmail;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;

use crate::{Error, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateAuthor {
    #[garde(length(min = 1, max = 100))]
    pub first_name: String,
    #[garde(length(min = 1, max = 100))]
    pub last_name: String,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(min = 1, max = 5000))]
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct AuthorShort {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

pub type AuthorRepository = AuthorRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct AuthorRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> AuthorRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateAuthor) -> Result<Author> {
        let result = sqlx::query(
            "INSERT INTO author (first_name, last_name, email, bio) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(payload.email.as_ref())
        .bind(&payload.bio)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Author> {
        let record = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, last_name, email, bio FROM author WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Author".to_string()))?;
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Author".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn list_by_book(&self, book_id: i64) -> Result<Vec<AuthorShort>> {
        let records = sqlx::query_as::<_, AuthorShort>(
            "SELECT a.id, a.first_name, a.last_name FROM author a \
             JOIN book_authors ba ON ba.author_id = a.id \
             WHERE ba.book_id = ? ORDER BY a.last_name, a.first_name",
        )
        .bind(book_id)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM author")
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }
}
