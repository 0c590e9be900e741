use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{Result as HashResult, SaltString, rand_core::OsRng},
};

use bookclub_types::{claim::Role, general::ValidEmail};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Acquire as _;
use sqlx::Pool;
use tracing::debug;

use crate::{Error, error::Result};

fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

fn is_valid_role(role: &str, _ctx: &()) -> garde::Result {
    role.parse::<Role>()
        .map_err(|e| garde::Error::new(e))
        .map(|_| ())
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateUser {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[garde(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(min = 8, max = 255))]
    pub password: Option<String>,
    #[garde(length(min = 1, max = 1023))]
    pub avatar: Option<String>,
    #[garde(inner(inner(custom(is_valid_role))))]
    pub roles: Option<Vec<String>>,
}

/// Profile edit payload, password and roles are managed separately.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct UpdateProfile {
    #[garde(length(min = 1, max = 150))]
    pub username: String,
    #[garde(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[garde(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(min = 1, max = 1023))]
    pub avatar: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserInt {
    id: i64,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: String,
    avatar: Option<String>,
    roles: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub roles: Option<Vec<String>>,
}

impl From<UserInt> for User {
    fn from(value: UserInt) -> Self {
        Self {
            id: value.id,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
            email: value.email,
            avatar: value.avatar,
            roles: value.roles.map(|s| {
                s.split(",")
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

/// Nested shape used inside a review.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct UserShort {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: String,
}

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, avatar, roles";

pub type UserRepository = UserRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = crate::ChosenDB> + sqlx::Acquire<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateUser) -> Result<User> {
        if self.username_exists(&payload.username, None).await? {
            return Err(Error::UsernameTaken);
        }
        let password = payload.password.map(|p| hash_password(&p)).transpose()?;
        let roles = payload.roles.map(|roles| roles.join(","));
        let result = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, email, password, avatar, roles) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.username)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(payload.email.as_ref())
        .bind(&password)
        .bind(&payload.avatar)
        .bind(&roles)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn update_profile(&self, id: i64, payload: UpdateProfile) -> Result<User> {
        if self.username_exists(&payload.username, Some(id)).await? {
            return Err(Error::UsernameTaken);
        }
        let result = sqlx::query(
            "UPDATE users SET username = ?, first_name = ?, last_name = ?, email = ?, avatar = ? \
             WHERE id = ?",
        )
        .bind(&payload.username)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(payload.email.as_ref())
        .bind(&payload.avatar)
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            self.get(id).await
        }
    }

    /// Removes the user together with all reviews they authored.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result = sqlx::query("DELETE FROM book_review WHERE user_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        debug!("Deleted {} reviews of user {id}", result.rows_affected());
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            transaction.commit().await?;
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User> {
        let user = sqlx::query_as::<_, UserInt>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))?;
        Ok(user.into())
    }

    pub async fn count(&self) -> Result<u64> {
        let count: u64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    pub async fn check_password(&self, username: &str, password: &str) -> Result<User> {
        let (id, hashed_password): (i64, Option<String>) =
            sqlx::query_as("SELECT id, password FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(&self.executor)
                .await
                .map_err(|e| {
                    debug!("User check error: {e}");
                    Error::InvalidCredentials
                })?;
        if let Some(hashed_password) = hashed_password {
            if verify_password(password, &hashed_password).unwrap_or(false) {
                return self.get(id).await;
            }
        }
        Err(Error::InvalidCredentials)
    }

    async fn username_exists(&self, username: &str, excluded_id: Option<i64>) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.executor)
            .await?;
        Ok(match (found, excluded_id) {
            (Some(found_id), Some(own_id)) => found_id != own_id,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("qiyinparol").unwrap();
        assert_ne!(hash, "qiyinparol");
        assert!(verify_password("qiyinparol", &hash).unwrap());
        assert!(!verify_password("xatopas", &hash).unwrap());
    }

    #[test]
    fn test_create_user_validation() {
        let user = CreateUser {
            username: "jasur".to_string(),
            first_name: Some("Jasur".to_string()),
            last_name: None,
            email: "jasur@example.com".parse().unwrap(),
            password: Some("qiyinparol".to_string()),
            avatar: None,
            roles: Some(vec!["admin".to_string()]),
        };
        assert!(user.validate().is_ok());

        let short_password = CreateUser {
            password: Some("short".to_string()),
            ..user.clone()
        };
        assert!(short_password.validate().is_err());

        let bad_role = CreateUser {
            roles: Some(vec!["librarian".to_string()]),
            ..user
        };
        assert!(bad_role.validate().is_err());
    }
}
