use std::collections::HashSet;

use axum::{
    extract::{FromRequest as _, FromRequestParts, OriginalUri},
    response::{IntoResponse, Redirect},
    Form, Json,
};
use bookclub_types::claim::{Authorization as _, Role, UserClaim};
use http::{request::Parts, StatusCode};
use tower_sessions::Session;
use tracing::{debug, error};

use crate::{error::ApiError, state::AppState};

crate::repository_from_request!(bookclub_dal::user::UserRepository);

pub const SESSION_USER_KEY: &str = "user";

pub fn user_claim(user: &bookclub_dal::user::User) -> UserClaim {
    UserClaim {
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        roles: user
            .roles
            .iter()
            .flatten()
            .filter_map(|role| role.parse::<Role>().ok())
            .collect::<HashSet<_>>(),
    }
}

/// Keeps a redirect target inside the site.
fn safe_next(next: Option<String>) -> String {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/".to_string(),
    }
}

#[derive(serde::Deserialize)]
struct LoginCredentials {
    username: String,
    password: String,
    next: Option<String>,
}

pub async fn after_ok_login(
    session: &Session,
    known_user: &bookclub_dal::user::User,
    next: Option<String>,
) -> Result<impl IntoResponse, StatusCode> {
    session
        .insert(SESSION_USER_KEY, user_claim(known_user))
        .await
        .map_err(|e| {
            error!("Failed to store user in session: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Redirect::to(&safe_next(next)))
}

pub async fn login(
    user_registry: bookclub_dal::user::UserRepository,
    session: Session,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let content_type = request
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let credentials = if content_type == "application/json" {
        let Json(data) = Json::<LoginCredentials>::from_request(request, &())
            .await
            .map_err(|e| {
                error!("Failed to get login credentials: {e}");
                StatusCode::BAD_REQUEST
            })?;
        data
    } else if content_type == "application/x-www-form-urlencoded" {
        let Form(data) = Form::<LoginCredentials>::from_request(request, &())
            .await
            .map_err(|e| {
                error!("Failed to get login credentials: {e}");
                StatusCode::BAD_REQUEST
            })?;
        data
    } else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let user = user_registry
        .check_password(&credentials.username, &credentials.password)
        .await
        .map_err(|e| {
            debug!("User check error: {e}");
            StatusCode::UNAUTHORIZED
        })?;

    after_ok_login(&session, &user, credentials.next)
        .await
        .map(IntoResponse::into_response)
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, StatusCode> {
    session
        .delete()
        .await
        .unwrap_or_else(|e| error!("Failed to delete session: {e}"));

    Ok(Redirect::to("/"))
}

async fn session_user(parts: &mut Parts, state: &AppState) -> Result<Option<UserClaim>, ApiError> {
    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, message)| anyhow::anyhow!("Cannot get session: {message}"))?;
    let user = session
        .get::<UserClaim>(SESSION_USER_KEY)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read session: {e}"))?;
    Ok(user)
}

/// Acting identity for the API surface, rejects with 401 when anonymous.
pub struct Identity(pub UserClaim);

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match session_user(parts, state).await? {
            Some(claim) => Ok(Identity(claim)),
            None => Err(ApiError::Unauthorized),
        }
    }
}

/// Identity that must carry the admin role, for back-office mutation.
pub struct RequireAdmin(pub UserClaim);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Identity(claim) = Identity::from_request_parts(parts, state).await?;
        if claim.has_role(Role::Admin) {
            Ok(RequireAdmin(claim))
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Acting identity for the page surface, rejects by redirecting to the login
/// page with a `next` parameter pointing back at the requested URL.
pub struct PageUser(pub UserClaim);

impl FromRequestParts<AppState> for PageUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let original = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.to_string())
            .unwrap_or_else(|| parts.uri.to_string());
        match session_user(parts, state).await {
            Ok(Some(claim)) => Ok(PageUser(claim)),
            Ok(None) => Err(login_redirect(&original)),
            Err(e) => {
                error!("Session failure: {e}");
                Err(login_redirect(&original))
            }
        }
    }
}

/// Optional identity for pages that render for anonymous visitors too.
pub struct MaybeUser(pub Option<UserClaim>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state).await?))
    }
}

pub fn login_redirect(next: &str) -> Redirect {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    Redirect::to(&format!("/users/login?{query}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/books/1".to_string())), "/books/1");
        assert_eq!(safe_next(Some("//evil.example".to_string())), "/");
        assert_eq!(safe_next(Some("https://evil.example".to_string())), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_user_claim_roles() {
        let user = bookclub_dal::user::User {
            id: 7,
            username: "sayitkamol".to_string(),
            first_name: None,
            last_name: None,
            email: "sayitkamol@example.com".to_string(),
            avatar: None,
            roles: Some(vec!["admin".to_string(), "bogus".to_string()]),
        };
        let claim = user_claim(&user);
        assert_eq!(claim.id, 7);
        assert!(claim.has_role(Role::Admin));
        assert!(!claim.has_role(Role::User));
    }
}
