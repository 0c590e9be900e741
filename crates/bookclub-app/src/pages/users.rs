use axum::{
    extract::Query,
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Form,
};
use bookclub_dal::user::{CreateUser, UpdateProfile, UserRepository};
use bookclub_types::claim::UserClaim;
use garde::Validate;
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    auth::{self, user_claim, PageUser, SESSION_USER_KEY},
    error::field_errors,
    pages::{
        render::{self, escape, FieldErrors},
        PageError, PageResult,
    },
    state::AppState,
};

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[garde(length(min = 1, max = 150))]
    username: String,
    #[garde(length(min = 1, max = 100))]
    first_name: Option<String>,
    #[garde(length(min = 1, max = 100))]
    last_name: Option<String>,
    #[garde(email)]
    email: String,
    #[garde(length(min = 8, max = 255))]
    password: String,
}

impl RegisterForm {
    fn normalized(self) -> Self {
        Self {
            first_name: blank_to_none(self.first_name),
            last_name: blank_to_none(self.last_name),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    #[garde(length(min = 1, max = 150))]
    username: String,
    #[garde(length(min = 1, max = 100))]
    first_name: Option<String>,
    #[garde(length(min = 1, max = 100))]
    last_name: Option<String>,
    #[garde(email)]
    email: String,
}

impl ProfileForm {
    fn normalized(self) -> Self {
        Self {
            first_name: blank_to_none(self.first_name),
            last_name: blank_to_none(self.last_name),
            ..self
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

pub async fn register_form() -> impl IntoResponse {
    Html(render_register(
        &RegisterForm {
            username: String::new(),
            first_name: None,
            last_name: None,
            email: String::new(),
            password: String::new(),
        },
        &FieldErrors::new(),
    ))
}

pub async fn register(
    user_registry: UserRepository,
    Form(form): Form<RegisterForm>,
) -> PageResult<axum::response::Response> {
    let form = form.normalized();
    if let Err(report) = form.validate() {
        return Ok(Html(render_register(&form, &field_errors(&report))).into_response());
    }
    let email = form
        .email
        .parse()
        .map_err(|_| PageError::Internal(anyhow::anyhow!("email revalidation failed")))?;
    let payload = CreateUser {
        username: form.username.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email,
        password: Some(form.password.clone()),
        avatar: None,
        roles: None,
    };
    match user_registry.create(payload).await {
        Ok(_) => Ok(Redirect::to("/users/login").into_response()),
        Err(bookclub_dal::Error::UsernameTaken) => {
            let mut errors = FieldErrors::new();
            errors.insert(
                "username".to_string(),
                vec!["A user with that username already exists.".to_string()],
            );
            Ok(Html(render_register(&form, &errors)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login_form(Query(query): Query<NextQuery>) -> impl IntoResponse {
    Html(render_login(query.next.as_deref()))
}

pub async fn profile(
    user_registry: UserRepository,
    PageUser(claim): PageUser,
) -> PageResult<impl IntoResponse> {
    let user = user_registry.get(claim.id).await?;
    let body = format!(
        r#"<h1>Profile</h1>
<img src="/media/{avatar}" alt="avatar">
<ul>
<li>Username: {username}</li>
<li>First name: {first_name}</li>
<li>Last name: {last_name}</li>
<li>Email: {email}</li>
</ul>
<a href="/users/profile/edit">Edit profile</a>"#,
        avatar = escape(user.avatar.as_deref().unwrap_or("default_avatar.jpg")),
        username = escape(&user.username),
        first_name = escape(user.first_name.as_deref().unwrap_or("")),
        last_name = escape(user.last_name.as_deref().unwrap_or("")),
        email = escape(&user.email),
    );
    Ok(Html(render::layout("Profile", Some(&claim), &body)))
}

pub async fn profile_edit_form(
    user_registry: UserRepository,
    PageUser(claim): PageUser,
) -> PageResult<impl IntoResponse> {
    let user = user_registry.get(claim.id).await?;
    let form = ProfileForm {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
    };
    Ok(Html(render_profile_edit(&claim, &form, &FieldErrors::new())))
}

pub async fn profile_edit(
    user_registry: UserRepository,
    PageUser(claim): PageUser,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> PageResult<axum::response::Response> {
    let form = form.normalized();
    if let Err(report) = form.validate() {
        return Ok(Html(render_profile_edit(&claim, &form, &field_errors(&report)))
            .into_response());
    }
    let email = form
        .email
        .parse()
        .map_err(|_| PageError::Internal(anyhow::anyhow!("email revalidation failed")))?;
    let payload = UpdateProfile {
        username: form.username.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email,
        avatar: None,
    };
    match user_registry.update_profile(claim.id, payload).await {
        Ok(updated) => {
            // the session claim carries the username, keep it current
            session
                .insert(SESSION_USER_KEY, user_claim(&updated))
                .await
                .map_err(|e| PageError::Internal(e.into()))?;
            Ok(Redirect::to("/users/profile").into_response())
        }
        Err(bookclub_dal::Error::UsernameTaken) => {
            let mut errors = FieldErrors::new();
            errors.insert(
                "username".to_string(),
                vec!["A user with that username already exists.".to_string()],
            );
            Ok(Html(render_profile_edit(&claim, &form, &errors)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn text_input(name: &str, value: &str, errors: &FieldErrors) -> String {
    format!(
        r#"<label>{name} <input type="text" name="{name}" value="{value}"></label>{error_list}"#,
        value = escape(value),
        error_list = render::field_error_list(errors, name),
    )
}

fn render_register(form: &RegisterForm, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<h1>Register</h1>
<form method="post" action="/users/register">
{username}
{first_name}
{last_name}
{email}
<label>password <input type="password" name="password"></label>{password_errors}
<button type="submit">Register</button>
</form>"#,
        username = text_input("username", &form.username, errors),
        first_name = text_input("first_name", form.first_name.as_deref().unwrap_or(""), errors),
        last_name = text_input("last_name", form.last_name.as_deref().unwrap_or(""), errors),
        email = text_input("email", &form.email, errors),
        password_errors = render::field_error_list(errors, "password"),
    );
    render::layout("Register", None, &body)
}

fn render_login(next: Option<&str>) -> String {
    let next_field = match next {
        Some(next) => format!(
            r#"<input type="hidden" name="next" value="{}">"#,
            escape(next)
        ),
        None => String::new(),
    };
    let body = format!(
        r#"<h1>Log in</h1>
<form method="post" action="/users/login">
<label>username <input type="text" name="username"></label>
<label>password <input type="password" name="password"></label>
{next_field}
<button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/users/register">Register</a></p>"#,
    );
    render::layout("Log in", None, &body)
}

fn render_profile_edit(claim: &UserClaim, form: &ProfileForm, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<h1>Edit profile</h1>
<form method="post" action="/users/profile/edit">
{username}
{first_name}
{last_name}
{email}
<button type="submit">Save</button>
</form>"#,
        username = text_input("username", &form.username, errors),
        first_name = text_input("first_name", form.first_name.as_deref().unwrap_or(""), errors),
        last_name = text_input("last_name", form.last_name.as_deref().unwrap_or(""), errors),
        email = text_input("email", &form.email, errors),
    );
    render::layout("Edit profile", Some(claim), &body)
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/profile", get(profile))
        .route("/profile/edit", get(profile_edit_form).post(profile_edit))
}
