pub mod rest;

use std::time::Duration;

use anyhow::{Result, anyhow};
use bookclub_dal::user::{CreateUser, User, UserRepository};
use bookclub_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tracing::debug;

pub const TEST_PASSWORD: &str = "qiyinparol";

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

/// Builds a server configuration against a temporary data directory and an
/// initialized database.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), std::env::temp_dir())?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "bookclub-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;

    // tests seed records before the server starts
    let pool = bookclub_dal::new_pool(&config.database_url()).await?;
    bookclub_dal::migrate(&pool).await?;

    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Starts the server in the background and waits until it answers health
/// checks.
pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let base_url = args.base_url.clone();
    let state = bookclub_server::build_state(&args).await?;
    tokio::spawn(bookclub_server::run_graceful_with_state(
        args,
        state,
        futures::future::pending(),
    ));

    let health_url = base_url.join("health")?;
    for _ in 0..100 {
        match reqwest::get(health_url.clone()).await {
            Ok(response) if response.status().is_success() => return Ok(()),
            other => debug!("Server not ready yet: {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not come up"))
}

#[derive(Debug, Clone, Copy)]
pub enum TestUser {
    Admin,
    Reader,
}

impl TestUser {
    fn username(&self) -> &'static str {
        match self {
            TestUser::Admin => "admin",
            TestUser::Reader => "reader",
        }
    }

    fn roles(&self) -> Option<Vec<String>> {
        match self {
            TestUser::Admin => Some(vec!["admin".to_string()]),
            TestUser::Reader => None,
        }
    }
}

/// Creates the given test user directly in the database.
pub async fn seed_user(config: &ServerConfig, test_user: TestUser) -> Result<User> {
    let pool = bookclub_dal::new_pool(&config.database_url()).await?;
    let user_registry = UserRepository::new(pool);
    let user = user_registry
        .create(CreateUser {
            username: test_user.username().to_string(),
            first_name: Some(test_user.username().to_string()),
            last_name: None,
            email: format!("{}@example.com", test_user.username()).parse().map_err(
                |e: garde::Report| anyhow!("invalid test email: {e}"),
            )?,
            password: Some(TEST_PASSWORD.to_string()),
            avatar: None,
            roles: test_user.roles(),
        })
        .await?;
    Ok(user)
}

/// Client with a cookie store, holding no session yet.
pub fn anonymous_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

pub async fn log_in(client: &reqwest::Client, base_url: &Url, username: &str) -> Result<()> {
    let login_url = base_url.join("users/login")?;
    let response = client
        .post(login_url)
        .json(&serde_json::json!({"username": username, "password": TEST_PASSWORD}))
        .send()
        .await?;
    if response.status() != reqwest::StatusCode::SEE_OTHER {
        return Err(anyhow!("Login failed with status {}", response.status()));
    }
    Ok(())
}

/// Boots the server, seeds the given user and returns a logged-in client.
pub async fn launch_env(args: ServerConfig, test_user: TestUser) -> Result<(reqwest::Client, User)> {
    let base_url = args.base_url.clone();
    let user = seed_user(&args, test_user).await?;
    spawn_server(args).await?;

    let client = anonymous_client()?;
    log_in(&client, &base_url, test_user.username()).await?;
    Ok((client, user))
}

pub fn extend_url(base: &Url, segment: impl std::fmt::Display) -> Url {
    let mut url = base.clone();
    {
        let mut path = url.path_segments_mut().expect("base URL cannot be a base");
        path.pop_if_empty().push(&segment.to_string());
    }
    url
}
