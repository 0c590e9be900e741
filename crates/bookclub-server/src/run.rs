use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use bookclub_app::state::{AppConfig, AppState};
use bookclub_app::{pages, rest_api};
use futures::FutureExt;
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state, &args);

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn main_router(state: AppState, args: &ServerConfig) -> Router<()> {
    let session_store = tower_sessions::MemoryStore::default();
    let session_expiry = time::Duration::seconds(args.session_validity.as_secs() as i64);
    let session_layer = tower_sessions::SessionManagerLayer::new(session_store)
        .with_name("bookclub")
        .with_secure(false)
        .with_expiry(tower_sessions::Expiry::OnInactivity(session_expiry));

    Router::new()
        .route("/", get(pages::home::home))
        .nest("/books", pages::books::router())
        .nest("/users", pages::users::router())
        .nest("/api/reviews", rest_api::review::router())
        .nest("/api/books", rest_api::book::router())
        .nest("/api/authors", rest_api::author::router())
        .layer(session_layer)
        .with_state(state)
        .route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    }

    let pool = bookclub_dal::new_pool(&config.database_url()).await?;
    bookclub_dal::migrate(&pool).await?;

    let app_config = AppConfig {
        base_url: config.base_url.clone(),
        default_page_size: config.default_page_size,
    };
    Ok(AppState::new(app_config, pool))
}
