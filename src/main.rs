//! The binary entry point for the application.

use std::sync::Arc;
use std::time::Duration;

use app_core::config::Config;
use app_core::jwt::{DEFAULT_LIFETIME_SECS, JwtConfig, JwtService, TokenManager};
use app_core::middleware::request_logger;
use app_core::oauth::{GitHubOAuthConfig, GitHubOAuthProvider, OAuthManager, public_url};
use app_core::signed::CookieSigner;
use axum::http::StatusCode;
use axum::{Json, Router, middleware, routing};
use base64::Engine as _;
use base64::engine::general_purpose;
use sea_orm::{ConnectOptions, Database};
use tokio::signal;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(fmt::format::FmtSpan::CLOSE),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!("Application failed to start: {err}");
        std::process::exit(1);
    }
}

/// Initializes all dependencies and starts the web server.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Read once; secrets come from `APP__...` environment variables.
    let config = Arc::new(Config::builder("config/config.yaml").env_prefix("APP").build()?);

    // Initialize the SeaORM database connection pool.
    let mut db_opt = ConnectOptions::new(config.get::<String>("database.url")?);
    db_opt
        .min_connections(config.get("database.min_connections")?)
        .max_connections(config.get("database.max_connections")?)
        .connect_timeout(Duration::from_secs(config.get("database.connect_timeout_secs")?))
        .acquire_timeout(Duration::from_secs(config.get("database.acquire_timeout_secs")?))
        .sqlx_logging(config.get("database.sqlx_logging")?)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db_pool = Arc::new(Database::connect(db_opt).await?);
    let store_timeout = Duration::from_secs(config.get_or("database.timeout_secs", 5)?);

    auth::migrate(db_pool.clone(), store_timeout).await?;

    // Instantiate the JWT service with all required config values.
    let token_manager: Arc<dyn TokenManager> = Arc::new(JwtService::new(JwtConfig {
        secret: config.get("jwt.secret")?,
        issuer: config.get("jwt.issuer")?,
        audience: config.get("jwt.audience")?,
        lifetime_secs: config.get_or("jwt.lifetime_secs", DEFAULT_LIFETIME_SECS)?,
        leeway_secs: config.get_or("jwt.leeway_secs", 0)?,
    }));

    // Initialize the state cookie signing key.
    let signer = CookieSigner::new(&general_purpose::STANDARD.decode(config.get::<String>("cookie.secret")?)?)?;

    // Initialize OAuth Manager and providers.
    let public_origin = config.get::<String>("server.public_origin")?;
    let oauth_timeout = Duration::from_secs(config.get_or("oauth.timeout_secs", 10)?);

    let mut oauth_manager = OAuthManager::new();
    if let Ok(client_id) = config.get::<String>("oauth.github.client_id") {
        let redirect_url = public_url(&public_origin, "/oauth/github/callback")?.to_string();
        let mut github = GitHubOAuthConfig::github(client_id, config.get("oauth.github.client_secret")?, redirect_url);
        github.auth_url = config.get_or("oauth.github.auth_url", github.auth_url)?;
        github.token_url = config.get_or("oauth.github.token_url", github.token_url)?;
        github.profile_url = config.get_or("oauth.github.profile_url", github.profile_url)?;
        github.scopes = config.get_or("oauth.github.scopes", github.scopes)?;
        github.timeout = oauth_timeout;

        oauth_manager.add_provider(Arc::new(GitHubOAuthProvider::new("github", github)?));
    } else {
        tracing::warn!("oauth.github.client_id is not set, GitHub login is disabled");
    }

    // Initialize auth module
    let auth_state = auth::new(auth::Dependency {
        db: db_pool.clone(),
        config: config.clone(),
        token: token_manager.clone(),
        oauth: oauth_manager,
        signer,
        store_timeout,
    });

    // Create the Router and Middlewares
    let timeout_secs = Duration::from_secs(config.get::<u64>("server.timeout_secs")?);
    let app = Router::new()
        .merge(auth::create_router(auth_state, token_manager))
        .route(
            "/",
            routing::get(|| async { Json(serde_json::json!({"message": "OAuth login service is running"})) }),
        )
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"message": "Endpoint not found"})),
            )
        })
        .method_not_allowed_fallback(|| async {
            (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(serde_json::json!({"message": "Method not allowed"})),
            )
        })
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_logger))
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout_secs)),
        );

    let server_address = config.get::<String>("server.address")?;
    let listener = tokio::net::TcpListener::bind(&server_address).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    // Create a broadcast channel to signal shutdown to all application components.
    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_shutdown_listener(shutdown_tx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_tx.subscribe().recv().await.ok();
            tracing::info!("Server is shutting down gracefully...");
        })
        .await?;

    match Arc::try_unwrap(db_pool) {
        Ok(db) => db.close().await?,
        Err(_) => tracing::warn!("Database pool still referenced at shutdown, leaving it to drop"),
    }

    Ok(())
}

/// Spawns a background task to listen for system shutdown signals.
fn spawn_shutdown_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", err);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                },
                Err(err) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", err);
                    std::future::pending::<()>().await;
                },
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("Received SIGINT (Ctrl+C)") },
            _ = terminate => { tracing::info!("Received SIGTERM") },
        }

        if shutdown_tx.send(()).is_err() {
            tracing::error!("Failed to send shutdown signal");
        }
    });
}
