use std::sync::Arc;

use auth::Authenticator;
use sqlx::postgres::PgPoolOptions;
use sso_service::config::Config;
use sso_service::domain::session::service::AuthService;
use sso_service::inbound::http::router::create_router;
use sso_service::outbound::repositories::PostgresSessionStore;
use sso_service::outbound::repositories::PostgresUnitOfWork;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sso_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "sso-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        request_timeout_secs = config.server.request_timeout_secs,
        access_token_ttl_secs = config.tokens.access_token_ttl_secs,
        refresh_token_ttl_secs = config.tokens.refresh_token_ttl_secs,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let authenticator = Arc::new(Authenticator::new(config.password.hasher()?));
    let session_store = Arc::new(PostgresSessionStore::new(pg_pool.clone()));
    let unit_of_work = Arc::new(PostgresUnitOfWork::new(pg_pool));

    let auth_service = Arc::new(AuthService::new(
        session_store,
        unit_of_work,
        authenticator,
        config.tokens.lifetimes(),
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, config.server.request_timeout());
    axum::serve(http_listener, http_application).await?;

    tracing::info!("Server exited");
    Ok(())
}
