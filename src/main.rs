// AirGuard API v0.1
use axum::routing::{get, post};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod routes;
mod services;

use config::AppConfig;
use db::store::SqliteSnapshotStore;
use routes::air_quality::AppState;
use services::broadcast::BroadcastScheduler;
use services::openweather::OpenWeatherClient;
use services::pipeline::SnapshotService;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;

/// AirGuard API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AirGuard API",
        version = "0.1.0",
        description = "Air quality and weather snapshots backed by OpenWeatherMap. \
            Resolves a place name or coordinates, merges air pollution and current \
            weather into one record, stores it, and pushes a fixed location's \
            snapshot to WebSocket subscribers at /ws.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Air Quality", description = "Snapshot retrieval and stored history"),
        (name = "Broadcast", description = "Real-time broadcaster status"),
    ),
    paths(
        routes::health::health_check,
        routes::air_quality::submit_air_quality,
        routes::air_quality::get_history,
        routes::broadcast::get_broadcast_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            services::pipeline::AirQualityRequest,
            services::snapshot::EnvironmentSnapshot,
            services::snapshot::PollutantReading,
            services::snapshot::WeatherReading,
            services::snapshot::SnapshotLocation,
            db::models::StoredSnapshot,
            services::broadcast::BroadcastStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "airguard_api=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();
    init_tracing(config.log_json);

    // Set up database connection pool (file is created on first run)
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("DATABASE_URL must be a valid SQLite URL")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .connect_with(connect_options)
        .await
        .expect("Failed to open database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let openweather = Arc::new(
        OpenWeatherClient::new(
            &config.openweather_base_url,
            &config.api_key,
            config.upstream_timeout,
        )
        .expect("Failed to build HTTP client"),
    );

    let app_state = AppState {
        pool: pool.clone(),
        service: SnapshotService::new(
            openweather.clone(),
            openweather.clone(),
            Arc::new(SqliteSnapshotStore::new(pool.clone())),
        ),
    };

    // Idle until the first WebSocket subscriber connects
    let scheduler = BroadcastScheduler::new(
        openweather,
        config.broadcast_location,
        config.broadcast_interval,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let air_quality_routes = Router::new()
        .route(
            "/api/air_quality",
            post(routes::air_quality::submit_air_quality),
        )
        .route(
            "/api/air_quality/history",
            get(routes::air_quality::get_history),
        )
        .with_state(app_state);

    let broadcast_routes = Router::new()
        .route("/ws", get(routes::realtime::subscribe))
        .route(
            "/api/broadcast/status",
            get(routes::broadcast::get_broadcast_status),
        )
        .with_state(scheduler);

    let health_routes = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .with_state(pool);

    let app = Router::new()
        .merge(health_routes)
        .merge(air_quality_routes)
        .merge(broadcast_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server running on http://localhost:{}", config.port);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
