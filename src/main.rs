use circulation_engine::{
    adapters::postgres::{PostgresCopyLedger, PostgresIssueStore, PostgresReservationStore},
    api::{handlers::AppState, router::create_router},
    application::circulation::{CirculationConfig, ServiceDependencies},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 環境変数から設定値を読む（未設定・不正値はデフォルト）
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circulation_engine=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection URL
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/library".into());

    tracing::info!("Database URL: {}", database_url);

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Circulation parameters
    let defaults = CirculationConfig::default();
    let config = CirculationConfig {
        loan_period_days: env_or("LOAN_PERIOD_DAYS", defaults.loan_period_days),
        fine_rate_per_day: env_or("FINE_RATE_PER_DAY", defaults.fine_rate_per_day),
        max_active_issues: env_or("MAX_ACTIVE_ISSUES", defaults.max_active_issues),
    };

    // Initialize adapters
    let issue_store = Arc::new(PostgresIssueStore::new(pool.clone()));
    let reservation_store = Arc::new(PostgresReservationStore::new(pool.clone()));
    let copy_ledger = Arc::new(PostgresCopyLedger::new(pool.clone()));

    // Create service dependencies
    let deps = ServiceDependencies {
        issue_store,
        reservation_store,
        copy_ledger,
        config,
    };

    // Create application state
    let app_state = Arc::new(AppState { deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
