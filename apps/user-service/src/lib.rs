//! User Service
//!
//! CRUD API over the `users` table that announces every created and deleted
//! user on the `user-event` Kafka topic.
//!
//! ```text
//! HTTP ──► domain_users::handlers ──► UserService ──► PgUserRepository (user-db breaker)
//!                                          │
//!                                          └──► KafkaEventPublisher ──► user-event
//!                                               (retry inside the kafka breaker)
//! ```
//!
//! Besides the API the server exposes `/health`, `/ready` (database ping) and
//! `/metrics`.

use axum::{Router, extract::State, routing::get};
use axum_helpers::{
    HealthCheckFuture, ReadinessReport, ShutdownCoordinator, create_app, create_router,
    health_router, run_health_checks,
};
use core_config::{Environment, FromEnv, app_info, server::ServerConfig};
use database::postgres::{
    DatabaseConnection, PostgresConfig, check_health, connect_from_config_with_retry,
    run_migrations,
};
use domain_users::handlers::{self, ApiDoc};
use domain_users::{PgUserRepository, UserService};
use eyre::{Result, WrapErr};
use kafka_worker::metrics::{init_metrics, metrics_router};
use kafka_worker::{KafkaConfig, KafkaProducer, ensure_topic};
use migration::Migrator;
use notification_common::KafkaEventPublisher;
use resilience::{CircuitBreaker, CircuitBreakerConfig, RetryConfig, retry};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 8080;

async fn ready_handler(State(db): State<DatabaseConnection>) -> ReadinessReport {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "database",
        Box::pin(async { check_health(&db).await.map_err(|e| e.to_string()) }),
    )];
    run_health_checks(checks).await
}

fn ready_router(db: DatabaseConnection) -> Router {
    Router::new()
        .route("/ready", get(ready_handler))
        .with_state(db)
}

/// Run the user service until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database stays
/// unreachable after the connect retries, migrations fail or the server
/// cannot bind.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting user service");
    info!("Environment: {:?}", environment);

    let db_config = PostgresConfig::from_env().wrap_err("Failed to load PostgreSQL configuration")?;
    let db = connect_from_config_with_retry(db_config, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    run_migrations::<Migrator>(&db, app_info.name)
        .await
        .wrap_err("Failed to run migrations")?;

    let kafka_config = KafkaConfig::from_env().wrap_err("Failed to load Kafka configuration")?;
    if let Err(e) = retry(|| ensure_topic(&kafka_config)).await {
        warn!(topic = %kafka_config.topic, error = %e, "Could not provision topic");
    }

    let producer = KafkaProducer::new(&kafka_config).wrap_err("Failed to create Kafka producer")?;
    let kafka_breaker = CircuitBreakerConfig::from_env_with_prefix(
        "KAFKA",
        CircuitBreakerConfig::kafka_publisher(),
    )?;
    let publisher = KafkaEventPublisher::new(producer, &kafka_config)
        .with_retry(RetryConfig::kafka_publish_from_env()?)
        .with_breaker(CircuitBreaker::new("kafka-publisher", kafka_breaker));

    let user_db_breaker = CircuitBreakerConfig::from_env_with_prefix(
        "USER_DB",
        CircuitBreakerConfig::user_database(),
    )?;
    let service = UserService::new(PgUserRepository::new(db.clone()), Arc::new(publisher))
        .with_breaker(CircuitBreaker::new("user-db", user_db_breaker));

    let server_config = ServerConfig::from_env_with_port(DEFAULT_PORT)?;
    let router = create_router::<ApiDoc>(handlers::router(service), &server_config)?
        .merge(health_router(app_info))
        .merge(ready_router(db))
        .merge(metrics_router());

    let shutdown = ShutdownCoordinator::new();
    let signal = shutdown.clone();
    tokio::spawn(async move { signal.wait_for_signal().await });

    create_app(router, &server_config, async move { shutdown.cancelled().await })
        .await
        .wrap_err("User service failed")?;

    info!("User service stopped");
    Ok(())
}
