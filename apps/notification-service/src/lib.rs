//! Notification Service
//!
//! Consumes the `user-event` topic, emails the affected user and records
//! each attempt; a small REST API exposes the records.
//!
//! ```text
//! user-event ──► KafkaConsumerWorker<UserEventHandler> ──┐
//!                                                         ├─► NotificationService ──► SMTP
//! HTTP ──► domain_notifications::handlers ───────────────┘            │
//!                                                                      └─► email_notifications
//! ```
//!
//! The consumer and the HTTP server share one [`ShutdownCoordinator`], so
//! SIGINT/SIGTERM stops both.

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
use domain_notifications::handlers::{self, ApiDoc};
use domain_notifications::{
    MailComposer, MailTransport, NotificationService, PgNotificationRepository,
    RecordingMailTransport, SmtpConfig, SmtpMailTransport, UserEventHandler,
};
use eyre::{Result, WrapErr};
use kafka_worker::metrics::{init_metrics, metrics_router};
use kafka_worker::{KafkaConfig, KafkaConsumerWorker, ensure_topic};
use migration::Migrator;
use resilience::{CircuitBreaker, CircuitBreakerConfig, retry};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 8081;
const DEV_FROM_ADDRESS: &str = "noreply@localhost";

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

/// SMTP in production; in development a recording transport when no
/// credentials are configured.
fn mail_transport(environment: &Environment) -> Result<(Arc<dyn MailTransport>, MailComposer)> {
    match SmtpConfig::from_env() {
        Ok(config) => {
            let transport = SmtpMailTransport::new(&config).wrap_err("Failed to create SMTP transport")?;
            Ok((Arc::new(transport), MailComposer::new(config.username)))
        }
        Err(e) if environment.is_development() => {
            warn!(error = %e, "SMTP not configured, emails will only be recorded in memory");
            Ok((
                Arc::new(RecordingMailTransport::new()),
                MailComposer::new(DEV_FROM_ADDRESS),
            ))
        }
        Err(e) => Err(e).wrap_err("Failed to load SMTP configuration"),
    }
}

/// Run the notification service until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database stays
/// unreachable after the connect retries, migrations fail, the consumer
/// cannot be created or the server cannot bind.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting notification service");
    info!("Environment: {:?}", environment);

    let db_config = PostgresConfig::from_env().wrap_err("Failed to load PostgreSQL configuration")?;
    let db = connect_from_config_with_retry(db_config, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    run_migrations::<Migrator>(&db, app_info.name)
        .await
        .wrap_err("Failed to run migrations")?;

    let (transport, composer) = mail_transport(&environment)?;
    let mail_breaker =
        CircuitBreakerConfig::from_env_with_prefix("MAIL", CircuitBreakerConfig::mail())?;
    let db_breaker = CircuitBreakerConfig::from_env_with_prefix(
        "NOTIFICATION_DB",
        CircuitBreakerConfig::notification_database(),
    )?;
    let service = Arc::new(
        NotificationService::new(PgNotificationRepository::new(db.clone()), transport, composer)
            .with_mail_breaker(CircuitBreaker::new("mail", mail_breaker))
            .with_db_breaker(CircuitBreaker::new("notification-db", db_breaker)),
    );

    let kafka_config = KafkaConfig::from_env().wrap_err("Failed to load Kafka configuration")?;
    if let Err(e) = retry(|| ensure_topic(&kafka_config)).await {
        warn!(topic = %kafka_config.topic, error = %e, "Could not provision topic");
    }

    let shutdown = ShutdownCoordinator::new();

    let worker = KafkaConsumerWorker::new(
        &kafka_config,
        Arc::new(UserEventHandler::new(service.clone())),
    )
    .wrap_err("Failed to create Kafka consumer")?;
    let worker_shutdown = shutdown.subscribe();
    let worker_handle = tokio::spawn(async move { worker.run(worker_shutdown).await });

    let server_config = ServerConfig::from_env_with_port(DEFAULT_PORT)?;
    let router = create_router::<ApiDoc>(handlers::router(service), &server_config)?
        .merge(health_router(app_info))
        .merge(ready_router(db))
        .merge(metrics_router());

    let signal = shutdown.clone();
    tokio::spawn(async move { signal.wait_for_signal().await });

    let server_shutdown = shutdown.clone();
    let served = create_app(router, &server_config, async move {
        server_shutdown.cancelled().await
    })
    .await;

    // also reached when the server fails on its own
    shutdown.shutdown();
    match worker_handle.await {
        Ok(Ok(())) => info!("Kafka consumer stopped"),
        Ok(Err(e)) => error!(error = %e, "Kafka consumer failed"),
        Err(e) => error!(error = %e, "Kafka consumer task panicked"),
    }

    served.wrap_err("Notification service failed")?;
    info!("Notification service stopped");
    Ok(())
}
