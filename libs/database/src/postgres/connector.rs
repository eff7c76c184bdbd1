use resilience::{RetryConfig, retry_with_backoff};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::{info, warn};

use super::PostgresConfig;

/// Open a pool from the given config, single attempt.
pub async fn connect_from_config(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    connect_with_options(config.into_connect_options()).await
}

async fn connect_with_options(options: ConnectOptions) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(options).await?;
    info!("Successfully connected to PostgreSQL database");
    Ok(db)
}

/// Open a pool, retrying with exponential backoff.
///
/// `None` uses [`RetryConfig::default`]. Services call this at startup so a
/// database that comes up after the container does not kill the process.
pub async fn connect_from_config_with_retry(
    config: PostgresConfig,
    retry_config: Option<RetryConfig>,
) -> Result<DatabaseConnection, DbErr> {
    let retry_config = retry_config.unwrap_or_default();
    let options = config.into_connect_options();

    retry_with_backoff(
        || {
            let opts = options.clone();
            async move {
                connect_with_options(opts).await.inspect_err(|e| {
                    warn!(error = %e, "PostgreSQL connection attempt failed");
                })
            }
        },
        &retry_config,
    )
    .await
}

/// Apply every pending migration of `M`.
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> Result<(), DbErr> {
    info!(app = app_name, "Running database migrations");
    M::up(db, None).await?;
    info!(app = app_name, "Migrations completed");
    Ok(())
}
