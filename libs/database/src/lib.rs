//! PostgreSQL connectivity shared by the services.
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! postgres::run_migrations::<Migrator>(&db, "notification-service").await?;
//! ```

pub mod error;
pub mod postgres;

pub use error::{DatabaseError, DatabaseResult};
