//! # Axum Helpers
//!
//! Shared HTTP plumbing for the services.
//!
//! ## Modules
//!
//! - **[`server`]**: Router assembly, health checks, graceful shutdown
//! - **[`http`]**: HTTP middleware (CORS, security headers)
//! - **[`errors`]**: `AppError` and the uniform `{message, timestamp}` error body
//! - **[`extractors`]**: Validated JSON and numeric id path extractors
//! - **[`links`]**: `_links` relation maps for resource responses
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_app, create_router, shutdown_signal};
//! use core_config::server::ServerConfig;
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let router = create_router::<ApiDoc>(Router::new(), &config)?;
//!     create_app(router, &config, shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod extractors;
pub mod http;
pub mod links;
pub mod server;

// Re-export server types
pub use server::{
    HealthCheckFuture, HealthResponse, ReadinessReport, ShutdownCoordinator, create_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};

// Re-export HTTP middleware
pub use http::{create_cors_layer, security_headers};

// Re-export error types
pub use errors::{AppError, ErrorResponse, TIMESTAMP_FORMAT, format_validation_errors};

// Re-export response links
pub use links::{Link, Links};

// Re-export extractors
pub use extractors::{IdPath, ValidatedJson};
