//! Server infrastructure module.
//!
//! - Router assembly with OpenAPI documentation and common middleware
//! - Health and readiness endpoints
//! - Graceful shutdown coordination
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router, health_router, ShutdownCoordinator};
//! use core_config::{server::ServerConfig, app_info};
//!
//! let router = create_router::<ApiDoc>(api_routes, &config)?.merge(health_router(app_info!()));
//! let shutdown = ShutdownCoordinator::new();
//! let signal = shutdown.clone();
//! create_app(router, &config, async move { signal.cancelled().await }).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_app, create_router};
pub use health::{
    DependencyCheck, DependencyStatus, HealthCheckFuture, HealthResponse, ReadinessReport,
    health_router, run_health_checks, run_health_checks_within,
};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
