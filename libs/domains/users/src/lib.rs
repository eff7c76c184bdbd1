//! Users Domain
//!
//! User CRUD that announces creations and deletions on the user event stream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, `_links`
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← email uniqueness, user-db breaker, event publishing
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + in-memory / Postgres)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{handlers, InMemoryUserRepository, UserService};
//! use notification_common::InMemoryEventPublisher;
//! use std::sync::Arc;
//!
//! let service = UserService::new(
//!     InMemoryUserRepository::new(),
//!     Arc::new(InMemoryEventPublisher::new()),
//! );
//! let router = handlers::router(service);
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validation;

pub use error::{UserError, UserResult};
pub use models::{NewUser, User, UserListResponse, UserRequest, UserResponse};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
