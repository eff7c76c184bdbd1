use notification_common::{EventPublisher, NotificationEvent};
use resilience::{CallError, CircuitBreaker, CircuitBreakerConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::error;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User, UserRequest};
use crate::repository::UserRepository;

/// Service layer for User business logic
///
/// Every repository call runs through the user-db circuit breaker; only
/// [`UserError::DatabaseOperation`] counts against it. A created
/// user is announced after it is stored; a deleted user is announced before
/// the row is removed. Publishing is awaited inline but its failure is only
/// logged, never returned to the caller.
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    publisher: Arc<dyn EventPublisher>,
    breaker: CircuitBreaker,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repository: Arc::new(repository),
            publisher,
            breaker: CircuitBreaker::new("user-db", CircuitBreakerConfig::user_database()),
        }
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// List every user; an empty store is reported as [`UserError::NoUsers`].
    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        let users = self.guarded(|| self.repository.list()).await?;
        if users.is_empty() {
            return Err(UserError::NoUsers);
        }
        Ok(users)
    }

    pub async fn get_user(&self, id: i64) -> UserResult<User> {
        self.guarded(|| self.repository.get_by_id(id))
            .await?
            .ok_or(UserError::NotFound(id))
    }

    pub async fn create_user(&self, input: UserRequest) -> UserResult<User> {
        if self.guarded(|| self.repository.email_exists(&input.email)).await? {
            return Err(UserError::EmailTaken(input.email));
        }

        let new_user = NewUser::from(input);
        let user = self.guarded(|| self.repository.create(new_user)).await?;

        self.announce(NotificationEvent::created(user.email.clone()))
            .await;
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, input: UserRequest) -> UserResult<User> {
        let mut user = self.get_user(id).await?;

        if user.email != input.email
            && self.guarded(|| self.repository.email_exists(&input.email)).await?
        {
            return Err(UserError::EmailTaken(input.email));
        }

        user.apply_update(input);
        self.guarded(|| self.repository.update(user)).await
    }

    pub async fn delete_user(&self, id: i64) -> UserResult<()> {
        let user = self.get_user(id).await?;

        self.announce(NotificationEvent::deleted(user.email)).await;

        if !self.guarded(|| self.repository.delete(id)).await? {
            return Err(UserError::NotFound(id));
        }
        Ok(())
    }

    async fn guarded<T, F, Fut>(&self, operation: F) -> UserResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UserResult<T>>,
    {
        self.breaker
            .call_classified(operation, UserError::is_store_failure)
            .await
            .map_err(|e| match e {
                CallError::Rejected { name } => UserError::DatabaseOperation(format!(
                    "user database is unavailable, circuit breaker '{}' is open",
                    name
                )),
                CallError::Inner(e) => e,
            })
    }

    async fn announce(&self, event: NotificationEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            error!(
                event_type = %event.event_type,
                email = %event.email,
                error = %e,
                "Failed to publish user event"
            );
        }
    }
}
