use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users ordered by id
    async fn list(&self) -> UserResult<Vec<User>>;

    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>>;

    async fn email_exists(&self, email: &str) -> UserResult<bool>;

    /// Insert and return the user with its assigned id
    async fn create(&self, user: NewUser) -> UserResult<User>;

    async fn update(&self, user: User) -> UserResult<User>;

    /// Returns `false` when nothing was deleted
    async fn delete(&self, id: i64) -> UserResult<bool>;
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self) -> UserResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(&id).cloned())
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        let store = self.store.read().await;
        Ok(store.users.values().any(|u| u.email == email))
    }

    async fn create(&self, user: NewUser) -> UserResult<User> {
        let mut store = self.store.write().await;

        if store.users.values().any(|u| u.email == user.email) {
            return Err(UserError::EmailTaken(user.email));
        }

        store.next_id += 1;
        let user = User {
            id: store.next_id,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        store.users.insert(user.id, user.clone());

        tracing::info!(user_id = user.id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut store = self.store.write().await;

        if !store.users.contains_key(&user.id) {
            return Err(UserError::NotFound(user.id));
        }
        if store
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(UserError::EmailTaken(user.email));
        }

        store.users.insert(user.id, user.clone());

        tracing::info!(user_id = user.id, "Updated user");
        Ok(user)
    }

    async fn delete(&self, id: i64) -> UserResult<bool> {
        let mut store = self.store.write().await;

        if store.users.remove(&id).is_some() {
            tracing::info!(user_id = id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
