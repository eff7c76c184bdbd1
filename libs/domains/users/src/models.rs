use axum_helpers::Links;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{validate_email, validate_name};

/// Stored user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Unique across users
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Overwrite the editable fields and bump `updated_at`.
    pub fn apply_update(&mut self, input: UserRequest) {
        self.name = input.name;
        self.email = input.email;
        self.age = input.age;
        self.updated_at = Utc::now();
    }
}

/// Body for both `POST /users/create` and `PUT /users/update/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct UserRequest {
    #[validate(
        length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"),
        custom(function = "validate_name")
    )]
    #[schema(example = "John Doe")]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email must not be empty"),
        custom(function = "validate_email")
    )]
    #[schema(example = "john.doe@example.com")]
    pub email: String,

    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    #[schema(example = 30)]
    pub age: i32,
}

/// A user that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRequest> for NewUser {
    fn from(input: UserRequest) -> Self {
        let now = Utc::now();
        Self {
            name: input.name,
            email: input.email,
            age: input.age,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User representation with navigation links
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl UserResponse {
    pub fn new(user: User, links: Links) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
            links,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    #[serde(rename = "_links")]
    pub links: Links,
}
