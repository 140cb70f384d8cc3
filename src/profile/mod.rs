pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::policy::Role;

pub use postgres::PgProfileStore;

/// The slice of a user's profile the access gate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub role: Role,
    pub is_active: bool,
    pub has_completed_onboarding: bool,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("subject is not a valid user id: {0}")]
    InvalidSubject(String),

    #[error("no profile for user {0}")]
    NotFound(String),

    #[error("profile for user {user} has unknown role '{role}'")]
    UnknownRole { user: String, role: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Read access to user profiles, keyed by the identity subject.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, sub: &str) -> Result<Profile, ProfileError>;
}
