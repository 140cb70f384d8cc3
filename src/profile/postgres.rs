use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Profile, ProfileError, ProfileStore};
use crate::database::DatabaseError;
use crate::policy::Role;

#[derive(Debug, FromRow)]
struct ProfileRow {
    role: String,
    is_active: bool,
    has_completed_onboarding: bool,
}

/// Profile store over the `profiles` table.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_subject(sub: &str) -> Result<Uuid, ProfileError> {
        Uuid::parse_str(sub).map_err(|_| ProfileError::InvalidSubject(sub.to_string()))
    }

    fn into_profile(sub: &str, row: ProfileRow) -> Result<Profile, ProfileError> {
        let role = row.role.parse::<Role>().map_err(|e| ProfileError::UnknownRole {
            user: sub.to_string(),
            role: e.0,
        })?;

        Ok(Profile {
            role,
            is_active: row.is_active,
            has_completed_onboarding: row.has_completed_onboarding,
        })
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, sub: &str) -> Result<Profile, ProfileError> {
        let id = Self::parse_subject(sub)?;

        let query = r#"
            SELECT role, is_active, has_completed_onboarding
            FROM profiles
            WHERE id = $1
        "#;

        let row = sqlx::query_as::<_, ProfileRow>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let row = row.ok_or_else(|| ProfileError::NotFound(sub.to_string()))?;
        Self::into_profile(sub, row)
    }
}
