//! User profile service
//!
//! Profiles mirror Supabase Auth users. A row is provisioned on the first
//! authenticated request; only the display name and role are editable.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    default_name_from_email, normalize_required, validate_length, Pagination, Role, User,
    MAX_USER_NAME_LEN,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{map_constraint_error, AppError, AppResult};

/// User service for profile and role management
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(AppError::Internal)?;
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, role, created_at";

/// First-time profile completion
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CompleteProfileInput {
    /// Cross-checked against the token email, never stored
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Partial profile edit
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleInput {
    pub role: Role,
}

/// Trim a display name and check it fits the profile column
pub fn normalize_user_name(raw: &str) -> AppResult<String> {
    let name = normalize_required(raw).map_err(|_| AppError::validation("name", "name cannot be empty"))?;
    validate_length(&name, 1, MAX_USER_NAME_LEN).map_err(|e| AppError::validation("name", format!("name {}", e)))?;
    Ok(name)
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Load a profile, 404 if missing
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Load the profile for an authenticated identity, creating it on first sight
    pub async fn get_or_provision(&self, user_id: Uuid, email: &str) -> AppResult<User> {
        if let Some(user) = self.find_by_id(user_id).await? {
            return Ok(user);
        }

        let name = default_name_from_email(email);
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(&name)
        .bind(Role::User.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, "email", "Profile could not be created"))?;

        tracing::info!(%user_id, "Provisioned user profile");
        self.get_user(user_id).await
    }

    /// Fill editable profile fields after sign-up
    pub async fn complete_profile(&self, current: &User, input: CompleteProfileInput) -> AppResult<User> {
        input.validate()?;

        if let Some(email) = &input.email {
            if email != &current.email {
                return Err(AppError::bad_request("Email cannot be changed"));
            }
        }

        match input.name {
            Some(name) => self.update_name(current.id, &normalize_user_name(&name)?).await,
            None => Ok(current.clone()),
        }
    }

    pub async fn update_profile(&self, current: &User, input: UpdateProfileInput) -> AppResult<User> {
        match input.name {
            Some(name) => self.update_name(current.id, &normalize_user_name(&name)?).await,
            None => Ok(current.clone()),
        }
    }

    async fn update_name(&self, user_id: Uuid, name: &str) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

        row.try_into()
    }

    /// List users, newest first
    pub async fn list_users(&self, page: Pagination) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC OFFSET $1 LIMIT $2",
            USER_COLUMNS
        ))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn update_role(&self, user_id: Uuid, input: UpdateRoleInput) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.role.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

        tracing::info!(%user_id, role = %input.role, "User role changed");
        row.try_into()
    }

    /// Delete a profile. Cart rows cascade; users with orders are kept.
    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| map_constraint_error(e, "id", "User has orders and cannot be deleted"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }

        tracing::info!(%user_id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_user_name() {
        assert_eq!(normalize_user_name("  Linh  ").unwrap(), "Linh");
        assert!(normalize_user_name("   ").is_err());
        assert!(normalize_user_name(&"a".repeat(MAX_USER_NAME_LEN)).is_ok());
        assert!(normalize_user_name(&"a".repeat(MAX_USER_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_profile_input_rejects_unknown_fields() {
        let parsed: Result<UpdateProfileInput, _> =
            serde_json::from_value(serde_json::json!({ "name": "A", "role": "admin" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_role_input_only_accepts_known_roles() {
        let ok: UpdateRoleInput = serde_json::from_value(serde_json::json!({ "role": "admin" })).unwrap();
        assert_eq!(ok.role, Role::Admin);
        let bad: Result<UpdateRoleInput, _> =
            serde_json::from_value(serde_json::json!({ "role": "guest" }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_complete_profile_validates_email_format() {
        let input = CompleteProfileInput {
            email: Some("not-an-email".into()),
            name: None,
        };
        assert!(input.validate().is_err());
    }
}
