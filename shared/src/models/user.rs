//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a display name
pub const MAX_USER_NAME_LEN: usize = 50;

/// A storefront user profile.
///
/// The id mirrors the Supabase `auth.users` id carried in the JWT `sub`
/// claim. Passwords live in Supabase Auth, never here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::User
    }
}

/// Application role. Guests are callers without a token and have no row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default display name for a freshly provisioned profile: the local part of
/// the email, truncated to the name limit.
pub fn default_name_from_email(email: &str) -> String {
    let local = match email.split_once('@') {
        Some((local, _)) => local,
        None => email,
    };
    local.chars().take(MAX_USER_NAME_LEN).collect()
}
