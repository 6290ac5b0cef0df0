//! Identity records and role normalization. The backend reports roles as
//! free-form strings (historically in mixed case); everything past the
//! resolver sees only the canonical `Role`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical account role. Parsing is total: anything the console does not
/// recognize becomes `Unknown`, which no guard admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Staff,
    Agent,
    Unknown,
}

impl Role {
    /// Case-insensitive, whitespace-tolerant parse of a wire role string.
    pub fn parse(raw: &str) -> Role {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "staff" => Role::Staff,
            "agent" => Role::Agent,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Agent => "agent",
            Role::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login form payload, serialized the way the login endpoint expects it.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<S: Into<String>>(username: S, password: S) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

/// Wire shape of the current-user payload. Field names follow the backend
/// contract; extra fields are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub account_role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The resolved identity as the rest of the console sees it: role already
/// normalized, immutable until the next login replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Normalize a wire record. This is the only place raw role strings are
    /// seen; unrecognized ones are logged here and nowhere else.
    pub fn from_record(rec: UserRecord) -> User {
        let role = Role::parse(&rec.account_role);
        if role == Role::Unknown {
            tracing::warn!(
                target: "auth",
                account_role = %rec.account_role,
                username = %rec.username,
                "unrecognized account role; treating as unauthorized"
            );
        }
        User {
            user_id: rec.user_id,
            username: rec.username,
            full_name: rec.full_name,
            email: rec.email,
            role,
            created_at: rec.created_at,
            updated_at: rec.updated_at,
        }
    }
}
