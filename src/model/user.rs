//! Users & Roles
//!
//! One canonical role enum for the whole system. SUPER_ADMIN is protected:
//! no path may deactivate or delete one, including another super admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical role set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    TeamMember,
    Member,
    /// Portal-scoped login linked to a single client record
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::TeamMember => "TEAM_MEMBER",
            Self::Member => "MEMBER",
            Self::Client => "CLIENT",
        }
    }
}

/// A back-office or portal login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    /// Set for portal users; scopes their visibility to one client
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        role: UserRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash,
            role,
            is_active: true,
            client_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Caller-safe projection of a user, without the credential hash
#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for TeamMemberView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
