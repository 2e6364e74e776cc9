use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role assigned to a user when their record is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    ContentManager,
    Editor,
    Creator,
}

impl Role {
    /// Role given to a new user whose client did not send a hint.
    pub const LEAST_PRIVILEGED: Role = Role::Creator;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ContentManager => "content-manager",
            Role::Editor => "editor",
            Role::Creator => "creator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "content-manager" => Ok(Role::ContentManager),
            "editor" => Ok(Role::Editor),
            "creator" => Ok(Role::Creator),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Invitation state of a manager record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
        }
    }
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            other => Err(format!("unknown invite status: {}", other)),
        }
    }
}

/// Content manager invited by an admin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manager {
    pub id: Uuid,
    pub admin_external_id: String,
    pub name: String,
    pub email: String,
    pub invite_status: InviteStatus,
    pub created_at: DateTime<Utc>,
}
