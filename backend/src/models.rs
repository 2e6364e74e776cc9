// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared::models::{InviteStatus, Manager, Role};
use uuid::Uuid;

/// Google's default avatar size marker and the larger variant we persist.
const AVATAR_SMALL: &str = "s96-c";
const AVATAR_LARGE: &str = "s400-c";

/// Rewrite a Google avatar URL to its higher-resolution variant.
pub fn normalize_avatar_url(url: &str) -> String {
    url.replace(AVATAR_SMALL, AVATAR_LARGE)
}

/// Persisted user, keyed by the issuer's stable subject id.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
    pub email_verified: bool,
    pub role: Role,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a successful login knows about the user.
///
/// `role` is only applied when the record is created; `refresh_token` only
/// replaces the stored one when present.
#[derive(Debug, Clone)]
pub struct UserLogin {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
    pub email_verified: bool,
    pub role: Role,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub user: User,
    pub created: bool,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
    pub email_verified: bool,
    pub role: String, // stored as VARCHAR, see Role::as_str
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            role: row.role.parse()?,
            external_id: row.external_id,
            email: row.email,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            email_verified: row.email_verified,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub external_id: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub avatar_url: &'a str,
    pub email_verified: bool,
    pub role: &'a str,
    pub refresh_token: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewUser<'a> {
    /// Both timestamps share `now` so a freshly inserted row is recognisable.
    pub fn from_login(login: &'a UserLogin, now: DateTime<Utc>) -> Self {
        NewUser {
            external_id: &login.external_id,
            email: &login.email,
            display_name: &login.display_name,
            avatar_url: &login.avatar_url,
            email_verified: login.email_verified,
            role: login.role.as_str(),
            refresh_token: login.refresh_token.as_deref(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::managers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ManagerRow {
    pub id: Uuid,
    pub admin_external_id: String,
    pub name: String,
    pub email: String,
    pub invite_status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ManagerRow> for Manager {
    type Error = anyhow::Error;

    fn try_from(row: ManagerRow) -> Result<Self, Self::Error> {
        Ok(Manager {
            id: row.id,
            invite_status: row
                .invite_status
                .parse::<InviteStatus>()
                .map_err(anyhow::Error::msg)?,
            admin_external_id: row.admin_external_id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        })
    }
}

/// Insertable struct for new managers
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::managers)]
pub struct NewManager {
    pub admin_external_id: String,
    pub name: String,
    pub email: String,
    pub invite_status: String,
}

/// Changeset for a manager update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = crate::schema::managers)]
pub struct ManagerChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub invite_status: Option<String>,
}

impl ManagerChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.invite_status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_normalized_to_large_variant() {
        let url = "https://lh3.googleusercontent.com/a/AAcHTt=s96-c";
        assert_eq!(
            normalize_avatar_url(url),
            "https://lh3.googleusercontent.com/a/AAcHTt=s400-c"
        );
    }

    #[test]
    fn test_avatar_without_marker_untouched() {
        assert_eq!(normalize_avatar_url(""), "");
        assert_eq!(
            normalize_avatar_url("https://example.com/me.png"),
            "https://example.com/me.png"
        );
    }

    #[test]
    fn test_row_with_unknown_role_rejected() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            external_id: "g-1".to_string(),
            email: "a@x.com".to_string(),
            display_name: String::new(),
            avatar_url: String::new(),
            email_verified: true,
            role: "superuser".to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        assert!(User::try_from(row).is_err());
    }
}
