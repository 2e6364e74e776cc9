use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{InviteStatus, Role};

// ============================================================================
// Auth API Types
// ============================================================================

/// Body posted by the frontend after Google's consent redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub code: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub status: String,
    pub message: String,
    pub user: UserProfile,
    pub access_token: String,
    pub id_token: String,
}

impl ExchangeResponse {
    pub fn success(user: UserProfile, access_token: String, id_token: String) -> Self {
        Self {
            status: "success".to_string(),
            message: "Authentication successful".to_string(),
            user,
            access_token,
            id_token,
        }
    }
}

// ============================================================================
// Manager API Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateManagerRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateManagerResponse {
    pub message: String,
    pub id: Uuid,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateManagerRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub invite_status: Option<InviteStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_request_accepts_null_role() {
        let req: ExchangeRequest =
            serde_json::from_str(r#"{"code":"abc123","role":null}"#).unwrap();
        assert_eq!(req.code.as_deref(), Some("abc123"));
        assert_eq!(req.role, None);
    }

    #[test]
    fn exchange_request_rejects_unknown_role() {
        let result = serde_json::from_str::<ExchangeRequest>(r#"{"code":"abc","role":"root"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn create_manager_request_validates_email() {
        let req = CreateManagerRequest {
            name: "Dana".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(req.validate().is_err());

        let req = CreateManagerRequest {
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn update_manager_request_validates_present_fields() {
        let req: UpdateManagerRequest =
            serde_json::from_str(r#"{"invite_status":"accepted"}"#).unwrap();
        assert_eq!(req.invite_status, Some(InviteStatus::Accepted));
        assert!(req.validate().is_ok());

        let req = UpdateManagerRequest {
            email: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = UpdateManagerRequest {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn error_response_omits_empty_details() {
        let body = serde_json::to_value(ErrorResponse::new("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"error": "nope"}));
    }
}
