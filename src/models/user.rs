use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::token::SignatureLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Signature tier this role signs and verifies under.
    ///
    /// Elevated administrative roles get independent signing material so a
    /// system token can never pass verification against user-tier secrets.
    pub fn signature_level(&self) -> SignatureLevel {
        match self {
            Role::Admin | Role::SuperAdmin => SignatureLevel::System,
            Role::User => SignatureLevel::Bearer,
        }
    }
}

/// Account record as the trust subsystem sees it.
///
/// The document store owns the full profile; only the fields the credential,
/// OTP, and presence paths consult are modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: Option<String>,
    /// Set once the signup email-confirmation OTP has been verified.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Soft delete; a deleted account fails token verification.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Credential epoch: tokens issued before this watermark are rejected.
    pub credentials_changed_at: Option<DateTime<Utc>>,
    /// Destination of a pending email-change flow, committed on OTP verify.
    pub pending_email: Option<String>,
    pub two_step_enabled: bool,
}

impl Account {
    /// Whether this account may hold live credentials.
    pub fn is_active(&self) -> bool {
        self.confirmed_at.is_some() && self.deleted_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_to_tier_mapping() {
        assert_eq!(Role::User.signature_level(), SignatureLevel::Bearer);
        assert_eq!(Role::Admin.signature_level(), SignatureLevel::System);
        assert_eq!(Role::SuperAdmin.signature_level(), SignatureLevel::System);
    }
}
