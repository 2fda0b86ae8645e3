use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The flow a one-time code gates.
///
/// Every purpose shares the same state machine but owns an independent
/// challenge record, counter, and expiry window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    ConfirmEmail,
    PasswordReset,
    ChangeEmail,
    TwoStepToggle,
    TwoStepLogin,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::ConfirmEmail => "confirm_email",
            OtpPurpose::PasswordReset => "password_reset",
            OtpPurpose::ChangeEmail => "change_email",
            OtpPurpose::TwoStepToggle => "two_step_toggle",
            OtpPurpose::TwoStepLogin => "two_step_login",
        }
    }

    /// Rate-limit and expiry parameters for this purpose.
    ///
    /// Confirmation and reset codes live 5 minutes; two-step verification
    /// codes get 10. All purposes share the 5-resend ceiling and the
    /// 10-minute cool-down.
    pub fn policy(&self) -> OtpPolicy {
        match self {
            OtpPurpose::ConfirmEmail | OtpPurpose::PasswordReset | OtpPurpose::ChangeEmail => {
                OtpPolicy {
                    code_window: Duration::minutes(5),
                    block_window: Duration::minutes(10),
                    max_resends: 5,
                }
            }
            OtpPurpose::TwoStepToggle | OtpPurpose::TwoStepLogin => OtpPolicy {
                code_window: Duration::minutes(10),
                block_window: Duration::minutes(10),
                max_resends: 5,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub code_window: Duration,
    pub block_window: Duration,
    pub max_resends: u32,
}

/// Active challenge for one `(account, purpose)` pair.
///
/// Only the one-way hash of the code is ever stored; the plaintext exists
/// solely in the issuing call's return value, bound for out-of-band delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub user_id: Uuid,
    pub purpose: OtpPurpose,
    pub code_hash: String,
    pub sent_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Resends since the initial issue; saturates at the policy ceiling.
    pub resend_count: u32,
    /// Cool-down horizon once the ceiling is hit.
    pub block_until: Option<DateTime<Utc>>,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.block_until.is_some_and(|until| now < until)
    }
}
