use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::DirectoryStore;
use crate::error::{AuthError, Result};
use crate::models::{Account, Claims, CredentialPair, OtpPurpose, TokenKind};
use crate::security::password;
use crate::security::{RevocationStore, TokenIssuer, TokenVerifier};
use crate::services::email::{dispatch, Notification, NotificationSender};
use crate::services::otp::OtpChallengeManager;

/// Scope of a logout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutFlag {
    /// Revoke the presented token pair only.
    Current,
    /// Bump the credential epoch, killing every previously issued token.
    All,
}

/// What a successful password login produced.
#[derive(Debug)]
pub enum LoginOutcome {
    Credentials(CredentialPair),
    /// Two-step verification is enabled; a code was emailed and the caller
    /// must follow up with `verify_login_otp`.
    TwoStepChallenge,
}

/// Session lifecycle flows composed from the trust components.
///
/// CRUD record mutation stays behind the [`DirectoryStore`] trait; delivery
/// stays behind [`NotificationSender`]. Everything here is the state-machine
/// glue between them.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn DirectoryStore>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    revocations: RevocationStore,
    challenges: OtpChallengeManager,
    notifier: Arc<dyn NotificationSender>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            revocations: RevocationStore::new(store.clone()),
            challenges: OtpChallengeManager::new(store.clone()),
            store,
            issuer,
            verifier,
            notifier,
        }
    }

    pub fn challenges(&self) -> &OtpChallengeManager {
        &self.challenges
    }

    // ==================== Login & session management ====================

    /// Password login. With two-step verification enabled this emails a code
    /// instead of minting credentials.
    pub async fn login(&self, email: &str, candidate_password: &str) -> Result<LoginOutcome> {
        let account = self
            .store
            .find_account_by_email(email)
            .await?
            .filter(|account| account.deleted_at.is_none())
            .ok_or(AuthError::InvalidCredentials)?;

        if account.confirmed_at.is_none() {
            return Err(AuthError::BadRequest(
                "Confirm your email to login".to_string(),
            ));
        }

        let hash = account
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        password::verify_password(candidate_password, hash)?;

        if account.two_step_enabled {
            let code = self
                .challenges
                .issue(account.id, OtpPurpose::TwoStepLogin)
                .await?;
            dispatch(
                self.notifier.clone(),
                Notification::TwoStepLogin {
                    to: account.email.clone(),
                    code,
                },
            );
            return Ok(LoginOutcome::TwoStepChallenge);
        }

        let pair = self.issuer.issue(&account)?;
        tracing::info!(user_id = %account.id, "Login credentials issued");
        Ok(LoginOutcome::Credentials(pair))
    }

    /// Complete a two-step login with the emailed code.
    pub async fn verify_login_otp(&self, email: &str, code: &str) -> Result<CredentialPair> {
        let account = self.account_by_email(email).await?;

        self.challenges
            .verify(account.id, OtpPurpose::TwoStepLogin, code)
            .await?;
        self.challenges
            .clear(account.id, OtpPurpose::TwoStepLogin)
            .await?;

        self.issuer.issue(&account)
    }

    /// Rotate a refresh credential: verify it, revoke its jti, mint a fresh
    /// pair. The old access token dies with the shared jti.
    pub async fn refresh(&self, authorization: &str) -> Result<CredentialPair> {
        let (claims, account) = self
            .verifier
            .decode(authorization, TokenKind::Refresh)
            .await?;
        self.revocations.revoke(&claims).await?;
        self.issuer.issue(&account)
    }

    /// Log out of the current device or everywhere.
    pub async fn logout(&self, claims: &Claims, flag: LogoutFlag) -> Result<()> {
        match flag {
            LogoutFlag::Current => {
                self.revocations.revoke(claims).await?;
            }
            LogoutFlag::All => {
                self.store
                    .update_credential_epoch(claims.sub, Utc::now())
                    .await?;
                tracing::info!(user_id = %claims.sub, "Global logout, credential epoch bumped");
            }
        }
        Ok(())
    }

    // ==================== Email confirmation ====================

    pub async fn request_email_confirmation(&self, email: &str) -> Result<()> {
        let account = self.account_by_email(email).await?;
        if account.confirmed_at.is_some() {
            return Err(AuthError::Conflict("Email already confirmed".to_string()));
        }

        let code = self
            .challenges
            .issue(account.id, OtpPurpose::ConfirmEmail)
            .await?;
        dispatch(
            self.notifier.clone(),
            Notification::ConfirmEmail {
                to: account.email,
                code,
            },
        );
        Ok(())
    }

    pub async fn resend_email_confirmation(&self, email: &str) -> Result<()> {
        let account = self.account_by_email(email).await?;
        if account.confirmed_at.is_some() {
            return Err(AuthError::Conflict("Email already confirmed".to_string()));
        }

        let code = self
            .challenges
            .resend(account.id, OtpPurpose::ConfirmEmail)
            .await?;
        dispatch(
            self.notifier.clone(),
            Notification::ConfirmEmail {
                to: account.email,
                code,
            },
        );
        Ok(())
    }

    pub async fn confirm_email(&self, email: &str, code: &str) -> Result<()> {
        let account = self.account_by_email(email).await?;
        if account.confirmed_at.is_some() {
            return Err(AuthError::Conflict("Email already confirmed".to_string()));
        }

        self.challenges
            .verify(account.id, OtpPurpose::ConfirmEmail, code)
            .await?;
        self.store
            .mark_email_confirmed(account.id, Utc::now())
            .await?;
        self.challenges
            .clear(account.id, OtpPurpose::ConfirmEmail)
            .await?;
        tracing::info!(user_id = %account.id, "Email confirmed");
        Ok(())
    }

    // ==================== Password reset ====================

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let account = self.active_account_by_email(email).await?;

        let code = self
            .challenges
            .issue(account.id, OtpPurpose::PasswordReset)
            .await?;
        dispatch(
            self.notifier.clone(),
            Notification::PasswordReset {
                to: account.email,
                code,
            },
        );
        Ok(())
    }

    pub async fn resend_password_reset(&self, email: &str) -> Result<()> {
        let account = self.active_account_by_email(email).await?;

        let code = self
            .challenges
            .resend(account.id, OtpPurpose::PasswordReset)
            .await?;
        dispatch(
            self.notifier.clone(),
            Notification::PasswordReset {
                to: account.email,
                code,
            },
        );
        Ok(())
    }

    /// Verify the reset code, install the new password, and invalidate every
    /// outstanding token via the credential epoch. Returns a fresh pair so
    /// the caller stays logged in on this device.
    pub async fn complete_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<CredentialPair> {
        let account = self.active_account_by_email(email).await?;

        self.challenges
            .verify(account.id, OtpPurpose::PasswordReset, code)
            .await?;

        let hash = password::hash_password(new_password)?;
        self.store.update_password(account.id, &hash).await?;
        self.store
            .update_credential_epoch(account.id, Utc::now())
            .await?;
        self.challenges
            .clear(account.id, OtpPurpose::PasswordReset)
            .await?;

        dispatch(
            self.notifier.clone(),
            Notification::PasswordChanged {
                to: account.email.clone(),
            },
        );
        tracing::info!(user_id = %account.id, "Password reset completed");

        self.issuer.issue(&account)
    }

    // ==================== Email change ====================

    /// Start an email change; the code goes to the *new* address.
    pub async fn request_email_change(&self, user_id: Uuid, new_email: &str) -> Result<()> {
        let account = self.account_by_id(user_id).await?;
        if account.email == new_email {
            return Err(AuthError::Conflict(
                "New email matches the current one".to_string(),
            ));
        }
        if self
            .store
            .find_account_by_email(new_email)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict("Email already in use".to_string()));
        }

        // Rate limiting can reject the challenge; only a delivered code may
        // replace a previously pending address.
        let code = self
            .challenges
            .issue(user_id, OtpPurpose::ChangeEmail)
            .await?;
        self.store
            .set_pending_email(user_id, Some(new_email.to_string()))
            .await?;
        dispatch(
            self.notifier.clone(),
            Notification::ChangeEmail {
                to: new_email.to_string(),
                code,
            },
        );
        Ok(())
    }

    pub async fn confirm_email_change(&self, user_id: Uuid, code: &str) -> Result<()> {
        let account = self.account_by_id(user_id).await?;
        let pending = account
            .pending_email
            .ok_or_else(|| AuthError::NotFound("No pending email change".to_string()))?;

        self.challenges
            .verify(user_id, OtpPurpose::ChangeEmail, code)
            .await?;
        self.store.update_email(user_id, &pending).await?;
        self.challenges
            .clear(user_id, OtpPurpose::ChangeEmail)
            .await?;
        tracing::info!(%user_id, "Email change committed");
        Ok(())
    }

    // ==================== Two-step verification toggle ====================

    /// Request enabling or disabling two-step verification; the direction is
    /// whatever the current flag is not.
    pub async fn request_two_step_toggle(&self, user_id: Uuid) -> Result<()> {
        let account = self.account_by_id(user_id).await?;

        if self
            .store
            .read_otp_challenge(user_id, OtpPurpose::TwoStepToggle)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict(
                "A toggle request is already pending verification".to_string(),
            ));
        }

        let code = self
            .challenges
            .issue(user_id, OtpPurpose::TwoStepToggle)
            .await?;
        let notification = if account.two_step_enabled {
            Notification::TwoStepDisable {
                to: account.email,
                code,
            }
        } else {
            Notification::TwoStepEnable {
                to: account.email,
                code,
            }
        };
        dispatch(self.notifier.clone(), notification);
        Ok(())
    }

    pub async fn confirm_two_step_toggle(&self, user_id: Uuid, code: &str) -> Result<bool> {
        let account = self.account_by_id(user_id).await?;

        self.challenges
            .verify(user_id, OtpPurpose::TwoStepToggle, code)
            .await?;

        let enabled = !account.two_step_enabled;
        self.store.set_two_step(user_id, enabled).await?;
        self.challenges
            .clear(user_id, OtpPurpose::TwoStepToggle)
            .await?;
        tracing::info!(%user_id, enabled, "Two-step verification toggled");
        Ok(enabled)
    }

    // ==================== Lookups ====================

    async fn account_by_email(&self, email: &str) -> Result<Account> {
        self.store
            .find_account_by_email(email)
            .await?
            .filter(|account| account.deleted_at.is_none())
            .ok_or_else(|| AuthError::NotFound("account".to_string()))
    }

    async fn active_account_by_email(&self, email: &str) -> Result<Account> {
        let account = self.account_by_email(email).await?;
        if account.confirmed_at.is_none() {
            return Err(AuthError::BadRequest("Account not confirmed".to_string()));
        }
        Ok(account)
    }

    async fn account_by_id(&self, user_id: Uuid) -> Result<Account> {
        self.store
            .find_account_by_id(user_id)
            .await?
            .filter(|account| account.deleted_at.is_none())
            .ok_or_else(|| AuthError::NotFound("account".to_string()))
    }
}
