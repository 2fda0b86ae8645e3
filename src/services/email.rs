use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{info, warn};

use crate::config::EmailSettings;
use crate::error::{AuthError, Result};

/// Outbound message the trust subsystem hands to the delivery collaborator.
///
/// One variant per OTP purpose plus the post-reset notice; the sender decides
/// subject and body, the flows never touch delivery mechanics.
#[derive(Debug, Clone)]
pub enum Notification {
    ConfirmEmail { to: String, code: String },
    PasswordReset { to: String, code: String },
    PasswordChanged { to: String },
    ChangeEmail { to: String, code: String },
    TwoStepEnable { to: String, code: String },
    TwoStepDisable { to: String, code: String },
    TwoStepLogin { to: String, code: String },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::ConfirmEmail { to, .. }
            | Notification::PasswordReset { to, .. }
            | Notification::PasswordChanged { to }
            | Notification::ChangeEmail { to, .. }
            | Notification::TwoStepEnable { to, .. }
            | Notification::TwoStepDisable { to, .. }
            | Notification::TwoStepLogin { to, .. } => to,
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            Notification::ConfirmEmail { .. } => "Confirm Your Email Address",
            Notification::PasswordReset { .. } => "Forget Your Password?",
            Notification::PasswordChanged { .. } => "Your Password Was Changed",
            Notification::ChangeEmail { .. } => "Confirm Your Updated Email Address",
            Notification::TwoStepEnable { .. } => "Enable Two-Step Verification - Action Required",
            Notification::TwoStepDisable { .. } => {
                "Disable Two-Step Verification - Confirmation Needed"
            }
            Notification::TwoStepLogin { .. } => "Login Verification Code",
        }
    }

    fn body(&self) -> String {
        match self {
            Notification::ConfirmEmail { code, .. } => format!(
                "Welcome to LinkSphere!\n\nYour email confirmation code is: {code}\n\nThe code expires in 5 minutes. If you did not sign up, ignore this email.",
            ),
            Notification::PasswordReset { code, .. } => format!(
                "We received your password reset request.\n\nYour reset code is: {code}\n\nThe code expires in 5 minutes. If you did not request this, ignore this email.",
            ),
            Notification::PasswordChanged { .. } => {
                "Your password was just changed. All other sessions have been signed out.\n\nIf this was not you, contact support immediately.".to_string()
            }
            Notification::ChangeEmail { code, .. } => format!(
                "Confirm your new email address with this code: {code}\n\nThe code expires in 5 minutes.",
            ),
            Notification::TwoStepEnable { code, .. } => format!(
                "Your code to enable two-step verification is: {code}\n\nThe code expires in 10 minutes.",
            ),
            Notification::TwoStepDisable { code, .. } => format!(
                "Your code to disable two-step verification is: {code}\n\nThe code expires in 10 minutes.",
            ),
            Notification::TwoStepLogin { code, .. } => format!(
                "Your login verification code is: {code}\n\nThe code expires in 10 minutes. If you did not try to log in, change your password.",
            ),
        }
    }
}

/// Delivery seam between OTP/credential logic and the mail infrastructure.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<()>;
}

/// Fire-and-forget dispatch: delivery is best-effort, failures are logged and
/// never surfaced as request failures.
pub fn dispatch(sender: Arc<dyn NotificationSender>, notification: Notification) {
    tokio::spawn(async move {
        let recipient = notification.recipient().to_string();
        if let Err(err) = sender.send(notification).await {
            warn!(%recipient, error = %err, "Failed to deliver notification");
        }
    });
}

/// Async SMTP sender (or no-op when unconfigured).
#[derive(Clone)]
pub struct SmtpSender {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpSender {
    /// Build from configuration. An empty SMTP host yields no-op mode (log
    /// only), which development and tests run with.
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let from = settings
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AuthError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if settings.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; notification sender will operate in no-op mode");
            None
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
                .map_err(|e| {
                    AuthError::Internal(format!("Failed to configure SMTP transport: {}", e))
                })?
                .port(settings.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&settings.smtp_username, &settings.smtp_password)
            {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl NotificationSender for SmtpSender {
    async fn send(&self, notification: Notification) -> Result<()> {
        let subject = notification.subject();

        let Some(transport) = &self.transport else {
            info!(
                subject,
                recipient = notification.recipient(),
                "Notification sender in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = notification.recipient().parse::<Mailbox>().map_err(|e| {
            AuthError::Internal(format!("Invalid recipient email address: {}", e))
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| AuthError::Internal(format!("Failed to build email message: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| AuthError::Internal(format!("Failed to send email: {}", e)))?;
        info!(subject, "email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_op_mode_when_host_is_empty() {
        let sender = SmtpSender::new(&EmailSettings {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "LinkSphere <no-reply@linksphere.dev>".to_string(),
        })
        .unwrap();
        assert!(!sender.is_enabled());
    }

    #[tokio::test]
    async fn no_op_send_succeeds() {
        let sender = SmtpSender::new(&EmailSettings {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "no-reply@linksphere.dev".to_string(),
        })
        .unwrap();

        sender
            .send(Notification::ConfirmEmail {
                to: "amira@example.com".to_string(),
                code: "123456".to_string(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn body_carries_the_code() {
        let notification = Notification::TwoStepLogin {
            to: "x@example.com".to_string(),
            code: "987654".to_string(),
        };
        assert!(notification.body().contains("987654"));
    }
}
