#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use uuid::Uuid;

use auth_core::config::TokenSettings;
use auth_core::{
    Account, Claims, MemoryStore, Notification, NotificationSender, Role, SessionService,
    TokenIssuer, TokenKeys, TokenVerifier,
};

pub const USER_ACCESS_SECRET: &str = "user-access-secret";
pub const USER_REFRESH_SECRET: &str = "user-refresh-secret";
pub const SYSTEM_ACCESS_SECRET: &str = "system-access-secret";
pub const SYSTEM_REFRESH_SECRET: &str = "system-refresh-secret";

pub fn token_settings() -> TokenSettings {
    TokenSettings {
        access_user_token_secret: USER_ACCESS_SECRET.to_string(),
        refresh_user_token_secret: USER_REFRESH_SECRET.to_string(),
        access_system_token_secret: SYSTEM_ACCESS_SECRET.to_string(),
        refresh_system_token_secret: SYSTEM_REFRESH_SECRET.to_string(),
        access_ttl_secs: 3600,
        refresh_ttl_secs: 60 * 60 * 24 * 365,
    }
}

pub fn account(role: Role) -> Account {
    Account {
        id: Uuid::new_v4(),
        user_name: "amira".to_string(),
        email: format!("{}@example.com", Uuid::new_v4()),
        role,
        password_hash: None,
        confirmed_at: Some(Utc::now()),
        deleted_at: None,
        credentials_changed_at: None,
        pending_email: None,
        two_step_enabled: false,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub issuer: TokenIssuer,
    pub verifier: TokenVerifier,
    pub sessions: SessionService,
    pub outbox: Mutex<UnboundedReceiver<Notification>>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let keys = TokenKeys::from_settings(&token_settings());
    let issuer = TokenIssuer::new(keys.clone());
    let verifier = TokenVerifier::new(keys, store.clone());
    let (sender, outbox) = RecordingSender::new();
    let sessions = SessionService::new(
        store.clone(),
        issuer.clone(),
        verifier.clone(),
        Arc::new(sender),
    );

    Harness {
        store,
        issuer,
        verifier,
        sessions,
        outbox: Mutex::new(outbox),
    }
}

impl Harness {
    /// Next notification handed to the (fire-and-forget) sender.
    pub async fn next_notification(&self) -> Notification {
        self.outbox
            .lock()
            .await
            .recv()
            .await
            .expect("a notification should have been dispatched")
    }

    /// Plaintext code carried by the next dispatched notification.
    pub async fn next_code(&self) -> String {
        match self.next_notification().await {
            Notification::ConfirmEmail { code, .. }
            | Notification::PasswordReset { code, .. }
            | Notification::ChangeEmail { code, .. }
            | Notification::TwoStepEnable { code, .. }
            | Notification::TwoStepDisable { code, .. }
            | Notification::TwoStepLogin { code, .. } => code,
            other => panic!("notification carries no code: {:?}", other),
        }
    }
}

/// Test sender that forwards every notification into a channel.
pub struct RecordingSender {
    tx: UnboundedSender<Notification>,
}

impl RecordingSender {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: Notification) -> auth_core::Result<()> {
        let _ = self.tx.send(notification);
        Ok(())
    }
}

/// Sign claims directly, bypassing the issuer, for edge-case tokens.
pub fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn claims_for(account: &Account, iat: i64, exp: i64) -> Claims {
    Claims {
        sub: account.id,
        role: account.role,
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
    }
}
