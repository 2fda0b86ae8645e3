//! Credential & session trust subsystem for the LinkSphere backend.
//!
//! Covers issuance and verification of signed bearer tokens with role-scoped
//! signing tiers, server-side revocation, the rate-limited OTP challenge
//! protocol shared by every confirmation flow, and the in-memory presence
//! registry that routes chat events to a user's live devices.
//!
//! The document store, SMTP relay, and HTTP/WebSocket transport are external
//! collaborators behind the [`db::DirectoryStore`] and
//! [`services::NotificationSender`] traits.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod presence;
pub mod security;
pub mod services;
pub mod telemetry;

pub use error::{AuthError, Result};

// Re-export commonly used types
pub use config::Config;
pub use db::{DirectoryStore, MemoryStore};
pub use models::{
    Account, Claims, CredentialPair, OtpChallenge, OtpPurpose, RevocationRecord, Role,
    SignatureLevel, TokenKind,
};
pub use presence::{ConnectionId, PresenceEvent, PresenceRegistry, SocketGateway};
pub use security::{RevocationStore, TokenIssuer, TokenKeys, TokenVerifier};
pub use services::{
    LoginOutcome, LogoutFlag, Notification, NotificationSender, OtpChallengeManager,
    SessionService, SmtpSender,
};
