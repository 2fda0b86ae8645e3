pub mod otp;
pub mod token;
pub mod user;

pub use otp::{OtpChallenge, OtpPolicy, OtpPurpose};
pub use token::{Claims, CredentialPair, RevocationRecord, SignatureLevel, TokenKind};
pub use user::{Account, Role};
