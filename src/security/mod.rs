pub mod otp;
pub mod password;
pub mod revocation;
pub mod token;

pub use revocation::RevocationStore;
pub use token::{TokenIssuer, TokenKeys, TokenVerifier};
