use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed, unsigned, expired, or otherwise unparseable credential.
    #[error("Invalid token")]
    InvalidToken,

    /// Well-formed credential that is revoked, pre-epoch, or not permitted.
    #[error("Invalid or old credentials")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// OTP resend ceiling reached; this call starts the cool-down.
    #[error("Maximum attempts reached, try again later")]
    OtpMaxAttempts,

    /// OTP cool-down still running; no code is issued.
    #[error("Maximum attempts reached, please try again later")]
    OtpBlocked,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// HTTP status class the transport layer should map this failure to.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::InvalidToken => 401,
            AuthError::Unauthorized => 401,
            AuthError::InvalidCredentials => 401,
            AuthError::NotFound(_) => 404,
            AuthError::BadRequest(_) => 400,
            AuthError::OtpMaxAttempts => 400,
            AuthError::OtpBlocked => 400,
            AuthError::Conflict(_) => 409,
            AuthError::Store(_) => 500,
            AuthError::Internal(_) => 500,
        }
    }

    /// Message safe to put in a response body.
    ///
    /// Verification and OTP failures are collapsed to coarse categories so a
    /// caller cannot distinguish "revoked" from "expired" from "unknown
    /// subject", or a wrong code from a stale one.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidToken | AuthError::Unauthorized | AuthError::InvalidCredentials => {
                "invalid credentials"
            }
            AuthError::BadRequest(_) => "invalid or expired code",
            AuthError::NotFound(_) => "not found",
            AuthError::OtpMaxAttempts | AuthError::OtpBlocked => {
                "maximum attempts reached, try again later"
            }
            AuthError::Conflict(_) => "conflict",
            AuthError::Store(_) | AuthError::Internal(_) => "internal error",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken
    }
}
