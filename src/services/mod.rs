pub mod email;
pub mod otp;
pub mod session;

pub use email::{Notification, NotificationSender, SmtpSender};
pub use otp::OtpChallengeManager;
pub use session::{LoginOutcome, LogoutFlag, SessionService};
