use tracing::{debug, info};

use rabbit_types::models::EmailKind;

/// A message ready to hand to a delivery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// The one-time-code email for registration or password reset.
    pub fn otp(to: &str, kind: EmailKind, code: &str, ttl_minutes: u64) -> Self {
        let (subject, intro) = match kind {
            EmailKind::Verification => (
                "Verify Your Email - Rabbit",
                "Thanks for signing up! Enter this code to verify your email address:",
            ),
            EmailKind::Reset => (
                "Password Reset Code - Rabbit",
                "You asked to reset your password. Enter this code to continue:",
            ),
        };
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            body: format!("{intro}\n\n    {code}\n\nThis code expires in {ttl_minutes} minutes."),
        }
    }
}

/// Delivery backend for outgoing email.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Records messages in the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        info!("Email to {} (delivery not configured): {}", email.to, email.subject);
        debug!("Email body:\n{}", email.body);
        Ok(())
    }
}
