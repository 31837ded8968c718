//! Outbound mail contract, used for player feedback.

use std::future::Future;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Delivers mail to the operators. The real implementation lives outside
/// this crate; the lobby only relays.
pub trait Mailer: Send + Sync + 'static {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        reply_to: &str,
    ) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// A [`Mailer`] that logs instead of sending, for tests and the demo.
#[derive(Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        reply_to: &str,
    ) -> Result<(), MailError> {
        info!(to, subject, reply_to, bytes = body.len(), "mail relayed");
        Ok(())
    }
}
