use async_trait::async_trait;

use yatube_core::ports::{EmailMessage, MailError, Mailer};

/// Writes each message to stdout instead of delivering it (for development).
pub struct ConsoleMailer;

impl ConsoleMailer {
    fn format(message: &EmailMessage) -> String {
        format!(
            "Content-Type: text/plain; charset=\"utf-8\"\n\
             Subject: {}\n\
             From: {}\n\
             To: {}\n\
             \n\
             {}\n\
             {}",
            message.subject,
            message.from,
            message.to.join(", "),
            message.body,
            "-".repeat(79)
        )
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::SendError("message has no recipients".into()));
        }

        tracing::info!(
            subject = %message.subject,
            recipients = message.to.len(),
            "Sending email to console"
        );
        println!("{}", Self::format(&message));
        Ok(())
    }
}
