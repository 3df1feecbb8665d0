use async_trait::async_trait;
use tokio::sync::Mutex;

use yatube_core::ports::{EmailMessage, MailError, Mailer};

/// Collects sent messages in an outbox for inspection in tests.
#[derive(Default)]
pub struct InMemoryMailer {
    outbox: Mutex<Vec<EmailMessage>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outbox(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.outbox.lock().await.push(message);
        Ok(())
    }
}
