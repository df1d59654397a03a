use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Delivers email verification codes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &str, code: &str) -> Result<()>;
}

/// Logs instead of sending. The code itself is only emitted at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_verification(&self, email: &str, code: &str) -> Result<()> {
        info!(email, "verification email queued");
        debug!(email, code, "verification code");
        Ok(())
    }
}

/// Keeps every `(email, code)` pair; used by tests to complete verification.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    /// Most recent code mailed to `email`.
    pub async fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification(&self, email: &str, code: &str) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}
