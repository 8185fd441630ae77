use axum::async_trait;
use tracing::info;

/// Outbound notification dispatcher. Delivery transport is out of scope;
/// implementations only promise to hand the message off.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Writes outbound mail to the log. Used in deployments without a relay so
/// operators can still follow reset links.
#[derive(Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(recipient = %to, subject = %subject, body = %body, "outbound mail");
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<(String, String, String)>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mail relay unavailable");
        }
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}
