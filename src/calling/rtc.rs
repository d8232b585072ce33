//! Media channel seam.
//!
//! The actual audio/video transport belongs to the vendor RTC SDK; this layer
//! only hands it a channel name (the room id) and the application
//! credentials, and tells it when to attach and detach. Join/leave are
//! idempotent so teardown signals can be applied unconditionally.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ChatError;

#[async_trait]
pub trait MediaChannel: Send + Sync {
    async fn join(&self, channel: &str) -> Result<(), ChatError>;
    async fn leave(&self) -> Result<(), ChatError>;
}

/// Attach point for the vendor SDK: carries the application id and optional
/// token, and tracks which channel is currently joined.
pub struct RtcChannel {
    app_id: String,
    token: Option<String>,
    joined: Mutex<Option<String>>,
}

impl RtcChannel {
    pub fn new(app_id: &str, token: Option<&str>) -> Self {
        Self {
            app_id: app_id.to_string(),
            token: token.map(String::from),
            joined: Mutex::new(None),
        }
    }

    pub async fn current_channel(&self) -> Option<String> {
        self.joined.lock().await.clone()
    }
}

#[async_trait]
impl MediaChannel for RtcChannel {
    async fn join(&self, channel: &str) -> Result<(), ChatError> {
        let mut joined = self.joined.lock().await;
        if joined.as_deref() == Some(channel) {
            return Ok(());
        }
        tracing::info!(
            "joining media channel {} (app {}, token: {})",
            channel,
            self.app_id,
            if self.token.is_some() { "yes" } else { "none" }
        );
        *joined = Some(channel.to_string());
        Ok(())
    }

    async fn leave(&self) -> Result<(), ChatError> {
        let mut joined = self.joined.lock().await;
        if let Some(channel) = joined.take() {
            tracing::info!("leaving media channel {}", channel);
        }
        Ok(())
    }
}
