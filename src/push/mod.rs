//! Push notification dispatch.
//!
//! One HTTP call to the provider, targeting every device tagged with the
//! recipient's user id. Delivery is best-effort and at-most-once: a failure
//! comes back as `DispatchFailed` and is never retried here. For chat sends
//! the message is already durable, so callers log and move on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ChatError;
use crate::models::CallKind;

const ONESIGNAL_URL: &str = "https://onesignal.com/api/v1/notifications";

/// Opaque payload the receiving client uses to tell an ordinary message from
/// a call invitation. Tagged so serialization is checked exhaustively rather
/// than shaped ad hoc per call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PushPayload {
    #[serde(rename_all = "camelCase")]
    Chat {
        sender_id: String,
        sender_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Call {
        room_id: String,
        call_kind: CallKind,
        caller_id: String,
        caller_name: String,
    },
}

/// Seam for the push provider, so call flows can be exercised without a
/// network.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(
        &self,
        target: &str,
        title: &str,
        body: &str,
        payload: &PushPayload,
    ) -> Result<(), ChatError>;
}

/// OneSignal REST dispatcher.
pub struct OneSignalDispatcher {
    http: reqwest::Client,
    app_id: String,
    rest_api_key: String,
}

impl OneSignalDispatcher {
    pub fn new(app_id: &str, rest_api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            app_id: app_id.to_string(),
            rest_api_key: rest_api_key.to_string(),
        }
    }
}

#[async_trait]
impl Notify for OneSignalDispatcher {
    async fn notify(
        &self,
        target: &str,
        title: &str,
        body: &str,
        payload: &PushPayload,
    ) -> Result<(), ChatError> {
        let request = json!({
            "app_id": self.app_id,
            "filters": [
                { "field": "tag", "key": "user_id", "value": target }
            ],
            "headings": { "en": title },
            "contents": { "en": body },
            "data": payload,
            "content_available": false,
        });
        tracing::debug!("dispatching push to user {}", target);

        let resp = self
            .http
            .post(ONESIGNAL_URL)
            .header("Authorization", &self.rest_api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::DispatchFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::DispatchFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(())
    }
}

/// Dispatcher used when push is not configured: logs and reports success, so
/// send/call flows behave identically with and without a provider.
pub struct NullDispatcher;

#[async_trait]
impl Notify for NullDispatcher {
    async fn notify(
        &self,
        target: &str,
        _title: &str,
        _body: &str,
        _payload: &PushPayload,
    ) -> Result<(), ChatError> {
        tracing::debug!("push not configured; skipping dispatch to {}", target);
        Ok(())
    }
}
