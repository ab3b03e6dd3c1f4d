//! Reply channels backed by HTTP.

use async_trait::async_trait;
use shipgate_core::reply::{NotifyError, Reply, ReplyChannel};

/// Posts each reply as `{"reply": <Reply>, "text": "..."}` to a webhook URL.
///
/// The transport (chat connector, bot gateway) renders the tagged reply as a
/// card and falls back to `text` otherwise.
pub struct WebhookChannel {
    http: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReplyChannel for WebhookChannel {
    async fn send(&self, reply: &Reply) -> Result<(), NotifyError> {
        let body = serde_json::json!({ "reply": reply, "text": reply.text() });
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Unreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(NotifyError::Refused(format!(
                "{} returned {}",
                self.url,
                resp.status()
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("webhook:{}", self.url)
    }
}
