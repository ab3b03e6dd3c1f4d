//! Client for the build server's remote-access API.

use crate::error::ClientError;
use crate::types::{BuildParameters, QueuedBuild};
use crate::Result;
use std::time::Duration;

#[derive(Clone)]
pub struct BuildClient {
    http: reqwest::Client,
    url: String,
    user: String,
    token: String,
    job: String,
}

impl BuildClient {
    pub fn new(url: &str, user: &str, token: &str, job: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            token: token.to_string(),
            job: job.to_string(),
        })
    }

    /// Queue the build job and return the queue item from the `Location` header.
    pub async fn trigger(&self, params: &BuildParameters) -> Result<QueuedBuild> {
        let path = format!("/job/{}/buildWithParameters", self.job);
        tracing::debug!(path = %path, app = %params.app_name, branch = %params.branch, "build api POST");
        let resp = self
            .http
            .post(format!("{}{}", self.url, path))
            .basic_auth(&self.user, Some(&self.token))
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                method: "POST",
                path,
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ClientError::MissingHeader {
                path: path.clone(),
                header: "Location",
            })?;
        Ok(QueuedBuild {
            job: self.job.clone(),
            queue_item: queue_item_id(location),
        })
    }
}

/// `https://ci/queue/item/123/` → `123`
fn queue_item_id(location: &str) -> Option<u64> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|id| id.parse().ok())
}
