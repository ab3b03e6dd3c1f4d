//! Client for the release-management REST API.
//!
//! All resource paths are relative to `{url}/api/{space}`; every request
//! carries the `X-Octopus-ApiKey` header.

use crate::error::ClientError;
use crate::types::{CreateDeployment, CreatedDeployment, Deployment, Environment, Page, Project, Release};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

#[derive(Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    url: String,
    space_id: String,
    api_key: String,
}

impl ReleaseClient {
    pub fn new(url: &str, api_key: &str, space_id: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, url, api_key, space_id))
    }

    pub fn with_client(http: reqwest::Client, url: &str, api_key: &str, space_id: &str) -> Self {
        Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            space_id: space_id.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}{}", self.url, self.space_id, path)
    }

    /// Web link to a deployment in the release system's UI.
    pub fn deployment_url(&self, deployment_id: &str) -> String {
        format!("{}/app#/{}/deployments/{}", self.url, self.space_id, deployment_id)
    }

    // ─── Transport ────────────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!(path, "release api GET");
        let resp = self
            .http
            .get(self.endpoint(path))
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await?;
        decode("GET", path, resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        tracing::debug!(path, "release api POST");
        let resp = self
            .http
            .post(self.endpoint(path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        decode("POST", path, resp).await
    }

    // ─── Resources ────────────────────────────────────────────────────────

    pub async fn find_projects(&self, name: &str) -> Result<Vec<Project>> {
        let page: Page<Project> = self
            .get("/projects", &[("name", name.to_string()), ("take", "1".to_string())])
            .await?;
        Ok(page.items)
    }

    pub async fn find_environments(&self, name: &str) -> Result<Vec<Environment>> {
        let page: Page<Environment> = self
            .get(
                "/environments",
                &[("name", name.to_string()), ("take", "1".to_string())],
            )
            .await?;
        Ok(page.items)
    }

    /// Most recent releases first.
    pub async fn list_releases(&self, project_id: &str, take: u32) -> Result<Vec<Release>> {
        let page: Page<Release> = self
            .get(
                &format!("/projects/{project_id}/releases"),
                &[("take", take.to_string())],
            )
            .await?;
        Ok(page.items)
    }

    /// Most recent deployments first.
    pub async fn list_deployments(&self, project_id: &str, take: u32) -> Result<Vec<Deployment>> {
        let page: Page<Deployment> = self
            .get(
                "/deployments",
                &[("projects", project_id.to_string()), ("take", take.to_string())],
            )
            .await?;
        Ok(page.items)
    }

    pub async fn create_deployment(&self, request: &CreateDeployment) -> Result<CreatedDeployment> {
        self.post("/deployments", request).await
    }
}

async fn decode<T: DeserializeOwned>(
    method: &'static str,
    path: &str,
    resp: reqwest::Response,
) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            method,
            path: path.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        path: path.to_string(),
        source,
    })
}
