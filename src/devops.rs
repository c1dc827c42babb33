//! Azure DevOps work item tracking client.
//!
//! Wraps the three calls the linker and validator need: the connection
//! handshake, fetching a work item, the contribution data-provider query
//! that resolves a GitHub repository's internal id, and the JSON-patch
//! relation add. Each call classifies its own failures into the crate
//! error taxonomy; raw transport errors do not cross this boundary.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
const WIT_API_VERSION: &str = "7.1";
const DATA_PROVIDER_API_VERSION: &str = "7.1-preview.1";
const GITHUB_LINK_DATA_PROVIDER: &str = "ms.vss-work-web.github-link-data-provider";
const REL_ARTIFACT_LINK: &str = "ArtifactLink";
const REL_NAME_GITHUB_PR: &str = "GitHub Pull Request";

/// Coordinates of one Azure DevOps organization plus the credential used
/// to talk to it.
#[derive(Debug, Clone)]
pub struct OrgConnection {
    pub organization: String,
    pub token: String,
    pub base_url: String,
}

impl OrgConnection {
    pub fn new(organization: &str, token: &str) -> Self {
        Self {
            organization: organization.to_string(),
            token: token.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the connection at a different host (on-prem servers, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn org_url(&self) -> String {
        format!("{}/{}", self.base_url, self.organization)
    }

    /// HTTP Basic credential with an empty username and the PAT as password.
    fn basic_auth(&self) -> Result<HeaderValue> {
        let encoded = BASE64.encode(format!(":{}", self.token));
        let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|_| Error::Connection("PAT is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// A work item as returned by the tracking API. Only the identity matters
/// to this crate; the field payload is passed through untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkItem {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Result of an attempt to attach a pull request link to a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The relation was created by this call.
    Linked,
    /// The relation was already present; treated as success.
    AlreadyLinked,
}

/// Client handle yielded by a successful [`connect`].
#[derive(Debug, Clone)]
pub struct WorkItemClient {
    http: reqwest::Client,
    org: OrgConnection,
}

/// Bootstrap a client for the organization and verify the connection with a
/// single handshake call. Any failure here, bad credential, unreachable
/// host or otherwise, is terminal for the invocation.
pub async fn connect(org: &OrgConnection) -> Result<WorkItemClient> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, org.basic_auth()?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Connection(e.to_string()))?;

    let url = format!(
        "{}/_apis/connectionData?api-version={}",
        org.org_url(),
        DATA_PROVIDER_API_VERSION
    );
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Connection(format!(
            "connection handshake returned {}",
            status
        )));
    }
    debug!(organization = %org.organization, "connected to Azure DevOps");

    Ok(WorkItemClient {
        http,
        org: org.clone(),
    })
}

impl WorkItemClient {
    /// Fetch a work item by numeric id.
    pub async fn work_item(&self, id: u64) -> Result<WorkItem> {
        let url = format!(
            "{}/_apis/wit/workitems/{}?api-version={}",
            self.org.org_url(),
            id,
            WIT_API_VERSION
        );
        let response = self.http.get(&url).send().await.map_err(|e| Error::Validation {
            id,
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = api_error_message(&body).unwrap_or(body);
            if status == StatusCode::NOT_FOUND || message.contains("does not exist") {
                return Err(Error::WorkItemNotFound(id));
            }
            return Err(Error::Validation { id, message });
        }

        let item: Option<WorkItem> = serde_json::from_str(&body).map_err(|e| Error::Validation {
            id,
            message: e.to_string(),
        })?;
        match item {
            Some(item) if item.id != 0 => Ok(item),
            _ => Err(Error::WorkItemNotFound(id)),
        }
    }

    /// Resolve the internal id Azure DevOps uses for the GitHub repository
    /// behind `pr_url`, via the contribution data-provider query.
    pub async fn resolve_repo_internal_id(
        &self,
        work_item_id: u64,
        pr_url: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/_apis/Contribution/dataProviders/query?api-version={}",
            self.org.org_url(),
            DATA_PROVIDER_API_VERSION
        );
        let request = serde_json::json!({
            "context": {
                "properties": {
                    "workItemId": work_item_id,
                    "urls": [pr_url]
                }
            },
            "contributionIds": [GITHUB_LINK_DATA_PROVIDER]
        });

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Resolution(format!("data provider query failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authorization(
                "linking pull requests requires full access for the PAT".to_string(),
            ));
        }
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Resolution(format!(
                "data provider query returned {}: {}",
                status, body
            )));
        }

        let parsed: DataProviderResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Resolution(format!("malformed data provider response: {}", e)))?;
        let internal_id = parsed
            .data
            .get(GITHUB_LINK_DATA_PROVIDER)
            .and_then(|provider| provider.resolved_link_items.first())
            .and_then(|item| item.repo_internal_id.clone());

        match internal_id {
            Some(id) if !id.is_empty() => {
                debug!(internal_repo_id = %id, "resolved internal repository id");
                Ok(id)
            }
            _ => Err(Error::Resolution(
                "data provider response carries no repository id".to_string(),
            )),
        }
    }

    /// Attach an artifact link for the pull request to the work item.
    ///
    /// Adding a relation that already exists is a no-op success, so repeated
    /// CI runs over the same commits stay green.
    pub async fn add_pull_request_link(
        &self,
        work_item_id: u64,
        artifact_url: &str,
        pull_number: u64,
    ) -> Result<LinkOutcome> {
        let url = format!(
            "{}/_apis/wit/workitems/{}?api-version={}&$expand=relations",
            self.org.org_url(),
            work_item_id,
            WIT_API_VERSION
        );
        let patch = serde_json::json!([{
            "op": "add",
            "path": "/relations/-",
            "value": {
                "rel": REL_ARTIFACT_LINK,
                "url": artifact_url,
                "attributes": {
                    "name": REL_NAME_GITHUB_PR,
                    "comment": format!("Pull Request {}", pull_number)
                }
            }
        }]);

        let response = self
            .http
            .patch(&url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json-patch+json"),
            )
            .json(&patch)
            .send()
            .await
            .map_err(|e| Error::LinkCreation(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(work_item_id, pull_number, "created pull request link");
            return Ok(LinkOutcome::Linked);
        }

        let body = response.text().await.unwrap_or_default();
        classify_relation_error(status, &body)
    }
}

/// Single classification point for relation-add failures.
///
/// The structured error body's `message` field is consulted first; the raw
/// body is only used when the response is not the usual JSON error shape.
fn classify_relation_error(status: StatusCode, body: &str) -> Result<LinkOutcome> {
    let message = api_error_message(body).unwrap_or_else(|| body.to_string());
    if message.contains("already exists") {
        info!("pull request link already exists");
        return Ok(LinkOutcome::AlreadyLinked);
    }
    Err(Error::LinkCreation(format!("{}: {}", status, message)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|e| e.message)
}

#[derive(Debug, Deserialize)]
struct DataProviderResponse {
    #[serde(default)]
    data: HashMap<String, ProviderData>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderData {
    #[serde(rename = "resolvedLinkItems", default)]
    resolved_link_items: Vec<ResolvedLinkItem>,
}

#[derive(Debug, Deserialize)]
struct ResolvedLinkItem {
    #[serde(rename = "repoInternalId", default)]
    repo_internal_id: Option<String>,
}
