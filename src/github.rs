//! GitHub REST API client for the pull request under check.
//!
//! Covers the handful of calls the compliance checks need: listing the PR's
//! commits, fetching the PR itself, and listing/creating/updating issue
//! comments. Listings are paginated and preserve API order.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

const PAGE_SIZE: usize = 100;

/// A commit as returned by the pull request commits listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PrCommit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
}

impl PrCommit {
    /// The 7-character short form of the commit hash.
    pub fn short_sha(&self) -> &str {
        &self.sha[..self.sha.len().min(7)]
    }
}

/// Title and body of a pull request. Both can be absent on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestView {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub body: Option<String>,
}

/// Client scoped to a single repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(api_base: &str, owner: &str, repo: &str, token: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| Error::InvalidInput("GitHub token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pr-worklink/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// List all commits of the pull request, in API order.
    pub async fn list_pull_request_commits(&self, pull_number: u64) -> Result<Vec<PrCommit>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/commits",
            self.api_base, self.owner, self.repo, pull_number
        );
        self.paginate(&url).await
    }

    /// Fetch the pull request's title and body.
    pub async fn pull_request(&self, pull_number: u64) -> Result<PullRequestView> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base, self.owner, self.repo, pull_number
        );
        let response = self.http.get(&url).send().await?;
        parse_response(response).await
    }

    /// List all issue comments on the pull request, in API order.
    pub async fn list_comments(&self, pull_number: u64) -> Result<Vec<IssueComment>> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, self.owner, self.repo, pull_number
        );
        self.paginate(&url).await
    }

    pub async fn create_comment(&self, pull_number: u64, body: &str) -> Result<IssueComment> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, self.owner, self.repo, pull_number
        );
        debug!(pull_number, "creating pull request comment");
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn update_comment(&self, comment_id: u64, body: &str) -> Result<IssueComment> {
        let url = format!(
            "{}/repos/{}/{}/issues/comments/{}",
            self.api_base, self.owner, self.repo, comment_id
        );
        debug!(comment_id, "updating pull request comment");
        let response = self
            .http
            .patch(&url)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        parse_response(response).await
    }

    async fn paginate<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .http
                .get(url)
                .query(&[("per_page", PAGE_SIZE as u32), ("page", page)])
                .send()
                .await?;
            let batch: Vec<T> = parse_response(response).await?;
            let batch_len = batch.len();
            items.extend(batch);
            if batch_len < PAGE_SIZE {
                return Ok(items);
            }
            page += 1;
        }
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::GitHub(format!("request failed with {}: {}", status, body)));
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&server.uri(), "octo", "demo", "gh-token").unwrap()
    }

    fn commit_json(sha: &str, message: &str) -> serde_json::Value {
        serde_json::json!({ "sha": sha, "commit": { "message": message } })
    }

    #[tokio::test]
    async fn list_commits_walks_pages() {
        let server = MockServer::start().await;

        let first_page: Vec<serde_json::Value> = (0..100)
            .map(|i| commit_json(&format!("{:040}", i), "AB#1 work"))
            .collect();
        let second_page = vec![commit_json(&"f".repeat(40), "AB#2 more work")];

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/pulls/7/commits"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&first_page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/pulls/7/commits"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&second_page))
            .mount(&server)
            .await;

        let commits = test_client(&server)
            .list_pull_request_commits(7)
            .await
            .unwrap();
        assert_eq!(commits.len(), 101);
        assert_eq!(commits[100].commit.message, "AB#2 more work");
    }

    #[tokio::test]
    async fn pull_request_tolerates_null_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/pulls/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Fix bug",
                "body": null
            })))
            .mount(&server)
            .await;

        let pr = test_client(&server).pull_request(3).await.unwrap();
        assert_eq!(pr.title.as_deref(), Some("Fix bug"));
        assert!(pr.body.is_none());
    }

    #[tokio::test]
    async fn create_comment_posts_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues/3/comments"))
            .and(body_json(serde_json::json!({ "body": "hello" })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "id": 10, "body": "hello" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let comment = test_client(&server).create_comment(3, "hello").await.unwrap();
        assert_eq!(comment.id, 10);
    }

    #[tokio::test]
    async fn update_comment_patches_by_id() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/repos/octo/demo/issues/comments/10"))
            .and(body_json(serde_json::json!({ "body": "revised" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": 10, "body": "revised" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let comment = test_client(&server).update_comment(10, "revised").await.unwrap();
        assert_eq!(comment.body.as_deref(), Some("revised"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/pulls/3"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let err = test_client(&server).pull_request(3).await.unwrap_err();
        assert!(matches!(err, Error::GitHub(ref msg) if msg.contains("404")));
    }

    #[test]
    fn test_short_sha() {
        let commit = PrCommit {
            sha: "0123456789abcdef".to_string(),
            commit: CommitDetail {
                message: String::new(),
            },
        };
        assert_eq!(commit.short_sha(), "0123456");
    }
}
