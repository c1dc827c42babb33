//! Pull request context derived from the hosting CI environment.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Everything the checks need to know about the triggering pull request
/// event, read once at startup.
#[derive(Debug, Clone)]
pub struct Context {
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
    /// Web host of the GitHub instance, e.g. "https://github.com".
    pub server_url: String,
    /// REST API base, e.g. "https://api.github.com".
    pub api_url: String,
    /// Identifier of the current workflow run, used in comment footers.
    pub run_id: String,
    /// Web URL of the repository, used to build the run link.
    pub repository_url: String,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestRef>,
    repository: Option<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    html_url: Option<String>,
}

impl Context {
    /// Build the context from the environment variables and event payload
    /// file the CI host provides.
    pub fn from_env() -> Result<Self> {
        let repository = env::var("GITHUB_REPOSITORY")
            .map_err(|_| Error::EnvVar("GITHUB_REPOSITORY".to_string()))?;
        let (owner, repo) = split_repository(&repository)?;

        let event_path = env::var("GITHUB_EVENT_PATH")
            .map_err(|_| Error::EnvVar("GITHUB_EVENT_PATH".to_string()))?;
        let payload = read_event(Path::new(&event_path))?;

        let server_url =
            env::var("GITHUB_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let api_url = env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let run_id = env::var("GITHUB_RUN_ID").unwrap_or_else(|_| "0".to_string());

        Self::from_parts(owner, repo, server_url, api_url, run_id, payload)
    }

    fn from_parts(
        owner: String,
        repo: String,
        server_url: String,
        api_url: String,
        run_id: String,
        payload: EventPayload,
    ) -> Result<Self> {
        let pull_number = payload
            .pull_request
            .map(|pr| pr.number)
            .ok_or(Error::NotAPullRequest)?;

        let repository_url = payload
            .repository
            .and_then(|r| r.html_url)
            .unwrap_or_else(|| format!("{}/{}/{}", server_url, owner, repo));

        Ok(Self {
            owner,
            repo,
            pull_number,
            server_url,
            api_url,
            run_id,
            repository_url,
        })
    }

    /// Web URL of the pull request, as used in the data provider query.
    pub fn pr_url(&self) -> String {
        format!(
            "{}/{}/{}/pull/{}",
            self.server_url, self.owner, self.repo, self.pull_number
        )
    }

    /// Web URL of the current workflow run.
    pub fn run_url(&self) -> String {
        format!("{}/actions/runs/{}", self.repository_url, self.run_id)
    }
}

fn read_event(path: &Path) -> Result<EventPayload> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn split_repository(repository: &str) -> Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::InvalidInput(format!(
            "GITHUB_REPOSITORY is not in owner/name form: {}",
            repository
        ))),
    }
}
