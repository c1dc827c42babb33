//! Attaches a pull request artifact link to an Azure DevOps work item.

use tracing::info;

use crate::devops::{self, LinkOutcome, OrgConnection};
use crate::error::Result;

/// Everything needed to link one work item to one pull request. Built
/// in-process per matched reference; fully determines both the data
/// provider query and the resulting artifact URL.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub org: OrgConnection,
    pub work_item_id: u64,
    /// Web host of the GitHub instance, e.g. "https://github.com".
    pub server_url: String,
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
}

impl LinkRequest {
    fn pr_url(&self) -> String {
        format!(
            "{}/{}/{}/pull/{}",
            self.server_url, self.owner, self.repo, self.pull_number
        )
    }
}

/// Artifact URI for a pull request link. The separator between the repo id
/// and the pull request number is a literal percent-encoded slash.
pub fn artifact_url(internal_repo_id: &str, pull_number: u64) -> String {
    format!(
        "vstfs:///GitHub/PullRequest/{}%2F{}",
        internal_repo_id, pull_number
    )
}

/// Link the work item to the pull request.
///
/// Connects, resolves the repository's internal id, then attempts the
/// relation add. A relation that already exists counts as success; every
/// other failure is classified and terminal for this attempt. The internal
/// id is resolved fresh on every call, nothing is cached between attempts.
pub async fn link_work_item(request: &LinkRequest) -> Result<LinkOutcome> {
    info!(
        work_item_id = request.work_item_id,
        pull_number = request.pull_number,
        "attempting to link work item to pull request"
    );

    let client = devops::connect(&request.org).await?;
    let internal_repo_id = client
        .resolve_repo_internal_id(request.work_item_id, &request.pr_url())
        .await?;
    let url = artifact_url(&internal_repo_id, request.pull_number);

    client
        .add_pull_request_link(request.work_item_id, &url, request.pull_number)
        .await
}
