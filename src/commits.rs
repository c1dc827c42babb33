//! Commit compliance: every commit in the pull request must reference a
//! work item, and referenced work items are optionally linked to the PR.

use tracing::{debug, info, warn};

use crate::cli::Inputs;
use crate::comment;
use crate::context::Context;
use crate::devops::OrgConnection;
use crate::error::{Error, Result};
use crate::github::{GitHubClient, PrCommit};
use crate::linker::{self, LinkRequest};
use crate::{ci, refs};

/// Walk the pull request's commits in API order.
///
/// The first commit without a work item reference fails the check when the
/// fail flag is set; remaining commits are not evaluated. Link attempts for
/// referenced work items are reported individually and never abort the
/// loop.
pub async fn check_commits(
    gh: &GitHubClient,
    devops: Option<&OrgConnection>,
    ctx: &Context,
    inputs: &Inputs,
) -> Result<()> {
    let commits = gh.list_pull_request_commits(ctx.pull_number).await?;
    info!(count = commits.len(), "checking commits for work item references");

    for commit in &commits {
        let message = &commit.commit.message;
        debug!(sha = %commit.sha, "validating commit");

        let found: Vec<refs::WorkItemRef> = refs::find_all(message).collect();
        if found.is_empty() {
            if inputs.fail_if_missing_workitem_commit_link {
                return fail_unreferenced_commit(gh, ctx, inputs, commit).await;
            }
            debug!(sha = %commit.sha, "commit has no reference, continuing");
            continue;
        }

        if inputs.link_commits_to_pull_request {
            let org = devops.ok_or_else(|| {
                Error::EnvVar("INPUT_AZURE_DEVOPS_ORGANIZATION".to_string())
            })?;
            link_references(org, ctx, &found).await;
        }
    }

    info!("all commits reference a work item");
    Ok(())
}

async fn fail_unreferenced_commit(
    gh: &GitHubClient,
    ctx: &Context,
    inputs: &Inputs,
    commit: &PrCommit,
) -> Result<()> {
    let message = format!(
        "There is at least one commit ({}) in pull request #{} that is not linked to a work item",
        commit.short_sha(),
        ctx.pull_number
    );
    ci::error(&format!("Commit(s) not linked to work items: {}", message));

    if inputs.comment_on_failure {
        comment::upsert(
            gh,
            ctx,
            &comment::commit_failure_body(commit.short_sha(), ctx.pull_number),
            comment::COMMIT_FAILURE_MARKER,
        )
        .await?;
    }

    Err(Error::MissingReference(message))
}

/// Attempt one link per matched reference, duplicates included; each
/// attempt is idempotent on the Azure DevOps side.
async fn link_references(org: &OrgConnection, ctx: &Context, found: &[refs::WorkItemRef]) {
    for reference in found {
        let request = LinkRequest {
            org: org.clone(),
            work_item_id: reference.id,
            server_url: ctx.server_url.clone(),
            owner: ctx.owner.clone(),
            repo: ctx.repo.clone(),
            pull_number: ctx.pull_number,
        };

        match linker::link_work_item(&request).await {
            Ok(outcome) => {
                debug!(work_item_id = reference.id, ?outcome, "link attempt finished");
            }
            Err(err) => {
                warn!(work_item_id = reference.id, %err, "link attempt failed");
                ci::error(&format!(
                    "Failed to link work item {} to pull request #{}: {}",
                    reference.id, ctx.pull_number, err
                ));
            }
        }
    }
}
