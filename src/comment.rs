//! Pull request status comments.
//!
//! Each comment kind is addressed by a fixed marker substring so a re-run
//! updates the existing comment instead of stacking duplicates. Comments
//! are never deleted, a resolved failure is rewritten in place.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::github::GitHubClient;

/// Marker identifying the commit-compliance failure comment.
pub const COMMIT_FAILURE_MARKER: &str = ":x: There is at least one commit";

/// Marker and lead text of the pull-request-compliance failure comment.
pub const PR_FAILURE_TEXT: &str = ":x: This pull request is not linked to a work item.";

/// Lead text of the success comment that replaces a failure comment.
pub const PR_SUCCESS_TEXT: &str =
    ":white_check_mark: This pull request is now linked to a work item.";

pub fn commit_failure_body(short_sha: &str, pull_number: u64) -> String {
    format!(
        "{} ({}) in pull request #{} that is not linked to a work item. \
         Please update the commit message to include a work item reference (AB#xxx) \
         and re-run the failed job to continue. Any new commits to the pull request \
         will also re-run the job.",
        COMMIT_FAILURE_MARKER, short_sha, pull_number
    )
}

pub fn pr_failure_body() -> String {
    format!(
        "{} Please update the title or body to include a work item and re-run the \
         failed job to continue. Any new commits to the pull request will also \
         re-run the job.",
        PR_FAILURE_TEXT
    )
}

/// Provenance footer appended to every comment this crate writes.
pub fn run_footer(ctx: &Context, now: DateTime<Utc>) -> String {
    format!(
        "\n\n[View workflow run for details]({}) _(last ran: {})_",
        ctx.run_url(),
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Post the comment, or update the first existing comment containing
/// `marker` in place. Guarantees at most one status comment per marker.
pub async fn upsert(gh: &GitHubClient, ctx: &Context, body: &str, marker: &str) -> Result<()> {
    let combined = format!("{}{}", body, run_footer(ctx, Utc::now()));
    let comments = gh.list_comments(ctx.pull_number).await?;

    match find_marked(&comments, marker) {
        Some(id) => {
            debug!(comment_id = id, "updating existing status comment");
            gh.update_comment(id, &combined).await?;
        }
        None => {
            debug!("no status comment yet, creating one");
            gh.create_comment(ctx.pull_number, &combined).await?;
        }
    }
    Ok(())
}

/// Update the first comment containing `marker` to `body`, if one exists.
/// Returns whether an update happened; never creates a comment.
pub async fn update_if_present(
    gh: &GitHubClient,
    ctx: &Context,
    body: &str,
    marker: &str,
) -> Result<bool> {
    let comments = gh.list_comments(ctx.pull_number).await?;
    match find_marked(&comments, marker) {
        Some(id) => {
            let combined = format!("{}{}", body, run_footer(ctx, Utc::now()));
            debug!(comment_id = id, "rewriting status comment");
            gh.update_comment(id, &combined).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn find_marked(comments: &[crate::github::IssueComment], marker: &str) -> Option<u64> {
    comments
        .iter()
        .find(|c| c.body.as_deref().is_some_and(|b| b.contains(marker)))
        .map(|c| c.id)
}
