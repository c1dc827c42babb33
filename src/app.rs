use tracing::{error, info};

use crate::cli::{Args, Command, Inputs};
use crate::context::Context;
use crate::devops::OrgConnection;
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::{ci, commits, pull_request, validator};

/// Overall result of a run, carried to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
}

/// Main application entry point
pub async fn run(args: Args) -> Result<RunStatus> {
    match args.command {
        Some(Command::ValidateWorkItem { id }) => validate(&args.inputs, id).await,
        Some(Command::Check) | None => check(&args.inputs).await,
    }
}

/// Run the enabled compliance checks against the current pull request.
///
/// The commit branch and the PR branch are independent: a compliance
/// failure in one is reported and remembered, and the other still runs.
/// Anything other than a compliance failure aborts the run and surfaces
/// through the top-level unknown-error path.
async fn check(inputs: &Inputs) -> Result<RunStatus> {
    let ctx = Context::from_env()?;
    info!(
        owner = %ctx.owner,
        repo = %ctx.repo,
        pull_number = ctx.pull_number,
        "starting compliance checks"
    );

    let gh = GitHubClient::new(&ctx.api_url, &ctx.owner, &ctx.repo, inputs.github_token()?)?;
    let devops = if inputs.link_commits_to_pull_request {
        Some(OrgConnection::new(
            inputs.azure_devops_organization()?,
            inputs.azure_devops_token()?,
        ))
    } else {
        None
    };

    let mut status = RunStatus::Success;

    if inputs.check_commits {
        match commits::check_commits(&gh, devops.as_ref(), &ctx, inputs).await {
            Ok(()) => {}
            Err(Error::MissingReference(message)) => {
                error!(%message, "commit check failed");
                status = RunStatus::Failed;
            }
            Err(other) => return Err(other),
        }
    }

    if inputs.check_pull_request {
        match pull_request::check_pull_request(&gh, &ctx, inputs).await {
            Ok(()) => {}
            Err(Error::MissingReference(message)) => {
                error!(%message, "pull request check failed");
                status = RunStatus::Failed;
            }
            Err(other) => return Err(other),
        }
    }

    Ok(status)
}

/// Confirm a work item exists; classified failures are reported and turn
/// into a failed run rather than propagating.
async fn validate(inputs: &Inputs, id: u64) -> Result<RunStatus> {
    let org = OrgConnection::new(
        inputs.azure_devops_organization()?,
        inputs.azure_devops_token()?,
    );

    match validator::validate_work_item(&org, id).await {
        Ok(_) => Ok(RunStatus::Success),
        Err(err) => {
            error!(%err, "work item validation failed");
            ci::error(&err.to_string());
            Ok(RunStatus::Failed)
        }
    }
}
