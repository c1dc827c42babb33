use clap::{Parser, Subcommand};

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(flatten)]
    pub inputs: Inputs,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the compliance checks against the current pull request event
    Check,

    /// Confirm that a work item exists in Azure DevOps
    ValidateWorkItem {
        /// Numeric work item id
        id: u64,
    },
}

/// Configuration inputs, mapped from the `INPUT_*` environment variables the
/// hosting CI sets for each declared action input.
#[derive(clap::Args, Debug, Default)]
pub struct Inputs {
    /// Check the pull request title and body for a work item reference
    #[clap(
        long,
        env = "INPUT_CHECK_PULL_REQUEST",
        action = clap::ArgAction::Set,
        value_parser = parse_input_flag,
        default_value_t = false
    )]
    pub check_pull_request: bool,

    /// Check every commit message in the pull request for a work item reference
    #[clap(
        long,
        env = "INPUT_CHECK_COMMITS",
        action = clap::ArgAction::Set,
        value_parser = parse_input_flag,
        default_value_t = false
    )]
    pub check_commits: bool,

    /// Fail the run when a commit lacks a work item reference
    #[clap(
        long,
        env = "INPUT_FAIL_IF_MISSING_WORKITEM_COMMIT_LINK",
        action = clap::ArgAction::Set,
        value_parser = parse_input_flag,
        default_value_t = false
    )]
    pub fail_if_missing_workitem_commit_link: bool,

    /// Link referenced work items to the pull request in Azure DevOps
    #[clap(
        long,
        env = "INPUT_LINK_COMMITS_TO_PULL_REQUEST",
        action = clap::ArgAction::Set,
        value_parser = parse_input_flag,
        default_value_t = false
    )]
    pub link_commits_to_pull_request: bool,

    /// Post or update a status comment on the pull request when a check fails
    #[clap(
        long,
        env = "INPUT_COMMENT_ON_FAILURE",
        action = clap::ArgAction::Set,
        value_parser = parse_input_flag,
        default_value_t = false
    )]
    pub comment_on_failure: bool,

    /// Azure DevOps personal access token
    #[clap(long, env = "INPUT_AZURE_DEVOPS_TOKEN", hide_env_values = true)]
    pub azure_devops_token: Option<String>,

    /// Azure DevOps organization name
    #[clap(long, env = "INPUT_AZURE_DEVOPS_ORGANIZATION")]
    pub azure_devops_organization: Option<String>,

    /// GitHub token used for API calls against the pull request
    #[clap(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

impl Inputs {
    pub fn github_token(&self) -> Result<&str> {
        require(self.github_token.as_deref(), "INPUT_GITHUB_TOKEN")
    }

    pub fn azure_devops_token(&self) -> Result<&str> {
        require(self.azure_devops_token.as_deref(), "INPUT_AZURE_DEVOPS_TOKEN")
    }

    pub fn azure_devops_organization(&self) -> Result<&str> {
        require(
            self.azure_devops_organization.as_deref(),
            "INPUT_AZURE_DEVOPS_ORGANIZATION",
        )
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::EnvVar(name.to_string())),
    }
}

/// Boolean inputs arrive as the literal strings the CI passes through; a
/// declared-but-unset input comes through as an empty string and counts
/// as off.
fn parse_input_flag(value: &str) -> std::result::Result<bool, String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("false") {
        return Ok(false);
    }
    if value.eq_ignore_ascii_case("true") {
        return Ok(true);
    }
    Err(format!("expected true or false, got {:?}", value))
}
