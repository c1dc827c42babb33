use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed connection to Azure DevOps: {0}")]
    Connection(String),

    #[error("Missing authorization: {0}")]
    Authorization(String),

    #[error("Internal repository id could not be resolved: {0}")]
    Resolution(String),

    #[error("Failed to create work item link: {0}")]
    LinkCreation(String),

    #[error("Work item {0} does not exist in Azure DevOps")]
    WorkItemNotFound(u64),

    #[error("Failed to validate work item {id}: {message}")]
    Validation { id: u64, message: String },

    #[error("{0}")]
    MissingReference(String),

    #[error("This check can only be run on pull requests")]
    NotAPullRequest,

    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
