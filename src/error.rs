use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the credentials file. Always fatal for the front-ends.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("chat service returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no conversation in progress; call new_conversation first")]
    NoConversation,
    #[error("failed to read upload file '{}': {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid endpoint template '{template}': {source}")]
    Endpoint {
        template: String,
        #[source]
        source: minijinja::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please start an analysis first by uploading a file and pressing 'Start Analysis'.")]
    NotStarted,
    #[error("an analysis is already in progress")]
    AlreadyStarted,
    #[error("Error uploading file: {0}")]
    Upload(#[source] ClientError),
    #[error(transparent)]
    Client(#[from] ClientError),
}
