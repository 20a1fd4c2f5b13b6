use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the session client for a single request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The platform refused the credential (401/403).
    #[error("authentication rejected (HTTP {status}); refresh the cookie in your config")]
    Auth { status: u16 },

    /// Network-level trouble or a retryable status (408, 429, 5xx).
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other non-success status. Retrying will not help.
    #[error("request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("invalid client setup: {0}")]
    Setup(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The platform answered but its envelope reported a failure.
    #[error("platform error: {0}")]
    Platform(String),

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid classroom {classroom_id}: {reason}")]
    InvalidClassroom { classroom_id: u64, reason: String },

    #[error("authentication rejected while listing videos (HTTP {status}); refresh the cookie in your config")]
    Auth { status: u16 },

    #[error("transport error while listing videos: {0}")]
    Transport(String),

    #[error("platform error while listing videos: {0}")]
    Platform(String),

    #[error("could not parse catalog response: {0}")]
    Malformed(String),
}

impl From<ApiError> for CatalogError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Client(ClientError::Auth { status }) => CatalogError::Auth { status },
            ApiError::Client(ClientError::Transport(msg)) => CatalogError::Transport(msg),
            ApiError::Client(ClientError::Rejected { status, body }) => {
                CatalogError::Platform(format!("HTTP {status}: {body}"))
            }
            ApiError::Client(ClientError::Decode(msg)) | ApiError::Malformed(msg) => {
                CatalogError::Malformed(msg)
            }
            ApiError::Client(ClientError::Setup(msg)) | ApiError::Platform(msg) => {
                CatalogError::Platform(msg)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no Firefox profile with a cookie store found under {0}")]
    NoProfile(PathBuf),

    #[error("no cookies for {domain} in {path}; log in with Firefox first")]
    NoCookies { domain: String, path: PathBuf },

    #[error("cookie store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("cookie store path {0} cannot be opened as a file URI")]
    StorePath(PathBuf),

    #[error("cookie lookup task failed: {0}")]
    Join(String),

    #[error("could not determine home directory")]
    NoHome,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("no config file found (looked in {0:?})")]
    NotFound(Vec<PathBuf>),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to launch ffprobe: {0}")]
    Launch(#[from] std::io::Error),

    #[error("ffprobe exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("could not read duration from ffprobe output: {0}")]
    Parse(String),

    #[error("duration probing is disabled")]
    Disabled,
}

/// Failures that stop a run before any video is played.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl RunError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            RunError::Client(ClientError::Auth { .. }) | RunError::Catalog(CatalogError::Auth { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(ClientError::Transport("reset".into()).is_retryable());
        assert!(!ClientError::Auth { status: 401 }.is_retryable());
        assert!(!ClientError::Rejected { status: 404, body: String::new() }.is_retryable());
        assert!(!ClientError::Decode("eof".into()).is_retryable());
    }

    #[test]
    fn test_auth_failures_keep_their_kind_in_the_catalog() {
        let err: CatalogError = ApiError::Client(ClientError::Auth { status: 403 }).into();
        assert!(matches!(err, CatalogError::Auth { status: 403 }));
        assert!(err.to_string().contains("refresh the cookie"));
    }
}
