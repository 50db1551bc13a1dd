use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocStoreError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed with code {0}")]
    AuthFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
