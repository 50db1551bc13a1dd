use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    #[error("Header count mismatch for {key}: declared {declared}, found {found}")]
    CountMismatch {
        key: String,
        declared: u32,
        found: u32,
    },
}
