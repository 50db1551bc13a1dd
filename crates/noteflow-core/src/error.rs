use std::path::PathBuf;

use thiserror::Error;

use docstore_client::DocStoreError;
use note_render::RenderError;

#[derive(Error, Debug)]
pub enum NoteFlowError {
    #[error("Content file not found: {0}")]
    ContentNotFound(PathBuf),

    #[error("Document lock conflict: still checked out after undo and retry")]
    LockConflict,

    #[error("Checkout rejected ({code}): {message}")]
    CheckoutRejected { code: i32, message: String },

    #[error("Checkin rejected ({code}): {message}")]
    CheckinRejected { code: i32, message: String },

    #[error("Work item attribute missing: {0}")]
    AttributeMissing(String),

    #[error("Invalid attribute value for {attribute}: {value}")]
    InvalidAttribute { attribute: String, value: String },

    #[error(transparent)]
    Store(#[from] DocStoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
