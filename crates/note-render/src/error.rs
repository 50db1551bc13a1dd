use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Render timeout after {0}ms")]
    Timeout(u64),

    #[error("Render task panicked: {0}")]
    TaskPanic(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("PDF export failed: {0}")]
    PdfExport(String),
}
