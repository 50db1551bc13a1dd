//! Note compilation with timeout
//!
//! Typst compilation is CPU-bound and unbounded in the worst case, so it
//! runs on the blocking pool under a deadline.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::RenderError;
use crate::world::NoteWorld;

/// A rendered note PDF.
#[derive(Debug, Clone)]
pub struct RenderedNote {
    pub pdf: Vec<u8>,
    pub page_count: usize,
}

/// Compile `source` with `inputs` into a PDF, bounded by `timeout_ms`.
pub async fn render_note(
    source: String,
    inputs: HashMap<String, serde_json::Value>,
    timeout_ms: u64,
) -> Result<RenderedNote, RenderError> {
    let world = NoteWorld::new(source, inputs)?;

    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(move || {
            let warned = typst::compile(&world);
            warned.output.map_err(|diagnostics| {
                diagnostics
                    .iter()
                    .map(|d| d.message.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        }),
    )
    .await;

    let document = match result {
        Ok(Ok(Ok(document))) => document,
        Ok(Ok(Err(messages))) => return Err(RenderError::Compile(messages)),
        Ok(Err(join_error)) => return Err(RenderError::TaskPanic(join_error.to_string())),
        Err(_elapsed) => return Err(RenderError::Timeout(timeout_ms)),
    };

    debug!(pages = document.pages.len(), "note compiled");

    let pdf = typst_pdf::pdf(&document, &typst_pdf::PdfOptions::default())
        .map_err(|e| RenderError::PdfExport(format!("{:?}", e)))?;

    info!(
        pages = document.pages.len(),
        bytes = pdf.len(),
        "note PDF exported"
    );

    Ok(RenderedNote {
        pdf,
        page_count: document.pages.len(),
    })
}
