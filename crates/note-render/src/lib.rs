//! Note PDF rendering
//!
//! Compiles the generated note document (original body + supporting-document
//! table + comment history) to PDF with Typst, entirely in memory: a single
//! main source, embedded fonts, inputs through `sys.inputs`.

pub mod compile;
pub mod error;
pub mod template;
pub mod world;

pub use compile::{render_note, RenderedNote};
pub use error::RenderError;
pub use template::{sanitize_body, NOTE_TEMPLATE};
pub use world::NoteWorld;
