//! Core flows of the document-workflow portal
//!
//! Two entry points:
//! - [`Orchestrator::run`]: replace a document's content while preserving
//!   its annotations (backup -> unlock -> checkout -> checkin -> restore,
//!   with one bounded retry on lock conflict)
//! - [`NoteBuilder::build_and_publish`]: assemble the consolidated note PDF,
//!   compute View hyperlink positions, and publish through the orchestrator
//!
//! Both run against the `docstore-client` traits, so everything here is
//! testable without a live document store.

pub mod builder;
pub mod error;
pub mod orchestrator;

pub use builder::{
    BuiltNote, NoteBuilder, NoteBuilderConfig, NoteComment, NoteOutcome, SupportingDoc,
    WorkItemRef,
};
pub use error::NoteFlowError;
pub use orchestrator::{Orchestrator, RestoreFailure, RunOutcome};
