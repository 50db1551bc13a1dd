//! Document store and workflow engine clients
//!
//! Narrow interfaces over the two upstream systems the portal consumes:
//!
//! - [`DocumentStore`]: checkout/checkin/annotation operations against the
//!   document-management system, with a static status-code message table
//! - [`WorkflowEngine`]: session issuance and work-item attribute reads
//! - [`SessionCache`]: per-user TTL cache in front of the engine's connect
//!
//! Both interfaces are traits so the orchestrator and note builder can run
//! against scripted fakes in tests. All network calls carry bounded connect
//! and read timeouts.

pub mod client;
pub mod error;
pub mod session;
pub mod status;
pub mod types;
pub mod workflow;

pub use client::{DocumentStore, HttpDocumentStore};
pub use error::DocStoreError;
pub use session::SessionCache;
pub use status::{is_lock_conflict, status_message};
pub use types::{
    AddAnnotationOutcome, CheckinOutcome, CheckoutOutcome, DocStoreConfig, DocumentVersion,
    SessionId,
};
pub use workflow::{HttpWorkflowEngine, WorkflowConfig, WorkflowEngine};
