//! Annotation buffer codec
//!
//! Encode/decode for the order-sensitive, section-based text format the
//! document viewer uses to carry a page's visual annotations (lines, boxes,
//! hyperlinks, stamps, highlights, freehand marks).
//!
//! Three operations matter to callers:
//! - [`parse`] / [`serialize`]: decode to an ordered section list and re-emit
//!   it byte-for-byte, with header counts recomputed from the entries present
//! - [`filter`]: drop entries by predicate without ever leaving a stale count
//!   behind, collapsing to `None` when nothing survives
//! - [`build_hyperlink_buffer`]: generate the `ViewLinks` buffer for freshly
//!   computed hyperlink positions

pub mod buffer;
pub mod build;
pub mod error;
pub mod filter;
pub mod parse;

pub use buffer::{
    AnnotationBuffer, AnnotationGroup, Entry, EntryKind, Header, Section, VIEW_LINKS_GROUP,
};
pub use build::{build_hyperlink_buffer, build_hyperlink_group, time_order, HyperlinkSpec};
pub use error::CodecError;
pub use filter::{filter, filter_view_hyperlinks, is_view_hyperlink};
pub use parse::{parse, serialize, validate};
