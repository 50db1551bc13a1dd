//! Entry filtering and View-hyperlink removal
//!
//! Filtering is the operation the restore path depends on: dropping entries
//! must leave the header counts consistent, and a group whose buffer filters
//! down to nothing must disappear entirely rather than round-trip as a
//! zero-count husk the viewer chokes on.

use tracing::warn;

use crate::buffer::{AnnotationBuffer, AnnotationGroup, Entry, EntryKind, Section, VIEW_LINKS_GROUP};
use crate::parse::{parse, serialize};

/// Remove entries failing `keep`. Returns `None` when no entry survives
/// (the empty-group sentinel; the caller drops the group).
///
/// Surviving entries are renumbered per kind from 1 so the regenerated
/// section names stay sequential. Filtering an already-filtered buffer by
/// the same predicate yields an identical result.
pub fn filter<F>(buffer: &AnnotationBuffer, keep: F) -> Option<AnnotationBuffer>
where
    F: Fn(&Entry) -> bool,
{
    let mut next_index: std::collections::HashMap<(String, EntryKind), u32> =
        std::collections::HashMap::new();
    let mut sections = Vec::new();
    let mut survivors = 0usize;

    for section in &buffer.sections {
        match section {
            Section::Entry(entry) => {
                if keep(entry) {
                    let slot = next_index
                        .entry((entry.group.clone(), entry.kind))
                        .or_insert(0);
                    *slot += 1;
                    let mut renumbered = entry.clone();
                    renumbered.index = *slot;
                    sections.push(Section::Entry(renumbered));
                    survivors += 1;
                }
            }
            other => sections.push(other.clone()),
        }
    }

    if survivors == 0 {
        return None;
    }
    Some(AnnotationBuffer { sections })
}

/// True for hyperlink entries the note builder generates (`HyperlinkName=View`).
pub fn is_view_hyperlink(entry: &Entry) -> bool {
    entry.kind == EntryKind::Hyperlink && entry.prop("HyperlinkName") == Some("View")
}

/// Strip View hyperlinks from a set of annotation groups before restore.
///
/// The reserved `ViewLinks` group is dropped outright; other groups have
/// their View hyperlink entries filtered out, and disappear when nothing
/// survives. A group whose buffer fails to parse is kept unchanged.
pub fn filter_view_hyperlinks(groups: &[AnnotationGroup]) -> Vec<AnnotationGroup> {
    let mut kept = Vec::new();

    for group in groups {
        if group.group_name == VIEW_LINKS_GROUP {
            continue;
        }

        // Cheap pre-check: untouched groups pass through byte-identical.
        if !group.buffer.contains("HyperlinkName=View") {
            kept.push(group.clone());
            continue;
        }

        let buffer = match parse(&group.buffer) {
            Ok(b) => b,
            Err(err) => {
                warn!(group = %group.group_name, %err, "unparseable buffer left unfiltered");
                kept.push(group.clone());
                continue;
            }
        };

        match filter(&buffer, |e| !is_view_hyperlink(e)) {
            Some(filtered) => {
                let mut updated = group.clone();
                updated.buffer = serialize(&filtered);
                kept.push(updated);
            }
            None => {}
        }
    }

    kept
}
