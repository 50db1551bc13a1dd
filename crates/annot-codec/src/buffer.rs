//! In-memory representation of the annotation buffer format
//!
//! A buffer is an ordered list of sections. Order is positionally meaningful
//! to the consuming viewer and must survive a parse/serialize round trip.

use serde::{Deserialize, Serialize};

/// Name of the system-generated group that holds View hyperlinks.
pub const VIEW_LINKS_GROUP: &str = "ViewLinks";

/// The annotation kinds the viewer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Line,
    Box,
    Hyperlink,
    TextStamp,
    Highlight,
    FreeHand,
}

impl EntryKind {
    pub const ALL: [EntryKind; 6] = [
        EntryKind::Line,
        EntryKind::Box,
        EntryKind::Hyperlink,
        EntryKind::TextStamp,
        EntryKind::Highlight,
        EntryKind::FreeHand,
    ];

    /// Section-name token, e.g. the `Hyperlink` in `[ViewLinksHyperlink1]`.
    pub fn token(self) -> &'static str {
        match self {
            EntryKind::Line => "Line",
            EntryKind::Box => "Box",
            EntryKind::Hyperlink => "Hyperlink",
            EntryKind::TextStamp => "TextStamp",
            EntryKind::Highlight => "Highlight",
            EntryKind::FreeHand => "FreeHand",
        }
    }

    /// Per-kind count key carried by the header section.
    pub fn count_key(self) -> &'static str {
        match self {
            EntryKind::Line => "NoOfLines",
            EntryKind::Box => "NoOfBoxes",
            EntryKind::Hyperlink => "NoOfHyperlinks",
            EntryKind::TextStamp => "NoOfTextStamps",
            EntryKind::Highlight => "NoOfHighlights",
            EntryKind::FreeHand => "NoOfFreeHands",
        }
    }

    pub fn from_token(token: &str) -> Option<EntryKind> {
        EntryKind::ALL.iter().copied().find(|k| k.token() == token)
    }
}

/// One annotation instance, e.g. `[MyGroupHyperlink2]` and its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub group: String,
    pub kind: EntryKind,
    /// 1-based index carried in the section name.
    pub index: u32,
    /// Property bag in stored order. Duplicate keys are preserved as-is.
    pub props: Vec<(String, String)>,
}

impl Entry {
    /// First value stored under `key`, if any.
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn section_name(&self) -> String {
        format!("{}{}{}", self.group, self.kind.token(), self.index)
    }
}

/// The `[<Group>AnnotationHeader]` section.
///
/// Count keys (`TotalAnnotations` and the per-kind `NoOf*` keys) are decoded
/// as plain properties; serialization recomputes their values from the
/// entries actually present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub group: String,
    pub props: Vec<(String, String)>,
}

impl Header {
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn section_name(&self) -> String {
        format!("{}AnnotationHeader", self.group)
    }
}

/// A single section of the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    Header(Header),
    Entry(Entry),
    /// Anything with an unrecognized bracket name, or dangling text with no
    /// bracket at all. Re-emitted verbatim.
    Opaque { raw: String },
}

/// An ordered sequence of sections decoded from one annotation buffer string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationBuffer {
    pub sections: Vec<Section>,
}

impl AnnotationBuffer {
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.sections.iter().filter_map(|s| match s {
            Section::Entry(e) => Some(e),
            _ => None,
        })
    }

    pub fn header(&self) -> Option<&Header> {
        self.sections.iter().find_map(|s| match s {
            Section::Header(h) => Some(h),
            _ => None,
        })
    }

    pub fn entry_count(&self) -> usize {
        self.entries().count()
    }

    pub fn count_of(&self, kind: EntryKind) -> usize {
        self.entries().filter(|e| e.kind == kind).count()
    }
}

/// A named, independently addressable annotation collection as the document
/// store hands it out. Field names follow the store's JSON payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationGroup {
    #[serde(rename = "AnnotGroupName")]
    pub group_name: String,

    #[serde(rename = "AnnotationType", default)]
    pub annotation_type: String,

    #[serde(rename = "PageNo", default = "default_page_no")]
    pub page_no: String,

    #[serde(rename = "AccessType", default = "default_access_type")]
    pub access_type: String,

    #[serde(rename = "AnnotationBuffer", default)]
    pub buffer: String,

    #[serde(rename = "Owner", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(rename = "AnnotGroupIndex", skip_serializing_if = "Option::is_none")]
    pub group_index: Option<String>,
}

fn default_page_no() -> String {
    "1".to_string()
}

fn default_access_type() -> String {
    "I".to_string()
}
