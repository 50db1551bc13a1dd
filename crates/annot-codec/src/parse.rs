//! Parsing and serialization of the annotation buffer wire format
//!
//! The format is a newline-separated, INI-like text. A line matching
//! `[<name>]` opens a section; `<GroupName><Kind><Index>` names an entry,
//! `<GroupName>AnnotationHeader` names the header, and anything else is
//! preserved as an opaque section. Lines between brackets are `key=value`
//! pairs belonging to the open section.
//!
//! Decoding is lenient about header counts: stored `TotalAnnotations` /
//! `NoOf*` values are kept as plain properties and never reconciled here.
//! [`validate`] performs the strict reconciliation for callers that want it;
//! [`serialize`] always recomputes the counts from the surviving entries.

use lazy_static::lazy_static;
use regex::Regex;

use crate::buffer::{AnnotationBuffer, Entry, EntryKind, Header, Section};
use crate::error::CodecError;

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(r"^\[(.+)AnnotationHeader\]$").unwrap();
    static ref ENTRY_RE: Regex =
        Regex::new(r"^\[(.*?)(Line|Box|Hyperlink|TextStamp|Highlight|FreeHand)(\d+)\]$").unwrap();
}

/// Count keys recomputed on serialization.
fn is_count_key(key: &str) -> bool {
    key == "TotalAnnotations" || EntryKind::ALL.iter().any(|k| k.count_key() == key)
}

enum OpenSection {
    None,
    Header(Header),
    Entry(Entry),
    Opaque(Vec<String>),
}

/// Decode a raw annotation buffer into its ordered section list.
pub fn parse(raw: &str) -> Result<AnnotationBuffer, CodecError> {
    let mut sections = Vec::new();
    let mut open = OpenSection::None;

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            flush(&mut sections, std::mem::replace(&mut open, OpenSection::None));

            if let Some(caps) = HEADER_RE.captures(trimmed) {
                open = OpenSection::Header(Header {
                    group: caps[1].to_string(),
                    props: Vec::new(),
                });
            } else if let Some(caps) = ENTRY_RE.captures(trimmed) {
                let kind = EntryKind::from_token(&caps[2])
                    .ok_or_else(|| CodecError::MalformedBuffer(trimmed.to_string()))?;
                let index: u32 = caps[3]
                    .parse()
                    .map_err(|_| CodecError::MalformedBuffer(trimmed.to_string()))?;
                open = OpenSection::Entry(Entry {
                    group: caps[1].to_string(),
                    kind,
                    index,
                    props: Vec::new(),
                });
            } else {
                open = OpenSection::Opaque(vec![line.to_string()]);
            }
            continue;
        }

        match &mut open {
            OpenSection::Header(h) => {
                if trimmed.is_empty() {
                    continue;
                }
                h.props.push(parse_kv(trimmed)?);
            }
            OpenSection::Entry(e) => {
                if trimmed.is_empty() {
                    continue;
                }
                e.props.push(parse_kv(trimmed)?);
            }
            OpenSection::Opaque(lines) => lines.push(line.to_string()),
            // Dangling text before the first bracket is flushed as-is.
            OpenSection::None => open = OpenSection::Opaque(vec![line.to_string()]),
        }
    }

    flush(&mut sections, open);
    Ok(AnnotationBuffer { sections })
}

fn parse_kv(line: &str) -> Result<(String, String), CodecError> {
    match line.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CodecError::MalformedBuffer(format!(
            "expected key=value, got: {}",
            line
        ))),
    }
}

fn flush(sections: &mut Vec<Section>, open: OpenSection) {
    match open {
        OpenSection::None => {}
        OpenSection::Header(h) => sections.push(Section::Header(h)),
        OpenSection::Entry(e) => sections.push(Section::Entry(e)),
        OpenSection::Opaque(lines) => {
            let mut raw = lines.join("\n");
            raw.push('\n');
            sections.push(Section::Opaque { raw });
        }
    }
}

/// Re-emit a buffer in stored section order.
///
/// Header counts are recomputed from the entries actually present: stored
/// count keys keep their position with a corrected value, a missing
/// `TotalAnnotations` is appended, and per-kind keys are appended only when
/// that kind has surviving entries.
pub fn serialize(buffer: &AnnotationBuffer) -> String {
    let mut out = String::new();

    for section in &buffer.sections {
        match section {
            Section::Header(header) => {
                out.push_str(&format!("[{}]\n", header.section_name()));

                let mut emitted_total = false;
                let mut emitted_kinds = Vec::new();

                for (key, value) in &header.props {
                    if key == "TotalAnnotations" {
                        out.push_str(&format!("TotalAnnotations={}\n", buffer.entry_count()));
                        emitted_total = true;
                    } else if let Some(kind) =
                        EntryKind::ALL.iter().copied().find(|k| k.count_key() == key)
                    {
                        out.push_str(&format!("{}={}\n", key, buffer.count_of(kind)));
                        emitted_kinds.push(kind);
                    } else {
                        out.push_str(&format!("{}={}\n", key, value));
                    }
                }

                if !emitted_total {
                    out.push_str(&format!("TotalAnnotations={}\n", buffer.entry_count()));
                }
                for kind in EntryKind::ALL {
                    if !emitted_kinds.contains(&kind) && buffer.count_of(kind) > 0 {
                        out.push_str(&format!("{}={}\n", kind.count_key(), buffer.count_of(kind)));
                    }
                }
            }
            Section::Entry(entry) => {
                out.push_str(&format!("[{}]\n", entry.section_name()));
                for (key, value) in &entry.props {
                    out.push_str(&format!("{}={}\n", key, value));
                }
            }
            Section::Opaque { raw } => out.push_str(raw),
        }
    }

    out
}

/// Strict reconciliation of stored header counts against actual entries.
pub fn validate(buffer: &AnnotationBuffer) -> Result<(), CodecError> {
    let header = match buffer.header() {
        Some(h) => h,
        None => return Ok(()),
    };

    for (key, value) in &header.props {
        if !is_count_key(key) {
            continue;
        }
        let declared: u32 = value
            .parse()
            .map_err(|_| CodecError::MalformedBuffer(format!("{}={}", key, value)))?;

        let found = if key == "TotalAnnotations" {
            buffer.entry_count() as u32
        } else if let Some(kind) = EntryKind::ALL.iter().copied().find(|k| k.count_key() == key) {
            buffer.count_of(kind) as u32
        } else {
            continue;
        };

        if declared != found {
            return Err(CodecError::CountMismatch {
                key: key.clone(),
                declared,
                found,
            });
        }
    }

    Ok(())
}
