//! Generation of fresh hyperlink annotation buffers
//!
//! The field order inside each hyperlink section matches what the external
//! viewer writes itself; the viewer's parser is positional about the font
//! block, so the order is not negotiable.

use chrono::{DateTime, Utc};

use crate::buffer::AnnotationGroup;

/// Annotation color used for generated View links (viewer RGB integer).
const LINK_COLOR: u32 = 11_141_120;

/// One hyperlink to emit into a generated buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperlinkSpec {
    pub page_no: u32,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    /// Display name; the restore filter keys on `View`.
    pub name: String,
    pub url: String,
}

/// Format a timestamp in the viewer's `TimeOrder` form: `YYYY,MM,DD,HH,MM,SS`.
pub fn time_order(at: DateTime<Utc>) -> String {
    at.format("%Y,%m,%d,%H,%M,%S").to_string()
}

/// Emit a hyperlink-only annotation buffer for `group_name`.
pub fn build_hyperlink_buffer(
    group_name: &str,
    user_id: &str,
    links: &[HyperlinkSpec],
    at: DateTime<Utc>,
) -> String {
    let mut buffer = String::new();

    buffer.push_str(&format!("[{}AnnotationHeader]\n", group_name));
    buffer.push_str(&format!("TotalAnnotations={}\n", links.len()));
    buffer.push_str(&format!("NoOfHyperlinks={}\n", links.len()));

    let stamp = time_order(at);
    for (i, link) in links.iter().enumerate() {
        buffer.push_str(&format!("[{}Hyperlink{}]\n", group_name, i + 1));
        buffer.push_str(&format!("X1={}\n", link.x1));
        buffer.push_str(&format!("Y1={}\n", link.y1));
        buffer.push_str(&format!("X2={}\n", link.x2));
        buffer.push_str(&format!("Y2={}\n", link.y2));
        buffer.push_str(&format!("Color={}\n", LINK_COLOR));
        buffer.push_str(&format!("TimeOrder={}\n", stamp));
        buffer.push_str("MouseSensitivity=1\n");
        buffer.push_str(&format!("AnnotationGroupID={}\n", group_name));
        buffer.push_str(&format!("UserID={}\n", user_id));
        buffer.push_str("Rights=VM\n");
        buffer.push_str(&format!("HyperlinkName={}\n", link.name));
        buffer.push_str(&format!("HyperlinkURL={}\n", link.url));
        buffer.push_str("Height=-15\n");
        buffer.push_str("Width=0\n");
        buffer.push_str("Escapement=0\n");
        buffer.push_str("Orientation=0\n");
        buffer.push_str("Weight=400\n");
        buffer.push_str("Italic=0\n");
        buffer.push_str("Underlined=0\n");
        buffer.push_str("StrikeOut=0\n");
        buffer.push_str("CharSet=0\n");
        buffer.push_str("OutPrecision=0\n");
        buffer.push_str("ClipPrecision=0\n");
        buffer.push_str("Quality=1\n");
        buffer.push_str("PitchAndFamily=49\n");
        buffer.push_str("FontName=Arial\n");
        buffer.push_str(&format!("FontColor={}\n", LINK_COLOR));
    }

    buffer
}

/// Wrap a generated hyperlink buffer in a shared-access annotation group.
pub fn build_hyperlink_group(
    group_name: &str,
    user_id: &str,
    links: &[HyperlinkSpec],
    at: DateTime<Utc>,
) -> AnnotationGroup {
    AnnotationGroup {
        group_name: group_name.to_string(),
        annotation_type: "A".to_string(),
        page_no: "1".to_string(),
        access_type: "S".to_string(),
        buffer: build_hyperlink_buffer(group_name, user_id, links, at),
        owner: None,
        group_index: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{EntryKind, VIEW_LINKS_GROUP};
    use crate::parse::{parse, validate};
    use chrono::TimeZone;

    fn links() -> Vec<HyperlinkSpec> {
        vec![
            HyperlinkSpec {
                page_no: 1,
                x1: 675,
                y1: 336,
                x2: 715,
                y2: 351,
                name: "View".to_string(),
                url: "http://viewer/doc/101".to_string(),
            },
            HyperlinkSpec {
                page_no: 1,
                x1: 675,
                y1: 366,
                x2: 715,
                y2: 381,
                name: "View".to_string(),
                url: "http://viewer/doc/102".to_string(),
            },
        ]
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_time_order_format() {
        assert_eq!(time_order(at()), "2026,03,05,09,30,00");
    }

    #[test]
    fn test_built_buffer_parses_consistently() {
        let raw = build_hyperlink_buffer(VIEW_LINKS_GROUP, "system", &links(), at());
        let buffer = parse(&raw).unwrap();

        assert_eq!(buffer.entry_count(), 2);
        assert_eq!(buffer.count_of(EntryKind::Hyperlink), 2);
        assert!(validate(&buffer).is_ok());
    }

    #[test]
    fn test_built_sections_numbered_from_one() {
        let raw = build_hyperlink_buffer(VIEW_LINKS_GROUP, "system", &links(), at());
        assert!(raw.contains("[ViewLinksHyperlink1]\n"));
        assert!(raw.contains("[ViewLinksHyperlink2]\n"));
    }

    #[test]
    fn test_group_wrapper_is_shared_access() {
        let group = build_hyperlink_group(VIEW_LINKS_GROUP, "system", &links(), at());
        assert_eq!(group.access_type, "S");
        assert_eq!(group.annotation_type, "A");
        assert_eq!(group.group_name, VIEW_LINKS_GROUP);
    }
}
