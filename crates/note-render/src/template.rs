//! Note document template and content sanitation
//!
//! The note source is one embedded Typst template: the preserved note body
//! first, then the supporting-documents table, then the comment history.
//! Everything variable arrives through `sys.inputs`, so untrusted strings
//! never splice into the template source itself.

use lazy_static::lazy_static;
use regex::Regex;

/// Typst source of the generated note document.
///
/// Inputs:
/// - `body`: sanitized text of the original note
/// - `documents`: array of `(sno, name, id)` dicts, one per supporting doc
/// - `comments`: array of `(sno, user, date, text, stage)` dicts
pub const NOTE_TEMPLATE: &str = r##"
#set page(paper: "a4", margin: (x: 1.5cm, y: 1.5cm))
#set text(size: 10pt)

#let body = sys.inputs.at("body", default: "")
#let documents = sys.inputs.at("documents", default: ())
#let comments = sys.inputs.at("comments", default: ())

#body

#if documents.len() > 0 [
  #v(1.2em)
  *Supporting Documents*
  #table(
    columns: (auto, 1fr, auto),
    inset: 6pt,
    stroke: 0.5pt,
    table.header([*S.No*], [*Document Name*], [*View*]),
    ..documents.map(d => (
      [#d.at("sno")],
      [#d.at("name")],
      [],
    )).flatten(),
  )
]

#if comments.len() > 0 [
  #v(1.2em)
  *Note Comments*
  #table(
    columns: (auto, 1fr, 1fr, 1fr),
    inset: 6pt,
    stroke: 0.5pt,
    table.header([*S.No*], [*User*], [*Date*], [*Stage*]),
    ..comments.map(c => (
      [#c.at("sno")],
      [#c.at("user")],
      [#c.at("date")],
      [#c.at("stage")],
    )).flatten(),
  )
  #for c in comments [
    #v(0.5em)
    #c.at("sno"). #c.at("text")
  ]
]
"##;

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref CDATA_RE: Regex = Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>").unwrap();
    static ref BREAK_RE: Regex = Regex::new(r"(?i)<(br|hr)\s*/?>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Reduce stored note markup to plain text safe for the template input.
///
/// The stored body is legacy markup; comments, CDATA blocks and tags are
/// stripped, line breaks survive, the common entities are decoded, and
/// control characters (other than newline and tab) are dropped.
pub fn sanitize_body(raw: &str) -> String {
    let text = COMMENT_RE.replace_all(raw, "");
    let text = CDATA_RE.replace_all(&text, "");
    let text = BREAK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&amp;", "&")
        .replace("&#38;", "&")
        .replace("&lt;", "<")
        .replace("&#60;", "<")
        .replace("&gt;", ">")
        .replace("&#62;", ">")
        .replace("&#34;", "\"")
        .replace("&#39;", "'");

    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
