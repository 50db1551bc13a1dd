//! PDF note assembly and publication
//!
//! Builds the consolidated note PDF (preserved note body, supporting-document
//! table, comment history), computes where the generated View hyperlinks must
//! land, and publishes the result: orchestrated checkout/checkin with View
//! filtering, then a fresh `ViewLinks` annotation group at the computed
//! positions.
//!
//! Rows whose display name starts with "notesheet" (case-insensitive) are
//! excluded from the table and the position list; the note must not link to
//! itself.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use annot_codec::{build_hyperlink_group, HyperlinkSpec, VIEW_LINKS_GROUP};
use docstore_client::{DocumentStore, SessionId, WorkflowEngine};
use note_render::{render_note, sanitize_body, NOTE_TEMPLATE};
use viewer_coords::{layout, GridCalibration, LayoutNode, ViewLinkPosition};

use crate::error::NoteFlowError;
use crate::orchestrator::Orchestrator;

const NOTESHEET_ORIGINAL_ATTR: &str = "notesheet_original";
const NOTESHEET_ATTR: &str = "notesheet";
const COMMENTS_ATTR: &str = "comments_history";
const ATTACHMENTS_ATTR: &str = "attachments";

/// One supporting document row rendered into the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportingDoc {
    pub name: String,
    pub document_id: String,
}

/// One entry of the work item's comment history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteComment {
    pub user_name: String,
    pub user_id: String,
    pub date_time: String,
    pub text: String,
    pub stage: String,
}

/// Addresses one work item in the workflow engine.
#[derive(Debug, Clone)]
pub struct WorkItemRef {
    pub process_instance_id: String,
    pub work_item_id: String,
}

/// `folder#version#document` triplet stored in work-item attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub folder_id: String,
    pub version: String,
    pub document_id: String,
}

/// Builder settings; geometry values feed the coordinate mapper.
#[derive(Debug, Clone)]
pub struct NoteBuilderConfig {
    /// Where rendered note PDFs are written.
    pub scratch_dir: PathBuf,
    /// Base URL the generated View hyperlinks point at.
    pub viewer_base_url: String,
    /// Fallback grid when no layout tree is available.
    pub calibration: GridCalibration,
    pub render_timeout_ms: u64,
    /// Render-space dots per point, for layout-tree extraction.
    pub dots_per_point: f64,
    /// Page height in points, for pagination.
    pub page_height_pts: f64,
}

impl Default for NoteBuilderConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("noteflow"),
            viewer_base_url: "http://localhost:8080/docs/viewer".to_string(),
            calibration: GridCalibration::default(),
            render_timeout_ms: 30_000,
            dots_per_point: 20.0,
            page_height_pts: 842.0,
        }
    }
}

/// A rendered note ready for publication.
#[derive(Debug, Clone)]
pub struct BuiltNote {
    pub pdf_path: PathBuf,
    pub page_count: usize,
    pub positions: Vec<ViewLinkPosition>,
}

/// Terminal result of a full build-and-publish run.
#[derive(Debug, Clone, Serialize)]
pub struct NoteOutcome {
    pub note_document_id: String,
    pub original_document_id: String,
    pub new_version: String,
    pub pdf_path: PathBuf,
    pub page_count: usize,
    pub annotations_restored: bool,
    pub view_hyperlinks_added: usize,
    pub view_positions: Vec<ViewLinkPosition>,
}

pub struct NoteBuilder {
    config: NoteBuilderConfig,
}

impl NoteBuilder {
    pub fn new(config: NoteBuilderConfig) -> Self {
        Self { config }
    }

    /// Render the note PDF and compute one View position per kept row.
    ///
    /// Positions come from the layout tree when one is supplied and resolves
    /// every `view-<i>` anchor; otherwise the fixed-grid calibration applies.
    pub async fn build(
        &self,
        body: &str,
        documents: &[SupportingDoc],
        comments: &[NoteComment],
        layout_tree: Option<&LayoutNode>,
    ) -> Result<BuiltNote, NoteFlowError> {
        let rows: Vec<&SupportingDoc> = documents
            .iter()
            .filter(|d| !d.name.to_lowercase().starts_with("notesheet"))
            .collect();
        let doc_ids: Vec<String> = rows.iter().map(|d| d.document_id.clone()).collect();

        let mut inputs = HashMap::new();
        inputs.insert("body".to_string(), json!(sanitize_body(body)));
        inputs.insert(
            "documents".to_string(),
            Value::Array(
                rows.iter()
                    .enumerate()
                    .map(|(i, d)| json!({"sno": i + 1, "name": d.name, "id": d.document_id}))
                    .collect(),
            ),
        );
        inputs.insert(
            "comments".to_string(),
            Value::Array(
                comments
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        json!({
                            "sno": i + 1,
                            "user": c.user_name,
                            "date": c.date_time,
                            "text": c.text,
                            "stage": c.stage,
                        })
                    })
                    .collect(),
            ),
        );

        let rendered = render_note(
            NOTE_TEMPLATE.to_string(),
            inputs,
            self.config.render_timeout_ms,
        )
        .await?;

        std::fs::create_dir_all(&self.config.scratch_dir)?;
        let pdf_path = self
            .config
            .scratch_dir
            .join(format!("note-{}.pdf", Uuid::new_v4()));
        std::fs::write(&pdf_path, &rendered.pdf)?;

        let page_count = match lopdf::Document::load(&pdf_path) {
            Ok(doc) => doc.get_pages().len(),
            Err(err) => {
                warn!(%err, "could not re-read rendered PDF, trusting renderer page count");
                rendered.page_count
            }
        };

        let positions = self.positions_for(&doc_ids, layout_tree);
        info!(
            path = %pdf_path.display(),
            pages = page_count,
            rows = positions.len(),
            "note PDF built"
        );

        Ok(BuiltNote {
            pdf_path,
            page_count,
            positions,
        })
    }

    fn positions_for(
        &self,
        doc_ids: &[String],
        layout_tree: Option<&LayoutNode>,
    ) -> Vec<ViewLinkPosition> {
        if let Some(root) = layout_tree {
            match layout::extract_view_positions(
                root,
                doc_ids,
                self.config.dots_per_point,
                self.config.page_height_pts,
            ) {
                Ok(positions) => return positions,
                Err(err) => {
                    warn!(%err, "layout tree lookup failed, using fixed-grid fallback");
                }
            }
        }
        self.config.calibration.positions_for_rows(doc_ids)
    }

    /// Resolve the work item's documents, build the note, and publish it.
    pub async fn build_and_publish<S, W>(
        &self,
        store: &S,
        engine: &W,
        orchestrator: &Orchestrator,
        work_item: &WorkItemRef,
        session: SessionId,
    ) -> Result<NoteOutcome, NoteFlowError>
    where
        S: DocumentStore,
        W: WorkflowEngine,
    {
        info!(
            process = %work_item.process_instance_id,
            item = %work_item.work_item_id,
            "building PDF note"
        );

        let attributes = engine
            .fetch_work_item_attributes(
                &work_item.process_instance_id,
                &work_item.work_item_id,
                session,
            )
            .await?;
        let attrs = attributes_node(&attributes);

        let original_ref = document_ref_attribute(attrs, NOTESHEET_ORIGINAL_ATTR)?;
        let note_ref = document_ref_attribute(attrs, NOTESHEET_ATTR)?;

        let original_bytes = store
            .get_document(&original_ref.document_id, session)
            .await?;
        let body = String::from_utf8_lossy(&original_bytes).into_owned();

        let comments = extract_comments(attrs);
        let documents = extract_supporting_docs(attrs);
        info!(
            documents = documents.len(),
            comments = comments.len(),
            "work item resolved"
        );

        let built = self.build(&body, &documents, &comments, None).await?;

        let run = orchestrator
            .run(store, &note_ref.document_id, &built.pdf_path, session, true)
            .await?;

        let mut view_hyperlinks_added = 0;
        if !built.positions.is_empty() {
            let base = self.config.viewer_base_url.trim_end_matches('/');
            let links: Vec<HyperlinkSpec> = built
                .positions
                .iter()
                .map(|p| HyperlinkSpec {
                    page_no: p.page_no,
                    x1: p.x1,
                    y1: p.y1,
                    x2: p.x2,
                    y2: p.y2,
                    name: "View".to_string(),
                    url: format!("{}/{}", base, p.document_id),
                })
                .collect();

            let group = build_hyperlink_group(VIEW_LINKS_GROUP, "system", &links, Utc::now());
            match store
                .add_annotation(&note_ref.document_id, &group, session)
                .await
            {
                Ok(outcome) if outcome.status == 0 => {
                    view_hyperlinks_added = links.len();
                    info!(count = links.len(), "view hyperlinks added");
                }
                Ok(outcome) => {
                    warn!(code = outcome.status, "view hyperlink group rejected");
                }
                Err(err) => warn!(%err, "view hyperlink group write failed"),
            }
        }

        Ok(NoteOutcome {
            note_document_id: note_ref.document_id,
            original_document_id: original_ref.document_id,
            new_version: run.new_version,
            pdf_path: built.pdf_path,
            page_count: built.page_count,
            annotations_restored: run.annotations_restored,
            view_hyperlinks_added,
            view_positions: built.positions,
        })
    }
}

/// The engine nests attributes under an `Attributes` node, except when it
/// doesn't; accept both.
fn attributes_node(value: &Value) -> &Value {
    value.get("Attributes").unwrap_or(value)
}

/// Attribute values arrive as plain text, as `{"": "text"}`, or under a
/// `content` key depending on the engine's serializer mood.
fn attribute_text(attrs: &Value, key: &str) -> Option<String> {
    let node = attrs.get(key).or_else(|| {
        attrs
            .as_object()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })?;
    node_text(node)
}

fn node_text(node: &Value) -> Option<String> {
    let direct = match node {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("")
            .or_else(|| map.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    direct.filter(|s| !s.is_empty() && s != "null")
}

fn document_ref_attribute(attrs: &Value, key: &str) -> Result<DocumentRef, NoteFlowError> {
    let value =
        attribute_text(attrs, key).ok_or_else(|| NoteFlowError::AttributeMissing(key.to_string()))?;
    parse_document_ref(key, &value)
}

/// Parse a `folder#version#document` triplet.
fn parse_document_ref(attribute: &str, value: &str) -> Result<DocumentRef, NoteFlowError> {
    let parts: Vec<&str> = value.split('#').collect();
    if parts.len() < 3 || parts[2].is_empty() {
        return Err(NoteFlowError::InvalidAttribute {
            attribute: attribute.to_string(),
            value: value.to_string(),
        });
    }
    Ok(DocumentRef {
        folder_id: parts[0].to_string(),
        version: parts[1].to_string(),
        document_id: parts[2].to_string(),
    })
}

fn field_text(node: &Value, key: &str) -> String {
    node.get(key).and_then(node_text).unwrap_or_default()
}

/// Comment history rows from the work item attributes, in stored order.
fn extract_comments(attrs: &Value) -> Vec<NoteComment> {
    let history = match attrs.get(COMMENTS_ATTR) {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => return Vec::new(),
    };

    history
        .iter()
        .map(|item| NoteComment {
            user_name: field_text(item, "username"),
            user_id: field_text(item, "userid"),
            date_time: field_text(item, "datetime"),
            text: field_text(item, "comments"),
            stage: field_text(item, "stagename"),
        })
        .collect()
}

/// Supporting-document rows from the work item attributes.
fn extract_supporting_docs(attrs: &Value) -> Vec<SupportingDoc> {
    let items = match attrs.get(ATTACHMENTS_ATTR) {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| {
            let document_id = field_text(item, "documentIndex");
            if document_id.is_empty() {
                return None;
            }
            Some(SupportingDoc {
                name: field_text(item, "documentName"),
                document_id,
            })
        })
        .collect()
}
