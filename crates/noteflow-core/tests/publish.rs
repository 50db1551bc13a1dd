//! End-to-end note publication against scripted collaborators
//!
//! Drives the full flow: work-item resolution, note rendering, the
//! checkout/checkin orchestration with View filtering, and the ViewLinks
//! group write. Everything network-shaped is faked; the render is real.

use std::sync::Mutex;

use serde_json::{json, Value};

use annot_codec::{parse, AnnotationGroup, EntryKind, VIEW_LINKS_GROUP};
use docstore_client::{
    AddAnnotationOutcome, CheckinOutcome, CheckoutOutcome, DocStoreError, DocumentStore, SessionId,
    WorkflowEngine,
};
use noteflow_core::{NoteBuilder, NoteBuilderConfig, Orchestrator, WorkItemRef};

struct FakeStore {
    annotations: Vec<AnnotationGroup>,
    added: Mutex<Vec<(String, AnnotationGroup)>>,
    checked_in: Mutex<Vec<String>>,
}

impl FakeStore {
    fn new(annotations: Vec<AnnotationGroup>) -> Self {
        Self {
            annotations,
            added: Mutex::new(Vec::new()),
            checked_in: Mutex::new(Vec::new()),
        }
    }
}

impl DocumentStore for FakeStore {
    async fn checkout(
        &self,
        _document_id: &str,
        _session: SessionId,
    ) -> Result<CheckoutOutcome, DocStoreError> {
        Ok(CheckoutOutcome {
            status: 0,
            volume_id: "1".to_string(),
            site_id: "1".to_string(),
            version: "6".to_string(),
        })
    }

    async fn undo_checkout(
        &self,
        _document_id: &str,
        _session: SessionId,
    ) -> Result<i32, DocStoreError> {
        Ok(0)
    }

    async fn checkin(
        &self,
        document_id: &str,
        content: Vec<u8>,
        _volume_id: &str,
        _site_id: &str,
        _session: SessionId,
    ) -> Result<CheckinOutcome, DocStoreError> {
        assert!(content.starts_with(b"%PDF"), "checked-in content is a PDF");
        self.checked_in.lock().unwrap().push(document_id.to_string());
        Ok(CheckinOutcome {
            status: 0,
            new_version: "7".to_string(),
        })
    }

    async fn get_annotations(
        &self,
        _document_id: &str,
        _session: SessionId,
    ) -> Result<Vec<AnnotationGroup>, DocStoreError> {
        Ok(self.annotations.clone())
    }

    async fn add_annotation(
        &self,
        document_id: &str,
        group: &AnnotationGroup,
        _session: SessionId,
    ) -> Result<AddAnnotationOutcome, DocStoreError> {
        self.added
            .lock()
            .unwrap()
            .push((document_id.to_string(), group.clone()));
        Ok(AddAnnotationOutcome { status: 0 })
    }

    async fn get_document(
        &self,
        _document_id: &str,
        _session: SessionId,
    ) -> Result<Vec<u8>, DocStoreError> {
        Ok(b"<p>Procurement note body<br>for approval</p>".to_vec())
    }
}

struct FakeEngine;

impl WorkflowEngine for FakeEngine {
    async fn connect(&self, _user: &str, _password: &str) -> Result<SessionId, DocStoreError> {
        Ok(42)
    }

    async fn disconnect(&self, _session: SessionId) -> Result<(), DocStoreError> {
        Ok(())
    }

    async fn fetch_work_item_attributes(
        &self,
        _process_instance_id: &str,
        _work_item_id: &str,
        _session: SessionId,
    ) -> Result<Value, DocStoreError> {
        Ok(json!({
            "Attributes": {
                "notesheet_original": {"": "12#3#1601"},
                "notesheet": {"": "12#3#1591"},
                "comments_history": [
                    {"username": {"": "clerk"}, "datetime": {"": "2026-01-12 10:04"},
                     "comments": {"": "Forwarded for approval."}, "stagename": {"": "Review"}},
                ],
                "attachments": [
                    {"documentName": {"": "Notesheet Copy.pdf"}, "documentIndex": {"": "1600"}},
                    {"documentName": {"": "Purchase Order.pdf"}, "documentIndex": {"": "101"}},
                    {"documentName": {"": "Invoice.pdf"}, "documentIndex": {"": "102"}},
                ],
            }
        }))
    }
}

fn scratch_config() -> NoteBuilderConfig {
    NoteBuilderConfig {
        scratch_dir: std::env::temp_dir().join(format!("noteflow-e2e-{}", uuid::Uuid::new_v4())),
        ..NoteBuilderConfig::default()
    }
}

#[tokio::test]
async fn publish_builds_note_and_adds_view_links() {
    let stale_view_links = AnnotationGroup {
        group_name: VIEW_LINKS_GROUP.to_string(),
        annotation_type: "A".to_string(),
        page_no: "1".to_string(),
        access_type: "S".to_string(),
        buffer: "[ViewLinksAnnotationHeader]\nTotalAnnotations=1\nNoOfHyperlinks=1\n\
[ViewLinksHyperlink1]\nX1=1\nY1=1\nX2=2\nY2=2\nHyperlinkName=View\nHyperlinkURL=u\n"
            .to_string(),
        owner: None,
        group_index: None,
    };
    let user_group = AnnotationGroup {
        group_name: "supervisor".to_string(),
        annotation_type: "A".to_string(),
        page_no: "1".to_string(),
        access_type: "I".to_string(),
        buffer: "[supervisorAnnotationHeader]\nTotalAnnotations=1\nNoOfLines=1\n\
[supervisorLine1]\nX1=0\nY1=0\nX2=5\nY2=5\n"
            .to_string(),
        owner: None,
        group_index: None,
    };

    let store = FakeStore::new(vec![stale_view_links, user_group]);
    let engine = FakeEngine;
    let config = scratch_config();
    let backup_dir = config.scratch_dir.join("backups");
    let builder = NoteBuilder::new(config);
    let orchestrator = Orchestrator::new(&backup_dir);

    let work_item = WorkItemRef {
        process_instance_id: "PI-778".to_string(),
        work_item_id: "3".to_string(),
    };

    let outcome = builder
        .build_and_publish(&store, &engine, &orchestrator, &work_item, 42)
        .await
        .unwrap();

    assert_eq!(outcome.note_document_id, "1591");
    assert_eq!(outcome.original_document_id, "1601");
    assert_eq!(outcome.new_version, "7");
    assert!(outcome.annotations_restored);

    // The notesheet attachment is skipped; the two real rows get links.
    assert_eq!(outcome.view_positions.len(), 2);
    assert_eq!(outcome.view_hyperlinks_added, 2);
    assert_eq!(outcome.view_positions[0].document_id, "101");
    assert_eq!(outcome.view_positions[1].document_id, "102");

    // New content went to the note document.
    assert_eq!(*store.checked_in.lock().unwrap(), vec!["1591".to_string()]);

    let added = store.added.lock().unwrap();

    // Restore pushed only the user group; the stale ViewLinks group was
    // filtered, and a fresh one was written afterwards.
    let restored: Vec<&str> = added
        .iter()
        .map(|(_, g)| g.group_name.as_str())
        .collect();
    assert_eq!(restored, vec!["supervisor", VIEW_LINKS_GROUP]);

    let (_, fresh) = added.last().unwrap();
    let buffer = parse(&fresh.buffer).unwrap();
    assert_eq!(buffer.count_of(EntryKind::Hyperlink), 2);
    let first = buffer.entries().next().unwrap();
    assert_eq!(first.prop("HyperlinkName"), Some("View"));
    assert_eq!(first.prop("X1"), Some("675"));
    assert_eq!(first.prop("Y1"), Some("336"));
    assert!(first
        .prop("HyperlinkURL")
        .unwrap()
        .ends_with("/101"));

    let _ = std::fs::remove_dir_all(outcome.pdf_path.parent().unwrap());
}
