//! Checkout/checkin orchestration with annotation preservation
//!
//! Replacing a document's content in the store silently discards its
//! annotations, so the sequence is: snapshot annotations, force-release any
//! stale lock, take the lock, upload the new content, push the annotations
//! back. The run moves through explicit states; callers only ever observe
//! the terminal outcome.
//!
//! Lock conflicts on checkout get exactly one undo-and-retry. The retry is a
//! bounded loop, not recursion; a degraded store that reports a conflict
//! forever costs two attempts, never a stack.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use annot_codec::{filter_view_hyperlinks, AnnotationGroup};
use docstore_client::status::{ANNOTATION_EXISTS, OK as STATUS_OK};
use docstore_client::{is_lock_conflict, status_message, DocumentStore, DocumentVersion, SessionId};

use crate::error::NoteFlowError;

/// Progression of one run. Only `Done` (or an error) escapes to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    BackingUp,
    Unlocking,
    CheckingOut,
    CheckingIn,
    Restoring,
    Done,
}

fn enter(state: &mut RunState, next: RunState, document_id: &str) {
    info!(document_id, from = ?state, to = ?next, "orchestrator state");
    *state = next;
}

/// One annotation group that failed to restore. Non-fatal, aggregated.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreFailure {
    pub group_name: String,
    pub message: String,
}

/// Terminal result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub document_id: String,
    pub new_version: String,
    pub annotations_backed_up: bool,
    /// True when restoration was attempted and every group round-tripped.
    pub annotations_restored: bool,
    pub view_hyperlinks_filtered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub restore_failures: Vec<RestoreFailure>,
}

/// Drives the backup -> unlock -> checkout -> checkin -> restore sequence.
pub struct Orchestrator {
    backup_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Replace `document_id`'s content with the file at `content_path`,
    /// preserving annotations. With `filter_view` set, generated View
    /// hyperlinks are dropped from the restore payload (the backup snapshot
    /// is always unfiltered).
    pub async fn run<S: DocumentStore>(
        &self,
        store: &S,
        document_id: &str,
        content_path: &Path,
        session: SessionId,
        filter_view: bool,
    ) -> Result<RunOutcome, NoteFlowError> {
        let mut state = RunState::Idle;

        // The content file is validated before any network call is made.
        if !content_path.is_file() {
            return Err(NoteFlowError::ContentNotFound(content_path.to_path_buf()));
        }
        let content = std::fs::read(content_path)?;

        enter(&mut state, RunState::BackingUp, document_id);
        let groups = store.get_annotations(document_id, session).await?;

        let mut backup_path = None;
        let mut restore_payload: Vec<AnnotationGroup> = Vec::new();
        if !groups.is_empty() {
            backup_path = Some(self.snapshot(document_id, &groups)?);
            restore_payload = if filter_view {
                filter_view_hyperlinks(&groups)
            } else {
                groups.clone()
            };
        } else {
            info!(document_id, "no annotations to back up");
        }

        enter(&mut state, RunState::Unlocking, document_id);
        self.release_lock(store, document_id, session).await;

        enter(&mut state, RunState::CheckingOut, document_id);
        let mut retried = false;
        let checkout = loop {
            let outcome = store.checkout(document_id, session).await?;
            if outcome.status == STATUS_OK {
                break outcome;
            }
            if is_lock_conflict(outcome.status) {
                if retried {
                    return Err(NoteFlowError::LockConflict);
                }
                info!(document_id, code = outcome.status, "lock conflict, undoing and retrying once");
                retried = true;
                self.release_lock(store, document_id, session).await;
                continue;
            }
            return Err(NoteFlowError::CheckoutRejected {
                code: outcome.status,
                message: status_message(outcome.status),
            });
        };

        // The version tuple flows from checkout straight into checkin;
        // nothing here is ever guessed or cached.
        let held = DocumentVersion {
            document_id: document_id.to_string(),
            version: checkout.version.clone(),
            volume_id: checkout.volume_id.clone(),
            site_id: checkout.site_id.clone(),
        };
        info!(?held, "checkout succeeded");

        enter(&mut state, RunState::CheckingIn, document_id);
        let checkin = match store
            .checkin(
                document_id,
                content,
                &held.volume_id,
                &held.site_id,
                session,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                // Unwind: the lock from checkout is still held.
                self.release_lock(store, document_id, session).await;
                return Err(err.into());
            }
        };
        if checkin.status != STATUS_OK {
            self.release_lock(store, document_id, session).await;
            return Err(NoteFlowError::CheckinRejected {
                code: checkin.status,
                message: status_message(checkin.status),
            });
        }

        enter(&mut state, RunState::Restoring, document_id);
        let mut restore_failures = Vec::new();
        let restore_attempted = backup_path.is_some() && !restore_payload.is_empty();
        if restore_attempted {
            for group in &restore_payload {
                match store.add_annotation(document_id, group, session).await {
                    Ok(outcome) if outcome.status == STATUS_OK => {}
                    Ok(outcome) if outcome.status == ANNOTATION_EXISTS => {
                        info!(group = %group.group_name, "annotation group already present, skipped");
                    }
                    Ok(outcome) => {
                        warn!(group = %group.group_name, code = outcome.status, "annotation restore failed");
                        restore_failures.push(RestoreFailure {
                            group_name: group.group_name.clone(),
                            message: status_message(outcome.status),
                        });
                    }
                    Err(err) => {
                        warn!(group = %group.group_name, %err, "annotation restore errored");
                        restore_failures.push(RestoreFailure {
                            group_name: group.group_name.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        enter(&mut state, RunState::Done, document_id);
        Ok(RunOutcome {
            document_id: document_id.to_string(),
            new_version: checkin.new_version,
            annotations_backed_up: backup_path.is_some(),
            annotations_restored: restore_attempted && restore_failures.is_empty(),
            view_hyperlinks_filtered: filter_view,
            backup_path,
            restore_failures,
        })
    }

    /// Best-effort undo checkout. The document may not be locked at all;
    /// failures here never escalate.
    pub async fn release_lock<S: DocumentStore>(
        &self,
        store: &S,
        document_id: &str,
        session: SessionId,
    ) {
        match store.undo_checkout(document_id, session).await {
            Ok(code) if code != STATUS_OK => {
                info!(document_id, code, "undo checkout reported non-zero status (ignored)");
            }
            Ok(_) => {}
            Err(err) => warn!(document_id, %err, "undo checkout errored (ignored)"),
        }
    }

    /// Persist the unfiltered annotation snapshot before any mutation.
    fn snapshot(
        &self,
        document_id: &str,
        groups: &[AnnotationGroup],
    ) -> Result<PathBuf, NoteFlowError> {
        std::fs::create_dir_all(&self.backup_dir)?;
        let path = self
            .backup_dir
            .join(format!("{}_annotations_{}.json", Uuid::new_v4(), document_id));
        let json = serde_json::to_string_pretty(groups)
            .map_err(|e| NoteFlowError::Io(std::io::Error::other(e)))?;
        std::fs::write(&path, json)?;
        info!(document_id, path = %path.display(), groups = groups.len(), "annotations backed up");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_client::{
        AddAnnotationOutcome, CheckinOutcome, CheckoutOutcome, DocStoreError,
    };
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Store fake driven by a scripted list of checkout statuses. Records
    /// every call so the tests can assert ordering and side effects.
    struct ScriptedStore {
        checkout_statuses: Mutex<VecDeque<i32>>,
        checkin_status: i32,
        add_annotation_statuses: Mutex<VecDeque<i32>>,
        annotations: Vec<AnnotationGroup>,
        calls: Mutex<Vec<String>>,
        added_groups: Mutex<Vec<AnnotationGroup>>,
    }

    impl ScriptedStore {
        fn new(checkout_statuses: Vec<i32>) -> Self {
            Self {
                checkout_statuses: Mutex::new(checkout_statuses.into()),
                checkin_status: 0,
                add_annotation_statuses: Mutex::new(VecDeque::new()),
                annotations: Vec::new(),
                calls: Mutex::new(Vec::new()),
                added_groups: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    impl DocumentStore for ScriptedStore {
        async fn checkout(
            &self,
            _document_id: &str,
            _session: SessionId,
        ) -> Result<CheckoutOutcome, DocStoreError> {
            self.record("checkout");
            let status = self
                .checkout_statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(0);
            Ok(CheckoutOutcome {
                status,
                volume_id: "3".to_string(),
                site_id: "1".to_string(),
                version: "4".to_string(),
            })
        }

        async fn undo_checkout(
            &self,
            _document_id: &str,
            _session: SessionId,
        ) -> Result<i32, DocStoreError> {
            self.record("undo");
            Ok(0)
        }

        async fn checkin(
            &self,
            _document_id: &str,
            _content: Vec<u8>,
            volume_id: &str,
            site_id: &str,
            _session: SessionId,
        ) -> Result<CheckinOutcome, DocStoreError> {
            self.record(&format!("checkin:{}:{}", volume_id, site_id));
            Ok(CheckinOutcome {
                status: self.checkin_status,
                new_version: "5".to_string(),
            })
        }

        async fn get_annotations(
            &self,
            _document_id: &str,
            _session: SessionId,
        ) -> Result<Vec<AnnotationGroup>, DocStoreError> {
            self.record("get_annotations");
            Ok(self.annotations.clone())
        }

        async fn add_annotation(
            &self,
            _document_id: &str,
            group: &AnnotationGroup,
            _session: SessionId,
        ) -> Result<AddAnnotationOutcome, DocStoreError> {
            self.record(&format!("add:{}", group.group_name));
            self.added_groups.lock().unwrap().push(group.clone());
            let status = self
                .add_annotation_statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(0);
            Ok(AddAnnotationOutcome { status })
        }

        async fn get_document(
            &self,
            _document_id: &str,
            _session: SessionId,
        ) -> Result<Vec<u8>, DocStoreError> {
            self.record("get_document");
            Ok(vec![])
        }
    }

    fn group(name: &str, buffer: &str) -> AnnotationGroup {
        AnnotationGroup {
            group_name: name.to_string(),
            annotation_type: "A".to_string(),
            page_no: "1".to_string(),
            access_type: "I".to_string(),
            buffer: buffer.to_string(),
            owner: None,
            group_index: None,
        }
    }

    fn scratch() -> tempdir::Scratch {
        tempdir::Scratch::new()
    }

    /// Minimal scoped temp dir so tests clean up after themselves.
    mod tempdir {
        use std::path::{Path, PathBuf};

        pub struct Scratch(PathBuf);

        impl Scratch {
            pub fn new() -> Self {
                let dir = std::env::temp_dir().join(format!("noteflow-test-{}", uuid::Uuid::new_v4()));
                std::fs::create_dir_all(&dir).unwrap();
                Scratch(dir)
            }

            pub fn path(&self) -> &Path {
                &self.0
            }

            pub fn file(&self, name: &str, contents: &[u8]) -> PathBuf {
                let path = self.0.join(name);
                std::fs::write(&path, contents).unwrap();
                path
            }
        }

        impl Drop for Scratch {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    #[tokio::test]
    async fn test_clean_run_without_annotations() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"%PDF-1.4 stub");
        let store = ScriptedStore::new(vec![0]);
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let outcome = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap();

        assert_eq!(outcome.new_version, "5");
        assert!(!outcome.annotations_backed_up);
        assert!(!outcome.annotations_restored);
        assert!(outcome.restore_failures.is_empty());
        // Checkin is bound to the storage coordinates checkout returned.
        assert!(store.calls().contains(&"checkin:3:1".to_string()));
    }

    #[tokio::test]
    async fn test_single_conflict_retries_once_and_succeeds() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let store = ScriptedStore::new(vec![-50146, 0]);
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let outcome = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap();

        assert_eq!(outcome.new_version, "5");
        let calls = store.calls();
        let checkouts = calls.iter().filter(|c| *c == "checkout").count();
        let undos = calls.iter().filter(|c| *c == "undo").count();
        assert_eq!(checkouts, 2);
        // One pre-checkout unlock plus one between the conflict and retry.
        assert_eq!(undos, 2);
    }

    #[tokio::test]
    async fn test_second_conflict_is_lock_conflict() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let store = ScriptedStore::new(vec![-50146, 50011]);
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let err = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteFlowError::LockConflict));

        // Exactly two attempts; the bounded loop never tries a third.
        let checkouts = store.calls().iter().filter(|c| *c == "checkout").count();
        assert_eq!(checkouts, 2);
    }

    #[tokio::test]
    async fn test_missing_content_fails_before_any_network_call() {
        let dir = scratch();
        let store = ScriptedStore::new(vec![0]);
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let err = orchestrator
            .run(&store, "1591", Path::new("/nonexistent/new.pdf"), 42, false)
            .await
            .unwrap_err();

        assert!(matches!(err, NoteFlowError::ContentNotFound(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_rejection_maps_status_message() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let store = ScriptedStore::new(vec![-1011]);
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let err = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap_err();
        match err {
            NoteFlowError::CheckoutRejected { code, message } => {
                assert_eq!(code, -1011);
                assert!(message.contains("insufficient rights"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backup_and_restore_round_trip() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let mut store = ScriptedStore::new(vec![0]);
        store.annotations = vec![group(
            "supervisor",
            "[supervisorAnnotationHeader]\nTotalAnnotations=1\nNoOfLines=1\n[supervisorLine1]\nX1=0\nY1=0\nX2=5\nY2=5\n",
        )];
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let outcome = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap();

        assert!(outcome.annotations_backed_up);
        assert!(outcome.annotations_restored);
        let backup = outcome.backup_path.unwrap();
        assert!(backup.exists());
        assert!(store.calls().contains(&"add:supervisor".to_string()));
    }

    #[tokio::test]
    async fn test_view_hyperlink_filter_applies_to_restore_not_backup() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let mut store = ScriptedStore::new(vec![0]);
        store.annotations = vec![
            group("ViewLinks", "[ViewLinksAnnotationHeader]\nTotalAnnotations=1\nNoOfHyperlinks=1\n[ViewLinksHyperlink1]\nX1=1\nY1=1\nX2=2\nY2=2\nHyperlinkName=View\n"),
            group("supervisor", "[supervisorAnnotationHeader]\nTotalAnnotations=1\nNoOfLines=1\n[supervisorLine1]\nX1=0\nY1=0\nX2=5\nY2=5\n"),
        ];
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let outcome = orchestrator
            .run(&store, "1591", &content, 42, true)
            .await
            .unwrap();

        // Only the user group is restored...
        let added = store.added_groups.lock().unwrap().clone();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].group_name, "supervisor");

        // ...but the snapshot on disk holds both groups, unfiltered.
        let backup = std::fs::read_to_string(outcome.backup_path.unwrap()).unwrap();
        assert!(backup.contains("ViewLinks"));
        assert!(backup.contains("supervisor"));
    }

    #[tokio::test]
    async fn test_restore_failure_is_nonfatal_and_aggregated() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let mut store = ScriptedStore::new(vec![0]);
        store.annotations = vec![
            group("first", "[firstAnnotationHeader]\nTotalAnnotations=1\nNoOfLines=1\n[firstLine1]\nX1=0\nY1=0\nX2=5\nY2=5\n"),
            group("second", "[secondAnnotationHeader]\nTotalAnnotations=1\nNoOfLines=1\n[secondLine1]\nX1=0\nY1=0\nX2=5\nY2=5\n"),
        ];
        store.add_annotation_statuses = Mutex::new(vec![-1001, 0].into());
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let outcome = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap();

        // Checkout + checkin succeeded, so the run itself is Done.
        assert_eq!(outcome.new_version, "5");
        assert!(!outcome.annotations_restored);
        assert_eq!(outcome.restore_failures.len(), 1);
        assert_eq!(outcome.restore_failures[0].group_name, "first");
        // The second group was still attempted.
        assert!(store.calls().contains(&"add:second".to_string()));
    }

    #[tokio::test]
    async fn test_already_exists_counts_as_restored() {
        let dir = scratch();
        let content = dir.file("new.pdf", b"x");
        let mut store = ScriptedStore::new(vec![0]);
        store.annotations = vec![group(
            "supervisor",
            "[supervisorAnnotationHeader]\nTotalAnnotations=1\nNoOfLines=1\n[supervisorLine1]\nX1=0\nY1=0\nX2=5\nY2=5\n",
        )];
        store.add_annotation_statuses = Mutex::new(vec![ANNOTATION_EXISTS].into());
        let orchestrator = Orchestrator::new(dir.path().join("backups"));

        let outcome = orchestrator
            .run(&store, "1591", &content, 42, false)
            .await
            .unwrap();
        assert!(outcome.annotations_restored);
        assert!(outcome.restore_failures.is_empty());
    }
}
