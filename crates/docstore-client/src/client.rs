//! Document store operations over HTTP
//!
//! The store exposes one execute-API endpoint that multiplexes operations
//! through named input/output envelopes, a multipart checkin endpoint, and a
//! document-stream download endpoint. [`HttpDocumentStore`] speaks that
//! dialect; the [`DocumentStore`] trait is the seam the orchestrator runs
//! against.

use reqwest::multipart;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use annot_codec::AnnotationGroup;

use crate::error::DocStoreError;
use crate::status;
use crate::types::{
    AddAnnotationOutcome, CheckinOutcome, CheckoutOutcome, DocStoreConfig, SessionId,
};

/// Operations the orchestrator needs from the document store.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Request an exclusive lock. Conflict codes are reported in the
    /// outcome's status, not as transport errors.
    async fn checkout(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<CheckoutOutcome, DocStoreError>;

    /// Release a lock best-effort; the caller decides whether failures matter.
    async fn undo_checkout(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<i32, DocStoreError>;

    /// Upload new content bound to the storage coordinates from checkout.
    async fn checkin(
        &self,
        document_id: &str,
        content: Vec<u8>,
        volume_id: &str,
        site_id: &str,
        session: SessionId,
    ) -> Result<CheckinOutcome, DocStoreError>;

    /// All annotation groups on the document's current version.
    async fn get_annotations(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<Vec<AnnotationGroup>, DocStoreError>;

    /// Write one annotation group to the document.
    async fn add_annotation(
        &self,
        document_id: &str,
        group: &AnnotationGroup,
        session: SessionId,
    ) -> Result<AddAnnotationOutcome, DocStoreError>;

    /// Raw bytes of the document's latest version.
    async fn get_document(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<Vec<u8>, DocStoreError>;
}

/// reqwest-backed implementation of [`DocumentStore`].
pub struct HttpDocumentStore {
    config: DocStoreConfig,
    client: reqwest::Client,
}

impl HttpDocumentStore {
    pub fn new(config: DocStoreConfig) -> Result<Self, DocStoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Wrap an operation input in the store's execute-API envelope.
    fn envelope(input_name: &str, input: Value) -> Value {
        json!({
            "ExecuteApiRequest": {
                "inputData": { input_name: input },
                "base64Encoded": "N",
                "locale": "en_US",
            }
        })
    }

    async fn execute(&self, input_name: &str, input: Value) -> Result<Value, DocStoreError> {
        let payload = Self::envelope(input_name, input);
        debug!(operation = input_name, "calling document store execute API");

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&payload)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    fn output<'a>(response: &'a Value, output_name: &str) -> Result<&'a Value, DocStoreError> {
        response
            .pointer(&format!("/ExecuteApiResponse/outputData/{}", output_name))
            .ok_or_else(|| {
                DocStoreError::InvalidResponse(format!("missing {} in response", output_name))
            })
    }

    fn checkinout_input(&self, document_id: &str, session: SessionId, flag: &str) -> Value {
        json!({
            "Option": "CheckInOutExt",
            "CabinetName": self.config.cabinet,
            "UserDBId": session.to_string(),
            "CheckInOutFlag": flag,
            "SupAnnotVersion": "N",
            "Documents": { "Document": { "DocumentIndex": document_id } },
        })
    }
}

/// Extract a numeric status from a string or number field.
fn status_value(value: &Value) -> i32 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(-1) as i32,
        Value::String(s) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

fn text_of(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// The store emits single children as objects and multiples as arrays.
fn single_or_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => vec![],
        other => vec![other.clone()],
    }
}

impl DocumentStore for HttpDocumentStore {
    async fn checkout(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<CheckoutOutcome, DocStoreError> {
        let response = self
            .execute(
                "CheckInOutExt_Input",
                self.checkinout_input(document_id, session, "Y"),
            )
            .await?;
        let output = Self::output(&response, "CheckInOutExt_Output")?;

        let code = status_value(output.get("Status").unwrap_or(&Value::Null));
        if code != status::OK {
            info!(document_id, code, "checkout rejected by store");
            return Ok(CheckoutOutcome {
                status: code,
                volume_id: String::new(),
                site_id: String::new(),
                version: String::new(),
            });
        }

        let doc = output
            .pointer("/Documents/Document")
            .cloned()
            .unwrap_or(Value::Null);

        let mut volume_id = text_of(&doc, "VolumeId");
        let mut site_id = text_of(&doc, "SiteId");
        if volume_id.is_empty() {
            volume_id = self.config.default_volume_id.clone();
        }
        if site_id.is_empty() {
            site_id = self.config.default_site_id.clone();
        }

        Ok(CheckoutOutcome {
            status: code,
            volume_id,
            site_id,
            version: text_of(&doc, "DocumentVersionNo"),
        })
    }

    async fn undo_checkout(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<i32, DocStoreError> {
        let response = self
            .execute(
                "CheckInOutExt_Input",
                self.checkinout_input(document_id, session, "U"),
            )
            .await?;
        let output = Self::output(&response, "CheckInOutExt_Output")?;
        Ok(status_value(output.get("Status").unwrap_or(&Value::Null)))
    }

    async fn checkin(
        &self,
        document_id: &str,
        content: Vec<u8>,
        volume_id: &str,
        site_id: &str,
        session: SessionId,
    ) -> Result<CheckinOutcome, DocStoreError> {
        let descriptor = json!({
            "cabinetName": self.config.cabinet,
            "userDBId": session.to_string(),
            "documentIndex": document_id,
            "checkInOutFlag": "N",
            "majorVersion": "N",
            "volumeId": volume_id,
            "siteId": site_id,
            "supAnnotVersion": "N",
            "createdByAppName": "pdf",
        });

        let form = multipart::Form::new()
            .text("CheckInDocumentRequest", descriptor.to_string())
            .part(
                "file",
                multipart::Part::bytes(content).file_name(format!("{}.pdf", document_id)),
            );

        let endpoint = self.config.checkin_endpoint();
        info!(document_id, %endpoint, "checking in new document content");

        let response: Value = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        let output = response
            .get("CheckInDocumentResponse")
            .ok_or_else(|| {
                DocStoreError::InvalidResponse("missing CheckInDocumentResponse".to_string())
            })?;

        Ok(CheckinOutcome {
            status: status_value(output.get("status").unwrap_or(&Value::Null)),
            new_version: text_of(output, "documentVersionNo"),
        })
    }

    async fn get_annotations(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<Vec<AnnotationGroup>, DocStoreError> {
        let input = json!({
            "Option": "GetAnnotationGroupList",
            "CabinetName": self.config.cabinet,
            "UserDBId": session.to_string(),
            "DocumentIndex": document_id,
            "PageNo": "1",
            "PreviousAnnotationIndex": "0",
            "SortOrder": "A",
            "NoOfRecordsToFetch": "100",
        });

        let response = self.execute("GetAnnotationGroupList_Input", input).await?;
        let output = Self::output(&response, "GetAnnotationGroupList_Output")?;

        let code = status_value(output.get("Status").unwrap_or(&Value::Null));
        if code != status::OK {
            return Err(DocStoreError::InvalidResponse(format!(
                "annotation list failed: {}",
                status::status_message(code)
            )));
        }

        let groups_node = output
            .pointer("/AnnotationGroups/AnnotationGroup")
            .cloned()
            .unwrap_or(Value::Null);

        let mut groups = Vec::new();
        for node in single_or_array(&groups_node) {
            match serde_json::from_value::<AnnotationGroup>(node) {
                Ok(group) => groups.push(group),
                Err(err) => warn!(document_id, %err, "skipping undecodable annotation group"),
            }
        }

        debug!(document_id, count = groups.len(), "fetched annotation groups");
        Ok(groups)
    }

    async fn add_annotation(
        &self,
        document_id: &str,
        group: &AnnotationGroup,
        session: SessionId,
    ) -> Result<AddAnnotationOutcome, DocStoreError> {
        let input = json!({
            "Option": "AddAnnotation",
            "CabinetName": self.config.cabinet,
            "UserDBId": session.to_string(),
            "DocumentIndex": document_id,
            "AnnotationGroup": serde_json::to_value(group)
                .map_err(|e| DocStoreError::InvalidResponse(e.to_string()))?,
            "MajorVersion": "N",
        });

        let response = self.execute("AddAnnotation_Input", input).await?;
        let output = Self::output(&response, "AddAnnotation_Output")?;
        Ok(AddAnnotationOutcome {
            status: status_value(output.get("Status").unwrap_or(&Value::Null)),
        })
    }

    async fn get_document(
        &self,
        document_id: &str,
        session: SessionId,
    ) -> Result<Vec<u8>, DocStoreError> {
        let payload = json!({
            "GetDocumentRequest": {
                "cabinetName": self.config.cabinet,
                "docIndex": document_id,
                // Empty version means latest.
                "versionNo": "",
                "userDBId": session.to_string(),
                "locale": "en_US",
            }
        });

        let response = self
            .client
            .post(&self.config.document_url)
            .json(&payload)
            .send()
            .await?;
        let bytes = response.bytes().await?;

        debug!(document_id, size = bytes.len(), "downloaded document content");
        Ok(bytes.to_vec())
    }
}
