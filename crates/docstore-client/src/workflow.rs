//! Workflow engine collaborator
//!
//! Session issuance and work-item attribute reads are consumed as opaque
//! upstream operations; nothing here interprets workflow semantics beyond
//! the success code of the connect call.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::DocStoreError;
use crate::types::SessionId;

/// Upstream workflow engine surface the portal consumes.
#[allow(async_fn_in_trait)]
pub trait WorkflowEngine {
    /// Authenticate and obtain a session handle.
    async fn connect(&self, user_name: &str, password: &str) -> Result<SessionId, DocStoreError>;

    /// Release a session. Failures are logged and swallowed by callers.
    async fn disconnect(&self, session: SessionId) -> Result<(), DocStoreError>;

    /// Raw attribute document for one work item.
    async fn fetch_work_item_attributes(
        &self,
        process_instance_id: &str,
        work_item_id: &str,
        session: SessionId,
    ) -> Result<Value, DocStoreError>;
}

/// Connection settings for the workflow engine endpoints.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub connect_url: String,
    pub disconnect_url: String,
    pub attributes_url: String,
    /// Engine (cabinet) name sent with every call.
    pub engine: String,
    pub connect_timeout: std::time::Duration,
    pub read_timeout: std::time::Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            connect_url: "http://localhost:8602/workflow/connect".to_string(),
            disconnect_url: "http://localhost:8602/workflow/disconnect".to_string(),
            attributes_url: "http://localhost:8602/workflow/fetchWorkItemAttributes".to_string(),
            engine: "mainline".to_string(),
            connect_timeout: std::time::Duration::from_secs(10),
            read_timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// reqwest-backed implementation of [`WorkflowEngine`].
pub struct HttpWorkflowEngine {
    config: WorkflowConfig,
    client: reqwest::Client,
}

impl HttpWorkflowEngine {
    pub fn new(config: WorkflowConfig) -> Result<Self, DocStoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;
        Ok(Self { config, client })
    }
}

impl WorkflowEngine for HttpWorkflowEngine {
    async fn connect(&self, user_name: &str, password: &str) -> Result<SessionId, DocStoreError> {
        let payload = json!({
            "Connect_Input": {
                "Option": "Connect",
                "EngineName": self.config.engine,
                "Participant": {
                    "UserName": user_name,
                    "ParticipantType": "U",
                },
            }
        });

        info!(user_name, "connecting to workflow engine");
        let response: Value = self
            .client
            .post(&self.config.connect_url)
            .header("password", password)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        let main_code = response
            .pointer("/Exception/MainCode")
            .and_then(Value::as_str)
            .unwrap_or("1");
        if main_code != "0" {
            warn!(user_name, main_code, "workflow engine rejected connect");
            return Err(DocStoreError::AuthFailed(main_code.to_string()));
        }

        response
            .pointer("/Participant/SessionId")
            .and_then(Value::as_i64)
            .filter(|id| *id != 0)
            .ok_or_else(|| {
                DocStoreError::InvalidResponse("no session id in connect response".to_string())
            })
    }

    async fn disconnect(&self, session: SessionId) -> Result<(), DocStoreError> {
        let payload = json!({
            "Disconnect_Input": {
                "Option": "Disconnect",
                "EngineName": self.config.engine,
                "SessionId": session,
            }
        });

        self.client
            .post(&self.config.disconnect_url)
            .json(&payload)
            .send()
            .await?;
        debug!(session, "workflow session released");
        Ok(())
    }

    async fn fetch_work_item_attributes(
        &self,
        process_instance_id: &str,
        work_item_id: &str,
        session: SessionId,
    ) -> Result<Value, DocStoreError> {
        let payload = json!({
            "FetchWorkItemAttributes_Input": {
                "Option": "FetchWorkItemAttributes",
                "EngineName": self.config.engine,
                "SessionId": session,
                "ProcessInstanceId": process_instance_id,
                "WorkItemId": work_item_id,
            }
        });

        debug!(process_instance_id, work_item_id, "fetching work item attributes");
        let response: Value = self
            .client
            .post(&self.config.attributes_url)
            .header("sessionId", session.to_string())
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        let output = response
            .pointer("/FetchWorkItemAttributes_Output")
            .cloned()
            .unwrap_or(response);

        let code = output
            .get("Status")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if code != 0 {
            let description = output
                .pointer("/Error/Exception/Description")
                .and_then(Value::as_str)
                .unwrap_or("unknown engine error");
            return Err(DocStoreError::InvalidResponse(format!(
                "attribute fetch failed with status {}: {}",
                code, description
            )));
        }

        Ok(output)
    }
}
