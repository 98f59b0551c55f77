//! Outward-facing tool boundary.
//!
//! Each tool takes a JSON input and returns a JSON result or a structured
//! `ToolError`. Calls are wrapped in a tracing span carrying the request's
//! correlation id, which is echoed back in the response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::models::{HealthIssue, IssueType, Workflow};
use crate::services::{GraphBuilder, RecoveryLoop};

/// Scope needed to plan workflows.
pub const SCOPE_PLAN: &str = "workflow:plan";
/// Scope needed to read recovery state.
pub const SCOPE_RECOVERY_READ: &str = "recovery:read";
/// Scope needed to start sessions.
pub const SCOPE_RECOVERY_WRITE: &str = "recovery:write";
/// Scope needed to start or stop monitoring.
pub const SCOPE_MONITOR: &str = "monitor:write";

/// Who is calling, and with which scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub principal: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl CallerContext {
    pub fn new(principal: impl Into<String>, scopes: &[&str]) -> Self {
        Self {
            principal: principal.into(),
            scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope || s == "*")
    }
}

/// A tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub input: Value,
    /// Absent for trusted in-process callers.
    #[serde(default)]
    pub caller: Option<CallerContext>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            input,
            caller: None,
            correlation_id: None,
        }
    }

    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Structured tool failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("forbidden: missing scope {missing}")]
    Forbidden { missing: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("tool failed: {message}")]
    Failed { message: String },
}

impl ToolError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResponse {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Descriptor of one exposed tool.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub scope: &'static str,
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "plan_workflow",
        description: "Build a phased execution plan from work items",
        scope: SCOPE_PLAN,
    },
    ToolSpec {
        name: "trigger_recovery",
        description: "Start a recovery session for an issue",
        scope: SCOPE_RECOVERY_WRITE,
    },
    ToolSpec {
        name: "report_failure",
        description: "Report an observed failure for recovery",
        scope: SCOPE_RECOVERY_WRITE,
    },
    ToolSpec {
        name: "start_monitoring",
        description: "Start health monitoring and the recovery sweep for a project",
        scope: SCOPE_MONITOR,
    },
    ToolSpec {
        name: "stop_monitoring",
        description: "Stop monitoring a project and its in-flight sessions",
        scope: SCOPE_MONITOR,
    },
    ToolSpec {
        name: "recovery_status",
        description: "Snapshot of active sessions and learning statistics",
        scope: SCOPE_RECOVERY_READ,
    },
    ToolSpec {
        name: "get_session",
        description: "Fetch one recovery session by id",
        scope: SCOPE_RECOVERY_READ,
    },
];

/// Dispatches tool requests onto the scheduler and recovery services.
#[derive(Clone)]
pub struct ToolGateway {
    recovery: Arc<RecoveryLoop>,
    graph: GraphBuilder,
}

impl ToolGateway {
    pub fn new(recovery: Arc<RecoveryLoop>, graph: GraphBuilder) -> Self {
        Self { recovery, graph }
    }

    pub fn tools() -> &'static [ToolSpec] {
        TOOLS
    }

    pub async fn invoke(&self, request: ToolRequest) -> ToolResponse {
        let correlation_id = request
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = tracing::info_span!("tool_call", tool = %request.name, %correlation_id);

        let outcome = self.dispatch(&request).instrument(span.clone()).await;
        let _entered = span.enter();
        match &outcome {
            Ok(_) => tracing::debug!("tool call succeeded"),
            Err(e) => tracing::warn!(error = %e, "tool call failed"),
        }

        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e)),
        };
        ToolResponse {
            tool: request.name,
            correlation_id,
            result,
            error,
        }
    }

    async fn dispatch(&self, request: &ToolRequest) -> Result<Value, ToolError> {
        let spec = TOOLS
            .iter()
            .find(|t| t.name == request.name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: request.name.clone(),
            })?;

        if let Some(caller) = &request.caller {
            if !caller.has_scope(spec.scope) {
                return Err(ToolError::Forbidden {
                    missing: spec.scope.to_string(),
                });
            }
        }

        let input = &request.input;
        match spec.name {
            "plan_workflow" => self.plan_workflow(input),
            "trigger_recovery" => self.trigger_recovery(input).await,
            "report_failure" => {
                let project = required_str(input, "project_id")?;
                let error = required_str(input, "error")?;
                let location = input.get("location").and_then(Value::as_str).unwrap_or("external");
                let outcome = self.recovery.report_failure(project, error, location).await;
                to_value(&outcome)
            }
            "start_monitoring" => {
                let project = required_str(input, "project_id")?;
                let started = self.recovery.start(project).await;
                Ok(json!({ "project_id": project, "started": started }))
            }
            "stop_monitoring" => {
                let project = required_str(input, "project_id")?;
                let stopped = self.recovery.stop(project).await;
                Ok(json!({ "project_id": project, "stopped": stopped }))
            }
            "recovery_status" => to_value(&self.recovery.status().await),
            "get_session" => {
                let raw = required_str(input, "session_id")?;
                let id = Uuid::parse_str(raw)
                    .map_err(|e| ToolError::invalid(format!("session_id: {e}")))?;
                let session = self
                    .recovery
                    .get_session(id)
                    .await
                    .ok_or_else(|| ToolError::NotFound {
                        message: format!("session {id}"),
                    })?;
                to_value(&session)
            }
            other => Err(ToolError::UnknownTool {
                name: other.to_string(),
            }),
        }
    }

    fn plan_workflow(&self, input: &Value) -> Result<Value, ToolError> {
        // JSON is valid YAML, so both input shapes go through one parser.
        let text = match input.get("yaml").and_then(Value::as_str) {
            Some(yaml) => yaml.to_string(),
            None => serde_json::to_string(input).map_err(|e| ToolError::invalid(e.to_string()))?,
        };
        let workflow = Workflow::from_yaml(&text).map_err(|e| ToolError::invalid(e.to_string()))?;
        let plan = self
            .graph
            .build(workflow.items)
            .map_err(|e| ToolError::Failed {
                message: e.to_string(),
            })?;
        to_value(&plan)
    }

    async fn trigger_recovery(&self, input: &Value) -> Result<Value, ToolError> {
        let project = required_str(input, "project_id")?;
        let raw_type = input.get("issue_type").and_then(Value::as_str).unwrap_or("runtime");
        let issue_type = IssueType::from_str(raw_type)
            .ok_or_else(|| ToolError::invalid(format!("unknown issue_type '{raw_type}'")))?;
        let severity = input
            .get("severity")
            .and_then(Value::as_u64)
            .map_or(5, |s| u8::try_from(s.min(10)).unwrap_or(10));
        let description = required_str(input, "description")?;
        let location = input.get("location").and_then(Value::as_str).unwrap_or("unknown");

        let mut issue = HealthIssue::new(issue_type, severity, description, location);
        if let Some(text) = input.get("error_text").and_then(Value::as_str) {
            issue = issue.with_error_text(text);
        }
        if let Some(trace) = input.get("stack_trace").and_then(Value::as_str) {
            issue = issue.with_stack_trace(trace);
        }
        let outcome = self.recovery.trigger(project, issue).await;
        to_value(&outcome)
    }
}

fn required_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid(format!("missing required field: {field}")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Failed {
        message: e.to_string(),
    })
}
