//! Correlation and trace identifiers carried through every flow

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID tying log lines from one user action together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trace context for one flow and the transactions it submits
///
/// A flow creates the root context; each transaction, and each launch phase,
/// runs under a child span that keeps the trace and correlation ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub correlation_id: CorrelationId,
    pub parent_span_id: Option<String>,

    /// Flow or step name, e.g. `purchase` or `launch.phase1`
    pub operation: String,

    /// Project the flow acts on, if any
    pub project_id: Option<String>,

    /// Creation time (Unix seconds)
    pub timestamp: i64,
}

impl TraceContext {
    pub fn new(operation: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: CorrelationId::new(),
            parent_span_id: None,
            operation: operation.to_string(),
            project_id: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn for_project(operation: &str, project_id: &str) -> Self {
        Self {
            project_id: Some(project_id.to_string()),
            ..Self::new(operation)
        }
    }

    pub fn child_span(&self, operation: &str) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: self.correlation_id.clone(),
            parent_span_id: Some(self.span_id.clone()),
            operation: operation.to_string(),
            project_id: self.project_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// `tracing` span carrying this context's identifiers
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "flow",
            operation = %self.operation,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            correlation_id = %self.correlation_id,
            project = self.project_id.as_deref().unwrap_or("-"),
        )
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new("default")
    }
}
