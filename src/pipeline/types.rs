//! Shared types for the document request pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Inbound request ─────────────────────────────────────────────────

/// An inbound email asking for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

impl EmailRequest {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

// ── Documents and people ────────────────────────────────────────────

/// Access tier. Declaration order is the ordering: `None < Limited < Standard < Executive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearanceLevel {
    None,
    Limited,
    Standard,
    Executive,
}

impl ClearanceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Limited => "limited",
            Self::Standard => "standard",
            Self::Executive => "executive",
        }
    }

    /// Whether a holder of `self` meets `required`.
    pub fn satisfies(self, required: ClearanceLevel) -> bool {
        self >= required
    }
}

impl std::fmt::Display for ClearanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document sensitivity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Public,
    Internal,
    Confidential,
}

/// A document known to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub sensitivity: Sensitivity,
    pub required_clearance: ClearanceLevel,
}

/// A requester as known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub role: String,
    pub department: String,
    pub clearance: ClearanceLevel,
    pub tenure_months: u32,
}

impl UserProfile {
    /// Profile returned for identities the directory does not know.
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".into(),
            role: "External".into(),
            department: "None".into(),
            clearance: ClearanceLevel::None,
            tenure_months: 0,
        }
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            role: self.role.clone(),
            clearance: self.clearance,
        }
    }
}

/// The part of a profile exposed in pipeline results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub role: String,
    pub clearance: ClearanceLevel,
}

// ── Stage outputs ───────────────────────────────────────────────────

/// What the interpreter thinks the sender is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIntent {
    pub search_query: String,
    pub request_type: String,
}

/// Approve/deny outcome of the access decision stage.
///
/// `selected_doc` is only ever `Some` when `approved` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub approved: bool,
    pub reasoning: String,
    pub selected_doc: Option<String>,
}

impl AccessDecision {
    pub fn approve(reasoning: impl Into<String>, selected_doc: Option<String>) -> Self {
        Self {
            approved: true,
            reasoning: reasoning.into(),
            selected_doc,
        }
    }

    pub fn deny(reasoning: impl Into<String>) -> Self {
        Self {
            approved: false,
            reasoning: reasoning.into(),
            selected_doc: None,
        }
    }
}

// ── Audit trail ─────────────────────────────────────────────────────

/// One audit record per pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub agent: String,
    pub status: String,
    pub icon: String,
    pub data: Map<String, Value>,
}

impl AgentStep {
    /// A completed step with no data yet.
    pub fn complete(agent: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            status: "complete".into(),
            icon: icon.into(),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Ordered, append-only log of stage records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog(Vec<AgentStep>);

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: AgentStep) {
        self.0.push(step);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.0
    }
}

// ── Pipeline result ─────────────────────────────────────────────────

/// Terminal output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub agent_steps: StepLog,
    pub final_response: String,
    pub approved_document: Option<Document>,
    pub user_profile: Option<ProfileSummary>,
    pub request: EmailRequest,
}
