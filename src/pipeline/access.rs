//! Stage 2: decide whether the requester may receive a candidate document.
//!
//! **Core invariant: fail closed.** Output that cannot be parsed into a
//! decision with a boolean `approved` is a denial, never an approval.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::composer::select_document;
use crate::pipeline::extract::parse_structured;
use crate::pipeline::types::{AccessDecision, AgentStep, ClearanceLevel, Document, UserProfile};

pub const AGENT_NAME: &str = "Security Check";
const AGENT_ICON: &str = "🔒";

/// Reasoning attached to the fail-closed default.
pub const UNPARSEABLE_REASONING: &str = "Unable to process security check";

const DECIDE_TEMPERATURE: f32 = 0.0;

/// Output of the access decision stage.
#[derive(Debug, Clone)]
pub struct Review {
    pub decision: AccessDecision,
    /// Model text exactly as received, kept for the audit trail.
    pub raw_output: String,
    /// Whether the model output parsed into a decision.
    pub parsed: bool,
    /// Whether the clearance guard overturned a model approval.
    pub guard_applied: bool,
    pub user_clearance: ClearanceLevel,
    pub user_role: String,
}

impl Review {
    /// Audit record for this stage.
    pub fn to_step(&self) -> AgentStep {
        AgentStep::complete(AGENT_NAME, AGENT_ICON)
            .with("approved", self.decision.approved)
            .with("reasoning", self.decision.reasoning.as_str())
            .with("selected_doc", self.decision.selected_doc.clone())
            .with("user_clearance", self.user_clearance.as_str())
            .with("user_role", self.user_role.as_str())
            .with("clearance_guard_applied", self.guard_applied)
            .with("decision_parsed", self.parsed)
            .with("raw_output", self.raw_output.as_str())
    }
}

/// Asks the model for an approve/deny decision on the candidate set.
pub struct AccessReviewer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    enforce_clearance: bool,
}

impl AccessReviewer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, enforce_clearance: bool) -> Self {
        Self {
            llm,
            max_tokens,
            enforce_clearance,
        }
    }

    /// Decide access for `profile` over `documents`.
    pub async fn decide(
        &self,
        profile: &UserProfile,
        documents: &[Document],
    ) -> Result<Review, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_decide_system_prompt()),
            ChatMessage::user(build_decide_user_prompt(profile, documents)),
        ])
        .with_temperature(DECIDE_TEMPERATURE)
        .with_max_tokens(self.max_tokens);

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(PipelineError::llm(AGENT_NAME))?;
        let raw_output = response.content;
        debug!(raw_output = %raw_output, "Access decision model output");

        let (decision, parsed) = match parse_decision(&raw_output) {
            Some(decision) => (decision, true),
            None => {
                warn!(
                    raw_output = %raw_output,
                    "Could not parse access decision, denying"
                );
                (AccessDecision::deny(UNPARSEABLE_REASONING), false)
            }
        };

        let (decision, guard_applied) = if self.enforce_clearance {
            apply_clearance_guard(decision, profile, documents)
        } else {
            (decision, false)
        };

        info!(
            approved = decision.approved,
            selected_doc = decision.selected_doc.as_deref().unwrap_or("none"),
            clearance = %profile.clearance,
            role = %profile.role,
            guard_applied,
            reasoning = %decision.reasoning,
            "Access decision"
        );

        Ok(Review {
            decision,
            raw_output,
            parsed,
            guard_applied,
            user_clearance: profile.clearance,
            user_role: profile.role.clone(),
        })
    }
}

/// Overturn an approval whose effective document needs more clearance than
/// the requester holds. Denials pass through untouched.
pub fn apply_clearance_guard(
    decision: AccessDecision,
    profile: &UserProfile,
    documents: &[Document],
) -> (AccessDecision, bool) {
    if !decision.approved {
        return (decision, false);
    }
    match select_document(&decision, documents) {
        Some(doc) if !profile.clearance.satisfies(doc.required_clearance) => {
            warn!(
                doc_id = %doc.id,
                required = %doc.required_clearance,
                held = %profile.clearance,
                "Model approved a document above the requester's clearance, denying"
            );
            let reasoning = format!(
                "{} clearance is required for {}, but the requester holds {} clearance",
                doc.required_clearance, doc.name, profile.clearance
            );
            (AccessDecision::deny(reasoning), true)
        }
        _ => (decision, false),
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_decide_system_prompt() -> String {
    "You are a security agent that determines if a user should have access to requested \
     documents.\n\n\
     Decide based on:\n\
     - The user's clearance level against each document's required_clearance \
     (none < limited < standard < executive)\n\
     - Document sensitivity\n\
     - Role, department, and tenure\n\
     - The principle of least privilege\n\n\
     Respond with ONLY a JSON object:\n\
     {\"approved\": true/false, \"reasoning\": \"brief explanation (1-2 sentences)\", \
     \"selected_doc\": \"doc_id or null\"}\n\n\
     If approved, selected_doc must be the id of the single document to send."
        .to_string()
}

fn build_decide_user_prompt(profile: &UserProfile, documents: &[Document]) -> String {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_default();
    let documents_json = serde_json::to_string_pretty(documents).unwrap_or_default();
    format!("USER PROFILE:\n{profile_json}\n\nREQUESTED DOCUMENTS:\n{documents_json}")
}

// ── Response parsing ────────────────────────────────────────────────

/// Model decision structure. `approved` has no default on purpose.
#[derive(Debug, Deserialize)]
struct DecisionResponse {
    approved: bool,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    selected_doc: Value,
}

/// Parse the model decision. `None` means fall back to denial.
fn parse_decision(raw: &str) -> Option<AccessDecision> {
    let response: DecisionResponse = parse_structured(raw)?;
    let reasoning = if response.reasoning.trim().is_empty() {
        "No reasoning provided".to_string()
    } else {
        response.reasoning.trim().to_string()
    };

    if !response.approved {
        return Some(AccessDecision::deny(reasoning));
    }

    let selected_doc = match response.selected_doc {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    Some(AccessDecision::approve(reasoning, selected_doc))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{CompletionResponse, FinishReason};
    use crate::store::memory::{seed_documents, seed_users};

    struct FixedLlm {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.response.clone(),
                input_tokens: 10,
                output_tokens: 10,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn reviewer(response: &str, enforce_clearance: bool) -> AccessReviewer {
        let llm: Arc<dyn LlmProvider> = Arc::new(FixedLlm {
            response: response.to_string(),
        });
        AccessReviewer::new(llm, 500, enforce_clearance)
    }

    fn user(email: &str) -> UserProfile {
        seed_users()
            .into_iter()
            .find(|(e, _)| e == email)
            .map(|(_, p)| p)
            .unwrap()
    }

    fn docs(ids: &[&str]) -> Vec<Document> {
        seed_documents()
            .into_iter()
            .filter(|d| ids.contains(&d.id.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn approval_is_passed_through() {
        let reviewer = reviewer(
            r#"{"approved": true, "reasoning": "Standard clearance matches.", "selected_doc": "doc_002"}"#,
            true,
        );
        let review = reviewer
            .decide(&user("john.doe@company.com"), &docs(&["doc_002"]))
            .await
            .unwrap();
        assert!(review.parsed);
        assert!(review.decision.approved);
        assert_eq!(review.decision.selected_doc.as_deref(), Some("doc_002"));
        assert!(!review.guard_applied);
    }

    #[tokio::test]
    async fn malformed_output_denies() {
        for raw in [
            "Access granted!",
            "",
            "{\"approved\": \"yes\", \"reasoning\": \"ok\"}",
            "{\"reasoning\": \"looks fine\", \"selected_doc\": \"doc_002\"}",
            "```json\n{\"approved\": true, \"reasoning\": \n```",
        ] {
            let review = reviewer(raw, false)
                .decide(&user("cfo@company.com"), &docs(&["doc_001"]))
                .await
                .unwrap();
            assert!(!review.parsed, "parsed unexpectedly: {raw}");
            assert!(!review.decision.approved, "approved unexpectedly: {raw}");
            assert_eq!(review.decision.reasoning, UNPARSEABLE_REASONING);
            assert!(review.decision.selected_doc.is_none());
            assert_eq!(review.raw_output, raw);
        }
    }

    #[tokio::test]
    async fn guard_denies_approval_above_clearance() {
        let reviewer = reviewer(
            r#"{"approved": true, "reasoning": "Intern needs it for a project.", "selected_doc": "doc_001"}"#,
            true,
        );
        let review = reviewer
            .decide(&user("intern@company.com"), &docs(&["doc_001"]))
            .await
            .unwrap();
        assert!(review.guard_applied);
        assert!(!review.decision.approved);
        assert!(review.decision.reasoning.contains("executive"));
        assert!(review.decision.selected_doc.is_none());
    }

    #[tokio::test]
    async fn guard_disabled_trusts_model() {
        let reviewer = reviewer(
            r#"{"approved": true, "reasoning": "ok", "selected_doc": "doc_001"}"#,
            false,
        );
        let review = reviewer
            .decide(&user("intern@company.com"), &docs(&["doc_001"]))
            .await
            .unwrap();
        assert!(!review.guard_applied);
        assert!(review.decision.approved);
    }

    #[test]
    fn guard_checks_first_candidate_when_selection_is_unknown() {
        let decision = AccessDecision::approve("ok", Some("doc_999".into()));
        let (decision, applied) = apply_clearance_guard(
            decision,
            &user("john.doe@company.com"),
            &docs(&["doc_001", "doc_002"]),
        );
        // doc_001 is first and needs executive clearance
        assert!(applied);
        assert!(!decision.approved);
    }

    #[test]
    fn guard_never_turns_denial_into_approval() {
        let (decision, applied) = apply_clearance_guard(
            AccessDecision::deny("no"),
            &user("cfo@company.com"),
            &docs(&["doc_003"]),
        );
        assert!(!applied);
        assert!(!decision.approved);
    }

    #[test]
    fn denial_drops_selected_doc() {
        let decision =
            parse_decision(r#"{"approved": false, "reasoning": "no", "selected_doc": "doc_001"}"#)
                .unwrap();
        assert!(!decision.approved);
        assert!(decision.selected_doc.is_none());
    }

    #[test]
    fn null_like_selected_doc_normalizes_to_none() {
        for raw in [
            r#"{"approved": true, "reasoning": "ok", "selected_doc": null}"#,
            r#"{"approved": true, "reasoning": "ok", "selected_doc": "null"}"#,
            r#"{"approved": true, "reasoning": "ok", "selected_doc": ""}"#,
            r#"{"approved": true, "reasoning": "ok"}"#,
        ] {
            let decision = parse_decision(raw).unwrap();
            assert!(decision.approved);
            assert!(decision.selected_doc.is_none(), "{raw}");
        }
    }

    #[test]
    fn prose_wrapped_decision_parses() {
        let raw = "Here is my decision:\n{\"approved\": true, \"reasoning\": \"fine\", \"selected_doc\": \"doc_003\"}\nThanks.";
        let decision = parse_decision(raw).unwrap();
        assert!(decision.approved);
        assert_eq!(decision.selected_doc.as_deref(), Some("doc_003"));
    }

    #[test]
    fn step_includes_raw_output_and_requester() {
        let review = Review {
            decision: AccessDecision::deny(UNPARSEABLE_REASONING),
            raw_output: "garbage".into(),
            parsed: false,
            guard_applied: false,
            user_clearance: ClearanceLevel::Limited,
            user_role: "Software Intern".into(),
        };
        let step = review.to_step();
        assert_eq!(step.agent, "Security Check");
        assert_eq!(step.data["approved"], false);
        assert_eq!(step.data["raw_output"], "garbage");
        assert_eq!(step.data["decision_parsed"], false);
        assert_eq!(step.data["user_clearance"], "limited");
        assert_eq!(step.data["user_role"], "Software Intern");
        assert!(step.data["selected_doc"].is_null());
    }

    #[test]
    fn user_prompt_lists_clearances() {
        let prompt =
            build_decide_user_prompt(&user("intern@company.com"), &docs(&["doc_001", "doc_003"]));
        assert!(prompt.contains("\"clearance\": \"limited\""));
        assert!(prompt.contains("\"required_clearance\": \"executive\""));
        assert!(prompt.contains("\"sensitivity\": \"confidential\""));
        assert!(prompt.contains("doc_003"));
    }
}
