//! Stage 3: draft the outbound reply from the access decision.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::llm::provider::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};
use crate::pipeline::types::{AccessDecision, AgentStep, Document, EmailRequest};

pub const AGENT_NAME: &str = "Response Generator";
const AGENT_ICON: &str = "✍️";

const COMPOSE_TEMPERATURE: f32 = 0.3;

/// Output of the composer stage.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Drafted reply body, trimmed.
    pub text: String,
    /// Document the reply hands out, if any.
    pub selected_document: Option<Document>,
    pub approved: bool,
}

impl Reply {
    pub fn response_type(&self) -> &'static str {
        if self.approved { "approved" } else { "denied" }
    }

    /// Audit record for this stage.
    pub fn to_step(&self) -> AgentStep {
        AgentStep::complete(AGENT_NAME, AGENT_ICON)
            .with("email_response", self.text.as_str())
            .with("response_type", self.response_type())
            .with("document_provided", self.selected_document.is_some())
    }
}

/// Pick the document an approved decision hands out.
///
/// The model's `selected_doc` wins when it names a candidate; otherwise the
/// first candidate is used. Denials and empty candidate lists select nothing.
pub fn select_document<'a>(
    decision: &AccessDecision,
    documents: &'a [Document],
) -> Option<&'a Document> {
    if !decision.approved {
        return None;
    }
    decision
        .selected_doc
        .as_deref()
        .and_then(|id| documents.iter().find(|d| d.id == id))
        .or_else(|| documents.first())
}

/// Drafts approval or denial replies with the model.
pub struct ReplyComposer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl ReplyComposer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Draft the reply for `request` given the decision and candidates.
    pub async fn compose(
        &self,
        request: &EmailRequest,
        decision: &AccessDecision,
        documents: &[Document],
    ) -> Result<Reply, PipelineError> {
        let selected = select_document(decision, documents).cloned();

        let user_prompt = match &selected {
            Some(doc) => build_approval_prompt(request, doc),
            None => build_denial_prompt(request, decision),
        };

        let llm_request = CompletionRequest::new(vec![
            ChatMessage::system(build_compose_system_prompt()),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(COMPOSE_TEMPERATURE)
        .with_max_tokens(self.max_tokens);

        let response = self
            .llm
            .complete(llm_request)
            .await
            .map_err(PipelineError::llm(AGENT_NAME))?;
        debug!(raw_output = %response.content, "Composer model output");
        if response.finish_reason == FinishReason::Length {
            warn!(
                max_tokens = self.max_tokens,
                "Reply hit the token budget and may be cut off"
            );
        }

        let reply = Reply {
            text: response.content.trim().to_string(),
            approved: selected.is_some(),
            selected_document: selected,
        };
        info!(
            response_type = reply.response_type(),
            document = reply
                .selected_document
                .as_ref()
                .map(|d| d.id.as_str())
                .unwrap_or("none"),
            "Reply drafted"
        );
        Ok(reply)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_compose_system_prompt() -> String {
    "You write brief, professional email replies to internal document requests. \
     Write only the body: no greeting and no signature."
        .to_string()
}

fn original_email_section(request: &EmailRequest) -> String {
    format!(
        "ORIGINAL EMAIL:\nFrom: {}\nSubject: {}\nBody: {}",
        request.sender, request.subject, request.body
    )
}

fn build_approval_prompt(request: &EmailRequest, doc: &Document) -> String {
    format!(
        "Write a brief, professional email response providing the requested document.\n\n\
         {email}\n\n\
         DOCUMENT TO PROVIDE:\nName: {name}\nURL: {url}\nDescription: {description}\n\n\
         Write a helpful response that:\n\
         - Acknowledges their request\n\
         - Provides the document name and link\n\
         - Is warm but professional\n\
         - Keep it under 4 sentences",
        email = original_email_section(request),
        name = doc.name,
        url = doc.url,
        description = doc.description,
    )
}

fn build_denial_prompt(request: &EmailRequest, decision: &AccessDecision) -> String {
    format!(
        "Write a brief, professional email declining the document request.\n\n\
         {email}\n\n\
         DENIAL REASON:\n{reason}\n\n\
         Write a polite response that:\n\
         - Acknowledges their request\n\
         - Explains they don't have access (without being too specific about why)\n\
         - Suggests they contact their manager or IT if needed\n\
         - Keep it under 3 sentences",
        email = original_email_section(request),
        reason = decision.reasoning,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::CompletionResponse;
    use crate::store::memory::seed_documents;

    /// Mock LLM that echoes a fixed reply and keeps the last prompt.
    struct CapturingLlm {
        reply: String,
        last_prompt: Mutex<String>,
    }

    #[async_trait]
    impl LlmProvider for CapturingLlm {
        fn model_name(&self) -> &str {
            "capturing"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.last_prompt.lock().unwrap() = request.prompt();
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 10,
                output_tokens: 10,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn capturing(reply: &str) -> Arc<CapturingLlm> {
        Arc::new(CapturingLlm {
            reply: reply.to_string(),
            last_prompt: Mutex::new(String::new()),
        })
    }

    fn request() -> EmailRequest {
        EmailRequest::new(
            "john.doe@company.com",
            "API Documentation Request",
            "Hey, I need the API documentation for the new endpoints.",
        )
    }

    #[test]
    fn select_uses_named_candidate() {
        let docs = seed_documents();
        let decision = AccessDecision::approve("ok", Some("doc_004".into()));
        assert_eq!(select_document(&decision, &docs).unwrap().id, "doc_004");
    }

    #[test]
    fn select_falls_back_to_first_candidate() {
        let docs = seed_documents();
        let unknown = AccessDecision::approve("ok", Some("doc_999".into()));
        let missing = AccessDecision::approve("ok", None);
        assert_eq!(select_document(&unknown, &docs).unwrap().id, "doc_001");
        assert_eq!(select_document(&missing, &docs).unwrap().id, "doc_001");
    }

    #[test]
    fn select_nothing_when_denied_or_empty() {
        let docs = seed_documents();
        assert!(select_document(&AccessDecision::deny("no"), &docs).is_none());
        let approved = AccessDecision::approve("ok", Some("doc_001".into()));
        assert!(select_document(&approved, &[]).is_none());
    }

    #[tokio::test]
    async fn approval_prompt_names_document_and_link() {
        let llm = capturing("  Here is the API Documentation v2.1: https://docs.google.com/document/d/def456  \n");
        let composer = ReplyComposer::new(llm.clone(), 500);
        let docs = seed_documents();
        let decision = AccessDecision::approve("ok", Some("doc_002".into()));

        let reply = composer.compose(&request(), &decision, &docs).await.unwrap();
        assert!(reply.approved);
        assert_eq!(reply.selected_document.as_ref().unwrap().id, "doc_002");
        assert_eq!(
            reply.text,
            "Here is the API Documentation v2.1: https://docs.google.com/document/d/def456"
        );

        let prompt = llm.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("API Documentation v2.1"));
        assert!(prompt.contains("https://docs.google.com/document/d/def456"));
        assert!(prompt.contains("under 4 sentences"));
    }

    #[tokio::test]
    async fn denial_prompt_carries_reasoning() {
        let llm = capturing("Unfortunately you don't have access to that document.");
        let composer = ReplyComposer::new(llm.clone(), 500);
        let docs = seed_documents();
        let decision = AccessDecision::deny("Requires executive clearance");

        let reply = composer.compose(&request(), &decision, &docs).await.unwrap();
        assert!(!reply.approved);
        assert!(reply.selected_document.is_none());
        assert_eq!(reply.response_type(), "denied");

        let prompt = llm.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Requires executive clearance"));
        assert!(prompt.contains("manager or IT"));
        assert!(!prompt.contains("DOCUMENT TO PROVIDE"));
    }

    #[tokio::test]
    async fn approval_without_candidates_is_drafted_as_denial() {
        let llm = capturing("Sorry, nothing to send.");
        let composer = ReplyComposer::new(llm, 500);
        let decision = AccessDecision::approve("ok", Some("doc_001".into()));

        let reply = composer.compose(&request(), &decision, &[]).await.unwrap();
        assert!(!reply.approved);
        assert!(reply.selected_document.is_none());
    }

    #[test]
    fn step_records_classification() {
        let reply = Reply {
            text: "Here you go".into(),
            selected_document: seed_documents().into_iter().next(),
            approved: true,
        };
        let step = reply.to_step();
        assert_eq!(step.agent, "Response Generator");
        assert_eq!(step.icon, "✍️");
        assert_eq!(step.data["response_type"], "approved");
        assert_eq!(step.data["document_provided"], true);
        assert_eq!(step.data["email_response"], "Here you go");
    }
}
