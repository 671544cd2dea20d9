//! Pipeline orchestrator — sequences the three stages and assembles the result.
//!
//! `Interpret → (no documents → not found) → lookup user → Decide → Compose`
//!
//! The orchestrator holds no decision logic of its own: it runs the stages in
//! order, looks up the requester, and records each stage's audit step.

use std::sync::Arc;

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::llm::provider::LlmProvider;
use crate::pipeline::access::AccessReviewer;
use crate::pipeline::composer::ReplyComposer;
use crate::pipeline::interpreter::RequestInterpreter;
use crate::pipeline::types::{EmailRequest, PipelineResult, StepLog};
use crate::store::{DocumentStore, UserDirectory};

/// Reply returned when the search finds nothing.
pub const NOT_FOUND_RESPONSE: &str =
    "I couldn't find the document you requested. Could you provide more details?";

/// Error label attached to the not-found result.
pub const NOT_FOUND_ERROR: &str = "No documents found";

/// Subject used when a request omits one.
pub const DEFAULT_SUBJECT: &str = "Document Request";

/// Per-stage model settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output token budget for the structured stages (interpret, decide).
    pub max_tokens: u32,
    /// Output token budget for the reply draft.
    pub reply_max_tokens: u32,
    /// Mechanically deny approvals above the requester's clearance.
    pub enforce_clearance: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            reply_max_tokens: 500,
            enforce_clearance: true,
        }
    }
}

/// The three-stage document request pipeline.
///
/// Cheap to share behind an `Arc`; each `run` is independent.
pub struct DocumentPipeline {
    interpreter: RequestInterpreter,
    reviewer: AccessReviewer,
    composer: ReplyComposer,
    users: Arc<dyn UserDirectory>,
}

impl DocumentPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        documents: Arc<dyn DocumentStore>,
        users: Arc<dyn UserDirectory>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            interpreter: RequestInterpreter::new(Arc::clone(&llm), documents, config.max_tokens),
            reviewer: AccessReviewer::new(
                Arc::clone(&llm),
                config.max_tokens,
                config.enforce_clearance,
            ),
            composer: ReplyComposer::new(llm, config.reply_max_tokens),
            users,
        }
    }

    /// Run the full pipeline for one email.
    pub async fn run(
        &self,
        sender: &str,
        subject: &str,
        body: &str,
    ) -> Result<PipelineResult, PipelineError> {
        let request = EmailRequest::new(sender, subject, body);
        let span = info_span!("pipeline", request_id = %Uuid::new_v4(), sender = %sender);
        self.run_request(request).instrument(span).await
    }

    async fn run_request(&self, request: EmailRequest) -> Result<PipelineResult, PipelineError> {
        info!(subject = %request.subject, "Processing document request");
        let mut steps = StepLog::new();

        let interpretation = self.interpreter.interpret(&request.body).await?;
        steps.record(interpretation.to_step());

        if interpretation.documents.is_empty() {
            info!(query = %interpretation.intent.search_query, "No documents found");
            return Ok(PipelineResult {
                success: false,
                error: Some(NOT_FOUND_ERROR.to_string()),
                agent_steps: steps,
                final_response: NOT_FOUND_RESPONSE.to_string(),
                approved_document: None,
                user_profile: None,
                request,
            });
        }

        let profile = self.users.lookup(&request.sender).await?;

        let review = self
            .reviewer
            .decide(&profile, &interpretation.documents)
            .await?;
        steps.record(review.to_step());

        let reply = self
            .composer
            .compose(&request, &review.decision, &interpretation.documents)
            .await?;
        steps.record(reply.to_step());

        info!(
            approved = reply.approved,
            steps = steps.len(),
            "Document request processed"
        );

        Ok(PipelineResult {
            success: true,
            error: None,
            agent_steps: steps,
            final_response: reply.text,
            approved_document: reply.selected_document,
            user_profile: Some(profile.summary()),
            request,
        })
    }
}
