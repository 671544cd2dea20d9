//! Stage 1: turn the email body into a search intent and find candidates.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::extract::extract_json_object;
use crate::pipeline::types::{AgentStep, Document, SearchIntent};
use crate::store::DocumentStore;

pub const AGENT_NAME: &str = "Doc Finder";
const AGENT_ICON: &str = "🔍";

/// Characters of the body used as the search query when the model output is unusable.
pub const FALLBACK_QUERY_CHARS: usize = 50;

/// Request type used when the model does not supply one.
pub const FALLBACK_REQUEST_TYPE: &str = "document";

/// Low temperature: this is extraction, not writing.
const INTERPRET_TEMPERATURE: f32 = 0.1;

/// Output of the interpreter stage.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub intent: SearchIntent,
    pub documents: Vec<Document>,
    /// Whether the intent came from the fallback rather than the model.
    pub used_fallback: bool,
}

impl Interpretation {
    /// Audit record for this stage.
    pub fn to_step(&self) -> AgentStep {
        let names: Vec<Value> = self
            .documents
            .iter()
            .map(|d| Value::String(d.name.clone()))
            .collect();
        AgentStep::complete(AGENT_NAME, AGENT_ICON)
            .with("search_query", self.intent.search_query.as_str())
            .with("request_type", self.intent.request_type.as_str())
            .with("documents_found", self.documents.len())
            .with("documents", names)
            .with("used_fallback", self.used_fallback)
    }
}

/// Extracts a search intent with the model, then queries the document store.
pub struct RequestInterpreter {
    llm: Arc<dyn LlmProvider>,
    documents: Arc<dyn DocumentStore>,
    max_tokens: u32,
}

impl RequestInterpreter {
    pub fn new(llm: Arc<dyn LlmProvider>, documents: Arc<dyn DocumentStore>, max_tokens: u32) -> Self {
        Self {
            llm,
            documents,
            max_tokens,
        }
    }

    /// Interpret an email body and return the candidate documents.
    pub async fn interpret(&self, body: &str) -> Result<Interpretation, PipelineError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_interpret_system_prompt()),
            ChatMessage::user(build_interpret_user_prompt(body)),
        ])
        .with_temperature(INTERPRET_TEMPERATURE)
        .with_max_tokens(self.max_tokens);

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(PipelineError::llm(AGENT_NAME))?;
        debug!(raw_output = %response.content, "Interpreter model output");

        let (intent, used_fallback) = match parse_intent(&response.content) {
            Some(intent) => (intent, false),
            None => {
                warn!(
                    raw_output = %response.content,
                    "Could not parse search intent, falling back to body prefix"
                );
                (fallback_intent(body), true)
            }
        };

        let documents = self.documents.search(&intent.search_query).await?;
        info!(
            query = %intent.search_query,
            request_type = %intent.request_type,
            found = documents.len(),
            "Document search complete"
        );

        Ok(Interpretation {
            intent,
            documents,
            used_fallback,
        })
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_interpret_system_prompt() -> String {
    "You are a document retrieval assistant. Analyze the email and extract what document \
     the sender is requesting.\n\n\
     Respond with ONLY a JSON object in this exact format:\n\
     {\"search_query\": \"2-5 word search term\", \"request_type\": \"type of document\"}\n\n\
     Example: {\"search_query\": \"financial report\", \"request_type\": \"quarterly report\"}"
        .to_string()
}

fn build_interpret_user_prompt(body: &str) -> String {
    format!("Email body:\n{body}")
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse the model's intent. `None` when no usable search query is present.
fn parse_intent(raw: &str) -> Option<SearchIntent> {
    let value = extract_json_object(raw)?;
    let search_query = value
        .get("search_query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())?
        .to_string();
    let request_type = value
        .get("request_type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(FALLBACK_REQUEST_TYPE)
        .to_string();
    Some(SearchIntent {
        search_query,
        request_type,
    })
}

/// Intent used when the model output cannot be parsed.
pub fn fallback_intent(body: &str) -> SearchIntent {
    SearchIntent {
        search_query: body.chars().take(FALLBACK_QUERY_CHARS).collect(),
        request_type: FALLBACK_REQUEST_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{LlmError, StoreError};
    use crate::llm::provider::{CompletionResponse, FinishReason};
    use crate::store::InMemoryDocumentStore;

    /// Mock LLM that returns a fixed response.
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

    /// Document store that remembers every query it receives.
    #[derive(Default)]
    struct RecordingStore {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn search(&self, query: &str) -> Result<Vec<Document>, StoreError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(vec![])
        }
    }

    fn interpreter(response: &str, store: Arc<dyn DocumentStore>) -> RequestInterpreter {
        let llm: Arc<dyn LlmProvider> = Arc::new(FixedLlm {
            response: response.to_string(),
        });
        RequestInterpreter::new(llm, store, 500)
    }

    #[tokio::test]
    async fn parsed_intent_drives_search() {
        let interpreter = interpreter(
            r#"{"search_query": "API documentation", "request_type": "technical docs"}"#,
            Arc::new(InMemoryDocumentStore::seeded()),
        );

        let result = interpreter
            .interpret("Hey, I need the API documentation for the new endpoints.")
            .await
            .unwrap();
        assert!(!result.used_fallback);
        assert_eq!(result.intent.search_query, "API documentation");
        assert_eq!(result.intent.request_type, "technical docs");
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].id, "doc_002");
    }

    #[tokio::test]
    async fn prose_output_falls_back_to_body_prefix() {
        let store = Arc::new(RecordingStore::default());
        let interpreter = interpreter("I think they want some kind of report.", store.clone());
        let body = "Could you please send me the latest quarterly numbers for the board deck?";

        let result = interpreter.interpret(body).await.unwrap();
        let expected: String = body.chars().take(50).collect();
        assert!(result.used_fallback);
        assert_eq!(result.intent.search_query, expected);
        assert_eq!(result.intent.request_type, "document");
        assert_eq!(store.queries.lock().unwrap().as_slice(), [expected]);
    }

    #[tokio::test]
    async fn blank_search_query_falls_back() {
        let store = Arc::new(RecordingStore::default());
        let interpreter = interpreter(r#"{"search_query": "  ", "request_type": "x"}"#, store);

        let result = interpreter.interpret("short body").await.unwrap();
        assert!(result.used_fallback);
        assert_eq!(result.intent.search_query, "short body");
        assert_eq!(result.intent.request_type, "document");
    }

    #[test]
    fn fenced_output_parses() {
        let intent =
            parse_intent("```json\n{\"search_query\": \"playbook\", \"request_type\": \"guide\"}\n```")
                .unwrap();
        assert_eq!(intent.search_query, "playbook");
        assert_eq!(intent.request_type, "guide");
    }

    #[test]
    fn missing_request_type_defaults() {
        let intent = parse_intent(r#"{"search_query": "onboarding"}"#).unwrap();
        assert_eq!(intent.request_type, "document");
    }

    #[test]
    fn fallback_counts_characters_not_bytes() {
        let body = "é".repeat(80);
        let intent = fallback_intent(&body);
        assert_eq!(intent.search_query.chars().count(), 50);
    }

    #[test]
    fn step_records_query_and_count() {
        let interpretation = Interpretation {
            intent: SearchIntent {
                search_query: "financial report".into(),
                request_type: "report".into(),
            },
            documents: crate::store::memory::seed_documents()[..1].to_vec(),
            used_fallback: true,
        };
        let step = interpretation.to_step();
        assert_eq!(step.agent, "Doc Finder");
        assert_eq!(step.status, "complete");
        assert_eq!(step.data["search_query"], "financial report");
        assert_eq!(step.data["documents_found"], 1);
        assert_eq!(step.data["documents"][0], "Q4 2024 Financial Report");
        assert_eq!(step.data["used_fallback"], true);
    }

    #[test]
    fn user_prompt_contains_body() {
        let prompt = build_interpret_user_prompt("need the playbook");
        assert!(prompt.contains("need the playbook"));
        assert!(build_interpret_system_prompt().contains("search_query"));
    }
}
