//! Doc Courier — answers internal document requests with a three-agent
//! LLM pipeline: find the document, check access, draft the reply.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod repl;
pub mod store;
