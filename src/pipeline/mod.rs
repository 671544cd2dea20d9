//! Document request pipeline.
//!
//! Every inbound email flows through three model-backed stages:
//! 1. `RequestInterpreter::interpret()` — email body → search intent → candidates
//! 2. `AccessReviewer::decide()` — requester + candidates → approve/deny
//! 3. `ReplyComposer::compose()` — decision → drafted reply
//!
//! `DocumentPipeline` runs them in order and short-circuits with a canned
//! reply when the search finds nothing.
//!
//! **Unparseable access decisions are denials.** Nothing downstream may
//! re-derive or override the decision.

pub mod access;
pub mod composer;
pub mod extract;
pub mod interpreter;
pub mod orchestrator;
pub mod types;

pub use access::{AccessReviewer, Review};
pub use composer::{Reply, ReplyComposer, select_document};
pub use interpreter::{Interpretation, RequestInterpreter};
pub use orchestrator::{DocumentPipeline, PipelineConfig};
pub use types::*;
