//! Agent Runtime - the reasoning side of sfquery
//!
//! This crate turns a canonical Salesforce question into a raw answer:
//! - Classifies the question (permission check, visualization, data)
//! - Runs deterministic tools (field access, SOQL drafting, chart hints)
//! - Consults LLM roles for analysis, chart design, and final wording
//!
//! # Architecture
//!
//! 1. **Classification** (`classify`) - keyword routing
//! 2. **Tools** (`tools`, `permissions`, `soql`) - no network, no LLM
//! 3. **Crew** (`engine`) - `AgentCrew` implements `ReasoningEngine`
//! 4. **Dispatch** (`dispatcher`) - deadline and upstream error mapping
//! 5. **Pipeline** (`runtime`) - normalize, dispatch, format
//!
//! # Safety Principle
//!
//! The LLM never decides access. Field-level verdicts come from the
//! caller-supplied permission context; the model only names the field and
//! words the answer.

pub mod classify;
pub mod dispatcher;
pub mod engine;
pub mod llm;
pub mod permissions;
pub mod roles;
pub mod runtime;
pub mod soql;
pub mod tools;

pub use dispatcher::Dispatcher;
pub use engine::{AgentCrew, EngineError, ReasoningEngine};
pub use llm::{build_client, LlmClient, LlmError};
pub use runtime::AgentRuntime;
