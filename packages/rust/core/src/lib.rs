//! Core pipeline orchestration and the registration assistant.
//!
//! This crate ties together fetching, extraction and normalization into the
//! `collect` pipeline that writes the knowledge base, and provides the
//! assistant that answers questions from it.

pub mod agent;
pub mod knowledge_base;
pub mod llm;
pub mod pipeline;

pub use agent::{Agent, Conversation, load_knowledge_base, system_prompt};
pub use knowledge_base::{KeyTermCheck, KnowledgeBase, QualityReport, quality_report};
pub use llm::{AnthropicClient, Completion, CompletionClient, CompletionRequest, Message, Role};
pub use pipeline::{
    CollectResult, FailureReason, ProgressReporter, SilentProgress, SourceReport, SourceStatus,
    collect, collect_with,
};
