//! # Prospector Core
//!
//! Core library for the Prospector company-research engine.
//! Provides the staged research pipeline, the defensive JSON extractor that
//! coerces model output into typed report schemas, the evidence aggregator,
//! the follow-up grounding engine, and the fundamental job/report types.

pub mod config;
pub mod error;
pub mod evidence;
pub mod export;
pub mod extract;
pub mod grounding;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod sanitize;
pub mod search;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{
    AppConfig, LlmConfig, RetryConfig, SearchConfig, ServerConfig, StorageConfig, load_config,
};
pub use error::{JobError, LlmError, ProspectorError, Result, SearchError};
pub use evidence::{ContextLimits, EvidenceAggregator, EvidenceBundle, QueryCategory};
pub use grounding::{FollowupEngine, FollowupOutcome};
pub use pipeline::ResearchPipeline;
pub use provider::{GenerationProvider, OpenAiCompatProvider, with_retry};
pub use search::{
    SearchClient, SearchProvider, SearchQuery, SearchResult, SearchTopic, SearxngClient, TimeRange,
};
pub use store::{InMemoryJobStore, JobStore};
pub use types::{
    Job, JobKind, JobStatus, Message, QaEntry, ResearchReport, Role, Tier, QUESTION_QUOTA,
};
