//! Response orchestration for Canvaschat.
//!
//! # Architecture
//!
//! - [`envelope::validate`] — raw text → envelope or `Unstructured`
//! - [`prompt::PromptComposer`] — base instructions plus capability snippets
//! - [`signal::contains_executable_signal`] — decides whether unstructured output is worth repairing
//! - [`sequencer::Orchestrator`] — ordered fallback across provider adapters with one repair step

pub mod envelope;
pub mod prompt;
pub mod report;
pub mod sequencer;
pub mod signal;

pub use envelope::{validate, Validation};
pub use prompt::{PromptComposer, BASE_INSTRUCTIONS, CAPABILITIES};
pub use report::{AttemptRecord, AttemptResult, OrchestrationReport, Outcome};
pub use sequencer::{
    credential_required_message, Orchestrator, OrchestratorSettings, EMPTY_MESSAGE_REPLY,
    GENERIC_FAILURE_MESSAGE,
};
pub use signal::contains_executable_signal;
