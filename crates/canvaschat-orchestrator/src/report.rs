//! What happened during one orchestration, for tracing and tests.

use std::fmt;

use canvaschat_core::types::ResponseEnvelope;

/// How an orchestration ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A candidate (or the formatter on its behalf) produced the envelope.
    Answered {
        /// Candidate whose output was returned.
        provider: String,
        /// Whether the formatter rewrote that output.
        repaired: bool,
    },
    /// The message was blank; nothing was sent.
    EmptyMessage,
    /// The primary credential is absent; nothing was sent.
    CredentialMissing,
    /// The formatter could not turn code-bearing output into an envelope.
    Unrepairable,
    /// Every candidate failed or answered without structure.
    Exhausted,
}

impl Outcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered { .. })
    }
}

/// Result of one adapter call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptResult {
    /// Valid envelope, returned as is.
    Envelope,
    /// The adapter reported a failure.
    Failed(String),
    /// Free text that did not validate.
    Unstructured,
    /// The formatter produced a valid envelope.
    Repaired,
    /// The formatter failed or produced nothing usable.
    RepairFailed(String),
}

impl fmt::Display for AttemptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptResult::Envelope => write!(f, "envelope"),
            AttemptResult::Failed(reason) => write!(f, "failed: {reason}"),
            AttemptResult::Unstructured => write!(f, "unstructured"),
            AttemptResult::Repaired => write!(f, "repaired"),
            AttemptResult::RepairFailed(reason) => write!(f, "repair failed: {reason}"),
        }
    }
}

/// One provider call made during an orchestration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptRecord {
    pub provider: String,
    pub result: AttemptResult,
}

impl AttemptRecord {
    pub(crate) fn new(provider: &str, result: AttemptResult) -> Self {
        Self {
            provider: provider.to_string(),
            result,
        }
    }
}

/// The envelope returned to the caller plus how it was reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestrationReport {
    pub envelope: ResponseEnvelope,
    pub outcome: Outcome,
    /// Calls in the order they were made. Empty when nothing was sent.
    pub attempts: Vec<AttemptRecord>,
}

impl OrchestrationReport {
    /// Number of calls made to `provider`.
    pub fn calls_to(&self, provider: &str) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| attempt.provider == provider)
            .count()
    }
}
