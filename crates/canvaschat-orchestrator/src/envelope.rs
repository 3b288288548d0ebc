//! Envelope validator.
//!
//! Pure and total: every input maps to either a parsed envelope or the
//! original text tagged as unstructured. Nothing here panics or logs.

use canvaschat_core::types::ResponseEnvelope;

/// Outcome of validating raw provider output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    /// The text is exactly one envelope object.
    Envelope(ResponseEnvelope),
    /// Anything else; carries the original text unchanged.
    Unstructured(String),
}

impl Validation {
    pub fn into_envelope(self) -> Option<ResponseEnvelope> {
        match self {
            Validation::Envelope(envelope) => Some(envelope),
            Validation::Unstructured(_) => None,
        }
    }
}

/// Strictly parse `raw` as a `{responsetype, response}` object.
///
/// Surrounding whitespace is tolerated and unknown extra fields are ignored.
/// Code fences, leading prose, a missing field, a blank `response`, or a
/// `responsetype` other than `"text"`/`"html"` all yield `Unstructured`.
/// `response` is not sanitized.
pub fn validate(raw: &str) -> Validation {
    match serde_json::from_str::<ResponseEnvelope>(raw.trim()) {
        Ok(envelope) if !envelope.response.trim().is_empty() => Validation::Envelope(envelope),
        _ => Validation::Unstructured(raw.to_string()),
    }
}
