//! Fallback sequencer — tries providers in order until one yields an envelope.
//!
//! Candidates are the optional providers whose credentials are present, in
//! configured order, followed by the mandatory primary. Calls are strictly
//! sequential and the first valid (or repaired) envelope wins. Unstructured
//! output that looks like code is handed to the formatter once; anything else
//! falls through to the next candidate.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use canvaschat_core::config::schema::OrchestratorConfig;
use canvaschat_core::credentials::{env_key_for, CredentialProvider};
use canvaschat_core::types::{ConversationTurn, ResponseEnvelope};
use canvaschat_providers::registry::ProviderRole;
use canvaschat_providers::traits::{AdapterOutput, ProviderAdapter, ProviderRequest};

use crate::envelope::{validate, Validation};
use crate::prompt::{formatter_message, formatter_prompt, PromptComposer, BASE_INSTRUCTIONS};
use crate::report::{AttemptRecord, AttemptResult, OrchestrationReport, Outcome};
use crate::signal::{contains_executable_signal, SignalDetector};

/// Returned when no candidate (or repair) produced an envelope.
pub const GENERIC_FAILURE_MESSAGE: &str = "Sorry, there was an error processing your request.";

/// Returned for a blank message.
pub const EMPTY_MESSAGE_REPLY: &str = "Please enter a message.";

/// Text shown when the primary credential is missing.
pub fn credential_required_message(primary: &str) -> String {
    format!(
        "An API key is required. Set {} to start chatting.",
        env_key_for(primary)
    )
}

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Provider priority. Configuration, not a hardwired constant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Mandatory provider; always the last candidate.
    pub primary: String,
    /// Provider used for repair. `None` means the primary.
    pub formatter: Option<String>,
    /// Optional providers, tried first in this order.
    pub fallback_order: Vec<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            primary: config.primary.trim().to_lowercase(),
            formatter: config
                .formatter
                .as_deref()
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty()),
            fallback_order: config
                .fallback_order
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn formatter_name(&self) -> &str {
        self.formatter.as_deref().unwrap_or(&self.primary)
    }

    /// Full candidate order: fallbacks without the primary or duplicates,
    /// then the primary.
    pub fn chain(&self) -> Vec<String> {
        let mut chain: Vec<String> = Vec::with_capacity(self.fallback_order.len() + 1);
        for name in &self.fallback_order {
            if name.is_empty() || *name == self.primary || chain.contains(name) {
                continue;
            }
            chain.push(name.clone());
        }
        chain.push(self.primary.clone());
        chain
    }
}

// ─────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────

/// A provider ready to be called for this orchestration.
struct Candidate {
    name: String,
    adapter: Arc<dyn ProviderAdapter>,
    credential: String,
}

/// Sole entry point for turning a user message into a `ResponseEnvelope`.
pub struct Orchestrator {
    credentials: Arc<dyn CredentialProvider>,
    settings: OrchestratorSettings,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    composer: PromptComposer,
    signal_detector: SignalDetector,
}

impl Orchestrator {
    pub fn new(credentials: Arc<dyn CredentialProvider>, settings: OrchestratorSettings) -> Self {
        Self {
            composer: PromptComposer::new(credentials.clone()),
            credentials,
            settings,
            adapters: HashMap::new(),
            signal_detector: contains_executable_signal,
        }
    }

    /// Register an adapter under its profile name, replacing any previous one.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters
            .insert(adapter.profile().name.to_string(), adapter);
        self
    }

    /// Replace the "looks like code" predicate that gates repair.
    pub fn with_signal_detector(mut self, detector: SignalDetector) -> Self {
        self.signal_detector = detector;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Base instructions plus snippets for the capabilities configured right now.
    pub fn capability_prompt(&self) -> String {
        self.composer.compose(BASE_INSTRUCTIONS)
    }

    /// Names of the providers that would be tried right now, in order.
    pub fn candidate_names(&self) -> Vec<String> {
        self.candidates().into_iter().map(|c| c.name).collect()
    }

    /// Answer `message`. Always returns a well-formed envelope.
    pub async fn send_message(&self, message: &str, history: &[ConversationTurn]) -> ResponseEnvelope {
        self.run(message, history).await.envelope
    }

    /// Answer `message` and report every call made along the way.
    pub async fn run(&self, message: &str, history: &[ConversationTurn]) -> OrchestrationReport {
        if message.trim().is_empty() {
            return OrchestrationReport {
                envelope: ResponseEnvelope::text(EMPTY_MESSAGE_REPLY),
                outcome: Outcome::EmptyMessage,
                attempts: Vec::new(),
            };
        }

        if !self.credentials.is_present(&self.settings.primary) {
            warn!(
                provider = %self.settings.primary,
                "Primary credential missing, not contacting any provider"
            );
            return OrchestrationReport {
                envelope: ResponseEnvelope::text(credential_required_message(&self.settings.primary)),
                outcome: Outcome::CredentialMissing,
                attempts: Vec::new(),
            };
        }

        let system = self.capability_prompt();
        let request = ProviderRequest::new(&system, history, message);
        let candidates = self.candidates();
        let mut attempts = Vec::new();

        debug!(
            candidates = ?candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            history = history.len(),
            "Starting orchestration"
        );

        for candidate in &candidates {
            let raw = match candidate.adapter.call(&candidate.credential, &request).await {
                Err(e) => {
                    if e.is_auth() {
                        warn!(provider = %candidate.name, error = %e, "Credential rejected, trying next");
                    } else {
                        warn!(provider = %candidate.name, error = %e, "Provider failed, trying next");
                    }
                    attempts.push(AttemptRecord::new(&candidate.name, AttemptResult::Failed(e.to_string())));
                    continue;
                }
                Ok(AdapterOutput::Structured(envelope)) => {
                    attempts.push(AttemptRecord::new(&candidate.name, AttemptResult::Envelope));
                    return self.answered(&candidate.name, envelope, false, attempts);
                }
                Ok(AdapterOutput::Text(raw)) => raw,
            };

            let raw = match validate(&raw) {
                Validation::Envelope(envelope) => {
                    attempts.push(AttemptRecord::new(&candidate.name, AttemptResult::Envelope));
                    return self.answered(&candidate.name, envelope, false, attempts);
                }
                Validation::Unstructured(raw) => raw,
            };
            attempts.push(AttemptRecord::new(&candidate.name, AttemptResult::Unstructured));

            if (self.signal_detector)(&raw) {
                info!(
                    provider = %candidate.name,
                    formatter = self.settings.formatter_name(),
                    "Unstructured output contains code, routing to formatter"
                );
                return self.repair(&candidate.name, &system, message, &raw, attempts).await;
            }

            warn!(
                provider = %candidate.name,
                chars = raw.len(),
                "Unstructured output without code signal, trying next"
            );
        }

        warn!(attempts = attempts.len(), "Fallback chain exhausted");
        OrchestrationReport {
            envelope: ResponseEnvelope::text(GENERIC_FAILURE_MESSAGE),
            outcome: Outcome::Exhausted,
            attempts,
        }
    }

    /// Ask the formatter to rewrite `raw` as an envelope. Ends the orchestration.
    async fn repair(
        &self,
        source: &str,
        capability_prompt: &str,
        message: &str,
        raw: &str,
        mut attempts: Vec<AttemptRecord>,
    ) -> OrchestrationReport {
        let formatter = self.settings.formatter_name();
        let system = formatter_prompt(capability_prompt);
        let formatter_input = formatter_message(message, raw);
        let request = ProviderRequest::new(&system, &[], &formatter_input);

        let result = match (self.adapters.get(formatter), self.credentials.get(formatter)) {
            (Some(adapter), Some(credential)) => match adapter.call(&credential, &request).await {
                Ok(AdapterOutput::Structured(envelope)) => Ok(envelope),
                Ok(AdapterOutput::Text(text)) => validate(&text)
                    .into_envelope()
                    .ok_or_else(|| "formatter output is not an envelope".to_string()),
                Err(e) => Err(e.to_string()),
            },
            (None, _) => Err("no adapter registered for formatter".to_string()),
            (_, None) => Err("formatter credential missing".to_string()),
        };

        match result {
            Ok(envelope) => {
                attempts.push(AttemptRecord::new(formatter, AttemptResult::Repaired));
                self.answered(source, envelope, true, attempts)
            }
            Err(reason) => {
                warn!(formatter, reason = %reason, "Repair failed");
                attempts.push(AttemptRecord::new(formatter, AttemptResult::RepairFailed(reason)));
                OrchestrationReport {
                    envelope: ResponseEnvelope::text(GENERIC_FAILURE_MESSAGE),
                    outcome: Outcome::Unrepairable,
                    attempts,
                }
            }
        }
    }

    fn answered(
        &self,
        provider: &str,
        envelope: ResponseEnvelope,
        repaired: bool,
        attempts: Vec<AttemptRecord>,
    ) -> OrchestrationReport {
        info!(
            provider,
            repaired,
            responsetype = envelope.responsetype.as_str(),
            calls = attempts.len(),
            "Response ready"
        );
        OrchestrationReport {
            envelope,
            outcome: Outcome::Answered {
                provider: provider.to_string(),
                repaired,
            },
            attempts,
        }
    }

    /// Providers to try now: configured chain filtered by credential and adapter.
    fn candidates(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for name in self.settings.chain() {
            let Some(credential) = self.credentials.get(&name) else {
                debug!(provider = %name, "No credential, skipping");
                continue;
            };
            let Some(adapter) = self.adapters.get(&name) else {
                warn!(provider = %name, "Credential present but no adapter registered, skipping");
                continue;
            };
            if adapter.profile().role == ProviderRole::FormatterOnly {
                debug!(provider = %name, "Formatter-only provider, skipping");
                continue;
            }
            candidates.push(Candidate {
                name,
                adapter: adapter.clone(),
                credential,
            });
        }
        candidates
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use canvaschat_core::credentials::StaticCredentials;
    use canvaschat_providers::registry::{find_by_name, ProviderFamily, ProviderProfile};
    use canvaschat_providers::traits::AdapterError;

    /// Adapter that always gives the same reply and records what it was sent.
    struct MockAdapter {
        profile: &'static ProviderProfile,
        reply: Result<AdapterOutput, AdapterError>,
        /// (credential, system, message) per call.
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl MockAdapter {
        fn new(name: &str, reply: Result<AdapterOutput, AdapterError>) -> Arc<Self> {
            Arc::new(Self {
                profile: find_by_name(name).unwrap(),
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn structured(name: &str, envelope: ResponseEnvelope) -> Arc<Self> {
            Self::new(name, Ok(AdapterOutput::Structured(envelope)))
        }

        fn text(name: &str, raw: &str) -> Arc<Self> {
            Self::new(name, Ok(AdapterOutput::Text(raw.to_string())))
        }

        fn failing(name: &str) -> Arc<Self> {
            Self::new(
                name,
                Err(AdapterError::Rejected {
                    status: 503,
                    body: "overloaded".into(),
                }),
            )
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> (String, String, String) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        async fn call(
            &self,
            credential: &str,
            request: &ProviderRequest<'_>,
        ) -> Result<AdapterOutput, AdapterError> {
            self.calls.lock().unwrap().push((
                credential.to_string(),
                request.system.to_string(),
                request.message.to_string(),
            ));
            self.reply.clone()
        }

        fn profile(&self) -> &'static ProviderProfile {
            self.profile
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    fn orchestrator(creds: StaticCredentials) -> Orchestrator {
        Orchestrator::new(Arc::new(creds), OrchestratorSettings::default())
    }

    fn all_keys() -> StaticCredentials {
        StaticCredentials::new()
            .with("anthropic", "sk-ant")
            .with("groq", "gsk")
            .with("deepseek", "dsk")
            .with("openai", "sk-oai")
    }

    const FENCED: &str = "Here is your timer:\n```html\n<div id=\"t\"></div>\n<script>start()</script>\n```";

    #[tokio::test]
    async fn test_missing_primary_makes_no_calls() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("hi"));
        let groq = MockAdapter::structured("groq", ResponseEnvelope::text("hi"));
        let orch = orchestrator(StaticCredentials::new().with("groq", "gsk"))
            .with_adapter(anthropic.clone())
            .with_adapter(groq.clone());

        let report = orch.run("hello", &[]).await;

        assert_eq!(report.outcome, Outcome::CredentialMissing);
        assert!(report.attempts.is_empty());
        assert_eq!(report.envelope, ResponseEnvelope::text(credential_required_message("anthropic")));
        assert!(report.envelope.response.contains("ANTHROPIC_API_KEY"));
        assert_eq!(anthropic.call_count() + groq.call_count(), 0);
    }

    #[tokio::test]
    async fn test_primary_only_single_call_unchanged() {
        let envelope = ResponseEnvelope::html("<div class=\"bg-gray-800\">calc</div>");
        let anthropic = MockAdapter::structured("anthropic", envelope.clone());
        let groq = MockAdapter::structured("groq", ResponseEnvelope::text("unused"));
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "sk-ant"))
            .with_adapter(anthropic.clone())
            .with_adapter(groq.clone());

        let report = orch.run("build a calculator", &[]).await;

        assert_eq!(report.envelope, envelope);
        assert_eq!(anthropic.call_count(), 1);
        assert_eq!(groq.call_count(), 0);
        assert_eq!(
            report.outcome,
            Outcome::Answered {
                provider: "anthropic".into(),
                repaired: false
            }
        );
        // credential is read at call time and handed to the adapter
        assert_eq!(anthropic.last_call().0, "sk-ant");
    }

    #[tokio::test]
    async fn test_fenced_fast_output_is_repaired_by_formatter() {
        let repaired = ResponseEnvelope::html("<div id=\"t\"></div><script>start()</script>");
        let anthropic = MockAdapter::structured("anthropic", repaired.clone());
        let groq = MockAdapter::text("groq", FENCED);
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "sk-ant").with("groq", "gsk"))
            .with_adapter(anthropic.clone())
            .with_adapter(groq.clone());

        let report = orch.run("make a timer", &[]).await;

        assert_eq!(report.envelope, repaired);
        assert_eq!(
            report.outcome,
            Outcome::Answered {
                provider: "groq".into(),
                repaired: true
            }
        );
        assert_eq!(groq.call_count(), 1);
        // the only primary call is the repair
        assert_eq!(anthropic.call_count(), 1);
        let (_, system, formatter_input) = anthropic.last_call();
        assert!(system.starts_with("You are a response formatter."));
        assert!(system.ends_with(&orch.capability_prompt()));
        assert!(formatter_input.contains(FENCED));
        assert!(formatter_input.contains("make a timer"));
        assert_eq!(
            report.attempts,
            vec![
                AttemptRecord::new("groq", AttemptResult::Unstructured),
                AttemptRecord::new("anthropic", AttemptResult::Repaired),
            ]
        );
    }

    #[tokio::test]
    async fn test_prose_falls_through_without_formatter() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("from primary"));
        let groq = MockAdapter::text("groq", "Sure! The capital of France is Paris.");
        let deepseek = MockAdapter::text("deepseek", r#"{"responsetype":"text","response":"Paris."}"#);
        let orch = orchestrator(
            StaticCredentials::new()
                .with("anthropic", "sk-ant")
                .with("groq", "gsk")
                .with("deepseek", "dsk"),
        )
        .with_adapter(anthropic.clone())
        .with_adapter(groq.clone())
        .with_adapter(deepseek.clone());

        let report = orch.run("capital of France?", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::text("Paris."));
        assert_eq!(groq.call_count(), 1);
        assert_eq!(deepseek.call_count(), 1);
        assert_eq!(anthropic.call_count(), 0);
        assert_eq!(
            report.outcome,
            Outcome::Answered {
                provider: "deepseek".into(),
                repaired: false
            }
        );
    }

    #[tokio::test]
    async fn test_blank_envelope_falls_through_to_primary() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("real answer"));
        let groq = MockAdapter::text("groq", r#"{"responsetype":"text","response":""}"#);
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "sk-ant").with("groq", "gsk"))
            .with_adapter(anthropic.clone())
            .with_adapter(groq.clone());

        let report = orch.run("hello", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::text("real answer"));
        assert_eq!(
            report.outcome,
            Outcome::Answered {
                provider: "anthropic".into(),
                repaired: false
            }
        );
        assert_eq!(report.attempts[0], AttemptRecord::new("groq", AttemptResult::Unstructured));
        assert_eq!(groq.call_count(), 1);
        assert_eq!(anthropic.call_count(), 1);
    }

    /// A reviewer that may only repair output, never answer.
    static REVIEWER: ProviderProfile = ProviderProfile {
        name: "reviewer",
        display_name: "Reviewer",
        family: ProviderFamily::OpenAiCompatible,
        role: ProviderRole::FormatterOnly,
        default_api_base: "http://localhost",
        default_model: "reviewer-1",
        structured_output: false,
        json_mode: true,
    };

    #[tokio::test]
    async fn test_formatter_only_provider_is_never_a_candidate() {
        let reviewer = Arc::new(MockAdapter {
            profile: &REVIEWER,
            reply: Ok(AdapterOutput::Text(
                r#"{"responsetype":"html","response":"<div id=\"t\"></div>"}"#.to_string(),
            )),
            calls: Mutex::new(Vec::new()),
        });
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("primary"));
        let orch = Orchestrator::new(
            Arc::new(
                StaticCredentials::new()
                    .with("anthropic", "sk-ant")
                    .with("groq", "gsk")
                    .with("reviewer", "rv"),
            ),
            OrchestratorSettings {
                formatter: Some("reviewer".into()),
                fallback_order: vec!["reviewer".into(), "groq".into()],
                ..Default::default()
            },
        )
        .with_adapter(reviewer.clone())
        .with_adapter(anthropic.clone())
        .with_adapter(MockAdapter::text("groq", FENCED));

        assert_eq!(orch.candidate_names(), vec!["groq", "anthropic"]);

        let report = orch.run("make a timer", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::html("<div id=\"t\"></div>"));
        assert_eq!(
            report.attempts,
            vec![
                AttemptRecord::new("groq", AttemptResult::Unstructured),
                AttemptRecord::new("reviewer", AttemptResult::Repaired),
            ]
        );
        // called once, as the formatter
        assert_eq!(reviewer.call_count(), 1);
        assert!(reviewer.last_call().1.starts_with("You are a response formatter."));
        assert_eq!(anthropic.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_advance_to_primary() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("primary"));
        let groq = MockAdapter::failing("groq");
        let openai = MockAdapter::failing("openai");
        let orch = orchestrator(
            StaticCredentials::new()
                .with("anthropic", "sk-ant")
                .with("groq", "gsk")
                .with("openai", "sk-oai"),
        )
        .with_adapter(anthropic.clone())
        .with_adapter(groq.clone())
        .with_adapter(openai.clone());

        let report = orch.run("hi", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::text("primary"));
        assert_eq!(report.attempts.len(), 3);
        assert!(matches!(report.attempts[0].result, AttemptResult::Failed(_)));
        assert_eq!(report.attempts[1].provider, "openai");
        assert_eq!(report.attempts[2].provider, "anthropic");
    }

    #[tokio::test]
    async fn test_all_failing_returns_generic_failure() {
        let orch = orchestrator(all_keys())
            .with_adapter(MockAdapter::failing("anthropic"))
            .with_adapter(MockAdapter::text("groq", "no structure here"))
            .with_adapter(MockAdapter::failing("deepseek"))
            .with_adapter(MockAdapter::text("openai", "still prose"));

        let report = orch.run("hi", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::text(GENERIC_FAILURE_MESSAGE));
        assert_eq!(report.outcome, Outcome::Exhausted);
        assert_eq!(report.attempts.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_repair_is_generic_failure_and_short_circuits() {
        let anthropic = MockAdapter::failing("anthropic");
        let groq = MockAdapter::text("groq", FENCED);
        let deepseek = MockAdapter::structured("deepseek", ResponseEnvelope::text("never asked"));
        let orch = orchestrator(all_keys())
            .with_adapter(anthropic.clone())
            .with_adapter(groq.clone())
            .with_adapter(deepseek.clone());

        let report = orch.run("timer", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::text(GENERIC_FAILURE_MESSAGE));
        assert_eq!(report.outcome, Outcome::Unrepairable);
        assert_eq!(deepseek.call_count(), 0);
        assert_eq!(anthropic.call_count(), 1);
        assert!(matches!(
            report.attempts.last().unwrap().result,
            AttemptResult::RepairFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_free_text_formatter_output_is_validated() {
        let orch = Orchestrator::new(
            Arc::new(all_keys()),
            OrchestratorSettings {
                formatter: Some("openai".into()),
                fallback_order: vec!["groq".into()],
                ..Default::default()
            },
        )
        .with_adapter(MockAdapter::structured("anthropic", ResponseEnvelope::text("unused")))
        .with_adapter(MockAdapter::text("groq", FENCED))
        .with_adapter(MockAdapter::text("openai", "```html\n<div></div>\n```"));

        let report = orch.run("timer", &[]).await;
        assert_eq!(report.outcome, Outcome::Unrepairable);

        let orch = Orchestrator::new(
            Arc::new(all_keys()),
            OrchestratorSettings {
                formatter: Some("openai".into()),
                fallback_order: vec!["groq".into()],
                ..Default::default()
            },
        )
        .with_adapter(MockAdapter::structured("anthropic", ResponseEnvelope::text("unused")))
        .with_adapter(MockAdapter::text("groq", FENCED))
        .with_adapter(MockAdapter::text(
            "openai",
            r#"{"responsetype":"html","response":"<div></div>"}"#,
        ));

        let report = orch.run("timer", &[]).await;
        assert_eq!(report.envelope, ResponseEnvelope::html("<div></div>"));
        assert_eq!(report.attempts[1], AttemptRecord::new("openai", AttemptResult::Repaired));
    }

    #[tokio::test]
    async fn test_primary_repairing_itself_still_validates() {
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "sk-ant"))
            .with_adapter(MockAdapter::text("anthropic", FENCED));

        let report = orch.run("timer", &[]).await;

        // formatter is the primary itself, returning the same fenced text
        assert_eq!(report.outcome, Outcome::Unrepairable);
        assert_eq!(report.calls_to("anthropic"), 2);
    }

    #[tokio::test]
    async fn test_custom_signal_detector() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("primary"));
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "sk-ant").with("groq", "gsk"))
            .with_adapter(anthropic.clone())
            .with_adapter(MockAdapter::text("groq", FENCED))
            .with_signal_detector(|_| false);

        let report = orch.run("timer", &[]).await;

        // no repair: groq falls through and the primary answers as a candidate
        assert_eq!(report.envelope, ResponseEnvelope::text("primary"));
        assert_eq!(anthropic.call_count(), 1);
        assert!(!anthropic.last_call().1.starts_with("You are a response formatter."));
    }

    #[tokio::test]
    async fn test_send_message_is_idempotent() {
        let orch = orchestrator(all_keys())
            .with_adapter(MockAdapter::structured("anthropic", ResponseEnvelope::text("primary")))
            .with_adapter(MockAdapter::text("groq", "prose"))
            .with_adapter(MockAdapter::text("deepseek", r#"{"responsetype":"text","response":"ds"}"#));
        let history = vec![ConversationTurn::user("a"), ConversationTurn::assistant("b")];

        let first = orch.send_message("again", &history).await;
        let second = orch.send_message("again", &history).await;
        assert_eq!(first, second);
        assert_eq!(first, ResponseEnvelope::text("ds"));
    }

    #[tokio::test]
    async fn test_empty_message_makes_no_calls() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("x"));
        let orch = orchestrator(all_keys()).with_adapter(anthropic.clone());

        let report = orch.run("   ", &[]).await;
        assert_eq!(report.outcome, Outcome::EmptyMessage);
        assert_eq!(report.envelope, ResponseEnvelope::text(EMPTY_MESSAGE_REPLY));
        assert_eq!(anthropic.call_count(), 0);
    }

    #[tokio::test]
    async fn test_system_prompt_includes_capabilities() {
        let anthropic = MockAdapter::structured("anthropic", ResponseEnvelope::text("x"));
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "k").with("brave", "b"))
            .with_adapter(anthropic.clone());

        orch.run("search something", &[]).await;
        let (_, system, _) = anthropic.last_call();
        assert!(system.starts_with(BASE_INSTRUCTIONS));
        assert!(system.contains("## Capability: search"));
    }

    #[tokio::test]
    async fn test_http_adapters_repair_fenced_output() {
        use canvaschat_providers::{create_adapter, AdapterSettings};
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let groq_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": FENCED}}]
            })))
            .expect(1)
            .mount(&groq_server)
            .await;

        let anthropic_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_1",
                    "name": "respond",
                    "input": {"responsetype": "html", "response": "<div id=\"t\"></div>"}
                }],
                "stop_reason": "tool_use"
            })))
            .expect(1)
            .mount(&anthropic_server)
            .await;

        let adapter = |name: &str, server: &MockServer| {
            let settings = AdapterSettings {
                api_base: Some(server.uri()),
                ..Default::default()
            };
            create_adapter(find_by_name(name).unwrap(), &settings)
        };

        let orch = orchestrator(
            StaticCredentials::new()
                .with("anthropic", "sk-ant-test")
                .with("groq", "gsk-test"),
        )
        .with_adapter(adapter("groq", &groq_server))
        .with_adapter(adapter("anthropic", &anthropic_server));

        let report = orch.run("make a timer", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::html("<div id=\"t\"></div>"));
        assert_eq!(
            report.outcome,
            Outcome::Answered {
                provider: "groq".into(),
                repaired: true
            }
        );
    }

    #[tokio::test]
    async fn test_http_failure_falls_back_to_primary() {
        use canvaschat_providers::{create_adapter, AdapterSettings};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let groq_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&groq_server)
            .await;

        let anthropic_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_2",
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_2",
                    "name": "respond",
                    "input": {"responsetype": "text", "response": "Hello!"}
                }],
                "stop_reason": "tool_use"
            })))
            .mount(&anthropic_server)
            .await;

        let settings_for = |server: &MockServer| AdapterSettings {
            api_base: Some(server.uri()),
            ..Default::default()
        };
        let orch = orchestrator(StaticCredentials::new().with("anthropic", "a").with("groq", "bad"))
            .with_adapter(create_adapter(find_by_name("groq").unwrap(), &settings_for(&groq_server)))
            .with_adapter(create_adapter(
                find_by_name("anthropic").unwrap(),
                &settings_for(&anthropic_server),
            ));

        let report = orch.run("hi", &[]).await;

        assert_eq!(report.envelope, ResponseEnvelope::text("Hello!"));
        match &report.attempts[0].result {
            AttemptResult::Failed(reason) => assert!(reason.contains("401")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_puts_primary_last_once() {
        let settings = OrchestratorSettings {
            primary: "anthropic".into(),
            formatter: None,
            fallback_order: vec![
                "anthropic".into(),
                "openai".into(),
                "groq".into(),
                "openai".into(),
            ],
        };
        assert_eq!(settings.chain(), vec!["openai", "groq", "anthropic"]);
        assert_eq!(settings.formatter_name(), "anthropic");
    }

    #[test]
    fn test_settings_from_config_normalizes_names() {
        let config = OrchestratorConfig {
            primary: " Anthropic ".into(),
            formatter: Some("".into()),
            fallback_order: vec!["GROQ".into()],
        };
        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.primary, "anthropic");
        assert!(settings.formatter.is_none());
        assert_eq!(settings.fallback_order, vec!["groq"]);
    }

    #[test]
    fn test_candidates_follow_credentials_and_adapters() {
        let orch = orchestrator(
            StaticCredentials::new()
                .with("anthropic", "k")
                .with("deepseek", "k")
                .with("openai", "k"),
        )
        .with_adapter(MockAdapter::structured("anthropic", ResponseEnvelope::text("x")))
        .with_adapter(MockAdapter::structured("groq", ResponseEnvelope::text("x")))
        .with_adapter(MockAdapter::structured("deepseek", ResponseEnvelope::text("x")));

        // groq lacks a key, openai lacks an adapter
        assert_eq!(orch.candidate_names(), vec!["deepseek", "anthropic"]);
    }
}
