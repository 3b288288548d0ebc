//! Capability prompt composer.
//!
//! Builds the instruction text sent to providers: a fixed base describing the
//! text/HTML envelope, plus one usage snippet per auxiliary capability whose
//! credential is present. Deterministic for a given credential set.

use std::sync::Arc;

use canvaschat_core::credentials::{env_key_for, CredentialProvider};

/// Base instructions: envelope format, when to use HTML, styling.
pub const BASE_INSTRUCTIONS: &str = r#"You are an AI assistant that responds either with text or with HTML fragments.
When responding with HTML, make sure the fragment:
1. Is completely self-contained, including all JavaScript it needs
2. Matches the dark theme of the host application (bg-gray-800, text-gray-200, etc.)
3. Uses modern, rounded UI elements with proper padding and spacing
4. Includes input validation and error handling where appropriate
5. Gives clear feedback for user interactions
6. Uses semantic HTML and ARIA attributes for accessibility

Respond in JSON format with:
{
  "responsetype": "text" or "html",
  "response": "your response here"
}

Choose HTML fragments for interactive scenarios such as calculators, maps, or forms.
Choose text for informational responses such as emails or explanations.

Scenarios that call for HTML fragments:

Net salary calculator: input fields for gross salary, tax class, church tax and
similar; JavaScript implementing the tax calculation; a clear result display; a
disclaimer when figures are approximate.

Travel weather map: an OpenLayers/OpenStreetMap map with color-coded markers
(green/yellow/red), weather details in overlays, highlighted regions and
interactive tooltips.

Music review generator: Accept/Neutral/Reject buttons, checkboxes for song
aspects (melody, vocals, beat), and review text generated from the selections.

Styling classes: bg-gray-800 for dark backgrounds, text-gray-200 for light text,
rounded-lg for corners, p-4 for padding, hover:bg-gray-700 for hover states,
border-gray-700 for borders. For example:
<div class="bg-gray-800 text-gray-200 p-4 rounded-lg border border-gray-700">
  <input class="bg-gray-700 text-gray-200 p-2 rounded-md border border-gray-600">
  <button class="bg-accent hover:bg-accent/90 text-white px-4 py-2 rounded-md">
</div>"#;

/// Instructions for the review/formatter step.
const FORMATTER_INSTRUCTIONS: &str = r#"You are a response formatter. Another assistant answered the user's message below but did not use the required JSON envelope.
Rewrite its output as exactly one envelope:
- "html" when the output contains an interactive fragment or code meant to run in the page. Put the complete, self-contained fragment in "response": inline all scripts and styles, drop markdown fences and surrounding prose, and keep the code's behavior unchanged.
- "text" when the output is prose. Put the prose in "response" unchanged.
Do not add new functionality and do not answer the user yourself.

The other assistant was working under these instructions:"#;

// ─────────────────────────────────────────────
// Auxiliary capabilities
// ─────────────────────────────────────────────

/// An auxiliary API a generated fragment may call when its key is configured.
#[derive(Clone, Debug)]
pub struct Capability {
    /// Short name used in prompt headings (e.g. `"search"`).
    pub name: &'static str,
    /// Credential name (e.g. `"brave"` → `BRAVE_API_KEY`).
    pub credential: &'static str,
    /// Usage snippet appended to the prompt.
    pub snippet: &'static str,
}

impl Capability {
    pub fn env_key(&self) -> String {
        env_key_for(self.credential)
    }
}

/// Built-in capabilities, in the fixed order they are appended.
pub static CAPABILITIES: &[Capability] = &[
    Capability {
        name: "search",
        credential: "brave",
        snippet: r#"Fragments may search the web with the Brave Search API:
const res = await fetch('https://api.search.brave.com/res/v1/web/search?q=' + encodeURIComponent(query), {
  headers: { 'Accept': 'application/json', 'X-Subscription-Token': localStorage.getItem('BRAVE_API_KEY') }
});
const data = await res.json();
// data.web.results: [{ title, url, description }]
Show a loading state while searching and a readable message if the request fails."#,
    },
    Capability {
        name: "speech",
        credential: "elevenlabs",
        snippet: r#"Fragments may speak text aloud with the ElevenLabs text-to-speech API:
const res = await fetch('https://api.elevenlabs.io/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM', {
  method: 'POST',
  headers: { 'Content-Type': 'application/json', 'xi-api-key': localStorage.getItem('ELEVENLABS_API_KEY') },
  body: JSON.stringify({ text, model_id: 'eleven_multilingual_v2' })
});
const audio = new Audio(URL.createObjectURL(await res.blob()));
audio.play();
Offer an explicit play button; never autoplay."#,
    },
    Capability {
        name: "image",
        credential: "replicate",
        snippet: r#"Fragments may generate images with the Replicate API:
const res = await fetch('https://api.replicate.com/v1/models/black-forest-labs/flux-schnell/predictions', {
  method: 'POST',
  headers: {
    'Content-Type': 'application/json',
    'Authorization': 'Bearer ' + localStorage.getItem('REPLICATE_API_KEY'),
    'Prefer': 'wait'
  },
  body: JSON.stringify({ input: { prompt } })
});
const prediction = await res.json();
// prediction.output[0] is the image URL
Show a placeholder while the image is generated."#,
    },
];

// ─────────────────────────────────────────────
// Composer
// ─────────────────────────────────────────────

/// Appends capability snippets to base instructions based on which keys exist.
#[derive(Clone)]
pub struct PromptComposer {
    credentials: Arc<dyn CredentialProvider>,
}

impl PromptComposer {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { credentials }
    }

    /// Capabilities whose credential is currently present, in fixed order.
    pub fn enabled_capabilities(&self) -> Vec<&'static Capability> {
        CAPABILITIES
            .iter()
            .filter(|cap| self.credentials.is_present(cap.credential))
            .collect()
    }

    /// `base` followed by one section per enabled capability.
    ///
    /// Enabling a capability only ever appends its section; sections already
    /// present keep their content and relative order.
    pub fn compose(&self, base: &str) -> String {
        let mut prompt = base.to_string();
        for capability in self.enabled_capabilities() {
            prompt.push_str("\n\n## Capability: ");
            prompt.push_str(capability.name);
            prompt.push_str("\n\n");
            prompt.push_str(capability.snippet);
        }
        prompt
    }
}

/// System prompt for the formatter, with the original instructions as context.
pub fn formatter_prompt(capability_prompt: &str) -> String {
    format!("{FORMATTER_INSTRUCTIONS}\n\n---\n\n{capability_prompt}")
}

/// User message for the formatter: the original request and the raw output.
pub fn formatter_message(user_message: &str, raw_output: &str) -> String {
    format!(
        "User message:\n{user_message}\n\n\
         Output to reformat:\n{raw_output}"
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use canvaschat_core::credentials::StaticCredentials;

    fn composer(creds: StaticCredentials) -> PromptComposer {
        PromptComposer::new(Arc::new(creds))
    }

    #[test]
    fn test_no_capabilities_returns_base() {
        let prompt = composer(StaticCredentials::new()).compose(BASE_INSTRUCTIONS);
        assert_eq!(prompt, BASE_INSTRUCTIONS);
    }

    #[test]
    fn test_single_capability_appends_snippet() {
        let prompt = composer(StaticCredentials::new().with("elevenlabs", "el")).compose("BASE");
        assert!(prompt.starts_with("BASE\n\n## Capability: speech\n\n"));
        assert!(prompt.ends_with(CAPABILITIES[1].snippet));
        assert!(!prompt.contains("Capability: search"));
    }

    #[test]
    fn test_enabling_capability_strictly_appends() {
        let base = "BASE";
        let search_only = composer(StaticCredentials::new().with("brave", "b")).compose(base);
        let search_and_image = composer(
            StaticCredentials::new()
                .with("brave", "b")
                .with("replicate", "r"),
        )
        .compose(base);
        let all = composer(
            StaticCredentials::new()
                .with("brave", "b")
                .with("elevenlabs", "e")
                .with("replicate", "r"),
        )
        .compose(base);

        assert!(search_and_image.starts_with(&search_only));
        assert!(all.starts_with(&search_only));
        // speech slots between search and image, image keeps its text
        let image_section = format!("## Capability: image\n\n{}", CAPABILITIES[2].snippet);
        assert!(search_and_image.ends_with(&image_section));
        assert!(all.ends_with(&image_section));
    }

    #[test]
    fn test_fixed_capability_order() {
        let prompt = composer(
            StaticCredentials::new()
                .with("replicate", "r")
                .with("brave", "b")
                .with("elevenlabs", "e"),
        )
        .compose("");
        let search = prompt.find("Capability: search").unwrap();
        let speech = prompt.find("Capability: speech").unwrap();
        let image = prompt.find("Capability: image").unwrap();
        assert!(search < speech && speech < image);
    }

    #[test]
    fn test_compose_is_deterministic() {
        let c = composer(StaticCredentials::new().with("brave", "b"));
        assert_eq!(c.compose(BASE_INSTRUCTIONS), c.compose(BASE_INSTRUCTIONS));
    }

    #[test]
    fn test_blank_credential_does_not_enable() {
        let c = composer(StaticCredentials::new().with("brave", " "));
        assert!(c.enabled_capabilities().is_empty());
    }

    #[test]
    fn test_snippets_read_their_own_key() {
        for capability in CAPABILITIES {
            assert!(
                capability.snippet.contains(&capability.env_key()),
                "{} snippet should reference {}",
                capability.name,
                capability.env_key()
            );
        }
    }

    #[test]
    fn test_base_instructions_describe_envelope() {
        assert!(BASE_INSTRUCTIONS.contains("\"responsetype\""));
        assert!(BASE_INSTRUCTIONS.contains("\"response\""));
    }

    #[test]
    fn test_formatter_prompt_carries_context() {
        let prompt = formatter_prompt("ORIGINAL INSTRUCTIONS");
        assert!(prompt.starts_with(FORMATTER_INSTRUCTIONS));
        assert!(prompt.ends_with("ORIGINAL INSTRUCTIONS"));
    }

    #[test]
    fn test_formatter_message() {
        let msg = formatter_message("make a timer", "```html\n<div></div>\n```");
        assert!(msg.contains("make a timer"));
        assert!(msg.ends_with("```html\n<div></div>\n```"));
    }
}
