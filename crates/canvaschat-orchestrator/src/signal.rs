//! Executable-code heuristic.
//!
//! When a free-text provider ignores the envelope format, output that looks
//! like code is worth sending to the formatter: it is probably an HTML/JS
//! fragment wrapped in prose or fences. Plain prose is not, and the
//! sequencer moves on to the next provider instead.

use std::sync::OnceLock;

use regex::Regex;

/// Patterns that mark text as carrying executable code.
const SIGNAL_PATTERNS: &[&str] = &[
    r"```",                                   // code fence
    r"(?i)<script\b",                         // inline script
    r"\bfunction\s*[A-Za-z_$]?[\w$]*\s*\(",   // function declaration / expression
    r"=>\s*\{",                               // arrow function body
    r"(?m)^\s*def\s+\w+\s*\(",                // python def
];

fn signal_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        SIGNAL_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Whether `text` contains a code fence, a `<script` tag, or a function definition.
pub fn contains_executable_signal(text: &str) -> bool {
    signal_regexes().iter().any(|re| re.is_match(text))
}

/// Signature of a pluggable signal detector.
pub type SignalDetector = fn(&str) -> bool;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(signal_regexes().len(), SIGNAL_PATTERNS.len());
    }

    #[test]
    fn test_code_fence() {
        assert!(contains_executable_signal("Here:\n```html\n<div></div>\n```"));
    }

    #[test]
    fn test_script_tag_case_insensitive() {
        assert!(contains_executable_signal("<div></div><SCRIPT>alert(1)</SCRIPT>"));
        assert!(contains_executable_signal("<script src=\"x.js\"></script>"));
    }

    #[test]
    fn test_named_and_anonymous_functions() {
        assert!(contains_executable_signal("function calculate(gross) { return gross; }"));
        assert!(contains_executable_signal("btn.onclick = function() { go(); }"));
        assert!(contains_executable_signal("const f = (a, b) => { return a + b; }"));
    }

    #[test]
    fn test_python_def() {
        assert!(contains_executable_signal("Try this:\ndef net_salary(gross):\n    pass"));
    }

    #[test]
    fn test_plain_prose_has_no_signal() {
        assert!(!contains_executable_signal("Dear Anna, thanks for the lovely dinner."));
        assert!(!contains_executable_signal("The function of the liver is detoxification."));
        assert!(!contains_executable_signal(""));
    }

    #[test]
    fn test_html_without_script_has_no_signal() {
        assert!(!contains_executable_signal("<p>Hello <b>world</b></p>"));
    }
}
