//! Shared CLI helpers — path expansion, envelope printing, banner.

use std::path::PathBuf;

use colored::Colorize;

use canvaschat_core::types::ResponseEnvelope;
use canvaschat_core::utils::truncate_string;
use canvaschat_orchestrator::{AttemptResult, OrchestrationReport, Outcome};

/// Longest failure reason shown in a trace line.
const MAX_REASON_CHARS: usize = 120;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print a response envelope to stdout.
///
/// Text is printed as is. HTML fragments go in a labeled block so they can
/// be copied into a page.
pub fn print_envelope(envelope: &ResponseEnvelope) {
    println!();
    println!("{}", "🎨 Canvaschat".cyan().bold());
    if envelope.response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else if envelope.is_html() {
        println!("{}", "── html fragment ──".magenta());
        println!("{}", envelope.response);
        println!("{}", "── end fragment ──".magenta());
    } else {
        println!("{}", envelope.response);
    }
    println!();
}

/// Print the providers tried for one answer.
pub fn print_trace(report: &OrchestrationReport) {
    println!("{}", "Trace:".bold());
    if report.attempts.is_empty() {
        println!("  {}", "(no provider calls)".dimmed());
    }
    for (i, attempt) in report.attempts.iter().enumerate() {
        println!(
            "  {}. {:<10} {}",
            i + 1,
            attempt.provider,
            attempt_label(&attempt.result)
        );
    }
    println!("  {} {}", "→".dimmed(), outcome_label(&report.outcome));
    println!();
}

fn attempt_label(result: &AttemptResult) -> String {
    match result {
        AttemptResult::Envelope => "envelope".green().to_string(),
        AttemptResult::Repaired => "repaired".green().to_string(),
        AttemptResult::Unstructured => "unstructured".yellow().to_string(),
        AttemptResult::Failed(reason) => format!(
            "{} {}",
            "failed".red(),
            truncate_string(reason, MAX_REASON_CHARS).dimmed()
        ),
        AttemptResult::RepairFailed(reason) => format!(
            "{} {}",
            "repair failed".red(),
            truncate_string(reason, MAX_REASON_CHARS).dimmed()
        ),
    }
}

fn outcome_label(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Answered {
            provider,
            repaired: false,
        } => format!("answered by {provider}"),
        Outcome::Answered {
            provider,
            repaired: true,
        } => format!("answered by {provider} (repaired)"),
        Outcome::EmptyMessage => "empty message".to_string(),
        Outcome::CredentialMissing => "primary credential missing".to_string(),
        Outcome::Unrepairable => "repair failed".to_string(),
        Outcome::Exhausted => "all providers exhausted".to_string(),
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🎨 Canvaschat".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Type a message, \"/new\" to start over, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" spinner placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/foo/bar");
        assert!(result.ends_with("foo/bar"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        let result = expand_tilde("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn expand_tilde_relative() {
        let result = expand_tilde("relative/path");
        assert_eq!(result, PathBuf::from("relative/path"));
    }

    #[test]
    fn outcome_labels() {
        colored::control::set_override(false);
        assert_eq!(
            outcome_label(&Outcome::Answered {
                provider: "groq".into(),
                repaired: true
            }),
            "answered by groq (repaired)"
        );
        assert_eq!(outcome_label(&Outcome::Exhausted), "all providers exhausted");
    }

    #[test]
    fn attempt_label_truncates_reason() {
        colored::control::set_override(false);
        let label = attempt_label(&AttemptResult::Failed("x".repeat(500)));
        assert!(label.starts_with("failed "));
        assert!(label.len() < 140);
        assert!(label.ends_with("..."));
    }
}
