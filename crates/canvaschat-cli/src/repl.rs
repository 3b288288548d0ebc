//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history. The
//! conversation lives here, not in the orchestrator: each answer is sent with
//! the turns so far and both sides are appended afterwards.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use canvaschat_core::types::{ConversationTurn, ResponseEnvelope};
use canvaschat_core::utils::get_history_path;
use canvaschat_orchestrator::Orchestrator;

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Clears the conversation.
const NEW_CHAT_COMMAND: &str = "/new";

/// Run the interactive REPL loop.
pub async fn run(orchestrator: Orchestrator, trace: bool) -> Result<()> {
    helpers::print_banner();

    let mut editor = create_editor()?;
    let mut history: Vec<ConversationTurn> = Vec::new();

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl-C
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                // Ctrl-D
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye! 👋");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if trimmed.eq_ignore_ascii_case(NEW_CHAT_COMMAND) {
            history.clear();
            println!("\nStarted a new conversation.\n");
            continue;
        }

        debug!(turns = history.len(), "processing input");
        helpers::print_thinking();

        let report = orchestrator.run(trimmed, &history).await;

        helpers::clear_thinking();
        helpers::print_envelope(&report.envelope);
        if trace {
            helpers::print_trace(&report);
        }

        if report.outcome.is_answered() {
            record_exchange(&mut history, trimmed, &report.envelope);
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Append the user message and the answer to the conversation.
///
/// Failed answers are not recorded, so a retry is not conditioned on an
/// apology.
fn record_exchange(history: &mut Vec<ConversationTurn>, message: &str, answer: &ResponseEnvelope) {
    history.push(ConversationTurn::user(message));
    history.push(ConversationTurn::assistant(answer.response.clone()));
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = get_history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = get_history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
