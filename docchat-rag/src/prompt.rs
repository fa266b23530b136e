//! Prompt assembly for answering and for condensing follow-up questions.

use std::fmt::Write;

use crate::document::SearchResult;
use crate::memory::Turn;

/// Instruction placed at the top of every answer prompt.
pub const ANSWER_INSTRUCTION: &str = "You are a helpful assistant answering questions about a \
collection of documents. Answer using only the context below. If the context does not contain \
enough information to answer, say that you don't know instead of making up an answer.";

/// Instruction placed at the top of every condense prompt.
pub const CONDENSE_INSTRUCTION: &str = "Given the conversation below and a follow-up question, \
rewrite the follow-up question as a single standalone question that can be understood without \
the conversation. Keep the original language. Reply with the standalone question only.";

/// Keep the last `max_turns` turns, or all of them when `max_turns` is `None`.
pub fn window(history: &[Turn], max_turns: Option<usize>) -> &[Turn] {
    match max_turns {
        Some(max) if history.len() > max => &history[history.len() - max..],
        _ => history,
    }
}

/// Render history as `Role: text` lines, oldest first.
pub fn format_history(history: &[Turn]) -> String {
    let mut out = String::new();
    for turn in history {
        let _ = writeln!(out, "{}: {}", turn.role.label(), turn.text);
    }
    out
}

/// Prompt asking the model to rewrite `question` as a standalone question.
pub fn condense_prompt(history: &[Turn], question: &str) -> String {
    format!(
        "{CONDENSE_INSTRUCTION}\n\nConversation:\n{}\nFollow-up question: {question}\nStandalone question:",
        format_history(history)
    )
}

/// Prompt asking the model to answer `question` from `context`.
///
/// `history` is included only when non-empty.
pub fn answer_prompt(question: &str, context: &[SearchResult], history: &[Turn]) -> String {
    let mut prompt = String::from(ANSWER_INSTRUCTION);

    prompt.push_str("\n\nContext:\n");
    if context.is_empty() {
        prompt.push_str("(no relevant context was found)\n");
    }
    for (i, result) in context.iter().enumerate() {
        let source = result.chunk.source_ref();
        let _ = writeln!(prompt, "[{}] ({source})\n{}\n", i + 1, result.chunk.text.trim());
    }

    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        prompt.push_str(&format_history(history));
    }

    let _ = write!(prompt, "\nQuestion: {question}\nAnswer:");
    prompt
}
