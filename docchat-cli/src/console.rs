//! Interactive chat loop and answer rendering.

use std::io::Write;

use docchat_rag::{ConversationMemory, QueryResult, RagError, RagPipeline};
use docchat_telemetry::SpanCapture;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Question(String),
    Reset,
    ToggleSources,
    Help,
    Exit,
    Empty,
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => ChatInput::Empty,
            "/reset" => ChatInput::Reset,
            "/sources" => ChatInput::ToggleSources,
            "/help" => ChatInput::Help,
            "/exit" | "/quit" => ChatInput::Exit,
            question => ChatInput::Question(question.to_string()),
        }
    }
}

const HELP: &str = "Type a question about your documents.\n  \
/sources  toggle source display\n  \
/reset    forget the conversation\n  \
/exit     quit";

/// Options for the chat session.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub show_sources: bool,
    pub timings: Option<SpanCapture>,
}

/// Run the interactive session until `/exit` or end of input.
pub async fn run_chat(pipeline: &RagPipeline, mut options: ChatOptions) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut memory = ConversationMemory::new();

    println!("{HELP}\n");

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => break,
            ChatInput::Help => println!("{HELP}"),
            ChatInput::Reset => {
                memory.clear();
                println!("Conversation cleared.");
            }
            ChatInput::ToggleSources => {
                options.show_sources = !options.show_sources;
                let state = if options.show_sources { "on" } else { "off" };
                println!("Sources {state}.");
            }
            ChatInput::Question(question) => {
                let _ = editor.add_history_entry(question.as_str());
                match pipeline.ask(&question, &mut memory).await {
                    Ok(result) => {
                        print_answer(&result, options.show_sources);
                        if let Some(capture) = &options.timings {
                            print_timings(capture);
                        }
                    }
                    Err(e) => eprintln!("{}", friendly_error(&e)),
                }
            }
        }
    }

    println!("Bye.");
    Ok(())
}

/// Print an answer, followed by its sources when requested.
pub fn print_answer(result: &QueryResult, show_sources: bool) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "\n{}\n", result.answer);
    if show_sources {
        let _ = out.write_all(format_sources(result).as_bytes());
    }
}

pub fn format_sources(result: &QueryResult) -> String {
    if result.sources.is_empty() {
        return "Sources: none\n".to_string();
    }
    let mut text = String::from("Sources:\n");
    for (i, source) in result.sources.iter().enumerate() {
        text.push_str(&format!("  [{}] {source}\n", i + 1));
    }
    text
}

/// Print the duration of each query stage and forget the recorded spans.
pub fn print_timings(capture: &SpanCapture) {
    for span in capture.spans() {
        println!("  {:<14} {:>8.1} ms", span.name, span.duration.as_secs_f64() * 1000.0);
    }
    capture.clear();
}

/// A short explanation of a failed turn for the person chatting.
pub fn friendly_error(error: &RagError) -> String {
    let reason = match error {
        RagError::InvalidArgument(_) => "Please type a question.".to_string(),
        RagError::Timeout { after, .. } => {
            format!("The model did not answer within {} seconds.", after.as_secs())
        }
        RagError::GenerationError { message, .. } => {
            format!("The model could not answer ({message}).")
        }
        RagError::EmbeddingError { message, .. } => {
            format!("The question could not be embedded ({message}).")
        }
        other => other.to_string(),
    };
    format!("Sorry, something went wrong. {reason} Your question was not added to the conversation.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_rag::SourceRef;
    use std::time::Duration;

    #[test]
    fn parses_commands_and_questions() {
        assert_eq!(ChatInput::parse("  /reset "), ChatInput::Reset);
        assert_eq!(ChatInput::parse("/sources"), ChatInput::ToggleSources);
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Exit);
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Exit);
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
        assert_eq!(
            ChatInput::parse(" What is X? "),
            ChatInput::Question("What is X?".to_string())
        );
    }

    #[test]
    fn sources_are_numbered_with_pages() {
        let result = QueryResult {
            answer: "42".into(),
            sources: vec![
                SourceRef { origin: "guide.pdf".into(), page: Some(3) },
                SourceRef { origin: "notes.md".into(), page: None },
            ],
            standalone_question: "q".into(),
        };
        assert_eq!(format_sources(&result), "Sources:\n  [1] guide.pdf (page 3)\n  [2] notes.md\n");
    }

    #[test]
    fn friendly_error_mentions_the_timeout() {
        let message = friendly_error(&RagError::Timeout {
            operation: "answer generation".into(),
            after: Duration::from_secs(60),
        });
        assert!(message.contains("60 seconds"));
        assert!(message.contains("not added"));
    }
}
