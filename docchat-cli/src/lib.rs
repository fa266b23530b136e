//! The `docchat` command-line interface.
//!
//! - `docchat ingest [--force]` builds the index once from the documents directory
//! - `docchat ask <question>` answers one question without conversation memory
//! - `docchat chat` starts an interactive conversation

pub mod app;
pub mod cli;
pub mod console;

pub use app::{App, IngestOutcome};
pub use cli::{Cli, Command, GlobalArgs};
