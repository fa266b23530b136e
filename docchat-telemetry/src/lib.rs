//! Logging and span capture for docchat.
//!
//! [`init_telemetry`] installs a stderr subscriber filtered by `RUST_LOG`.
//! [`SpanCapture`] keeps closed spans in memory so tests and the CLI can
//! inspect the stages of a query (`rag.condense`, `rag.embed`,
//! `rag.retrieve`, `rag.generate`) and how long each took.

mod capture;
mod init;

pub use capture::{CaptureLayer, SpanCapture, SpanRecord};
pub use init::{LogFormat, TelemetryConfig, init_telemetry, try_init};
