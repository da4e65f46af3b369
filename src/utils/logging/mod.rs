//! Structured logging
//!
//! Console output goes through `tracing`; the [`StructuredLogger`] adds
//! correlation contexts and daily JSON-lines files on top.

mod context;
mod entry;
mod file_logging;
mod init;
mod logger;

#[cfg(test)]
mod tests;

pub use context::{CorrelationContext, CorrelationStore};
pub use entry::{LogEntry, LogLevel};
pub use file_logging::DailyFileWriter;
pub use init::init_tracing;
pub use logger::StructuredLogger;
