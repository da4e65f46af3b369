//! Services module
//!
//! Collaborators invoked through the sentinel's breakers

pub mod scraper;

pub use scraper::{ScrapeInvocation, ScriptOutput, ScriptRunner};
