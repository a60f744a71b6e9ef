/// Core library for the Quantis adaptive session planning and enrichment service.
///
/// This crate contains the canonical taxonomy resolver, question store,
/// LLM gateway, enrichment pipeline, quality verifier, mastery tracker,
/// adaptive planner, and session orchestrator, along with shared
/// configuration and error types used by the server and CLI binaries.
pub mod config;
pub mod enrichment;
pub mod error;
pub mod llm;
pub mod mastery;
pub mod orchestrator;
pub mod planner;
pub mod storage;
pub mod taxonomy;
pub mod verifier;

pub use error::*;

/// Returns the version of the quantis-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
