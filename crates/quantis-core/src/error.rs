//! Error types for the Quantis core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from interacting with LLM providers (C3).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed as JSON (after fenced-code stripping).
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// LLM response was valid JSON but missing a required key or had a
    /// value outside its allowed range/enum.
    #[error("LLM response failed schema validation: {0}")]
    SchemaViolation(String),

    /// No LLM provider configured.
    #[error("no LLM provider configured")]
    NotConfigured,

    /// A call timed out past the configured hard timeout.
    #[error("LLM call timed out after {seconds}s")]
    Timeout {
        /// The configured timeout in seconds.
        seconds: u64,
    },

    /// Retry budget exhausted without a successful response.
    #[error("LLM call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: String,
    },
}

/// Errors from SQLite storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to SQLite database.
    #[error("database connection error: {source}")]
    Connection {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// Database migration failed.
    #[error("database migration error: {source}")]
    Migration {
        /// The underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// A database query failed.
    #[error("database query error: {source}")]
    Query {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// A row violates a storage-level invariant (e.g. band/score misalignment).
    #[error("data integrity violation: {message}")]
    Integrity {
        /// Details about the violated invariant.
        message: String,
    },
}

/// Errors from the canonical taxonomy resolver (C1).
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// No (category, subcategory, type) triple could be resolved, even via
    /// the deterministic (subcategory, type) -> category fallback.
    #[error("no canonical path found for subcategory '{subcategory}' / type '{type_of_question}'")]
    NoCanonicalPath {
        /// The free-text subcategory that failed to resolve.
        subcategory: String,
        /// The free-text type that failed to resolve.
        type_of_question: String,
    },

    /// The semantic-match LLM call itself failed.
    #[error("semantic match call failed: {0}")]
    MatchCallFailed(#[from] LlmError),
}

/// Failure kinds surfaced by an enrichment pipeline stage (§4.4, §7).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichmentFailureKind {
    /// The LLM round-trip for this stage exhausted retries.
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    /// The LLM response did not match the expected schema after retries.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// No canonical taxonomy triple could be resolved for this question.
    #[error("canonical classification miss: {0}")]
    CanonicalMiss(String),

    /// Band/score alignment could not be reconciled (band itself invalid).
    #[error("band/score reconciliation failed: {0}")]
    BandInvalid(String),
}

/// Structured per-stage failure detail, replacing exception-driven control
/// flow in the original pipeline (see Design Note §9).
#[derive(Debug, Clone, thiserror::Error)]
#[error("stage '{stage}' failed: {kind}")]
pub struct EnrichmentError {
    /// Which of the five pipeline stages failed.
    pub stage: String,
    /// The category of failure.
    pub kind: EnrichmentFailureKind,
}

/// Errors from the quality verifier (C5).
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// The semantic answer-match LLM call failed outright (not NO_MATCH —
    /// an actual call failure).
    #[error("semantic match call failed: {0}")]
    MatchCallFailed(#[from] LlmError),
}

/// Errors from the adaptive session planner (C7/C8).
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// The candidate pool could not be made feasible even after full ladder
    /// expansion and cap relaxation. The planner falls back to a seeded
    /// random pack rather than propagating this to the caller, but the
    /// condition is still recorded.
    #[error("candidate pool infeasible after full ladder expansion: {detail}")]
    PoolInfeasible {
        /// Which feasibility criterion could not be met.
        detail: String,
    },

    /// Underlying storage failure while building or querying the pool.
    #[error("planner storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the session lifecycle orchestrator (C9).
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The requested state transition is not valid from the session's
    /// current status.
    #[error("invalid transition for session {session_id}: {from} -> {event}")]
    InvalidTransition {
        /// The session identifier.
        session_id: String,
        /// The session's current status.
        from: String,
        /// The event that was rejected.
        event: String,
    },

    /// Underlying storage failure.
    #[error("orchestrator storage error: {0}")]
    Storage(#[from] StorageError),

    /// An attempt referenced a question that does not exist in the store.
    #[error("unknown question: {question_id}")]
    UnknownQuestion {
        /// The question id that could not be resolved.
        question_id: String,
    },
}
