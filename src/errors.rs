/*!
 * Error types for the subalign library.
 *
 * This module contains custom error types for the different layers of the
 * aligner, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: chat provider transport and API failures
 * - `OracleError`: a decision source could not produce a usable answer
 * - `AlignmentError`: fatal structural problems that abort a block
 * - `CorpusError`: test case corpus persistence and validation
 * - `AppError`: application-level wrapper used by the controller
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors raised by an oracle when it cannot answer a query.
///
/// None of these abort an alignment: every stage degrades the affected
/// decision to its deterministic fallback.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The underlying chat provider failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The answer could not be parsed into the stage's answer type
    #[error("Unparsable {stage} answer: {message}")]
    Unparsable {
        /// Stage name
        stage: String,
        /// Parse failure details
        message: String,
    },

    /// A replaying oracle has no recorded answer for the query
    #[error("No recorded {stage} answer for query: {query}")]
    NoAnswer {
        /// Stage name
        stage: String,
        /// Literal query JSON
        query: String,
    },

    /// The answer broke the stage's invariant
    #[error("{stage} answer violates its contract: {message}")]
    ContractViolation {
        /// Stage name
        stage: String,
        /// Which invariant failed
        message: String,
    },
}

/// Fatal errors that abort the alignment of one block.
///
/// Every variant carries `dump`, the rendered overlap matrix, scaled overlap
/// and sync groups at the time of failure.
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// Sync-group cardinality or index invariant violated
    #[error("Structural error: {message}\n{dump}")]
    Structural {
        /// What went wrong
        message: String,
        /// State dump
        dump: String,
    },

    /// A candidate is ambiguous against an unsupported number of anchors
    #[error("Candidate {candidate} is ambiguous against {rows:?}; only 0 or 2 anchors are supported\n{dump}")]
    UnsupportedAmbiguity {
        /// Candidate index
        candidate: usize,
        /// Anchor rows above the ambiguity threshold
        rows: Vec<usize>,
        /// State dump
        dump: String,
    },

    /// Distribution and shifting did not reach a stable state
    #[error("Alignment did not converge after {iterations} iterations\n{dump}")]
    NotConverged {
        /// Number of iterations attempted
        iterations: usize,
        /// State dump
        dump: String,
    },

    /// A segment split was requested at an offset outside the text
    #[error("Cannot split segment of {length} characters at offset {offset}")]
    InvalidSplit {
        /// Requested character offset
        offset: usize,
        /// Character length of the segment text
        length: usize,
    },

    /// A block failed; wraps the block's own error
    #[error("Block {index} failed: {source}")]
    Block {
        /// Block index
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<AlignmentError>,
    },
}

/// Errors that can occur while loading, validating or saving a test case corpus
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Filesystem failure
    #[error("Corpus I/O error at {path}: {message}")]
    Io {
        /// Offending path
        path: String,
        /// Error message
        message: String,
    },

    /// Malformed JSON record
    #[error("Corpus JSON error in {path}: {source}")]
    Json {
        /// Offending path
        path: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// A record fails its own invariant
    #[error("Invalid {stage} test case #{index} in block '{block}': {message}")]
    Invalid {
        /// Block name
        block: String,
        /// Stage name
        stage: String,
        /// Position within the stage list
        index: usize,
        /// Why it is invalid
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from alignment
    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    /// Error from the corpus
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),
}
