/*!
 * # subalign - oracle-driven subtitle alignment
 *
 * Reconciles a noisy candidate transcript (for example an automatic speech
 * transcript) with an authoritative anchor subtitle track, producing one
 * candidate segment per anchor segment with the anchor's timing.
 *
 * ## Features
 *
 * - Time-overlap model grouping anchor and candidate segments into sync groups
 * - Five refinement stages consulting an external oracle:
 *   distribute, shift, merge, proof and translate
 * - Oracles backed by chat models:
 *   - Ollama (local LLM)
 *   - OpenAI API (and LM Studio)
 *   - Anthropic API
 * - Replay of recorded test cases, answer caching and case recording
 * - Block splitting with bounded concurrency
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `series`: subtitle segments and SRT I/O
 * - `text_utils`: character-level text helpers
 * - `alignment`: the alignment engine:
 *   - `alignment::overlap`: overlap matrix
 *   - `alignment::sync_group`: sync groups and their index arithmetic
 *   - `alignment::state`: the immutable alignment state
 *   - `alignment::stages`: the five oracle-driven stages
 *   - `alignment::aligner`: the convergence loop
 *   - `alignment::blocks`: block splitting and the block runner
 * - `oracle`: the oracle trait and its implementations
 * - `corpus`: persisted query/answer test cases
 * - `providers`: chat provider clients
 * - `app_config`: configuration management
 * - `app_controller`: main application controller
 * - `errors`: custom error types
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod alignment;
pub mod app_config;
pub mod app_controller;
pub mod corpus;
pub mod errors;
pub mod oracle;
pub mod providers;
pub mod series;
pub mod text_utils;

// Re-export main types for easier usage
pub use alignment::{Aligner, Alignment, BlockAligner, OverlapMatrix, SyncGroup};
pub use app_config::Config;
pub use app_controller::Controller;
pub use corpus::{Corpus, CorpusStore, TestCase};
pub use errors::{AlignmentError, AppError, CorpusError, OracleError, ProviderError};
pub use oracle::{Oracle, Stage};
pub use series::{Segment, Series};
