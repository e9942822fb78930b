/*!
 * Main test entry point for subalign
 */

// Common test utilities
pub mod common;

// Unit tests
mod unit {
    pub mod alignment_tests;
    pub mod config_tests;
    pub mod series_tests;
}

// Integration tests
mod integration {
    pub mod app_lifecycle_tests;
    pub mod llm_oracle_tests;
    pub mod pipeline_tests;
    pub mod replay_tests;
}
