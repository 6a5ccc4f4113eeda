//! Topic handling module
//!
//! This module provides matching of topic names against subscription
//! topic filters, together with optional validation of filters and
//! names before they reach the subscription registry.

// Submodules
pub mod topic_matcher;
pub mod validation;

#[cfg(test)]
mod topic_matcher_tests;

// Re-export commonly used items for convenience
pub use topic_matcher::topic_matches;
pub use validation::{
	FilterError, limits, validate_topic_filter, validate_topic_name,
};
