//! Validation of topic filters and topic names.
//!
//! These checks are offered to the connection layer for use before a
//! Subscribe or Publish request is accepted. The registry itself never
//! validates: `add` dedups by literal filter text regardless of any
//! wildcard characters the filter contains.

use thiserror::Error;

/// Topic processing limits.
pub mod limits {
	/// Maximum topic nesting depth allowed.
	pub const MAX_TOPIC_DEPTH: usize = 32;

	/// Maximum total length of a topic filter or topic name.
	pub const MAX_FILTER_LENGTH: usize = 1024;
}

/// Errors reported when a topic filter or topic name is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
	/// Topic filters and topic names must be non-empty.
	#[error("topic filter cannot be empty")]
	Empty,

	/// The string exceeds [`limits::MAX_FILTER_LENGTH`].
	#[error("topic filter too long: {length} > {limit}")]
	TooLong { length: usize, limit: usize },

	/// The string has more levels than [`limits::MAX_TOPIC_DEPTH`].
	#[error("topic filter too deep: {depth} > {limit}")]
	TooDeep { depth: usize, limit: usize },

	/// A `+` wildcard must occupy an entire filter level.
	#[error("'+' must occupy an entire level in '{level}' at level {position}")]
	InvalidPlusLevel { level: String, position: usize },

	/// A `#` wildcard must be the final level and occupy it entirely.
	#[error("'#' must be the entire final level in '{level}' at level {position}")]
	InvalidHashLevel { level: String, position: usize },

	/// Topic names may not contain wildcard characters.
	#[error("wildcard '{level}' not allowed in topic name at level {position}")]
	WildcardInTopicName { level: String, position: usize },
}

impl FilterError {
	/// Creates a new InvalidPlusLevel error
	pub fn invalid_plus_level(level: impl Into<String>, position: usize) -> Self {
		Self::InvalidPlusLevel {
			level: level.into(),
			position,
		}
	}

	/// Creates a new InvalidHashLevel error
	pub fn invalid_hash_level(level: impl Into<String>, position: usize) -> Self {
		Self::InvalidHashLevel {
			level: level.into(),
			position,
		}
	}

	/// Returns the error type for categorization
	pub fn error_type(&self) -> &'static str {
		match self {
			| FilterError::Empty => "empty",
			| FilterError::TooLong { .. } => "too_long",
			| FilterError::TooDeep { .. } => "too_deep",
			| FilterError::InvalidPlusLevel { .. } => "invalid_plus_level",
			| FilterError::InvalidHashLevel { .. } => "invalid_hash_level",
			| FilterError::WildcardInTopicName { .. } => {
				"wildcard_in_topic_name"
			}
		}
	}
}

/// Checks shared by filters and names: emptiness, length and depth.
fn validate_basic(text: &str) -> Result<(), FilterError> {
	if text.is_empty() {
		return Err(FilterError::Empty);
	}

	if text.len() > limits::MAX_FILTER_LENGTH {
		return Err(FilterError::TooLong {
			length: text.len(),
			limit: limits::MAX_FILTER_LENGTH,
		});
	}

	let depth = text.split('/').count();
	if depth > limits::MAX_TOPIC_DEPTH {
		return Err(FilterError::TooDeep {
			depth,
			limit: limits::MAX_TOPIC_DEPTH,
		});
	}

	Ok(())
}

/// Validates a subscription topic filter.
///
/// Enforces the MQTT wildcard placement rules: `+` must stand alone in
/// its level, `#` must stand alone in the final level.
pub fn validate_topic_filter(filter: &str) -> Result<(), FilterError> {
	validate_basic(filter)?;

	let level_count = filter.split('/').count();
	for (position, level) in filter.split('/').enumerate() {
		if level.contains('+') && level != "+" {
			return Err(FilterError::invalid_plus_level(level, position));
		}

		if level.contains('#') && (level != "#" || position + 1 != level_count)
		{
			return Err(FilterError::invalid_hash_level(level, position));
		}
	}

	Ok(())
}

/// Validates a publish topic name, which may not contain wildcards.
pub fn validate_topic_name(topic_name: &str) -> Result<(), FilterError> {
	validate_basic(topic_name)?;

	for (position, level) in topic_name.split('/').enumerate() {
		if level.contains(['+', '#']) {
			return Err(FilterError::WildcardInTopicName {
				level: level.to_string(),
				position,
			});
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_well_formed_filters() {
		for filter in ["a", "a/b/c", "+", "+/+", "a/+/c", "#", "a/#", "a/+/#", "/", "//a"] {
			assert_eq!(validate_topic_filter(filter), Ok(()), "filter '{filter}'");
		}
	}

	#[test]
	fn rejects_misplaced_wildcards() {
		assert_eq!(
			validate_topic_filter("a+/b").unwrap_err().error_type(),
			"invalid_plus_level"
		);
		assert_eq!(
			validate_topic_filter("a/b+").unwrap_err().error_type(),
			"invalid_plus_level"
		);
		assert_eq!(
			validate_topic_filter("a/#/b").unwrap_err().error_type(),
			"invalid_hash_level"
		);
		assert_eq!(
			validate_topic_filter("a/b#").unwrap_err().error_type(),
			"invalid_hash_level"
		);
		assert_eq!(
			validate_topic_filter("#/a").unwrap_err().error_type(),
			"invalid_hash_level"
		);
	}

	#[test]
	fn rejects_empty_and_oversized() {
		assert_eq!(validate_topic_filter(""), Err(FilterError::Empty));
		assert_eq!(validate_topic_name(""), Err(FilterError::Empty));

		let long = "a".repeat(limits::MAX_FILTER_LENGTH + 1);
		assert_eq!(
			validate_topic_filter(&long).unwrap_err().error_type(),
			"too_long"
		);

		let deep = vec!["a"; limits::MAX_TOPIC_DEPTH + 1].join("/");
		assert_eq!(
			validate_topic_filter(&deep).unwrap_err().error_type(),
			"too_deep"
		);
	}

	#[test]
	fn topic_names_reject_wildcards() {
		assert_eq!(validate_topic_name("a/b/c"), Ok(()));
		assert_eq!(
			validate_topic_name("a/+/c").unwrap_err().error_type(),
			"wildcard_in_topic_name"
		);
		assert_eq!(
			validate_topic_name("a/b/#").unwrap_err().error_type(),
			"wildcard_in_topic_name"
		);
	}
}
