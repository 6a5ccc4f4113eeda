//! Topic name / topic filter matching.
//!
//! A single traversal serves two callers: live dispatch, which needs
//! full MQTT wildcard semantics, and the registry, which needs literal
//! text comparison for duplicate detection and administrative
//! unsubscribe. Only the comparison mode differs.

/// Checks whether a topic name is covered by a topic filter.
///
/// With `exact_match_only` set, the two strings are compared
/// byte-for-byte and wildcard characters in the filter are ordinary
/// literals. Otherwise the filter is interpreted with MQTT wildcard
/// semantics:
///
/// - `+` matches exactly one topic level, including an empty one;
/// - `#` as the final filter level matches that level and everything
///   below it, including zero additional levels (`a/#` matches `a`);
/// - every other filter level must equal the corresponding topic level
///   exactly, case-sensitively.
///
/// Levels are produced by splitting on `/`; consecutive or
/// leading/trailing separators yield empty levels, which are matched
/// like any other level.
pub fn topic_matches(
	topic_name: &str,
	topic_filter: &str,
	exact_match_only: bool,
) -> bool {
	if exact_match_only {
		topic_name == topic_filter
	} else {
		wildcard_match(topic_name, topic_filter)
	}
}

/// Level-wise wildcard comparison of a topic name against a filter.
fn wildcard_match(topic_name: &str, topic_filter: &str) -> bool {
	let mut topic_levels = topic_name.split('/');
	let mut filter_levels = topic_filter.split('/').peekable();

	loop {
		let filter_level = match filter_levels.next() {
			| Some(level) => level,
			// Filter exhausted: a match only if the topic is too.
			| None => return topic_levels.next().is_none(),
		};

		// A terminal '#' swallows the rest of the topic, including the
		// case where the topic is already exhausted. A '#' anywhere
		// else has no wildcard meaning and is compared literally.
		if filter_level == "#" && filter_levels.peek().is_none() {
			return true;
		}

		match topic_levels.next() {
			// Topic exhausted before a non-terminal filter level.
			| None => return false,
			| Some(topic_level) => {
				if filter_level == "+" {
					continue;
				}
				if filter_level != topic_level {
					return false;
				}
			}
		}
	}
}
