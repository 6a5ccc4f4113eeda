use super::topic_matcher::topic_matches;

// Helper asserting one (topic name, topic filter) pair in one mode.
fn assert_match(
	topic_name: &str,
	topic_filter: &str,
	exact_match_only: bool,
	expected: bool,
) {
	assert_eq!(
		topic_matches(topic_name, topic_filter, exact_match_only),
		expected,
		"topic '{}' against filter '{}' (exact_match_only: {})",
		topic_name,
		topic_filter,
		exact_match_only
	);
}

#[test]
fn exact_matching() {
	assert_match("/exact", "/exact", true, true);
	assert_match("/exact", "/exact", false, true);

	// Wildcard characters are ordinary literals in exact mode.
	assert_match("/aws/+", "/aws/+", true, true);
	assert_match("/aws/iot", "/aws/+", true, false);
	assert_match("#", "#", true, true);
	assert_match("/aws", "#", true, false);
}

#[test]
fn single_level_wildcards() {
	assert_match("/aws", "/+", false, true);
	assert_match("/aws/iot", "/aws/+", false, true);
	assert_match("/aws/iot/shadow", "/aws/+/shadow", false, true);
	assert_match("/aws/iot/shadow", "/aws/+/+", false, true);

	// Empty levels are real levels and '+' covers them.
	assert_match("aws/", "aws/+", false, true);
	assert_match("/aws", "+/+", false, true);
	assert_match("aws//iot", "aws/+/iot", false, true);
	assert_match("aws//iot", "aws//+", false, true);
	assert_match("aws///iot", "aws/+/+/iot", false, true);
}

#[test]
fn multi_level_wildcards() {
	assert_match("/aws/iot/shadow", "#", false, true);
	assert_match("aws/iot/shadow", "#", false, true);
	assert_match("/aws/iot/shadow", "/#", false, true);
	assert_match("aws/iot/shadow", "aws/iot/#", false, true);
	assert_match("aws/iot/shadow/thing", "aws/iot/#", false, true);

	// '#' also matches its own level, so the parent topic is covered.
	assert_match("aws", "aws/#", false, true);
}

#[test]
fn combined_wildcards() {
	assert_match("aws/iot/shadow/thing/temp", "aws/+/shadow/#", false, true);
	assert_match("aws/iot/shadow", "iot/+/#", false, false);
}

#[test]
fn filter_and_topic_length_mismatches() {
	assert_match("/short", "/toolong", true, false);
	assert_match("/short", "/toolong", false, false);

	// Substrings do not match.
	assert_match("aws/", "aws/iot", true, false);
	assert_match("aws/", "aws/iot", false, false);
	assert_match("aws", "aws/", false, false);

	// Topic longer than a non-'#' filter accounts for.
	assert_match("aws/iot/shadow", "aws/+", false, false);
	assert_match("aws/iot/shadow", "aws/+/thing", false, false);
	assert_match("/aws", "+", false, false);
}

#[test]
fn case_sensitive() {
	assert_match("/exact", "/eXaCt", true, false);
	assert_match("/exact", "/ExAcT", false, false);
}

#[test]
fn hash_must_be_terminal_to_wildcard() {
	assert_match("aws/iot/shadow", "iot/#", false, false);
	assert_match("aws/iot", "/#", false, false);

	// A non-terminal '#' is a literal level, not a wildcard.
	assert_match("a/#/b", "a/#/b", false, true);
	assert_match("a/x/b", "a/#/b", false, false);
}
