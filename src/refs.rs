use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PATTERN: Regex = Regex::new(r"(?i)AB#([0-9]+)").unwrap();
}

/// A single work item reference matched in free text (e.g. "AB#123").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemRef {
    /// The matched token exactly as it appeared, case preserved.
    pub raw: String,
    /// The numeric work item id with the prefix stripped.
    pub id: u64,
}

/// Find all work item references in a block of text, in order of appearance.
///
/// Every call performs a fresh scan; no match state is shared between calls.
/// Duplicate references are returned as-is, deduplication is up to the caller.
pub fn find_all(text: &str) -> impl Iterator<Item = WorkItemRef> + '_ {
    PATTERN.captures_iter(text).filter_map(|caps| {
        let raw = caps.get(0)?.as_str().to_string();
        let id = caps.get(1)?.as_str().parse().ok()?;
        Some(WorkItemRef { raw, id })
    })
}

/// Check whether the text contains at least one work item reference,
/// without extracting any matches.
pub fn has_reference(text: &str) -> bool {
    PATTERN.is_match(text)
}
