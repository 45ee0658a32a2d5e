//! Recognising `qid:<id>` terms inside query strings.
//!
//! Clients substitute a stored query with a term such as `qid:1380082337371`
//! (optionally quoted, `qid:"1380082337371"`). The first such term in a query
//! selects the stored entry.

use regex::Regex;
use std::sync::OnceLock;

/// Get the qid term regex pattern.
///
/// We capture:
/// - Group 1: the numeric id
///
/// Quotes around the id are optional and not captured.
fn qid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"qid:"?([0-9]+)"?"#).expect("Valid regex"))
}

/// Extract the first qid from a query string.
///
/// Returns `None` when the query holds no qid term, or the id does not fit
/// in a `u64`.
///
/// # Examples
///
/// ```
/// use biocache_cache::qid::parse_qid;
///
/// assert_eq!(parse_qid("qid:1380082337371"), Some(1380082337371));
/// assert_eq!(parse_qid(r#"qid:"42" AND year:2010"#), Some(42));
/// assert_eq!(parse_qid("taxon_name:Acacia"), None);
/// ```
pub fn parse_qid(query: &str) -> Option<u64> {
    if !query.contains("qid:") {
        return None;
    }

    qid_pattern()
        .captures(query)
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
}
