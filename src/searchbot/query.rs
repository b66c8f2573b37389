//! Query construction: tag merging, option defaults, index selection.

use rand::Rng;

use crate::searchbot::error::SearchError;
use crate::searchbot::store::GroupConfig;

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_SORT_FIELD: &str = "score";
pub const DEFAULT_SORT_DIR: &str = "desc";
/// Negative index means "pick uniformly at random among returned results".
pub const DEFAULT_INDEX: i64 = -1;
pub const DEFAULT_DISTANCE: f64 = 0.25;
/// Reverse searches matching more results than this are asked to narrow.
pub const REVERSE_MATCH_LIMIT: usize = 10;

/// Paging and ordering options for a tag search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub per_page: u32,
    pub page: u32,
    pub sort_field: String,
    pub sort_dir: String,
    pub index: i64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            page: DEFAULT_PAGE,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_dir: DEFAULT_SORT_DIR.to_string(),
            index: DEFAULT_INDEX,
        }
    }
}

/// A fully built tag query, ready for the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct TagQuery {
    pub tags: Vec<String>,
    pub options: SearchOptions,
}

impl TagQuery {
    /// Comma-joined tag expression as sent in the `q` parameter.
    pub fn expression(&self) -> String {
        self.tags.join(", ")
    }
}

/// Merge group, global and user tags into one deduplicated list.
///
/// Order is group tags, then global tags (only when the group opted in),
/// then user tags, keeping the first occurrence of each.
pub fn merge_tags(
    group_tags: &[String],
    global_tags: &[String],
    use_global: bool,
    user_tags: &[String],
) -> Vec<String> {
    let global: &[String] = if use_global { global_tags } else { &[] };

    let mut merged: Vec<String> = Vec::new();
    for tag in group_tags.iter().chain(global).chain(user_tags) {
        if !merged.iter().any(|t| t == tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Build a tag query for a group, or report that there is nothing to search.
pub fn build_tag_query(
    config: &GroupConfig,
    global_tags: &[String],
    user_tags: &[String],
    options: SearchOptions,
) -> Result<TagQuery, SearchError> {
    let tags = merge_tags(&config.custom_tags, global_tags, config.use_global_tags, user_tags);

    if tags.is_empty() {
        return Err(SearchError::NoCriteria);
    }

    Ok(TagQuery { tags, options })
}

/// Parse the optional distance parameter of a reverse search.
///
/// Empty input selects the default. Anything non-numeric is a user input
/// error, not a transport error.
pub fn parse_distance(input: &str) -> Result<f64, SearchError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(DEFAULT_DISTANCE);
    }
    input
        .parse::<f64>()
        .map_err(|_| SearchError::InvalidDistance(input.to_string()))
}

/// Pick the result index for a page of `len` results.
///
/// Returns `None` for an empty page. An in-range requested index is used
/// as-is. An out-of-range non-negative index falls back to a uniformly
/// random valid index and sets the advisory flag; a negative index means
/// "random" and is never advisory.
pub fn pick_index(requested: i64, len: usize) -> Option<(usize, bool)> {
    if len == 0 {
        return None;
    }
    if requested >= 0 && (requested as usize) < len {
        return Some((requested as usize, false));
    }

    let random = rand::thread_rng().gen_range(0..len);
    Some((random, requested >= 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(tags: &[&str], use_global: bool) -> GroupConfig {
        GroupConfig {
            id: 1,
            group_id: "-100123".to_string(),
            enabled: true,
            use_global_tags: use_global,
            custom_tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn strings(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_merge_order_and_dedup() {
        let merged = merge_tags(
            &strings(&["pony", "safe"]),
            &strings(&["safe", "cute"]),
            true,
            &strings(&["cute", "solo"]),
        );
        assert_eq!(merged, strings(&["pony", "safe", "cute", "solo"]));
    }

    #[test]
    fn test_merge_skips_global_when_opted_out() {
        let merged = merge_tags(&strings(&["pony"]), &strings(&["safe"]), false, &strings(&["solo"]));
        assert_eq!(merged, strings(&["pony", "solo"]));
    }

    #[test]
    fn test_build_empty_is_no_criteria() {
        let err = build_tag_query(&group(&[], false), &strings(&["safe"]), &[], SearchOptions::default())
            .unwrap_err();
        assert_eq!(err, SearchError::NoCriteria);
    }

    #[test]
    fn test_build_uses_global_opt_in() {
        let query = build_tag_query(&group(&[], true), &strings(&["safe"]), &[], SearchOptions::default())
            .unwrap();
        assert_eq!(query.tags, strings(&["safe"]));
        assert_eq!(query.expression(), "safe");
    }

    #[test]
    fn test_expression_joins_with_comma() {
        let query = TagQuery {
            tags: strings(&["safe", "pony"]),
            options: SearchOptions::default(),
        };
        assert_eq!(query.expression(), "safe, pony");
    }

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance("").unwrap(), DEFAULT_DISTANCE);
        assert_eq!(parse_distance(" 0.5 ").unwrap(), 0.5);
        assert!(matches!(parse_distance("abc"), Err(SearchError::InvalidDistance(_))));
    }

    #[test]
    fn test_pick_index_empty_page() {
        assert_eq!(pick_index(0, 0), None);
        assert_eq!(pick_index(-1, 0), None);
    }

    #[test]
    fn test_pick_index_in_range() {
        assert_eq!(pick_index(3, 5), Some((3, false)));
        assert_eq!(pick_index(0, 1), Some((0, false)));
    }

    #[test]
    fn test_pick_index_out_of_range_is_advisory() {
        for _ in 0..20 {
            let (index, advisory) = pick_index(99, 5).unwrap();
            assert!(index < 5);
            assert!(advisory);
        }
    }

    #[test]
    fn test_pick_index_negative_is_silent_random() {
        for _ in 0..20 {
            let (index, advisory) = pick_index(-1, 5).unwrap();
            assert!(index < 5);
            assert!(!advisory);
        }
    }
}
