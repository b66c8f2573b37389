//! Text normalization for user-supplied tag input.
//!
//! Search tags often arrive typed with a CJK input method, so full-width
//! punctuation is mapped to the ASCII equivalents the booru API expects.

/// Full-width punctuation and the ASCII character it maps to.
const TRANSLATION_TABLE: &[(char, char)] = &[
    ('；', ';'),
    ('：', ':'),
    ('，', ','),
    ('（', '('),
    ('）', ')'),
    ('【', '['),
    ('】', ']'),
    ('《', '<'),
    ('》', '>'),
    ('？', '?'),
    ('！', '!'),
    ('。', '.'),
    ('、', ','),
];

/// Replace full-width punctuation with ASCII equivalents.
///
/// Pure and total: every other character passes through unchanged and
/// empty input returns an empty string.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            TRANSLATION_TABLE
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// Split a comma-separated tag list into clean tags.
///
/// Normalizes first, then splits on commas, trims each token and drops
/// empty ones. Does not deduplicate; callers merge into ordered sets.
pub fn split_tags(text: &str) -> Vec<String> {
    normalize(text)
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_passthrough() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("safe, pony"), "safe, pony");
        assert_eq!(normalize("score.gte:100"), "score.gte:100");
    }

    #[test]
    fn test_normalize_fullwidth() {
        assert_eq!(normalize("safe，pony"), "safe,pony");
        assert_eq!(normalize("（solo）"), "(solo)");
        assert_eq!(normalize("【oc】《cute》？！。、"), "[oc]<cute>?!.,");
        assert_eq!(normalize("a；b：c"), "a;b:c");
    }

    #[test]
    fn test_normalize_idempotent() {
        let input = "safe，pony（solo）！";
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_removes_all_table_entries() {
        let all_fullwidth: String = TRANSLATION_TABLE.iter().map(|(from, _)| from).collect();
        let normalized = normalize(&all_fullwidth);
        for (from, _) in TRANSLATION_TABLE {
            assert!(!normalized.contains(*from));
        }
    }

    #[test]
    fn test_split_tags_basic() {
        assert_eq!(split_tags("safe, pony"), vec!["safe", "pony"]);
        assert_eq!(split_tags("safe，pony"), vec!["safe", "pony"]);
    }

    #[test]
    fn test_split_tags_drops_empty_tokens() {
        assert_eq!(split_tags("a,, ,b,"), vec!["a", "b"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ，").is_empty());
    }

    #[test]
    fn test_split_tags_keeps_duplicates() {
        // Dedup happens when merging into the query, not here.
        assert_eq!(split_tags("a,a"), vec!["a", "a"]);
    }
}
