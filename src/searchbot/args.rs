//! Argument parsing for the /search and /configure commands.

use crate::searchbot::error::SearchError;
use crate::searchbot::query::SearchOptions;

/// Parsed arguments of a /search invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchArgs {
    /// Free text left over after flags: tag tokens, or a reverse-search
    /// distance when an image is attached.
    pub text: String,
    /// --tags: list the group's custom tags.
    pub show_tags: bool,
    /// --status: show the group's search settings.
    pub show_status: bool,
    pub options: SearchOptions,
}

impl SearchArgs {
    /// True when the invocation carries nothing to act on.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.show_tags && !self.show_status
    }
}

/// Parsed arguments of a /configure invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigureArgs {
    pub on: bool,
    pub off: bool,
    pub onglobal: bool,
    pub offglobal: bool,
    pub add: Option<String>,
    pub rm: Option<String>,
}

impl ConfigureArgs {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Parse `/search` arguments: `--flag [value]` options mixed with free text.
pub fn parse_search_args(input: &str) -> Result<SearchArgs, SearchError> {
    let mut args = SearchArgs::default();
    let mut text_parts: Vec<&str> = Vec::new();
    let mut tokens = input.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        match token {
            "--tags" => args.show_tags = true,
            "--status" => args.show_status = true,
            "--pp" => args.options.per_page = numeric_value(token, tokens.next())?,
            "--p" => args.options.page = numeric_value(token, tokens.next())?,
            "--i" => args.options.index = numeric_value(token, tokens.next())?,
            "--sf" => args.options.sort_field = string_value(token, tokens.next())?,
            "--sd" => args.options.sort_dir = string_value(token, tokens.next())?,
            _ if token.starts_with("--") => {
                return Err(SearchError::InvalidArgument(format!("unknown flag {token}")));
            }
            _ => text_parts.push(token),
        }
    }

    args.text = text_parts.join(" ");
    Ok(args)
}

/// Parse `/configure` arguments.
///
/// `--add` and `--rm` consume every following token up to the next flag, so
/// multi-word tags survive without quoting.
pub fn parse_configure_args(input: &str) -> Result<ConfigureArgs, SearchError> {
    let mut args = ConfigureArgs::default();
    let mut tokens = input.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        match token {
            "--on" => args.on = true,
            "--off" => args.off = true,
            "--onglobal" => args.onglobal = true,
            "--offglobal" => args.offglobal = true,
            "--add" | "--rm" => {
                let mut parts: Vec<&str> = Vec::new();
                while let Some(next) = tokens.peek() {
                    if next.starts_with("--") {
                        break;
                    }
                    parts.push(tokens.next().unwrap());
                }
                if parts.is_empty() {
                    return Err(SearchError::InvalidArgument(format!("{token} needs a tag list")));
                }
                let value = parts.join(" ");
                if token == "--add" {
                    args.add = Some(value);
                } else {
                    args.rm = Some(value);
                }
            }
            _ => {
                return Err(SearchError::InvalidArgument(format!("unknown option {token}")));
            }
        }
    }

    Ok(args)
}

fn string_value(flag: &str, value: Option<&str>) -> Result<String, SearchError> {
    value
        .filter(|v| !v.starts_with("--"))
        .map(str::to_string)
        .ok_or_else(|| SearchError::InvalidArgument(format!("{flag} needs a value")))
}

fn numeric_value<T: std::str::FromStr>(flag: &str, value: Option<&str>) -> Result<T, SearchError> {
    let value = value.ok_or_else(|| SearchError::InvalidArgument(format!("{flag} needs a number")))?;
    value
        .parse()
        .map_err(|_| SearchError::InvalidArgument(format!("{flag} needs a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searchbot::query::{DEFAULT_PAGE, DEFAULT_PER_PAGE};

    #[test]
    fn test_search_defaults() {
        let args = parse_search_args("").unwrap();
        assert!(args.is_empty());
        assert_eq!(args.options, SearchOptions::default());
    }

    #[test]
    fn test_search_free_text() {
        let args = parse_search_args("twilight sparkle, safe").unwrap();
        assert_eq!(args.text, "twilight sparkle, safe");
        assert!(!args.is_empty());
    }

    #[test]
    fn test_search_flags_and_text_mix() {
        let args = parse_search_args("safe --pp 20 pony --p 3 --sf wilson_score --sd asc --i 2").unwrap();
        assert_eq!(args.text, "safe pony");
        assert_eq!(args.options.per_page, 20);
        assert_eq!(args.options.page, 3);
        assert_eq!(args.options.sort_field, "wilson_score");
        assert_eq!(args.options.sort_dir, "asc");
        assert_eq!(args.options.index, 2);
    }

    #[test]
    fn test_search_boolean_flags() {
        let args = parse_search_args("--tags").unwrap();
        assert!(args.show_tags);
        let args = parse_search_args("--status").unwrap();
        assert!(args.show_status);
    }

    #[test]
    fn test_search_rejects_bad_numbers() {
        assert!(matches!(parse_search_args("--pp abc"), Err(SearchError::InvalidArgument(_))));
        assert!(matches!(parse_search_args("--p"), Err(SearchError::InvalidArgument(_))));
        assert!(matches!(parse_search_args("--unknown"), Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_search_keeps_option_defaults_when_unset() {
        let args = parse_search_args("safe --i 5").unwrap();
        assert_eq!(args.options.per_page, DEFAULT_PER_PAGE);
        assert_eq!(args.options.page, DEFAULT_PAGE);
        assert_eq!(args.options.index, 5);
    }

    #[test]
    fn test_configure_toggles() {
        let args = parse_configure_args("--on --onglobal").unwrap();
        assert!(args.on && args.onglobal);
        assert!(!args.off && !args.offglobal);
    }

    #[test]
    fn test_configure_add_spans_tokens() {
        let args = parse_configure_args("--add twilight sparkle, safe --on").unwrap();
        assert_eq!(args.add.as_deref(), Some("twilight sparkle, safe"));
        assert!(args.on);
    }

    #[test]
    fn test_configure_rm_value_required() {
        assert!(matches!(parse_configure_args("--rm"), Err(SearchError::InvalidArgument(_))));
        assert!(matches!(parse_configure_args("--rm --on"), Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_configure_empty_and_unknown() {
        assert!(parse_configure_args("").unwrap().is_empty());
        assert!(matches!(parse_configure_args("bogus"), Err(SearchError::InvalidArgument(_))));
    }
}
