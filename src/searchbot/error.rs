//! Domain error taxonomy for search commands.

use std::fmt;

/// Conditions a search command can end in, short of success.
///
/// The `Display` text is the user-facing message; the engine catches every
/// variant at the command boundary and renders it as a plain reply, so none
/// of these ever surface to the dispatcher as a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// No group tags, no global tags, no user tags.
    NoCriteria,
    /// A command flag received a malformed value.
    InvalidArgument(String),
    /// Reverse search got a non-numeric distance parameter.
    InvalidDistance(String),
    /// Zero results, or the API answered 404.
    NoMatch,
    /// Reverse search matched more images than can be rendered.
    TooManyMatches(usize),
    /// Transport or API failure, carrying the underlying message.
    Api(String),
    /// Persistence failure, fatal for this invocation only.
    Store(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCriteria => write!(f, "Please provide search tags."),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::InvalidDistance(input) => write!(
                f,
                "Reverse search only takes a numeric distance parameter, got '{input}'."
            ),
            Self::NoMatch => write!(f, "No matching images found."),
            Self::TooManyMatches(count) => write!(
                f,
                "Found too many images ({count}), try a smaller distance."
            ),
            Self::Api(msg) => write!(f, "Search request failed: {msg}"),
            Self::Store(msg) => write!(f, "Failed to access group settings: {msg}"),
        }
    }
}

impl std::error::Error for SearchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(SearchError::NoCriteria.to_string(), "Please provide search tags.");
        assert!(SearchError::InvalidDistance("abc".into()).to_string().contains("'abc'"));
        assert!(SearchError::TooManyMatches(42).to_string().contains("42"));
        assert!(SearchError::Api("timeout".into()).to_string().contains("timeout"));
    }
}
