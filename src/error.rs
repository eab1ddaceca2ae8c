use thiserror::Error;

/// Result type of fallible construction in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building paths, matchers and rule tables.
///
/// These only happen at construction time. Dispatching an event never returns an error.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A payload path has an empty segment.
    #[error("invalid payload path {path:?}")]
    InvalidPath {
        /// The path text as given.
        path: String,
    },
    /// An event type pattern is not a valid regular expression.
    #[error("invalid event type pattern")]
    InvalidPattern(#[source] regex::Error),
    /// A reference was empty or had a blank key or value.
    #[error("reference must have at least one key and no blank keys or values")]
    InvalidReference,
}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Self {
        Self::InvalidPattern(value)
    }
}

/// A fault inside a single extraction rule.
///
/// Missing values are not faults. `ExtractError` is reserved for values that are present but
/// have a shape the rule cannot work with, e.g. an object where a list of items was expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The value at `path` is present but is not `expected`.
    #[error("expected {expected} at {path:?}")]
    UnexpectedShape {
        /// Path of the offending value, in dotted form.
        path: String,
        /// What the rule expected to find there, e.g. `"list"`.
        expected: &'static str,
    },
}
