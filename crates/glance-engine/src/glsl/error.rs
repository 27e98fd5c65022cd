use std::error::Error;
use std::fmt;

/// A context call that was rejected.
///
/// Like a GL error flag: the call has no effect and the first error is kept
/// until [`GlslContext::take_error`](super::GlslContext::take_error) reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A handle or argument does not name a live object.
    InvalidValue(String),
    /// The call is not allowed in the current state.
    InvalidOperation(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
        }
    }
}

impl Error for ContextError {}
