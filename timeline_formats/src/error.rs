use std::{error::Error, fmt, sync::Arc};

/// An error loading or saving a TAS movie file.
#[derive(Debug, Clone)]
pub enum LoadError {
    /// Adds context to an inner error.
    Context { context: String, error: Box<LoadError> },
    /// The file could not be read.
    Io(Arc<std::io::Error>),
    /// The file is not a validly formed movie of the expected kind.
    InvalidFormat {
        /// A byte offset or array index identifying where the parse failed, for diagnostics.
        position: usize,
        /// A human-readable description of what was expected.
        reason: String,
    },
}

impl LoadError {
    /// Wrap this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        LoadError::Context {
            context: context.into(),
            error: Box::new(self),
        }
    }

    pub(crate) fn invalid(position: usize, reason: impl Into<String>) -> Self {
        LoadError::InvalidFormat {
            position,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Context { context, error } => write!(f, "{}:\n  {}", context, error),
            LoadError::Io(error) => write!(f, "{}", error),
            LoadError::InvalidFormat { position, reason } => {
                write!(f, "invalid movie data at {}: {}", position, reason)
            }
        }
    }
}

impl Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(error: std::io::Error) -> Self {
        LoadError::Io(Arc::new(error))
    }
}
