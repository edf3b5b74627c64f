use std::{error::Error, fmt};

use timeline_core::TimelineError;
use timeline_data_path::{DataError, DataPathError};
use timeline_layout::BinaryLayoutError;
use timeline_memory::BinaryLoadError;

/// The top-level error type for the CLI's load-replay-drive pipeline.
#[derive(Debug)]
pub enum CliError {
    /// Adds context to an inner error.
    Context { context: String, error: Box<CliError> },
    /// Binding to the target library failed.
    Load(BinaryLoadError),
    /// Reading the library's debug info failed.
    Layout(BinaryLayoutError),
    /// A data path failed to compile or resolve.
    Data(DataError),
    /// The timeline failed to advance or read a frame.
    Timeline(TimelineError),
    /// The movie file could not be parsed.
    Movie(timeline_formats::LoadError),
    /// A filesystem or logging setup error unrelated to the timeline itself.
    Io(String),
    /// The requested movie file has no recognized extension.
    UnknownMovieFormat(String),
}

impl CliError {
    /// Wrap this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        CliError::Context {
            context: context.into(),
            error: Box::new(self),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Context { context, error } => write!(f, "{}:\n  {}", context, error),
            CliError::Load(error) => write!(f, "{}", error),
            CliError::Layout(error) => write!(f, "{}", error),
            CliError::Data(error) => write!(f, "{}", error),
            CliError::Timeline(error) => write!(f, "{}", error),
            CliError::Movie(error) => write!(f, "{}", error),
            CliError::Io(message) => write!(f, "{}", message),
            CliError::UnknownMovieFormat(filename) => {
                write!(f, "don't know how to load movie file {:?} (expected .m64 or .wafi/.json)", filename)
            }
        }
    }
}

impl Error for CliError {}

impl From<BinaryLoadError> for CliError {
    fn from(v: BinaryLoadError) -> Self {
        CliError::Load(v)
    }
}

impl From<BinaryLayoutError> for CliError {
    fn from(v: BinaryLayoutError) -> Self {
        CliError::Layout(v)
    }
}

impl From<DataError> for CliError {
    fn from(v: DataError) -> Self {
        CliError::Data(v)
    }
}

impl From<DataPathError> for CliError {
    fn from(v: DataPathError) -> Self {
        CliError::Data(v.into())
    }
}

impl From<TimelineError> for CliError {
    fn from(v: TimelineError) -> Self {
        CliError::Timeline(v)
    }
}

impl From<timeline_formats::LoadError> for CliError {
    fn from(v: timeline_formats::LoadError) -> Self {
        CliError::Movie(v)
    }
}

impl From<std::io::Error> for CliError {
    fn from(v: std::io::Error) -> Self {
        CliError::Io(v.to_string())
    }
}
