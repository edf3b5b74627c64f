#![allow(missing_docs)]

use std::{error::Error, fmt};

use timeline_data_path::DataError;
use timeline_memory::MemoryError;

#[derive(Debug, Clone)]
pub enum TimelineError {
    Context {
        context: String,
        error: Box<TimelineError>,
    },
    Memory(MemoryError),
    Data(DataError),
    /// A backup slot was requested but every slot is in use by a live [SlotState](crate::SlotState).
    SlotExhausted,
    /// A frame was requested that lies outside `0..num_frames`.
    FrameOutOfRange { frame: u32, num_frames: u32 },
    /// An internal invariant was violated. Unlike the other variants, this should never be
    /// handled by a caller - it indicates a bug in the timeline implementation itself.
    PreconditionViolation(String),
    /// The controller rejected the frame it was asked to apply.
    Controller(String),
}

impl TimelineError {
    /// Wrap this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        TimelineError::Context {
            context: context.into(),
            error: Box::new(self),
        }
    }
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineError::Context { context, error } => write!(f, "{}:\n  {}", context, error),
            TimelineError::Memory(error) => write!(f, "{}", error),
            TimelineError::Data(error) => write!(f, "{}", error),
            TimelineError::SlotExhausted => write!(f, "no backup slot is available"),
            TimelineError::FrameOutOfRange { frame, num_frames } => {
                write!(f, "frame {} is out of range (0..{})", frame, num_frames)
            }
            TimelineError::PreconditionViolation(message) => write!(f, "{}", message),
            TimelineError::Controller(message) => write!(f, "controller error: {}", message),
        }
    }
}

impl Error for TimelineError {}

impl From<MemoryError> for TimelineError {
    fn from(v: MemoryError) -> Self {
        Self::Memory(v)
    }
}

impl From<DataError> for TimelineError {
    fn from(v: DataError) -> Self {
        Self::Data(v)
    }
}
