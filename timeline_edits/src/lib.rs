//! A time-indexed mutation log implementing the controller interface the slot manager
//! consumes: single-frame writes, masked boolean-flag writes over an integer field, and
//! range edits over a contiguous frame interval, with frame insertion/deletion shifting.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub use edit_log::*;
pub use range_edit::{EditRange, EditRangeId, RangeEdits};

mod edit_log;
mod range_edit;
