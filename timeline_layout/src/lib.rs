//! Defines a mapping from global variables to types/values.
//!
//! A [DataLayout] is a mapping containing:
//! - Type definitions
//! - Global variable types
//! - Constant values
//!
//! This layout is used for resolving the fields and globals referenced by a data path.
//! It can be constructed manually or read automatically from the DWARF debugging info of
//! a target binary using [BinaryLayout::read].

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub use binary_layout::*;
pub use data_layout::*;
pub use error::*;

mod binary_layout;
mod data_layout;
mod error;
