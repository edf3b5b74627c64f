//! Representation of timeline data types and values, mostly corresponding to C data types
//! found in the target binary's debug info.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub use data_type::*;
pub use error::*;
pub use value::*;

mod data_type;
mod error;
mod value;
