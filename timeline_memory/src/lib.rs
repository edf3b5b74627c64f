//! Access to the target binary's live and slotted memory.
//!
//! The memory is divided into static memory (code, rodata - immutable for the process's
//! lifetime) and non-static memory (`.data`/`.bss` - mutable game state). A "slot" holds a
//! copy of non-static memory: the base slot mirrors the binary's actual loaded memory, and
//! backup slots are independently-owned buffers that [GameMemory::copy_slot] can move state
//! into and out of.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub use binary_memory::*;
pub use error::*;
pub use slot_impl::*;
pub use traits::*;

mod binary_memory;
mod error;
mod slot_impl;
mod traits;
