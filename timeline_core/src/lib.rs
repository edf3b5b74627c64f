//! Random access to any frame of a running simulation.
//!
//! A [GameMemory](timeline_memory::GameMemory) only knows how to advance its base slot one
//! frame at a time. [SlotManager] builds random-access frame seeking on top of that by keeping
//! a pool of backup slots and re-simulating from whichever cached slot is closest to the
//! requested frame. [Timeline] wraps a [SlotManager] with a per-frame-per-path value cache and
//! the public read/write surface that the rest of the editor uses.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub use controller::*;
pub use data_cache::*;
pub use error::*;
pub use slot_manager::*;
pub use slots::{Frame, SlotIndex};
pub use state::*;
pub use timeline::*;

mod controller;
mod data_cache;
mod error;
mod slot_manager;
mod slots;
mod state;
mod timeline;
