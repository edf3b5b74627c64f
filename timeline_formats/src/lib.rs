//! Movie codecs: the .m64 binary format and the .wafi JSON format, both replayed into an
//! [EditLog](timeline_edits::EditLog) as a sequence of per-frame edits.

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub use error::LoadError;
pub use m64::{load_m64, replay_m64, save_m64, Input, M64Metadata, M64Paths, SM64Version};
pub use wafi::{load_wafi, replay_wafi, save_wafi, WafiEntry, WafiMetadata};

mod buttons;
mod error;
mod m64;
mod wafi;
