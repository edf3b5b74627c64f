use std::ops::DerefMut;

use timeline_data_path::GlobalDataPath;
use timeline_memory::GameMemory;
use timeline_types::{Address, Value};

use crate::TimelineError;

/// An abstract view of the simulation on a given frame.
pub trait State {
    /// The type of memory that the state is taken from.
    type Memory: GameMemory;

    /// The memory that the state is taken from.
    fn memory(&self) -> &Self::Memory;

    /// The frame of the state.
    fn frame(&self) -> u32;

    /// Get the address for a compiled path, evaluated against this state's slot.
    fn path_address(&self, path: &GlobalDataPath) -> Result<Option<Address>, TimelineError>;

    /// Read a compiled path, evaluated against this state's slot.
    fn path_read(&self, path: &GlobalDataPath) -> Result<Value, TimelineError>;
}

/// A state backed by a slot.
pub trait SlotState: State {
    /// The slot that contains the state's content.
    fn slot(&self) -> &<Self::Memory as GameMemory>::Slot;
}

/// A state backed by a slot and allowing direct memory editing.
pub trait SlotStateMut: SlotState {
    /// The slot that contains the state's content.
    fn slot_mut(&mut self) -> &mut <Self::Memory as GameMemory>::Slot;

    /// Write to a compiled path, evaluated against this state's slot.
    fn path_write(&mut self, path: &GlobalDataPath, value: Value) -> Result<(), TimelineError>;
}

/// A straightforward [SlotStateMut] backed by a borrow (owned or not) of a real slot.
#[derive(Debug)]
pub struct SlotStateImpl<'a, M: GameMemory, S: DerefMut<Target = M::Slot>> {
    pub(crate) memory: &'a M,
    pub(crate) frame: u32,
    pub(crate) slot: S,
}

impl<'a, M: GameMemory, S: DerefMut<Target = M::Slot>> SlotStateImpl<'a, M, S> {
    pub(crate) fn new(memory: &'a M, frame: u32, slot: S) -> Self {
        Self { memory, frame, slot }
    }
}

impl<'a, M: GameMemory, S: DerefMut<Target = M::Slot>> State for SlotStateImpl<'a, M, S> {
    type Memory = M;

    fn memory(&self) -> &M {
        self.memory
    }

    fn frame(&self) -> u32 {
        self.frame
    }

    fn path_address(&self, path: &GlobalDataPath) -> Result<Option<Address>, TimelineError> {
        Ok(path.address(&self.memory.with_slot(&self.slot))?)
    }

    fn path_read(&self, path: &GlobalDataPath) -> Result<Value, TimelineError> {
        Ok(path.read(&self.memory.with_slot(&self.slot))?)
    }
}

impl<'a, M: GameMemory, S: DerefMut<Target = M::Slot>> SlotState for SlotStateImpl<'a, M, S> {
    fn slot(&self) -> &M::Slot {
        &self.slot
    }
}

impl<'a, M: GameMemory, S: DerefMut<Target = M::Slot>> SlotStateMut for SlotStateImpl<'a, M, S> {
    fn slot_mut(&mut self) -> &mut M::Slot {
        &mut self.slot
    }

    fn path_write(&mut self, path: &GlobalDataPath, value: Value) -> Result<(), TimelineError> {
        Ok(path.write(&mut self.memory.with_slot_mut(&mut self.slot), value)?)
    }
}
