use std::{cell::RefCell, time::Duration};

use timeline_data_path::GlobalDataPath;
use timeline_memory::GameMemory;
use timeline_types::Value;

use crate::{Controller, DataCache, InvalidatedFrames, SlotManager, SlotState, TimelineError};

/// The public read/write surface used by the rest of the editor.
///
/// Wraps a [SlotManager] with a per-frame, per-path value cache: [Timeline::get] first
/// consults the cache, and on miss reads through the slot manager and populates it. Any
/// invalidation (from a controller edit or an explicit [Timeline::invalidate]) evicts cached
/// entries for frames at or after the invalidated frame, and notifies every registered
/// [Timeline::on_invalidation] callback.
pub struct Timeline<M: GameMemory, C: Controller<M>> {
    slot_manager: SlotManager<M, C>,
    cache: RefCell<DataCache>,
    invalidation_callbacks: Vec<Box<dyn FnMut(u32)>>,
}

impl<M: GameMemory, C: Controller<M>> Timeline<M, C> {
    /// Construct a timeline over `memory`, with `controller` supplying per-frame edits and a
    /// pool of `num_backup_slots` backup slots besides the base slot.
    pub fn new(memory: M, base_slot: M::Slot, controller: C, num_backup_slots: usize) -> Self {
        Self {
            slot_manager: SlotManager::new(memory, base_slot, controller, num_backup_slots),
            cache: RefCell::new(DataCache::new()),
            invalidation_callbacks: Vec::new(),
        }
    }

    /// Destruct into the memory, base slot, and controller.
    pub fn into_parts(self) -> (M, M::Slot, C) {
        self.slot_manager.into_parts()
    }

    /// The memory that backs this timeline.
    pub fn memory(&self) -> &M {
        self.slot_manager.memory()
    }

    /// The controller.
    pub fn controller(&self) -> &C {
        self.slot_manager.controller()
    }

    /// Read `path`'s value at `frame`, through the cache.
    pub fn get(&self, frame: u32, path: &GlobalDataPath) -> Result<Value, TimelineError> {
        if let Some(value) = self.cache.borrow_mut().get(frame, path) {
            return Ok(value);
        }

        let state = self.slot_manager.frame(frame)?;
        self.cache.borrow_mut().preload_frame(&state);
        let value = state.path_read(path)?;
        drop(state);

        self.cache.borrow_mut().insert(frame, path, value.clone());
        Ok(value)
    }

    /// Run `func` against a frozen view of `frame`, bypassing the value cache entirely.
    ///
    /// This is an escape hatch for callers that need several fields read consistently under a
    /// single freeze, rather than paying for a slot request per field.
    pub fn with_slot<R>(
        &self,
        frame: u32,
        func: impl FnOnce(&dyn SlotState<Memory = M>) -> R,
    ) -> Result<R, TimelineError> {
        let state = self.slot_manager.frame(frame)?;
        Ok(func(&state))
    }

    /// Mutate the controller, propagating whatever frames it reports as invalidated to the
    /// slot pool, the value cache, and every registered [Timeline::on_invalidation] callback.
    pub fn with_controller_mut(
        &mut self,
        func: impl FnOnce(&mut C) -> InvalidatedFrames,
    ) -> InvalidatedFrames {
        let invalidated = func(self.slot_manager.controller_mut());
        if let InvalidatedFrames::StartingAt(frame) = invalidated {
            self.invalidate(frame);
        }
        invalidated
    }

    /// Mark every slot and cache entry at or after `frame` as stale, and notify callbacks.
    pub fn invalidate(&mut self, frame: u32) {
        self.slot_manager.invalidate_frame(frame);
        self.cache.borrow_mut().invalidate_frame(frame);
        for callback in &mut self.invalidation_callbacks {
            callback(frame);
        }
    }

    /// Register a callback to be run whenever frames are invalidated, given the first
    /// invalidated frame.
    pub fn on_invalidation(&mut self, callback: impl FnMut(u32) + 'static) {
        self.invalidation_callbacks.push(Box::new(callback));
    }

    /// Set a hotspot with a given name.
    pub fn set_hotspot(&mut self, name: &str, frame: u32) {
        self.slot_manager.set_hotspot(name, frame);
    }

    /// Delete a hotspot with the given name, if it exists.
    pub fn delete_hotspot(&mut self, name: &str) {
        self.slot_manager.delete_hotspot(name);
    }

    /// Perform housekeeping to improve scrolling near hotspots, for up to `max_run_time`.
    pub fn balance_distribution(&mut self, max_run_time: Duration) -> Result<(), TimelineError> {
        self.slot_manager.balance_distribution(max_run_time)
    }

    /// Currently loaded frames, for debugging purposes.
    pub fn loaded_frames(&self) -> Vec<u32> {
        self.slot_manager.cached_frames()
    }

    /// The number of frame advances performed since construction.
    pub fn num_advances(&self) -> usize {
        self.slot_manager.num_advances()
    }

    /// The number of slot copies performed since construction.
    pub fn num_copies(&self) -> usize {
        self.slot_manager.num_copies()
    }
}

impl<M: GameMemory, C: Controller<M>> std::fmt::Debug for Timeline<M, C>
where
    M: std::fmt::Debug,
    C: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("slot_manager", &self.slot_manager)
            .field("cache", &self.cache)
            .finish()
    }
}
