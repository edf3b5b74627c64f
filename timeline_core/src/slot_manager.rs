//! Random access to any frame via a pool of backup slots and a cost-based slot picker.

use std::{
    cell::RefCell,
    collections::HashMap,
    ops::{Deref, DerefMut},
    time::{Duration, Instant},
};

use itertools::Itertools;
use rand::seq::SliceRandom;
use timeline_memory::GameMemory;

use crate::{
    slots::{Frame, SlotIndex, Slots},
    state::SlotStateImpl,
    Controller, SlotState, SlotStateMut, TimelineError,
};

/// Hotspot alignment boundaries used by [SlotManager::balance_distribution].
///
/// A backup slot is kept at `hotspot - (hotspot % alignment)` for every (hotspot, alignment)
/// pair, giving finer-grained caching the closer a candidate frame is to a hotspot.
const ALIGNMENTS: [u32; 8] = [1, 15, 40, 145, 410, 1505, 4010, 14005];

/// Manages a pool of slots to provide random access to any frame of a simulation.
#[derive(Debug)]
pub struct SlotManager<M: GameMemory, C: Controller<M>> {
    memory: M,
    controller: C,
    slots: RefCell<Slots<M>>,
    hotspots: HashMap<String, u32>,
}

impl<M: GameMemory, C: Controller<M>> SlotManager<M, C> {
    /// Construct a new slot manager.
    ///
    /// `memory` should typically be freshly created; otherwise frame 0 is defined as whatever
    /// the current contents of `base_slot` are.
    pub fn new(memory: M, base_slot: M::Slot, controller: C, num_backup_slots: usize) -> Self {
        let slots = Slots::new(&memory, base_slot, num_backup_slots);
        Self {
            memory,
            controller,
            slots: RefCell::new(slots),
            hotspots: HashMap::new(),
        }
    }

    /// Destruct into the memory, base slot, and controller.
    ///
    /// The base slot is restored to the power-on state.
    pub fn into_parts(self) -> (M, M::Slot, C) {
        let mut slots = self.slots.into_inner();
        self.memory.copy_slot(&mut slots.base.slot, &slots.power_on.slot);
        (self.memory, slots.base.slot, self.controller)
    }

    /// The memory that backs this slot manager.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// The controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// A mutable reference to the controller.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Get a read-only view of the given frame.
    ///
    /// Generally only one state should be kept alive at a time; requesting another while one
    /// is held will panic.
    pub fn frame(&self, frame: u32) -> Result<impl SlotState<Memory = M> + '_, TimelineError> {
        let mut guard = self
            .slots
            .try_borrow_mut()
            .expect("only one state can be requested at a time");
        let index = request_frame(&self.memory, &self.controller, &mut guard, frame, false)?;
        Ok(SlotStateImpl::new(&self.memory, frame, SlotGuard { guard, index }))
    }

    /// Get a read-only view of the base slot at the given frame.
    ///
    /// This can be used for running internal queries in the base slot if they have no
    /// potential side effects.
    pub fn base_slot(&self, frame: u32) -> Result<impl SlotState<Memory = M> + '_, TimelineError> {
        let mut guard = self
            .slots
            .try_borrow_mut()
            .expect("only one state can be requested at a time");
        request_frame(&self.memory, &self.controller, &mut guard, frame, true)?;
        Ok(SlotStateImpl::new(
            &self.memory,
            frame,
            SlotGuard {
                guard,
                index: SlotIndex::Base,
            },
        ))
    }

    /// Get a read-write view of the base slot at the given frame.
    ///
    /// This can be used for running internal queries in the base slot that may have a side
    /// effect.
    pub fn base_slot_mut(
        &mut self,
        frame: u32,
    ) -> Result<impl SlotStateMut<Memory = M> + '_, TimelineError> {
        request_frame(&self.memory, &self.controller, self.slots.get_mut(), frame, true)?;
        let slots = self.slots.get_mut();
        Ok(SlotStateImpl::new(&self.memory, frame, &mut slots.base.slot))
    }

    /// Set a hotspot with a given name.
    ///
    /// A hotspot is a hint to [SlotManager::balance_distribution] that scrolling should be
    /// smooth near the given frame.
    pub fn set_hotspot(&mut self, name: &str, frame: u32) {
        self.hotspots.insert(name.to_string(), frame);
    }

    /// Delete a hotspot with the given name, if it exists.
    pub fn delete_hotspot(&mut self, name: &str) {
        self.hotspots.remove(name);
    }

    /// Mark every slot at or after `frame` as needing to be recomputed.
    pub fn invalidate_frame(&mut self, frame: u32) {
        for slot in self.slots.get_mut().iter_mut() {
            if let Some(slot_frame) = slot.frame.as_frame() {
                if slot_frame >= frame {
                    slot.frame = Frame::Unknown;
                }
            }
        }
    }

    /// Perform housekeeping to improve scrolling near hotspots.
    ///
    /// Spends up to `max_run_time` materializing backup slots at a geometric ladder of
    /// alignments around each hotspot, so that scrubbing near a hotspot never has to replay
    /// more than the ladder's finest spacing.
    pub fn balance_distribution(&mut self, max_run_time: Duration) -> Result<(), TimelineError> {
        let start_time = Instant::now();

        let target_frames: Vec<u32> = self
            .hotspots
            .values()
            .cartesian_product(ALIGNMENTS.iter())
            .map(|(&hotspot, &alignment)| hotspot - (hotspot % alignment))
            .sorted()
            .dedup()
            .collect();

        for target_frame in target_frames {
            if start_time.elapsed() > max_run_time {
                break;
            }

            let slots = self.slots.get_mut();
            let already_cached = slots
                .backups
                .iter()
                .any(|slot| slot.frame == Frame::At(target_frame));
            if already_cached {
                continue;
            }

            let index =
                request_frame(&self.memory, &self.controller, slots, target_frame, false)?;
            if index != SlotIndex::Base {
                // Already resident in a non-base slot; nothing further to do.
                continue;
            }

            let slots = self.slots.get_mut();
            let mut rng = rand::thread_rng();
            let destination = (0..slots.backups.len())
                .map(SlotIndex::Backup)
                .filter(|&i| slots.get(i).frame != Frame::At(target_frame))
                .collect::<Vec<_>>()
                .choose(&mut rng)
                .copied();

            match destination {
                Some(destination) => slots.copy_slot(&self.memory, destination, SlotIndex::Base),
                None => log::warn!("balance_distribution: using suboptimal number of slots"),
            }
        }

        Ok(())
    }

    /// Return the set of currently loaded frames, for debugging purposes.
    pub fn cached_frames(&self) -> Vec<u32> {
        self.slots
            .borrow()
            .iter()
            .filter_map(|slot| slot.frame.as_frame())
            .collect()
    }

    /// Return the number of frame advances since the slot manager was created.
    pub fn num_advances(&self) -> usize {
        self.slots.borrow().num_advances()
    }

    /// Return the number of slot copies since the slot manager was created.
    pub fn num_copies(&self) -> usize {
        self.slots.borrow().num_copies()
    }
}

/// Advance the base slot's frame by one and apply the controller's edits for the new frame.
///
/// The base slot's frame must not be [Frame::Unknown].
fn advance_frame<M: GameMemory, C: Controller<M>>(
    memory: &M,
    controller: &C,
    slots: &mut Slots<M>,
    requested_frame: u32,
) -> Result<(), TimelineError> {
    let new_frame = match slots.get(SlotIndex::Base).frame {
        Frame::PowerOn => 0,
        Frame::At(frame) => {
            memory.advance_base_slot(&mut slots.get_mut(SlotIndex::Base).slot);
            slots.num_advances += 1;
            frame + 1
        }
        Frame::Unknown => {
            return Err(TimelineError::PreconditionViolation(
                "cannot advance a slot with an unknown frame".to_string(),
            ))
        }
    };

    let base = slots.get_mut(SlotIndex::Base);
    base.frame = Frame::At(new_frame);
    controller
        .apply(memory, &mut base.slot, new_frame)
        .map_err(|error| TimelineError::Controller(error.to_string()))?;

    drop_breadcrumb_if_due(memory, slots, requested_frame.saturating_sub(new_frame));
    Ok(())
}

/// Opportunistically scatter the base slot's just-advanced contents into a random backup slot.
///
/// Breadcrumbs exist so that a long run of `advance_frame` calls (e.g. seeking from frame 0 to
/// frame 50,000) leaves behind a trail of cheaply-resumable checkpoints, rather than only
/// caching the final destination frame. A breadcrumb is dropped on round thousands, and densely
/// in the last 60 frames before the target, since that's where a user is most likely to scrub.
fn drop_breadcrumb_if_due<M: GameMemory>(memory: &M, slots: &mut Slots<M>, remaining: u32) {
    let due = remaining % 1000 == 0 || (remaining < 60 && remaining % 10 == 0);
    if !due {
        return;
    }

    let mut rng = rand::thread_rng();
    let candidates: Vec<SlotIndex> = (0..slots.backups.len()).map(SlotIndex::Backup).collect();
    if let Some(&destination) = candidates.choose(&mut rng) {
        slots.copy_slot(memory, destination, SlotIndex::Base);
    }
}

/// The (slot copies, frame updates) required to reach `requested_frame` starting from a slot
/// currently at `slot_frame`. Returns None if the slot cannot be used as a starting point
/// (its frame is unknown, or it's ahead of the requested frame).
fn work_from(slot_frame: Frame, is_base: bool, requested_frame: u32) -> Option<(u32, u32)> {
    let frame = slot_frame.as_frame()?;
    if frame > requested_frame {
        return None;
    }
    let copies = if is_base { 0 } else { 1 };
    let updates = requested_frame - frame;
    Some((copies, updates))
}

fn cost_from((copies, updates): (u32, u32)) -> u32 {
    10 * copies + updates
}

/// Make the base slot (or, if `require_base` is false, possibly a cheaper non-base slot)
/// represent `requested_frame`, advancing and copying as needed, and return the index of the
/// slot that now holds it.
fn request_frame<M: GameMemory, C: Controller<M>>(
    memory: &M,
    controller: &C,
    slots: &mut Slots<M>,
    requested_frame: u32,
    require_base: bool,
) -> Result<SlotIndex, TimelineError> {
    let nearest = slots
        .iter()
        .filter_map(|slot| {
            work_from(slot.frame, slot.is_base, requested_frame).map(|work| (slot.index, work))
        })
        .min_by_key(|&(_, work)| cost_from(work));

    let (nearest_index, _) = nearest.ok_or(TimelineError::SlotExhausted)?;

    if slots.get(nearest_index).frame == Frame::At(requested_frame)
        && (!require_base || nearest_index == SlotIndex::Base)
    {
        return Ok(nearest_index);
    }

    if nearest_index != SlotIndex::Base {
        slots.copy_slot(memory, SlotIndex::Base, nearest_index);
    }

    while slots.get(SlotIndex::Base).frame != Frame::At(requested_frame) {
        advance_frame(memory, controller, slots, requested_frame)?;
    }

    Ok(SlotIndex::Base)
}

/// A handle to one of a [SlotManager]'s slots, borrowed out of its `RefCell<Slots<M>>`.
#[derive(Debug)]
pub(crate) struct SlotGuard<'a, M: GameMemory> {
    guard: std::cell::RefMut<'a, Slots<M>>,
    index: SlotIndex,
}

impl<'a, M: GameMemory> Deref for SlotGuard<'a, M> {
    type Target = M::Slot;

    fn deref(&self) -> &M::Slot {
        &self.guard.get(self.index).slot
    }
}

impl<'a, M: GameMemory> DerefMut for SlotGuard<'a, M> {
    fn deref_mut(&mut self) -> &mut M::Slot {
        &mut self.guard.get_mut(self.index).slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_prefers_fewer_advances_over_fewer_copies_past_the_break_even_point() {
        // A base slot 50 frames behind costs the same as a backup slot exactly at the frame.
        assert_eq!(cost_from((0, 50)), cost_from((5, 0)));
        // But a base slot only 1 frame behind always wins over any non-base slot.
        assert!(cost_from((0, 1)) < cost_from((1, 0)));
    }

    #[test]
    fn work_from_rejects_slots_ahead_of_the_target() {
        assert_eq!(work_from(Frame::At(10), false, 5), None);
        assert_eq!(work_from(Frame::At(5), false, 10), Some((1, 5)));
        assert_eq!(work_from(Frame::PowerOn, false, 0), Some((1, 0)));
        assert_eq!(work_from(Frame::Unknown, false, 10), None);
    }

    #[test]
    fn breadcrumb_cadence_matches_the_ladder_and_the_final_stretch() {
        assert!(2000 % 1000 == 0);
        assert!(50 < 60 && 50 % 10 == 0);
        assert!(!(47 < 60 && 47 % 10 == 0));
    }
}
