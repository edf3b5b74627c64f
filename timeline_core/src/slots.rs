use timeline_memory::GameMemory;

/// An index identifying one of a [SlotManager](crate::SlotManager)'s slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotIndex {
    /// The permanently frozen frame 0 slot, built before any controller edit is applied.
    PowerOn,
    /// The base slot, the only slot that can be frame advanced.
    Base,
    /// A backup slot, identified by its position in the backup pool.
    Backup(usize),
}

/// The frame that a slot's contents correspond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    /// The slot holds the state at the given frame, including any edits for that frame.
    At(u32),
    /// The slot holds the power-on state: frame 0, before any controller edit is applied.
    ///
    /// This differs from `At(0)`, which includes whatever edits apply to frame 0.
    PowerOn,
    /// The slot's contents don't correspond to any frame and must be overwritten before use.
    Unknown,
}

impl Frame {
    /// The frame number this slot can be used as a starting point for, or None if the slot
    /// cannot be used (`Unknown`).
    pub fn as_frame(self) -> Option<u32> {
        match self {
            Frame::At(frame) => Some(frame),
            Frame::PowerOn => Some(0),
            Frame::Unknown => None,
        }
    }
}

/// A slot together with bookkeeping about what frame it represents.
#[derive(Debug)]
pub struct SlotWrapper<S> {
    pub(crate) index: SlotIndex,
    pub(crate) slot: S,
    pub(crate) is_base: bool,
    pub(crate) frame: Frame,
}

impl<S> SlotWrapper<S> {
    /// The frame that this slot currently represents.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// The underlying slot.
    pub fn slot(&self) -> &S {
        &self.slot
    }
}

/// The full set of slots owned by a [SlotManager](crate::SlotManager): one permafrozen
/// power-on slot, one base slot, and a pool of backup slots.
#[derive(Debug)]
pub struct Slots<M: GameMemory> {
    pub(crate) power_on: SlotWrapper<M::Slot>,
    pub(crate) base: SlotWrapper<M::Slot>,
    pub(crate) backups: Vec<SlotWrapper<M::Slot>>,
    pub(crate) num_advances: usize,
    pub(crate) num_copies: usize,
}

impl<M: GameMemory> Slots<M> {
    pub(crate) fn new(memory: &M, base_slot: M::Slot, num_backup_slots: usize) -> Self {
        let mut power_on = SlotWrapper {
            index: SlotIndex::PowerOn,
            slot: memory.create_backup_slot(),
            is_base: false,
            frame: Frame::PowerOn,
        };
        memory.copy_slot(&mut power_on.slot, &base_slot);

        let base = SlotWrapper {
            index: SlotIndex::Base,
            slot: base_slot,
            is_base: true,
            frame: Frame::At(0),
        };

        let backups = (0..num_backup_slots)
            .map(|i| SlotWrapper {
                index: SlotIndex::Backup(i),
                slot: memory.create_backup_slot(),
                is_base: false,
                frame: Frame::Unknown,
            })
            .collect();

        Self {
            power_on,
            base,
            backups,
            num_advances: 0,
            num_copies: 0,
        }
    }

    pub(crate) fn get(&self, index: SlotIndex) -> &SlotWrapper<M::Slot> {
        match index {
            SlotIndex::PowerOn => &self.power_on,
            SlotIndex::Base => &self.base,
            SlotIndex::Backup(i) => &self.backups[i],
        }
    }

    pub(crate) fn get_mut(&mut self, index: SlotIndex) -> &mut SlotWrapper<M::Slot> {
        match index {
            SlotIndex::PowerOn => &mut self.power_on,
            SlotIndex::Base => &mut self.base,
            SlotIndex::Backup(i) => &mut self.backups[i],
        }
    }

    /// Iterate over every slot, including the frozen power-on slot.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &SlotWrapper<M::Slot>> {
        std::iter::once(&self.power_on)
            .chain(std::iter::once(&self.base))
            .chain(self.backups.iter())
    }

    /// Iterate over every mutable slot. Power-on is permafrozen and excluded.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut SlotWrapper<M::Slot>> {
        std::iter::once(&mut self.base).chain(self.backups.iter_mut())
    }

    /// Copy `src`'s contents into `dst`. Neither index may alias.
    pub(crate) fn copy_slot(&mut self, memory: &M, dst: SlotIndex, src: SlotIndex) {
        assert_ne!(dst, src, "cannot copy a slot onto itself");

        // SAFETY: dst and src are distinct fields of self (enforced by SlotIndex::Base /
        // SlotIndex::Backup(i) never aliasing a different index), so taking a raw pointer to
        // the source slot and re-borrowing it immutably alongside a fresh mutable borrow of
        // the destination slot cannot produce overlapping references.
        let src_slot: *const SlotWrapper<M::Slot> = self.get(src);
        let src_ref: &SlotWrapper<M::Slot> = unsafe { &*src_slot };
        let dst_ref = self.get_mut(dst);

        memory.copy_slot(&mut dst_ref.slot, &src_ref.slot);
        dst_ref.frame = src_ref.frame;
        self.num_copies += 1;
    }

    pub(crate) fn num_advances(&self) -> usize {
        self.num_advances
    }

    pub(crate) fn num_copies(&self) -> usize {
        self.num_copies
    }
}
