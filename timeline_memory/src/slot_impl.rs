use std::fmt;

use timeline_layout::BinarySegment;

/// A buffer holding a copy of a binary's non-static memory.
///
/// The base slot borrows directly from the binary's live loaded memory (no copy); backup
/// slots own their data.
pub enum SlotImpl {
    /// The slot backed directly by the binary's loaded memory.
    Base(BaseSlot),
    /// An independently owned backup slot.
    Buffer(BufferSlot),
}

impl SlotImpl {
    pub(crate) fn memory_id(&self) -> usize {
        match self {
            SlotImpl::Base(slot) => slot.memory_id,
            SlotImpl::Buffer(slot) => slot.memory_id,
        }
    }

    /// # Safety
    ///
    /// The caller must ensure that no other references to this segment are live.
    pub(crate) unsafe fn segment(&self, index: usize) -> &[u8] {
        match self {
            SlotImpl::Base(slot) => slot.segment(index),
            SlotImpl::Buffer(slot) => &slot.segments[index].0,
        }
    }

    /// # Safety
    ///
    /// The caller must ensure that no other references to this segment are live.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn segment_mut(&self, index: usize) -> &mut [u8] {
        match self {
            SlotImpl::Base(slot) => slot.segment_mut(index),
            SlotImpl::Buffer(slot) => {
                let ptr = slot.segments[index].0.as_ptr() as *mut u8;
                std::slice::from_raw_parts_mut(ptr, slot.segments[index].0.len())
            }
        }
    }
}

impl fmt::Debug for SlotImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotImpl::Base(_) => write!(f, "SlotImpl::Base"),
            SlotImpl::Buffer(slot) => write!(f, "SlotImpl::Buffer({:?})", slot),
        }
    }
}

/// A raw pointer to the base of a loaded binary's address space.
///
/// The binary's memory is always accessed via a [SlotImpl] (read-write) or a static address
/// (read-only), so Rust's borrow rules enforce safe accesses at the view layer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BasePointer(pub(crate) *mut u8);

unsafe impl Send for BasePointer {}
unsafe impl Sync for BasePointer {}

/// An owned backup slot, holding a copy of each writable segment.
pub struct BufferSlot {
    pub(crate) memory_id: usize,
    pub(crate) id: usize,
    pub(crate) segments: Vec<SegmentBuffer>,
}

pub(crate) struct SegmentBuffer(pub(crate) Vec<u8>);

impl fmt::Debug for SegmentBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<segment of size {}>", self.0.len())
    }
}

impl fmt::Debug for BufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSlot")
            .field("id", &self.id)
            .field("segments", &self.segments)
            .finish()
    }
}

/// The slot backed directly by the binary's live loaded memory.
pub struct BaseSlot {
    pub(crate) memory_id: usize,
    pub(crate) base_pointer: BasePointer,
    pub(crate) base_size: usize,
    pub(crate) data_segments: Vec<BinarySegment>,
}

impl BaseSlot {
    /// # Safety
    ///
    /// The caller must ensure that no other references to this segment are live.
    unsafe fn segment(&self, index: usize) -> &[u8] {
        let info = &self.data_segments[index];
        let ptr = self.base_pointer.0.wrapping_add(info.virtual_address as usize);
        std::slice::from_raw_parts(ptr, info.virtual_size as usize)
    }

    /// # Safety
    ///
    /// The caller must ensure that no other references to this segment are live.
    unsafe fn segment_mut(&self, index: usize) -> &mut [u8] {
        let info = &self.data_segments[index];
        let ptr = self.base_pointer.0.wrapping_add(info.virtual_address as usize);
        std::slice::from_raw_parts_mut(ptr, info.virtual_size as usize)
    }
}

impl fmt::Debug for BaseSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseSlot")
    }
}
