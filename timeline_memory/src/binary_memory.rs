use std::{
    collections::HashMap,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use dlopen::raw::Library;
use object::{Object, ObjectSymbol};
use timeline_layout::{BinaryLayout, BinarySegment};
use timeline_types::{Address, IntType};

use crate::{
    error::BinaryLoadError,
    slot_impl::{BasePointer, BaseSlot, BufferSlot, SegmentBuffer, SlotImpl},
    traits::{GameMemory, MemoryRead, MemoryWrite, SymbolLookup},
    MemoryError,
};

static NEXT_MEMORY_ID: AtomicUsize = AtomicUsize::new(0);

fn next_memory_id() -> usize {
    NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed)
}

/// The result of classifying an address against a [BinaryMemory]'s layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassifiedAddress {
    /// An address in shared, immutable memory (code/rodata), given as an offset from the
    /// binary's load base.
    Static { offset: usize },
    /// An address in a writable segment, given as the segment index and the offset within it.
    Relocatable { segment: usize, offset: usize },
    /// An address outside of the binary's mapped range.
    Invalid,
}

fn classify(
    address: Address,
    base_pointer: BasePointer,
    base_size: usize,
    data_segments: &[BinarySegment],
) -> ClassifiedAddress {
    let offset = address.0.wrapping_sub(base_pointer.0 as usize);
    if offset >= base_size {
        return ClassifiedAddress::Invalid;
    }
    for (index, segment) in data_segments.iter().enumerate() {
        let start = segment.virtual_address as usize;
        let end = start + segment.virtual_size as usize;
        if (start..end).contains(&offset) {
            return ClassifiedAddress::Relocatable {
                segment: index,
                offset: offset - start,
            };
        }
    }
    ClassifiedAddress::Static { offset }
}

/// Reads the binary's static symbol table, mapping exported symbol names to their address
/// as recorded in the file (before any runtime relocation).
fn static_symbol_offsets(path: &Path) -> Result<HashMap<String, u64>, BinaryLoadError> {
    let data = std::fs::read(path)?;
    let object = object::File::parse(&*data).map_err(|e| {
        BinaryLoadError::BinaryLayoutError(timeline_layout::BinaryLayoutError {
            kind: timeline_layout::BinaryLayoutErrorKind::from(e),
            unit: None,
        })
    })?;
    let mut offsets = HashMap::new();
    for symbol in object.symbols() {
        if let Ok(name) = symbol.name() {
            if !name.is_empty() && symbol.address() != 0 {
                offsets.insert(name.to_string(), symbol.address());
            }
        }
    }
    Ok(offsets)
}

/// Access to a loaded target binary's memory, with support for base/backup slots.
pub struct BinaryMemory {
    id: usize,
    library: Library,
    base_pointer: BasePointer,
    base_size: usize,
    data_segments: Vec<BinarySegment>,
    next_buffer_id: AtomicUsize,
    advance_function: String,
}

impl std::fmt::Debug for BinaryMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinaryMemory {{ id: {} }}", self.id)
    }
}

impl BinaryMemory {
    /// Load the binary at `path` and call its `init_function`, returning the memory handle
    /// and its base slot.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `path` refers to a binary compatible with the current
    /// process, and that calling `init_function` with no arguments is sound.
    pub unsafe fn load(
        path: impl AsRef<Path>,
        init_function: &str,
        advance_function: &str,
    ) -> Result<(Self, SlotImpl), BinaryLoadError> {
        let path = path.as_ref();
        let layout = BinaryLayout::read(path)?;
        if layout.segments.is_empty() {
            return Err(BinaryLoadError::MissingDataSegments);
        }
        let symbol_offsets = static_symbol_offsets(path)?;

        let library = Library::open(path)?;

        let base_pointer = Self::compute_base_pointer(&library, &symbol_offsets)?;

        let base_size = layout
            .segments
            .iter()
            .map(|s| s.virtual_address + s.virtual_size)
            .max()
            .unwrap_or(0) as usize;

        let memory = BinaryMemory {
            id: next_memory_id(),
            library,
            base_pointer,
            base_size,
            data_segments: layout.segments,
            next_buffer_id: AtomicUsize::new(0),
            advance_function: advance_function.to_string(),
        };

        let init: unsafe extern "C" fn() = *memory
            .library
            .symbol(init_function)
            .map_err(|_| BinaryLoadError::UndefinedSymbol(init_function.to_string()))?;
        init();

        let base_slot = SlotImpl::Base(BaseSlot {
            memory_id: memory.id,
            base_pointer: memory.base_pointer,
            base_size: memory.base_size,
            data_segments: memory.data_segments.clone(),
        });

        Ok((memory, base_slot))
    }

    unsafe fn compute_base_pointer(
        library: &Library,
        symbol_offsets: &HashMap<String, u64>,
    ) -> Result<BasePointer, BinaryLoadError> {
        for (name, static_offset) in symbol_offsets {
            if let Ok(runtime_ptr) = library.symbol::<*const u8>(name) {
                let runtime_addr = runtime_ptr as usize;
                let base = runtime_addr.wrapping_sub(*static_offset as usize);
                return Ok(BasePointer(base as *mut u8));
            }
        }
        Err(BinaryLoadError::UndefinedSymbol(
            "<no relocatable anchor symbol found>".to_string(),
        ))
    }

    /// Call the binary's per-frame update/advance function, e.g. the game's main loop body.
    ///
    /// # Safety
    ///
    /// The caller must ensure this is only called with the base slot as the active memory,
    /// matching the binary's actual expectations for its own global state.
    pub unsafe fn advance(&self, advance_function: &str) -> Result<(), BinaryLoadError> {
        let advance: unsafe extern "C" fn() = *self
            .library
            .symbol(advance_function)
            .map_err(|_| BinaryLoadError::UndefinedSymbol(advance_function.to_string()))?;
        advance();
        Ok(())
    }

    fn validate_slot(&self, slot: &SlotImpl) {
        assert_eq!(
            slot.memory_id(),
            self.id,
            "slot does not belong to this BinaryMemory instance"
        );
    }

    fn validate_base_slot(&self, slot: &SlotImpl) {
        self.validate_slot(slot);
        assert!(
            matches!(slot, SlotImpl::Base(_)),
            "expected the base slot, found a backup slot"
        );
    }

    fn classify_address(&self, address: Address) -> ClassifiedAddress {
        classify(
            address,
            self.base_pointer,
            self.base_size,
            &self.data_segments,
        )
    }

    fn static_to_pointer(&self, offset: usize) -> *const u8 {
        self.base_pointer.0.wrapping_add(offset)
    }
}

impl SymbolLookup for BinaryMemory {
    fn symbol_address(&self, symbol: &str) -> Option<Address> {
        unsafe {
            let ptr: *const u8 = *self.library.symbol(symbol).ok()?;
            Some(Address(ptr as usize))
        }
    }
}

/// A read-only view of shared static memory.
#[derive(Debug)]
pub struct BinaryStaticView<'a> {
    memory: &'a BinaryMemory,
}

/// A read-only view of static and non-static memory, backed by a particular slot.
#[derive(Debug)]
pub struct BinarySlotView<'a> {
    memory: &'a BinaryMemory,
    slot: &'a SlotImpl,
}

/// A read-write view of static and non-static memory, backed by a particular slot.
#[derive(Debug)]
pub struct BinarySlotViewMut<'a> {
    memory: &'a BinaryMemory,
    slot: &'a mut SlotImpl,
}

macro_rules! impl_read_primitive {
    ($read_name:ident, $read_many:ident, $ty:ty) => {
        fn $read_many(&self, addr: Address, buf: &mut [$ty]) -> Result<(), MemoryError> {
            let size = std::mem::size_of::<$ty>();
            for (i, slot) in buf.iter_mut().enumerate() {
                let byte_addr = addr + i * size;
                let bytes = self.read_bytes(byte_addr, size)?;
                let mut array = [0u8; std::mem::size_of::<$ty>()];
                array.copy_from_slice(&bytes);
                *slot = <$ty>::from_ne_bytes(array);
            }
            Ok(())
        }
    };
}

impl<'a> BinaryStaticView<'a> {
    fn read_bytes(&self, addr: Address, size: usize) -> Result<Vec<u8>, MemoryError> {
        match self.memory.classify_address(addr) {
            ClassifiedAddress::Static { offset } => unsafe {
                let ptr = self.memory.static_to_pointer(offset);
                Ok(std::slice::from_raw_parts(ptr, size).to_vec())
            },
            ClassifiedAddress::Relocatable { .. } => {
                Err(MemoryError::NonStaticAddressInStaticView)
            }
            ClassifiedAddress::Invalid => Err(MemoryError::InvalidAddress),
        }
    }
}

impl<'a> MemoryRead for BinaryStaticView<'a> {
    fn read_u8s(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        buf.copy_from_slice(&self.read_bytes(addr, buf.len())?);
        Ok(())
    }

    impl_read_primitive!(read_u16, read_u16s, u16);
    impl_read_primitive!(read_u32, read_u32s, u32);
    impl_read_primitive!(read_u64, read_u64s, u64);

    fn read_addrs(&self, addr: Address, buf: &mut [Address]) -> Result<(), MemoryError> {
        let int_type = self.pointer_int_type();
        for (i, slot) in buf.iter_mut().enumerate() {
            let n = self.read_int(addr + i * int_type.size(), int_type)?;
            *slot = Address(n as usize);
        }
        Ok(())
    }

    fn pointer_int_type(&self) -> IntType {
        if std::mem::size_of::<usize>() == 8 {
            IntType::U64
        } else {
            IntType::U32
        }
    }
}

impl<'a> BinarySlotView<'a> {
    fn read_bytes(&self, addr: Address, size: usize) -> Result<Vec<u8>, MemoryError> {
        match self.memory.classify_address(addr) {
            ClassifiedAddress::Static { offset } => unsafe {
                let ptr = self.memory.static_to_pointer(offset);
                Ok(std::slice::from_raw_parts(ptr, size).to_vec())
            },
            ClassifiedAddress::Relocatable { segment, offset } => unsafe {
                let data = self.slot.segment(segment);
                Ok(data[offset..offset + size].to_vec())
            },
            ClassifiedAddress::Invalid => Err(MemoryError::InvalidAddress),
        }
    }
}

impl<'a> MemoryRead for BinarySlotView<'a> {
    fn read_u8s(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        buf.copy_from_slice(&self.read_bytes(addr, buf.len())?);
        Ok(())
    }

    impl_read_primitive!(read_u16, read_u16s, u16);
    impl_read_primitive!(read_u32, read_u32s, u32);
    impl_read_primitive!(read_u64, read_u64s, u64);

    fn read_addrs(&self, addr: Address, buf: &mut [Address]) -> Result<(), MemoryError> {
        let int_type = self.pointer_int_type();
        for (i, slot) in buf.iter_mut().enumerate() {
            let n = self.read_int(addr + i * int_type.size(), int_type)?;
            *slot = Address(n as usize);
        }
        Ok(())
    }

    fn pointer_int_type(&self) -> IntType {
        if std::mem::size_of::<usize>() == 8 {
            IntType::U64
        } else {
            IntType::U32
        }
    }
}

impl<'a> BinarySlotViewMut<'a> {
    fn read_bytes(&self, addr: Address, size: usize) -> Result<Vec<u8>, MemoryError> {
        match self.memory.classify_address(addr) {
            ClassifiedAddress::Static { offset } => unsafe {
                let ptr = self.memory.static_to_pointer(offset);
                Ok(std::slice::from_raw_parts(ptr, size).to_vec())
            },
            ClassifiedAddress::Relocatable { segment, offset } => unsafe {
                let data = self.slot.segment(segment);
                Ok(data[offset..offset + size].to_vec())
            },
            ClassifiedAddress::Invalid => Err(MemoryError::InvalidAddress),
        }
    }

    fn write_bytes(&mut self, addr: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        match self.memory.classify_address(addr) {
            ClassifiedAddress::Static { .. } => Err(MemoryError::WriteToStaticAddress),
            ClassifiedAddress::Relocatable { segment, offset } => unsafe {
                let data = self.slot.segment_mut(segment);
                data[offset..offset + bytes.len()].copy_from_slice(bytes);
                Ok(())
            },
            ClassifiedAddress::Invalid => Err(MemoryError::InvalidAddress),
        }
    }
}

impl<'a> MemoryRead for BinarySlotViewMut<'a> {
    fn read_u8s(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        buf.copy_from_slice(&self.read_bytes(addr, buf.len())?);
        Ok(())
    }

    impl_read_primitive!(read_u16, read_u16s, u16);
    impl_read_primitive!(read_u32, read_u32s, u32);
    impl_read_primitive!(read_u64, read_u64s, u64);

    fn read_addrs(&self, addr: Address, buf: &mut [Address]) -> Result<(), MemoryError> {
        let int_type = self.pointer_int_type();
        for (i, slot) in buf.iter_mut().enumerate() {
            let n = self.read_int(addr + i * int_type.size(), int_type)?;
            *slot = Address(n as usize);
        }
        Ok(())
    }

    fn pointer_int_type(&self) -> IntType {
        if std::mem::size_of::<usize>() == 8 {
            IntType::U64
        } else {
            IntType::U32
        }
    }
}

macro_rules! impl_write_primitive {
    ($write_name:ident, $write_many:ident, $ty:ty) => {
        fn $write_many(&mut self, addr: Address, buf: &[$ty]) -> Result<(), MemoryError> {
            let size = std::mem::size_of::<$ty>();
            for (i, value) in buf.iter().enumerate() {
                self.write_bytes(addr + i * size, &value.to_ne_bytes())?;
            }
            Ok(())
        }
    };
}

impl<'a> MemoryWrite for BinarySlotViewMut<'a> {
    fn write_u8s(&mut self, addr: Address, buf: &[u8]) -> Result<(), MemoryError> {
        self.write_bytes(addr, buf)
    }

    impl_write_primitive!(write_u16, write_u16s, u16);
    impl_write_primitive!(write_u32, write_u32s, u32);
    impl_write_primitive!(write_u64, write_u64s, u64);

    fn write_addrs(&mut self, addr: Address, buf: &[Address]) -> Result<(), MemoryError> {
        let int_type = self.pointer_int_type();
        for (i, value) in buf.iter().enumerate() {
            self.write_int(addr + i * int_type.size(), int_type, value.0 as i128)?;
        }
        Ok(())
    }
}

impl GameMemory for BinaryMemory {
    type Slot = SlotImpl;

    type StaticView<'a> = BinaryStaticView<'a> where Self: 'a;
    type SlotView<'a> = BinarySlotView<'a> where Self: 'a;
    type SlotViewMut<'a> = BinarySlotViewMut<'a> where Self: 'a;

    fn static_view(&self) -> Self::StaticView<'_> {
        BinaryStaticView { memory: self }
    }

    fn with_slot<'a>(&'a self, slot: &'a Self::Slot) -> Self::SlotView<'a> {
        self.validate_slot(slot);
        BinarySlotView { memory: self, slot }
    }

    fn with_slot_mut<'a>(&'a self, slot: &'a mut Self::Slot) -> Self::SlotViewMut<'a> {
        self.validate_slot(slot);
        BinarySlotViewMut { memory: self, slot }
    }

    fn create_backup_slot(&self) -> Self::Slot {
        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        let segments = self
            .data_segments
            .iter()
            .map(|s| SegmentBuffer(vec![0u8; s.virtual_size as usize]))
            .collect();
        SlotImpl::Buffer(BufferSlot {
            memory_id: self.id,
            id,
            segments,
        })
    }

    fn copy_slot(&self, dst: &mut Self::Slot, src: &Self::Slot) {
        self.validate_slot(dst);
        self.validate_slot(src);
        for index in 0..self.data_segments.len() {
            unsafe {
                let src_data = src.segment(index).to_vec();
                dst.segment_mut(index).copy_from_slice(&src_data);
            }
        }
    }

    fn advance_base_slot(&self, base_slot: &mut Self::Slot) {
        self.validate_base_slot(base_slot);
        unsafe {
            // The base slot's segments already alias the binary's live memory, so the
            // advance function's writes land directly in it.
            let advance_function = self.advance_function.clone();
            self.advance(&advance_function)
                .expect("missing advance-frame symbol");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<BinarySegment> {
        vec![BinarySegment {
            name: ".data".to_string(),
            virtual_address: 0x500,
            virtual_size: 0x100,
        }]
    }

    #[test]
    fn classify_address_distinguishes_static_and_relocatable() {
        let base = BasePointer(0x1000 as *mut u8);
        let segments = segments();

        assert_eq!(
            classify(Address(0x1000 + 0x10), base, 0x2000, &segments),
            ClassifiedAddress::Static { offset: 0x10 }
        );
        assert_eq!(
            classify(Address(0x1000 + 0x510), base, 0x2000, &segments),
            ClassifiedAddress::Relocatable {
                segment: 0,
                offset: 0x10
            }
        );
        assert_eq!(
            classify(Address(0x1000 + 0x3000), base, 0x2000, &segments),
            ClassifiedAddress::Invalid
        );
    }

    #[test]
    fn classify_address_before_base_is_invalid() {
        let base = BasePointer(0x1000 as *mut u8);
        assert_eq!(
            classify(Address(0x500), base, 0x2000, &segments()),
            ClassifiedAddress::Invalid
        );
    }
}
