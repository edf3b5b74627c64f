//! Reading a [DataLayout] and section table directly from a binary's DWARF debug info.
//!
//! This walks the top level DIEs of each compilation unit. Named struct/union/typedef
//! entries are registered once under their [TypeName] and referenced elsewhere via
//! `DataType::Name`, so recursive structures (e.g. a linked list node pointing to itself)
//! never require building an infinite type graph.

use std::{borrow::Cow, collections::HashMap, fs, path::Path};

use gimli::{Dwarf, EndianSlice, RunTimeEndian, Unit, UnitOffset};
use object::{Object, ObjectSection};
use timeline_types::{DataType, DataTypeRef, FloatType, IntType, Namespace, TypeName};

use crate::{
    data_layout::{Constant, ConstantSource, DataLayout},
    error::{BinaryLayoutError, BinaryLayoutErrorKind},
};

/// A loaded section of a binary's address space, as mapped at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySegment {
    /// The section name, e.g. `.data` or `.bss`.
    pub name: String,
    /// The virtual address the section is loaded at, relative to the binary's base.
    pub virtual_address: u64,
    /// The size in bytes of the section.
    pub virtual_size: u64,
}

/// A [DataLayout] together with the binary's writable sections, read from debug info.
#[derive(Debug, Clone)]
pub struct BinaryLayout {
    /// The writable (`.data`/`.bss`-like) sections of the binary, used to classify
    /// addresses as relocatable when the binary is reloaded at a different base.
    pub segments: Vec<BinarySegment>,
    /// The parsed type/global/constant layout.
    pub data_layout: DataLayout,
}

impl BinaryLayout {
    /// Read a [BinaryLayout] from the binary at the given path using its DWARF debug info.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, BinaryLayoutError> {
        let path = path.as_ref();
        let segments = read_binary_segments(path)?;
        let data_layout = load_data_layout_from_dwarf(path)?;
        Ok(Self {
            segments,
            data_layout,
        })
    }
}

/// Read the writable sections of a binary (commonly `.data` and `.bss`).
pub fn read_binary_segments(path: &Path) -> Result<Vec<BinarySegment>, BinaryLayoutError> {
    let data = fs::read(path).map_err(|error| BinaryLayoutError {
        kind: BinaryLayoutErrorKind::from(error),
        unit: None,
    })?;
    read_binary_segments_impl(&data)
}

fn read_binary_segments_impl(data: &[u8]) -> Result<Vec<BinarySegment>, BinaryLayoutError> {
    let object = object::File::parse(data)?;
    let mut segments = Vec::new();
    for section in object.sections() {
        let name = section.name().unwrap_or("").to_string();
        if name == ".data" || name == ".bss" || name == ".sdata" || name == ".sbss" {
            segments.push(BinarySegment {
                name,
                virtual_address: section.address(),
                virtual_size: section.size(),
            });
        }
    }
    Ok(segments)
}

fn load_data_layout_from_dwarf(path: &Path) -> Result<DataLayout, BinaryLayoutError> {
    let data = fs::read(path).map_err(|error| BinaryLayoutError {
        kind: BinaryLayoutErrorKind::from(error),
        unit: None,
    })?;
    let object = object::File::parse(&*data)?;
    let endian = if object.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let load_section = |id: gimli::SectionId| -> Result<Cow<[u8]>, gimli::Error> {
        Ok(object
            .section_by_name(id.name())
            .and_then(|section| section.uncompressed_data().ok())
            .unwrap_or(Cow::Borrowed(&[][..])))
    };
    let dwarf_cow = Dwarf::load(load_section)?;
    let dwarf = dwarf_cow.borrow(|section| EndianSlice::new(section, endian));

    let mut layout = DataLayout::new();

    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let unit = dwarf.unit(header)?;
        let unit_name = unit
            .name
            .as_ref()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        // The C runtime's own compilation units contribute only clutter (libc internals,
        // not game state), and their base type names occasionally collide with the
        // game binary's; skip them.
        if unit_name.contains("crt") || unit_name.contains("mingw") {
            continue;
        }

        let mut reader = UnitReader {
            dwarf: &dwarf,
            unit: &unit,
            resolved: HashMap::new(),
            in_progress: Default::default(),
        };
        reader
            .run(&mut layout)
            .map_err(|mut error: BinaryLayoutError| {
                error.unit = Some(unit_name.clone());
                error
            })?;
    }

    Ok(layout)
}

type R<'a> = EndianSlice<'a, RunTimeEndian>;

struct UnitReader<'a> {
    dwarf: &'a Dwarf<R<'a>>,
    unit: &'a Unit<R<'a>>,
    /// Cache of anonymous (unnamed) type DIEs already converted to a `DataTypeRef`.
    resolved: HashMap<UnitOffset, DataTypeRef>,
    /// Named struct/union entries currently being built, to avoid reprocessing.
    in_progress: std::collections::HashSet<TypeName>,
}

impl<'a> UnitReader<'a> {
    fn run(&mut self, layout: &mut DataLayout) -> Result<(), BinaryLayoutError> {
        let mut tree = self.unit.entries_tree(None)?;
        let root = tree.root()?;
        let mut children = root.children();
        while let Some(child) = children.next()? {
            let entry = child.entry().clone();
            match entry.tag() {
                gimli::DW_TAG_structure_type | gimli::DW_TAG_union_type => {
                    if let Some(name) = self.entry_name(&entry)? {
                        let namespace = if entry.tag() == gimli::DW_TAG_structure_type {
                            Namespace::Struct
                        } else {
                            Namespace::Union
                        };
                        let type_name = TypeName { namespace, name };
                        self.build_named_record(&entry, child.entry().offset(), type_name, layout)?;
                    }
                }
                gimli::DW_TAG_typedef => {
                    if let (Some(name), Some(target_offset)) =
                        (self.entry_name(&entry)?, self.type_attr_offset(&entry)?)
                    {
                        let type_name = TypeName {
                            namespace: Namespace::Typedef,
                            name,
                        };
                        if !layout.type_defns.contains_key(&type_name) {
                            let target = self.read_type_at_offset(target_offset, layout)?;
                            layout.type_defns.insert(type_name, target);
                        }
                    }
                }
                gimli::DW_TAG_enumeration_type => {
                    self.read_enumeration(&entry, layout)?;
                }
                gimli::DW_TAG_variable => {
                    self.read_global_variable(&entry, layout)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn entry_label(&self, entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>) -> String {
        format!("<{:#x}>", entry.offset().0)
    }

    fn entry_name(
        &self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
    ) -> Result<Option<String>, BinaryLayoutError> {
        match entry.attr(gimli::DW_AT_name)? {
            Some(attr) => {
                let value = self.dwarf.attr_string(self.unit, attr.value())?;
                Ok(Some(value.to_string_lossy().into_owned()))
            }
            None => Ok(None),
        }
    }

    fn type_attr_offset(
        &self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
    ) -> Result<Option<UnitOffset>, BinaryLayoutError> {
        match entry.attr_value(gimli::DW_AT_type)? {
            Some(gimli::AttributeValue::UnitRef(offset)) => Ok(Some(offset)),
            _ => Ok(None),
        }
    }

    fn read_type_at_offset(
        &mut self,
        offset: UnitOffset,
        layout: &mut DataLayout,
    ) -> Result<DataTypeRef, BinaryLayoutError> {
        if let Some(cached) = self.resolved.get(&offset) {
            return Ok(cached.clone());
        }
        let entry = self.unit.entry(offset)?;
        let data_type = self.read_type_entry(&entry, layout)?;
        self.resolved.insert(offset, data_type.clone());
        Ok(data_type)
    }

    fn optional_type_ref(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        layout: &mut DataLayout,
    ) -> Result<DataTypeRef, BinaryLayoutError> {
        match self.type_attr_offset(entry)? {
            Some(offset) => self.read_type_at_offset(offset, layout),
            None => Ok(DataTypeRef::new(DataType::Void)),
        }
    }

    fn read_type_entry(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        layout: &mut DataLayout,
    ) -> Result<DataTypeRef, BinaryLayoutError> {
        match entry.tag() {
            gimli::DW_TAG_base_type => {
                let name = self.entry_name(entry)?.unwrap_or_default();
                Ok(DataTypeRef::new(read_base_type(&name)?))
            }
            gimli::DW_TAG_pointer_type => {
                let base = self.optional_type_ref(entry, layout)?;
                let stride = known_size(&base);
                Ok(DataTypeRef::new(DataType::Pointer { base, stride }))
            }
            gimli::DW_TAG_const_type | gimli::DW_TAG_volatile_type => {
                self.optional_type_ref(entry, layout)
            }
            gimli::DW_TAG_typedef | gimli::DW_TAG_structure_type | gimli::DW_TAG_union_type => {
                if let Some(name) = self.entry_name(entry)? {
                    let namespace = match entry.tag() {
                        gimli::DW_TAG_typedef => Namespace::Typedef,
                        gimli::DW_TAG_structure_type => Namespace::Struct,
                        _ => Namespace::Union,
                    };
                    let type_name = TypeName { namespace, name };
                    if entry.tag() == gimli::DW_TAG_typedef {
                        if !layout.type_defns.contains_key(&type_name) {
                            let target = self.optional_type_ref(entry, layout)?;
                            layout.type_defns.insert(type_name.clone(), target);
                        }
                    } else {
                        self.build_named_record(entry, entry.offset(), type_name.clone(), layout)?;
                    }
                    Ok(DataTypeRef::new(DataType::Name(type_name)))
                } else {
                    // Anonymous struct/union referenced directly (not through a typedef).
                    self.build_anonymous_record(entry, layout)
                }
            }
            gimli::DW_TAG_enumeration_type => {
                self.read_enumeration(entry, layout)?;
                let base = self.optional_type_ref(entry, layout)?;
                match base.as_ref() {
                    DataType::Void => Ok(DataTypeRef::new(DataType::Int(IntType::S32))),
                    _ => Ok(base),
                }
            }
            gimli::DW_TAG_array_type => self.read_array_type(entry, layout),
            gimli::DW_TAG_subroutine_type => Ok(DataTypeRef::new(DataType::Void)),
            _ => Ok(DataTypeRef::new(DataType::Void)),
        }
    }

    fn build_named_record(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        entry_offset: UnitOffset,
        type_name: TypeName,
        layout: &mut DataLayout,
    ) -> Result<(), BinaryLayoutError> {
        if layout.type_defns.contains_key(&type_name) || self.in_progress.contains(&type_name) {
            return Ok(());
        }
        // A forward-declared `struct Foo;` with no member children: leave it unregistered
        // rather than inserting an empty placeholder, since no code should dereference it.
        if !self.has_children(entry_offset)? {
            return Ok(());
        }
        self.in_progress.insert(type_name.clone());
        let fields = self.read_fields(entry_offset, layout)?;
        self.in_progress.remove(&type_name);
        let data_type = if type_name.namespace == Namespace::Union {
            DataType::Union { fields }
        } else {
            DataType::Struct { fields }
        };
        layout.type_defns.insert(type_name, DataTypeRef::new(data_type));
        Ok(())
    }

    fn build_anonymous_record(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        layout: &mut DataLayout,
    ) -> Result<DataTypeRef, BinaryLayoutError> {
        let fields = self.read_fields(entry.offset(), layout)?;
        let data_type = if entry.tag() == gimli::DW_TAG_union_type {
            DataType::Union { fields }
        } else {
            DataType::Struct { fields }
        };
        Ok(DataTypeRef::new(data_type))
    }

    fn has_children(&self, offset: UnitOffset) -> Result<bool, BinaryLayoutError> {
        let mut tree = self.unit.entries_tree(Some(offset))?;
        let node = tree.root()?;
        Ok(node.children().next()?.is_some())
    }

    fn read_fields(
        &mut self,
        offset: UnitOffset,
        layout: &mut DataLayout,
    ) -> Result<HashMap<String, timeline_types::Field>, BinaryLayoutError> {
        let mut fields = HashMap::new();
        let mut anon_count = 0;
        let mut tree = self.unit.entries_tree(Some(offset))?;
        let root = tree.root()?;
        let mut children = root.children();
        while let Some(child) = children.next()? {
            let member = child.entry().clone();
            if member.tag() != gimli::DW_TAG_member {
                continue;
            }
            let field_offset = match member.attr_value(gimli::DW_AT_data_member_location)? {
                Some(gimli::AttributeValue::Udata(v)) => v as usize,
                Some(gimli::AttributeValue::Sdata(v)) => v as usize,
                _ => 0,
            };
            let data_type = self.optional_type_ref(&member, layout)?;
            let name = match self.entry_name(&member)? {
                Some(name) => name,
                None => {
                    anon_count += 1;
                    format!("__anon{}", anon_count)
                }
            };
            fields.insert(
                name,
                timeline_types::Field {
                    offset: field_offset,
                    data_type,
                },
            );
        }
        Ok(fields)
    }

    fn read_array_type(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        layout: &mut DataLayout,
    ) -> Result<DataTypeRef, BinaryLayoutError> {
        let base = self.optional_type_ref(entry, layout)?;
        let stride = known_size(&base).unwrap_or(1);

        let mut lengths = Vec::new();
        let mut tree = self.unit.entries_tree(Some(entry.offset()))?;
        let root = tree.root()?;
        let mut children = root.children();
        while let Some(child) = children.next()? {
            let sub = child.entry();
            if sub.tag() != gimli::DW_TAG_subrange_type {
                continue;
            }
            let length = match sub.attr_value(gimli::DW_AT_count)? {
                Some(gimli::AttributeValue::Udata(count)) => Some(count as usize),
                _ => match sub.attr_value(gimli::DW_AT_upper_bound)? {
                    Some(gimli::AttributeValue::Udata(bound)) => Some(bound as usize + 1),
                    Some(gimli::AttributeValue::Sdata(bound)) => Some(bound as usize + 1),
                    _ => None,
                },
            };
            lengths.push(length);
        }

        if lengths.is_empty() {
            return Ok(DataTypeRef::new(DataType::Array {
                base,
                length: None,
                stride,
            }));
        }

        // Build nested array types from the innermost dimension outward.
        let mut result = base;
        let mut result_stride = stride;
        for length in lengths.into_iter().rev() {
            let array = DataType::Array {
                base: result,
                length,
                stride: result_stride,
            };
            result_stride = length.map(|len| len * result_stride).unwrap_or(result_stride);
            result = DataTypeRef::new(array);
        }
        Ok(result)
    }

    fn read_enumeration(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        layout: &mut DataLayout,
    ) -> Result<(), BinaryLayoutError> {
        let enum_name = self.entry_name(entry)?;
        let mut tree = self.unit.entries_tree(Some(entry.offset()))?;
        let root = tree.root()?;
        let mut children = root.children();
        while let Some(child) = children.next()? {
            let variant = child.entry();
            if variant.tag() != gimli::DW_TAG_enumerator {
                continue;
            }
            let name = match self.entry_name(variant)? {
                Some(name) => name,
                None => continue,
            };
            let value = match variant.attr_value(gimli::DW_AT_const_value)? {
                Some(gimli::AttributeValue::Sdata(v)) => v as timeline_types::IntValue,
                Some(gimli::AttributeValue::Udata(v)) => v as timeline_types::IntValue,
                _ => continue,
            };
            layout.constants.entry(name).or_insert(Constant {
                value,
                source: ConstantSource::Enum {
                    name: enum_name.clone(),
                },
            });
        }
        Ok(())
    }

    fn read_global_variable(
        &mut self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, R<'a>>,
        layout: &mut DataLayout,
    ) -> Result<(), BinaryLayoutError> {
        let name = match self.entry_name(entry)? {
            Some(name) => name,
            None => return Ok(()),
        };
        if layout.globals.contains_key(&name) {
            return Ok(());
        }
        let data_type = self.optional_type_ref(entry, layout)?;
        layout.globals.insert(name, data_type);
        Ok(())
    }
}

fn known_size(data_type: &DataTypeRef) -> Option<usize> {
    match data_type.as_ref() {
        DataType::Int(int_type) => Some(int_type.size()),
        DataType::Float(float_type) => Some(float_type.size()),
        DataType::Pointer { .. } => Some(std::mem::size_of::<usize>()),
        _ => None,
    }
}

fn read_base_type(name: &str) -> Result<DataType, BinaryLayoutError> {
    Ok(match name {
        "char" | "signed char" => DataType::Int(IntType::S8),
        "unsigned char" | "_Bool" | "bool" => DataType::Int(IntType::U8),
        "short" | "short int" => DataType::Int(IntType::S16),
        "short unsigned int" | "unsigned short" => DataType::Int(IntType::U16),
        "int" | "signed int" => DataType::Int(IntType::S32),
        "unsigned int" | "unsigned" => DataType::Int(IntType::U32),
        "long" | "long int" => DataType::Int(IntType::S32),
        "long unsigned int" | "unsigned long" => DataType::Int(IntType::U32),
        "long long" | "long long int" => DataType::Int(IntType::S64),
        "long long unsigned int" | "unsigned long long" => DataType::Int(IntType::U64),
        "__int128" => DataType::Int(IntType::S64),
        "__int128 unsigned" => DataType::Int(IntType::U64),
        "float" => DataType::Float(FloatType::F32),
        "double" | "long double" => DataType::Float(FloatType::F64),
        "void" | "" => DataType::Void,
        _ => {
            return Err(BinaryLayoutError {
                kind: BinaryLayoutErrorKind::UnknownBaseTypeName {
                    name: name.to_string(),
                },
                unit: None,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_mapping_covers_common_c_names() {
        assert_eq!(read_base_type("int").unwrap(), DataType::Int(IntType::S32));
        assert_eq!(
            read_base_type("unsigned int").unwrap(),
            DataType::Int(IntType::U32)
        );
        assert_eq!(read_base_type("float").unwrap(), DataType::Float(FloatType::F32));
        assert!(read_base_type("__bogus_type").is_err());
    }

    #[test]
    fn known_size_only_for_concrete_scalars() {
        let int_type = DataTypeRef::new(DataType::Int(IntType::U32));
        assert_eq!(known_size(&int_type), Some(4));

        let name_type = DataTypeRef::new(DataType::Name(TypeName {
            namespace: Namespace::Struct,
            name: "Foo".to_string(),
        }));
        assert_eq!(known_size(&name_type), None);
    }
}
