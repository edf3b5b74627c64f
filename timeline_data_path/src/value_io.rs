//! Recursive [Value] <-> memory conversion, shared by [crate::GlobalDataPath::read]/`write`.

use indexmap::IndexMap;
use timeline_memory::{MemoryRead, MemoryWrite};
use timeline_types::{DataType, DataTypeRef, TypeName, Value};

use crate::DataError::{self, *};

pub(crate) fn read_value_impl(
    memory: &impl MemoryRead,
    addr: timeline_types::Address,
    data_type: &DataTypeRef,
    concrete_types: &IndexMap<TypeName, DataTypeRef>,
) -> Result<Value, DataError> {
    let value = match data_type.as_ref() {
        DataType::Void => Value::None,
        DataType::Int(int_type) => Value::Int(memory.read_int(addr, *int_type)?),
        DataType::Float(float_type) => Value::Float(memory.read_float(addr, *float_type)?),
        DataType::Pointer { .. } => Value::Address(memory.read_addr(addr)?),
        DataType::Array {
            base,
            length,
            stride,
        } => match *length {
            Some(length) => {
                let values: Vec<Value> = (0..length)
                    .map(|index| {
                        read_value_impl(memory, addr + index * *stride, base, concrete_types)
                    })
                    .collect::<Result<_, DataError>>()?;
                Value::Array(values)
            }
            None => return Err(ReadUnsizedArray),
        },
        DataType::Struct { fields } => {
            let mut field_values: IndexMap<String, Value> = IndexMap::new();
            for (name, field) in fields {
                let field_value = read_value_impl(
                    memory,
                    addr + field.offset,
                    &field.data_type,
                    concrete_types,
                )?;
                field_values.insert(name.clone(), field_value);
            }
            Value::Struct(Box::new(field_values))
        }
        DataType::Union { .. } => return Err(ReadUnion),
        DataType::Name(type_name) => {
            let resolved_type = concrete_types
                .get(type_name)
                .expect("missing concrete type for type name");
            read_value_impl(memory, addr, resolved_type, concrete_types)?
        }
    };
    Ok(value)
}

pub(crate) fn write_value_impl(
    memory: &mut impl MemoryWrite,
    addr: timeline_types::Address,
    data_type: &DataTypeRef,
    value: Value,
    concrete_types: &IndexMap<TypeName, DataTypeRef>,
) -> Result<(), DataError> {
    match data_type.as_ref() {
        DataType::Void => value.try_as_none()?,
        DataType::Int(int_type) => {
            memory.write_int(addr, *int_type, value.try_as_int_lenient()?)?
        }
        DataType::Float(float_type) => {
            memory.write_float(addr, *float_type, value.try_as_float_lenient()?)?
        }
        DataType::Pointer { .. } => memory.write_addr(addr, value.try_as_address()?)?,
        DataType::Array {
            base,
            length,
            stride,
        } => {
            let elements = match *length {
                Some(length) => value.try_as_array_with_len(length)?,
                None => value.try_as_array()?,
            };
            for (i, element) in elements.iter().enumerate() {
                write_value_impl(memory, addr + i * *stride, base, element.clone(), concrete_types)?;
            }
        }
        DataType::Struct { fields } => {
            let field_values = value.try_as_struct()?;
            for name in field_values.keys() {
                if !fields.contains_key(name) {
                    return Err(WriteExtraField(name.clone()));
                }
            }
            for name in fields.keys() {
                if !field_values.contains_key(name) {
                    return Err(WriteMissingField(name.clone()));
                }
            }
            for (field_name, field) in fields {
                let field_value = field_values[field_name].clone();
                write_value_impl(
                    memory,
                    addr + field.offset,
                    &field.data_type,
                    field_value,
                    concrete_types,
                )?;
            }
        }
        DataType::Union { .. } => return Err(WriteUnion),
        DataType::Name(type_name) => {
            let resolved_type = concrete_types
                .get(type_name)
                .expect("missing concrete type for type name");
            write_value_impl(memory, addr, resolved_type, value, concrete_types)?
        }
    }
    Ok(())
}
