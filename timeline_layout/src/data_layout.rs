//! Recording and looking up type and global variable definitions.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use timeline_types::{DataType, DataTypeRef, IntValue, TypeName};

use crate::LayoutLookupError::{self, *};

/// A shared reference to a data layout.
pub type DataLayoutRef = Arc<DataLayout>;

/// A description of accessible variables and types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataLayout {
    /// The definitions of structs, unions, and typedefs.
    pub type_defns: HashMap<TypeName, DataTypeRef>,
    /// The types of global variables.
    pub globals: HashMap<String, DataTypeRef>,
    /// The values of integer constants, e.g. enum variants.
    pub constants: HashMap<String, Constant>,
}

/// A constant's value and source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    /// The integer value for the constant.
    pub value: IntValue,
    /// The source for the constant.
    pub source: ConstantSource,
}

/// The source for a constant value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ConstantSource {
    /// The constant is defined as an enum variant.
    Enum {
        /// The name of the enum, or None for an anonymous enum.
        name: Option<String>,
    },
    /// The constant is defined as a preprocessor macro (not recoverable from debug info;
    /// populated by callers that know the value out of band).
    Macro,
}

impl DataLayout {
    /// Create an empty data layout.
    pub fn new() -> Self {
        Self {
            type_defns: HashMap::new(),
            globals: HashMap::new(),
            constants: HashMap::new(),
        }
    }

    /// Look up the definition of a type name.
    pub fn data_type(&self, name: &TypeName) -> Result<&DataTypeRef, LayoutLookupError> {
        self.type_defns
            .get(name)
            .ok_or_else(|| UndefinedTypeName(name.clone()))
    }

    /// Look up the definition of a type name, mutably.
    ///
    /// This is only useful if the data type hasn't been shared in multiple places.
    pub fn data_type_mut(
        &mut self,
        name: &TypeName,
    ) -> Result<&mut DataTypeRef, LayoutLookupError> {
        self.type_defns
            .get_mut(name)
            .ok_or_else(|| UndefinedTypeName(name.clone()))
    }

    /// Recursively resolve a `DataType::Name` chain to its underlying concrete type.
    pub fn concrete_type(&self, data_type: &DataTypeRef) -> Result<DataTypeRef, LayoutLookupError> {
        let mut data_type = data_type.clone();
        while let DataType::Name(name) = data_type.as_ref() {
            data_type = self.data_type(name)?.clone();
        }
        Ok(data_type)
    }

    /// Look up the type of a global variable.
    pub fn global(&self, name: &str) -> Result<&DataTypeRef, LayoutLookupError> {
        self.globals
            .get(name)
            .ok_or_else(|| UndefinedGlobal(name.to_string()))
    }

    /// Look up the value of a constant.
    pub fn constant(&self, name: &str) -> Result<&Constant, LayoutLookupError> {
        self.constants
            .get(name)
            .ok_or_else(|| UndefinedConstant(name.to_string()))
    }

    /// Collect the concrete type for every `DataType::Name` reachable from `data_type`.
    ///
    /// Data paths carry this map around so that reading/writing a value can resolve
    /// `DataType::Name` indirections without needing to borrow the layout.
    pub fn concrete_types(
        &self,
        data_type: &DataTypeRef,
    ) -> Result<IndexMap<TypeName, DataTypeRef>, LayoutLookupError> {
        let mut result = IndexMap::new();
        self.collect_concrete_types(data_type, &mut result)?;
        Ok(result)
    }

    fn collect_concrete_types(
        &self,
        data_type: &DataTypeRef,
        result: &mut IndexMap<TypeName, DataTypeRef>,
    ) -> Result<(), LayoutLookupError> {
        match data_type.as_ref() {
            DataType::Void | DataType::Int(_) | DataType::Float(_) => {}
            DataType::Pointer { base, .. } => self.collect_concrete_types(base, result)?,
            DataType::Array { base, .. } => self.collect_concrete_types(base, result)?,
            DataType::Struct { fields } | DataType::Union { fields } => {
                for field in fields.values() {
                    self.collect_concrete_types(&field.data_type, result)?;
                }
            }
            DataType::Name(name) => {
                if !result.contains_key(name) {
                    let concrete = self.concrete_type(data_type)?;
                    result.insert(name.clone(), concrete.clone());
                    self.collect_concrete_types(&concrete, result)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, data_type) in &self.type_defns {
            writeln!(f, "{} = {}", name, data_type)?;
        }
        for (name, data_type) in &self.globals {
            writeln!(f, "{}: {}", name, data_type)?;
        }
        for (name, value) in &self.constants {
            writeln!(f, "{} := {}", name, value)?;
        }
        Ok(())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.source)
    }
}

impl fmt::Display for ConstantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantSource::Enum { name } => match name {
                Some(name) => write!(f, "enum {}", name),
                None => write!(f, "anonymous enum"),
            },
            ConstantSource::Macro => write!(f, "macro"),
        }
    }
}

#[cfg(test)]
mod tests {
    use timeline_types::Namespace;

    use super::*;

    #[test]
    fn concrete_type_follows_typedef_chain() {
        let mut layout = DataLayout::new();
        let int_type: DataTypeRef = Arc::new(DataType::Int(timeline_types::IntType::S32));
        let alias_name = TypeName {
            namespace: Namespace::Typedef,
            name: "Frame".to_string(),
        };
        layout.type_defns.insert(alias_name.clone(), int_type.clone());

        let named: DataTypeRef = Arc::new(DataType::Name(alias_name));
        assert_eq!(layout.concrete_type(&named).unwrap(), int_type);
    }

    #[test]
    fn undefined_lookups_error() {
        let layout = DataLayout::new();
        assert!(layout.global("gGlobalTimer").is_err());
        assert!(layout.constant("TRUE").is_err());
    }

    #[test]
    fn concrete_types_collects_nested_struct_field_names() {
        let mut layout = DataLayout::new();
        let int_type: DataTypeRef = Arc::new(DataType::Int(timeline_types::IntType::S32));

        let vec3_name = TypeName {
            namespace: Namespace::Struct,
            name: "Vec3f".to_string(),
        };
        let mut vec3_fields = indexmap_like_fields(int_type.clone());
        let vec3_type: DataTypeRef = Arc::new(DataType::Struct {
            fields: vec3_fields.drain().collect(),
        });
        layout.type_defns.insert(vec3_name.clone(), vec3_type.clone());

        let mut outer_fields = HashMap::new();
        outer_fields.insert(
            "pos".to_string(),
            timeline_types::Field {
                offset: 0,
                data_type: Arc::new(DataType::Name(vec3_name.clone())),
            },
        );
        let outer: DataTypeRef = Arc::new(DataType::Struct {
            fields: outer_fields,
        });

        let concrete = layout.concrete_types(&outer).unwrap();
        assert_eq!(concrete.get(&vec3_name), Some(&vec3_type));
    }

    fn indexmap_like_fields(data_type: DataTypeRef) -> HashMap<String, timeline_types::Field> {
        let mut fields = HashMap::new();
        fields.insert(
            "x".to_string(),
            timeline_types::Field {
                offset: 0,
                data_type,
            },
        );
        fields
    }
}
