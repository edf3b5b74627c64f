#![allow(missing_docs)]

use std::{error::Error, fmt, io, sync::Arc};

use timeline_types::TypeName;

#[derive(Debug, Clone)]
pub struct BinaryLayoutError {
    pub kind: BinaryLayoutErrorKind,
    pub unit: Option<String>,
}

#[derive(Debug, Clone)]
pub enum BinaryLayoutErrorKind {
    FileReadError(Arc<io::Error>),
    ObjectReadError(object::Error),
    DwarfReadError(gimli::Error),
    MissingAttribute {
        entry_label: String,
        attribute: gimli::DwAt,
    },
    UnexpectedTag {
        entry_label: String,
        expected: gimli::DwTag,
        actual: gimli::DwTag,
    },
    UnknownBaseTypeName {
        name: String,
    },
    MissingSubrangeNode {
        entry_label: String,
    },
}

impl fmt::Display for BinaryLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "in unit {}:\n  {}", unit, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Error for BinaryLayoutError {}

impl fmt::Display for BinaryLayoutErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryLayoutErrorKind::FileReadError(error) => write!(f, "file error: {}", error),
            BinaryLayoutErrorKind::ObjectReadError(error) => {
                write!(f, "object file error: {}", error)
            }
            BinaryLayoutErrorKind::DwarfReadError(error) => write!(f, "dwarf error: {}", error),
            BinaryLayoutErrorKind::MissingAttribute {
                entry_label,
                attribute,
            } => write!(
                f,
                "missing attribute {} in entry {}",
                attribute, entry_label
            ),
            BinaryLayoutErrorKind::UnexpectedTag {
                entry_label: _,
                expected,
                actual,
            } => write!(f, "expected dwarf tag {}, found {}", expected, actual),
            BinaryLayoutErrorKind::UnknownBaseTypeName { name } => {
                write!(f, "unimplemented base type name {}", name)
            }
            BinaryLayoutErrorKind::MissingSubrangeNode { entry_label: _ } => {
                write!(f, "expected subrange node")
            }
        }
    }
}

impl Error for BinaryLayoutErrorKind {}

impl From<io::Error> for BinaryLayoutError {
    fn from(v: io::Error) -> Self {
        BinaryLayoutError {
            kind: BinaryLayoutErrorKind::from(v),
            unit: None,
        }
    }
}

impl From<object::Error> for BinaryLayoutError {
    fn from(v: object::Error) -> Self {
        BinaryLayoutError {
            kind: BinaryLayoutErrorKind::from(v),
            unit: None,
        }
    }
}

impl From<gimli::Error> for BinaryLayoutError {
    fn from(v: gimli::Error) -> Self {
        BinaryLayoutError {
            kind: BinaryLayoutErrorKind::from(v),
            unit: None,
        }
    }
}

impl From<io::Error> for BinaryLayoutErrorKind {
    fn from(v: io::Error) -> Self {
        Self::FileReadError(Arc::new(v))
    }
}

impl From<object::Error> for BinaryLayoutErrorKind {
    fn from(v: object::Error) -> Self {
        Self::ObjectReadError(v)
    }
}

impl From<gimli::Error> for BinaryLayoutErrorKind {
    fn from(v: gimli::Error) -> Self {
        Self::DwarfReadError(v)
    }
}

#[derive(Debug, Clone)]
pub enum LayoutLookupError {
    UndefinedTypeName(TypeName),
    UndefinedGlobal(String),
    UndefinedConstant(String),
}

impl fmt::Display for LayoutLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutLookupError::UndefinedTypeName(type_name) => {
                write!(f, "undefined type name: {}", type_name)
            }
            LayoutLookupError::UndefinedGlobal(name) => {
                write!(f, "undefined global name: {}", name)
            }
            LayoutLookupError::UndefinedConstant(name) => {
                write!(f, "undefined constant name: {}", name)
            }
        }
    }
}

impl Error for LayoutLookupError {}
