//! Immutable descriptors for native record types and routines.

use serde::{Deserialize, Serialize};

/// Primitive kind of a scalar or array element on the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimKind {
    Real,
    Int,
    Logical,
    Str,
}

/// One field of a native record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Shape of a record field: scalar, fixed-shape array, or nested record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Scalar { prim: PrimKind },
    Array { prim: PrimKind, shape: Vec<usize> },
    Record { type_name: String },
}

/// Describes one native record type. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Data-flow direction of a routine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

impl Direction {
    /// Whether a managed value must be supplied for this parameter.
    pub fn takes_input(&self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }

    /// Whether the native call produces a value for this parameter.
    pub fn yields_output(&self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

/// Kind of a routine parameter or return value. Arrays are validated by
/// element kind only; their shape is carried by the value itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    Real,
    Int,
    Logical,
    Str,
    Array { prim: PrimKind },
    Record { type_name: String },
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::Real => write!(f, "real"),
            ParamKind::Int => write!(f, "int"),
            ParamKind::Logical => write!(f, "logical"),
            ParamKind::Str => write!(f, "str"),
            ParamKind::Array { prim } => write!(f, "array<{prim:?}>"),
            ParamKind::Record { type_name } => write!(f, "record<{type_name}>"),
        }
    }
}

/// One parameter of a native routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: ParamKind,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub optional: bool,
}

/// Describes one native routine. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDescriptor>,
    #[serde(default)]
    pub ret: Option<ParamKind>,
}

/// The deserialized specification blob: the full exported surface.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BindingSpec {
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
    #[serde(default)]
    pub routines: Vec<RoutineDescriptor>,
}
