//! The resolved type model attached to every expression.
//!
//! Only the parts of a type that the mutability analysis looks at are kept:
//! the category discriminator, where reference data lives, whether an array
//! is dynamically sized, whether a contract type is the `super` reference, and
//! a function type's declared mutability.
//!
//! Addresses belong to the integer category, matching the language revision
//! in which `address` is an integer type with extra members.

use serde::{Deserialize, Serialize};

use crate::mutability::StateMutability;
use crate::type_id::TypeId;

/// Coarse type discriminator consulted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCategory {
    Integer,
    Bool,
    FixedBytes,
    Contract,
    Magic,
    Struct,
    Array,
    Mapping,
    Function,
    Tuple,
    TypeName,
    Modifier,
}

/// Where the data of a reference type lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataLocation {
    /// Persistent per-contract storage.
    Storage,
    /// Transient memory.
    Memory,
    /// Read-only call data.
    CallData,
}

/// The language-provided environment objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MagicKind {
    /// `block`
    Block,
    /// `msg`
    Message,
    /// `tx`
    Transaction,
}

/// Signature of a callable value, including its declared mutability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: Vec<TypeId>,
    pub returns: Vec<TypeId>,
    pub mutability: StateMutability,
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolType {
    Bool,

    /// `uintN` / `intN`.
    Integer { bits: u16, signed: bool },

    /// `address`; integer category.
    Address,

    /// `bytesN`.
    FixedBytes(u8),

    /// A contract type. `is_super` marks the type of the `super` magic.
    Contract { name: String, is_super: bool },

    /// Type of `block`, `msg` or `tx`.
    Magic(MagicKind),

    /// A struct reference bound to a data location.
    Struct { name: String, location: DataLocation },

    /// An array reference. `length == None` means dynamically sized.
    /// `bytes` and `string` are dynamic arrays of `bytes1`.
    Array {
        element: TypeId,
        length: Option<u32>,
        location: DataLocation,
    },

    /// A mapping; always lives in storage.
    Mapping { key: TypeId, value: TypeId },

    Function(FunctionType),

    Tuple(Vec<TypeId>),

    /// Type of an expression that names a type, e.g. `uint` in `uint(x)`.
    TypeName(TypeId),

    /// Type of an identifier naming a modifier.
    Modifier,
}

impl SolType {
    /// Returns the category discriminator of this type.
    pub fn category(&self) -> TypeCategory {
        match self {
            SolType::Bool => TypeCategory::Bool,
            SolType::Integer { .. } | SolType::Address => TypeCategory::Integer,
            SolType::FixedBytes(_) => TypeCategory::FixedBytes,
            SolType::Contract { .. } => TypeCategory::Contract,
            SolType::Magic(_) => TypeCategory::Magic,
            SolType::Struct { .. } => TypeCategory::Struct,
            SolType::Array { .. } => TypeCategory::Array,
            SolType::Mapping { .. } => TypeCategory::Mapping,
            SolType::Function(_) => TypeCategory::Function,
            SolType::Tuple(_) => TypeCategory::Tuple,
            SolType::TypeName(_) => TypeCategory::TypeName,
            SolType::Modifier => TypeCategory::Modifier,
        }
    }

    /// Returns `true` if values of this type are references into `location`.
    ///
    /// Value types are never stored anywhere in this sense; mappings only
    /// exist in storage.
    pub fn data_stored_in(&self, location: DataLocation) -> bool {
        match self {
            SolType::Struct { location: loc, .. } | SolType::Array { location: loc, .. } => {
                *loc == location
            }
            SolType::Mapping { .. } => location == DataLocation::Storage,
            _ => false,
        }
    }

    /// Returns `true` for arrays without a static length.
    pub fn is_dynamically_sized(&self) -> bool {
        matches!(self, SolType::Array { length: None, .. })
    }

    /// Returns `true` for the contract type of the `super` magic.
    pub fn is_super(&self) -> bool {
        matches!(self, SolType::Contract { is_super: true, .. })
    }

    /// Returns the function signature if this is a function type.
    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            SolType::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Unsigned integer of the given width.
    pub fn uint(bits: u16) -> SolType {
        SolType::Integer {
            bits,
            signed: false,
        }
    }
}
