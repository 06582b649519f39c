//! TypeId and TypeRegistry for interned types.
//!
//! Every expression annotation refers to its type through a [`TypeId`]. The
//! [`TypeRegistry`] interns [`SolType`] values so that structurally equal
//! types share one id, and pre-registers the built-in types at fixed ids.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::mutability::StateMutability;
use crate::types::{FunctionType, MagicKind, SolType};

/// Unique identifier for a type in the type registry.
///
/// The inner value is an index into the [`TypeRegistry`]'s interned set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Pre-registered TypeId constants for built-in types.
impl TypeId {
    pub const BOOL: TypeId = TypeId(0);
    pub const UINT256: TypeId = TypeId(1);
    pub const ADDRESS: TypeId = TypeId(2);
    pub const EMPTY_TUPLE: TypeId = TypeId(3);
    pub const MAGIC_BLOCK: TypeId = TypeId(4);
    pub const MAGIC_MESSAGE: TypeId = TypeId(5);
    pub const MAGIC_TRANSACTION: TypeId = TypeId(6);
    pub const MODIFIER: TypeId = TypeId(7);
    pub const BYTES1: TypeId = TypeId(8);
    pub const BYTES32: TypeId = TypeId(9);
}

/// Registry of all types in a program.
///
/// On construction, the registry pre-registers:
/// - `TypeId(0)` = bool
/// - `TypeId(1)` = uint256
/// - `TypeId(2)` = address
/// - `TypeId(3)` = the empty tuple
/// - `TypeId(4..=6)` = the `block`, `msg` and `tx` magic types
/// - `TypeId(7)` = the modifier type
/// - `TypeId(8)` = bytes1, `TypeId(9)` = bytes32
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SerializedRegistry")]
pub struct TypeRegistry {
    /// Interned types; a type's position is its id.
    types: IndexSet<SolType>,
}

/// Wire form of a [`TypeRegistry`]. Decoding goes through a plain list so
/// that a repeated entry is rejected instead of shifting every later id.
#[derive(Deserialize)]
struct SerializedRegistry {
    types: Vec<SolType>,
}

impl TryFrom<SerializedRegistry> for TypeRegistry {
    type Error = CoreError;

    fn try_from(raw: SerializedRegistry) -> Result<Self, Self::Error> {
        let mut types = IndexSet::with_capacity(raw.types.len());
        for (index, ty) in raw.types.into_iter().enumerate() {
            let (first, inserted) = types.insert_full(ty);
            if !inserted {
                return Err(CoreError::DuplicateType {
                    id: TypeId(index as u32),
                    first: TypeId(first as u32),
                });
            }
        }
        let registry = TypeRegistry { types };
        registry.validate()?;
        Ok(registry)
    }
}

impl TypeRegistry {
    /// Number of built-in types pre-registered on construction.
    const BUILTIN_COUNT: usize = 10;

    /// Creates a registry with the built-in types pre-registered.
    pub fn new() -> Self {
        let types: IndexSet<SolType> = [
            SolType::Bool,
            SolType::uint(256),
            SolType::Address,
            SolType::Tuple(Vec::new()),
            SolType::Magic(MagicKind::Block),
            SolType::Magic(MagicKind::Message),
            SolType::Magic(MagicKind::Transaction),
            SolType::Modifier,
            SolType::FixedBytes(1),
            SolType::FixedBytes(32),
        ]
        .into_iter()
        .collect();
        debug_assert_eq!(types.len(), Self::BUILTIN_COUNT);

        TypeRegistry { types }
    }

    /// Interns a type, returning the existing id if an equal type is
    /// already registered.
    pub fn intern(&mut self, ty: SolType) -> TypeId {
        let (index, _) = self.types.insert_full(ty);
        TypeId(index as u32)
    }

    /// Interns a function type with the given signature.
    pub fn function(
        &mut self,
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
        mutability: StateMutability,
    ) -> TypeId {
        self.intern(SolType::Function(FunctionType {
            params,
            returns,
            mutability,
        }))
    }

    /// Looks up a type by its [`TypeId`].
    pub fn get(&self, id: TypeId) -> Option<&SolType> {
        self.types.get_index(id.0 as usize)
    }

    /// Looks up a type, failing with [`CoreError::TypeNotFound`].
    pub fn resolve(&self, id: TypeId) -> Result<&SolType, CoreError> {
        self.get(id).ok_or(CoreError::TypeNotFound { id })
    }

    /// Returns the id of an already-registered type.
    pub fn lookup(&self, ty: &SolType) -> Option<TypeId> {
        self.types.get_index_of(ty).map(|i| TypeId(i as u32))
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns `true` if `id` refers to a registered type.
    pub fn contains(&self, id: TypeId) -> bool {
        (id.0 as usize) < self.types.len()
    }

    /// Checks that the built-in types still sit at their fixed ids.
    pub fn validate(&self) -> Result<(), CoreError> {
        let builtins = TypeRegistry::new();
        for (index, expected) in builtins.types.iter().enumerate() {
            let id = TypeId(index as u32);
            if self.types.get_index(index) != Some(expected) {
                return Err(CoreError::BuiltinTypeMismatch {
                    id,
                    expected: format!("{:?}", expected),
                });
            }
        }
        Ok(())
    }

    /// Returns the pre-registered id of a magic object type.
    pub fn magic_type_id(&self, kind: MagicKind) -> TypeId {
        match kind {
            MagicKind::Block => TypeId::MAGIC_BLOCK,
            MagicKind::Message => TypeId::MAGIC_MESSAGE,
            MagicKind::Transaction => TypeId::MAGIC_TRANSACTION,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
