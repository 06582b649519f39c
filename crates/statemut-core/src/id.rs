//! Stable ID newtypes for AST entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `NodeId` cannot be accidentally used where a `DeclId` is expected.
//! Each is an index into the corresponding arena owned by [`Ast`](crate::ast::Ast),
//! which makes every cross-reference in the tree a non-owning handle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node in the AST node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index of a declaration in the declaration arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeclId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl NodeId {
    /// Position of this node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl DeclId {
    /// Position of this declaration in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
