//! Core error types for statemut-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of building, decoding and validating an AST.

use crate::id::{DeclId, NodeId};
use crate::type_id::TypeId;
use thiserror::Error;

/// Core errors produced by the statemut-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A TypeId was not found in the type registry.
    #[error("type not found: TypeId({id})", id = id.0)]
    TypeNotFound { id: TypeId },

    /// A serialized type registry lists the same type twice.
    #[error("{id} repeats the type already registered as {first}")]
    DuplicateType { id: TypeId, first: TypeId },

    /// A built-in type is missing from its fixed id.
    #[error("{id} must hold the built-in type {expected}")]
    BuiltinTypeMismatch { id: TypeId, expected: String },

    /// A node index was not found in the arena.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A declaration index was not found in the arena.
    #[error("declaration not found: DeclId({id})", id = id.0)]
    DeclNotFound { id: DeclId },

    /// A node has a different shape than the operation requires.
    #[error("node {id} is a {found}, expected {expected}")]
    UnexpectedNode {
        id: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    /// A declaration has a different kind than the operation requires.
    #[error("declaration {id} ('{name}') is not a {expected}")]
    UnexpectedDecl {
        id: DeclId,
        name: String,
        expected: &'static str,
    },

    /// No global magic with this name exists.
    #[error("unknown global: '{name}'")]
    UnknownGlobal { name: String },

    /// A function body was set twice.
    #[error("function {function} already has a body")]
    BodyAlreadySet { function: DeclId },

    /// A mutability keyword could not be parsed.
    #[error("unknown state mutability: '{name}'")]
    UnknownMutability { name: String },

    /// A reference inside the AST points outside its arena.
    #[error("dangling reference from node {from}: {reason}")]
    DanglingReference { from: NodeId, reason: String },

    /// The child relation between nodes is not a forest.
    #[error("malformed tree at node {node}: {reason}")]
    MalformedTree { node: NodeId, reason: String },

    /// A serialized AST could not be decoded.
    #[error("invalid AST JSON: {0}")]
    Json(#[from] serde_json::Error),
}
