//! Errors raised when the checker's input breaks an upstream guarantee.
//!
//! These are programmer errors in the phases that built the AST, never
//! problems in the checked program itself (those are reported as
//! diagnostics). Any of them aborts the run.

use std::path::PathBuf;

use statemut_core::id::{DeclId, NodeId};
use statemut_core::mutability::StateMutability;
use statemut_core::CoreError;

/// An invariant violation detected while checking.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// An identifier reached the checker without a resolved declaration.
    #[error("identifier '{name}' at node {node} has no resolved declaration")]
    UnresolvedIdentifier { node: NodeId, name: String },

    /// A magic of contract or integer type that is not `this`, `super` or `now`.
    #[error("unexpected magic variable '{name}' at node {node}")]
    UnexpectedMagic { node: NodeId, name: String },

    /// An index access without an index expression.
    #[error("index access at node {node} has no index expression")]
    MissingIndex { node: NodeId },

    /// A call-kind function call whose callee is not of function type.
    #[error("function call at node {node} has a callee that is not of function type")]
    NotCallable { node: NodeId },

    /// A modifier invocation whose name is not an identifier resolving to a
    /// modifier or base contract.
    #[error("modifier invocation at node {node} does not name a modifier or base contract")]
    InvalidModifierTarget { node: NodeId },

    /// A modifier invocation whose modifier has no inferred mutability yet.
    #[error("modifier {modifier} invoked at node {node} has no inferred mutability")]
    UninferredModifier { node: NodeId, modifier: DeclId },

    /// The classifier produced a requirement the diagnostic policy cannot
    /// express.
    #[error("requirement '{required}' exceeds declared '{declared}' in an impossible way")]
    UnexpectedRequirement {
        declared: StateMutability,
        required: StateMutability,
    },

    /// A structural lookup in the AST failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Failure to load a [`CheckerConfig`](crate::config::CheckerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
