pub mod ast;
pub mod decl;
pub mod error;
pub mod id;
pub mod mutability;
pub mod node;
pub mod type_id;
pub mod types;

// Re-export commonly used types
pub use ast::{Ast, ContractRef, FunctionRef, FunctionSpec, ModifierRef};
pub use decl::{DeclKind, Declaration, FunctionDecl, VariableScope};
pub use error::CoreError;
pub use id::{DeclId, NodeId};
pub use mutability::StateMutability;
pub use node::{AstNode, Expr, ExprKind, FunctionCallKind, NodeKind, SourceLocation};
pub use type_id::{TypeId, TypeRegistry};
pub use types::{DataLocation, MagicKind, SolType, TypeCategory};
