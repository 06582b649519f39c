//! Declarations referenced by identifiers and member accesses.
//!
//! Declarations live in their own arena inside [`Ast`](crate::ast::Ast) and
//! are referred to by [`DeclId`](crate::id::DeclId). The declaring node owns
//! the syntax; the declaration only records what name resolution and the
//! mutability analysis need to know about it.

use serde::{Deserialize, Serialize};

use crate::id::{DeclId, NodeId};
use crate::mutability::StateMutability;
use crate::node::SourceLocation;
use crate::type_id::TypeId;

/// Where a variable was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableScope {
    /// A contract-level variable living in storage.
    State,
    /// A variable declared inside a function body.
    Local,
    /// A function or modifier parameter.
    Parameter,
    /// A named return variable.
    Return,
}

/// What the analysis needs to know about a function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Declared state mutability.
    pub mutability: StateMutability,
    /// `true` for the contract constructor.
    pub is_constructor: bool,
    /// Base-contract function this one overrides, if any.
    pub overrides: Option<DeclId>,
    /// The function's own type, used when it is referenced as a value.
    pub ty: TypeId,
}

/// The kind of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    /// A variable of any scope.
    Variable { ty: TypeId, scope: VariableScope },
    /// A language-provided pseudo-variable (`this`, `super`, `now`, `msg`,
    /// builtin functions, ...).
    Magic { ty: TypeId },
    /// A function definition.
    Function(FunctionDecl),
    /// A modifier definition.
    Modifier,
    /// A contract definition; `ty` is the contract's own type.
    Contract { ty: TypeId },
    /// A struct definition; `ty` is the type-name type of the struct.
    Struct { ty: TypeId },
    /// An event definition.
    Event { ty: TypeId },
}

/// A named declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    /// The node that declares this entity. `None` for magics.
    pub node: Option<NodeId>,
    pub location: SourceLocation,
}

impl Declaration {
    /// Type of an identifier that references this declaration.
    pub fn value_type(&self) -> TypeId {
        match &self.kind {
            DeclKind::Variable { ty, .. }
            | DeclKind::Magic { ty }
            | DeclKind::Contract { ty }
            | DeclKind::Struct { ty }
            | DeclKind::Event { ty } => *ty,
            DeclKind::Function(f) => f.ty,
            DeclKind::Modifier => TypeId::MODIFIER,
        }
    }

    /// Returns `true` for contract-level storage variables.
    pub fn is_state_variable(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Variable {
                scope: VariableScope::State,
                ..
            }
        )
    }

    /// Returns the function metadata if this declares a function.
    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            DeclKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns `true` if this declares a modifier.
    pub fn is_modifier(&self) -> bool {
        matches!(self.kind, DeclKind::Modifier)
    }

    /// Returns `true` if this declares a contract.
    pub fn is_contract(&self) -> bool {
        matches!(self.kind, DeclKind::Contract { .. })
    }

    /// Returns `true` for language-provided magics.
    pub fn is_magic(&self) -> bool {
        matches!(self.kind, DeclKind::Magic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, kind: DeclKind) -> Declaration {
        Declaration {
            name: name.into(),
            kind,
            node: None,
            location: SourceLocation::default(),
        }
    }

    #[test]
    fn state_variable_detection() {
        let state = decl(
            "x",
            DeclKind::Variable {
                ty: TypeId::UINT256,
                scope: VariableScope::State,
            },
        );
        let local = decl(
            "y",
            DeclKind::Variable {
                ty: TypeId::UINT256,
                scope: VariableScope::Local,
            },
        );
        assert!(state.is_state_variable());
        assert!(!local.is_state_variable());
        assert_eq!(state.value_type(), TypeId::UINT256);
    }

    #[test]
    fn modifier_value_type_is_the_modifier_type() {
        let m = decl("onlyOwner", DeclKind::Modifier);
        assert!(m.is_modifier());
        assert_eq!(m.value_type(), TypeId::MODIFIER);
    }

    #[test]
    fn function_metadata_is_exposed() {
        let f = decl(
            "f",
            DeclKind::Function(FunctionDecl {
                mutability: StateMutability::View,
                is_constructor: false,
                overrides: Some(DeclId(4)),
                ty: TypeId(12),
            }),
        );
        let meta = f.as_function().unwrap();
        assert_eq!(meta.mutability, StateMutability::View);
        assert_eq!(meta.overrides, Some(DeclId(4)));
        assert_eq!(f.value_type(), TypeId(12));
    }

    #[test]
    fn serialized_shape() {
        let x = decl(
            "x",
            DeclKind::Variable {
                ty: TypeId::UINT256,
                scope: VariableScope::State,
            },
        );
        insta::assert_json_snapshot!(x, @r#"
        {
          "name": "x",
          "kind": {
            "Variable": {
              "ty": 1,
              "scope": "State"
            }
          },
          "node": null,
          "location": {
            "source": "",
            "start": 0,
            "end": 0
          }
        }
        "#);
    }
}
