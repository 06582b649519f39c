//! Expression classifier: the minimum mutability a node requires of the
//! function that contains it.
//!
//! [`required_mutability`] is a pure function of the node, its resolved
//! annotations and the modifier levels inferred so far. It looks only at the
//! node itself; the walker joins the results of a node's children before
//! reaching it.

use indexmap::IndexMap;

use statemut_core::ast::Ast;
use statemut_core::decl::DeclKind;
use statemut_core::id::{DeclId, NodeId};
use statemut_core::mutability::StateMutability;
use statemut_core::node::{Expr, ExprKind, FunctionCallKind, NodeKind};
use statemut_core::types::{DataLocation, SolType, TypeCategory};

use crate::error::CheckError;

/// Inferred mutability of every modifier walked so far, in walk order.
pub type InferredModifiers = IndexMap<DeclId, StateMutability>;

/// Magic members that are resolved at compile time and read nothing.
const PURE_MAGIC_MEMBERS: [&str; 3] = ["data", "sig", "value"];

/// Returns the level `node` requires of the enclosing function.
///
/// Never returns [`StateMutability::Payable`].
pub fn required_mutability(
    ast: &Ast,
    node: NodeId,
    inferred: &InferredModifiers,
) -> Result<StateMutability, CheckError> {
    match &ast.node(node)?.kind {
        NodeKind::Expression(expr) => classify_expression(ast, node, expr),
        NodeKind::ModifierInvocation { name, .. } => modifier_invocation(ast, node, *name, inferred),
        // TODO: inspect the opcodes and only flag sstore/sload and environment reads.
        NodeKind::InlineAssembly { .. } => Ok(StateMutability::NonPayable),
        _ => Ok(StateMutability::Pure),
    }
}

/// Storage access: a write in lvalue position, a read otherwise.
fn storage_access(lvalue: bool) -> StateMutability {
    if lvalue {
        StateMutability::NonPayable
    } else {
        StateMutability::View
    }
}

fn classify_expression(
    ast: &Ast,
    node: NodeId,
    expr: &Expr,
) -> Result<StateMutability, CheckError> {
    let lvalue = expr.annotation.lvalue_requested;
    match &expr.kind {
        ExprKind::Identifier { name, referenced } => {
            let decl_id = referenced.ok_or_else(|| CheckError::UnresolvedIdentifier {
                node,
                name: name.clone(),
            })?;
            identifier(ast, node, decl_id, lvalue)
        }
        ExprKind::MemberAccess {
            expression,
            member,
            referenced,
        } => member_access(ast, *expression, member, referenced.is_some(), lvalue),
        ExprKind::IndexAccess { base, index } => {
            if index.is_none() {
                return Err(CheckError::MissingIndex { node });
            }
            if ast.expr_type(*base)?.data_stored_in(DataLocation::Storage) {
                Ok(storage_access(lvalue))
            } else {
                Ok(StateMutability::Pure)
            }
        }
        ExprKind::FunctionCall {
            expression,
            kind: FunctionCallKind::FunctionCall,
            ..
        } => {
            let callee = ast
                .expr_type(*expression)?
                .as_function()
                .ok_or(CheckError::NotCallable { node })?;
            // Calling a payable function does not make the caller payable;
            // only sending value does, and that is a separate write.
            Ok(match callee.mutability {
                StateMutability::Payable => StateMutability::NonPayable,
                other => other,
            })
        }
        _ => Ok(StateMutability::Pure),
    }
}

fn identifier(
    ast: &Ast,
    node: NodeId,
    decl_id: DeclId,
    lvalue: bool,
) -> Result<StateMutability, CheckError> {
    let decl = ast.decl(decl_id)?;
    if decl.is_state_variable() {
        return Ok(storage_access(lvalue));
    }
    let DeclKind::Magic { ty } = decl.kind else {
        return Ok(StateMutability::Pure);
    };

    let ty = ast.types.resolve(ty)?;
    match ty.category() {
        TypeCategory::Contract => {
            if decl.name != "this" && decl.name != "super" {
                return Err(CheckError::UnexpectedMagic {
                    node,
                    name: decl.name.clone(),
                });
            }
            if ty.is_super() {
                Ok(StateMutability::Pure)
            } else {
                Ok(StateMutability::View)
            }
        }
        TypeCategory::Integer => {
            if decl.name != "now" {
                return Err(CheckError::UnexpectedMagic {
                    node,
                    name: decl.name.clone(),
                });
            }
            Ok(StateMutability::View)
        }
        _ => Ok(StateMutability::Pure),
    }
}

fn member_access(
    ast: &Ast,
    base: NodeId,
    member: &str,
    resolved: bool,
    lvalue: bool,
) -> Result<StateMutability, CheckError> {
    let base_ty: &SolType = ast.expr_type(base)?;
    let level = match base_ty.category() {
        TypeCategory::Contract | TypeCategory::Integer if member == "balance" && !resolved => {
            StateMutability::View
        }
        TypeCategory::Magic if !PURE_MAGIC_MEMBERS.contains(&member) => StateMutability::View,
        TypeCategory::Struct if base_ty.data_stored_in(DataLocation::Storage) => {
            storage_access(lvalue)
        }
        TypeCategory::Array
            if member == "length"
                && base_ty.is_dynamically_sized()
                && base_ty.data_stored_in(DataLocation::Storage) =>
        {
            storage_access(lvalue)
        }
        _ => StateMutability::Pure,
    };
    Ok(level)
}

fn modifier_invocation(
    ast: &Ast,
    node: NodeId,
    name: NodeId,
    inferred: &InferredModifiers,
) -> Result<StateMutability, CheckError> {
    let Some(Expr {
        kind: ExprKind::Identifier {
            referenced: Some(target),
            ..
        },
        ..
    }) = ast.node(name)?.kind.as_expr()
    else {
        return Err(CheckError::InvalidModifierTarget { node });
    };

    let target_decl = ast.decl(*target)?;
    if target_decl.is_modifier() {
        inferred
            .get(target)
            .copied()
            .ok_or(CheckError::UninferredModifier {
                node,
                modifier: *target,
            })
    } else if target_decl.is_contract() {
        // Base constructor call; only its arguments matter.
        Ok(StateMutability::Pure)
    } else {
        Err(CheckError::InvalidModifierTarget { node })
    }
}
