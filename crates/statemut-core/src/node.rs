//! AST node shapes.
//!
//! Every node is an [`AstNode`] stored in the arena of
//! [`Ast`](crate::ast::Ast): a source location plus a [`NodeKind`]
//! discriminator. Expressions carry an [`ExprAnnotation`] filled in by name
//! and type resolution: the resolved type and whether the expression sits in
//! a position that requires an lvalue.
//!
//! Children are referenced by [`NodeId`]; [`NodeKind::children`] yields them
//! in source order, which is the order a post-order walk reports them.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{DeclId, NodeId};
use crate::type_id::TypeId;

/// Inline child list; most nodes have at most four children.
pub type Children = SmallVec<[NodeId; 4]>;

/// Byte range of a node in a named source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Name of the source unit (usually a path).
    pub source: String,
    pub start: u32,
    pub end: u32,
}

impl SourceLocation {
    pub fn new(source: impl Into<String>, start: u32, end: u32) -> Self {
        SourceLocation {
            source: source.into(),
            start,
            end,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.source, self.start, self.end)
    }
}

/// A node in the AST arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    pub location: SourceLocation,
    pub kind: NodeKind,
}

/// Resolution results attached to every expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprAnnotation {
    /// Resolved type of the expression.
    pub ty: TypeId,
    /// Set when the expression is the target of an assignment, compound
    /// assignment, increment/decrement or `delete`.
    pub lvalue_requested: bool,
}

/// An annotated expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub annotation: ExprAnnotation,
}

/// What a function-call expression actually does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionCallKind {
    /// A call of a function value.
    FunctionCall,
    /// `T(x)` where `T` names a type.
    TypeConversion,
    /// `S(a, b)` where `S` names a struct.
    StructConstructorCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    BitNot,
    Neg,
    Inc,
    Dec,
    Delete,
}

impl UnaryOp {
    /// Returns `true` if the operator writes to its operand.
    pub fn writes_operand(self) -> bool {
        matches!(self, UnaryOp::Inc | UnaryOp::Dec | UnaryOp::Delete)
    }
}

/// Expression shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Identifier {
        name: String,
        referenced: Option<DeclId>,
    },
    MemberAccess {
        expression: NodeId,
        member: String,
        /// Set when the member resolves to a user declaration (e.g. a
        /// contract function called `balance`).
        referenced: Option<DeclId>,
    },
    IndexAccess {
        base: NodeId,
        /// Absent only for type expressions such as `uint[]`.
        index: Option<NodeId>,
    },
    FunctionCall {
        expression: NodeId,
        arguments: Vec<NodeId>,
        kind: FunctionCallKind,
    },
    Assignment {
        operator: AssignOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    BinaryOperation {
        operator: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    UnaryOperation {
        operator: UnaryOp,
        prefix: bool,
        operand: NodeId,
    },
    Conditional {
        condition: NodeId,
        true_expression: NodeId,
        false_expression: NodeId,
    },
    Tuple {
        components: Vec<Option<NodeId>>,
    },
    /// `new T`.
    New {
        type_name: String,
    },
    Literal {
        value: String,
    },
    ElementaryTypeName {
        name: String,
    },
}

/// Node shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    SourceUnit {
        name: String,
        nodes: Vec<NodeId>,
    },
    Pragma {
        literals: String,
    },
    ContractDefinition {
        decl: DeclId,
        members: Vec<NodeId>,
    },
    StateVariable {
        decl: DeclId,
        value: Option<NodeId>,
    },
    StructDefinition {
        decl: DeclId,
        members: Vec<NodeId>,
    },
    EventDefinition {
        decl: DeclId,
        parameters: Vec<NodeId>,
    },
    FunctionDefinition {
        decl: DeclId,
        parameters: Vec<NodeId>,
        returns: Vec<NodeId>,
        modifiers: Vec<NodeId>,
        /// `None` for functions without an implementation.
        body: Option<NodeId>,
    },
    ModifierDefinition {
        decl: DeclId,
        parameters: Vec<NodeId>,
        body: NodeId,
    },
    ModifierInvocation {
        /// Identifier naming the modifier or base contract.
        name: NodeId,
        arguments: Vec<NodeId>,
    },
    /// Parameter, return variable, local or struct member declaration.
    VariableDeclaration {
        decl: DeclId,
    },
    Block {
        statements: Vec<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    VariableDeclarationStatement {
        declarations: Vec<NodeId>,
        initial_value: Option<NodeId>,
    },
    Return {
        expression: Option<NodeId>,
    },
    If {
        condition: NodeId,
        true_body: NodeId,
        false_body: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
        is_do_while: bool,
    },
    For {
        init: Option<NodeId>,
        condition: Option<NodeId>,
        loop_expression: Option<NodeId>,
        body: NodeId,
    },
    Break,
    Continue,
    Throw,
    /// The `_` placeholder inside a modifier body.
    Placeholder,
    InlineAssembly {
        code: String,
    },
    Expression(Expr),
}

impl NodeKind {
    /// Child nodes in source order.
    pub fn children(&self) -> Children {
        let mut out = Children::new();
        match self {
            NodeKind::SourceUnit { nodes, .. } => out.extend(nodes.iter().copied()),
            NodeKind::ContractDefinition { members, .. }
            | NodeKind::StructDefinition { members, .. } => out.extend(members.iter().copied()),
            NodeKind::StateVariable { value, .. } => out.extend(*value),
            NodeKind::EventDefinition { parameters, .. } => {
                out.extend(parameters.iter().copied())
            }
            NodeKind::FunctionDefinition {
                parameters,
                returns,
                modifiers,
                body,
                ..
            } => {
                out.extend(parameters.iter().copied());
                out.extend(returns.iter().copied());
                out.extend(modifiers.iter().copied());
                out.extend(*body);
            }
            NodeKind::ModifierDefinition {
                parameters, body, ..
            } => {
                out.extend(parameters.iter().copied());
                out.push(*body);
            }
            NodeKind::ModifierInvocation { name, arguments } => {
                out.push(*name);
                out.extend(arguments.iter().copied());
            }
            NodeKind::Block { statements } => out.extend(statements.iter().copied()),
            NodeKind::ExpressionStatement { expression } => out.push(*expression),
            NodeKind::VariableDeclarationStatement {
                declarations,
                initial_value,
            } => {
                out.extend(declarations.iter().copied());
                out.extend(*initial_value);
            }
            NodeKind::Return { expression } => out.extend(*expression),
            NodeKind::If {
                condition,
                true_body,
                false_body,
            } => {
                out.push(*condition);
                out.push(*true_body);
                out.extend(*false_body);
            }
            NodeKind::While {
                condition,
                body,
                is_do_while,
            } => {
                if *is_do_while {
                    out.push(*body);
                    out.push(*condition);
                } else {
                    out.push(*condition);
                    out.push(*body);
                }
            }
            NodeKind::For {
                init,
                condition,
                loop_expression,
                body,
            } => {
                out.extend(*init);
                out.extend(*condition);
                out.extend(*loop_expression);
                out.push(*body);
            }
            NodeKind::Expression(expr) => expr.kind.push_children(&mut out),
            NodeKind::Pragma { .. }
            | NodeKind::VariableDeclaration { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Throw
            | NodeKind::Placeholder
            | NodeKind::InlineAssembly { .. } => {}
        }
        out
    }

    /// Returns the expression payload if this node is an expression.
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            NodeKind::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    /// Short name of the node shape, for diagnostics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::SourceUnit { .. } => "SourceUnit",
            NodeKind::Pragma { .. } => "Pragma",
            NodeKind::ContractDefinition { .. } => "ContractDefinition",
            NodeKind::StateVariable { .. } => "StateVariable",
            NodeKind::StructDefinition { .. } => "StructDefinition",
            NodeKind::EventDefinition { .. } => "EventDefinition",
            NodeKind::FunctionDefinition { .. } => "FunctionDefinition",
            NodeKind::ModifierDefinition { .. } => "ModifierDefinition",
            NodeKind::ModifierInvocation { .. } => "ModifierInvocation",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::Block { .. } => "Block",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::VariableDeclarationStatement { .. } => "VariableDeclarationStatement",
            NodeKind::Return { .. } => "Return",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::For { .. } => "For",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Throw => "Throw",
            NodeKind::Placeholder => "Placeholder",
            NodeKind::InlineAssembly { .. } => "InlineAssembly",
            NodeKind::Expression(expr) => expr.kind.name(),
        }
    }
}

impl ExprKind {
    fn push_children(&self, out: &mut Children) {
        match self {
            ExprKind::MemberAccess { expression, .. } => out.push(*expression),
            ExprKind::IndexAccess { base, index } => {
                out.push(*base);
                out.extend(*index);
            }
            ExprKind::FunctionCall {
                expression,
                arguments,
                ..
            } => {
                out.push(*expression);
                out.extend(arguments.iter().copied());
            }
            ExprKind::Assignment { lhs, rhs, .. } | ExprKind::BinaryOperation { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            ExprKind::UnaryOperation { operand, .. } => out.push(*operand),
            ExprKind::Conditional {
                condition,
                true_expression,
                false_expression,
            } => {
                out.push(*condition);
                out.push(*true_expression);
                out.push(*false_expression);
            }
            ExprKind::Tuple { components } => out.extend(components.iter().flatten().copied()),
            ExprKind::Identifier { .. }
            | ExprKind::New { .. }
            | ExprKind::Literal { .. }
            | ExprKind::ElementaryTypeName { .. } => {}
        }
    }

    /// Short name of the expression shape.
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Identifier { .. } => "Identifier",
            ExprKind::MemberAccess { .. } => "MemberAccess",
            ExprKind::IndexAccess { .. } => "IndexAccess",
            ExprKind::FunctionCall { .. } => "FunctionCall",
            ExprKind::Assignment { .. } => "Assignment",
            ExprKind::BinaryOperation { .. } => "BinaryOperation",
            ExprKind::UnaryOperation { .. } => "UnaryOperation",
            ExprKind::Conditional { .. } => "Conditional",
            ExprKind::Tuple { .. } => "Tuple",
            ExprKind::New { .. } => "New",
            ExprKind::Literal { .. } => "Literal",
            ExprKind::ElementaryTypeName { .. } => "ElementaryTypeName",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(kind: ExprKind) -> NodeKind {
        NodeKind::Expression(Expr {
            kind,
            annotation: ExprAnnotation {
                ty: TypeId::UINT256,
                lvalue_requested: false,
            },
        })
    }

    #[test]
    fn location_display() {
        let loc = SourceLocation::new("a.sol", 10, 24);
        assert_eq!(loc.to_string(), "a.sol:10-24");
    }

    #[test]
    fn function_children_follow_source_order() {
        let f = NodeKind::FunctionDefinition {
            decl: DeclId(0),
            parameters: vec![NodeId(1), NodeId(2)],
            returns: vec![NodeId(3)],
            modifiers: vec![NodeId(4)],
            body: Some(NodeId(5)),
        };
        let ids: Vec<u32> = f.children().iter().map(|n| n.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn unimplemented_function_has_no_body_child() {
        let f = NodeKind::FunctionDefinition {
            decl: DeclId(0),
            parameters: vec![],
            returns: vec![],
            modifiers: vec![],
            body: None,
        };
        assert!(f.children().is_empty());
    }

    #[test]
    fn do_while_visits_body_before_condition() {
        let w = NodeKind::While {
            condition: NodeId(1),
            body: NodeId(2),
            is_do_while: true,
        };
        assert_eq!(w.children().as_slice(), &[NodeId(2), NodeId(1)]);
    }

    #[test]
    fn tuple_children_skip_empty_components() {
        let t = expr(ExprKind::Tuple {
            components: vec![Some(NodeId(7)), None, Some(NodeId(9))],
        });
        assert_eq!(t.children().as_slice(), &[NodeId(7), NodeId(9)]);
    }

    #[test]
    fn call_visits_callee_then_arguments() {
        let call = expr(ExprKind::FunctionCall {
            expression: NodeId(3),
            arguments: vec![NodeId(1), NodeId(2)],
            kind: FunctionCallKind::FunctionCall,
        });
        assert_eq!(call.children().as_slice(), &[NodeId(3), NodeId(1), NodeId(2)]);
        assert_eq!(call.name(), "FunctionCall");
    }

    #[test]
    fn writing_unary_operators() {
        assert!(UnaryOp::Inc.writes_operand());
        assert!(UnaryOp::Delete.writes_operand());
        assert!(!UnaryOp::Not.writes_operand());
    }
}
