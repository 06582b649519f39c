//! Ast: the annotated syntax tree container.
//!
//! [`Ast`] owns three arenas: nodes, declarations and interned types. All
//! cross-references are ids into those arenas, so identifiers observe their
//! declarations without owning them and there are no ownership cycles.
//!
//! The builder methods stand in for the parser and type resolver: they
//! create nodes, resolve identifiers against declarations, fill in each
//! expression's type and set the `lvalue_requested` flag on assignment
//! targets. ASTs produced elsewhere can be loaded with [`Ast::from_json`],
//! which validates every reference before handing the tree out.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::decl::{DeclKind, Declaration, FunctionDecl, VariableScope};
use crate::error::CoreError;
use crate::id::{DeclId, NodeId};
use crate::mutability::StateMutability;
use crate::node::{
    AssignOp, AstNode, BinaryOp, Expr, ExprAnnotation, ExprKind, FunctionCallKind, NodeKind,
    SourceLocation, UnaryOp,
};
use crate::type_id::{TypeId, TypeRegistry};
use crate::types::{DataLocation, MagicKind, SolType};

/// Handle to a contract created by [`Ast::add_contract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractRef {
    pub node: NodeId,
    pub decl: DeclId,
    /// The contract's `this` magic.
    pub this: DeclId,
    /// The contract's `super` magic.
    pub super_: DeclId,
}

/// Handle to a function created by [`Ast::add_function`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    pub node: NodeId,
    pub decl: DeclId,
    pub params: Vec<DeclId>,
    pub returns: Vec<DeclId>,
}

/// Handle to a modifier created by [`Ast::add_modifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierRef {
    pub node: NodeId,
    pub decl: DeclId,
    pub params: Vec<DeclId>,
}

/// Signature and flags of a function to add.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub mutability: StateMutability,
    pub params: Vec<(String, TypeId)>,
    pub returns: Vec<(String, TypeId)>,
    pub is_constructor: bool,
    pub overrides: Option<DeclId>,
}

impl FunctionSpec {
    pub fn new(mutability: StateMutability) -> Self {
        FunctionSpec {
            mutability,
            params: Vec::new(),
            returns: Vec::new(),
            is_constructor: false,
            overrides: None,
        }
    }

    pub fn param(mut self, name: &str, ty: TypeId) -> Self {
        self.params.push((name.to_string(), ty));
        self
    }

    pub fn returns(mut self, name: &str, ty: TypeId) -> Self {
        self.returns.push((name.to_string(), ty));
        self
    }

    pub fn constructor(mut self) -> Self {
        self.is_constructor = true;
        self
    }

    pub fn overriding(mut self, base: DeclId) -> Self {
        self.overrides = Some(base);
        self
    }
}

/// The annotated AST of a whole program: every source unit handed to the
/// checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<AstNode>,
    decls: Vec<Declaration>,
    /// Interned types referenced by expression annotations and declarations.
    pub types: TypeRegistry,
    source_units: Vec<NodeId>,
    /// Global magics (`now`, `msg`, builtin functions) by name.
    globals: IndexMap<String, DeclId>,
    /// Source name stamped on newly built nodes.
    active_source: String,
}

impl Ast {
    /// Creates an empty AST with the global magics registered.
    pub fn new() -> Self {
        let mut ast = Ast {
            nodes: Vec::new(),
            decls: Vec::new(),
            types: TypeRegistry::new(),
            source_units: Vec::new(),
            globals: IndexMap::new(),
            active_source: String::new(),
        };
        ast.register_globals();
        ast
    }

    fn register_globals(&mut self) {
        self.add_global("now", TypeId::UINT256);
        for kind in [MagicKind::Block, MagicKind::Message, MagicKind::Transaction] {
            let name = match kind {
                MagicKind::Block => "block",
                MagicKind::Message => "msg",
                MagicKind::Transaction => "tx",
            };
            let ty = self.types.magic_type_id(kind);
            self.add_global(name, ty);
        }

        let bytes_memory = self.types.intern(SolType::Array {
            element: TypeId::BYTES1,
            length: None,
            location: DataLocation::Memory,
        });
        let uint8 = self.types.intern(SolType::uint(8));
        let builtins = [
            (
                "keccak256",
                vec![bytes_memory],
                vec![TypeId::BYTES32],
                StateMutability::Pure,
            ),
            (
                "sha256",
                vec![bytes_memory],
                vec![TypeId::BYTES32],
                StateMutability::Pure,
            ),
            (
                "ecrecover",
                vec![TypeId::BYTES32, uint8, TypeId::BYTES32, TypeId::BYTES32],
                vec![TypeId::ADDRESS],
                StateMutability::Pure,
            ),
            (
                "blockhash",
                vec![TypeId::UINT256],
                vec![TypeId::BYTES32],
                StateMutability::View,
            ),
            (
                "selfdestruct",
                vec![TypeId::ADDRESS],
                vec![],
                StateMutability::NonPayable,
            ),
            ("require", vec![TypeId::BOOL], vec![], StateMutability::Pure),
            ("assert", vec![TypeId::BOOL], vec![], StateMutability::Pure),
            ("revert", vec![], vec![], StateMutability::Pure),
        ];
        for (name, params, returns, mutability) in builtins {
            let ty = self.types.function(params, returns, mutability);
            self.add_global(name, ty);
        }
    }

    fn add_global(&mut self, name: &str, ty: TypeId) {
        let id = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Magic { ty },
            node: None,
            location: SourceLocation::default(),
        });
        self.globals.insert(name.to_string(), id);
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Looks up a node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id.index())
    }

    /// Looks up a node, failing with [`CoreError::NodeNotFound`].
    pub fn node(&self, id: NodeId) -> Result<&AstNode, CoreError> {
        self.get_node(id).ok_or(CoreError::NodeNotFound { id })
    }

    /// Looks up a declaration by ID.
    pub fn get_decl(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.index())
    }

    /// Looks up a declaration, failing with [`CoreError::DeclNotFound`].
    pub fn decl(&self, id: DeclId) -> Result<&Declaration, CoreError> {
        self.get_decl(id).ok_or(CoreError::DeclNotFound { id })
    }

    /// Looks up an expression node.
    pub fn expr(&self, id: NodeId) -> Result<&Expr, CoreError> {
        let node = self.node(id)?;
        node.kind.as_expr().ok_or(CoreError::UnexpectedNode {
            id,
            expected: "expression",
            found: node.kind.name(),
        })
    }

    /// Resolved type of an expression node.
    pub fn expr_type(&self, id: NodeId) -> Result<&SolType, CoreError> {
        let ty = self.expr(id)?.annotation.ty;
        self.types.resolve(ty)
    }

    /// Root nodes of all source units, in the order they were added.
    pub fn source_units(&self) -> &[NodeId] {
        &self.source_units
    }

    /// Looks up a global magic by name.
    pub fn global(&self, name: &str) -> Option<DeclId> {
        self.globals.get(name).copied()
    }

    /// All contract definitions across all source units, in source order.
    pub fn contracts(&self) -> Result<Vec<NodeId>, CoreError> {
        let mut contracts = Vec::new();
        for &unit in &self.source_units {
            let node = self.node(unit)?;
            let NodeKind::SourceUnit { nodes, .. } = &node.kind else {
                return Err(CoreError::UnexpectedNode {
                    id: unit,
                    expected: "SourceUnit",
                    found: node.kind.name(),
                });
            };
            for &top in nodes {
                if matches!(self.node(top)?.kind, NodeKind::ContractDefinition { .. }) {
                    contracts.push(top);
                }
            }
        }
        Ok(contracts)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serializes the AST as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes an AST from JSON and validates every reference in it.
    pub fn from_json(json: &str) -> Result<Ast, CoreError> {
        let ast: Ast = serde_json::from_str(json)?;
        ast.validate()?;
        Ok(ast)
    }

    /// Checks that every node, declaration and type reference is in range,
    /// that source-unit roots are source units and that the nodes form a
    /// forest.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.types.validate()?;
        for &unit in &self.source_units {
            let node = self.node(unit)?;
            if !matches!(node.kind, NodeKind::SourceUnit { .. }) {
                return Err(CoreError::UnexpectedNode {
                    id: unit,
                    expected: "SourceUnit",
                    found: node.kind.name(),
                });
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let from = NodeId(index as u32);
            for child in node.kind.children() {
                if self.get_node(child).is_none() {
                    return Err(CoreError::DanglingReference {
                        from,
                        reason: format!("child node {} does not exist", child),
                    });
                }
            }
            for decl in node_decl_refs(&node.kind) {
                if self.get_decl(decl).is_none() {
                    return Err(CoreError::DanglingReference {
                        from,
                        reason: format!("declaration {} does not exist", decl),
                    });
                }
            }
            if let Some(expr) = node.kind.as_expr() {
                if !self.types.contains(expr.annotation.ty) {
                    return Err(CoreError::DanglingReference {
                        from,
                        reason: format!("type {} does not exist", expr.annotation.ty),
                    });
                }
            }
        }

        for decl in &self.decls {
            if let Some(node) = decl.node {
                self.node(node)?;
            }
            let ty = decl.value_type();
            if !self.types.contains(ty) {
                return Err(CoreError::TypeNotFound { id: ty });
            }
        }

        self.validate_forest()
    }

    /// Every node has at most one parent, source units have none, and every
    /// node is reachable from a parentless root. With in-degree at most one,
    /// the nodes a root cannot reach are exactly those on or below a cycle.
    fn validate_forest(&self) -> Result<(), CoreError> {
        let mut parents: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            let from = NodeId(index as u32);
            for child in node.kind.children() {
                if let Some(previous) = parents[child.index()].replace(from) {
                    return Err(CoreError::MalformedTree {
                        node: child,
                        reason: format!("child of both node {} and node {}", previous, from),
                    });
                }
            }
        }

        for &unit in &self.source_units {
            if let Some(parent) = parents[unit.index()] {
                return Err(CoreError::MalformedTree {
                    node: unit,
                    reason: format!("source unit is a child of node {}", parent),
                });
            }
        }

        let mut reached = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(index, _)| NodeId(index as u32))
            .collect();
        while let Some(id) = stack.pop() {
            reached[id.index()] = true;
            stack.extend(self.nodes[id.index()].kind.children());
        }

        match reached.iter().position(|r| !r) {
            Some(index) => Err(CoreError::MalformedTree {
                node: NodeId(index as u32),
                reason: "node is part of a cycle".to_string(),
            }),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Arena primitives
    // -----------------------------------------------------------------------

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let location = SourceLocation::new(self.active_source.clone(), id.0, id.0 + 1);
        self.nodes.push(AstNode { location, kind });
        id
    }

    fn push_decl(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut AstNode, CoreError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(CoreError::NodeNotFound { id })
    }

    fn push_expr(&mut self, kind: ExprKind, ty: TypeId) -> NodeId {
        self.push_node(NodeKind::Expression(Expr {
            kind,
            annotation: ExprAnnotation {
                ty,
                lvalue_requested: false,
            },
        }))
    }

    /// Overrides the synthetic location stamped on a node by the builder.
    pub fn set_location(&mut self, id: NodeId, location: SourceLocation) -> Result<(), CoreError> {
        self.node_mut(id)?.location = location;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Top-level and contract members
    // -----------------------------------------------------------------------

    /// Starts a new source unit. Nodes built afterwards carry its name.
    pub fn add_source_unit(&mut self, name: &str) -> NodeId {
        self.active_source = name.to_string();
        let id = self.push_node(NodeKind::SourceUnit {
            name: name.to_string(),
            nodes: Vec::new(),
        });
        self.source_units.push(id);
        id
    }

    /// Adds a pragma directive to a source unit.
    pub fn add_pragma(&mut self, unit: NodeId, literals: &str) -> Result<NodeId, CoreError> {
        let id = self.push_node(NodeKind::Pragma {
            literals: literals.to_string(),
        });
        self.push_top_level(unit, id)?;
        Ok(id)
    }

    fn push_top_level(&mut self, unit: NodeId, id: NodeId) -> Result<(), CoreError> {
        let node = self.node_mut(unit)?;
        match &mut node.kind {
            NodeKind::SourceUnit { nodes, .. } => {
                nodes.push(id);
                Ok(())
            }
            other => Err(CoreError::UnexpectedNode {
                id: unit,
                expected: "SourceUnit",
                found: other.name(),
            }),
        }
    }

    /// Adds a contract to a source unit, together with its `this` and
    /// `super` magics.
    pub fn add_contract(&mut self, unit: NodeId, name: &str) -> Result<ContractRef, CoreError> {
        let ty = self.types.intern(SolType::Contract {
            name: name.to_string(),
            is_super: false,
        });
        let super_ty = self.types.intern(SolType::Contract {
            name: name.to_string(),
            is_super: true,
        });

        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Contract { ty },
            node: None,
            location: SourceLocation::default(),
        });
        let node = self.push_node(NodeKind::ContractDefinition {
            decl,
            members: Vec::new(),
        });
        self.push_top_level(unit, node)?;
        self.attach_decl(decl, node)?;

        let this = self.push_decl(Declaration {
            name: "this".into(),
            kind: DeclKind::Magic { ty },
            node: None,
            location: SourceLocation::default(),
        });
        let super_ = self.push_decl(Declaration {
            name: "super".into(),
            kind: DeclKind::Magic { ty: super_ty },
            node: None,
            location: SourceLocation::default(),
        });

        Ok(ContractRef {
            node,
            decl,
            this,
            super_,
        })
    }

    fn attach_decl(&mut self, decl: DeclId, node: NodeId) -> Result<(), CoreError> {
        let location = self.node(node)?.location.clone();
        let d = self
            .decls
            .get_mut(decl.index())
            .ok_or(CoreError::DeclNotFound { id: decl })?;
        d.node = Some(node);
        d.location = location;
        Ok(())
    }

    fn push_member(&mut self, contract: NodeId, member: NodeId) -> Result<(), CoreError> {
        let node = self.node_mut(contract)?;
        match &mut node.kind {
            NodeKind::ContractDefinition { members, .. } => {
                members.push(member);
                Ok(())
            }
            other => Err(CoreError::UnexpectedNode {
                id: contract,
                expected: "ContractDefinition",
                found: other.name(),
            }),
        }
    }

    /// Declares a variable and its declaration node.
    fn declare_variable(
        &mut self,
        name: &str,
        ty: TypeId,
        scope: VariableScope,
    ) -> (NodeId, DeclId) {
        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Variable { ty, scope },
            node: None,
            location: SourceLocation::default(),
        });
        let node = self.push_node(NodeKind::VariableDeclaration { decl });
        if let Some(d) = self.decls.get_mut(decl.index()) {
            d.node = Some(node);
            d.location = SourceLocation::new(self.active_source.clone(), node.0, node.0 + 1);
        }
        (node, decl)
    }

    /// Adds a state variable, optionally with an initializer expression.
    pub fn add_state_variable(
        &mut self,
        contract: &ContractRef,
        name: &str,
        ty: TypeId,
        value: Option<NodeId>,
    ) -> Result<DeclId, CoreError> {
        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Variable {
                ty,
                scope: VariableScope::State,
            },
            node: None,
            location: SourceLocation::default(),
        });
        let node = self.push_node(NodeKind::StateVariable { decl, value });
        self.push_member(contract.node, node)?;
        self.attach_decl(decl, node)?;
        Ok(decl)
    }

    /// Adds a struct definition. Returns the declaration of the struct; its
    /// type-name type wraps the storage-located struct type.
    pub fn add_struct(
        &mut self,
        contract: &ContractRef,
        name: &str,
        fields: &[(&str, TypeId)],
    ) -> Result<DeclId, CoreError> {
        let storage_ty = self.types.intern(SolType::Struct {
            name: name.to_string(),
            location: DataLocation::Storage,
        });
        let ty = self.types.intern(SolType::TypeName(storage_ty));
        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Struct { ty },
            node: None,
            location: SourceLocation::default(),
        });
        let members = fields
            .iter()
            .map(|(field, field_ty)| self.declare_variable(field, *field_ty, VariableScope::Local).0)
            .collect();
        let node = self.push_node(NodeKind::StructDefinition { decl, members });
        self.push_member(contract.node, node)?;
        self.attach_decl(decl, node)?;
        Ok(decl)
    }

    /// Adds an event definition.
    pub fn add_event(
        &mut self,
        contract: &ContractRef,
        name: &str,
        params: &[(&str, TypeId)],
    ) -> Result<DeclId, CoreError> {
        let ty = self.types.function(
            params.iter().map(|(_, ty)| *ty).collect(),
            Vec::new(),
            StateMutability::NonPayable,
        );
        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Event { ty },
            node: None,
            location: SourceLocation::default(),
        });
        let parameters = params
            .iter()
            .map(|(p, p_ty)| self.declare_variable(p, *p_ty, VariableScope::Parameter).0)
            .collect();
        let node = self.push_node(NodeKind::EventDefinition { decl, parameters });
        self.push_member(contract.node, node)?;
        self.attach_decl(decl, node)?;
        Ok(decl)
    }

    /// Adds a function without a body. Call
    /// [`set_function_body`](Self::set_function_body) to implement it.
    pub fn add_function(
        &mut self,
        contract: &ContractRef,
        name: &str,
        spec: FunctionSpec,
    ) -> Result<FunctionRef, CoreError> {
        if let Some(base) = spec.overrides {
            let base_decl = self.decl(base)?;
            if base_decl.as_function().is_none() {
                return Err(CoreError::UnexpectedDecl {
                    id: base,
                    name: base_decl.name.clone(),
                    expected: "function",
                });
            }
        }

        let ty = self.types.function(
            spec.params.iter().map(|(_, ty)| *ty).collect(),
            spec.returns.iter().map(|(_, ty)| *ty).collect(),
            spec.mutability,
        );
        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Function(FunctionDecl {
                mutability: spec.mutability,
                is_constructor: spec.is_constructor,
                overrides: spec.overrides,
                ty,
            }),
            node: None,
            location: SourceLocation::default(),
        });

        let (parameters, params): (Vec<NodeId>, Vec<DeclId>) = spec
            .params
            .iter()
            .map(|(p, p_ty)| self.declare_variable(p, *p_ty, VariableScope::Parameter))
            .unzip();
        let (returns_nodes, returns): (Vec<NodeId>, Vec<DeclId>) = spec
            .returns
            .iter()
            .map(|(r, r_ty)| self.declare_variable(r, *r_ty, VariableScope::Return))
            .unzip();

        let node = self.push_node(NodeKind::FunctionDefinition {
            decl,
            parameters,
            returns: returns_nodes,
            modifiers: Vec::new(),
            body: None,
        });
        self.push_member(contract.node, node)?;
        self.attach_decl(decl, node)?;

        Ok(FunctionRef {
            node,
            decl,
            params,
            returns,
        })
    }

    /// Gives an unimplemented function a body block made of `statements`.
    pub fn set_function_body(
        &mut self,
        function: &FunctionRef,
        statements: Vec<NodeId>,
    ) -> Result<NodeId, CoreError> {
        let block = self.push_node(NodeKind::Block { statements });
        let node = self.node_mut(function.node)?;
        match &mut node.kind {
            NodeKind::FunctionDefinition { body: Some(_), .. } => Err(CoreError::BodyAlreadySet {
                function: function.decl,
            }),
            NodeKind::FunctionDefinition { body, .. } => {
                *body = Some(block);
                Ok(block)
            }
            other => Err(CoreError::UnexpectedNode {
                id: function.node,
                expected: "FunctionDefinition",
                found: other.name(),
            }),
        }
    }

    /// Adds a modifier with an empty body. Fill it with
    /// [`set_modifier_body`](Self::set_modifier_body).
    pub fn add_modifier(
        &mut self,
        contract: &ContractRef,
        name: &str,
        params: &[(&str, TypeId)],
    ) -> Result<ModifierRef, CoreError> {
        let decl = self.push_decl(Declaration {
            name: name.to_string(),
            kind: DeclKind::Modifier,
            node: None,
            location: SourceLocation::default(),
        });
        let (parameters, param_decls): (Vec<NodeId>, Vec<DeclId>) = params
            .iter()
            .map(|(p, p_ty)| self.declare_variable(p, *p_ty, VariableScope::Parameter))
            .unzip();
        let body = self.push_node(NodeKind::Block {
            statements: Vec::new(),
        });
        let node = self.push_node(NodeKind::ModifierDefinition {
            decl,
            parameters,
            body,
        });
        self.push_member(contract.node, node)?;
        self.attach_decl(decl, node)?;
        Ok(ModifierRef {
            node,
            decl,
            params: param_decls,
        })
    }

    /// Replaces the statements of a modifier's body.
    pub fn set_modifier_body(
        &mut self,
        modifier: &ModifierRef,
        statements: Vec<NodeId>,
    ) -> Result<NodeId, CoreError> {
        let body = match &self.node(modifier.node)?.kind {
            NodeKind::ModifierDefinition { body, .. } => *body,
            other => {
                return Err(CoreError::UnexpectedNode {
                    id: modifier.node,
                    expected: "ModifierDefinition",
                    found: other.name(),
                })
            }
        };
        match &mut self.node_mut(body)?.kind {
            NodeKind::Block { statements: s } => *s = statements,
            other => {
                return Err(CoreError::UnexpectedNode {
                    id: body,
                    expected: "Block",
                    found: other.name(),
                })
            }
        }
        Ok(body)
    }

    /// Attaches a modifier invocation (or a base-constructor call, when
    /// `target` is a contract) to a function header.
    pub fn add_modifier_invocation(
        &mut self,
        function: &FunctionRef,
        target: DeclId,
        arguments: Vec<NodeId>,
    ) -> Result<NodeId, CoreError> {
        let target_decl = self.decl(target)?;
        if !target_decl.is_modifier() && !target_decl.is_contract() {
            return Err(CoreError::UnexpectedDecl {
                id: target,
                name: target_decl.name.clone(),
                expected: "modifier or contract",
            });
        }
        let name = self.identifier(target)?;
        let invocation = self.push_node(NodeKind::ModifierInvocation { name, arguments });
        match &mut self.node_mut(function.node)?.kind {
            NodeKind::FunctionDefinition { modifiers, .. } => modifiers.push(invocation),
            other => {
                return Err(CoreError::UnexpectedNode {
                    id: function.node,
                    expected: "FunctionDefinition",
                    found: other.name(),
                })
            }
        }
        Ok(invocation)
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push_node(NodeKind::Block { statements })
    }

    pub fn expression_statement(&mut self, expression: NodeId) -> NodeId {
        self.push_node(NodeKind::ExpressionStatement { expression })
    }

    pub fn return_statement(&mut self, expression: Option<NodeId>) -> NodeId {
        self.push_node(NodeKind::Return { expression })
    }

    pub fn if_statement(
        &mut self,
        condition: NodeId,
        true_body: NodeId,
        false_body: Option<NodeId>,
    ) -> NodeId {
        self.push_node(NodeKind::If {
            condition,
            true_body,
            false_body,
        })
    }

    pub fn while_loop(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.push_node(NodeKind::While {
            condition,
            body,
            is_do_while: false,
        })
    }

    pub fn do_while_loop(&mut self, body: NodeId, condition: NodeId) -> NodeId {
        self.push_node(NodeKind::While {
            condition,
            body,
            is_do_while: true,
        })
    }

    pub fn for_loop(
        &mut self,
        init: Option<NodeId>,
        condition: Option<NodeId>,
        loop_expression: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.push_node(NodeKind::For {
            init,
            condition,
            loop_expression,
            body,
        })
    }

    /// Declares a local variable. Returns the statement and the new
    /// declaration.
    pub fn local_variable(
        &mut self,
        name: &str,
        ty: TypeId,
        initial_value: Option<NodeId>,
    ) -> (NodeId, DeclId) {
        let (declaration, decl) = self.declare_variable(name, ty, VariableScope::Local);
        let stmt = self.push_node(NodeKind::VariableDeclarationStatement {
            declarations: vec![declaration],
            initial_value,
        });
        (stmt, decl)
    }

    pub fn placeholder(&mut self) -> NodeId {
        self.push_node(NodeKind::Placeholder)
    }

    pub fn break_statement(&mut self) -> NodeId {
        self.push_node(NodeKind::Break)
    }

    pub fn continue_statement(&mut self) -> NodeId {
        self.push_node(NodeKind::Continue)
    }

    pub fn throw_statement(&mut self) -> NodeId {
        self.push_node(NodeKind::Throw)
    }

    pub fn inline_assembly(&mut self, code: &str) -> NodeId {
        self.push_node(NodeKind::InlineAssembly {
            code: code.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// An identifier resolved to `decl`, typed by the declaration.
    pub fn identifier(&mut self, decl: DeclId) -> Result<NodeId, CoreError> {
        let d = self.decl(decl)?;
        let name = d.name.clone();
        let ty = d.value_type();
        Ok(self.push_expr(
            ExprKind::Identifier {
                name,
                referenced: Some(decl),
            },
            ty,
        ))
    }

    /// An identifier referring to a global magic such as `now` or `msg`.
    pub fn global_identifier(&mut self, name: &str) -> Result<NodeId, CoreError> {
        let decl = self.global(name).ok_or_else(|| CoreError::UnknownGlobal {
            name: name.to_string(),
        })?;
        self.identifier(decl)
    }

    /// An identifier that name resolution failed to bind.
    pub fn unresolved_identifier(&mut self, name: &str, ty: TypeId) -> NodeId {
        self.push_expr(
            ExprKind::Identifier {
                name: name.to_string(),
                referenced: None,
            },
            ty,
        )
    }

    /// `base.member` where the member is a builtin (no user declaration).
    pub fn member_access(&mut self, base: NodeId, member: &str, ty: TypeId) -> NodeId {
        self.push_expr(
            ExprKind::MemberAccess {
                expression: base,
                member: member.to_string(),
                referenced: None,
            },
            ty,
        )
    }

    /// `base.member` where the member resolves to a user declaration.
    pub fn member_access_resolved(
        &mut self,
        base: NodeId,
        member: &str,
        decl: DeclId,
    ) -> Result<NodeId, CoreError> {
        let ty = self.decl(decl)?.value_type();
        Ok(self.push_expr(
            ExprKind::MemberAccess {
                expression: base,
                member: member.to_string(),
                referenced: Some(decl),
            },
            ty,
        ))
    }

    pub fn index_access(&mut self, base: NodeId, index: Option<NodeId>, ty: TypeId) -> NodeId {
        self.push_expr(ExprKind::IndexAccess { base, index }, ty)
    }

    /// A call of a function value. The result type is derived from the
    /// callee's function type.
    pub fn call(&mut self, callee: NodeId, arguments: Vec<NodeId>) -> Result<NodeId, CoreError> {
        let callee_ty = self.expr(callee)?.annotation.ty;
        let returns = match self.types.resolve(callee_ty)? {
            SolType::Function(f) => f.returns.clone(),
            _ => {
                return Err(CoreError::UnexpectedNode {
                    id: callee,
                    expected: "expression of function type",
                    found: "non-function expression",
                })
            }
        };
        let ty = match returns.as_slice() {
            [] => TypeId::EMPTY_TUPLE,
            [single] => *single,
            _ => self.types.intern(SolType::Tuple(returns)),
        };
        Ok(self.push_expr(
            ExprKind::FunctionCall {
                expression: callee,
                arguments,
                kind: FunctionCallKind::FunctionCall,
            },
            ty,
        ))
    }

    /// `T(x)` explicit conversion.
    pub fn type_conversion(&mut self, type_expression: NodeId, argument: NodeId, ty: TypeId) -> NodeId {
        self.push_expr(
            ExprKind::FunctionCall {
                expression: type_expression,
                arguments: vec![argument],
                kind: FunctionCallKind::TypeConversion,
            },
            ty,
        )
    }

    /// `S(a, b, ...)` struct construction.
    pub fn struct_constructor(
        &mut self,
        struct_name: NodeId,
        arguments: Vec<NodeId>,
        ty: TypeId,
    ) -> NodeId {
        self.push_expr(
            ExprKind::FunctionCall {
                expression: struct_name,
                arguments,
                kind: FunctionCallKind::StructConstructorCall,
            },
            ty,
        )
    }

    /// Marks an expression as an assignment target. Tuple targets mark each
    /// component.
    pub fn request_lvalue(&mut self, id: NodeId) -> Result<(), CoreError> {
        let components = match &mut self.node_mut(id)?.kind {
            NodeKind::Expression(expr) => {
                expr.annotation.lvalue_requested = true;
                match &expr.kind {
                    ExprKind::Tuple { components } => components.clone(),
                    _ => Vec::new(),
                }
            }
            other => {
                return Err(CoreError::UnexpectedNode {
                    id,
                    expected: "expression",
                    found: other.name(),
                })
            }
        };
        for component in components.into_iter().flatten() {
            self.request_lvalue(component)?;
        }
        Ok(())
    }

    /// `lhs = rhs`.
    pub fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, CoreError> {
        self.compound_assign(AssignOp::Assign, lhs, rhs)
    }

    /// `lhs op= rhs`.
    pub fn compound_assign(
        &mut self,
        operator: AssignOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<NodeId, CoreError> {
        self.request_lvalue(lhs)?;
        let ty = self.expr(lhs)?.annotation.ty;
        Ok(self.push_expr(ExprKind::Assignment { operator, lhs, rhs }, ty))
    }

    pub fn binary(&mut self, operator: BinaryOp, lhs: NodeId, rhs: NodeId, ty: TypeId) -> NodeId {
        self.push_expr(ExprKind::BinaryOperation { operator, lhs, rhs }, ty)
    }

    /// Unary operation; `++`, `--` and `delete` request an lvalue operand.
    pub fn unary(&mut self, operator: UnaryOp, operand: NodeId, prefix: bool) -> Result<NodeId, CoreError> {
        if operator.writes_operand() {
            self.request_lvalue(operand)?;
        }
        let ty = if operator == UnaryOp::Delete {
            TypeId::EMPTY_TUPLE
        } else {
            self.expr(operand)?.annotation.ty
        };
        Ok(self.push_expr(
            ExprKind::UnaryOperation {
                operator,
                prefix,
                operand,
            },
            ty,
        ))
    }

    pub fn conditional(
        &mut self,
        condition: NodeId,
        true_expression: NodeId,
        false_expression: NodeId,
    ) -> Result<NodeId, CoreError> {
        let ty = self.expr(true_expression)?.annotation.ty;
        Ok(self.push_expr(
            ExprKind::Conditional {
                condition,
                true_expression,
                false_expression,
            },
            ty,
        ))
    }

    pub fn tuple(&mut self, components: Vec<Option<NodeId>>) -> Result<NodeId, CoreError> {
        let mut types = Vec::with_capacity(components.len());
        for component in components.iter().flatten() {
            types.push(self.expr(*component)?.annotation.ty);
        }
        let ty = self.types.intern(SolType::Tuple(types));
        Ok(self.push_expr(ExprKind::Tuple { components }, ty))
    }

    pub fn literal(&mut self, value: &str, ty: TypeId) -> NodeId {
        self.push_expr(
            ExprKind::Literal {
                value: value.to_string(),
            },
            ty,
        )
    }

    /// A `uint256` number literal.
    pub fn number(&mut self, value: u64) -> NodeId {
        self.literal(&value.to_string(), TypeId::UINT256)
    }

    /// `new T`, typed as the creation function.
    pub fn new_expression(&mut self, type_name: &str, ty: TypeId) -> NodeId {
        self.push_expr(
            ExprKind::New {
                type_name: type_name.to_string(),
            },
            ty,
        )
    }

    /// An elementary type name used as an expression (`uint`, `address`).
    pub fn elementary_type_name(&mut self, name: &str, ty: TypeId) -> NodeId {
        let type_ty = self.types.intern(SolType::TypeName(ty));
        self.push_expr(
            ExprKind::ElementaryTypeName {
                name: name.to_string(),
            },
            type_ty,
        )
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

/// Declaration ids referenced directly by a node.
fn node_decl_refs(kind: &NodeKind) -> Vec<DeclId> {
    match kind {
        NodeKind::ContractDefinition { decl, .. }
        | NodeKind::StateVariable { decl, .. }
        | NodeKind::StructDefinition { decl, .. }
        | NodeKind::EventDefinition { decl, .. }
        | NodeKind::FunctionDefinition { decl, .. }
        | NodeKind::ModifierDefinition { decl, .. }
        | NodeKind::VariableDeclaration { decl } => vec![*decl],
        NodeKind::Expression(Expr {
            kind:
                ExprKind::Identifier {
                    referenced: Some(decl),
                    ..
                }
                | ExprKind::MemberAccess {
                    referenced: Some(decl),
                    ..
                },
            ..
        }) => vec![*decl],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract_fixture() -> (Ast, ContractRef) {
        let mut ast = Ast::new();
        let unit = ast.add_source_unit("c.sol");
        let c = ast.add_contract(unit, "C").unwrap();
        (ast, c)
    }

    #[test]
    fn new_ast_registers_global_magics() {
        let ast = Ast::new();
        for name in ["now", "msg", "block", "tx", "keccak256", "blockhash", "selfdestruct"] {
            let decl = ast.global(name).unwrap();
            assert!(ast.decl(decl).unwrap().is_magic(), "{} should be a magic", name);
        }
        assert!(ast.global("balance").is_none());
    }

    #[test]
    fn builtin_functions_carry_their_mutability() {
        let ast = Ast::new();
        let blockhash = ast.decl(ast.global("blockhash").unwrap()).unwrap();
        let f = ast
            .types
            .get(blockhash.value_type())
            .and_then(SolType::as_function)
            .unwrap();
        assert_eq!(f.mutability, StateMutability::View);
    }

    #[test]
    fn contracts_are_collected_in_source_order() {
        let mut ast = Ast::new();
        let a = ast.add_source_unit("a.sol");
        ast.add_pragma(a, "solidity ^0.4.17").unwrap();
        let first = ast.add_contract(a, "A").unwrap();
        let b = ast.add_source_unit("b.sol");
        let second = ast.add_contract(b, "B").unwrap();
        let third = ast.add_contract(a, "A2").unwrap();

        assert_eq!(ast.contracts().unwrap(), vec![first.node, third.node, second.node]);
    }

    #[test]
    fn identifiers_take_their_declaration_type() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let id = ast.identifier(x).unwrap();
        let expr = ast.expr(id).unwrap();
        assert_eq!(expr.annotation.ty, TypeId::UINT256);
        assert!(!expr.annotation.lvalue_requested);
        assert!(ast.decl(x).unwrap().is_state_variable());
    }

    #[test]
    fn assignment_requests_lvalue_on_target_only() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let lhs = ast.identifier(x).unwrap();
        let rhs = ast.identifier(x).unwrap();
        ast.assign(lhs, rhs).unwrap();
        assert!(ast.expr(lhs).unwrap().annotation.lvalue_requested);
        assert!(!ast.expr(rhs).unwrap().annotation.lvalue_requested);
    }

    #[test]
    fn tuple_assignment_marks_each_component() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let y = ast.add_state_variable(&c, "y", TypeId::UINT256, None).unwrap();
        let xi = ast.identifier(x).unwrap();
        let yi = ast.identifier(y).unwrap();
        let lhs = ast.tuple(vec![Some(xi), None, Some(yi)]).unwrap();
        let one = ast.number(1);
        let two = ast.number(2);
        let rhs = ast.tuple(vec![Some(one), None, Some(two)]).unwrap();
        ast.assign(lhs, rhs).unwrap();
        assert!(ast.expr(xi).unwrap().annotation.lvalue_requested);
        assert!(ast.expr(yi).unwrap().annotation.lvalue_requested);
    }

    #[test]
    fn increment_and_delete_request_lvalue() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let a = ast.identifier(x).unwrap();
        let b = ast.identifier(x).unwrap();
        let c2 = ast.identifier(x).unwrap();
        ast.unary(UnaryOp::Inc, a, false).unwrap();
        ast.unary(UnaryOp::Delete, b, true).unwrap();
        ast.unary(UnaryOp::Neg, c2, true).unwrap();
        assert!(ast.expr(a).unwrap().annotation.lvalue_requested);
        assert!(ast.expr(b).unwrap().annotation.lvalue_requested);
        assert!(!ast.expr(c2).unwrap().annotation.lvalue_requested);
    }

    #[test]
    fn call_result_type_follows_callee_returns() {
        let (mut ast, c) = contract_fixture();
        let g = ast
            .add_function(
                &c,
                "g",
                FunctionSpec::new(StateMutability::View).returns("", TypeId::BOOL),
            )
            .unwrap();
        let callee = ast.identifier(g.decl).unwrap();
        let call = ast.call(callee, vec![]).unwrap();
        assert_eq!(ast.expr(call).unwrap().annotation.ty, TypeId::BOOL);

        let h = ast.add_function(&c, "h", FunctionSpec::new(StateMutability::Pure)).unwrap();
        let callee = ast.identifier(h.decl).unwrap();
        let call = ast.call(callee, vec![]).unwrap();
        assert_eq!(ast.expr(call).unwrap().annotation.ty, TypeId::EMPTY_TUPLE);
    }

    #[test]
    fn calling_a_non_function_is_rejected() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let callee = ast.identifier(x).unwrap();
        assert!(matches!(
            ast.call(callee, vec![]),
            Err(CoreError::UnexpectedNode { .. })
        ));
    }

    #[test]
    fn function_body_can_only_be_set_once() {
        let (mut ast, c) = contract_fixture();
        let f = ast.add_function(&c, "f", FunctionSpec::new(StateMutability::Pure)).unwrap();
        ast.set_function_body(&f, vec![]).unwrap();
        assert!(matches!(
            ast.set_function_body(&f, vec![]),
            Err(CoreError::BodyAlreadySet { .. })
        ));
    }

    #[test]
    fn function_parameters_become_declarations() {
        let (mut ast, c) = contract_fixture();
        let f = ast
            .add_function(
                &c,
                "f",
                FunctionSpec::new(StateMutability::Pure)
                    .param("a", TypeId::UINT256)
                    .returns("r", TypeId::BOOL),
            )
            .unwrap();
        assert_eq!(f.params.len(), 1);
        assert_eq!(f.returns.len(), 1);
        assert_eq!(ast.decl(f.params[0]).unwrap().name, "a");
        let NodeKind::FunctionDefinition { parameters, returns, .. } = &ast.node(f.node).unwrap().kind
        else {
            panic!("expected function definition");
        };
        assert_eq!(parameters.len(), 1);
        assert_eq!(returns.len(), 1);
    }

    #[test]
    fn overriding_a_non_function_is_rejected() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let result = ast.add_function(
            &c,
            "f",
            FunctionSpec::new(StateMutability::View).overriding(x),
        );
        assert!(matches!(result, Err(CoreError::UnexpectedDecl { .. })));
    }

    #[test]
    fn modifier_invocation_targets_modifiers_or_contracts() {
        let (mut ast, c) = contract_fixture();
        let m = ast.add_modifier(&c, "m", &[]).unwrap();
        let f = ast.add_function(&c, "f", FunctionSpec::new(StateMutability::View)).unwrap();
        let inv = ast.add_modifier_invocation(&f, m.decl, vec![]).unwrap();
        let NodeKind::FunctionDefinition { modifiers, .. } = &ast.node(f.node).unwrap().kind else {
            panic!("expected function definition");
        };
        assert_eq!(modifiers, &vec![inv]);

        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        assert!(ast.add_modifier_invocation(&f, x, vec![]).is_err());
        assert!(ast.add_modifier_invocation(&f, c.decl, vec![]).is_ok());
    }

    #[test]
    fn modifier_body_is_replaced_in_place() {
        let (mut ast, c) = contract_fixture();
        let m = ast.add_modifier(&c, "m", &[]).unwrap();
        let placeholder = ast.placeholder();
        let body = ast.set_modifier_body(&m, vec![placeholder]).unwrap();
        assert_eq!(ast.node(body).unwrap().kind.children().as_slice(), &[placeholder]);
    }

    #[test]
    fn nodes_are_stamped_with_the_active_source() {
        let mut ast = Ast::new();
        ast.add_source_unit("first.sol");
        let a = ast.number(1);
        ast.add_source_unit("second.sol");
        let b = ast.number(2);
        assert_eq!(ast.node(a).unwrap().location.source, "first.sol");
        assert_eq!(ast.node(b).unwrap().location.source, "second.sol");

        ast.set_location(b, SourceLocation::new("x.sol", 5, 9)).unwrap();
        assert_eq!(ast.node(b).unwrap().location.to_string(), "x.sol:5-9");
    }

    #[test]
    fn json_roundtrip_preserves_structure() {
        let (mut ast, c) = contract_fixture();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let f = ast.add_function(&c, "f", FunctionSpec::new(StateMutability::View)).unwrap();
        let read = ast.identifier(x).unwrap();
        let ret = ast.return_statement(Some(read));
        ast.set_function_body(&f, vec![ret]).unwrap();

        let json = ast.to_json().unwrap();
        let back = Ast::from_json(&json).unwrap();
        assert_eq!(back.node_count(), ast.node_count());
        assert_eq!(back.decl_count(), ast.decl_count());
        assert_eq!(back.contracts().unwrap(), vec![c.node]);
        assert_eq!(back.global("now"), ast.global("now"));
    }

    #[test]
    fn validate_rejects_dangling_children() {
        let (mut ast, _) = contract_fixture();
        ast.expression_statement(NodeId(10_000));
        assert!(matches!(
            ast.validate(),
            Err(CoreError::DanglingReference { .. })
        ));
    }

    #[test]
    fn from_json_rejects_a_block_containing_itself() {
        let (mut ast, c) = contract_fixture();
        let f = ast.add_function(&c, "f", FunctionSpec::new(StateMutability::Pure)).unwrap();
        let block = ast.set_function_body(&f, vec![]).unwrap();

        let mut value = serde_json::to_value(&ast).unwrap();
        value["nodes"][block.index()]["kind"]["Block"]["statements"] = serde_json::json!([block.0]);
        let json = serde_json::to_string(&value).unwrap();

        match Ast::from_json(&json) {
            Err(CoreError::MalformedTree { node, .. }) => assert_eq!(node, block),
            other => panic!("expected MalformedTree, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn validate_rejects_a_cycle_between_two_nodes() {
        let (mut ast, c) = contract_fixture();
        let f = ast.add_function(&c, "f", FunctionSpec::new(StateMutability::Pure)).unwrap();
        let inner = ast.block(vec![]);
        let body = ast.set_function_body(&f, vec![inner]).unwrap();

        let mut value = serde_json::to_value(&ast).unwrap();
        value["nodes"][inner.index()]["kind"]["Block"]["statements"] = serde_json::json!([body.0]);
        // The function now has a body whose block is also claimed by `inner`.
        let json = serde_json::to_string(&value).unwrap();
        assert!(matches!(
            Ast::from_json(&json),
            Err(CoreError::MalformedTree { .. })
        ));

        // Detach the function so the pair forms a cycle with no way in.
        value["nodes"][f.node.index()]["kind"]["FunctionDefinition"]["body"] =
            serde_json::Value::Null;
        let json = serde_json::to_string(&value).unwrap();
        match Ast::from_json(&json) {
            Err(CoreError::MalformedTree { reason, .. }) => assert!(reason.contains("cycle")),
            other => panic!("expected MalformedTree, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn validate_rejects_a_node_with_two_parents() {
        let (mut ast, c) = contract_fixture();
        let shared = ast.placeholder();
        let f = ast.add_function(&c, "f", FunctionSpec::new(StateMutability::Pure)).unwrap();
        let g = ast.add_function(&c, "g", FunctionSpec::new(StateMutability::Pure)).unwrap();
        ast.set_function_body(&f, vec![shared]).unwrap();
        ast.set_function_body(&g, vec![shared]).unwrap();

        match ast.validate() {
            Err(CoreError::MalformedTree { node, .. }) => assert_eq!(node, shared),
            other => panic!("expected MalformedTree, got {:?}", other),
        }
    }

    #[test]
    fn from_json_rejects_a_repeated_type_entry() {
        let (ast, _) = contract_fixture();
        let mut value = serde_json::to_value(&ast).unwrap();
        let types = value["types"]["types"].as_array_mut().unwrap();
        let first = types[0].clone();
        types.insert(1, first);
        let json = serde_json::to_string(&value).unwrap();
        assert!(matches!(Ast::from_json(&json), Err(CoreError::Json(_))));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(Ast::from_json("{not json"), Err(CoreError::Json(_))));
    }
}
