//! Body walker: joins the requirements of every node in a function or
//! modifier and reports each one that exceeds the declared level.
//!
//! The walk is post-order and iterative, so children are observed before
//! their parent and deeply nested expressions cannot overflow the stack.

use statemut_core::ast::Ast;
use statemut_core::id::{DeclId, NodeId};
use statemut_core::mutability::StateMutability;

use super::classify::{required_mutability, InferredModifiers};
use super::diagnostics::{ErrorReporter, Severity};
use super::policy;
use crate::config::CheckerConfig;
use crate::error::CheckError;

/// What the walked body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A function body, checked against its declared level.
    Function {
        decl: DeclId,
        declared: StateMutability,
    },
    /// A modifier body; nothing is reported, the level is only inferred.
    Modifier { decl: DeclId },
}

/// Result of walking one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySummary {
    /// Join of every node's requirement.
    pub best: StateMutability,
    /// Hard errors reported during the walk.
    pub errors: usize,
}

/// One classified node, as seen by [`BodyWalker::walk_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub node: NodeId,
    /// Level the node itself requires.
    pub required: StateMutability,
    /// Running join after this node.
    pub best: StateMutability,
}

/// Walks a single function or modifier definition.
pub struct BodyWalker<'a> {
    ast: &'a Ast,
    inferred: &'a InferredModifiers,
    config: &'a CheckerConfig,
    scope: Scope,
    best: StateMutability,
    errors: usize,
}

impl<'a> BodyWalker<'a> {
    pub fn new(
        ast: &'a Ast,
        inferred: &'a InferredModifiers,
        config: &'a CheckerConfig,
        scope: Scope,
    ) -> Self {
        BodyWalker {
            ast,
            inferred,
            config,
            scope,
            best: StateMutability::Pure,
            errors: 0,
        }
    }

    /// Walks the subtree rooted at `root`, the function or modifier
    /// definition node.
    pub fn walk(
        self,
        root: NodeId,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<BodySummary, CheckError> {
        self.walk_with(root, reporter, |_| {})
    }

    /// Like [`walk`](Self::walk), calling `on_observe` after each node is
    /// classified, in post-order.
    pub fn walk_with<F>(
        mut self,
        root: NodeId,
        reporter: &mut dyn ErrorReporter,
        mut on_observe: F,
    ) -> Result<BodySummary, CheckError>
    where
        F: FnMut(Observation),
    {
        tracing::trace!(scope = ?self.scope, root = %root, "walking body");
        let mut stack: Vec<(NodeId, bool)> = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                let required = self.observe(id, reporter)?;
                on_observe(Observation {
                    node: id,
                    required,
                    best: self.best,
                });
                continue;
            }
            stack.push((id, true));
            let children = self.ast.node(id)?.kind.children();
            stack.extend(children.iter().rev().map(|&child| (child, false)));
        }
        Ok(BodySummary {
            best: self.best,
            errors: self.errors,
        })
    }

    fn observe(
        &mut self,
        id: NodeId,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<StateMutability, CheckError> {
        let required = required_mutability(self.ast, id, self.inferred)?;
        self.best = self.best.join(required);
        tracing::trace!(node = %id, %required, best = %self.best, "observed");

        let Scope::Function { declared, .. } = self.scope else {
            return Ok(required);
        };
        if let Some(verdict) = policy::excess(declared, required, self.config)? {
            let location = &self.ast.node(id)?.location;
            match verdict.severity {
                Severity::Error => {
                    self.errors += 1;
                    reporter.error(location, verdict.kind, verdict.message);
                }
                Severity::Warning => reporter.warning(location, verdict.kind, verdict.message),
                Severity::Info => reporter.info(location, verdict.kind, verdict.message),
            }
        }
        Ok(required)
    }
}
