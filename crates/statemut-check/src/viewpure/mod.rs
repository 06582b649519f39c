//! View/pure checker: infers the mutability each function body requires and
//! compares it with the declared level.
//!
//! The check runs in two passes over every contract of the program:
//! - modifiers are walked first and their inferred levels recorded, since a
//!   modifier has no declared level of its own;
//! - functions are then walked against their declared level, with every
//!   modifier invocation contributing the level inferred in the first pass.
//!
//! Diagnostics go to an [`ErrorReporter`]; a broken upstream guarantee
//! aborts the run with a [`CheckError`].

pub mod classify;
pub mod diagnostics;
pub mod policy;
pub mod walker;

pub use classify::{required_mutability, InferredModifiers};
pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind, ErrorReporter, Severity};
pub use policy::{FunctionFacts, Verdict};
pub use walker::{BodySummary, BodyWalker, Observation, Scope};

use serde::Serialize;

use statemut_core::ast::Ast;
use statemut_core::error::CoreError;
use statemut_core::id::{DeclId, NodeId};
use statemut_core::mutability::StateMutability;
use statemut_core::node::NodeKind;

use crate::config::CheckerConfig;
use crate::error::CheckError;

/// Checks every function of a program against its declared mutability.
pub struct ViewPureChecker<'a> {
    ast: &'a Ast,
    reporter: &'a mut dyn ErrorReporter,
    config: CheckerConfig,
    inferred: InferredModifiers,
    errors: usize,
}

impl<'a> ViewPureChecker<'a> {
    pub fn new(ast: &'a Ast, reporter: &'a mut dyn ErrorReporter, config: CheckerConfig) -> Self {
        ViewPureChecker {
            ast,
            reporter,
            config,
            inferred: InferredModifiers::new(),
            errors: 0,
        }
    }

    /// Runs both passes. Returns `Ok(true)` iff no hard error was reported.
    ///
    /// Every call starts from scratch, so checking the same AST twice
    /// reports the same diagnostics twice.
    pub fn check(&mut self) -> Result<bool, CheckError> {
        self.inferred.clear();
        self.errors = 0;

        let ast = self.ast;
        let contracts = ast.contracts()?;
        tracing::debug!(contracts = contracts.len(), "inferring modifier mutability");
        for &contract in &contracts {
            for member in self.members(contract)? {
                if let NodeKind::ModifierDefinition { decl, .. } = ast.node(member)?.kind {
                    self.visit_modifier(member, decl)?;
                }
            }
        }

        tracing::debug!(modifiers = self.inferred.len(), "checking functions");
        for &contract in &contracts {
            for member in self.members(contract)? {
                if let NodeKind::FunctionDefinition { decl, body, .. } = ast.node(member)?.kind {
                    self.visit_function(member, decl, body.is_some())?;
                }
            }
        }

        tracing::debug!(errors = self.errors, "view/pure check finished");
        Ok(self.errors == 0)
    }

    /// Levels inferred for every modifier by the last [`check`](Self::check),
    /// in source order.
    pub fn inferred_modifiers(&self) -> &InferredModifiers {
        &self.inferred
    }

    pub fn into_inferred(self) -> InferredModifiers {
        self.inferred
    }

    fn members(&self, contract: NodeId) -> Result<Vec<NodeId>, CheckError> {
        match &self.ast.node(contract)?.kind {
            NodeKind::ContractDefinition { members, .. } => Ok(members.clone()),
            other => Err(CoreError::UnexpectedNode {
                id: contract,
                expected: "ContractDefinition",
                found: other.name(),
            }
            .into()),
        }
    }

    fn visit_modifier(&mut self, node: NodeId, decl: DeclId) -> Result<(), CheckError> {
        let ast = self.ast;
        let summary = BodyWalker::new(
            ast,
            &self.inferred,
            &self.config,
            Scope::Modifier { decl },
        )
        .walk(node, &mut *self.reporter)?;

        let name = &ast.decl(decl)?.name;
        tracing::debug!(modifier = %name, level = %summary.best, "inferred modifier mutability");
        if self.config.explain_modifiers {
            let verdict = policy::inferred_modifier(summary.best);
            let location = &ast.node(node)?.location;
            self.reporter.info(location, verdict.kind, verdict.message);
        }
        self.inferred.insert(decl, summary.best);
        Ok(())
    }

    fn visit_function(
        &mut self,
        node: NodeId,
        decl: DeclId,
        implemented: bool,
    ) -> Result<(), CheckError> {
        let ast = self.ast;
        let declaration = ast.decl(decl)?;
        let function = declaration
            .as_function()
            .ok_or_else(|| CoreError::UnexpectedDecl {
                id: decl,
                name: declaration.name.clone(),
                expected: "function",
            })?;
        let declared = function.mutability;

        let summary = BodyWalker::new(
            ast,
            &self.inferred,
            &self.config,
            Scope::Function { decl, declared },
        )
        .walk(node, &mut *self.reporter)?;
        self.errors += summary.errors;

        let facts = FunctionFacts {
            declared,
            implemented,
            is_constructor: function.is_constructor,
            overrides_base: function.overrides.is_some(),
        };
        if let Some(verdict) = policy::restriction(&facts, summary.best, &self.config) {
            tracing::debug!(
                function = %declaration.name,
                %declared,
                best = %summary.best,
                "suggesting tighter mutability"
            );
            let location = &ast.node(node)?.location;
            self.reporter.warning(location, verdict.kind, verdict.message);
        }
        Ok(())
    }
}

/// A modifier together with the level inferred for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredModifier {
    pub decl: DeclId,
    pub name: String,
    pub mutability: StateMutability,
}

/// Everything one check of a program produced.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// `true` iff no hard error was reported.
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub inferred_modifiers: Vec<InferredModifier>,
}

impl CheckReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// Checks `ast` with an in-memory reporter and collects the outcome.
pub fn check_program(ast: &Ast, config: &CheckerConfig) -> Result<CheckReport, CheckError> {
    let mut collector = DiagnosticCollector::new();
    let (success, inferred) = {
        let mut checker = ViewPureChecker::new(ast, &mut collector, config.clone());
        let success = checker.check()?;
        (success, checker.into_inferred())
    };

    let inferred_modifiers = inferred
        .into_iter()
        .map(|(decl, mutability)| {
            Ok(InferredModifier {
                decl,
                name: ast.decl(decl)?.name.clone(),
                mutability,
            })
        })
        .collect::<Result<Vec<_>, CheckError>>()?;

    Ok(CheckReport {
        success,
        diagnostics: collector.into_diagnostics(),
        inferred_modifiers,
    })
}
