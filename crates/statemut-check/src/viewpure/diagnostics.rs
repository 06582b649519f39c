//! Diagnostics and the reporter sink they flow into.
//!
//! The checker never returns diagnostics directly; it pushes them into an
//! [`ErrorReporter`]. [`DiagnosticCollector`] is the in-memory reporter used
//! by [`check_program`](super::check_program) and the CLI.

use std::fmt;

use serde::{Deserialize, Serialize};
use statemut_core::node::SourceLocation;

/// How serious a diagnostic is. Only errors make a check fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("Error"),
            Severity::Warning => f.write_str("Warning"),
            Severity::Info => f.write_str("Info"),
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A `pure` function reads the environment or state.
    ReadsEnvironment,
    /// A `pure` or `view` function writes state.
    ModifiesState,
    /// A function could be declared with a tighter mutability.
    CanBeRestricted,
    /// The inferred mutability of a modifier.
    InferredModifier,
}

/// A single message produced by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Sink for checker diagnostics.
pub trait ErrorReporter {
    /// Records a diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);

    fn error(&mut self, location: &SourceLocation, kind: DiagnosticKind, message: String) {
        self.report(Diagnostic {
            severity: Severity::Error,
            kind,
            location: location.clone(),
            message,
        });
    }

    fn warning(&mut self, location: &SourceLocation, kind: DiagnosticKind, message: String) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            kind,
            location: location.clone(),
            message,
        });
    }

    fn info(&mut self, location: &SourceLocation, kind: DiagnosticKind, message: String) {
        self.report(Diagnostic {
            severity: Severity::Info,
            kind,
            location: location.clone(),
            message,
        });
    }
}

/// Reporter that keeps every diagnostic in emission order.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Error).collect()
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Warning).collect()
    }

    pub fn infos(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Info).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.with_severity(Severity::Error).next().is_some()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

impl ErrorReporter for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
