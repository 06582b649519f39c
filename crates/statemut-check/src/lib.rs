//! State mutability checking for contract programs.
//!
//! This crate walks the annotated AST built by `statemut-core` and verifies
//! that no function does more than its declared `pure`/`view` level allows,
//! suggesting a tighter level where one would do.
//!
//! # Modules
//!
//! - [`config`] -- Policy switches, loadable from JSON
//! - [`error`] -- Invariant violations that abort a check
//! - [`viewpure`] -- The classifier, body walker, diagnostic policy and driver

pub mod config;
pub mod error;
pub mod viewpure;

pub use config::CheckerConfig;
pub use error::{CheckError, ConfigError};
pub use viewpure::{
    check_program, CheckReport, Diagnostic, DiagnosticCollector, DiagnosticKind, ErrorReporter,
    InferredModifier, Severity, ViewPureChecker,
};
