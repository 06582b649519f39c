//! State mutability checker CLI.
//!
//! Provides the `statemut` binary. `check` loads one or more annotated ASTs
//! serialized as JSON (the format written by `Ast::to_json`), runs the
//! view/pure checker over each one and prints the diagnostics.
//!
//! Logging goes to stderr and is controlled by the `STATEMUT_LOG`
//! environment variable (default: `warn`).

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use statemut_check::{check_program, CheckError, CheckReport, CheckerConfig, ConfigError};
use statemut_core::{Ast, CoreError};

/// State mutability checker for contract programs.
#[derive(Parser)]
#[command(name = "statemut", about = "State mutability checker for contract programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check serialized ASTs for functions that do more than their
    /// declared mutability allows.
    Check {
        /// AST files (JSON) to check. Each file is checked as one program.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Checker config file (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Report state writes in view functions as errors.
        #[arg(long)]
        strict: bool,

        /// Do not suggest tighter mutability levels.
        #[arg(long)]
        no_suggestions: bool,

        /// Report the inferred mutability of every modifier.
        #[arg(long)]
        explain_modifiers: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One line per diagnostic.
    Text,
    /// A JSON array with one report per file.
    Json,
}

/// Command-line switches layered over the config file.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    strict: bool,
    no_suggestions: bool,
    explain_modifiers: bool,
}

/// Failure to turn one input file into a checked report.
#[derive(Debug, thiserror::Error)]
enum FileError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load AST from '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("internal error while checking '{}': {source}", path.display())]
    Check {
        path: PathBuf,
        #[source]
        source: CheckError,
    },
}

impl FileError {
    fn exit_code(&self) -> i32 {
        match self {
            FileError::Io { .. } | FileError::Decode { .. } => 3,
            FileError::Check { .. } => 2,
        }
    }
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: PathBuf,
    #[serde(flatten)]
    report: CheckReport,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            files,
            config,
            strict,
            no_suggestions,
            explain_modifiers,
            format,
        } => {
            let overrides = Overrides {
                strict,
                no_suggestions,
                explain_modifiers,
            };
            let exit_code = run_check(&files, config.as_deref(), overrides, format);
            process::exit(exit_code);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STATEMUT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = no errors, 1 = errors reported,
/// 2 = invariant violation in the input AST, 3 = I/O or decode error.
/// With several files the most severe outcome wins.
fn run_check(
    files: &[PathBuf],
    config_path: Option<&Path>,
    overrides: Overrides,
    format: Format,
) -> i32 {
    let config = match load_config(config_path, overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    let mut exit_code = 0;
    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        match check_file(path, &config) {
            Ok(report) => {
                if !report.success {
                    exit_code = exit_code.max(1);
                }
                reports.push(FileReport {
                    file: path.clone(),
                    report,
                });
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_code = exit_code.max(e.exit_code());
            }
        }
    }

    match format {
        Format::Text => print_text(&reports),
        Format::Json => {
            let json = serde_json::to_string_pretty(&reports).unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize reports: {}\"}}", e)
            });
            println!("{}", json);
        }
    }
    exit_code
}

/// Reads the config file, if any, and applies the command-line switches.
fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<CheckerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => CheckerConfig::from_json_file(path)?,
        None => CheckerConfig::default(),
    };
    if overrides.strict {
        config.view_writes_are_errors = true;
    }
    if overrides.no_suggestions {
        config.suggest_restrictions = false;
    }
    if overrides.explain_modifiers {
        config.explain_modifiers = true;
    }
    Ok(config)
}

fn check_file(path: &Path, config: &CheckerConfig) -> Result<CheckReport, FileError> {
    tracing::info!(file = %path.display(), "checking");
    let json = std::fs::read_to_string(path).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ast = Ast::from_json(&json).map_err(|source| FileError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    check_program(&ast, config).map_err(|source| FileError::Check {
        path: path.to_path_buf(),
        source,
    })
}

fn print_text(reports: &[FileReport]) {
    let mut errors = 0;
    let mut warnings = 0;
    for file in reports {
        for diagnostic in &file.report.diagnostics {
            println!("{}", diagnostic);
        }
        errors += file.report.errors().count();
        warnings += file.report.warnings().count();
    }
    eprintln!(
        "Checked {} file(s): {} error(s), {} warning(s)",
        reports.len(),
        errors,
        warnings
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use statemut_core::{FunctionSpec, StateMutability, TypeId};
    use std::io::Write;

    /// Writes `ast` as JSON into `dir` and returns the file path.
    fn write_ast(dir: &Path, name: &str, ast: &Ast) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(ast.to_json().unwrap().as_bytes()).unwrap();
        path
    }

    /// contract C { uint x; function f() <declared> { x = 1; } }
    fn writer(declared: StateMutability) -> Ast {
        let mut ast = Ast::new();
        let unit = ast.add_source_unit("c.sol");
        let c = ast.add_contract(unit, "C").unwrap();
        let x = ast.add_state_variable(&c, "x", TypeId::UINT256, None).unwrap();
        let f = ast.add_function(&c, "f", FunctionSpec::new(declared)).unwrap();
        let lhs = ast.identifier(x).unwrap();
        let one = ast.number(1);
        let assign = ast.assign(lhs, one).unwrap();
        let stmt = ast.expression_statement(assign);
        ast.set_function_body(&f, vec![stmt]).unwrap();
        ast
    }

    #[test]
    fn parses_check_arguments() {
        let cli = Cli::try_parse_from([
            "statemut",
            "check",
            "a.json",
            "b.json",
            "--strict",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Check {
            files,
            strict,
            no_suggestions,
            format,
            ..
        } = cli.command;
        assert_eq!(files, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert!(strict);
        assert!(!no_suggestions);
        assert_eq!(format, Format::Json);
    }

    #[test]
    fn check_requires_a_file() {
        assert!(Cli::try_parse_from(["statemut", "check"]).is_err());
    }

    #[test]
    fn exit_codes_follow_the_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let clean = write_ast(dir.path(), "clean.json", &writer(StateMutability::NonPayable));
        let deprecated = write_ast(dir.path(), "view.json", &writer(StateMutability::View));
        let broken = write_ast(dir.path(), "pure.json", &writer(StateMutability::Pure));

        let run = |files: &[PathBuf], overrides: Overrides| {
            run_check(files, None, overrides, Format::Json)
        };
        assert_eq!(run(&[clean.clone()], Overrides::default()), 0);
        assert_eq!(run(&[deprecated.clone()], Overrides::default()), 0);
        assert_eq!(
            run(
                &[deprecated],
                Overrides {
                    strict: true,
                    ..Overrides::default()
                }
            ),
            1
        );
        assert_eq!(run(&[clean, broken], Overrides::default()), 1);
    }

    #[test]
    fn unreadable_and_malformed_files_exit_with_3() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();

        assert_eq!(
            run_check(&[missing], None, Overrides::default(), Format::Text),
            3
        );
        assert_eq!(
            run_check(&[garbage], None, Overrides::default(), Format::Text),
            3
        );
    }

    #[test]
    fn cyclic_ast_exits_with_3() {
        let mut ast = Ast::new();
        let unit = ast.add_source_unit("c.sol");
        let c = ast.add_contract(unit, "C").unwrap();
        let f = ast
            .add_function(&c, "f", FunctionSpec::new(StateMutability::Pure))
            .unwrap();
        let block = ast.set_function_body(&f, vec![]).unwrap();

        let mut value = serde_json::to_value(&ast).unwrap();
        value["nodes"][block.index()]["kind"]["Block"]["statements"] =
            serde_json::json!([block.0]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle.json");
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert_eq!(
            run_check(&[path], None, Overrides::default(), Format::Text),
            3
        );
    }

    #[test]
    fn invariant_violations_exit_with_2() {
        let mut ast = Ast::new();
        let unit = ast.add_source_unit("c.sol");
        let c = ast.add_contract(unit, "C").unwrap();
        let f = ast
            .add_function(&c, "f", FunctionSpec::new(StateMutability::Pure))
            .unwrap();
        let ghost = ast.unresolved_identifier("ghost", TypeId::UINT256);
        let stmt = ast.expression_statement(ghost);
        ast.set_function_body(&f, vec![stmt]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_ast(dir.path(), "ghost.json", &ast);
        assert_eq!(
            run_check(&[path], None, Overrides::default(), Format::Text),
            2
        );
    }

    #[test]
    fn switches_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statemut.json");
        std::fs::write(&path, r#"{ "suggest_restrictions": true }"#).unwrap();

        let config = load_config(
            Some(&path),
            Overrides {
                no_suggestions: true,
                explain_modifiers: true,
                ..Overrides::default()
            },
        )
        .unwrap();
        assert!(!config.suggest_restrictions);
        assert!(config.explain_modifiers);
        assert!(!config.view_writes_are_errors);
    }

    #[test]
    fn bad_config_exits_with_3() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bad.json");
        std::fs::write(&config, r#"{ "view_writes_are_errors": "yes" }"#).unwrap();
        let ast = write_ast(dir.path(), "a.json", &Ast::new());
        assert_eq!(
            run_check(&[ast], Some(&config), Overrides::default(), Format::Text),
            3
        );
    }
}
