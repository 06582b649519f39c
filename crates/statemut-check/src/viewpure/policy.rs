//! Diagnostic policy: which (declared, required) pairs are reported, how
//! severely, and with which text.
//!
//! | declared \ required | view       | nonpayable (write)        |
//! |---------------------|------------|---------------------------|
//! | pure                | error      | error                     |
//! | view                | -          | warning (error if strict) |
//! | nonpayable/payable  | -          | -                         |

use statemut_core::mutability::StateMutability;

use super::diagnostics::{DiagnosticKind, Severity};
use crate::config::CheckerConfig;
use crate::error::CheckError;

/// A diagnostic decision, not yet bound to a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// The facts about a function that decide whether a tighter level may be
/// suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionFacts {
    pub declared: StateMutability,
    pub implemented: bool,
    pub is_constructor: bool,
    pub overrides_base: bool,
}

/// Decides how to report an expression requiring `required` inside a
/// function declared `declared`.
///
/// Returns `Ok(None)` when the requirement fits under the declared cap.
pub fn excess(
    declared: StateMutability,
    required: StateMutability,
    config: &CheckerConfig,
) -> Result<Option<Verdict>, CheckError> {
    if required <= declared {
        return Ok(None);
    }

    let (kind, message) = match required {
        StateMutability::View => (
            DiagnosticKind::ReadsEnvironment,
            "Function declared as pure, but this expression reads from the \
             environment and thus requires \"view\"."
                .to_string(),
        ),
        StateMutability::NonPayable => (
            DiagnosticKind::ModifiesState,
            format!(
                "Function declared as {}, but this expression modifies the state and thus \
                 requires non-payable (the default) or payable.",
                declared
            ),
        ),
        StateMutability::Pure | StateMutability::Payable => {
            return Err(CheckError::UnexpectedRequirement { declared, required })
        }
    };

    let severity = match declared {
        StateMutability::Pure => Severity::Error,
        // Deprecation window: writes in view functions were accepted by the
        // previous language revision.
        StateMutability::View if config.view_writes_are_errors => Severity::Error,
        StateMutability::View => Severity::Warning,
        StateMutability::NonPayable | StateMutability::Payable => {
            return Err(CheckError::UnexpectedRequirement { declared, required })
        }
    };

    Ok(Some(Verdict {
        severity,
        kind,
        message,
    }))
}

/// Returns `true` if a function with these facts whose body needs at most
/// `best` should be told to tighten its declaration.
///
/// Payable functions are excluded because dropping `payable` changes what
/// callers may do, not just what the body does.
pub fn can_be_restricted(facts: &FunctionFacts, best: StateMutability) -> bool {
    best < facts.declared
        && facts.declared != StateMutability::Payable
        && facts.implemented
        && !facts.is_constructor
        && !facts.overrides_base
}

/// The "can be restricted" suggestion for a function, if one applies.
pub fn restriction(
    facts: &FunctionFacts,
    best: StateMutability,
    config: &CheckerConfig,
) -> Option<Verdict> {
    if !config.suggest_restrictions || !can_be_restricted(facts, best) {
        return None;
    }
    Some(Verdict {
        severity: Severity::Warning,
        kind: DiagnosticKind::CanBeRestricted,
        message: format!("Function state mutability can be restricted to {}", best),
    })
}

/// The informational note describing a modifier's inferred level.
pub fn inferred_modifier(level: StateMutability) -> Verdict {
    Verdict {
        severity: Severity::Info,
        kind: DiagnosticKind::InferredModifier,
        message: format!("Modifier state mutability inferred as {}", level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use StateMutability::*;

    fn facts(declared: StateMutability) -> FunctionFacts {
        FunctionFacts {
            declared,
            implemented: true,
            is_constructor: false,
            overrides_base: false,
        }
    }

    fn any_level() -> impl Strategy<Value = StateMutability> {
        prop::sample::select(StateMutability::ALL.to_vec())
    }

    #[test]
    fn pure_reading_is_an_error() {
        let v = excess(Pure, View, &CheckerConfig::default()).unwrap().unwrap();
        assert_eq!(v.severity, Severity::Error);
        assert_eq!(v.kind, DiagnosticKind::ReadsEnvironment);
        assert_eq!(
            v.message,
            "Function declared as pure, but this expression reads from the environment \
             and thus requires \"view\"."
        );
    }

    #[test]
    fn pure_writing_is_an_error() {
        let v = excess(Pure, NonPayable, &CheckerConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(v.severity, Severity::Error);
        assert_eq!(
            v.message,
            "Function declared as pure, but this expression modifies the state and thus \
             requires non-payable (the default) or payable."
        );
    }

    #[test]
    fn view_writing_is_a_warning_unless_strict() {
        let v = excess(View, NonPayable, &CheckerConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(v.severity, Severity::Warning);
        assert!(v.message.starts_with("Function declared as view,"));

        let strict = excess(View, NonPayable, &CheckerConfig::strict())
            .unwrap()
            .unwrap();
        assert_eq!(strict.severity, Severity::Error);
        assert_eq!(strict.message, v.message);
    }

    #[test]
    fn requirements_within_the_cap_are_silent() {
        let config = CheckerConfig::default();
        assert!(excess(View, View, &config).unwrap().is_none());
        assert!(excess(NonPayable, NonPayable, &config).unwrap().is_none());
        assert!(excess(Payable, NonPayable, &config).unwrap().is_none());
        assert!(excess(Pure, Pure, &config).unwrap().is_none());
    }

    #[test]
    fn payable_requirement_is_an_invariant_violation() {
        assert!(matches!(
            excess(NonPayable, Payable, &CheckerConfig::default()),
            Err(CheckError::UnexpectedRequirement { .. })
        ));
    }

    #[test]
    fn restriction_message_names_the_tighter_level() {
        let v = restriction(&facts(View), Pure, &CheckerConfig::default()).unwrap();
        assert_eq!(v.message, "Function state mutability can be restricted to pure");
        assert_eq!(v.severity, Severity::Warning);
    }

    #[test]
    fn restriction_exclusions() {
        let config = CheckerConfig::default();
        assert!(restriction(&facts(Payable), Pure, &config).is_none());
        assert!(restriction(&facts(View), View, &config).is_none());

        let mut unimplemented = facts(NonPayable);
        unimplemented.implemented = false;
        assert!(restriction(&unimplemented, Pure, &config).is_none());

        let mut ctor = facts(NonPayable);
        ctor.is_constructor = true;
        assert!(restriction(&ctor, Pure, &config).is_none());

        let mut overriding = facts(NonPayable);
        overriding.overrides_base = true;
        assert!(restriction(&overriding, View, &config).is_none());
    }

    #[test]
    fn suggestions_can_be_switched_off() {
        let config = CheckerConfig {
            suggest_restrictions: false,
            ..CheckerConfig::default()
        };
        assert!(restriction(&facts(View), Pure, &config).is_none());
    }

    #[test]
    fn inferred_modifier_note() {
        let v = inferred_modifier(View);
        assert_eq!(v.severity, Severity::Info);
        assert_eq!(v.message, "Modifier state mutability inferred as view");
    }

    proptest! {
        #[test]
        fn suggestion_iff_predicate(
            declared in any_level(),
            best in any_level(),
            implemented in any::<bool>(),
            is_constructor in any::<bool>(),
            overrides_base in any::<bool>(),
        ) {
            let f = FunctionFacts { declared, implemented, is_constructor, overrides_base };
            let expected = best < declared
                && declared != Payable
                && implemented
                && !is_constructor
                && !overrides_base;
            let got = restriction(&f, best, &CheckerConfig::default()).is_some();
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn classifier_reachable_pairs_never_fail(
            declared in any_level(),
            required in prop::sample::select(vec![Pure, View, NonPayable]),
        ) {
            let result = excess(declared, required, &CheckerConfig::default()).unwrap();
            prop_assert_eq!(result.is_some(), required > declared);
        }
    }
}
