//! The state mutability lattice.
//!
//! Four levels in a total order: `pure < view < nonpayable < payable`. The
//! join of two levels is the larger one. A function's declared level is an
//! upper bound on what its body may do; the level a body actually needs is
//! the join over everything it contains.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Declared or inferred state mutability of a function or modifier.
///
/// Variant order is the lattice order, so the derived `Ord` is the lattice
/// comparison.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    /// Reads no environment and writes no state.
    Pure,
    /// May read the environment or state, writes nothing.
    View,
    /// May write state; rejects value transfers. The default when no
    /// keyword is written.
    #[default]
    NonPayable,
    /// May write state and accept value transfers.
    Payable,
}

impl StateMutability {
    /// All levels in lattice order.
    pub const ALL: [StateMutability; 4] = [
        StateMutability::Pure,
        StateMutability::View,
        StateMutability::NonPayable,
        StateMutability::Payable,
    ];

    /// Position in the lattice, `0..=3`.
    pub fn order(self) -> u8 {
        match self {
            StateMutability::Pure => 0,
            StateMutability::View => 1,
            StateMutability::NonPayable => 2,
            StateMutability::Payable => 3,
        }
    }

    /// Least upper bound of two levels.
    pub fn join(self, other: StateMutability) -> StateMutability {
        if other.order() > self.order() {
            other
        } else {
            self
        }
    }

    /// Source-level spelling of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::NonPayable => "nonpayable",
            StateMutability::Payable => "payable",
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateMutability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pure" => Ok(StateMutability::Pure),
            "view" => Ok(StateMutability::View),
            "nonpayable" => Ok(StateMutability::NonPayable),
            "payable" => Ok(StateMutability::Payable),
            other => Err(CoreError::UnknownMutability {
                name: other.to_string(),
            }),
        }
    }
}
