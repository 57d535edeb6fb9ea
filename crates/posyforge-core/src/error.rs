//! Error types for the nomial algebra core.

use thiserror::Error;

/// Main error type for nomial construction and algebra.
#[derive(Debug, Clone, Error)]
pub enum NomialError {
    /// Malformed nomial inputs (mismatched lengths, bad description fields).
    #[error("Construction error: {0}")]
    Construction(String),

    /// A positive coefficient was required outside a signomials-enabled scope.
    #[error("Sign error: {0}")]
    Sign(String),

    /// Physical units could not be reconciled.
    #[error("Unit error: cannot combine '{left}' with '{right}'")]
    Units {
        /// Display of the left-hand units.
        left: String,
        /// Display of the right-hand units.
        right: String,
    },

    /// A unit name was not recognized.
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    /// A required substitution left variables unresolved.
    #[error("Unresolved variables after substitution: {}", .0.join(", "))]
    UnresolvedVariables(Vec<String>),

    /// An exponent outside the closed set for this nomial kind.
    #[error("Invalid exponent: {0}")]
    InvalidExponent(String),

    /// Division by a nomial that is not a monomial (and not a scalar multiple).
    #[error("Cannot divide by non-monomial {0}")]
    NonMonomialDivisor(String),
}

/// Result type alias for nomial operations.
pub type Result<T> = std::result::Result<T, NomialError>;
