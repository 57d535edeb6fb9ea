//! Error types for constraint construction and canonicalization.

use thiserror::Error;

use posyforge_core::NomialError;

/// Anything that can go wrong turning user constraints into `posy <= 1`
/// form or mapping solver duals back onto them.
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// An underlying nomial-algebra failure (units, signs, construction).
    #[error(transparent)]
    Nomial(#[from] NomialError),

    /// The operator is not valid for the constraint kind it was given to.
    #[error("operator '{oper}' is not supported by {kind}")]
    UnsupportedOperator {
        oper: &'static str,
        kind: &'static str,
    },

    /// A side that must be a monomial was not one.
    #[error("'{0}' is not a monomial")]
    NonMonomial(String),

    /// The two sides have incompatible dimensions.
    #[error("incompatible units: '{left}' vs '{right}'")]
    IncompatibleUnits { left: String, right: String },

    /// After canonicalization the constant term exceeds 1, so no variable
    /// assignment can satisfy the constraint.
    #[error("infeasible constraint: constant term {0} exceeds 1")]
    InfeasibleConstant(f64),

    /// A signomial constraint was built outside a `SignomialsEnabled` scope.
    #[error("signomial constraints require an active SignomialsEnabled scope")]
    SignomialsDisabled,

    /// A signomial constraint cannot be expressed as a single GP constraint
    /// and must be linearized around a point instead.
    #[error("'{0}' is not GP-compatible; linearize it around a point")]
    NotGpCompatible(String),

    /// Substitution turned a posynomial side into a signomial.
    #[error("'{0}' became a signomial after substitution")]
    BecameSignomial(String),

    /// The constraint is unsatisfiable regardless of variable values.
    #[error("infeasible constraint: {0}")]
    Infeasible(String),

    /// Dual arrays passed back from a solver do not line up with the
    /// posynomials this constraint produced.
    #[error("sensitivity shape mismatch: {0}")]
    SensitivityShape(String),
}

pub type Result<T> = std::result::Result<T, ConstraintError>;
