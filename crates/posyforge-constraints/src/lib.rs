//! Posyforge Constraints - GP/SP constraint canonicalization
//!
//! Constraints relate nomial expressions and canonicalize to the
//! GP-standard `posy <= 1` form:
//! - [`PosynomialInequality`]: `posy <= mono`, one posynomial
//! - [`MonomialEquality`]: `mono == mono`, a reciprocal pair
//! - [`SignomialInequality`]: `sig <= sig`, linearized per iteration
//!
//! [`ConstraintSet`] aggregates them into a tree that canonicalizes to a
//! flat posynomial list and routes solver duals back to the constraint
//! (and, for fixed variables, the variable) each one came from.

pub mod costed;
pub mod error;
pub mod mono_eq;
pub mod oper;
pub mod posy_ineq;
pub mod sens;
pub mod set;
pub mod sig_ineq;
pub mod solution;

pub use costed::CostedConstraintSet;
pub use error::{ConstraintError, Result};
pub use mono_eq::MonomialEquality;
pub use oper::Oper;
pub use posy_ineq::PosynomialInequality;
pub use sens::{merge_var_senss, Sens, SensMap, VarSens};
pub use set::{Constraint, ConstraintNode, ConstraintSet};
pub use sig_ineq::SignomialInequality;
pub use solution::SolverResult;
