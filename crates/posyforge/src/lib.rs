//! Posyforge - symbolic algebra for geometric and signomial programming
//!
//! Build variables, combine them into monomials, posynomials and
//! signomials, relate them with constraints, and canonicalize the lot
//! to the `posy <= 1` form GP solvers consume.
//!
//! # Example
//!
//! ```rust
//! use posyforge::prelude::*;
//!
//! let x = variable("x");
//! let y = variable("y");
//! let mut c = PosynomialInequality::leq(&x * &y, 1.0).unwrap();
//! let posys = c.as_posyslt1().unwrap();
//! assert_eq!(posys[0].to_string(), "x*y");
//! ```

// Nomial algebra
pub use posyforge_core::{
    substitute, te_exp_minus1, variable, vec_variable, DescrValue, Exp, Monomial, Nomial,
    NomialData, NomialError, Pmap, Point, Posynomial, SignomialsEnabled, Signomial, SubMap,
    SubVal, Units, VarKey, VarSpec,
};

// Constraints and sensitivity mapping
pub use posyforge_constraints::{
    Constraint, ConstraintError, ConstraintNode, ConstraintSet, CostedConstraintSet,
    MonomialEquality, Oper, PosynomialInequality, Sens, SensMap, SignomialInequality,
    SolverResult, VarSens,
};

pub mod prelude {
    pub use super::{variable, vec_variable, VarSpec};
    pub use super::{Monomial, Posynomial, Signomial, SignomialsEnabled};
    pub use super::{
        Constraint, ConstraintNode, ConstraintSet, CostedConstraintSet, MonomialEquality,
        PosynomialInequality, SignomialInequality,
    };
    pub use super::{Point, SubMap};
}
