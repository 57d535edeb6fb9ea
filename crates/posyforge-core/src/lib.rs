//! Posyforge Core - Nomial algebra for geometric/signomial programming
//!
//! This crate provides the symbolic layer underneath a GP/SP solver:
//! - Variable identity keys ([`varkey::VarKey`])
//! - Physical units as dimension vectors ([`units::Units`])
//! - The Signomial / Posynomial / Monomial hierarchy ([`nomial::math`])
//! - Variable substitution with sensitivity bookkeeping
//!   ([`nomial::substitution`])
//! - The scoped gate for non-log-convex construction ([`sigscope`])

pub mod error;
pub mod nomial;
pub mod sigscope;
pub mod units;
pub mod varkey;

pub use error::{NomialError, Result};
pub use nomial::{
    substitute, te_exp_minus1, variable, vec_variable, Exp, Monomial, Nomial, NomialData, Pmap,
    Point, Posynomial, Signomial, SubMap, SubVal, VarSpec,
};
pub use sigscope::SignomialsEnabled;
pub use units::Units;
pub use varkey::{DescrValue, VarKey};
