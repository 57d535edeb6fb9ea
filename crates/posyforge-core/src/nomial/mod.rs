//! Nomial representation and algebra.

pub mod data;
pub mod exp;
pub mod math;
pub mod substitution;
pub mod variables;

pub use data::{NomialData, Pmap};
pub use exp::Exp;
pub use math::{te_exp_minus1, Monomial, Nomial, Point, Posynomial, Signomial};
pub use substitution::{substitute, SubMap, SubVal};
pub use variables::{variable, vec_variable, VarSpec};
