//! Constraint sets with an objective.
//!
//! A [`CostedConstraintSet`] is a [`ConstraintSet`] carrying the cost
//! posynomial to minimize. Fixed values attached to the cost's variables
//! seed the set's substitutions, so a model's constants apply even when
//! no constraint mentions them.

use std::fmt;
use std::ops::{Deref, DerefMut};

use posyforge_core::{Posynomial, SubMap};

use crate::set::{ConstraintNode, ConstraintSet};

/// A constraint tree plus the cost it is solved against.
#[derive(Debug, Clone)]
pub struct CostedConstraintSet {
    cost: Posynomial,
    constraints: ConstraintSet,
}

impl CostedConstraintSet {
    pub fn new(cost: Posynomial, children: Vec<ConstraintNode>) -> CostedConstraintSet {
        CostedConstraintSet::with_substitutions(cost, children, SubMap::new())
    }

    /// Builds the set from the children's substitutions, overridden by
    /// the cost's fixed-variable values and then by `subs`.
    pub fn with_substitutions(
        cost: Posynomial,
        children: Vec<ConstraintNode>,
        subs: SubMap,
    ) -> CostedConstraintSet {
        let mut merged = SubMap::from_values(cost.data().values());
        merged.merge_overriding(&subs);
        CostedConstraintSet {
            cost,
            constraints: ConstraintSet::with_substitutions(children, merged),
        }
    }

    pub fn cost(&self) -> &Posynomial {
        &self.cost
    }
}

impl Deref for CostedConstraintSet {
    type Target = ConstraintSet;

    fn deref(&self) -> &ConstraintSet {
        &self.constraints
    }
}

impl DerefMut for CostedConstraintSet {
    fn deref_mut(&mut self) -> &mut ConstraintSet {
        &mut self.constraints
    }
}

impl fmt::Display for CostedConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "minimize {} s.t. {}", self.cost, self.constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posy_ineq::PosynomialInequality;
    use posyforge_core::{variable, VarSpec};

    #[test]
    fn cost_values_seed_substitutions() {
        // k carries a fixed value only on the cost's key; the constraint
        // uses a bare key with the same identity.
        let x = variable("x");
        let k_fixed = VarSpec::new("k").value(2.0).monomial().unwrap();
        let k_free = variable("k");
        let constr = PosynomialInequality::leq(&x * &k_free, 1.0).unwrap();
        let mut set =
            CostedConstraintSet::new(k_fixed.into_posynomial(), vec![constr.into()]);
        let posys = set.as_posyslt1().unwrap();
        assert_eq!(posys[0].to_string(), "2*x");
    }

    #[test]
    fn explicit_substitutions_override_cost_values() {
        let x = variable("x");
        let k = VarSpec::new("k").value(2.0).monomial().unwrap();
        let constr = PosynomialInequality::leq(&x * &k, 1.0).unwrap();
        let mut subs = SubMap::new();
        subs.insert(k.varkey().unwrap(), 3.0);
        let mut set = CostedConstraintSet::with_substitutions(
            k.clone().into_posynomial(),
            vec![constr.into()],
            subs,
        );
        let posys = set.as_posyslt1().unwrap();
        assert_eq!(posys[0].to_string(), "3*x");
    }

    #[test]
    fn displays_cost_and_constraints() {
        let x = variable("x");
        let constr = PosynomialInequality::leq(x.clone(), 1.0).unwrap();
        let set = CostedConstraintSet::new(x.into_posynomial(), vec![constr.into()]);
        assert_eq!(set.to_string(), "minimize x s.t. [x <= 1]");
    }
}
