//! Sensitivity containers.
//!
//! Solvers hand back one dual value per canonical posynomial (`p_senss`)
//! and one per monomial term within each (`m_sensss`). Constraints turn
//! those into two views: a string-keyed map mirroring the constraint tree
//! ([`SensMap`]) and a per-variable accumulation ([`VarSens`]) for the
//! substituted (fixed) variables.

use std::collections::{hash_map, HashMap};

use posyforge_core::VarKey;

/// A sensitivity entry: either a number or a nested constraint-set map.
#[derive(Debug, Clone, PartialEq)]
pub enum Sens {
    Scalar(f64),
    Nested(SensMap),
}

/// String-keyed sensitivities, nested to mirror the constraint tree.
///
/// Keys are display strings of constraints and monomials; two distinct
/// constraints that render identically will collide, last write winning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensMap(HashMap<String, Sens>);

impl SensMap {
    pub fn new() -> SensMap {
        SensMap(HashMap::new())
    }

    pub fn insert_scalar(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), Sens::Scalar(value));
    }

    pub fn insert_nested(&mut self, key: impl Into<String>, value: SensMap) {
        self.0.insert(key.into(), Sens::Nested(value));
    }

    pub fn get(&self, key: &str) -> Option<&Sens> {
        self.0.get(key)
    }

    /// The scalar under `key`, if present and scalar.
    pub fn get_scalar(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Sens::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Sens> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Sens> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulated sensitivity per substituted variable.
pub type VarSens = HashMap<VarKey, f64>;

/// Adds `from` into `into`, summing on shared keys.
pub fn merge_var_senss(into: &mut VarSens, from: &VarSens) {
    for (vk, s) in from {
        *into.entry(vk.clone()).or_insert(0.0) += s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_shared_keys() {
        let x = VarKey::new("x");
        let y = VarKey::new("y");
        let mut a: VarSens = [(x.clone(), 1.0)].into_iter().collect();
        let b: VarSens = [(x.clone(), 2.0), (y.clone(), 3.0)].into_iter().collect();
        merge_var_senss(&mut a, &b);
        assert_eq!(a[&x], 3.0);
        assert_eq!(a[&y], 3.0);
    }

    #[test]
    fn nested_lookup() {
        let mut inner = SensMap::new();
        inner.insert_scalar("overall", 0.5);
        let mut outer = SensMap::new();
        outer.insert_nested("child", inner);
        match outer.get("child") {
            Some(Sens::Nested(m)) => assert_eq!(m.get_scalar("overall"), Some(0.5)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
