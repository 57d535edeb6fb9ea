//! Exponent maps: the power-product part of a monomial term.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::varkey::VarKey;

/// An ordered map from variable key to real exponent.
///
/// Exact-zero exponents are never stored; the empty map is the constant
/// term. Exponents are finite by construction, so exact `Eq`/`Hash`/`Ord`
/// over the float bits are well defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exp(BTreeMap<VarKey, f64>);

impl Exp {
    /// The empty (constant-term) exponent map.
    pub fn empty() -> Exp {
        Exp(BTreeMap::new())
    }

    /// A single-variable map `var^power`.
    pub fn of(var: VarKey, power: f64) -> Exp {
        let mut e = Exp::empty();
        e.insert(var, power);
        e
    }

    /// Inserts an exponent, removing the entry if it lands on exactly zero.
    pub fn insert(&mut self, var: VarKey, power: f64) {
        if power == 0.0 {
            self.0.remove(&var);
        } else {
            self.0.insert(var, power);
        }
    }

    /// Adds `power` to the variable's exponent.
    pub fn add_to(&mut self, var: VarKey, power: f64) {
        let current = self.0.get(&var).copied().unwrap_or(0.0);
        self.insert(var, current + power);
    }

    /// The exponent of a variable, if present.
    pub fn get(&self, var: &VarKey) -> Option<f64> {
        self.0.get(var).copied()
    }

    /// Removes and returns a variable's exponent.
    pub fn remove(&mut self, var: &VarKey) -> Option<f64> {
        self.0.remove(var)
    }

    /// True if no variables appear (the constant term).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of variables in the map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(variable, exponent)` pairs in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, VarKey, f64> {
        self.0.iter()
    }

    /// Iterates over the variables in key order.
    pub fn vars(&self) -> btree_map::Keys<'_, VarKey, f64> {
        self.0.keys()
    }

    /// Pairwise sum of two maps (the exponent part of a term product).
    pub fn union_add(&self, other: &Exp) -> Exp {
        let mut out = self.clone();
        for (var, power) in other.iter() {
            out.add_to(var.clone(), *power);
        }
        out
    }

    /// Pairwise difference (the exponent part of dividing by a term).
    pub fn union_sub(&self, other: &Exp) -> Exp {
        let mut out = self.clone();
        for (var, power) in other.iter() {
            out.add_to(var.clone(), -power);
        }
        out
    }

    /// Scales every exponent (the exponent part of raising to a power).
    pub fn scale(&self, factor: f64) -> Exp {
        let mut out = Exp::empty();
        for (var, power) in self.iter() {
            out.insert(var.clone(), power * factor);
        }
        out
    }
}

impl Eq for Exp {}

impl Hash for Exp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for (var, power) in self.0.iter() {
            var.hash(state);
            power.to_bits().hash(state);
        }
    }
}

impl Ord for Exp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let mut a = self.0.iter();
        let mut b = other.0.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return std::cmp::Ordering::Equal,
                (None, Some(_)) => return std::cmp::Ordering::Less,
                (Some(_), None) => return std::cmp::Ordering::Greater,
                (Some((ka, va)), Some((kb, vb))) => {
                    let ord = ka.cmp(kb).then(va.total_cmp(vb));
                    if ord != std::cmp::Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl PartialOrd for Exp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FromIterator<(VarKey, f64)> for Exp {
    fn from_iter<T: IntoIterator<Item = (VarKey, f64)>>(iter: T) -> Self {
        let mut out = Exp::empty();
        for (var, power) in iter {
            out.add_to(var, power);
        }
        out
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (var, power) in self.iter() {
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if *power == 1.0 {
                write!(f, "{var}")?;
            } else {
                write!(f, "{var}**{power}")?;
            }
        }
        Ok(())
    }
}
