//! Variable substitution with term-contribution tracking.
//!
//! Substituting a number eliminates the variable's exponent and folds
//! `value^exponent` into the coefficient; substituting an expression
//! re-expands the containing term by multiplication. Either way the term
//! list is re-simplified afterwards, and the [`Pmap`] records which
//! pre-substitution term(s), at what coefficient fraction, produced each
//! output term — sensitivity propagation redistributes dual values
//! through that map.

use std::collections::btree_map;
use std::collections::BTreeMap;

use smallvec::smallvec;
use tracing::trace;

use crate::error::{NomialError, Result};
use crate::nomial::data::{self, NomialData, Pmap};
use crate::nomial::math::{Monomial, Point, Signomial};
use crate::units::Units;
use crate::varkey::VarKey;

/// A value a variable can be replaced with.
#[derive(Debug, Clone)]
pub enum SubVal {
    /// A magnitude in the variable's own units.
    Value(f64),
    /// A monomial expression; its units must match the variable's.
    Monomial(Monomial),
    /// A general signomial; occurrence exponents must be non-negative
    /// integers, and its units must match the variable's.
    Signomial(Signomial),
}

/// An ordered mapping from variable keys to substitution values.
#[derive(Debug, Clone, Default)]
pub struct SubMap(BTreeMap<VarKey, SubVal>);

impl SubMap {
    /// An empty substitution map.
    pub fn new() -> SubMap {
        SubMap(BTreeMap::new())
    }

    /// Builds from an evaluation point.
    pub fn from_point(x0: &Point) -> SubMap {
        let mut out = SubMap::new();
        for (vk, v) in x0 {
            out.insert(vk.clone(), SubVal::Value(*v));
        }
        out
    }

    /// Builds from `(key, value)` pairs.
    pub fn from_values(pairs: impl IntoIterator<Item = (VarKey, f64)>) -> SubMap {
        let mut out = SubMap::new();
        for (vk, v) in pairs {
            out.insert(vk, SubVal::Value(v));
        }
        out
    }

    /// Inserts a substitution, replacing any previous one for the key.
    pub fn insert(&mut self, key: VarKey, val: impl Into<SubVal>) {
        self.0.insert(key, val.into());
    }

    /// The substitution for a key, if any.
    pub fn get(&self, key: &VarKey) -> Option<&SubVal> {
        self.0.get(key)
    }

    /// True if the key has a substitution.
    pub fn contains(&self, key: &VarKey) -> bool {
        self.0.contains_key(key)
    }

    /// True if no substitutions are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of substitutions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, VarKey, SubVal> {
        self.0.iter()
    }

    /// Overlays `other` onto `self`; entries of `other` win.
    ///
    /// This is the parent-overrides-child merge used when a constraint
    /// set absorbs its children's substitutions.
    pub fn merge_overriding(&mut self, other: &SubMap) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

/// Applies a substitution map to a term list.
///
/// Keys absent from the nomial are no-ops. Returns the substituted data
/// and the pre-substitution contribution map; when nothing applies, the
/// data is returned unchanged under an identity map.
pub fn substitute(nd: &NomialData, subs: &SubMap) -> Result<(NomialData, Pmap)> {
    let relevant: Vec<(&VarKey, &SubVal)> = subs
        .iter()
        .filter(|(vk, _)| nd.varlocs().contains_key(vk))
        .collect();
    if relevant.is_empty() {
        let identity = (0..nd.len()).map(|i| smallvec![(i, 1.0)]).collect();
        return Ok((nd.clone(), identity));
    }
    trace!(n_subs = relevant.len(), n_terms = nd.len(), "substituting");

    let mut working: Vec<(crate::nomial::exp::Exp, f64, usize)> = nd
        .exps()
        .iter()
        .zip(nd.cs())
        .enumerate()
        .map(|(i, (exp, c))| (exp.clone(), *c, i))
        .collect();

    for (vk, sval) in relevant {
        let mut next = Vec::with_capacity(working.len());
        for (mut exp, c, origin) in working {
            let e = match exp.remove(vk) {
                Some(e) => e,
                None => {
                    next.push((exp, c, origin));
                    continue;
                }
            };
            match sval {
                SubVal::Value(v) => {
                    next.push((exp, c * v.powf(e), origin));
                }
                SubVal::Monomial(m) => {
                    let factor = m.units().conversion_factor_to(vk.units())?;
                    let c_in_var_units = m.c() * factor;
                    next.push((
                        exp.union_add(&m.exp().scale(e)),
                        c * c_in_var_units.powf(e),
                        origin,
                    ));
                }
                SubVal::Signomial(s) => {
                    if e < 0.0 || e.fract() != 0.0 {
                        return Err(NomialError::InvalidExponent(format!(
                            "cannot substitute a signomial for {vk}**{e}"
                        )));
                    }
                    let factor = s.units().conversion_factor_to(vk.units())?;
                    let expansion = data_pow(s.data(), e as u32);
                    let scale = factor.powf(e);
                    for (se, sc) in expansion.exps().iter().zip(expansion.cs()) {
                        next.push((exp.union_add(se), c * sc * scale, origin));
                    }
                }
            }
        }
        working = next;
    }

    let units = *nd.units();
    let (exps, cs, pmap) = data::simplify_with_origins(working);
    Ok((NomialData::from_simplified(exps, cs, units), pmap))
}

fn data_pow(d: &NomialData, n: u32) -> NomialData {
    let mut out = NomialData::constant(1.0, Units::DIMENSIONLESS);
    for _ in 0..n {
        out = data::mul_data(&out, d);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nomial::variables::variable;

    #[test]
    fn numeric_substitution_eliminates() {
        let x = variable("x");
        let y = variable("y");
        // 2*x**2*y
        let f = (&x.pow(2.0) * &y)
            .into_signomial()
            .try_scale(2.0)
            .unwrap();
        let mut subs = SubMap::new();
        subs.insert(x.varkey().unwrap(), 3.0);
        let out = f.sub(&subs).unwrap();
        assert_eq!(out.to_string(), "18*y");
    }

    #[test]
    fn absent_key_is_noop() {
        let x = variable("x").into_signomial();
        let mut subs = SubMap::new();
        subs.insert(VarKey::new("nonexistent"), 1.0);
        let out = x.sub(&subs).unwrap();
        assert_eq!(out, x);
    }

    #[test]
    fn monomial_substitution_rewires_exponents() {
        let x = variable("x");
        let y = variable("y");
        // x**2 with x := 2*y**3  ->  4*y**6
        let f = x.pow(2.0).into_signomial();
        let two_y3 = Monomial::new(
            y.exp().scale(3.0),
            2.0,
            Units::DIMENSIONLESS,
        )
        .unwrap();
        let mut subs = SubMap::new();
        subs.insert(x.varkey().unwrap(), two_y3);
        let out = f.sub(&subs).unwrap();
        assert_eq!(out.to_string(), "4*y**6");
    }

    #[test]
    fn signomial_substitution_expands_terms() {
        let x = variable("x");
        let y = variable("y");
        // x**2 with x := y + 1  ->  y**2 + 2y + 1
        let f = x.pow(2.0).into_signomial();
        let y_plus_1 = y.as_signomial().add_const(1.0).unwrap();
        let mut subs = SubMap::new();
        subs.insert(x.varkey().unwrap(), y_plus_1);
        let out = f.sub(&subs).unwrap();
        assert_eq!(out.cs().len(), 3);
        let total: f64 = out.cs().iter().sum();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn signomial_substitution_fractional_exponent_rejected() {
        let x = variable("x");
        let y = variable("y");
        let f = x.pow(0.5).into_signomial();
        let mut subs = SubMap::new();
        subs.insert(
            x.varkey().unwrap(),
            y.as_signomial().add_const(1.0).unwrap(),
        );
        assert!(matches!(
            f.sub(&subs),
            Err(NomialError::InvalidExponent(_))
        ));
    }

    #[test]
    fn pmap_tracks_substitution_merges() {
        let x = variable("x");
        let y = variable("y");
        // x + y with x := y merges into a single 2*y term, half from each
        let f = x.as_signomial().try_add(y.as_signomial()).unwrap();
        let mut subs = SubMap::new();
        subs.insert(x.varkey().unwrap(), Monomial::from_varkey(y.varkey().unwrap()));
        let (out, pmap) = f.sub_with_map(&subs).unwrap();
        assert_eq!(out.to_string(), "2*y");
        let mut row: Vec<(usize, f64)> = pmap[0].to_vec();
        row.sort_by_key(|(i, _)| *i);
        assert_eq!(row, vec![(0, 0.5), (1, 0.5)]);
    }

    #[test]
    fn identity_pmap_without_matches() {
        let x = variable("x").into_signomial();
        let (out, pmap) = x.sub_with_map(&SubMap::new()).unwrap();
        assert_eq!(out, x);
        assert_eq!(pmap.len(), 1);
        assert_eq!(pmap[0].to_vec(), vec![(0, 1.0)]);
    }

    #[test]
    fn parent_override_merge() {
        let x = VarKey::new("x");
        let mut child = SubMap::new();
        child.insert(x.clone(), 1.0);
        let mut parent = SubMap::new();
        parent.insert(x.clone(), 2.0);
        child.merge_overriding(&parent);
        match child.get(&x) {
            Some(SubVal::Value(v)) => assert_eq!(*v, 2.0),
            other => panic!("unexpected {other:?}"),
        }
    }
}
