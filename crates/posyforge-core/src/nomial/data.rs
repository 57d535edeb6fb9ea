//! Shared term-list representation for all nomial kinds.

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::error::{NomialError, Result};
use crate::nomial::exp::Exp;
use crate::units::Units;
use crate::varkey::VarKey;

/// Per-term positions referencing a variable.
pub type VarLocs = HashMap<VarKey, SmallVec<[usize; 4]>>;

/// Sparse map from each output term to its pre-substitution contributors.
///
/// `pmap[i]` lists `(input term index, fraction)` pairs: the share of output
/// term `i`'s coefficient that came from each input term. Downstream
/// sensitivity propagation redistributes per-term dual values through it.
pub type Pmap = Vec<SmallVec<[(usize, f64); 2]>>;

/// A weighted sum of monomial terms: parallel exponent maps and
/// coefficients, plus one unit shared by every coefficient.
///
/// Invariants, established at construction and preserved by every
/// operation: `exps.len() == cs.len()`, no two exponent maps are equal
/// (colliding terms are merged by summing coefficients), exact-zero
/// coefficients are dropped, and terms are sorted canonically.
#[derive(Debug, Clone)]
pub struct NomialData {
    exps: Vec<Exp>,
    cs: Vec<f64>,
    units: Units,
    varlocs: VarLocs,
}

impl NomialData {
    /// Builds a nomial from parallel term lists, merging and sorting.
    pub fn new(exps: Vec<Exp>, cs: Vec<f64>, units: Units) -> Result<NomialData> {
        if exps.len() != cs.len() {
            return Err(NomialError::Construction(format!(
                "cs and exps must have the same length ({} vs {})",
                cs.len(),
                exps.len()
            )));
        }
        let (exps, cs, _) = simplify(exps, cs);
        Ok(NomialData::from_simplified(exps, cs, units))
    }

    /// Builds a nomial from already-simplified term lists.
    ///
    /// Callers must guarantee the simplification invariants hold.
    pub(crate) fn from_simplified(exps: Vec<Exp>, cs: Vec<f64>, units: Units) -> NomialData {
        let varlocs = locate_vars(&exps);
        NomialData {
            exps,
            cs,
            units,
            varlocs,
        }
    }

    /// A single-term nomial.
    pub fn monomial_term(exp: Exp, c: f64, units: Units) -> NomialData {
        NomialData::from_simplified(vec![exp], vec![c], units)
    }

    /// A constant (possibly zero-term) nomial.
    pub fn constant(c: f64, units: Units) -> NomialData {
        if c == 0.0 {
            NomialData::from_simplified(Vec::new(), Vec::new(), units)
        } else {
            NomialData::monomial_term(Exp::empty(), c, units)
        }
    }

    /// The exponent maps, one per term.
    pub fn exps(&self) -> &[Exp] {
        &self.exps
    }

    /// The coefficients, parallel to `exps`.
    pub fn cs(&self) -> &[f64] {
        &self.cs
    }

    /// The unit shared by every coefficient.
    pub fn units(&self) -> &Units {
        &self.units
    }

    /// Map from variable to the term positions referencing it.
    pub fn varlocs(&self) -> &VarLocs {
        &self.varlocs
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.cs.len()
    }

    /// True if the nomial has no terms (the zero nomial).
    pub fn is_empty(&self) -> bool {
        self.cs.is_empty()
    }

    /// True if any coefficient is zero or negative.
    pub fn any_nonpositive_cs(&self) -> bool {
        self.cs.iter().any(|c| *c <= 0.0)
    }

    /// The value of a variable-free nomial, `None` if variables remain.
    pub fn constant_value(&self) -> Option<f64> {
        match self.exps.len() {
            0 => Some(0.0),
            1 if self.exps[0].is_empty() => Some(self.cs[0]),
            _ => None,
        }
    }

    /// Converts coefficients to another unit of the same dimensions.
    pub fn convert_to(&self, units: Units) -> Result<NomialData> {
        let factor = self.units.conversion_factor_to(&units)?;
        let cs = self.cs.iter().map(|c| c * factor).collect();
        Ok(NomialData::from_simplified(self.exps.clone(), cs, units))
    }

    /// Term-wise derivative with respect to a variable.
    ///
    /// Terms not referencing the variable vanish; the result may be the
    /// zero nomial.
    pub fn diff(&self, wrt: &VarKey) -> NomialData {
        let mut exps = Vec::new();
        let mut cs = Vec::new();
        if let Some(locs) = self.varlocs.get(wrt) {
            for &i in locs {
                let e = self.exps[i].get(wrt).unwrap_or(0.0);
                let mut exp = self.exps[i].clone();
                exp.insert(wrt.clone(), e - 1.0);
                exps.push(exp);
                cs.push(self.cs[i] * e);
            }
        }
        let units = self.units.div(wrt.units());
        let (exps, cs, _) = simplify(exps, cs);
        NomialData::from_simplified(exps, cs, units)
    }

    /// Renders a single term the way [`fmt::Display`] would.
    pub fn term_display(&self, i: usize) -> String {
        let (exp, c) = (&self.exps[i], self.cs[i]);
        if exp.is_empty() {
            format!("{c}")
        } else if c == 1.0 {
            format!("{exp}")
        } else {
            format!("{c}*{exp}")
        }
    }

    /// Substitutions implied by `value`-carrying variable descriptions.
    pub fn values(&self) -> Vec<(VarKey, f64)> {
        let mut out: Vec<(VarKey, f64)> = self
            .varlocs
            .keys()
            .filter_map(|vk| vk.value().map(|v| (vk.clone(), v)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl PartialEq for NomialData {
    fn eq(&self, other: &Self) -> bool {
        self.exps == other.exps && self.cs == other.cs && self.units == other.units
    }
}

impl fmt::Display for NomialData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        let mut strs = Vec::with_capacity(self.len());
        for (exp, c) in self.exps.iter().zip(&self.cs) {
            if exp.is_empty() {
                strs.push(format!("{c}"));
            } else if *c == 1.0 {
                strs.push(format!("{exp}"));
            } else {
                strs.push(format!("{c}*{exp}"));
            }
        }
        write!(f, "{}", strs.join(" + "))
    }
}

/// Full term cross-product of two nomials: pairwise exponent sums, outer
/// product of coefficients, units multiplied. O(n*m) terms before the
/// closing simplification.
pub(crate) fn mul_data(a: &NomialData, b: &NomialData) -> NomialData {
    let mut exps = Vec::with_capacity(a.len() * b.len());
    let mut cs = Vec::with_capacity(a.len() * b.len());
    for (ea, ca) in a.exps().iter().zip(a.cs()) {
        for (eb, cb) in b.exps().iter().zip(b.cs()) {
            exps.push(ea.union_add(eb));
            cs.push(ca * cb);
        }
    }
    let units = a.units().mul(b.units());
    let (exps, cs, _) = simplify(exps, cs);
    NomialData::from_simplified(exps, cs, units)
}

/// Merges terms with identical exponent maps, drops exact-zero results,
/// and sorts canonically. Idempotent.
///
/// The returned [`Pmap`] records, per output term, the input indices and
/// coefficient fractions that produced it.
pub fn simplify(exps: Vec<Exp>, cs: Vec<f64>) -> (Vec<Exp>, Vec<f64>, Pmap) {
    simplify_with_origins(
        exps.into_iter()
            .zip(cs)
            .enumerate()
            .map(|(i, (exp, c))| (exp, c, i))
            .collect(),
    )
}

/// Simplification over terms tagged with their originating input index.
///
/// Used directly by the substitution engine, where one input term may have
/// fanned out into several working terms before merging.
pub fn simplify_with_origins(terms: Vec<(Exp, f64, usize)>) -> (Vec<Exp>, Vec<f64>, Pmap) {
    // exp -> (total coefficient, per-origin contributions)
    let mut index: HashMap<Exp, usize> = HashMap::with_capacity(terms.len());
    let mut merged: Vec<(Exp, f64, SmallVec<[(usize, f64); 2]>)> = Vec::new();
    for (exp, c, origin) in terms {
        match index.get(&exp) {
            Some(&slot) => {
                let entry = &mut merged[slot];
                entry.1 += c;
                match entry.2.iter_mut().find(|(o, _)| *o == origin) {
                    Some((_, contrib)) => *contrib += c,
                    None => entry.2.push((origin, c)),
                }
            }
            None => {
                index.insert(exp.clone(), merged.len());
                merged.push((exp, c, smallvec::smallvec![(origin, c)]));
            }
        }
    }
    merged.retain(|(_, c, _)| *c != 0.0);
    merged.sort_by(|a, b| a.0.cmp(&b.0));

    let mut exps = Vec::with_capacity(merged.len());
    let mut cs = Vec::with_capacity(merged.len());
    let mut pmap = Vec::with_capacity(merged.len());
    for (exp, c, contribs) in merged {
        let row = contribs
            .into_iter()
            .map(|(origin, contrib)| (origin, contrib / c))
            .collect();
        exps.push(exp);
        cs.push(c);
        pmap.push(row);
    }
    (exps, cs, pmap)
}

fn locate_vars(exps: &[Exp]) -> VarLocs {
    let mut varlocs: VarLocs = HashMap::new();
    for (i, exp) in exps.iter().enumerate() {
        for var in exp.vars() {
            varlocs.entry(var.clone()).or_default().push(i);
        }
    }
    varlocs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> VarKey {
        VarKey::new("x")
    }

    #[test]
    fn colliding_terms_merge() {
        let exps = vec![Exp::of(x(), 1.0), Exp::of(x(), 1.0), Exp::empty()];
        let cs = vec![2.0, 3.0, 1.0];
        let data = NomialData::new(exps, cs, Units::DIMENSIONLESS).unwrap();
        assert_eq!(data.len(), 2);
        let i = data
            .exps()
            .iter()
            .position(|e| !e.is_empty())
            .unwrap();
        assert_eq!(data.cs()[i], 5.0);
    }

    #[test]
    fn simplify_is_idempotent() {
        let exps = vec![Exp::of(x(), 1.0), Exp::of(x(), 1.0)];
        let cs = vec![1.0, 1.0];
        let (e1, c1, _) = simplify(exps, cs);
        let (e2, c2, _) = simplify(e1.clone(), c1.clone());
        assert_eq!(e1, e2);
        assert_eq!(c1, c2);
    }

    #[test]
    fn zero_coefficients_dropped() {
        let exps = vec![Exp::of(x(), 1.0), Exp::of(x(), 1.0)];
        let cs = vec![2.0, -2.0];
        let data = NomialData::new(exps, cs, Units::DIMENSIONLESS).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.constant_value(), Some(0.0));
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = NomialData::new(vec![Exp::empty()], vec![1.0, 2.0], Units::DIMENSIONLESS);
        assert!(matches!(err, Err(NomialError::Construction(_))));
    }

    #[test]
    fn pmap_records_merge_fractions() {
        let exps = vec![Exp::of(x(), 1.0), Exp::of(x(), 1.0)];
        let cs = vec![1.0, 3.0];
        let (_, cs_out, pmap) = simplify(exps, cs);
        assert_eq!(cs_out, vec![4.0]);
        let mut row: Vec<(usize, f64)> = pmap[0].to_vec();
        row.sort_by_key(|(i, _)| *i);
        assert_eq!(row, vec![(0, 0.25), (1, 0.75)]);
    }

    #[test]
    fn diff_drops_absent_terms() {
        let y = VarKey::new("y");
        let exps = vec![Exp::of(x(), 2.0), Exp::of(y.clone(), 1.0)];
        let data = NomialData::new(exps, vec![3.0, 1.0], Units::DIMENSIONLESS).unwrap();
        let d = data.diff(&x());
        assert_eq!(d.len(), 1);
        assert_eq!(d.cs()[0], 6.0);
        assert_eq!(d.exps()[0].get(&x()), Some(1.0));
        assert!(data.diff(&VarKey::new("z")).is_empty());
    }

    #[test]
    fn values_collects_fixed_variables() {
        use crate::varkey::DescrValue;
        use std::collections::BTreeMap;
        let mut descr = BTreeMap::new();
        descr.insert("value".to_string(), DescrValue::Float(2.5));
        let fixed = VarKey::with_descr("w", descr, Units::DIMENSIONLESS);
        let exps = vec![Exp::of(fixed.clone(), 1.0), Exp::of(x(), 1.0)];
        let data = NomialData::new(exps, vec![1.0, 1.0], Units::DIMENSIONLESS).unwrap();
        assert_eq!(data.values(), vec![(fixed, 2.5)]);
    }
}
