//! Posynomial inequality constraints.
//!
//! A `PosynomialInequality` asserts `posynomial <= monomial` (or the
//! mirror image). Canonicalization divides through by the monomial side,
//! normalizes to dimensionless, and absorbs any constant term, leaving
//! the GP-standard `posy <= 1` representation.

use std::fmt;

use tracing::debug;

use posyforge_core::{
    Monomial, NomialData, Pmap, Point, Posynomial, Signomial, SubMap, Units,
};

use crate::error::{ConstraintError, Result};
use crate::oper::Oper;
use crate::sens::{SensMap, VarSens};

/// `posy <= mono` in canonical `posy <= 1` form.
#[derive(Debug, Clone)]
pub struct PosynomialInequality {
    left: Signomial,
    oper: Oper,
    right: Signomial,
    p_lt: Posynomial,
    m_gt: Monomial,
    posylt1_rep: Posynomial,
    substitutions: SubMap,
    pmap: Option<Pmap>,
}

impl PosynomialInequality {
    /// Builds a posynomial inequality. `Equal` is rejected; use
    /// [`MonomialEquality`](crate::mono_eq::MonomialEquality) for that.
    pub fn new(
        left: impl Into<Signomial>,
        oper: Oper,
        right: impl Into<Signomial>,
    ) -> Result<PosynomialInequality> {
        let left = left.into();
        let right = right.into();
        let (p_lt_side, m_gt_side) = match oper {
            Oper::LessEq => (left.clone(), right.clone()),
            Oper::GreaterEq => (right.clone(), left.clone()),
            Oper::Equal => {
                return Err(ConstraintError::UnsupportedOperator {
                    oper: "==",
                    kind: "PosynomialInequality",
                })
            }
        };
        let p_lt = Posynomial::try_from(p_lt_side).map_err(ConstraintError::Nomial)?;
        let m_gt = Monomial::try_from(m_gt_side.clone())
            .map_err(|_| ConstraintError::NonMonomial(m_gt_side.to_string()))?;
        let ratio = &p_lt / &m_gt;
        let data = ratio.data().convert_to(Units::DIMENSIONLESS).map_err(|_| {
            ConstraintError::IncompatibleUnits {
                left: p_lt.data().units().to_string(),
                right: m_gt.units().to_string(),
            }
        })?;
        let posylt1_rep = absorb_constant(Posynomial::new(data)?)?;
        let substitutions = SubMap::from_values(posylt1_rep.data().values());
        Ok(PosynomialInequality {
            left,
            oper,
            right,
            p_lt,
            m_gt,
            posylt1_rep,
            substitutions,
            pmap: None,
        })
    }

    /// `left <= right`
    pub fn leq(
        left: impl Into<Signomial>,
        right: impl Into<Signomial>,
    ) -> Result<PosynomialInequality> {
        PosynomialInequality::new(left, Oper::LessEq, right)
    }

    /// `left >= right`
    pub fn geq(
        left: impl Into<Signomial>,
        right: impl Into<Signomial>,
    ) -> Result<PosynomialInequality> {
        PosynomialInequality::new(left, Oper::GreaterEq, right)
    }

    pub fn left(&self) -> &Signomial {
        &self.left
    }

    pub fn oper(&self) -> Oper {
        self.oper
    }

    pub fn right(&self) -> &Signomial {
        &self.right
    }

    /// The posynomial (lesser) side, as oriented.
    pub fn p_lt(&self) -> &Posynomial {
        &self.p_lt
    }

    /// The monomial (greater) side, as oriented.
    pub fn m_gt(&self) -> &Monomial {
        &self.m_gt
    }

    /// The canonical `posy <= 1` representation before substitution.
    pub fn posylt1_rep(&self) -> &Posynomial {
        &self.posylt1_rep
    }

    pub fn substitutions(&self) -> &SubMap {
        &self.substitutions
    }

    /// Replaces the substitutions applied at canonicalization time.
    pub fn set_substitutions(&mut self, subs: SubMap) {
        self.substitutions = subs;
    }

    /// Produces the canonical posynomials with substitutions applied,
    /// recording the term-contribution map for later sensitivity
    /// redistribution.
    ///
    /// Returns an empty list when substitution makes the constraint
    /// vacuous (the greater side went to zero, or every coefficient
    /// became NaN).
    pub fn as_posyslt1(&mut self) -> Result<Vec<Posynomial>> {
        self.pmap = None;
        if self.substitutions.is_empty() {
            return Ok(vec![self.posylt1_rep.clone()]);
        }
        let m_gt_sub = self.m_gt.as_signomial().sub_any_sign(&self.substitutions)?;
        if m_gt_sub.is_empty() {
            debug!(constraint = %self, "vacuous: greater side is zero after substitution");
            return Ok(Vec::new());
        }
        let (subbed, pmap) = self
            .posylt1_rep
            .as_signomial()
            .sub_with_map(&self.substitutions)?;
        if subbed.is_empty() || subbed.cs().iter().all(|c| c.is_nan()) {
            debug!(constraint = %self, "vacuous after substitution");
            return Ok(Vec::new());
        }
        let posy = Posynomial::new(subbed.data().clone())
            .map_err(|_| ConstraintError::BecameSignomial(self.to_string()))?;
        self.pmap = Some(pmap);
        Ok(vec![posy])
    }

    /// Maps solver duals back onto the constraint.
    ///
    /// `p_senss` holds one value per posynomial from [`as_posyslt1`]
    /// (so zero or one here); `m_sensss` the per-term duals. Term duals
    /// are redistributed through the substitution's contribution map
    /// before being keyed by the pre-substitution terms.
    ///
    /// [`as_posyslt1`]: PosynomialInequality::as_posyslt1
    pub fn sens_from_dual(
        &self,
        p_senss: &[f64],
        m_sensss: &[Vec<f64>],
    ) -> Result<(SensMap, VarSens)> {
        if p_senss.is_empty() {
            return Ok((SensMap::new(), VarSens::new()));
        }
        if p_senss.len() != 1 || m_sensss.len() != 1 {
            return Err(ConstraintError::SensitivityShape(format!(
                "expected duals for one posynomial, got {}",
                p_senss.len()
            )));
        }
        let presub = self.posylt1_rep.data();
        let m_senss: Vec<f64> = match &self.pmap {
            Some(pmap) => {
                if pmap.len() != m_sensss[0].len() {
                    return Err(ConstraintError::SensitivityShape(format!(
                        "{} term duals for {} substituted terms",
                        m_sensss[0].len(),
                        pmap.len()
                    )));
                }
                let mut out = vec![0.0; presub.len()];
                for (dual, sources) in m_sensss[0].iter().zip(pmap) {
                    for (idx, frac) in sources {
                        out[*idx] += frac * dual;
                    }
                }
                out
            }
            None => {
                if m_sensss[0].len() != presub.len() {
                    return Err(ConstraintError::SensitivityShape(format!(
                        "{} term duals for {} terms",
                        m_sensss[0].len(),
                        presub.len()
                    )));
                }
                m_sensss[0].clone()
            }
        };

        let mut constr_sens = SensMap::new();
        constr_sens.insert_scalar("overall", p_senss[0]);
        constr_sens.insert_scalar(self.m_gt.to_string(), p_senss[0]);
        for (i, ms) in m_senss.iter().enumerate() {
            constr_sens.insert_scalar(presub.term_display(i), *ms);
        }

        let mut var_senss = VarSens::new();
        for (vk, locs) in presub.varlocs() {
            if !self.substitutions.contains(vk) {
                continue;
            }
            let s: f64 = locs
                .iter()
                .map(|&i| presub.exps()[i].get(vk).unwrap_or(0.0) * m_senss[i])
                .sum();
            var_senss.insert(vk.clone(), s);
        }
        Ok((constr_sens, var_senss))
    }

    /// Already GP-compatible; linearization is the identity.
    pub fn as_gpconstr(&self, _x0: Option<&Point>) -> Result<PosynomialInequality> {
        Ok(self.clone())
    }

    /// Checks a primal solution against the canonical form.
    pub fn check_result(&self, primal: &Point, tol: f64) -> Result<()> {
        let value = self
            .posylt1_rep
            .as_signomial()
            .sub_any_sign(&self.substitutions)?
            .eval(primal)?;
        if value > 1.0 + tol {
            return Err(ConstraintError::Infeasible(format!(
                "{self} is violated: canonical value {value:.4} > 1"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PosynomialInequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.oper, self.right)
    }
}

/// Removes a constant term `c` by rescaling the rest to `p / (1 - c)`.
///
/// A constant at or above 1 alongside other (strictly positive) terms is
/// unsatisfiable.
fn absorb_constant(p: Posynomial) -> Result<Posynomial> {
    let data = p.data();
    let i = match data.exps().iter().position(|e| e.is_empty()) {
        Some(i) => i,
        None => return Ok(p),
    };
    let c = data.cs()[i];
    if data.len() == 1 {
        if c > 1.0 {
            return Err(ConstraintError::InfeasibleConstant(c));
        }
        return Ok(p);
    }
    if c >= 1.0 {
        return Err(ConstraintError::InfeasibleConstant(c));
    }
    let scale = 1.0 / (1.0 - c);
    let mut exps = Vec::with_capacity(data.len() - 1);
    let mut cs = Vec::with_capacity(data.len() - 1);
    for (j, (e, cj)) in data.exps().iter().zip(data.cs()).enumerate() {
        if j == i {
            continue;
        }
        exps.push(e.clone());
        cs.push(cj * scale);
    }
    let nd = NomialData::new(exps, cs, *data.units())?;
    Ok(Posynomial::new(nd)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use posyforge_core::{variable, VarSpec};

    #[test]
    fn orientation_follows_operator() {
        let x = variable("x");
        let c = PosynomialInequality::geq(1.0, x.as_signomial().try_scale(5.0).unwrap()).unwrap();
        assert_eq!(c.m_gt().to_string(), "1");
        assert_eq!(c.posylt1_rep().to_string(), "5*x");
    }

    #[test]
    fn equality_operator_rejected() {
        let x = variable("x");
        let err = PosynomialInequality::new(x.clone(), Oper::Equal, x).unwrap_err();
        assert!(matches!(err, ConstraintError::UnsupportedOperator { .. }));
    }

    #[test]
    fn non_monomial_greater_side_rejected() {
        let x = variable("x").as_signomial().clone();
        let y = variable("y").as_signomial().clone();
        let posy = x.try_add(&y).unwrap();
        let err = PosynomialInequality::leq(variable("z"), posy).unwrap_err();
        assert!(matches!(err, ConstraintError::NonMonomial(_)));
    }

    #[test]
    fn constant_absorption_rescales() {
        // 1 >= 5x + 0.5  canonicalizes like  1 >= 10x
        let x = variable("x");
        let lhs = x.as_signomial().try_scale(5.0).unwrap().add_const(0.5).unwrap();
        let absorbed = PosynomialInequality::geq(1.0, lhs).unwrap();
        let plain =
            PosynomialInequality::geq(1.0, x.as_signomial().try_scale(10.0).unwrap()).unwrap();
        assert_eq!(
            absorbed.posylt1_rep().data(),
            plain.posylt1_rep().data()
        );
    }

    #[test]
    fn oversized_constant_is_infeasible() {
        let x = variable("x");
        let lhs = x.as_signomial().try_scale(5.0).unwrap().add_const(1.1).unwrap();
        let err = PosynomialInequality::geq(1.0, lhs).unwrap_err();
        assert!(matches!(err, ConstraintError::InfeasibleConstant(_)));
    }

    #[test]
    fn united_sides_normalize() {
        let d = VarSpec::new("D").units("N").unwrap().monomial().unwrap();
        let f = VarSpec::new("F").units("N").unwrap().monomial().unwrap();
        let c = PosynomialInequality::leq(d, f).unwrap();
        assert!(c.posylt1_rep().data().units().is_dimensionless());
    }

    #[test]
    fn mismatched_units_rejected() {
        let d = VarSpec::new("D").units("N").unwrap().monomial().unwrap();
        let t = VarSpec::new("t").units("s").unwrap().monomial().unwrap();
        let err = PosynomialInequality::leq(d, t).unwrap_err();
        assert!(matches!(err, ConstraintError::IncompatibleUnits { .. }));
    }

    #[test]
    fn unsubstituted_as_posyslt1_is_the_rep() {
        let x = variable("x");
        let y = variable("y");
        let mut c = PosynomialInequality::leq(x, y).unwrap();
        let posys = c.as_posyslt1().unwrap();
        assert_eq!(posys.len(), 1);
        assert_eq!(&posys[0], c.posylt1_rep());
    }

    #[test]
    fn fixed_variable_becomes_substitution() {
        let x = variable("x");
        let k = VarSpec::new("k").value(2.0).monomial().unwrap();
        let mut c = PosynomialInequality::leq(&x * &k, 1.0).unwrap();
        assert_eq!(c.substitutions().len(), 1);
        let posys = c.as_posyslt1().unwrap();
        assert_eq!(posys[0].to_string(), "2*x");
    }

    #[test]
    fn zero_greater_side_is_vacuous() {
        let x = variable("x");
        let k = VarSpec::new("k").value(0.0).monomial().unwrap();
        let mut c = PosynomialInequality::leq(x, k).unwrap();
        assert!(c.as_posyslt1().unwrap().is_empty());
    }

    #[test]
    fn sens_from_dual_redistributes_through_pmap() {
        // x + k with k := x merges; each presub term gets half the dual
        let x = variable("x");
        let k = VarSpec::new("k").monomial().unwrap();
        let sum = x.as_signomial().try_add(k.as_signomial()).unwrap();
        let mut c = PosynomialInequality::leq(sum, 1.0).unwrap();
        let mut subs = SubMap::new();
        subs.insert(k.varkey().unwrap(), x.clone());
        c.set_substitutions(subs);
        let posys = c.as_posyslt1().unwrap();
        assert_eq!(posys.len(), 1);
        assert_eq!(posys[0].data().len(), 1);
        let (constr_sens, var_senss) = c.sens_from_dual(&[1.0], &[vec![0.8]]).unwrap();
        assert_eq!(constr_sens.get_scalar("overall"), Some(1.0));
        assert_eq!(constr_sens.get_scalar("x"), Some(0.4));
        assert_eq!(var_senss[&k.varkey().unwrap()], 0.4);
    }

    #[test]
    fn empty_duals_give_empty_sens() {
        let x = variable("x");
        let c = PosynomialInequality::leq(x, 1.0).unwrap();
        let (cs, vs) = c.sens_from_dual(&[], &[]).unwrap();
        assert!(cs.is_empty());
        assert!(vs.is_empty());
    }
}
