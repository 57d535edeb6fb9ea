//! Monomial equality constraints.
//!
//! `m1 == m2` is GP-representable as the reciprocal inequality pair
//! `m1/m2 <= 1` and `m2/m1 <= 1`, both of which are tight at any
//! feasible point. The pair shares one user-facing constraint, so its
//! sensitivities are reported as the difference of the two duals.

use std::fmt;

use posyforge_core::{Monomial, Point, Posynomial, Signomial, SubMap, Units};

use crate::error::{ConstraintError, Result};
use crate::oper::Oper;
use crate::sens::{SensMap, VarSens};

/// `left == right` for two monomials of the same dimensions.
#[derive(Debug, Clone)]
pub struct MonomialEquality {
    left: Monomial,
    right: Monomial,
    /// `[left/right, right/left]`, both dimensionless.
    reps: [Monomial; 2],
    substitutions: SubMap,
}

impl MonomialEquality {
    /// Builds the equality; both sides must be monomials with matching
    /// dimensions.
    pub fn eq(
        left: impl Into<Signomial>,
        right: impl Into<Signomial>,
    ) -> Result<MonomialEquality> {
        let left = left.into();
        let right = right.into();
        let left = Monomial::try_from(left.clone())
            .map_err(|_| ConstraintError::NonMonomial(left.to_string()))?;
        let right = Monomial::try_from(right.clone())
            .map_err(|_| ConstraintError::NonMonomial(right.to_string()))?;
        if !left.units().same_dimensions(right.units()) {
            return Err(ConstraintError::IncompatibleUnits {
                left: left.units().to_string(),
                right: right.units().to_string(),
            });
        }
        let reps = [
            normalize(&left / &right)?,
            normalize(&right / &left)?,
        ];
        let substitutions = SubMap::from_values(reps[0].as_signomial().data().values());
        Ok(MonomialEquality {
            left,
            right,
            reps,
            substitutions,
        })
    }

    pub fn left(&self) -> &Monomial {
        &self.left
    }

    pub fn oper(&self) -> Oper {
        Oper::Equal
    }

    pub fn right(&self) -> &Monomial {
        &self.right
    }

    pub fn substitutions(&self) -> &SubMap {
        &self.substitutions
    }

    pub fn set_substitutions(&mut self, subs: SubMap) {
        self.substitutions = subs;
    }

    /// True when the two sides are identical up to unit conversion.
    pub fn is_trivially_true(&self) -> bool {
        self.reps[0].exp().is_empty() && (self.reps[0].c() - 1.0).abs() < 1e-12
    }

    /// The reciprocal pair `[left/right, right/left]` with substitutions
    /// applied. An empty list means a substitution zeroed one side out.
    pub fn as_posyslt1(&mut self) -> Result<Vec<Posynomial>> {
        let mut out = Vec::with_capacity(2);
        for rep in &self.reps {
            if self.substitutions.is_empty() {
                out.push(rep.clone().into_posynomial());
                continue;
            }
            let subbed = rep.as_signomial().sub_any_sign(&self.substitutions)?;
            if subbed.is_empty() || subbed.cs().iter().all(|c| c.is_nan()) {
                return Ok(Vec::new());
            }
            out.push(
                Posynomial::new(subbed.data().clone())
                    .map_err(|_| ConstraintError::BecameSignomial(self.to_string()))?,
            );
        }
        Ok(out)
    }

    /// Maps the pair's duals back onto the single user constraint: each
    /// side's sensitivity is its own dual minus its reciprocal's.
    pub fn sens_from_dual(
        &self,
        p_senss: &[f64],
        m_sensss: &[Vec<f64>],
    ) -> Result<(SensMap, VarSens)> {
        if p_senss.is_empty() {
            return Ok((SensMap::new(), VarSens::new()));
        }
        if p_senss.len() != 2 || m_sensss.len() != 2 {
            return Err(ConstraintError::SensitivityShape(format!(
                "expected duals for the reciprocal pair, got {}",
                p_senss.len()
            )));
        }
        let mut constr_sens = SensMap::new();
        constr_sens.insert_scalar(self.left.to_string(), p_senss[0] - p_senss[1]);
        constr_sens.insert_scalar(self.right.to_string(), p_senss[1] - p_senss[0]);

        let mut var_senss = VarSens::new();
        for (rep, m_senss) in self.reps.iter().zip(m_sensss) {
            let presub = rep.as_signomial().data();
            if m_senss.len() != presub.len() {
                return Err(ConstraintError::SensitivityShape(format!(
                    "{} term duals for {} terms",
                    m_senss.len(),
                    presub.len()
                )));
            }
            for (vk, locs) in presub.varlocs() {
                if !self.substitutions.contains(vk) {
                    continue;
                }
                let s: f64 = locs
                    .iter()
                    .map(|&i| presub.exps()[i].get(vk).unwrap_or(0.0) * m_senss[i])
                    .sum();
                *var_senss.entry(vk.clone()).or_insert(0.0) += s;
            }
        }
        Ok((constr_sens, var_senss))
    }

    /// Already GP-compatible; linearization is the identity.
    pub fn as_gpconstr(&self, _x0: Option<&Point>) -> Result<MonomialEquality> {
        Ok(self.clone())
    }

    /// Checks a primal solution: both ratios must be 1 within `tol`.
    pub fn check_result(&self, primal: &Point, tol: f64) -> Result<()> {
        for rep in &self.reps {
            let value = rep
                .as_signomial()
                .sub_any_sign(&self.substitutions)?
                .eval(primal)?;
            if (value - 1.0).abs() > tol {
                return Err(ConstraintError::Infeasible(format!(
                    "{self} is violated: side ratio {value:.4} != 1"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MonomialEquality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.left, self.right)
    }
}

/// Folds the ratio's unit scale into its coefficient.
fn normalize(m: Monomial) -> Result<Monomial> {
    let data = m.as_signomial().data().convert_to(Units::DIMENSIONLESS)?;
    Ok(Monomial::new(
        data.exps()[0].clone(),
        data.cs()[0],
        Units::DIMENSIONLESS,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use posyforge_core::{variable, VarSpec};

    #[test]
    fn reciprocal_pair() {
        // x == y**2  gives  x/y**2 <= 1  and  y**2/x <= 1
        let x = variable("x");
        let y = variable("y");
        let mut c = MonomialEquality::eq(x, y.pow(2.0)).unwrap();
        let posys = c.as_posyslt1().unwrap();
        assert_eq!(posys.len(), 2);
        assert_eq!(posys[0].to_string(), "x*y**-2");
        assert_eq!(posys[1].to_string(), "x**-1*y**2");
    }

    #[test]
    fn posynomial_side_rejected() {
        let x = variable("x").as_signomial().clone();
        let y = variable("y").as_signomial().clone();
        let err = MonomialEquality::eq(x.try_add(&y).unwrap(), variable("z")).unwrap_err();
        assert!(matches!(err, ConstraintError::NonMonomial(_)));
    }

    #[test]
    fn mismatched_dimensions_rejected() {
        let d = VarSpec::new("D").units("N").unwrap().monomial().unwrap();
        let t = VarSpec::new("t").units("s").unwrap().monomial().unwrap();
        let err = MonomialEquality::eq(d, t).unwrap_err();
        assert!(matches!(err, ConstraintError::IncompatibleUnits { .. }));
    }

    #[test]
    fn unit_scale_folds_into_coefficient() {
        // 1 km == 1000 m is trivially true
        let a = VarSpec::new("a").units("km").unwrap().monomial().unwrap();
        let b = VarSpec::new("b").units("m").unwrap().monomial().unwrap();
        let c = MonomialEquality::eq(a, b.as_signomial().try_scale(1000.0).unwrap()).unwrap();
        assert!(!c.is_trivially_true());
        assert_eq!(c.reps[0].c(), 1.0);
    }

    #[test]
    fn self_equality_is_trivial() {
        let x = variable("x");
        let c = MonomialEquality::eq(x.clone(), x).unwrap();
        assert!(c.is_trivially_true());
    }

    #[test]
    fn sens_is_dual_difference() {
        let x = variable("x");
        let y = variable("y");
        let c = MonomialEquality::eq(x, y).unwrap();
        let (constr_sens, _) = c
            .sens_from_dual(&[0.75, 0.25], &[vec![0.75], vec![0.25]])
            .unwrap();
        assert_eq!(constr_sens.get_scalar("x"), Some(0.5));
        assert_eq!(constr_sens.get_scalar("y"), Some(-0.5));
    }
}
