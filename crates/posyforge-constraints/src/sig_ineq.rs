//! Signomial inequality constraints.
//!
//! A `SignomialInequality` asserts `sigy <= 0` where `sigy = p_lt - p_gt`
//! has terms of mixed sign. It is not GP-representable in general: the
//! solver must iterate, linearizing the negative part around a point with
//! [`SignomialInequality::as_gpconstr`]. When substitution happens to
//! leave a single negative term, the constraint collapses to an ordinary
//! [`PosynomialInequality`] directly.

use std::fmt;

use tracing::debug;

use posyforge_core::{
    Monomial, Point, Posynomial, Signomial, SignomialsEnabled, SubMap,
};

use crate::error::{ConstraintError, Result};
use crate::oper::Oper;
use crate::posy_ineq::PosynomialInequality;
use crate::sens::{SensMap, VarSens};

/// `left <= right` where the difference is a general signomial.
///
/// Construction requires an active [`SignomialsEnabled`] scope.
#[derive(Debug, Clone)]
pub struct SignomialInequality {
    left: Signomial,
    oper: Oper,
    right: Signomial,
    /// `left - right` (as oriented), asserted `<= 0`.
    sigy_lt0_rep: Signomial,
    substitutions: SubMap,
    /// The GP form produced by the last [`as_posyslt1`] call, kept for
    /// dual mapping.
    ///
    /// [`as_posyslt1`]: SignomialInequality::as_posyslt1
    gp_form: Option<PosynomialInequality>,
}

impl SignomialInequality {
    pub fn new(
        left: impl Into<Signomial>,
        oper: Oper,
        right: impl Into<Signomial>,
    ) -> Result<SignomialInequality> {
        if !SignomialsEnabled::active() {
            return Err(ConstraintError::SignomialsDisabled);
        }
        let left = left.into();
        let right = right.into();
        let (plt, pgt) = match oper {
            Oper::LessEq => (&left, &right),
            Oper::GreaterEq => (&right, &left),
            Oper::Equal => {
                return Err(ConstraintError::UnsupportedOperator {
                    oper: "==",
                    kind: "SignomialInequality",
                })
            }
        };
        let sigy_lt0_rep = plt.try_sub(pgt)?;
        let substitutions = SubMap::from_values(sigy_lt0_rep.data().values());
        Ok(SignomialInequality {
            left,
            oper,
            right,
            sigy_lt0_rep,
            substitutions,
            gp_form: None,
        })
    }

    /// `left <= right`
    pub fn leq(
        left: impl Into<Signomial>,
        right: impl Into<Signomial>,
    ) -> Result<SignomialInequality> {
        SignomialInequality::new(left, Oper::LessEq, right)
    }

    /// `left >= right`
    pub fn geq(
        left: impl Into<Signomial>,
        right: impl Into<Signomial>,
    ) -> Result<SignomialInequality> {
        SignomialInequality::new(left, Oper::GreaterEq, right)
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

    /// The oriented difference asserted `<= 0`.
    pub fn sigy_lt0_rep(&self) -> &Signomial {
        &self.sigy_lt0_rep
    }

    pub fn substitutions(&self) -> &SubMap {
        &self.substitutions
    }

    pub fn set_substitutions(&mut self, subs: SubMap) {
        self.substitutions = subs;
    }

    /// Attempts a direct GP form without linearization.
    ///
    /// Succeeds only when, after substitution, the negative part is a
    /// single monomial: `posy - mono <= 0` is just `posy <= mono`. A
    /// multi-term negative part is `NotGpCompatible`; a missing negative
    /// part with positive terms remaining is infeasible outright.
    pub fn as_posyslt1(&mut self) -> Result<Vec<Posynomial>> {
        self.gp_form = None;
        let subbed = self.sigy_lt0_rep.sub_any_sign(&self.substitutions)?;
        let (posy, negy) = match subbed.posy_negy()? {
            (None, _) => {
                debug!(constraint = %self, "trivially satisfied after substitution");
                return Ok(Vec::new());
            }
            (Some(_), None) => {
                return Err(ConstraintError::Infeasible(format!(
                    "{self} has no negative part after substitution"
                )))
            }
            (Some(posy), Some(negy)) => (posy, negy),
        };
        if negy.data().len() != 1 {
            return Err(ConstraintError::NotGpCompatible(self.to_string()));
        }
        let negy_mono = Monomial::try_from(negy.into_signomial())
            .map_err(|_| ConstraintError::NotGpCompatible(self.to_string()))?;
        let mut gp = PosynomialInequality::leq(posy, negy_mono)?;
        gp.set_substitutions(SubMap::new());
        let posys = gp.as_posyslt1()?;
        self.gp_form = Some(gp);
        Ok(posys)
    }

    /// Maps duals back through the GP form recorded by the last
    /// [`as_posyslt1`](SignomialInequality::as_posyslt1) call.
    pub fn sens_from_dual(
        &self,
        p_senss: &[f64],
        m_sensss: &[Vec<f64>],
    ) -> Result<(SensMap, VarSens)> {
        let gp = self.gp_form.as_ref().ok_or_else(|| {
            ConstraintError::SensitivityShape(
                "as_posyslt1 must succeed before sens_from_dual".to_string(),
            )
        })?;
        gp.sens_from_dual(p_senss, m_sensss)
    }

    /// Linearizes around `x0` into a GP-compatible constraint:
    /// `posy <= mono_lower_bound(negy, x0)`.
    ///
    /// Variables missing from `x0` default to their `sp_init` guess, or
    /// 1 without one; fixed-value substitutions override everything.
    pub fn as_gpconstr(&self, x0: Option<&Point>) -> Result<PosynomialInequality> {
        let (posy, negy) = self.sigy_lt0_rep.posy_negy()?;
        let (posy, negy) = match (posy, negy) {
            (Some(p), Some(n)) => (p, n),
            _ => return Err(ConstraintError::NotGpCompatible(self.to_string())),
        };

        let mut point: Point = x0.cloned().unwrap_or_default();
        for vk in negy.as_signomial().varkeys() {
            let guess = vk.sp_init().unwrap_or(1.0);
            point.entry(vk).or_insert(guess);
        }
        for (vk, sval) in self.substitutions.iter() {
            if let posyforge_core::SubVal::Value(v) = sval {
                point.insert(vk.clone(), *v);
            }
        }

        let tangent = negy.mono_lower_bound(&point)?;
        let mut gp = PosynomialInequality::leq(posy, tangent)?;
        gp.set_substitutions(self.substitutions.clone());
        Ok(gp)
    }

    /// Re-keys the linearized constraint's sensitivities for this
    /// constraint: the approximated negative part takes the overall
    /// sensitivity, and the full per-term breakdown is nested under
    /// `"posyapprox"`.
    pub fn sens_from_gpconstr(
        &self,
        posyapprox: &PosynomialInequality,
        pa_sens: &SensMap,
    ) -> Result<SensMap> {
        let (_, negy) = self.sigy_lt0_rep.posy_negy()?;
        let negy = negy.ok_or_else(|| ConstraintError::NotGpCompatible(self.to_string()))?;

        let overall = pa_sens.get_scalar("overall").ok_or_else(|| {
            ConstraintError::SensitivityShape("approximation lacks an overall entry".to_string())
        })?;
        let mut constr_sens = SensMap::new();
        constr_sens.insert_scalar("overall", overall);
        constr_sens.insert_scalar(negy.to_string(), overall);

        let mut nested = pa_sens.clone();
        nested.remove(&posyapprox.m_gt().to_string());
        if let Some(s) = nested.remove("overall") {
            if let crate::sens::Sens::Scalar(v) = s {
                nested.insert_scalar(posyapprox.to_string(), v);
            }
        }
        constr_sens.insert_nested("posyapprox", nested);
        Ok(constr_sens)
    }

    /// Checks a primal solution: the oriented difference must be at most
    /// `tol` above zero.
    pub fn check_result(&self, primal: &Point, tol: f64) -> Result<()> {
        let value = self
            .sigy_lt0_rep
            .sub_any_sign(&self.substitutions)?
            .eval(primal)?;
        if value > tol {
            return Err(ConstraintError::Infeasible(format!(
                "{self} is violated: difference {value:.4} > 0"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SignomialInequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.oper, self.right)
    }
}
