//! The Signomial / Posynomial / Monomial hierarchy.
//!
//! Three layered value types over [`NomialData`], each adding a closure
//! guarantee: a [`Posynomial`] has strictly positive coefficients, a
//! [`Monomial`] is a single-term Posynomial. Classification happens once,
//! at construction, via [`Signomial::narrow`]; call sites pattern-match on
//! the resulting [`Nomial`] instead of relying on dynamic dispatch.
//!
//! Fallible operations (addition can fail on units, negation on the
//! signomials gate, powers on exponent domain) are named `try_*` methods;
//! the operations that are closed and total on `Monomial` are plain
//! `std::ops` impls.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Div, Mul};

use crate::error::{NomialError, Result};
use crate::nomial::data::{self, NomialData, Pmap};
use crate::nomial::exp::Exp;
use crate::nomial::substitution::{substitute, SubMap, SubVal};
use crate::sigscope::SignomialsEnabled;
use crate::units::Units;
use crate::varkey::VarKey;

/// An evaluation point: variable magnitudes in each variable's own units.
pub type Point = HashMap<VarKey, f64>;

/// A sum of monomial terms with coefficients of arbitrary sign.
///
/// Not generally log-convex; most models never construct one directly,
/// since producing a negative coefficient requires a live
/// [`SignomialsEnabled`] scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Signomial {
    data: NomialData,
}

/// A Signomial whose coefficients are all strictly positive (log-convex).
#[derive(Debug, Clone, PartialEq)]
pub struct Posynomial {
    sig: Signomial,
}

/// A single-term Posynomial: `c * prod(v_i ^ e_i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Monomial {
    posy: Posynomial,
}

/// The narrowed classification of a nomial's data.
#[derive(Debug, Clone, PartialEq)]
pub enum Nomial {
    /// At least one non-positive coefficient.
    Signomial(Signomial),
    /// All coefficients positive, more than one term.
    Posynomial(Posynomial),
    /// All coefficients positive, exactly one term.
    Monomial(Monomial),
}

impl Nomial {
    /// Widens back to a Signomial, whatever the classification.
    pub fn into_signomial(self) -> Signomial {
        match self {
            Nomial::Signomial(s) => s,
            Nomial::Posynomial(p) => p.into_signomial(),
            Nomial::Monomial(m) => m.into_signomial(),
        }
    }
}

impl Signomial {
    /// Wraps nomial data, enforcing the sign gate.
    ///
    /// With `require_positive`, any non-positive coefficient outside a
    /// [`SignomialsEnabled`] scope is a [`NomialError::Sign`].
    pub fn from_data(data: NomialData, require_positive: bool) -> Result<Signomial> {
        if require_positive && !SignomialsEnabled::active() && data.any_nonpositive_cs() {
            return Err(NomialError::Sign(format!(
                "each coefficient must be positive in {data}"
            )));
        }
        Ok(Signomial { data })
    }

    /// A dimensionless constant.
    pub fn constant(c: f64) -> Result<Signomial> {
        Signomial::from_data(NomialData::constant(c, Units::DIMENSIONLESS), true)
    }

    /// The underlying term list.
    pub fn data(&self) -> &NomialData {
        &self.data
    }

    /// The exponent maps, one per term.
    pub fn exps(&self) -> &[Exp] {
        self.data.exps()
    }

    /// The coefficients, parallel to `exps`.
    pub fn cs(&self) -> &[f64] {
        self.data.cs()
    }

    /// The unit shared by every coefficient.
    pub fn units(&self) -> &Units {
        self.data.units()
    }

    /// True if the nomial has no terms.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The variables appearing in this nomial, in sorted order.
    pub fn varkeys(&self) -> Vec<VarKey> {
        let mut keys: Vec<VarKey> = self.data.varlocs().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Looks up a variable of this nomial by name.
    pub fn varkey_by_name(&self, name: &str) -> Option<VarKey> {
        self.data
            .varlocs()
            .keys()
            .find(|vk| vk.name() == name)
            .cloned()
    }

    /// Classifies into the narrowest kind the data admits.
    pub fn narrow(self) -> Nomial {
        if self.data.any_nonpositive_cs() || self.data.is_empty() {
            Nomial::Signomial(self)
        } else if self.data.len() == 1 {
            Nomial::Monomial(Monomial {
                posy: Posynomial { sig: self },
            })
        } else {
            Nomial::Posynomial(Posynomial { sig: self })
        }
    }

    /// Sum of two signomials. Units must be convertible; the left
    /// operand's units win.
    pub fn try_add(&self, other: &Signomial) -> Result<Signomial> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        let other = other.data.convert_to(*self.units())?;
        let mut exps = self.data.exps().to_vec();
        let mut cs = self.data.cs().to_vec();
        exps.extend_from_slice(other.exps());
        cs.extend_from_slice(other.cs());
        let (exps, cs, _) = data::simplify(exps, cs);
        Signomial::from_data(NomialData::from_simplified(exps, cs, *self.units()), false)
    }

    /// Adds a dimensionless constant. Adding zero is an identity.
    pub fn add_const(&self, c: f64) -> Result<Signomial> {
        if c == 0.0 {
            return Ok(self.clone());
        }
        self.try_add(&Signomial::constant(c)?)
    }

    /// Product of two signomials: the full term cross-product.
    ///
    /// Gated: a result with non-positive coefficients (one operand was a
    /// signomial proper) requires a live signomials scope.
    pub fn try_mul(&self, other: &Signomial) -> Result<Signomial> {
        Signomial::from_data(data::mul_data(&self.data, &other.data), true)
    }

    /// Scales by a constant. Gated for non-positive factors.
    pub fn try_scale(&self, factor: f64) -> Result<Signomial> {
        let cs = self.cs().iter().map(|c| c * factor).collect();
        let (exps, cs, _) = data::simplify(self.exps().to_vec(), cs);
        Signomial::from_data(NomialData::from_simplified(exps, cs, *self.units()), true)
    }

    /// Division: closed-form against a Monomial or scalar-multiple
    /// divisor, error otherwise.
    ///
    /// The scalar-multiple case (identical exponent sets, all coefficient
    /// ratios equal) yields a constant.
    pub fn try_div(&self, other: &Signomial) -> Result<Signomial> {
        if self.exps() == other.exps() && !self.is_empty() {
            let ratio = self.cs()[0] / other.cs()[0];
            if self
                .cs()
                .iter()
                .zip(other.cs())
                .all(|(a, b)| a / b == ratio)
            {
                let units = self.units().div(other.units());
                return Signomial::from_data(NomialData::constant(ratio, units), true);
            }
        }
        if other.data.len() == 1 {
            let m = Monomial {
                posy: Posynomial {
                    sig: Signomial {
                        data: other.data.clone(),
                    },
                },
            };
            if m.c() <= 0.0 {
                return Err(NomialError::NonMonomialDivisor(other.to_string()));
            }
            return Ok(self / &m);
        }
        Err(NomialError::NonMonomialDivisor(other.to_string()))
    }

    /// Non-negative integer power by repeated multiplication.
    pub fn try_pow(&self, x: i32) -> Result<Signomial> {
        if x < 0 {
            return Err(NomialError::InvalidExponent(
                "signomials are only closed under nonnegative integer exponents".to_string(),
            ));
        }
        let mut p = Signomial {
            data: NomialData::constant(1.0, Units::DIMENSIONLESS),
        };
        for _ in 0..x {
            p = Signomial {
                data: data::mul_data(&p.data, &self.data),
            };
        }
        Ok(p)
    }

    /// Negation; only legal inside a signomials-enabled scope.
    pub fn try_neg(&self) -> Result<Signomial> {
        if !SignomialsEnabled::active() {
            return Err(NomialError::Sign(
                "negation requires a SignomialsEnabled scope".to_string(),
            ));
        }
        self.try_scale(-1.0)
    }

    /// Difference; only legal inside a signomials-enabled scope.
    pub fn try_sub(&self, other: &Signomial) -> Result<Signomial> {
        if !SignomialsEnabled::active() {
            return Err(NomialError::Sign(
                "subtraction requires a SignomialsEnabled scope".to_string(),
            ));
        }
        self.try_add(&other.try_scale(-1.0)?)
    }

    /// Splits into `(positive part, negative part)` so that
    /// `self = positive - negative`, both parts Posynomials.
    ///
    /// A zero coefficient is an error: simplification should have removed
    /// it before this point.
    pub fn posy_negy(&self) -> Result<(Option<Posynomial>, Option<Posynomial>)> {
        let mut p_exps = Vec::new();
        let mut p_cs = Vec::new();
        let mut n_exps = Vec::new();
        let mut n_cs = Vec::new();
        for (exp, c) in self.exps().iter().zip(self.cs()) {
            if *c > 0.0 {
                p_exps.push(exp.clone());
                p_cs.push(*c);
            } else if *c < 0.0 {
                n_exps.push(exp.clone());
                n_cs.push(-c);
            } else {
                return Err(NomialError::Construction(format!(
                    "unexpected zero coefficient in {self}"
                )));
            }
        }
        let part = |exps: Vec<Exp>, cs: Vec<f64>| -> Option<Posynomial> {
            if cs.is_empty() {
                None
            } else {
                Some(Posynomial {
                    sig: Signomial {
                        data: NomialData::from_simplified(exps, cs, *self.units()),
                    },
                })
            }
        };
        Ok((part(p_exps, p_cs), part(n_exps, n_cs)))
    }

    /// Term-wise derivative with respect to a variable.
    pub fn diff(&self, wrt: &VarKey) -> Signomial {
        Signomial {
            data: self.data.diff(wrt),
        }
    }

    /// Substitutes, enforcing the sign gate on the result.
    pub fn sub(&self, subs: &SubMap) -> Result<Signomial> {
        let (data, _) = substitute(&self.data, subs)?;
        Signomial::from_data(data, true)
    }

    /// Substitutes without the sign gate (internal transformations).
    pub fn sub_any_sign(&self, subs: &SubMap) -> Result<Signomial> {
        let (data, _) = substitute(&self.data, subs)?;
        Ok(Signomial { data })
    }

    /// Substitutes, also returning the term-contribution map needed to
    /// push sensitivities back onto pre-substitution terms.
    pub fn sub_with_map(&self, subs: &SubMap) -> Result<(Signomial, Pmap)> {
        let (data, pmap) = substitute(&self.data, subs)?;
        Ok((Signomial { data }, pmap))
    }

    /// Evaluates at a point; every variable must be resolved.
    pub fn eval(&self, x0: &Point) -> Result<f64> {
        let psub = self.sub_any_sign(&SubMap::from_point(x0))?;
        match psub.data.constant_value() {
            Some(v) => Ok(v),
            None => Err(unresolved_error(&psub)),
        }
    }

    /// First-order log-space monomial tangent at `x0`.
    ///
    /// With an empty `x0`, a constant term (if any) is returned directly.
    /// Any variable unresolved after substituting `x0` is an error naming
    /// the missing variables. The tangent of a single-term nomial is the
    /// nomial itself, exactly.
    pub fn mono_approximation(&self, x0: &Point) -> Result<Monomial> {
        if x0.is_empty() {
            for (exp, c) in self.exps().iter().zip(self.cs()) {
                if exp.is_empty() {
                    return Monomial::new(Exp::empty(), *c, *self.units());
                }
            }
        }
        let subs = SubMap::from_point(x0);
        let psub = self.sub_any_sign(&subs)?;
        let p0 = match psub.data.constant_value() {
            Some(v) => v,
            None => return Err(unresolved_error(&psub)),
        };
        let mut exp = Exp::empty();
        let mut m0 = 1.0;
        for vk in self.varkeys() {
            let dv = self
                .diff(&vk)
                .sub_any_sign(&subs)?
                .data
                .constant_value()
                .ok_or_else(|| unresolved_error(self))?;
            let x = x0[&vk];
            let e = x * dv / p0;
            m0 *= x.powf(e);
            exp.insert(vk, e);
        }
        Monomial::new(exp, p0 / m0, *self.units())
    }
}

fn unresolved_error(remaining: &Signomial) -> NomialError {
    NomialError::UnresolvedVariables(
        remaining
            .varkeys()
            .iter()
            .map(|vk| vk.to_string())
            .collect(),
    )
}

impl Posynomial {
    /// Builds a posynomial, rejecting non-positive coefficients even
    /// inside a signomials scope.
    pub fn new(data: NomialData) -> Result<Posynomial> {
        if data.any_nonpositive_cs() {
            return Err(NomialError::Sign(format!(
                "posynomial coefficients must be positive in {data}"
            )));
        }
        Ok(Posynomial {
            sig: Signomial { data },
        })
    }

    /// Borrows the signomial view.
    pub fn as_signomial(&self) -> &Signomial {
        &self.sig
    }

    /// Widens to a Signomial.
    pub fn into_signomial(self) -> Signomial {
        self.sig
    }

    /// The underlying term list.
    pub fn data(&self) -> &NomialData {
        &self.sig.data
    }

    /// Sum of two posynomials (units may fail; sign cannot).
    pub fn try_add(&self, other: &Posynomial) -> Result<Posynomial> {
        let sum = self.sig.try_add(&other.sig)?;
        Ok(Posynomial { sig: sum })
    }

    /// Adds a positive constant; adding zero is an identity.
    pub fn add_const(&self, c: f64) -> Result<Posynomial> {
        if c < 0.0 {
            return Err(NomialError::Sign(
                "cannot add a negative constant to a posynomial".to_string(),
            ));
        }
        Ok(Posynomial {
            sig: self.sig.add_const(c)?,
        })
    }

    /// Non-negative integer power.
    pub fn try_pow(&self, x: i32) -> Result<Posynomial> {
        Ok(Posynomial {
            sig: self.sig.try_pow(x)?,
        })
    }

    /// Monomial lower bound exact at `x0` (the log-space tangent).
    pub fn mono_lower_bound(&self, x0: &Point) -> Result<Monomial> {
        self.sig.mono_approximation(x0)
    }

    /// Substitutes; the result may have merged terms but stays positive
    /// unless the substitution introduced non-positive values, which is
    /// an error here.
    pub fn sub(&self, subs: &SubMap) -> Result<Posynomial> {
        let (data, _) = substitute(self.data(), subs)?;
        Posynomial::new(data)
    }
}

/// Taylor expansion of `e^posy - 1`, carried to `nterm` terms.
///
/// Every term is a positive multiple of a power of `posy`, so the
/// expansion is itself a posynomial and can stand in for an exponential
/// inside a GP. `posy` must be dimensionless for `nterm > 1`, since the
/// powers would otherwise not share units.
pub fn te_exp_minus1(posy: &Posynomial, nterm: u32) -> Result<Posynomial> {
    if nterm < 1 {
        return Err(NomialError::Construction(format!(
            "a Taylor expansion needs at least one term, got {nterm}"
        )));
    }
    let mut res = posy.clone();
    let mut factorial = 1.0;
    for i in 2..=nterm {
        factorial *= f64::from(i);
        let term = Posynomial {
            sig: posy.sig.try_pow(i as i32)?.try_scale(1.0 / factorial)?,
        };
        res = res.try_add(&term)?;
    }
    Ok(res)
}

impl Monomial {
    /// Builds a single-term monomial; the coefficient must be positive.
    pub fn new(exp: Exp, c: f64, units: Units) -> Result<Monomial> {
        if c <= 0.0 {
            return Err(NomialError::Sign(format!(
                "monomial coefficient must be positive, got {c}"
            )));
        }
        Ok(Monomial {
            posy: Posynomial {
                sig: Signomial {
                    data: NomialData::monomial_term(exp, c, units),
                },
            },
        })
    }

    /// A positive dimensionless constant.
    pub fn constant(c: f64) -> Result<Monomial> {
        Monomial::new(Exp::empty(), c, Units::DIMENSIONLESS)
    }

    /// The monomial `1 * vk`, carrying the key's units.
    pub fn from_varkey(vk: VarKey) -> Monomial {
        let units = *vk.units();
        Monomial {
            posy: Posynomial {
                sig: Signomial {
                    data: NomialData::monomial_term(Exp::of(vk, 1.0), 1.0, units),
                },
            },
        }
    }

    /// Borrows the posynomial view.
    pub fn as_posynomial(&self) -> &Posynomial {
        &self.posy
    }

    /// Borrows the signomial view.
    pub fn as_signomial(&self) -> &Signomial {
        &self.posy.sig
    }

    /// Widens to a Posynomial.
    pub fn into_posynomial(self) -> Posynomial {
        self.posy
    }

    /// Widens to a Signomial.
    pub fn into_signomial(self) -> Signomial {
        self.posy.sig
    }

    /// The exponent map of the single term.
    pub fn exp(&self) -> &Exp {
        &self.posy.sig.data.exps()[0]
    }

    /// The coefficient of the single term.
    pub fn c(&self) -> f64 {
        self.posy.sig.data.cs()[0]
    }

    /// The units of the coefficient.
    pub fn units(&self) -> &Units {
        self.posy.sig.data.units()
    }

    /// Closed-form power with any real exponent.
    pub fn pow(&self, x: f64) -> Monomial {
        Monomial {
            posy: Posynomial {
                sig: Signomial {
                    data: NomialData::monomial_term(
                        self.exp().scale(x),
                        self.c().powf(x),
                        self.units().powf(x),
                    ),
                },
            },
        }
    }

    /// The reciprocal monomial.
    pub fn recip(&self) -> Monomial {
        self.pow(-1.0)
    }

    /// If this monomial is a bare variable (`c == 1`, one var with
    /// exponent 1), its key.
    pub fn varkey(&self) -> Option<VarKey> {
        let exp = self.exp();
        if self.c() == 1.0 && exp.len() == 1 {
            if let Some((vk, &e)) = exp.iter().next() {
                if e == 1.0 {
                    return Some(vk.clone());
                }
            }
        }
        None
    }

    /// Substitutes; a monomial substituted with monomials stays one.
    pub fn sub(&self, subs: &SubMap) -> Result<Nomial> {
        let (data, _) = substitute(self.as_signomial().data(), subs)?;
        Ok(Signomial { data }.narrow())
    }
}

// ---------------------------------------------------------------------------
// Closed operator impls
// ---------------------------------------------------------------------------

impl Mul for &Monomial {
    type Output = Monomial;
    fn mul(self, rhs: &Monomial) -> Monomial {
        Monomial {
            posy: Posynomial {
                sig: Signomial {
                    data: data::mul_data(self.as_signomial().data(), rhs.as_signomial().data()),
                },
            },
        }
    }
}

impl Div for &Monomial {
    type Output = Monomial;
    fn div(self, rhs: &Monomial) -> Monomial {
        self * &rhs.recip()
    }
}

impl Mul for &Posynomial {
    type Output = Posynomial;
    fn mul(self, rhs: &Posynomial) -> Posynomial {
        Posynomial {
            sig: Signomial {
                data: data::mul_data(self.data(), rhs.data()),
            },
        }
    }
}

impl Div<&Monomial> for &Posynomial {
    type Output = Posynomial;
    fn div(self, rhs: &Monomial) -> Posynomial {
        let recip = rhs.recip();
        Posynomial {
            sig: Signomial {
                data: data::mul_data(self.data(), recip.as_signomial().data()),
            },
        }
    }
}

impl Div<&Monomial> for &Signomial {
    type Output = Signomial;
    fn div(self, rhs: &Monomial) -> Signomial {
        let recip = rhs.recip();
        Signomial {
            data: data::mul_data(self.data(), recip.as_signomial().data()),
        }
    }
}

// ---------------------------------------------------------------------------
// Widening conversions
// ---------------------------------------------------------------------------

impl From<Posynomial> for Signomial {
    fn from(p: Posynomial) -> Signomial {
        p.into_signomial()
    }
}

impl From<Monomial> for Signomial {
    fn from(m: Monomial) -> Signomial {
        m.into_signomial()
    }
}

impl From<Monomial> for Posynomial {
    fn from(m: Monomial) -> Posynomial {
        m.into_posynomial()
    }
}

impl TryFrom<Signomial> for Posynomial {
    type Error = NomialError;
    fn try_from(s: Signomial) -> Result<Posynomial> {
        match s.narrow() {
            Nomial::Posynomial(p) => Ok(p),
            Nomial::Monomial(m) => Ok(m.into_posynomial()),
            Nomial::Signomial(s) => Err(NomialError::Sign(format!("{s} is not a posynomial"))),
        }
    }
}

impl TryFrom<Signomial> for Monomial {
    type Error = NomialError;
    fn try_from(s: Signomial) -> Result<Monomial> {
        match s.narrow() {
            Nomial::Monomial(m) => Ok(m),
            other => Err(NomialError::Construction(format!(
                "{} is not a monomial",
                other.into_signomial()
            ))),
        }
    }
}

impl From<f64> for Signomial {
    fn from(c: f64) -> Signomial {
        // plain numbers are dimensionless; the sign gate applies at use
        Signomial {
            data: NomialData::constant(c, Units::DIMENSIONLESS),
        }
    }
}

impl fmt::Display for Signomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl fmt::Display for Posynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sig)
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.posy)
    }
}

// SubVal convenience conversions live here so model code can write
// `subs.insert(key, 3.0.into())`.
impl From<f64> for SubVal {
    fn from(v: f64) -> SubVal {
        SubVal::Value(v)
    }
}

impl From<Monomial> for SubVal {
    fn from(m: Monomial) -> SubVal {
        SubVal::Monomial(m)
    }
}

impl From<Signomial> for SubVal {
    fn from(s: Signomial) -> SubVal {
        SubVal::Signomial(s)
    }
}
