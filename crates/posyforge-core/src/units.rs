//! Physical units as SI dimension vectors.
//!
//! A `Units` value is a scale factor to SI base units plus an exponent for
//! each of the seven SI base dimensions. Coefficients of a nomial all share
//! one `Units`; combining nomials multiplies/divides units, and addition
//! requires a conversion factor between them.

use std::fmt;

use crate::error::{NomialError, Result};

/// Number of SI base dimensions tracked: m, kg, s, A, K, mol, cd.
const NDIMS: usize = 7;

const DIM_NAMES: [&str; NDIMS] = ["m", "kg", "s", "A", "K", "mol", "cd"];

/// A physical unit: a scale to SI base units and per-dimension exponents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    scale: f64,
    dims: [f64; NDIMS],
}

impl Units {
    /// The dimensionless identity unit.
    pub const DIMENSIONLESS: Units = Units {
        scale: 1.0,
        dims: [0.0; NDIMS],
    };

    fn base(dim: usize) -> Units {
        let mut dims = [0.0; NDIMS];
        dims[dim] = 1.0;
        Units { scale: 1.0, dims }
    }

    fn scaled(self, scale: f64) -> Units {
        Units {
            scale: self.scale * scale,
            ..self
        }
    }

    /// Returns true if this unit has no dimensional content.
    pub fn is_dimensionless(&self) -> bool {
        self.dims.iter().all(|d| *d == 0.0)
    }

    /// Returns true if `self` and `other` have identical dimension vectors.
    pub fn same_dimensions(&self, other: &Units) -> bool {
        self.dims == other.dims
    }

    /// Multiplies two units (dimension exponents add).
    pub fn mul(&self, other: &Units) -> Units {
        let mut dims = self.dims;
        for (d, o) in dims.iter_mut().zip(other.dims.iter()) {
            *d += o;
        }
        Units {
            scale: self.scale * other.scale,
            dims,
        }
    }

    /// Divides two units (dimension exponents subtract).
    pub fn div(&self, other: &Units) -> Units {
        let mut dims = self.dims;
        for (d, o) in dims.iter_mut().zip(other.dims.iter()) {
            *d -= o;
        }
        Units {
            scale: self.scale / other.scale,
            dims,
        }
    }

    /// Raises a unit to a (possibly fractional) power.
    pub fn powf(&self, p: f64) -> Units {
        let mut dims = self.dims;
        for d in dims.iter_mut() {
            *d *= p;
        }
        Units {
            scale: self.scale.powf(p),
            dims,
        }
    }

    /// Factor converting a magnitude in `self` to a magnitude in `other`.
    ///
    /// Errors if the dimension vectors differ.
    pub fn conversion_factor_to(&self, other: &Units) -> Result<f64> {
        if !self.same_dimensions(other) {
            return Err(NomialError::Units {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        Ok(self.scale / other.scale)
    }

    /// Parses a unit expression such as `"N"`, `"m/s"`, `"kg*m/s^2"`.
    ///
    /// `"-"`, `""`, and `"dimensionless"` all parse to the dimensionless unit.
    pub fn parse(s: &str) -> Result<Units> {
        let s = s.trim();
        if s.is_empty() || s == "-" || s == "dimensionless" {
            return Ok(Units::DIMENSIONLESS);
        }
        let mut out = Units::DIMENSIONLESS;
        // split into factors, remembering whether each follows a '/'
        let mut invert = false;
        for chunk in s.split_inclusive(['*', '/']) {
            let (factor, next_invert) = match chunk.strip_suffix('*') {
                Some(f) => (f, false),
                None => match chunk.strip_suffix('/') {
                    Some(f) => (f, true),
                    None => (chunk, false),
                },
            };
            let factor = factor.trim();
            let (name, exp) = match factor.split_once('^') {
                Some((n, e)) => {
                    let exp: f64 = e
                        .trim()
                        .parse()
                        .map_err(|_| NomialError::UnknownUnit(factor.to_string()))?;
                    (n.trim(), exp)
                }
                None => (factor, 1.0),
            };
            let unit = Units::named(name)?.powf(exp);
            out = if invert { out.div(&unit) } else { out.mul(&unit) };
            invert = next_invert;
        }
        Ok(out)
    }

    fn named(name: &str) -> Result<Units> {
        let m = Units::base(0);
        let kg = Units::base(1);
        let s = Units::base(2);
        Ok(match name {
            "m" | "meter" | "meters" => m,
            "km" => m.scaled(1e3),
            "cm" => m.scaled(1e-2),
            "mm" => m.scaled(1e-3),
            "ft" | "foot" | "feet" => m.scaled(0.3048),
            "in" | "inch" | "inches" => m.scaled(0.0254),
            "kg" => kg,
            "g" => kg.scaled(1e-3),
            "lb" | "lbs" => kg.scaled(0.45359237),
            "s" | "sec" | "second" | "seconds" => s,
            "min" => s.scaled(60.0),
            "hr" | "hour" | "hours" => s.scaled(3600.0),
            "A" => Units::base(3),
            "K" => Units::base(4),
            "mol" => Units::base(5),
            "cd" => Units::base(6),
            "Hz" => s.powf(-1.0),
            "N" => kg.mul(&m).div(&s.powf(2.0)),
            "Pa" => kg.div(&m).div(&s.powf(2.0)),
            "J" => kg.mul(&m.powf(2.0)).div(&s.powf(2.0)),
            "W" => kg.mul(&m.powf(2.0)).div(&s.powf(3.0)),
            _ => return Err(NomialError::UnknownUnit(name.to_string())),
        })
    }
}

impl Default for Units {
    fn default() -> Self {
        Units::DIMENSIONLESS
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "-");
        }
        let mut first = true;
        if self.scale != 1.0 {
            write!(f, "{}", self.scale)?;
            first = false;
        }
        for (i, d) in self.dims.iter().enumerate() {
            if *d == 0.0 {
                continue;
            }
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if *d == 1.0 {
                write!(f, "{}", DIM_NAMES[i])?;
            } else {
                write!(f, "{}^{}", DIM_NAMES[i], d)?;
            }
        }
        Ok(())
    }
}
