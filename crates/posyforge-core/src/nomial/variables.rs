//! Variable construction.
//!
//! A variable is a described singlet [`Monomial`]. [`VarSpec`] is the
//! builder for the description map; [`variable`] is the bare-name shortcut.

use std::collections::BTreeMap;

use crate::error::{NomialError, Result};
use crate::nomial::math::Monomial;
use crate::units::Units;
use crate::varkey::{DescrValue, VarKey};

/// Description fields managed by the library, not user-suppliable.
const RESERVED: [&str; 3] = ["name", "idx", "length"];

/// Builder for a described variable.
///
/// # Example
///
/// ```
/// use posyforge_core::nomial::variables::VarSpec;
///
/// let drag = VarSpec::new("D")
///     .units("N")
///     .unwrap()
///     .label("total drag force")
///     .monomial()
///     .unwrap();
/// assert_eq!(drag.to_string(), "D");
/// ```
#[derive(Debug, Clone, Default)]
pub struct VarSpec {
    name: Option<String>,
    units: Units,
    descr: BTreeMap<String, DescrValue>,
}

impl VarSpec {
    /// Starts a spec with the given name.
    pub fn new(name: impl Into<String>) -> VarSpec {
        VarSpec {
            name: Some(name.into()),
            ..VarSpec::default()
        }
    }

    /// Starts a spec with a generated anonymous name.
    pub fn anonymous() -> VarSpec {
        VarSpec::default()
    }

    /// Attaches units, parsed from an expression like `"N"` or `"m/s"`.
    pub fn units(mut self, units: &str) -> Result<VarSpec> {
        self.units = Units::parse(units)?;
        self.descr
            .insert("units".to_string(), DescrValue::Str(units.to_string()));
        Ok(self)
    }

    /// Fixes the variable's value; fixed variables become substitutions
    /// automatically when a model is canonicalized.
    pub fn value(mut self, value: f64) -> VarSpec {
        self.descr
            .insert("value".to_string(), DescrValue::Float(value));
        self
    }

    /// Attaches a human-readable label.
    pub fn label(mut self, label: impl Into<String>) -> VarSpec {
        self.descr
            .insert("label".to_string(), DescrValue::Str(label.into()));
        self
    }

    /// Sets the initial guess used when linearizing signomial constraints.
    pub fn sp_init(mut self, guess: f64) -> VarSpec {
        self.descr
            .insert("sp_init".to_string(), DescrValue::Float(guess));
        self
    }

    /// Appends an owning-model tag (rendered as a subscript).
    pub fn model(mut self, tag: impl Into<String>) -> VarSpec {
        let entry = self
            .descr
            .entry("models".to_string())
            .or_insert_with(|| DescrValue::StrList(Vec::new()));
        if let DescrValue::StrList(tags) = entry {
            tags.push(tag.into());
        }
        self
    }

    /// Attaches an arbitrary description field.
    ///
    /// `name`, `idx`, and `length` are reserved and rejected.
    pub fn tag(mut self, key: impl Into<String>, value: DescrValue) -> Result<VarSpec> {
        let key = key.into();
        if RESERVED.contains(&key.as_str()) {
            return Err(NomialError::Construction(format!(
                "the description field '{key}' is reserved"
            )));
        }
        self.descr.insert(key, value);
        Ok(self)
    }

    /// Builds the variable key.
    pub fn key(self) -> VarKey {
        match self.name {
            Some(name) => VarKey::with_descr(name, self.descr, self.units),
            None => {
                let anon = VarKey::anonymous();
                VarKey::with_descr(anon.name().to_string(), self.descr, self.units)
            }
        }
    }

    /// Builds the variable as a singlet monomial.
    pub fn monomial(self) -> Result<Monomial> {
        Ok(Monomial::from_varkey(self.key()))
    }

    fn with_index(&self, idx: usize, length: usize) -> VarSpec {
        let mut spec = self.clone();
        spec.descr
            .insert("idx".to_string(), DescrValue::IntList(vec![idx as i64]));
        spec.descr
            .insert("length".to_string(), DescrValue::Int(length as i64));
        spec
    }
}

/// A bare named variable with no units or description.
pub fn variable(name: &str) -> Monomial {
    Monomial::from_varkey(VarKey::new(name))
}

/// A vector of `n` described variables sharing a name, each tagged with
/// its index and the vector length.
pub fn vec_variable(n: usize, spec: VarSpec) -> Result<Vec<Monomial>> {
    if spec.descr.contains_key("idx") || spec.descr.contains_key("length") {
        return Err(NomialError::Construction(
            "the description fields 'idx' and 'length' are reserved".to_string(),
        ));
    }
    (0..n)
        .map(|i| spec.with_index(i, n).monomial())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_variable_is_singlet() {
        let x = variable("x");
        assert_eq!(x.c(), 1.0);
        assert_eq!(x.exp().len(), 1);
        assert_eq!(x.varkey().unwrap().name(), "x");
    }

    #[test]
    fn united_variable_carries_units() {
        let d = VarSpec::new("D").units("N").unwrap().monomial().unwrap();
        assert!(d
            .units()
            .same_dimensions(&Units::parse("kg*m/s^2").unwrap()));
    }

    #[test]
    fn valued_variable_round_trips() {
        let w = VarSpec::new("w").value(2.5).monomial().unwrap();
        assert_eq!(w.varkey().unwrap().value(), Some(2.5));
    }

    #[test]
    fn reserved_tags_rejected() {
        assert!(VarSpec::new("x").tag("idx", DescrValue::Int(0)).is_err());
        assert!(VarSpec::new("x").tag("length", DescrValue::Int(3)).is_err());
        assert!(VarSpec::new("x").tag("owner", DescrValue::Int(3)).is_ok());
    }

    #[test]
    fn vec_variable_indexes_keys() {
        let vs = vec_variable(3, VarSpec::new("v")).unwrap();
        assert_eq!(vs.len(), 3);
        let keys: Vec<VarKey> = vs.iter().map(|m| m.varkey().unwrap()).collect();
        assert_ne!(keys[0], keys[1]);
        assert_eq!(keys[2].to_string(), "v_2");
        assert_eq!(
            keys[0].descr_get("length"),
            Some(&DescrValue::Int(3))
        );
    }

    #[test]
    fn anonymous_spec_generates_name() {
        let a = VarSpec::anonymous().monomial().unwrap();
        let b = VarSpec::anonymous().monomial().unwrap();
        assert_ne!(a.varkey().unwrap(), b.varkey().unwrap());
    }
}
