//! Variable identity keys.
//!
//! A `VarKey` is the immutable identity of a named, optionally unit-tagged,
//! described variable. Two keys are equal iff their description maps are
//! equal (ignoring `units`, `value`, and `unitrepr` entries, which carry
//! presentation or substitution data rather than identity). Keys hash and
//! order consistently with that equality, so they are safe map keys.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::units::Units;

/// Description fields that do not participate in equality or hashing.
const EQ_IGNORES: [&str; 3] = ["units", "value", "unitrepr"];

/// Description fields rendered as subscripts after the name.
const SUBSCRIPTS: [&str; 2] = ["models", "idx"];

static NEXT_ANON_ID: AtomicU64 = AtomicU64::new(0);

/// A value stored in a variable's description map.
#[derive(Debug, Clone, PartialEq)]
pub enum DescrValue {
    /// A string field, e.g. a label or model tag.
    Str(String),
    /// An integer field, e.g. a vector length.
    Int(i64),
    /// A float field, e.g. a fixed value or an `sp_init` guess.
    Float(f64),
    /// An index tuple for array variables.
    IntList(Vec<i64>),
    /// A list of owning-model tags.
    StrList(Vec<String>),
}

impl Eq for DescrValue {}

impl Hash for DescrValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DescrValue::Str(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            DescrValue::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            DescrValue::Float(x) => {
                2u8.hash(state);
                x.to_bits().hash(state);
            }
            DescrValue::IntList(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            DescrValue::StrList(v) => {
                4u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl Ord for DescrValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use DescrValue::*;
        fn rank(v: &DescrValue) -> u8 {
            match v {
                Str(_) => 0,
                Int(_) => 1,
                Float(_) => 2,
                IntList(_) => 3,
                StrList(_) => 4,
            }
        }
        match (self, other) {
            (Str(a), Str(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (IntList(a), IntList(b)) => a.cmp(b),
            (StrList(a), StrList(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl PartialOrd for DescrValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DescrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescrValue::Str(s) => write!(f, "{s}"),
            DescrValue::Int(i) => write!(f, "{i}"),
            DescrValue::Float(x) => write!(f, "{x}"),
            DescrValue::IntList(v) => {
                let strs: Vec<String> = v.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", strs.join(","))
            }
            DescrValue::StrList(v) => write!(f, "{}", v.join(", ")),
        }
    }
}

#[derive(Debug)]
struct VarKeyInner {
    name: String,
    descr: BTreeMap<String, DescrValue>,
    units: Units,
}

/// Immutable identity for a described variable.
///
/// Cheap to clone; the description lives behind an `Arc`.
///
/// # Example
///
/// ```
/// use posyforge_core::varkey::VarKey;
///
/// let a = VarKey::new("x");
/// let b = VarKey::new("x");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct VarKey(Arc<VarKeyInner>);

impl VarKey {
    /// Creates a key with the given name and no other description.
    pub fn new(name: impl Into<String>) -> VarKey {
        VarKey::with_descr(name, BTreeMap::new(), Units::DIMENSIONLESS)
    }

    /// Creates a key from a name, description map, and units.
    pub fn with_descr(
        name: impl Into<String>,
        mut descr: BTreeMap<String, DescrValue>,
        units: Units,
    ) -> VarKey {
        let name = name.into();
        descr.insert("name".to_string(), DescrValue::Str(name.clone()));
        VarKey(Arc::new(VarKeyInner { name, descr, units }))
    }

    /// Creates an anonymous key with a unique generated name.
    pub fn anonymous() -> VarKey {
        let id = NEXT_ANON_ID.fetch_add(1, Ordering::Relaxed);
        VarKey::new(format!("\\fbox{{{id}}}"))
    }

    /// The variable's name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The full description map.
    pub fn descr(&self) -> &BTreeMap<String, DescrValue> {
        &self.0.descr
    }

    /// A description field by key.
    pub fn descr_get(&self, key: &str) -> Option<&DescrValue> {
        self.0.descr.get(key)
    }

    /// The variable's units (dimensionless if untagged).
    pub fn units(&self) -> &Units {
        &self.0.units
    }

    /// The fixed value attached to this variable, if any.
    pub fn value(&self) -> Option<f64> {
        match self.0.descr.get("value") {
            Some(DescrValue::Float(x)) => Some(*x),
            Some(DescrValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// The signomial-programming initial guess for this variable, if any.
    pub fn sp_init(&self) -> Option<f64> {
        match self.0.descr.get("sp_init") {
            Some(DescrValue::Float(x)) => Some(*x),
            Some(DescrValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    fn identity_entries(&self) -> impl Iterator<Item = (&String, &DescrValue)> {
        self.0
            .descr
            .iter()
            .filter(|(k, _)| !EQ_IGNORES.contains(&k.as_str()))
    }

    /// Renders the key's display form without the given description fields.
    pub fn str_without(&self, excluded: &[&str]) -> String {
        let mut out = self.0.name.clone();
        for sub in SUBSCRIPTS {
            if excluded.contains(&sub) {
                continue;
            }
            if let Some(v) = self.0.descr.get(sub) {
                out.push('_');
                out.push_str(&v.to_string());
            }
        }
        out
    }

    /// Renders a LaTeX form, name with subscripted description fields.
    pub fn latex(&self) -> String {
        let mut out = self.0.name.clone();
        for sub in SUBSCRIPTS {
            if let Some(v) = self.0.descr.get(sub) {
                out = format!("{{{out}}}_{{{v}}}");
            }
        }
        out
    }
}

impl PartialEq for VarKey {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.identity_entries().eq(other.identity_entries())
    }
}

impl Eq for VarKey {}

impl Hash for VarKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (k, v) in self.identity_entries() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl Ord for VarKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .name
            .cmp(&other.0.name)
            .then_with(|| self.identity_entries().cmp(other.identity_entries()))
    }
}

impl PartialOrd for VarKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.str_without(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_descr() {
        let a = VarKey::new("x");
        let b = VarKey::new("x");
        let c = VarKey::new("y");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn units_and_value_ignored_in_equality() {
        let mut descr = BTreeMap::new();
        descr.insert("value".to_string(), DescrValue::Float(3.0));
        let with_value = VarKey::with_descr("x", descr, Units::parse("m").unwrap());
        let plain = VarKey::new("x");
        assert_eq!(with_value, plain);
        assert_eq!(with_value.value(), Some(3.0));
    }

    #[test]
    fn index_distinguishes_keys() {
        let mut d0 = BTreeMap::new();
        d0.insert("idx".to_string(), DescrValue::IntList(vec![0]));
        let mut d1 = BTreeMap::new();
        d1.insert("idx".to_string(), DescrValue::IntList(vec![1]));
        let k0 = VarKey::with_descr("v", d0, Units::DIMENSIONLESS);
        let k1 = VarKey::with_descr("v", d1, Units::DIMENSIONLESS);
        assert_ne!(k0, k1);
        assert_eq!(k0.to_string(), "v_0");
        assert_eq!(k1.to_string(), "v_1");
    }

    #[test]
    fn anonymous_keys_are_unique() {
        assert_ne!(VarKey::anonymous(), VarKey::anonymous());
    }

    #[test]
    fn str_without_hides_fields() {
        let mut d = BTreeMap::new();
        d.insert(
            "models".to_string(),
            DescrValue::StrList(vec!["Wing".to_string()]),
        );
        let k = VarKey::with_descr("S", d, Units::DIMENSIONLESS);
        assert_eq!(k.to_string(), "S_Wing");
        assert_eq!(k.str_without(&["models"]), "S");
    }
}
