//! Constraint aggregation.
//!
//! A [`ConstraintSet`] is a tree of constraints and sub-sets that
//! canonicalizes as one flat posynomial list. The `posymap` records how
//! many posynomials each direct child contributed, so solver duals can
//! be sliced back out and routed to the child that produced them.
//! Substitutions merge bottom-up, parents overriding children.

use std::fmt;

use tracing::warn;

use posyforge_core::{Point, Posynomial, SubMap};

use crate::error::{ConstraintError, Result};
use crate::mono_eq::MonomialEquality;
use crate::posy_ineq::PosynomialInequality;
use crate::sens::{merge_var_senss, Sens, SensMap, VarSens};
use crate::sig_ineq::SignomialInequality;
use crate::solution::SolverResult;

/// Any single constraint, dispatching to its kind.
#[derive(Debug, Clone)]
pub enum Constraint {
    PosyIneq(PosynomialInequality),
    MonoEq(MonomialEquality),
    SigIneq(SignomialInequality),
}

impl Constraint {
    pub fn substitutions(&self) -> &SubMap {
        match self {
            Constraint::PosyIneq(c) => c.substitutions(),
            Constraint::MonoEq(c) => c.substitutions(),
            Constraint::SigIneq(c) => c.substitutions(),
        }
    }

    pub fn set_substitutions(&mut self, subs: SubMap) {
        match self {
            Constraint::PosyIneq(c) => c.set_substitutions(subs),
            Constraint::MonoEq(c) => c.set_substitutions(subs),
            Constraint::SigIneq(c) => c.set_substitutions(subs),
        }
    }

    pub fn as_posyslt1(&mut self) -> Result<Vec<Posynomial>> {
        match self {
            Constraint::PosyIneq(c) => c.as_posyslt1(),
            Constraint::MonoEq(c) => c.as_posyslt1(),
            Constraint::SigIneq(c) => c.as_posyslt1(),
        }
    }

    pub fn sens_from_dual(
        &self,
        p_senss: &[f64],
        m_sensss: &[Vec<f64>],
    ) -> Result<(SensMap, VarSens)> {
        match self {
            Constraint::PosyIneq(c) => c.sens_from_dual(p_senss, m_sensss),
            Constraint::MonoEq(c) => c.sens_from_dual(p_senss, m_sensss),
            Constraint::SigIneq(c) => c.sens_from_dual(p_senss, m_sensss),
        }
    }

    /// The GP-compatible form of this constraint around `x0`; signomial
    /// inequalities linearize, the others pass through.
    pub fn as_gpconstr(&self, x0: Option<&Point>) -> Result<Constraint> {
        Ok(match self {
            Constraint::PosyIneq(c) => Constraint::PosyIneq(c.as_gpconstr(x0)?),
            Constraint::MonoEq(c) => Constraint::MonoEq(c.as_gpconstr(x0)?),
            Constraint::SigIneq(c) => Constraint::PosyIneq(c.as_gpconstr(x0)?),
        })
    }

    /// Re-keys sensitivities computed on the GP form for this constraint.
    pub fn sens_from_gpconstr(&self, gpconstr: &Constraint, gp_sens: &SensMap) -> Result<SensMap> {
        match (self, gpconstr) {
            (Constraint::SigIneq(c), Constraint::PosyIneq(pa)) => c.sens_from_gpconstr(pa, gp_sens),
            _ => Ok(gp_sens.clone()),
        }
    }

    pub fn check_result(&self, primal: &Point, tol: f64) -> Result<()> {
        match self {
            Constraint::PosyIneq(c) => c.check_result(primal, tol),
            Constraint::MonoEq(c) => c.check_result(primal, tol),
            Constraint::SigIneq(c) => c.check_result(primal, tol),
        }
    }
}

impl From<PosynomialInequality> for Constraint {
    fn from(c: PosynomialInequality) -> Constraint {
        Constraint::PosyIneq(c)
    }
}

impl From<MonomialEquality> for Constraint {
    fn from(c: MonomialEquality) -> Constraint {
        Constraint::MonoEq(c)
    }
}

impl From<SignomialInequality> for Constraint {
    fn from(c: SignomialInequality) -> Constraint {
        Constraint::SigIneq(c)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::PosyIneq(c) => c.fmt(f),
            Constraint::MonoEq(c) => c.fmt(f),
            Constraint::SigIneq(c) => c.fmt(f),
        }
    }
}

/// A node in a constraint tree: a single constraint or a nested set.
#[derive(Debug, Clone)]
pub enum ConstraintNode {
    Leaf(Constraint),
    Set(ConstraintSet),
}

impl From<Constraint> for ConstraintNode {
    fn from(c: Constraint) -> ConstraintNode {
        ConstraintNode::Leaf(c)
    }
}

impl From<PosynomialInequality> for ConstraintNode {
    fn from(c: PosynomialInequality) -> ConstraintNode {
        ConstraintNode::Leaf(Constraint::PosyIneq(c))
    }
}

impl From<MonomialEquality> for ConstraintNode {
    fn from(c: MonomialEquality) -> ConstraintNode {
        ConstraintNode::Leaf(Constraint::MonoEq(c))
    }
}

impl From<SignomialInequality> for ConstraintNode {
    fn from(c: SignomialInequality) -> ConstraintNode {
        ConstraintNode::Leaf(Constraint::SigIneq(c))
    }
}

impl From<ConstraintSet> for ConstraintNode {
    fn from(s: ConstraintSet) -> ConstraintNode {
        ConstraintNode::Set(s)
    }
}

impl fmt::Display for ConstraintNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintNode::Leaf(c) => c.fmt(f),
            ConstraintNode::Set(s) => s.fmt(f),
        }
    }
}

/// An ordered tree of constraints canonicalizing to one posynomial list.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    children: Vec<ConstraintNode>,
    substitutions: SubMap,
    posymap: Vec<usize>,
}

impl ConstraintSet {
    pub fn new(children: Vec<ConstraintNode>) -> ConstraintSet {
        ConstraintSet::with_substitutions(children, SubMap::new())
    }

    /// Builds a set whose substitutions are the children's, merged in
    /// order and overridden by `subs`.
    pub fn with_substitutions(children: Vec<ConstraintNode>, subs: SubMap) -> ConstraintSet {
        let mut set = ConstraintSet {
            children,
            substitutions: SubMap::new(),
            posymap: Vec::new(),
        };
        let mut merged = SubMap::new();
        for c in set.flat() {
            merged.merge_overriding(c.substitutions());
        }
        merged.merge_overriding(&subs);
        set.substitutions = merged;
        set
    }

    /// Appends a node, absorbing its substitutions without overriding
    /// entries this set already has.
    pub fn push(&mut self, node: impl Into<ConstraintNode>) {
        let node = node.into();
        let mut merged = match &node {
            ConstraintNode::Leaf(c) => c.substitutions().clone(),
            ConstraintNode::Set(s) => s.substitutions.clone(),
        };
        merged.merge_overriding(&self.substitutions);
        self.substitutions = merged;
        self.children.push(node);
    }

    pub fn children(&self) -> &[ConstraintNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn substitutions(&self) -> &SubMap {
        &self.substitutions
    }

    pub fn substitutions_mut(&mut self) -> &mut SubMap {
        &mut self.substitutions
    }

    /// Posynomial counts per direct child from the last
    /// [`as_posyslt1`](ConstraintSet::as_posyslt1) call.
    pub fn posymap(&self) -> &[usize] {
        &self.posymap
    }

    /// Depth-first iteration over every constraint in the tree.
    pub fn flat(&self) -> Flat<'_> {
        Flat {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Depth-first iteration over every node in the tree, yielding each
    /// nested set before its contents.
    pub fn flat_with_sets(&self) -> FlatNodes<'_> {
        FlatNodes {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Canonicalizes every child, pushing this set's substitutions down,
    /// and records the per-child posynomial counts.
    pub fn as_posyslt1(&mut self) -> Result<Vec<Posynomial>> {
        self.posymap.clear();
        let subs = self.substitutions.clone();
        let mut out = Vec::new();
        for child in &mut self.children {
            let posys = match child {
                ConstraintNode::Leaf(c) => {
                    c.set_substitutions(subs.clone());
                    c.as_posyslt1()?
                }
                ConstraintNode::Set(s) => {
                    s.substitutions.merge_overriding(&subs);
                    s.as_posyslt1()?
                }
            };
            self.posymap.push(posys.len());
            out.extend(posys);
        }
        Ok(out)
    }

    /// Slices the flat dual arrays back per child and aggregates their
    /// sensitivities; variable sensitivities sum across children.
    pub fn sens_from_dual(
        &self,
        p_senss: &[f64],
        m_sensss: &[Vec<f64>],
    ) -> Result<(SensMap, VarSens)> {
        if self.posymap.len() != self.children.len() {
            return Err(ConstraintError::SensitivityShape(
                "as_posyslt1 must be called before sens_from_dual".to_string(),
            ));
        }
        let total: usize = self.posymap.iter().sum();
        if p_senss.len() != total || m_sensss.len() != total {
            return Err(ConstraintError::SensitivityShape(format!(
                "{} posynomial duals for {} posynomials",
                p_senss.len(),
                total
            )));
        }
        let mut constr_sens = SensMap::new();
        let mut var_senss = VarSens::new();
        let mut offset = 0;
        for (child, &n) in self.children.iter().zip(&self.posymap) {
            let ps = &p_senss[offset..offset + n];
            let ms = &m_sensss[offset..offset + n];
            offset += n;
            let (cs, vs) = match child {
                ConstraintNode::Leaf(c) => c.sens_from_dual(ps, ms)?,
                ConstraintNode::Set(s) => s.sens_from_dual(ps, ms)?,
            };
            constr_sens.insert_nested(child.to_string(), cs);
            merge_var_senss(&mut var_senss, &vs);
        }
        Ok((constr_sens, var_senss))
    }

    /// The GP-compatible mirror of this tree around `x0`.
    pub fn as_gpconstr(&self, x0: Option<&Point>) -> Result<ConstraintSet> {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            children.push(match child {
                ConstraintNode::Leaf(c) => ConstraintNode::Leaf(c.as_gpconstr(x0)?),
                ConstraintNode::Set(s) => ConstraintNode::Set(s.as_gpconstr(x0)?),
            });
        }
        Ok(ConstraintSet {
            children,
            substitutions: self.substitutions.clone(),
            posymap: Vec::new(),
        })
    }

    /// Re-keys sensitivities computed on the GP mirror for this tree.
    pub fn sens_from_gpconstr(
        &self,
        gpapprox: &ConstraintSet,
        gp_sens: &SensMap,
    ) -> Result<SensMap> {
        if gpapprox.children.len() != self.children.len() {
            return Err(ConstraintError::SensitivityShape(
                "GP approximation does not mirror the constraint tree".to_string(),
            ));
        }
        let mut out = SensMap::new();
        for (child, gpchild) in self.children.iter().zip(&gpapprox.children) {
            let sub_sens = match gp_sens.get(&gpchild.to_string()) {
                Some(Sens::Nested(m)) => m.clone(),
                Some(Sens::Scalar(v)) => {
                    out.insert_scalar(child.to_string(), *v);
                    continue;
                }
                None => continue,
            };
            let rekeyed = match (child, gpchild) {
                (ConstraintNode::Leaf(c), ConstraintNode::Leaf(g)) => {
                    c.sens_from_gpconstr(g, &sub_sens)?
                }
                (ConstraintNode::Set(s), ConstraintNode::Set(g)) => {
                    s.sens_from_gpconstr(g, &sub_sens)?
                }
                _ => {
                    return Err(ConstraintError::SensitivityShape(
                        "GP approximation does not mirror the constraint tree".to_string(),
                    ))
                }
            };
            out.insert_nested(child.to_string(), rekeyed);
        }
        Ok(out)
    }

    /// Best-effort post-solve checks. Violations are logged and returned
    /// as messages rather than failing the whole solve.
    pub fn process_result(&self, result: &SolverResult) -> Vec<String> {
        const TOL: f64 = 1e-4;
        let mut warnings = Vec::new();
        for c in self.flat() {
            let mut c = c.clone();
            c.set_substitutions(self.substitutions.clone());
            if let Err(e) = c.check_result(&result.primal, TOL) {
                warn!(error = %e, "constraint check failed");
                warnings.push(e.to_string());
            }
        }
        warnings
    }
}

impl FromIterator<ConstraintNode> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = ConstraintNode>>(iter: T) -> ConstraintSet {
        ConstraintSet::new(iter.into_iter().collect())
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{child}")?;
        }
        write!(f, "]")
    }
}

/// Depth-first leaf iterator over a constraint tree.
pub struct Flat<'a> {
    stack: Vec<&'a ConstraintNode>,
}

impl<'a> Iterator for Flat<'a> {
    type Item = &'a Constraint;

    fn next(&mut self) -> Option<&'a Constraint> {
        while let Some(node) = self.stack.pop() {
            match node {
                ConstraintNode::Leaf(c) => return Some(c),
                ConstraintNode::Set(s) => self.stack.extend(s.children.iter().rev()),
            }
        }
        None
    }
}

/// Depth-first node iterator over a constraint tree, sets included.
pub struct FlatNodes<'a> {
    stack: Vec<&'a ConstraintNode>,
}

impl<'a> Iterator for FlatNodes<'a> {
    type Item = &'a ConstraintNode;

    fn next(&mut self) -> Option<&'a ConstraintNode> {
        let node = self.stack.pop()?;
        if let ConstraintNode::Set(s) = node {
            self.stack.extend(s.children.iter().rev());
        }
        Some(node)
    }
}
