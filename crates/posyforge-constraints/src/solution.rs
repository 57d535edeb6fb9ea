//! Solver results.

use posyforge_core::Point;

/// A primal/dual solution as returned by a GP solver backend, shaped to
/// match the posynomial list a constraint set canonicalized to.
#[derive(Debug, Clone, Default)]
pub struct SolverResult {
    /// Optimal variable values.
    pub primal: Point,
    /// One dual value per canonical posynomial.
    pub p_senss: Vec<f64>,
    /// Per-monomial dual values within each posynomial.
    pub m_sensss: Vec<Vec<f64>>,
}
