//! End-to-end canonicalization and sensitivity tests.

use posyforge_constraints::{
    Constraint, ConstraintError, ConstraintSet, MonomialEquality, PosynomialInequality, Sens,
    SignomialInequality, SolverResult,
};
use posyforge_core::{variable, Point, Signomial, SignomialsEnabled, SubMap, VarSpec};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
fn constant_absorption_matches_rescaled_constraint() {
    init_tracing();
    let x = variable("x");
    // 1 >= 5x + 0.5 and 1 >= 10x share a canonical form
    let lhs = x
        .as_signomial()
        .try_scale(5.0)
        .unwrap()
        .add_const(0.5)
        .unwrap();
    let mut absorbed = PosynomialInequality::geq(1.0, lhs).unwrap();
    let mut plain =
        PosynomialInequality::geq(1.0, x.as_signomial().try_scale(10.0).unwrap()).unwrap();
    assert_eq!(
        absorbed.as_posyslt1().unwrap(),
        plain.as_posyslt1().unwrap()
    );
}

#[test]
fn infeasible_constant_rejected_at_construction() {
    init_tracing();
    let x = variable("x");
    let lhs = x
        .as_signomial()
        .try_scale(5.0)
        .unwrap()
        .add_const(1.1)
        .unwrap();
    assert!(matches!(
        PosynomialInequality::geq(1.0, lhs).unwrap_err(),
        ConstraintError::InfeasibleConstant(_)
    ));
}

#[test]
fn united_inequality_canonicalizes_dimensionless() {
    init_tracing();
    // drag in newtons bounded by thrust in kilonewtons-equivalent units
    let d = VarSpec::new("D").units("N").unwrap().monomial().unwrap();
    let t = VarSpec::new("T")
        .units("kg*m/s^2")
        .unwrap()
        .monomial()
        .unwrap();
    let mut c = PosynomialInequality::leq(d, t).unwrap();
    let posys = c.as_posyslt1().unwrap();
    assert_eq!(posys.len(), 1);
    assert!(posys[0].data().units().is_dimensionless());
}

#[test]
fn monomial_equality_round_trips_duals() {
    init_tracing();
    let x = variable("x");
    let y = variable("y");
    // x == y**2
    let mut c = MonomialEquality::eq(x.clone(), y.pow(2.0)).unwrap();
    let posys = c.as_posyslt1().unwrap();
    assert_eq!(posys.len(), 2);
    // tight at x = 4, y = 2
    let mut primal = Point::new();
    primal.insert(x.varkey().unwrap(), 4.0);
    primal.insert(y.varkey().unwrap(), 2.0);
    c.check_result(&primal, 1e-9).unwrap();
    let (sens, _) = c
        .sens_from_dual(&[0.6, 0.4], &[vec![0.6], vec![0.4]])
        .unwrap();
    assert!((sens.get_scalar("x").unwrap() - 0.2).abs() < 1e-12);
}

#[test]
fn signomial_constraints_gated_by_scope() {
    init_tracing();
    let x = variable("x");
    let y = variable("y");
    assert!(matches!(
        SignomialInequality::geq(x.clone(), y.clone()).unwrap_err(),
        ConstraintError::SignomialsDisabled
    ));
    {
        let _scope = SignomialsEnabled::new();
        SignomialInequality::geq(x.clone(), y.clone()).unwrap();
    }
    // gate closes again when the scope drops
    assert!(SignomialInequality::geq(x, y).is_err());
}

#[test]
fn signomial_linearizes_around_defaults() {
    init_tracing();
    let _scope = SignomialsEnabled::new();
    let x = variable("x");
    let y = variable("y");
    // x >= 1 - y, the textbook SP constraint
    let rhs = Signomial::constant(1.0)
        .unwrap()
        .try_sub(y.as_signomial())
        .unwrap();
    let sp = SignomialInequality::geq(x.as_signomial().clone(), rhs).unwrap();

    // negy = x + y has two terms, so no direct GP form
    let mut direct = sp.clone();
    assert!(matches!(
        direct.as_posyslt1().unwrap_err(),
        ConstraintError::NotGpCompatible(_)
    ));

    // tangent at the default point (1, 1) is 2*sqrt(x*y)
    let gp = sp.as_gpconstr(None).unwrap();
    assert_eq!(gp.m_gt().to_string(), "2*x**0.5*y**0.5");
    assert_eq!(gp.posylt1_rep().to_string(), "0.5*x**-0.5*y**-0.5");
}

#[test]
fn signomial_sens_rekeys_through_approximation() {
    init_tracing();
    let _scope = SignomialsEnabled::new();
    let x = variable("x");
    let y = variable("y");
    let rhs = Signomial::constant(1.0)
        .unwrap()
        .try_sub(y.as_signomial())
        .unwrap();
    let sp = SignomialInequality::geq(x.as_signomial().clone(), rhs).unwrap();

    let mut gp = sp.as_gpconstr(None).unwrap();
    gp.as_posyslt1().unwrap();
    let (pa_sens, _) = gp.sens_from_dual(&[1.0], &[vec![1.0]]).unwrap();

    let sens = sp.sens_from_gpconstr(&gp, &pa_sens).unwrap();
    assert_eq!(sens.get_scalar("overall"), Some(1.0));
    assert_eq!(sens.get_scalar("x + y"), Some(1.0));
    match sens.get("posyapprox") {
        Some(Sens::Nested(nested)) => {
            assert_eq!(nested.get_scalar(&gp.to_string()), Some(1.0));
            assert!(nested.get_scalar(&gp.m_gt().to_string()).is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn set_partitions_and_routes_duals() {
    init_tracing();
    let x = variable("x");
    let y = variable("y");
    let k = VarSpec::new("k").value(2.0).monomial().unwrap();

    let bound = PosynomialInequality::leq(&x * &k, 1.0).unwrap();
    let tie = MonomialEquality::eq(x.clone(), y).unwrap();
    let mut set = ConstraintSet::new(vec![bound.into(), tie.into()]);

    let posys = set.as_posyslt1().unwrap();
    assert_eq!(set.posymap(), &[1, 2]);
    assert_eq!(posys.len(), 3);
    assert_eq!(posys[0].to_string(), "2*x");

    let (constr_sens, var_senss) = set
        .sens_from_dual(&[1.0, 0.5, 0.5], &[vec![1.0], vec![0.5], vec![0.5]])
        .unwrap();
    assert_eq!(constr_sens.len(), 2);
    // the fixed variable k inherits the bound's full dual
    assert_eq!(var_senss[&k.varkey().unwrap()], 1.0);
}

#[test]
fn nested_set_substitution_overrides() {
    init_tracing();
    let x = variable("x");
    let k = VarSpec::new("k").value(2.0).monomial().unwrap();
    let inner = ConstraintSet::new(vec![PosynomialInequality::leq(&x * &k, 1.0).unwrap().into()]);
    let mut parent_subs = SubMap::new();
    parent_subs.insert(k.varkey().unwrap(), 4.0);
    let mut outer = ConstraintSet::with_substitutions(vec![inner.into()], parent_subs);
    let posys = outer.as_posyslt1().unwrap();
    assert_eq!(posys[0].to_string(), "4*x");
}

#[test]
fn gp_mirror_of_mixed_tree() {
    init_tracing();
    let _scope = SignomialsEnabled::new();
    let x = variable("x");
    let y = variable("y");
    let rhs = Signomial::constant(1.0)
        .unwrap()
        .try_sub(y.as_signomial())
        .unwrap();
    let sp = SignomialInequality::geq(x.as_signomial().clone(), rhs).unwrap();
    let gpable = PosynomialInequality::leq(x, 1.0).unwrap();

    let set = ConstraintSet::new(vec![sp.into(), gpable.into()]);
    let mut mirror = set.as_gpconstr(None).unwrap();
    // every node in the mirror is GP-compatible
    let posys = mirror.as_posyslt1().unwrap();
    assert_eq!(posys.len(), 2);
    assert!(mirror
        .flat()
        .all(|c| matches!(c, Constraint::PosyIneq(_))));
}

#[test]
fn process_result_reports_violations_without_failing() {
    init_tracing();
    let x = variable("x");
    let mut set = ConstraintSet::new(vec![PosynomialInequality::leq(x.clone(), 1.0)
        .unwrap()
        .into()]);
    set.as_posyslt1().unwrap();

    let mut result = SolverResult::default();
    result.primal.insert(x.varkey().unwrap(), 1.5);
    let warnings = set.process_result(&result);
    assert_eq!(warnings.len(), 1);

    result.primal.insert(x.varkey().unwrap(), 0.9);
    assert!(set.process_result(&result).is_empty());
}
