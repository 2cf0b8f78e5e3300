//! End-to-end scenarios for the normaliser, the extractor and the clusters.
//!
//! Everything here goes through the public API only, on models declared with
//! the bundled symbol table.

use std::collections::BTreeSet;

use pne_rs::abstraction::BoolAbstraction;
use pne_rs::extractor::{ExtractorConfig, PredicateExtractor};
use pne_rs::hierarchy::{AssignKind, FlatHierarchy};
use pne_rs::node::{BinaryOp, Node, UnaryOp};
use pne_rs::normaliser::PredicateNormaliser;
use pne_rs::reference::{Context, ExprRef};
use pne_rs::store::ExprStore;
use pne_rs::symb_table::SymbTable;
use pne_rs::types::SymbType;
use pne_rs::PneError;

/// `a, x, y : 0..3; b, c : boolean; m.z : 0..3` and `m.d := z + 1`.
fn model(store: &ExprStore) -> SymbTable<'_> {
    let mut st = SymbTable::new(store);
    for name in ["a", "x", "y", "m.z"] {
        st.declare_var(store.mk_name(name), SymbType::range(0, 3));
    }
    for name in ["b", "c"] {
        st.declare_var(store.mk_name(name), SymbType::Boolean);
    }
    let m = Context::new(store.mk_atom("m"));
    st.declare_define(
        store.mk_name("m.d"),
        store.mk_plus(store.mk_atom("z"), store.mk_number(1)),
        m,
    );
    st
}

/// No scalar operator of `e` has a conditional operand.
fn is_predicate_normal(store: &ExprStore, e: ExprRef) -> bool {
    let node = store.node(e);
    let scalar_op = match node {
        Node::Binary(op, ..) => !op.is_connective() && !op.is_temporal(),
        Node::Unary(op, _) => op != UnaryOp::Not && !op.is_temporal(),
        Node::BitSelect(..) | Node::WaWrite(..) => true,
        _ => false,
    };
    node.children()
        .into_iter()
        .all(|c| !(scalar_op && store.is_case(c)) && is_predicate_normal(store, c))
}

// ─── Scenario Tests ────────────────────────────────────────────────────────────

#[test]
fn conditional_comparison_end_to_end() {
    let store = ExprStore::default();
    let st = model(&store);
    let (a, b) = (store.mk_atom("a"), store.mk_atom("b"));
    let (one, two) = (store.mk_number(1), store.mk_number(2));
    let a1 = store.mk_plus(a, one);
    let e = store.mk_equal(store.mk_case(b, a, a1), two);

    let mut pn = PredicateNormaliser::new(&store, &st);
    let normal = pn.normalise_expr(e, true).unwrap();
    let p1 = store.mk_equal(a, two);
    let p2 = store.mk_equal(a1, two);
    assert_eq!(normal, store.mk_case(b, p1, p2));

    let mut pe = PredicateExtractor::new(&store, &st);
    let res = pe.compute_preds(e).unwrap();
    assert_eq!(res, BoolAbstraction::from_set(BTreeSet::from([p1, p2])));

    let clusters = pe.all_clusters().unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(pe.cluster_vars(clusters[0]), &BTreeSet::from([a]));
    assert_eq!(pe.var_cluster(a).unwrap(), Some(clusters[0]));
    assert_eq!(pe.var_cluster(b).unwrap(), None);
}

#[test]
fn constant_comparison_and_modulo() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pe = PredicateExtractor::new(&store, &st);

    let five = store.mk_number(5);
    assert_eq!(pe.compute_preds(store.mk_equal(five, five)).unwrap(), BoolAbstraction::ConstantTrue);

    let x_mod_2 = store.mk_binary(BinaryOp::Mod, store.mk_atom("x"), store.mk_number(2));
    assert_eq!(pe.compute_preds(x_mod_2).unwrap(), BoolAbstraction::singleton(x_mod_2));
}

#[test]
fn definitions_in_a_module_context() {
    let store = ExprStore::default();
    let st = model(&store);
    let m = Context::new(store.mk_atom("m"));
    // Inside m: d = 2, i.e. z + 1 = 2 for the qualified z.
    let e = store.mk_equal(store.mk_atom("d"), store.mk_number(2));

    let mut pn = PredicateNormaliser::new(&store, &st);
    let z = store.mk_name("m.z");
    let expected = store.mk_equal(store.mk_plus(z, store.mk_number(1)), store.mk_number(2));
    assert_eq!(pn.normalise(e, m, true).unwrap(), expected);
    assert_eq!(
        pn.normalise(e, m, false).unwrap(),
        store.mk_equal(store.mk_name("m.d"), store.mk_number(2))
    );

    let mut pe = PredicateExtractor::new(&store, &st);
    pe.extract(e, m).unwrap();
    assert_eq!(pe.all_preds(), &BTreeSet::from([expected]));
    let id = pe.var_cluster(z).unwrap().unwrap();
    assert_eq!(pe.cluster_preds(id), &BTreeSet::from([expected]));
}

// ─── Property Tests ────────────────────────────────────────────────────────────

fn sample_exprs(store: &ExprStore) -> Vec<ExprRef> {
    let (a, x, y) = (store.mk_atom("a"), store.mk_atom("x"), store.mk_atom("y"));
    let (b, c) = (store.mk_atom("b"), store.mk_atom("c"));
    let n = |v: i64| store.mk_number(v);
    let inner = store.mk_case(c, store.mk_plus(x, n(1)), y);
    vec![
        store.mk_equal(store.mk_case(b, a, store.mk_plus(a, n(1))), n(2)),
        store.mk_binary(BinaryOp::Lt, store.mk_plus(store.mk_case(b, inner, a), x), n(3)),
        store.mk_or(store.mk_equal(a, x), store.mk_and(b, store.mk_binary(BinaryOp::Ge, y, n(1)))),
        store.mk_equal(store.mk_plus(store.mk_binary(BinaryOp::NotEqual, a, x), n(5)), n(6)),
        store.mk_plus(store.mk_case(b, a, x), store.mk_case(c, y, n(0))),
    ]
}

#[test]
fn normalisation_is_idempotent() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pn = PredicateNormaliser::new(&store, &st);
    for e in sample_exprs(&store) {
        let once = pn.normalise_expr(e, true).unwrap();
        let twice = pn.normalise_expr(once, true).unwrap();
        assert_eq!(once, twice, "not idempotent on {}", store.display(e));
    }
}

#[test]
fn normal_form_has_no_conditional_operands() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pn = PredicateNormaliser::new(&store, &st);
    for e in sample_exprs(&store) {
        let normal = pn.normalise_expr(e, true).unwrap();
        assert!(
            is_predicate_normal(&store, normal),
            "{} is not predicate-normal",
            store.display(normal)
        );
    }
}

#[test]
fn extraction_is_memoised() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pe = PredicateExtractor::new(&store, &st);
    for e in sample_exprs(&store) {
        let first = pe.compute_preds(e).unwrap();
        let universe = pe.all_preds().clone();
        let second = pe.compute_preds(e).unwrap();
        assert_eq!(first, second);
        assert_eq!(pe.all_preds(), &universe);
    }
}

#[test]
fn clusters_partition_the_universe() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pe = PredicateExtractor::new(&store, &st);
    for e in sample_exprs(&store) {
        pe.compute_preds(e).unwrap();
    }

    let ids = pe.all_clusters().unwrap();
    pe.clusters().check_invariants();

    let mut seen = BTreeSet::new();
    let mut preds = BTreeSet::new();
    for &id in &ids {
        for &var in pe.cluster_vars(id) {
            assert!(seen.insert(var), "{} in two clusters", store.display(var));
        }
        preds.extend(pe.cluster_preds(id).iter().copied());
    }
    assert_eq!(&preds, pe.all_preds());
}

#[test]
fn predicates_over_constants_join_no_cluster() {
    let store = ExprStore::default();
    let mut st = model(&store);
    let (c1, c2, k) = (store.mk_atom("c1"), store.mk_atom("c2"), store.mk_atom("k"));
    st.declare_constant(c1);
    st.declare_constant(c2);
    st.declare_define(k, c1, Context::ROOT);
    let (a, x, y) = (store.mk_atom("a"), store.mk_atom("x"), store.mk_atom("y"));

    let mut pe = PredicateExtractor::new(&store, &st);
    let same = store.mk_equal(c1, c2);
    let differ = store.mk_binary(BinaryOp::NotEqual, c1, c2);
    pe.compute_preds(same).unwrap();
    pe.compute_preds(store.mk_binary(BinaryOp::NotEqual, k, c2)).unwrap();
    pe.compute_preds(store.mk_equal(a, store.mk_number(1))).unwrap();
    pe.compute_preds(store.mk_binary(BinaryOp::Lt, x, y)).unwrap();
    assert!(pe.all_preds().contains(&same));
    assert!(pe.all_preds().contains(&differ));
    assert_eq!(pe.all_preds().len(), 4);

    let ids = pe.all_clusters().unwrap();
    pe.clusters().check_invariants();
    assert_eq!(ids.len(), 2);
    assert_eq!(pe.var_cluster(c1).unwrap(), None);

    let mut seen = BTreeSet::new();
    let mut preds = BTreeSet::new();
    for &id in &ids {
        for &var in pe.cluster_vars(id) {
            assert!(seen.insert(var), "{} in two clusters", store.display(var));
        }
        preds.extend(pe.cluster_preds(id).iter().copied());
    }
    assert_eq!(seen, BTreeSet::from([a, x, y]));
    let clustered: BTreeSet<ExprRef> = pe.all_preds().iter().copied().filter(|&p| p != same && p != differ).collect();
    assert_eq!(preds, clustered);
}

#[test]
fn constant_operands_short_circuit() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pe = PredicateExtractor::new(&store, &st);
    let (one, two) = (store.mk_number(1), store.mk_number(2));
    let falsy = store.mk_equal(one, two);
    let truthy = store.mk_equal(two, two);
    let other = store.mk_equal(store.mk_atom("a"), one);

    assert_eq!(pe.compute_preds(store.mk_and(falsy, other)).unwrap(), BoolAbstraction::ConstantFalse);
    assert_eq!(pe.compute_preds(store.mk_or(truthy, other)).unwrap(), BoolAbstraction::ConstantTrue);
    assert!(pe.all_preds().is_empty());
}

#[test]
fn large_products_are_over_approximated() {
    let store = ExprStore::default();
    let st = model(&store);
    let (a, x, b, c) = (store.mk_atom("a"), store.mk_atom("x"), store.mk_atom("b"), store.mk_atom("c"));
    let one = store.mk_number(1);
    let sum = store.mk_plus(
        store.mk_case(b, a, store.mk_plus(a, one)),
        store.mk_case(c, x, store.mk_plus(x, one)),
    );
    let e = store.mk_equal(sum, store.mk_number(2));

    let config = ExtractorConfig {
        use_approx: true,
        threshold: 2,
    };
    let mut pe = PredicateExtractor::with_config(&store, &st, config);
    assert_eq!(pe.compute_preds(e).unwrap(), BoolAbstraction::OverApproximated);
    assert!(pe.all_preds().is_empty());

    let mut pe = PredicateExtractor::new(&store, &st);
    let res = pe.compute_preds(e).unwrap();
    assert_eq!(res.predicates().map(|s| s.len()), Some(4));
    assert_eq!(pe.all_preds().len(), 4);
}

// ─── Error Tests ───────────────────────────────────────────────────────────────

#[test]
fn failed_extraction_leaves_no_trace() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pe = PredicateExtractor::new(&store, &st);
    let good = store.mk_equal(store.mk_atom("a"), store.mk_number(1));
    let bad = store.mk_equal(store.mk_atom("ghost"), store.mk_number(1));

    pe.compute_preds(store.mk_equal(store.mk_atom("x"), store.mk_number(0))).unwrap();
    let universe = pe.all_preds().clone();
    let entries = pe.memo().len();

    let err = pe.compute_preds(store.mk_or(good, bad)).unwrap_err();
    assert!(matches!(err, PneError::UndefinedSymbol(_)));
    assert_eq!(pe.all_preds(), &universe);
    assert_eq!(pe.memo().len(), entries);
    assert_eq!(pe.all_clusters().unwrap().len(), 1);
}

#[test]
fn undefined_symbols_are_reported() {
    let store = ExprStore::default();
    let st = model(&store);
    let mut pn = PredicateNormaliser::new(&store, &st);
    let e = store.mk_plus(store.mk_atom("ghost"), store.mk_number(1));
    assert!(matches!(pn.normalise_expr(e, true), Err(PneError::UndefinedSymbol(_))));
}

// ─── Hierarchy Tests ───────────────────────────────────────────────────────────

#[test]
fn hierarchy_sections_and_assignments() {
    let store = ExprStore::default();
    let st = model(&store);
    let (a, x, y, b) = (store.mk_atom("a"), store.mk_atom("x"), store.mk_atom("y"), store.mk_atom("b"));
    let n = |v: i64| store.mk_number(v);

    let mut fh = FlatHierarchy::new();
    fh.init.push(store.mk_equal(a, n(0)));
    fh.invar.push(store.mk_binary(BinaryOp::Le, x, y));
    fh.justice.push(b);
    fh.assign(AssignKind::Next, a, store.mk_case(b, x, n(3)));
    fh.assign(AssignKind::Init, y, n(1));

    let mut pe = PredicateExtractor::new(&store, &st);
    pe.extract_from_hierarchy(&fh).unwrap();

    let next_a = store.mk_next(a);
    let init_y = store.mk_unary(UnaryOp::Init, y);
    let expected = BTreeSet::from([
        store.mk_equal(a, n(0)),
        store.mk_binary(BinaryOp::Le, x, y),
        store.mk_binary(BinaryOp::EqDef, next_a, x),
        store.mk_binary(BinaryOp::EqDef, next_a, n(3)),
        store.mk_binary(BinaryOp::EqDef, init_y, n(1)),
    ]);
    assert_eq!(pe.all_preds(), &expected);

    // next(a) := x ties a and x; x <= y ties x and y.
    let ids = pe.all_clusters().unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(pe.cluster_vars(ids[0]), &BTreeSet::from([a, x, y]));

    let mut out = Vec::new();
    pe.write_report(&mut out, false, true).unwrap();
    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("x : 0..3"));
    assert!(!report.contains("Predicates"));
}
