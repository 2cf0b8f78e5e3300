//! # Predicate extractor
//!
//! Computes, for every sub-expression, a [`BoolAbstraction`]: either a flag
//! (constant, arbitrary, over-approximated) or the set of scalar expressions
//! the sub-expression may evaluate to. Scalar operators are applied to the
//! Cartesian product of their operands' sets, so conditionals need not be
//! normalised away first:
//!
//! ```text
//! (b ? a : a + 1) = 2   ~>   {a = 2, (a + 1) = 2}
//! ```
//!
//! Every comparison between scalars obtained this way is a *complete
//! predicate* and joins the predicate universe of the extractor, unless it
//! folded down to `TRUE` or `FALSE`. Predicates are then grouped by
//! [`Clusters`] over their variables, lazily, whenever clusters are queried.
//!
//! Products larger than [`ExtractorConfig::threshold`] are not materialised:
//! the result is [`OverApproximated`][BoolAbstraction::OverApproximated].
//!
//! A top-level [`extract`][PredicateExtractor::extract] is atomic: when it
//! fails, neither the memo nor the predicate universe keep anything of it.
//!
//! ```
//! use pne_rs::abstraction::BoolAbstraction;
//! use pne_rs::extractor::PredicateExtractor;
//! use pne_rs::store::ExprStore;
//! use pne_rs::symb_table::SymbTable;
//! use pne_rs::types::SymbType;
//!
//! let store = ExprStore::default();
//! let mut st = SymbTable::new(&store);
//! let a = store.mk_atom("a");
//! st.declare_var(a, SymbType::range(0, 3));
//!
//! let mut pe = PredicateExtractor::new(&store, &st);
//! let five = store.mk_number(5);
//! assert_eq!(pe.compute_preds(store.mk_equal(five, five)).unwrap(), BoolAbstraction::ConstantTrue);
//!
//! let pred = store.mk_equal(a, store.mk_number(2));
//! pe.compute_preds(pred).unwrap();
//! assert!(pe.all_preds().contains(&pred));
//! ```

use std::collections::BTreeSet;
use std::io::Write;

use log::{debug, info, trace};

use crate::abstraction::BoolAbstraction;
use crate::abstraction::BoolAbstraction::*;
use crate::cluster::{ClusterId, Clusters};
use crate::error::{PneError, Result};
use crate::hierarchy::FlatHierarchy;
use crate::memo::Memo;
use crate::node::{BinaryOp, Node, UnaryOp};
use crate::oracle::{ResolvedSymbol, SymbolOracle};
use crate::reference::{Context, ExprRef};
use crate::store::ExprStore;

/// Largest Cartesian product the extractor materialises by default.
pub const OVER_APPROX_THRESHOLD: usize = 600_000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ExtractorConfig {
    /// Give up on products larger than `threshold`.
    pub use_approx: bool,
    pub threshold: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            use_approx: true,
            threshold: OVER_APPROX_THRESHOLD,
        }
    }
}

/// What the running top-level call has written so far.
#[derive(Debug, Default)]
struct Journal {
    memo_keys: Vec<(Context, ExprRef)>,
    preds: BTreeSet<ExprRef>,
}

pub struct PredicateExtractor<'s, O> {
    store: &'s ExprStore,
    oracle: &'s O,
    config: ExtractorConfig,
    memo: Memo<(Context, ExprRef), BoolAbstraction>,
    all_preds: BTreeSet<ExprRef>,
    unclustered: BTreeSet<ExprRef>,
    clusters: Clusters,
    journal: Journal,
}

impl<'s, O> PredicateExtractor<'s, O>
where
    O: SymbolOracle,
{
    pub fn new(store: &'s ExprStore, oracle: &'s O) -> Self {
        Self::with_config(store, oracle, ExtractorConfig::default())
    }

    pub fn with_config(store: &'s ExprStore, oracle: &'s O, config: ExtractorConfig) -> Self {
        Self {
            store,
            oracle,
            config,
            memo: Memo::new(),
            all_preds: BTreeSet::new(),
            unclustered: BTreeSet::new(),
            clusters: Clusters::new(),
            journal: Journal::default(),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn memo(&self) -> &Memo<(Context, ExprRef), BoolAbstraction> {
        &self.memo
    }

    /// Extracts the predicates of `expr` read in `ctx`.
    ///
    /// On success the new predicates join the universe (and wait to be
    /// clustered). On failure, everything computed by this call is dropped.
    pub fn extract(&mut self, expr: ExprRef, ctx: Context) -> Result<BoolAbstraction> {
        debug_assert!(self.journal.memo_keys.is_empty() && self.journal.preds.is_empty());

        let res = self.compute(expr, ctx);
        let journal = std::mem::take(&mut self.journal);
        match res {
            Ok(res) => {
                if !journal.preds.is_empty() {
                    debug!("{} new predicates from {}", journal.preds.len(), self.store.display(expr));
                }
                for pred in journal.preds {
                    self.all_preds.insert(pred);
                    self.unclustered.insert(pred);
                }
                Ok(res)
            }
            Err(err) => {
                debug!(
                    "extraction of {} failed, dropping {} memo entries",
                    self.store.display(expr),
                    journal.memo_keys.len()
                );
                for key in &journal.memo_keys {
                    self.memo.remove(key);
                }
                Err(err)
            }
        }
    }

    /// Extracts the predicates of a context-free expression.
    pub fn compute_preds(&mut self, expr: ExprRef) -> Result<BoolAbstraction> {
        self.extract(expr, Context::ROOT)
    }

    /// Extracts the predicates of every constraint and every assignment of
    /// a flat model. An assignment `lhs := rhs` is read as the comparison
    /// it enforces.
    pub fn extract_from_hierarchy(&mut self, fh: &FlatHierarchy) -> Result<()> {
        for expr in fh.constraints() {
            self.compute_preds(expr)?;
        }
        for assign in &fh.assigns {
            let expr = self.store.mk_binary(BinaryOp::EqDef, assign.target(self.store), assign.value);
            self.compute_preds(expr)?;
        }
        Ok(())
    }

    /// Every complete predicate extracted so far.
    pub fn all_preds(&self) -> &BTreeSet<ExprRef> {
        &self.all_preds
    }

    /// Predicates not yet folded into the clusters.
    pub fn unclustered_preds(&self) -> &BTreeSet<ExprRef> {
        &self.unclustered
    }

    /// Clusters as of the last recomputation.
    pub fn clusters(&self) -> &Clusters {
        &self.clusters
    }

    /// Folds the pending predicates into the clusters.
    ///
    /// Supports are computed for all pending predicates before any cluster
    /// is touched, so a failing dependency query leaves the clusters as
    /// they were. Predicates over constants only are skipped.
    pub fn recompute_clusters(&mut self) -> Result<()> {
        if self.unclustered.is_empty() {
            return Ok(());
        }

        let mut supports = Vec::with_capacity(self.unclustered.len());
        for &pred in &self.unclustered {
            let deps = self.oracle.free_variables(pred)?;
            supports.push((pred, deps));
        }

        let pending = supports.len();
        for (pred, deps) in supports {
            if deps.is_empty() {
                debug!("predicate {} has no variables, not clustered", self.store.display(pred));
                continue;
            }
            self.clusters.add_predicate(pred, &deps);
        }
        self.unclustered.clear();

        info!("clustered {} predicates into {} clusters", pending, self.clusters.len());
        Ok(())
    }

    /// All live clusters, after folding in the pending predicates.
    pub fn all_clusters(&mut self) -> Result<Vec<ClusterId>> {
        self.recompute_clusters()?;
        Ok(self.clusters.ids().collect())
    }

    /// The cluster of `var`, after folding in the pending predicates.
    pub fn var_cluster(&mut self, var: ExprRef) -> Result<Option<ClusterId>> {
        self.recompute_clusters()?;
        Ok(self.clusters.cluster_of(var))
    }

    pub fn cluster_vars(&self, id: ClusterId) -> &BTreeSet<ExprRef> {
        self.clusters.vars(id)
    }

    /// Predicates of a cluster.
    ///
    /// # Panics
    ///
    /// Panics if predicates were extracted since the clusters were last
    /// computed, or if `id` was retired by a merge.
    pub fn cluster_preds(&self, id: ClusterId) -> &BTreeSet<ExprRef> {
        assert!(
            self.unclustered.is_empty(),
            "Cluster predicates queried with {} predicates pending",
            self.unclustered.len()
        );
        self.clusters.preds(id)
    }

    /// Writes the predicates, the clusters, or the clusters together with
    /// their predicates.
    pub fn write_report<W: Write>(&mut self, out: &mut W, print_preds: bool, print_clusters: bool) -> Result<()> {
        let store = self.store;

        if !print_clusters {
            if print_preds {
                writeln!(out, "Predicates:")?;
                for &pred in &self.all_preds {
                    writeln!(out, "  {}", store.display(pred))?;
                }
            }
            return Ok(());
        }

        for (num, id) in self.all_clusters()?.into_iter().enumerate() {
            writeln!(out, "Cluster {} [", num)?;
            for &var in self.clusters.vars(id) {
                let ty = self.oracle.type_of(var, Context::ROOT)?;
                writeln!(out, "  {} : {}", store.display(var), ty)?;
            }
            writeln!(out, "]")?;
            if print_preds {
                writeln!(out, "Predicates of cluster {} (", num)?;
                for &pred in self.clusters.preds(id) {
                    writeln!(out, "  {}", store.display(pred))?;
                }
                writeln!(out, ")")?;
            }
        }
        Ok(())
    }

    fn compute(&mut self, expr: ExprRef, ctx: Context) -> Result<BoolAbstraction> {
        let key = (ctx, expr);
        if let Some(res) = self.memo.get(&key) {
            return Ok(res.clone());
        }

        trace!("extract: {} in {}", self.store.display(expr), ctx);
        let res = self.compute_node(expr, ctx)?;
        trace!("extracted: {} -> {:?}", self.store.display(expr), res);

        self.memo.insert(key, res.clone());
        self.journal.memo_keys.push(key);
        Ok(res)
    }

    fn compute_node(&mut self, expr: ExprRef, ctx: Context) -> Result<BoolAbstraction> {
        let store = self.store;
        let ty = self.oracle.type_of(expr, ctx)?;
        if ty.is_error() {
            return Err(PneError::IllTyped(store.to_string(expr), "no type".to_string()));
        }

        let res = match store.node(expr) {
            Node::Context(scope, body) => self.compute(body, store.concat_contexts(ctx, scope))?,

            Node::Failure => {
                return Err(PneError::Unsupported(format!(
                    "{} outside of a case tail",
                    store.display(expr)
                )))
            }
            Node::True => ConstantTrue,
            Node::False => ConstantFalse,
            Node::Number(_) | Node::Word { .. } | Node::Real { .. } | Node::Range(..) => {
                BoolAbstraction::singleton(expr)
            }

            Node::Atom(_) | Node::Dot(..) | Node::Array(..) => {
                let sym = self.oracle.resolve(expr, ctx)?;
                if sym.is_undefined() && matches!(store.node(expr), Node::Array(..)) {
                    let flat = self.oracle.flatten(expr, ctx)?;
                    assert_ne!(flat, expr, "Flattening must expand an unresolved array access");
                    self.compute(flat, Context::ROOT)?
                } else {
                    match sym {
                        ResolvedSymbol::Variable { name } => {
                            if ty.is_boolean() {
                                Arbitrary
                            } else {
                                BoolAbstraction::singleton(name)
                            }
                        }
                        ResolvedSymbol::Define { body, context, .. } => self.compute(body, context)?,
                        ResolvedSymbol::Constant { name } | ResolvedSymbol::Function { name } => {
                            BoolAbstraction::singleton(name)
                        }
                        ResolvedSymbol::Parameter { actual, context, .. } => self.compute(actual, context)?,
                        ResolvedSymbol::Undefined { name } => {
                            return Err(PneError::UndefinedSymbol(store.to_string(name)))
                        }
                    }
                }
            }

            Node::Unary(op, a) => self.compute_unary(expr, op, a, ctx, ty.is_boolean())?,

            Node::Binary(op, l, r) if op.is_temporal() => {
                if self.compute(l, ctx)?.is_over_approximated() {
                    OverApproximated
                } else {
                    self.compute(r, ctx)?;
                    Arbitrary
                }
            }

            Node::Binary(op, l, r) if op.is_connective() && ty.is_boolean() => {
                let left = self.compute(l, ctx)?;
                if left.is_over_approximated() {
                    return Ok(OverApproximated);
                }
                match (op, left.truth()) {
                    (BinaryOp::And, ConstantFalse) => ConstantFalse,
                    (BinaryOp::Or, ConstantTrue) => ConstantTrue,
                    (BinaryOp::Implies, ConstantFalse) => ConstantTrue,
                    _ => {
                        let right = self.compute(r, ctx)?;
                        match op {
                            BinaryOp::And => left.and(&right),
                            BinaryOp::Or => left.or(&right),
                            BinaryOp::Implies => left.implies(&right),
                            BinaryOp::Xor => left.not_equal(&right),
                            _ => left.equal(&right),
                        }
                    }
                }
            }

            Node::Binary(op, l, r) if op.is_relational() => self.compute_relational(expr, op, l, r, ctx)?,

            Node::Binary(BinaryOp::Union, l, r) => {
                let left = self.compute(l, ctx)?;
                if left.is_over_approximated() {
                    return Ok(OverApproximated);
                }
                let right = self.compute(r, ctx)?;
                if right.is_over_approximated() {
                    OverApproximated
                } else if ty.is_boolean_like() {
                    let (lt, rt) = (left.truth(), right.truth());
                    if lt == rt {
                        lt
                    } else {
                        Arbitrary
                    }
                } else {
                    match (left.predicates(), right.predicates()) {
                        (Some(ls), Some(rs)) => BoolAbstraction::from_set(ls.union(rs).copied().collect()),
                        _ => self.flat_singleton(expr, ctx)?,
                    }
                }
            }

            Node::Binary(BinaryOp::WaRead, ..) if ty.is_boolean() => OverApproximated,

            // Remaining binary operators are scalar: arithmetic, shifts,
            // word connectives, concatenation, resizing and array reads.
            Node::Binary(op, l, r) => {
                let left = self.operand(l, ctx)?;
                if left.is_over_approximated() {
                    return Ok(OverApproximated);
                }
                let right = self.operand(r, ctx)?;
                match (left.predicates(), right.predicates()) {
                    _ if right.is_over_approximated() => OverApproximated,
                    (Some(ls), Some(rs)) => self.apply_product(&[ls, rs], |ops| store.resolve_binary(op, ops[0], ops[1])),
                    _ => self.flat_singleton(expr, ctx)?,
                }
            }

            Node::BitSelect(w, hi, lo) => {
                let word = self.operand(w, ctx)?;
                match word {
                    OverApproximated => OverApproximated,
                    Predicates(words) => {
                        let hi = store.simplify(self.oracle.flatten(hi, ctx)?);
                        let lo = store.simplify(self.oracle.flatten(lo, ctx)?);
                        BoolAbstraction::from_set(words.iter().map(|&w| store.resolve_bit_select(w, hi, lo)).collect())
                    }
                    _ => self.flat_singleton(expr, ctx)?,
                }
            }

            Node::WaWrite(a, i, v) => {
                let mut sets = Vec::with_capacity(3);
                for e in [a, i, v] {
                    match self.operand(e, ctx)? {
                        OverApproximated => return Ok(OverApproximated),
                        res => sets.push(res),
                    }
                }
                match (sets[0].predicates(), sets[1].predicates(), sets[2].predicates()) {
                    (Some(arrays), Some(indices), Some(values)) => {
                        self.apply_product(&[arrays, indices, values], |ops| store.mk_wawrite(ops[0], ops[1], ops[2]))
                    }
                    _ => self.flat_singleton(expr, ctx)?,
                }
            }

            Node::Case(c, t, tail) => {
                // The condition is simplified first, which needs it context-free.
                let cond = store.simplify(self.oracle.flatten(c, ctx)?);
                let cond = self.compute(cond, Context::ROOT)?;
                match cond.truth() {
                    OverApproximated => OverApproximated,
                    ConstantTrue => self.compute(t, ctx)?,
                    _ if store.is_failure(tail) => self.compute(t, ctx)?,
                    ConstantFalse => self.compute(tail, ctx)?,
                    _ => {
                        let then = self.compute(t, ctx)?;
                        if then.is_over_approximated() {
                            return Ok(OverApproximated);
                        }
                        let tail = self.compute(tail, ctx)?;
                        if tail.is_over_approximated() {
                            OverApproximated
                        } else if ty.is_boolean() {
                            let (tt, et) = (then.truth(), tail.truth());
                            if tt == et {
                                tt
                            } else {
                                Arbitrary
                            }
                        } else {
                            // A flag branch adds nothing to the values of the other.
                            match (then, tail) {
                                (Predicates(ts), Predicates(es)) => {
                                    BoolAbstraction::from_set(ts.union(&es).copied().collect())
                                }
                                (then @ Predicates(_), _) => then,
                                (_, tail) => tail,
                            }
                        }
                    }
                }
            }

            Node::Function(_, args) => {
                let mut over = false;
                for arg in args {
                    if self.compute(arg, ctx)?.is_over_approximated() {
                        over = true;
                        break;
                    }
                }
                if over {
                    OverApproximated
                } else if ty.is_boolean() {
                    Arbitrary
                } else {
                    self.flat_singleton(expr, ctx)?
                }
            }

            Node::Count(args) => {
                let mut over = false;
                for arg in args {
                    if self.compute(arg, ctx)?.is_over_approximated() {
                        over = true;
                        break;
                    }
                }
                if over {
                    OverApproximated
                } else {
                    self.flat_singleton(expr, ctx)?
                }
            }
        };

        Ok(res)
    }

    fn compute_unary(
        &mut self,
        expr: ExprRef,
        op: UnaryOp,
        a: ExprRef,
        ctx: Context,
        boolean: bool,
    ) -> Result<BoolAbstraction> {
        let store = self.store;

        if op.is_temporal() {
            self.compute(a, ctx)?;
            return Ok(Arbitrary);
        }

        let res = match op {
            UnaryOp::Not if boolean => !self.compute(a, ctx)?,
            UnaryOp::Next | UnaryOp::Init => {
                let child = self.compute(a, ctx)?;
                if boolean && !matches!(child, Predicates(_)) {
                    // A truth value is the same in every state.
                    child
                } else {
                    self.apply_unary(op, &child)
                }
            }
            UnaryOp::CastBool => {
                let word = self.operand(a, ctx)?;
                let res = match word.predicates() {
                    Some(words) => {
                        let one = BTreeSet::from([store.mk_word1(true)]);
                        self.apply_product(&[words, &one], |ops| store.resolve_binary(BinaryOp::Equal, ops[0], ops[1]))
                    }
                    None => OverApproximated,
                };
                self.fix_any_preds(res)
            }
            UnaryOp::CastWord1 => {
                let bits = match self.compute(a, ctx)?.truth() {
                    OverApproximated => return Ok(OverApproximated),
                    ConstantTrue => BTreeSet::from([store.mk_word1(true)]),
                    ConstantFalse => BTreeSet::from([store.mk_word1(false)]),
                    _ => BTreeSet::from([store.mk_word1(false), store.mk_word1(true)]),
                };
                BoolAbstraction::from_set(bits)
            }
            UnaryOp::CastSigned | UnaryOp::CastUnsigned | UnaryOp::ToInt => {
                let child = self.operand(a, ctx)?;
                match child {
                    OverApproximated => OverApproximated,
                    Predicates(_) => self.apply_unary(op, &child),
                    _ => self.flat_singleton(expr, ctx)?,
                }
            }
            // Bitwise not, negation, floor, typeof.
            _ => {
                let child = self.operand(a, ctx)?;
                self.apply_unary(op, &child)
            }
        };
        Ok(res)
    }

    fn compute_relational(
        &mut self,
        expr: ExprRef,
        op: BinaryOp,
        l: ExprRef,
        r: ExprRef,
        ctx: Context,
    ) -> Result<BoolAbstraction> {
        let store = self.store;
        let lt = self.oracle.type_of(l, ctx)?;
        let rt = self.oracle.type_of(r, ctx)?;

        let left = self.operand(l, ctx)?;
        if left.is_over_approximated() {
            return Ok(OverApproximated);
        }
        let right = self.operand(r, ctx)?;
        if right.is_over_approximated() {
            return Ok(OverApproximated);
        }

        if lt.is_boolean_like() && rt.is_boolean_like() {
            let res = match op {
                BinaryOp::NotEqual => left.not_equal(&right),
                BinaryOp::Lt => left.less(&right),
                BinaryOp::Gt => right.less(&left),
                BinaryOp::Le => left.less_eq(&right),
                BinaryOp::Ge => right.less_eq(&left),
                // Equal, EqDef, SetIn
                _ => left.equal(&right),
            };
            return Ok(res);
        }

        let res = match (left.predicates(), right.predicates()) {
            (Some(ls), Some(rs)) => self.apply_product(&[ls, rs], |ops| store.resolve_binary(op, ops[0], ops[1])),
            _ => self.flat_singleton(expr, ctx)?,
        };
        Ok(self.fix_any_preds(res))
    }

    /// Extracts an operand of a scalar operator. A boolean operand only
    /// contributes its truth value.
    fn operand(&mut self, e: ExprRef, ctx: Context) -> Result<BoolAbstraction> {
        let res = self.compute(e, ctx)?;
        if matches!(res, Predicates(_)) && self.oracle.type_of(e, ctx)?.is_boolean() {
            Ok(Arbitrary)
        } else {
            Ok(res)
        }
    }

    fn flat_singleton(&self, expr: ExprRef, ctx: Context) -> Result<BoolAbstraction> {
        Ok(BoolAbstraction::singleton(self.oracle.flatten(expr, ctx)?))
    }

    fn apply_unary(&self, op: UnaryOp, child: &BoolAbstraction) -> BoolAbstraction {
        match child.predicates() {
            Some(set) => BoolAbstraction::from_set(set.iter().map(|&e| self.store.resolve_unary(op, e)).collect()),
            None => OverApproximated,
        }
    }

    /// Applies `build` to every tuple of the product of `sets`, unless the
    /// product exceeds the threshold.
    fn apply_product(&self, sets: &[&BTreeSet<ExprRef>], build: impl Fn(&[ExprRef]) -> ExprRef) -> BoolAbstraction {
        let size = sets.iter().fold(1usize, |acc, s| acc.saturating_mul(s.len()));
        if self.config.use_approx && size > self.config.threshold {
            debug!(
                "over-approximating: product of {} exceeds threshold {}",
                size, self.config.threshold
            );
            return OverApproximated;
        }

        let mut res = BTreeSet::new();
        let mut tuple = Vec::with_capacity(sets.len());
        product(sets, &mut tuple, &build, &mut res);
        BoolAbstraction::from_set(res)
    }

    /// Records the complete predicates of a comparison and reduces the
    /// result to what the comparison says as a boolean.
    ///
    /// `TRUE`/`FALSE` (and `1`/`0`) carry no information and are left out;
    /// when nothing else is left, the result is the constant they agree on.
    fn fix_any_preds(&mut self, res: BoolAbstraction) -> BoolAbstraction {
        let set = match res {
            OverApproximated => return Arbitrary,
            Predicates(set) => set,
            flag => return flag,
        };

        let store = self.store;
        let (mut has_true, mut has_false) = (false, false);
        let mut kept = BTreeSet::new();
        for &pred in set.iter() {
            if store.is_true(pred) || store.is_number(pred, 1) {
                has_true = true;
            } else if store.is_false(pred) || store.is_number(pred, 0) {
                has_false = true;
            } else {
                if !self.all_preds.contains(&pred) && self.journal.preds.insert(pred) {
                    debug!("new predicate {}", store.display(pred));
                }
                kept.insert(pred);
            }
        }

        if !kept.is_empty() {
            BoolAbstraction::from_set(kept)
        } else {
            match (has_true, has_false) {
                (true, false) => ConstantTrue,
                (false, true) => ConstantFalse,
                _ => Arbitrary,
            }
        }
    }
}

fn product(
    sets: &[&BTreeSet<ExprRef>],
    tuple: &mut Vec<ExprRef>,
    build: &impl Fn(&[ExprRef]) -> ExprRef,
    res: &mut BTreeSet<ExprRef>,
) {
    match sets.split_first() {
        None => {
            res.insert(build(tuple));
        }
        Some((first, rest)) => {
            for &e in first.iter() {
                tuple.push(e);
                product(rest, tuple, build, res);
                tuple.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use test_log::test;

    use super::*;
    use crate::hierarchy::AssignKind;
    use crate::symb_table::SymbTable;
    use crate::types::SymbType;

    struct Model<'s> {
        store: &'s ExprStore,
        st: SymbTable<'s>,
    }

    impl<'s> Model<'s> {
        fn new(store: &'s ExprStore) -> Self {
            let mut st = SymbTable::new(store);
            for name in ["a", "x", "y"] {
                st.declare_var(store.mk_atom(name), SymbType::range(0, 3));
            }
            for name in ["b", "c"] {
                st.declare_var(store.mk_atom(name), SymbType::Boolean);
            }
            st.declare_var(store.mk_atom("w"), SymbType::word(1));
            Self { store, st }
        }

        fn v(&self, name: &str) -> ExprRef {
            self.store.mk_atom(name)
        }

        fn n(&self, value: i64) -> ExprRef {
            self.store.mk_number(value)
        }
    }

    fn set(items: &[ExprRef]) -> BoolAbstraction {
        BoolAbstraction::from_set(items.iter().copied().collect())
    }

    #[test]
    fn test_conditional_comparison() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, b) = (m.v("a"), m.v("b"));
        let a1 = store.mk_plus(a, m.n(1));
        let e = store.mk_equal(store.mk_case(b, a, a1), m.n(2));

        let mut pe = PredicateExtractor::new(&store, &m.st);
        let res = pe.compute_preds(e).unwrap();

        let p1 = store.mk_equal(a, m.n(2));
        let p2 = store.mk_equal(a1, m.n(2));
        assert_eq!(res, set(&[p1, p2]));
        assert_eq!(pe.all_preds(), &BTreeSet::from([p1, p2]));

        let clusters = pe.all_clusters().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(pe.cluster_vars(clusters[0]), &BTreeSet::from([a]));
        assert_eq!(pe.cluster_preds(clusters[0]), &BTreeSet::from([p1, p2]));
    }

    #[test]
    fn test_constant_and_ambiguous() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let mut pe = PredicateExtractor::new(&store, &m.st);

        assert_eq!(pe.compute_preds(store.mk_equal(m.n(5), m.n(5))).unwrap(), ConstantTrue);
        assert_eq!(pe.compute_preds(store.mk_equal(m.n(5), m.n(6))).unwrap(), ConstantFalse);
        assert!(pe.all_preds().is_empty());

        let x_mod_2 = store.mk_binary(BinaryOp::Mod, m.v("x"), m.n(2));
        assert_eq!(pe.compute_preds(x_mod_2).unwrap(), BoolAbstraction::singleton(x_mod_2));
    }

    #[test]
    fn test_short_circuit() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, b) = (m.v("a"), m.v("b"));
        let p = store.mk_equal(a, m.n(1));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let falsy = store.mk_equal(m.n(1), m.n(2));
        assert_eq!(pe.compute_preds(store.mk_and(falsy, p)).unwrap(), ConstantFalse);
        // The right operand was never looked at.
        assert!(pe.all_preds().is_empty());

        let truthy = store.mk_equal(m.n(2), m.n(2));
        assert_eq!(pe.compute_preds(store.mk_or(truthy, b)).unwrap(), ConstantTrue);
        assert_eq!(pe.compute_preds(store.mk_and(truthy, b)).unwrap(), Arbitrary);
        assert_eq!(pe.compute_preds(store.mk_or(p, b)).unwrap(), Arbitrary);
        assert_eq!(
            pe.compute_preds(store.mk_binary(BinaryOp::Implies, falsy, b)).unwrap(),
            ConstantTrue
        );
        assert_eq!(pe.all_preds(), &BTreeSet::from([p]));
    }

    #[test]
    fn test_boolean_comparisons() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (t, f, b) = (store.mk_true(), store.mk_false(), m.v("b"));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let lt = |l, r| store.mk_binary(BinaryOp::Lt, l, r);
        let ge = |l, r| store.mk_binary(BinaryOp::Ge, l, r);
        assert_eq!(pe.compute_preds(lt(f, t)).unwrap(), ConstantTrue);
        assert_eq!(pe.compute_preds(lt(b, f)).unwrap(), ConstantFalse);
        assert_eq!(pe.compute_preds(ge(b, f)).unwrap(), ConstantTrue);
        assert_eq!(pe.compute_preds(store.mk_equal(b, t)).unwrap(), Arbitrary);
        assert!(pe.all_preds().is_empty());
    }

    #[test]
    fn test_over_approximation() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, x, b, c) = (m.v("a"), m.v("x"), m.v("b"), m.v("c"));
        let left = store.mk_case(b, a, store.mk_plus(a, m.n(1)));
        let right = store.mk_case(c, x, store.mk_plus(x, m.n(1)));
        let sum = store.mk_plus(left, right);

        let config = ExtractorConfig {
            use_approx: true,
            threshold: 3,
        };
        let mut pe = PredicateExtractor::with_config(&store, &m.st, config);
        assert_eq!(pe.compute_preds(sum).unwrap(), OverApproximated);
        assert_eq!(pe.compute_preds(store.mk_equal(sum, m.n(2))).unwrap(), OverApproximated);
        assert!(pe.all_preds().is_empty());

        // The same product without the breaker.
        let config = ExtractorConfig {
            use_approx: false,
            threshold: 3,
        };
        let mut pe = PredicateExtractor::with_config(&store, &m.st, config);
        match pe.compute_preds(sum).unwrap() {
            Predicates(sums) => assert_eq!(sums.len(), 4),
            other => panic!("expected predicates, got {:?}", other),
        }
    }

    #[test]
    fn test_memoised() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, b) = (m.v("a"), m.v("b"));
        let e = store.mk_equal(store.mk_case(b, a, m.n(3)), m.n(2));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let first = pe.compute_preds(e).unwrap();
        let preds = pe.all_preds().clone();
        let entries = pe.memo().len();
        let hits = pe.memo().hits();

        let second = pe.compute_preds(e).unwrap();
        assert_eq!(first, second);
        assert_eq!(pe.all_preds(), &preds);
        assert_eq!(pe.memo().len(), entries);
        assert_eq!(pe.memo().hits(), hits + 1);
    }

    #[test]
    fn test_union_and_word1() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, x, b) = (m.v("a"), m.v("x"), m.v("b"));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let u = store.mk_binary(BinaryOp::Union, a, x);
        assert_eq!(pe.compute_preds(u).unwrap(), set(&[a, x]));

        let bits = store.mk_unary(UnaryOp::CastWord1, b);
        let (w0, w1) = (store.mk_word1(false), store.mk_word1(true));
        assert_eq!(pe.compute_preds(bits).unwrap(), set(&[w0, w1]));
        let bits = store.mk_unary(UnaryOp::CastWord1, store.mk_true());
        assert_eq!(pe.compute_preds(bits).unwrap(), set(&[w1]));

        // bool(w) is the predicate w = 0ud1_1
        let w = m.v("w");
        let cast = store.mk_unary(UnaryOp::CastBool, w);
        let pred = store.mk_equal(w, w1);
        assert_eq!(pe.compute_preds(cast).unwrap(), set(&[pred]));
        assert!(pe.all_preds().contains(&pred));
    }

    #[test]
    fn test_array_access() {
        let store = ExprStore::default();
        let mut m = Model::new(&store);
        let v = m.v("v");
        m.st.declare_var_array(v, 0, 1, SymbType::range(0, 3));
        let i = m.v("i");
        m.st.declare_var(i, SymbType::range(0, 1));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let e = store.mk_equal(store.mk_array(v, i), m.n(3));
        let res = pe.compute_preds(e).unwrap();
        let v0 = store.mk_array(v, m.n(0));
        let v1 = store.mk_array(v, m.n(1));
        let (p0, p1) = (store.mk_equal(v0, m.n(3)), store.mk_equal(v1, m.n(3)));
        assert_eq!(res, set(&[p0, p1]));
        // The index comparison of the expansion is a predicate as well.
        assert!(pe.all_preds().contains(&store.mk_equal(i, m.n(0))));
    }

    #[test]
    fn test_failed_call_is_rolled_back() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let a = m.v("a");
        let p = store.mk_equal(a, m.n(2));
        let bad = store.mk_equal(m.v("nowhere"), m.n(1));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let err = pe.compute_preds(store.mk_and(p, bad)).unwrap_err();
        assert!(matches!(err, PneError::UndefinedSymbol(_)));
        assert!(pe.all_preds().is_empty());
        assert!(pe.memo().is_empty());

        // The good half alone still goes through.
        assert_eq!(pe.compute_preds(p).unwrap(), set(&[p]));
        assert_eq!(pe.all_preds(), &BTreeSet::from([p]));
    }

    #[test]
    fn test_clusters_merge_over_calls() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, x, y) = (m.v("a"), m.v("x"), m.v("y"));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        pe.compute_preds(store.mk_equal(a, m.n(1))).unwrap();
        pe.compute_preds(store.mk_equal(x, y)).unwrap();
        assert_eq!(pe.all_clusters().unwrap().len(), 2);
        assert_ne!(pe.var_cluster(a).unwrap(), pe.var_cluster(x).unwrap());

        pe.compute_preds(store.mk_binary(BinaryOp::Lt, y, a)).unwrap();
        assert_eq!(pe.unclustered_preds().len(), 1);
        let clusters = pe.all_clusters().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(pe.cluster_vars(clusters[0]), &BTreeSet::from([a, x, y]));
        assert_eq!(pe.cluster_preds(clusters[0]).len(), 3);
        pe.clusters().check_invariants();
    }

    #[test]
    #[should_panic(expected = "predicates pending")]
    fn test_cluster_preds_needs_recompute() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, x) = (m.v("a"), m.v("x"));
        let mut pe = PredicateExtractor::new(&store, &m.st);
        pe.compute_preds(store.mk_equal(a, m.n(1))).unwrap();
        let ids = pe.all_clusters().unwrap();
        pe.compute_preds(store.mk_equal(x, m.n(1))).unwrap();
        pe.cluster_preds(ids[0]);
    }

    #[test]
    fn test_hierarchy_and_report() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, x) = (m.v("a"), m.v("x"));
        let mut fh = FlatHierarchy::new();
        fh.invar.push(store.mk_binary(BinaryOp::Le, a, m.n(2)));
        fh.assign(AssignKind::Next, x, store.mk_plus(x, m.n(1)));

        let mut pe = PredicateExtractor::new(&store, &m.st);
        pe.extract_from_hierarchy(&fh).unwrap();
        let assign = store.mk_binary(BinaryOp::EqDef, store.mk_next(x), store.mk_plus(x, m.n(1)));
        assert!(pe.all_preds().contains(&assign));
        assert_eq!(pe.all_preds().len(), 2);

        let mut out = Vec::new();
        pe.write_report(&mut out, true, true).unwrap();
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("Cluster 0 ["));
        assert!(report.contains("a : 0..3"));
        assert!(report.contains("a <= 2"));

        let mut out = Vec::new();
        pe.write_report(&mut out, true, false).unwrap();
        let report = String::from_utf8(out).unwrap();
        assert!(report.starts_with("Predicates:"));
        assert!(!report.contains("Cluster"));
    }

    #[test]
    fn test_real_literals_compare_by_value() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let half = store.mk_real(1, 2);
        let two_quarters = store.intern(Node::Real {
            num: BigInt::from(2),
            den: BigInt::from(4),
        });
        assert_eq!(pe.compute_preds(store.mk_equal(half, two_quarters)).unwrap(), ConstantTrue);
        let two = store.intern(Node::Real {
            num: BigInt::from(2),
            den: BigInt::from(1),
        });
        assert_eq!(pe.compute_preds(store.mk_equal(two, m.n(2))).unwrap(), ConstantTrue);
        assert_eq!(pe.compute_preds(store.mk_binary(BinaryOp::Lt, m.n(1), half)).unwrap(), ConstantFalse);
        assert!(pe.all_preds().is_empty());
    }

    #[test]
    fn test_next_of_predicate() {
        let store = ExprStore::default();
        let m = Model::new(&store);
        let (a, b) = (m.v("a"), m.v("b"));
        let p = store.mk_equal(a, m.n(1));
        let mut pe = PredicateExtractor::new(&store, &m.st);

        let next_p = store.mk_next(p);
        assert_eq!(pe.compute_preds(next_p).unwrap(), set(&[next_p]));
        let init_p = store.mk_unary(UnaryOp::Init, p);
        assert_eq!(pe.compute_preds(init_p).unwrap(), set(&[init_p]));
        assert_eq!(pe.compute_preds(store.mk_next(b)).unwrap(), Arbitrary);
        let truthy = store.mk_equal(m.n(2), m.n(2));
        assert_eq!(pe.compute_preds(store.mk_next(truthy)).unwrap(), ConstantTrue);
        assert_eq!(pe.all_preds(), &BTreeSet::from([p]));
    }
}
