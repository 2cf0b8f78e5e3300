//! # Predicate normaliser
//!
//! Rewrites expressions into *predicate-normal form*: no scalar operator is
//! ever applied to a conditional. Conditionals are hoisted above the operator
//! that consumes them and flattened into linear case chains, so that every
//! boolean leaf of the result is a complete predicate such as `a = 2` or
//! `(a + 1) = 2`:
//!
//! ```text
//! (b ? a : a + 1) = 2   ~>   b ? (a = 2) : ((a + 1) = 2)
//! ```
//!
//! Along the way boolean operands of scalar operators are read as `0/1`
//! (`case e : 1; 0`), one-bit word casts are expanded, and a `FAILURE`
//! terminator is never given an operator: it stays the last tail of its chain.
//!
//! Results are memoised per `(expand, context, expression)`; a later request
//! for the same key returns the very same handle.
//!
//! ```
//! use pne_rs::normaliser::PredicateNormaliser;
//! use pne_rs::store::ExprStore;
//! use pne_rs::symb_table::SymbTable;
//! use pne_rs::types::SymbType;
//!
//! let store = ExprStore::default();
//! let mut st = SymbTable::new(&store);
//! let a = store.mk_atom("a");
//! let b = store.mk_atom("b");
//! st.declare_var(a, SymbType::range(0, 3));
//! st.declare_var(b, SymbType::Boolean);
//!
//! let one = store.mk_number(1);
//! let two = store.mk_number(2);
//! let e = store.mk_equal(store.mk_case(b, a, store.mk_plus(a, one)), two);
//!
//! let mut pn = PredicateNormaliser::new(&store, &st);
//! let n = pn.normalise_expr(e, true).unwrap();
//! assert_eq!(store.to_string(n), "b ? (a = 2) : ((a + 1) = 2)");
//! ```

use std::collections::{BTreeSet, HashSet};

use log::{debug, trace};

use crate::error::{PneError, Result};
use crate::memo::Memo;
use crate::node::{BinaryOp, Node, UnaryOp};
use crate::oracle::{ResolvedSymbol, SymbolOracle};
use crate::reference::{Context, ExprRef};
use crate::store::ExprStore;

/// An operator whose operands may be conditionals to hoist.
#[derive(Debug, Copy, Clone)]
enum Apply {
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Operands: word, high bit, low bit.
    BitSelect,
    /// Operands: array, index, value.
    WaWrite,
}

pub struct PredicateNormaliser<'s, O> {
    store: &'s ExprStore,
    oracle: &'s O,
    memo: Memo<(bool, Context, ExprRef), ExprRef>,
}

impl<'s, O> PredicateNormaliser<'s, O>
where
    O: SymbolOracle,
{
    pub fn new(store: &'s ExprStore, oracle: &'s O) -> Self {
        Self {
            store,
            oracle,
            memo: Memo::new(),
        }
    }

    pub fn memo(&self) -> &Memo<(bool, Context, ExprRef), ExprRef> {
        &self.memo
    }

    /// Normalises `expr` read in `ctx`.
    ///
    /// With `expand` set, definitions are replaced by their (normalised)
    /// bodies; otherwise they are kept by name.
    pub fn normalise(&mut self, expr: ExprRef, ctx: Context, expand: bool) -> Result<ExprRef> {
        let key = (expand, ctx, expr);
        if let Some(&res) = self.memo.get(&key) {
            return Ok(res);
        }

        trace!("normalise: {} in {}", self.store.display(expr), ctx);
        let res = self.normalise_node(expr, ctx, expand)?;
        trace!("normalised: {} -> {}", self.store.display(expr), self.store.display(res));

        self.memo.insert(key, res);
        Ok(res)
    }

    /// Normalises a context-free expression.
    pub fn normalise_expr(&mut self, expr: ExprRef, expand: bool) -> Result<ExprRef> {
        self.normalise(expr, Context::ROOT, expand)
    }

    /// Normalises a specification, expanding definitions, and checks that
    /// the result is still well-typed.
    pub fn normalise_specification(&mut self, expr: ExprRef) -> Result<ExprRef> {
        let res = self.normalise(expr, Context::ROOT, true)?;
        let ty = self.oracle.type_of(res, Context::ROOT)?;
        if ty.is_error() {
            return Err(PneError::IllTyped(
                self.store.to_string(res),
                "normalised specification is ill-typed".to_string(),
            ));
        }
        debug!("normalised specification: {}", self.store.display(res));
        Ok(res)
    }

    /// Collects the complete predicates of an already-normalised boolean
    /// expression.
    ///
    /// Comparisons between scalars are predicates; `bool(w)` contributes
    /// `w = 0ud1_1`. Boolean structure (connectives, conditionals, temporal
    /// operators) is traversed.
    pub fn predicates_only(&self, expr: ExprRef) -> Result<BTreeSet<ExprRef>> {
        let mut preds = BTreeSet::new();
        let mut visited = HashSet::new();
        self.collect_predicates(expr, &mut preds, &mut visited)?;
        Ok(preds)
    }

    fn collect_predicates(
        &self,
        e: ExprRef,
        preds: &mut BTreeSet<ExprRef>,
        visited: &mut HashSet<ExprRef>,
    ) -> Result<()> {
        if !visited.insert(e) {
            return Ok(());
        }
        let store = self.store;
        match store.node(e) {
            node if node.is_leaf() => {}
            // Boolean variables and uninterpreted predicates.
            Node::Dot(..) | Node::Array(..) | Node::Function(..) => {}
            Node::Unary(UnaryOp::CastBool, w) => {
                preds.insert(store.resolve_binary(BinaryOp::Equal, w, store.mk_word1(true)));
            }
            Node::Unary(_, a) => self.collect_predicates(a, preds, visited)?,
            Node::Binary(op, l, r) if op.is_relational() => {
                let lt = self.oracle.type_of(l, Context::ROOT)?;
                let rt = self.oracle.type_of(r, Context::ROOT)?;
                if lt.is_boolean_like() && rt.is_boolean_like() {
                    self.collect_predicates(l, preds, visited)?;
                    self.collect_predicates(r, preds, visited)?;
                } else {
                    preds.insert(e);
                }
            }
            Node::Binary(_, l, r) => {
                self.collect_predicates(l, preds, visited)?;
                self.collect_predicates(r, preds, visited)?;
            }
            Node::Case(c, t, tail) => {
                self.collect_predicates(c, preds, visited)?;
                self.collect_predicates(t, preds, visited)?;
                self.collect_predicates(tail, preds, visited)?;
            }
            _ => return Err(PneError::Unsupported(store.to_string(e))),
        }
        Ok(())
    }

    fn normalise_node(&mut self, expr: ExprRef, ctx: Context, expand: bool) -> Result<ExprRef> {
        let store = self.store;
        let ty = self.oracle.type_of(expr, ctx)?;

        let res = match store.node(expr) {
            Node::Context(scope, body) => self.normalise(body, store.concat_contexts(ctx, scope), expand)?,

            Node::True
            | Node::False
            | Node::Failure
            | Node::Number(_)
            | Node::Word { .. }
            | Node::Real { .. }
            | Node::Range(..) => expr,

            Node::Atom(_) | Node::Dot(..) | Node::Array(..) => {
                let sym = self.oracle.resolve(expr, ctx)?;
                if sym.is_undefined() && matches!(store.node(expr), Node::Array(..)) {
                    // Non-constant index: read through the expanded case chain.
                    let flat = self.oracle.flatten(expr, ctx)?;
                    assert_ne!(flat, expr, "Flattening must expand an unresolved array access");
                    self.normalise(flat, Context::ROOT, expand)?
                } else {
                    self.normalise_symbol(sym, expand)?
                }
            }

            Node::Unary(op, a) => {
                let a = self.normalise(a, ctx, expand)?;
                match op {
                    UnaryOp::CastWord1 => self.bool2word1(a)?,
                    UnaryOp::CastBool | UnaryOp::ToInt => self.push_ite_up(Apply::Unary(op), &[a]),
                    UnaryOp::CastSigned | UnaryOp::CastUnsigned | UnaryOp::UMinus if !ty.is_boolean() => {
                        let a = self.int_operand(a)?;
                        self.push_ite_up(Apply::Unary(op), &[a])
                    }
                    _ if ty.is_boolean() => store.resolve_unary(op, a),
                    _ => self.push_ite_up(Apply::Unary(op), &[a]),
                }
            }

            Node::Binary(op, l, r) if op.is_relational() => self.normalise_relational(op, l, r, ctx, expand)?,

            Node::Binary(op, l, r) => {
                let l = self.normalise(l, ctx, expand)?;
                let r = self.normalise(r, ctx, expand)?;
                match op {
                    _ if op.is_connective() || op.is_temporal() => {
                        if ty.is_boolean() {
                            store.resolve_binary(op, l, r)
                        } else {
                            self.push_ite_up(Apply::Binary(op), &[l, r])
                        }
                    }
                    BinaryOp::WResize => self.push_ite_up(Apply::Binary(op), &[l, r]),
                    BinaryOp::Concat => {
                        let l = self.word1_operand(l)?;
                        let r = self.word1_operand(r)?;
                        self.push_ite_up(Apply::Binary(op), &[l, r])
                    }
                    _ => {
                        let l = self.int_operand(l)?;
                        let r = self.int_operand(r)?;
                        self.push_ite_up(Apply::Binary(op), &[l, r])
                    }
                }
            }

            Node::BitSelect(w, hi, lo) => {
                let w = self.normalise(w, ctx, expand)?;
                // Bit bounds are always expanded down to constants.
                let hi = self.normalise(hi, ctx, true)?;
                let lo = self.normalise(lo, ctx, true)?;
                self.push_ite_up(Apply::BitSelect, &[w, hi, lo])
            }

            Node::WaWrite(a, i, v) => {
                let mut ops = [a, i, v];
                for op in ops.iter_mut() {
                    let n = self.normalise(*op, ctx, expand)?;
                    *op = self.int_operand(n)?;
                }
                self.push_ite_up(Apply::WaWrite, &ops)
            }

            Node::Case(c, t, tail) => {
                let c = self.normalise(c, ctx, expand)?;
                let t = self.normalise(t, ctx, expand)?;
                let tail = self.normalise(tail, ctx, expand)?;
                if ty.is_boolean() {
                    store.resolve_case(c, t, tail)
                } else {
                    self.normalise_ite(c, t, tail)
                }
            }

            Node::Function(name, args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.normalise(a, ctx, expand))
                    .collect::<Result<Vec<_>>>()?;
                store.mk_function(name, args)
            }

            Node::Count(args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.normalise(a, ctx, expand))
                    .collect::<Result<Vec<_>>>()?;
                store.mk_count(args)
            }
        };

        Ok(res)
    }

    fn normalise_symbol(&mut self, sym: ResolvedSymbol, expand: bool) -> Result<ExprRef> {
        match sym {
            ResolvedSymbol::Variable { name } | ResolvedSymbol::Constant { name } | ResolvedSymbol::Function { name } => {
                Ok(name)
            }
            ResolvedSymbol::Define { name, body, context } => {
                if expand {
                    let flat = self.oracle.flatten(body, context)?;
                    self.normalise(flat, Context::ROOT, expand)
                } else {
                    Ok(name)
                }
            }
            ResolvedSymbol::Parameter { actual, context, .. } => self.normalise(actual, context, expand),
            ResolvedSymbol::Undefined { name } => Err(PneError::UndefinedSymbol(self.store.to_string(name))),
        }
    }

    fn normalise_relational(
        &mut self,
        op: BinaryOp,
        l: ExprRef,
        r: ExprRef,
        ctx: Context,
        expand: bool,
    ) -> Result<ExprRef> {
        let store = self.store;
        let lt = self.oracle.type_of(l, ctx)?;
        let rt = self.oracle.type_of(r, ctx)?;
        let l = self.normalise(l, ctx, expand)?;
        let r = self.normalise(r, ctx, expand)?;

        if lt.is_boolean_like() && rt.is_boolean_like() {
            return Ok(store.resolve_binary(op, l, r));
        }
        if (lt.is_int_array() && rt.is_int_array()) || (lt.is_word_array() && rt.is_word_array()) {
            return Ok(store.resolve_binary(op, l, r));
        }
        if lt.is_boolean() && rt.is_word_1() {
            let r = store.resolve_unary(UnaryOp::CastBool, r);
            return Ok(store.resolve_binary(op, l, r));
        }
        if lt.is_word_1() && rt.is_boolean() {
            let l = store.resolve_unary(UnaryOp::CastBool, l);
            return Ok(store.resolve_binary(op, l, r));
        }

        // Assigning a scalar to a boolean means picking one of its values.
        let op = if op == BinaryOp::EqDef && lt.is_boolean() && (rt.is_integer() || rt.is_set_int()) {
            BinaryOp::SetIn
        } else {
            op
        };
        let l = self.int_operand(l)?;
        let r = self.int_operand(r)?;
        Ok(self.push_ite_up(Apply::Binary(op), &[l, r]))
    }

    /// Whether a normalised expression is a genuine boolean, i.e. one that
    /// has to be read as `0/1` when used as a number.
    fn is_true_bool_exp(&self, e: ExprRef) -> Result<bool> {
        if !self.oracle.type_of(e, Context::ROOT)?.is_boolean() {
            return Ok(false);
        }
        let inner = match self.store.node(e) {
            Node::Unary(UnaryOp::Next | UnaryOp::Init, a) => a,
            _ => e,
        };
        Ok(!matches!(
            self.store.node(inner),
            Node::Number(_) | Node::Binary(BinaryOp::Mod, ..)
        ))
    }

    fn int_operand(&self, e: ExprRef) -> Result<ExprRef> {
        if self.is_true_bool_exp(e)? {
            Ok(self.bool2int(e))
        } else {
            Ok(e)
        }
    }

    fn word1_operand(&self, e: ExprRef) -> Result<ExprRef> {
        if self.oracle.type_of(e, Context::ROOT)?.is_boolean() {
            self.bool2word1(e)
        } else {
            Ok(e)
        }
    }

    /// `case e : 1; 0`.
    fn bool2int(&self, e: ExprRef) -> ExprRef {
        let store = self.store;
        if store.is_true(e) {
            store.mk_number(1)
        } else if store.is_false(e) {
            store.mk_number(0)
        } else {
            store.mk_case(e, store.mk_number(1), store.mk_number(0))
        }
    }

    /// `case e : 0ud1_1; 0ud1_0`.
    fn bool2word1(&self, e: ExprRef) -> Result<ExprRef> {
        let store = self.store;
        let res = if store.is_true(e) || store.is_number(e, 1) {
            store.mk_word1(true)
        } else if store.is_false(e) || store.is_number(e, 0) {
            store.mk_word1(false)
        } else if self.oracle.type_of(e, Context::ROOT)?.is_boolean() {
            store.mk_case(e, store.mk_word1(true), store.mk_word1(false))
        } else {
            return Err(PneError::IllTyped(store.to_string(e), "word1 cast of a non-boolean".to_string()));
        };
        Ok(res)
    }

    /// Applies `apply` to `ops`, hoisting the first conditional operand above
    /// the operator, recursively.
    ///
    /// For `next` and `init`, the operator is also applied to the hoisted
    /// condition, since it is evaluated in the same state as the operand.
    fn push_ite_up(&self, apply: Apply, ops: &[ExprRef]) -> ExprRef {
        let store = self.store;
        let Some(k) = ops.iter().position(|&e| store.is_case(e)) else {
            return self.apply(apply, ops);
        };
        let Some((cond, then, tail)) = store.case_parts(ops[k]) else {
            unreachable!("operand {} is a case", k);
        };

        let mut branch = ops.to_vec();
        branch[k] = then;
        let then = self.push_ite_up(apply, &branch);
        let tail = if store.is_failure(tail) {
            tail
        } else {
            branch[k] = tail;
            self.push_ite_up(apply, &branch)
        };
        let cond = match apply {
            Apply::Unary(op @ (UnaryOp::Next | UnaryOp::Init)) => store.resolve_unary(op, cond),
            _ => cond,
        };

        self.normalise_ite(cond, then, tail)
    }

    fn apply(&self, apply: Apply, ops: &[ExprRef]) -> ExprRef {
        let store = self.store;
        match apply {
            Apply::Unary(op) => store.resolve_unary(op, ops[0]),
            Apply::Binary(op) => store.resolve_binary(op, ops[0], ops[1]),
            Apply::BitSelect => store.resolve_bit_select(ops[0], ops[1], ops[2]),
            Apply::WaWrite => store.mk_wawrite(ops[0], ops[1], ops[2]),
        }
    }

    /// Builds `case cond : then; tail` with a linear chain as result:
    /// a conditional `then` branch is merged into the chain by conjoining
    /// its conditions with `cond`.
    fn normalise_ite(&self, cond: ExprRef, then: ExprRef, tail: ExprRef) -> ExprRef {
        let store = self.store;
        match store.case_parts(then) {
            Some((c, t, then_tail)) => {
                let rest = if store.is_failure(then_tail) {
                    then_tail
                } else {
                    self.normalise_ite(cond, then_tail, tail)
                };
                store.resolve_case(store.resolve_and(cond, c), t, rest)
            }
            None => store.resolve_case(cond, then, tail),
        }
    }
}
