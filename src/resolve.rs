//! Simplifying constructors.
//!
//! Each `resolve_*` method builds the same node as its `mk_*` counterpart but
//! first tries a local rewrite: constant folding, boolean identities and
//! trivial conditionals. Rewrites only look at the immediate operands, so the
//! cost stays constant per node.

use std::collections::HashMap;

use num_bigint::BigInt;

use crate::node::{BinaryOp, Node, UnaryOp};
use crate::reference::ExprRef;
use crate::store::ExprStore;

impl ExprStore {
    pub fn resolve_not(&self, e: ExprRef) -> ExprRef {
        self.resolve_unary(UnaryOp::Not, e)
    }

    pub fn resolve_and(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        self.resolve_binary(BinaryOp::And, l, r)
    }

    pub fn resolve_unary(&self, op: UnaryOp, e: ExprRef) -> ExprRef {
        let node = self.node(e);
        match (op, &node) {
            (UnaryOp::Not, Node::True) => self.mk_false(),
            (UnaryOp::Not, Node::False) => self.mk_true(),
            (UnaryOp::Not, Node::Unary(UnaryOp::Not, inner)) => *inner,
            (UnaryOp::UMinus, Node::Number(n)) => self.mk_number(-n),
            (UnaryOp::UMinus, Node::Unary(UnaryOp::UMinus, inner)) => *inner,
            (UnaryOp::Next | UnaryOp::Init, n) if n.is_constant() => e,
            (UnaryOp::Floor | UnaryOp::ToInt, Node::Number(_)) => e,
            (UnaryOp::ToInt, Node::True) => self.mk_number(1),
            (UnaryOp::ToInt, Node::False) => self.mk_number(0),
            (UnaryOp::CastBool, Node::Word { value, width: 1, .. }) => self.mk_bool(*value == 1),
            (UnaryOp::CastWord1, Node::True) => self.mk_word1(true),
            (UnaryOp::CastWord1, Node::False) => self.mk_word1(false),
            _ => self.mk_unary(op, e),
        }
    }

    pub fn resolve_binary(&self, op: BinaryOp, l: ExprRef, r: ExprRef) -> ExprRef {
        match op {
            BinaryOp::And => self.fold_and(l, r),
            BinaryOp::Or => self.fold_or(l, r),
            BinaryOp::Implies => self.fold_implies(l, r),
            BinaryOp::Iff | BinaryOp::Xnor => self.fold_iff(op, l, r),
            BinaryOp::Xor => self.fold_xor(l, r),
            BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                match self.compare(op, l, r) {
                    Some(value) => self.mk_bool(value),
                    None => self.mk_binary(op, l, r),
                }
            }
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Times | BinaryOp::Divide | BinaryOp::Mod => {
                match (self.number_value(l), self.number_value(r)) {
                    (Some(a), Some(b)) => match eval_arithmetic(op, &a, &b) {
                        Some(n) => self.mk_number(n),
                        None => self.mk_binary(op, l, r),
                    },
                    _ => self.mk_binary(op, l, r),
                }
            }
            _ => self.mk_binary(op, l, r),
        }
    }

    /// Conditional with constant-condition and equal-branch collapsing.
    pub fn resolve_case(&self, cond: ExprRef, then: ExprRef, tail: ExprRef) -> ExprRef {
        if self.is_true(cond) {
            then
        } else if self.is_false(cond) {
            tail
        } else if then == tail {
            then
        } else if self.is_true(then) && self.is_false(tail) {
            cond
        } else if self.is_false(then) && self.is_true(tail) {
            self.resolve_not(cond)
        } else {
            self.mk_case(cond, then, tail)
        }
    }

    pub fn resolve_bit_select(&self, word: ExprRef, hi: ExprRef, lo: ExprRef) -> ExprRef {
        if let (Node::Word { value, .. }, Some(h), Some(l)) = (self.node(word), self.small_number(hi), self.small_number(lo)) {
            if l <= h && h < 64 {
                let width = (h - l + 1) as u32;
                return self.mk_word(value >> l, width, false);
            }
        }
        self.mk_bit_select(word, hi, lo)
    }

    /// Rebuilds an expression bottom-up through the simplifying constructors.
    pub fn simplify(&self, e: ExprRef) -> ExprRef {
        let mut cache = HashMap::new();
        self.simplify_rec(e, &mut cache)
    }

    fn simplify_rec(&self, e: ExprRef, cache: &mut HashMap<ExprRef, ExprRef>) -> ExprRef {
        if let Some(&res) = cache.get(&e) {
            return res;
        }
        let res = match self.node(e) {
            Node::Unary(op, a) => {
                let a = self.simplify_rec(a, cache);
                self.resolve_unary(op, a)
            }
            Node::Binary(op, l, r) => {
                let l = self.simplify_rec(l, cache);
                let r = self.simplify_rec(r, cache);
                self.resolve_binary(op, l, r)
            }
            Node::Case(c, t, tail) => {
                let c = self.simplify_rec(c, cache);
                let t = self.simplify_rec(t, cache);
                let tail = self.simplify_rec(tail, cache);
                self.resolve_case(c, t, tail)
            }
            Node::BitSelect(w, h, l) => {
                let w = self.simplify_rec(w, cache);
                let h = self.simplify_rec(h, cache);
                let l = self.simplify_rec(l, cache);
                self.resolve_bit_select(w, h, l)
            }
            Node::WaWrite(a, i, v) => {
                let a = self.simplify_rec(a, cache);
                let i = self.simplify_rec(i, cache);
                let v = self.simplify_rec(v, cache);
                self.mk_wawrite(a, i, v)
            }
            Node::Function(name, args) => {
                let args = args.into_iter().map(|a| self.simplify_rec(a, cache)).collect();
                self.mk_function(name, args)
            }
            Node::Count(args) => {
                let args = args.into_iter().map(|a| self.simplify_rec(a, cache)).collect();
                self.mk_count(args)
            }
            // Names, ranges and scoped expressions are left untouched.
            _ => e,
        };
        cache.insert(e, res);
        res
    }

    fn small_number(&self, e: ExprRef) -> Option<u64> {
        self.number_value(e).and_then(|n| u64::try_from(n).ok())
    }

    fn fold_and(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        if self.is_false(l) || self.is_false(r) {
            self.mk_false()
        } else if self.is_true(l) {
            r
        } else if self.is_true(r) || l == r {
            l
        } else {
            self.mk_binary(BinaryOp::And, l, r)
        }
    }

    fn fold_or(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        if self.is_true(l) || self.is_true(r) {
            self.mk_true()
        } else if self.is_false(l) {
            r
        } else if self.is_false(r) || l == r {
            l
        } else {
            self.mk_binary(BinaryOp::Or, l, r)
        }
    }

    fn fold_implies(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        if self.is_false(l) || self.is_true(r) || l == r {
            self.mk_true()
        } else if self.is_true(l) {
            r
        } else if self.is_false(r) {
            self.resolve_not(l)
        } else {
            self.mk_binary(BinaryOp::Implies, l, r)
        }
    }

    fn fold_iff(&self, op: BinaryOp, l: ExprRef, r: ExprRef) -> ExprRef {
        if l == r {
            self.mk_true()
        } else if self.is_true(l) {
            r
        } else if self.is_true(r) {
            l
        } else if self.is_false(l) {
            self.resolve_not(r)
        } else if self.is_false(r) {
            self.resolve_not(l)
        } else {
            self.mk_binary(op, l, r)
        }
    }

    fn fold_xor(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        if l == r {
            self.mk_false()
        } else if self.is_false(l) {
            r
        } else if self.is_false(r) {
            l
        } else if self.is_true(l) {
            self.resolve_not(r)
        } else if self.is_true(r) {
            self.resolve_not(l)
        } else {
            self.mk_binary(BinaryOp::Xor, l, r)
        }
    }

    /// Decides a comparison when both operands are literal constants
    /// (or the very same expression).
    ///
    /// Numbers and reals are ordered exactly. Other distinct literals only
    /// decide (in)equality, and only when they are of the same kind.
    fn compare(&self, op: BinaryOp, l: ExprRef, r: ExprRef) -> Option<bool> {
        use std::cmp::Ordering;

        let distinct = || match op {
            BinaryOp::Equal => Some(false),
            BinaryOp::NotEqual => Some(true),
            _ => None,
        };

        let ordering = if l == r {
            Some(Ordering::Equal)
        } else {
            let (a, b) = (self.node(l), self.node(r));
            let rationals = (rational(&a), rational(&b));
            match rationals {
                // Denominators are positive.
                (Some((an, ad)), Some((bn, bd))) => Some((an * bd).cmp(&(bn * ad))),
                _ => match (a, b) {
                    (
                        Node::Word {
                            value: va,
                            width: wa,
                            signed: sa,
                        },
                        Node::Word {
                            value: vb,
                            width: wb,
                            signed: sb,
                        },
                    ) if wa == wb && sa == sb => {
                        if sa {
                            return distinct();
                        }
                        Some(va.cmp(&vb))
                    }
                    (Node::True | Node::False, Node::True | Node::False) => return distinct(),
                    (Node::True | Node::False, Node::Number(n)) | (Node::Number(n), Node::True | Node::False)
                        if n != BigInt::from(0) && n != BigInt::from(1) =>
                    {
                        return distinct()
                    }
                    _ => None,
                },
            }
        }?;

        Some(match op {
            BinaryOp::Equal => ordering == Ordering::Equal,
            BinaryOp::NotEqual => ordering != Ordering::Equal,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::Le => ordering != Ordering::Greater,
            BinaryOp::Ge => ordering != Ordering::Less,
            _ => unreachable!("{:?} is not a comparison", op),
        })
    }
}

/// A number or real literal as `(num, den)`.
fn rational(node: &Node) -> Option<(BigInt, BigInt)> {
    match node {
        Node::Number(n) => Some((n.clone(), BigInt::from(1))),
        Node::Real { num, den } => Some((num.clone(), den.clone())),
        _ => None,
    }
}

fn eval_arithmetic(op: BinaryOp, a: &BigInt, b: &BigInt) -> Option<BigInt> {
    let zero = BigInt::from(0);
    match op {
        BinaryOp::Plus => Some(a + b),
        BinaryOp::Minus => Some(a - b),
        BinaryOp::Times => Some(a * b),
        BinaryOp::Divide if *b != zero => Some(a / b),
        BinaryOp::Mod if *b != zero => Some(a % b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_fold_connectives() {
        let store = ExprStore::default();
        let x = store.mk_atom("x");
        let t = store.mk_true();
        let f = store.mk_false();
        assert_eq!(store.resolve_binary(BinaryOp::And, t, x), x);
        assert_eq!(store.resolve_binary(BinaryOp::And, x, f), f);
        assert_eq!(store.resolve_binary(BinaryOp::Or, f, x), x);
        assert_eq!(store.resolve_binary(BinaryOp::Or, x, t), t);
        assert_eq!(store.resolve_binary(BinaryOp::Implies, f, x), t);
        assert_eq!(store.resolve_binary(BinaryOp::Implies, x, f), store.mk_not(x));
        assert_eq!(store.resolve_binary(BinaryOp::Iff, x, x), t);
        assert_eq!(store.resolve_binary(BinaryOp::Xor, t, x), store.mk_not(x));
        assert_eq!(store.resolve_not(store.mk_not(x)), x);
    }

    #[test]
    fn test_fold_comparisons() {
        let store = ExprStore::default();
        let five = store.mk_number(5);
        let six = store.mk_number(6);
        let x = store.mk_atom("x");
        assert_eq!(store.resolve_binary(BinaryOp::Equal, five, five), store.mk_true());
        assert_eq!(store.resolve_binary(BinaryOp::Equal, five, six), store.mk_false());
        assert_eq!(store.resolve_binary(BinaryOp::Lt, five, six), store.mk_true());
        assert_eq!(store.resolve_binary(BinaryOp::Ge, five, six), store.mk_false());
        assert_eq!(store.resolve_binary(BinaryOp::Equal, x, x), store.mk_true());
        assert_eq!(store.resolve_binary(BinaryOp::Lt, x, x), store.mk_false());
        assert_eq!(store.resolve_binary(BinaryOp::Equal, x, five), store.mk_equal(x, five));
        let w0 = store.mk_word1(false);
        let w1 = store.mk_word1(true);
        assert_eq!(store.resolve_binary(BinaryOp::Equal, w0, w1), store.mk_false());
        assert_eq!(store.resolve_binary(BinaryOp::Equal, store.mk_true(), five), store.mk_false());
    }

    #[test]
    fn test_fold_real_comparisons() {
        let store = ExprStore::default();
        let (t, f) = (store.mk_true(), store.mk_false());
        let half = store.mk_real(1, 2);
        let two_quarters = store.intern(Node::Real {
            num: BigInt::from(2),
            den: BigInt::from(4),
        });
        assert_eq!(store.resolve_binary(BinaryOp::Equal, half, two_quarters), t);
        assert_eq!(store.resolve_binary(BinaryOp::Le, two_quarters, half), t);
        assert_eq!(store.resolve_binary(BinaryOp::Equal, store.mk_real(2, 1), store.mk_number(2)), t);
        assert_eq!(store.resolve_binary(BinaryOp::Lt, half, store.mk_number(1)), t);
        assert_eq!(store.resolve_binary(BinaryOp::Gt, store.mk_real(-1, 3), store.mk_number(0)), f);
        assert_eq!(store.resolve_binary(BinaryOp::NotEqual, store.mk_real(1, 3), half), t);
    }

    #[test]
    fn test_undecided_literal_comparisons() {
        let store = ExprStore::default();
        let one = store.mk_number(1);
        let w = store.mk_word(3, 4, false);
        assert_eq!(store.resolve_binary(BinaryOp::Equal, store.mk_true(), one), store.mk_equal(store.mk_true(), one));
        assert_eq!(store.resolve_binary(BinaryOp::Equal, w, one), store.mk_equal(w, one));
        let s1 = store.mk_word(1, 4, true);
        let s2 = store.mk_word(2, 4, true);
        assert_eq!(store.resolve_binary(BinaryOp::Equal, s1, s2), store.mk_false());
        assert_eq!(store.resolve_binary(BinaryOp::Lt, s1, s2), store.mk_binary(BinaryOp::Lt, s1, s2));
    }

    #[test]
    fn test_fold_arithmetic() {
        let store = ExprStore::default();
        let n = |v: i64| store.mk_number(v);
        assert_eq!(store.resolve_binary(BinaryOp::Plus, n(1), n(5)), n(6));
        assert_eq!(store.resolve_binary(BinaryOp::Times, n(3), n(-2)), n(-6));
        assert_eq!(store.resolve_binary(BinaryOp::Mod, n(7), n(2)), n(1));
        let div0 = store.resolve_binary(BinaryOp::Divide, n(7), n(0));
        assert_eq!(div0, store.mk_binary(BinaryOp::Divide, n(7), n(0)));
        assert_eq!(store.resolve_unary(UnaryOp::UMinus, n(4)), n(-4));
    }

    #[test]
    fn test_fold_case() {
        let store = ExprStore::default();
        let c = store.mk_atom("c");
        let a = store.mk_atom("a");
        let b = store.mk_atom("b");
        assert_eq!(store.resolve_case(store.mk_true(), a, b), a);
        assert_eq!(store.resolve_case(store.mk_false(), a, b), b);
        assert_eq!(store.resolve_case(c, a, a), a);
        assert_eq!(store.resolve_case(c, store.mk_true(), store.mk_false()), c);
        assert_eq!(store.resolve_case(c, store.mk_false(), store.mk_true()), store.mk_not(c));
        assert_eq!(store.resolve_case(c, a, b), store.mk_case(c, a, b));
    }

    #[test]
    fn test_fold_casts() {
        let store = ExprStore::default();
        assert_eq!(store.resolve_unary(UnaryOp::CastBool, store.mk_word1(true)), store.mk_true());
        assert_eq!(store.resolve_unary(UnaryOp::CastWord1, store.mk_false()), store.mk_word1(false));
        assert_eq!(store.resolve_unary(UnaryOp::Next, store.mk_number(3)), store.mk_number(3));
        let w = store.mk_word(0b1100, 4, false);
        let sel = store.resolve_bit_select(w, store.mk_number(3), store.mk_number(2));
        assert_eq!(sel, store.mk_word(0b11, 2, false));
    }

    #[test]
    fn test_simplify() {
        let store = ExprStore::default();
        let x = store.mk_atom("x");
        let n = |v: i64| store.mk_number(v);
        // (1 + 5 = 6) & x
        let e = store.mk_and(store.mk_equal(store.mk_plus(n(1), n(5)), n(6)), x);
        assert_eq!(store.simplify(e), x);
        // case 2 < 1 : x; 0 = 0
        let e = store.mk_case(store.mk_binary(BinaryOp::Lt, n(2), n(1)), x, store.mk_equal(n(0), n(0)));
        assert_eq!(store.simplify(e), store.mk_true());
    }
}
