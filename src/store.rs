//! # Expression store
//!
//! [`ExprStore`] owns every expression node and hash-conses them: building the
//! same node twice yields the same [`ExprRef`], so handle equality is
//! structural equality and sub-expressions are shared.
//!
//! Nodes are never removed. Handles therefore stay valid for the whole
//! lifetime of the store, which is what lets the normaliser and extractor
//! keep them as memo keys.
//!
//! The `mk_*` constructors only intern; the `resolve_*` family (see
//! [`resolve`][crate::resolve]) additionally folds constants.
//!
//! ```
//! use pne_rs::store::ExprStore;
//!
//! let store = ExprStore::default();
//! let a = store.mk_atom("a");
//! let two = store.mk_number(2);
//! let e1 = store.mk_equal(a, two);
//! let e2 = store.mk_equal(store.mk_atom("a"), store.mk_number(2));
//! assert_eq!(e1, e2);
//! assert_eq!(store.to_string(e1), "a = 2");
//! ```

use std::cell::RefCell;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;

use crate::node::{BinaryOp, Node, Tag, UnaryOp};
use crate::reference::{Context, ExprRef};
use crate::table::Table;

pub struct ExprStore {
    table: RefCell<Table<Node>>,
    tt: ExprRef,
    ff: ExprRef,
    failure: ExprRef,
}

impl Default for ExprStore {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ExprStore {
    /// Creates a store whose hash-consing table has `2^min(bits, 16)` buckets.
    pub fn new(bits: usize) -> Self {
        let mut table = Table::new(bits);
        let tt = ExprRef::new(table.put(Node::True) as u32);
        let ff = ExprRef::new(table.put(Node::False) as u32);
        let failure = ExprRef::new(table.put(Node::Failure) as u32);
        Self {
            table: RefCell::new(table),
            tt,
            ff,
            failure,
        }
    }

    /// Number of distinct nodes stored so far.
    pub fn size(&self) -> usize {
        self.table.borrow().size()
    }

    /// Interns a node, returning the handle of the (possibly pre-existing) equal node.
    pub fn intern(&self, node: Node) -> ExprRef {
        let index = self.table.borrow_mut().put(node);
        ExprRef::new(index as u32)
    }

    /// Looks a node up without interning it.
    pub fn find(&self, node: &Node) -> Option<ExprRef> {
        self.table.borrow().find(node).map(|i| ExprRef::new(i as u32))
    }

    /// Returns a copy of the node behind a handle.
    pub fn node(&self, e: ExprRef) -> Node {
        self.table.borrow()[e.index()].clone()
    }

    pub fn tag_of(&self, e: ExprRef) -> Tag {
        self.table.borrow()[e.index()].tag()
    }

    pub fn children_of(&self, e: ExprRef) -> Vec<ExprRef> {
        self.table.borrow()[e.index()].children()
    }

    pub fn is_leaf(&self, e: ExprRef) -> bool {
        self.table.borrow()[e.index()].is_leaf()
    }

    pub fn is_constant(&self, e: ExprRef) -> bool {
        self.table.borrow()[e.index()].is_constant()
    }

    pub fn is_identifier(&self, e: ExprRef) -> bool {
        self.table.borrow()[e.index()].is_identifier()
    }
}

// Terminals
impl ExprStore {
    pub fn mk_true(&self) -> ExprRef {
        self.tt
    }
    pub fn mk_false(&self) -> ExprRef {
        self.ff
    }
    pub fn mk_failure(&self) -> ExprRef {
        self.failure
    }
    pub fn mk_bool(&self, value: bool) -> ExprRef {
        if value {
            self.tt
        } else {
            self.ff
        }
    }

    pub fn is_true(&self, e: ExprRef) -> bool {
        e == self.tt
    }
    pub fn is_false(&self, e: ExprRef) -> bool {
        e == self.ff
    }
    pub fn is_failure(&self, e: ExprRef) -> bool {
        e == self.failure
    }
}

// Leaf constructors
impl ExprStore {
    pub fn mk_number(&self, value: impl Into<BigInt>) -> ExprRef {
        self.intern(Node::Number(value.into()))
    }

    /// Word constant of the given width; `value` is truncated to `width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0 or larger than 64.
    pub fn mk_word(&self, value: u64, width: u32, signed: bool) -> ExprRef {
        assert!((1..=64).contains(&width), "Word width must be in 1..=64");
        let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
        self.intern(Node::Word {
            value: value & mask,
            width,
            signed,
        })
    }

    /// The one-bit unsigned words `0ud1_0` and `0ud1_1`.
    pub fn mk_word1(&self, bit: bool) -> ExprRef {
        self.mk_word(bit as u64, 1, false)
    }

    /// Rational constant `num/den`, in lowest terms with the sign on `num`.
    /// Integral values are interned as numbers, so `4/2` is `2`.
    ///
    /// # Panics
    ///
    /// Panics if `den` is 0.
    pub fn mk_real(&self, num: impl Into<BigInt>, den: impl Into<BigInt>) -> ExprRef {
        let (mut num, mut den) = (num.into(), den.into());
        assert!(den.sign() != Sign::NoSign, "Real denominator is 0");
        if den.sign() == Sign::Minus {
            num = -num;
            den = -den;
        }
        let g = num.gcd(&den);
        let (num, den) = (num / &g, den / &g);
        if den == BigInt::from(1) {
            self.mk_number(num)
        } else {
            self.intern(Node::Real { num, den })
        }
    }

    pub fn mk_atom(&self, name: &str) -> ExprRef {
        self.intern(Node::Atom(name.to_string()))
    }

    /// Builds a qualified name from its dotted form, e.g. `main.sub.x`.
    ///
    /// Bracket syntax is not parsed; use [`mk_array`][Self::mk_array].
    pub fn mk_name(&self, path: &str) -> ExprRef {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        parts.fold(self.mk_atom(first), |prefix, part| self.mk_dot(prefix, self.mk_atom(part)))
    }
}

// Raw (non-simplifying) constructors
impl ExprStore {
    pub fn mk_dot(&self, prefix: ExprRef, atom: ExprRef) -> ExprRef {
        self.intern(Node::Dot(prefix, atom))
    }

    pub fn mk_array(&self, base: ExprRef, index: ExprRef) -> ExprRef {
        self.intern(Node::Array(base, index))
    }

    pub fn mk_range(&self, lo: ExprRef, hi: ExprRef) -> ExprRef {
        self.intern(Node::Range(lo, hi))
    }

    pub fn mk_unary(&self, op: UnaryOp, e: ExprRef) -> ExprRef {
        self.intern(Node::Unary(op, e))
    }

    pub fn mk_binary(&self, op: BinaryOp, l: ExprRef, r: ExprRef) -> ExprRef {
        self.intern(Node::Binary(op, l, r))
    }

    pub fn mk_not(&self, e: ExprRef) -> ExprRef {
        self.mk_unary(UnaryOp::Not, e)
    }
    pub fn mk_next(&self, e: ExprRef) -> ExprRef {
        self.mk_unary(UnaryOp::Next, e)
    }
    pub fn mk_and(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::And, l, r)
    }
    pub fn mk_or(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::Or, l, r)
    }
    pub fn mk_equal(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::Equal, l, r)
    }
    pub fn mk_plus(&self, l: ExprRef, r: ExprRef) -> ExprRef {
        self.mk_binary(BinaryOp::Plus, l, r)
    }

    pub fn mk_bit_select(&self, word: ExprRef, hi: ExprRef, lo: ExprRef) -> ExprRef {
        self.intern(Node::BitSelect(word, hi, lo))
    }

    pub fn mk_wawrite(&self, array: ExprRef, index: ExprRef, value: ExprRef) -> ExprRef {
        self.intern(Node::WaWrite(array, index, value))
    }

    /// `case cond : then; tail` (equivalently `cond ? then : tail`).
    pub fn mk_case(&self, cond: ExprRef, then: ExprRef, tail: ExprRef) -> ExprRef {
        self.intern(Node::Case(cond, then, tail))
    }

    /// Builds a case list from `(condition, value)` pairs ending with `tail`.
    pub fn mk_case_list(&self, branches: &[(ExprRef, ExprRef)], tail: ExprRef) -> ExprRef {
        branches
            .iter()
            .rev()
            .fold(tail, |acc, &(cond, then)| self.mk_case(cond, then, acc))
    }

    pub fn mk_context(&self, scope: ExprRef, body: ExprRef) -> ExprRef {
        self.intern(Node::Context(scope, body))
    }

    pub fn mk_function(&self, name: ExprRef, args: Vec<ExprRef>) -> ExprRef {
        self.intern(Node::Function(name, args))
    }

    pub fn mk_count(&self, args: Vec<ExprRef>) -> ExprRef {
        self.intern(Node::Count(args))
    }
}

// Queries
impl ExprStore {
    pub fn is_case(&self, e: ExprRef) -> bool {
        self.tag_of(e) == Tag::Case
    }

    /// Condition, then-branch and tail of a case node.
    pub fn case_parts(&self, e: ExprRef) -> Option<(ExprRef, ExprRef, ExprRef)> {
        match self.node(e) {
            Node::Case(c, t, tail) => Some((c, t, tail)),
            _ => None,
        }
    }

    pub fn number_value(&self, e: ExprRef) -> Option<BigInt> {
        match self.node(e) {
            Node::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_number(&self, e: ExprRef, value: i64) -> bool {
        self.number_value(e) == Some(BigInt::from(value))
    }

    /// Prefixes every component of the name `name` with `prefix`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not an identifier.
    pub fn prefix_name(&self, prefix: ExprRef, name: ExprRef) -> ExprRef {
        match self.node(name) {
            Node::Atom(_) => self.mk_dot(prefix, name),
            Node::Dot(l, r) => {
                let l = self.prefix_name(prefix, l);
                self.mk_dot(l, r)
            }
            Node::Array(base, index) => {
                let base = self.prefix_name(prefix, base);
                self.mk_array(base, index)
            }
            _ => panic!("`{}` is not a name", self.to_string(name)),
        }
    }

    /// Qualifies an identifier with the prefix of a context.
    pub fn qualify(&self, ctx: Context, name: ExprRef) -> ExprRef {
        match ctx.scope() {
            None => name,
            Some(prefix) => self.prefix_name(prefix, name),
        }
    }

    /// Context obtained by entering scope `scope` from within `outer`.
    pub fn concat_contexts(&self, outer: Context, scope: ExprRef) -> Context {
        Context::new(self.qualify(outer, scope))
    }
}
