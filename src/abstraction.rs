//! Boolean abstraction of an expression.
//!
//! The extractor summarises every sub-expression either by a *flag* (the
//! expression is constantly true, constantly false, arbitrary, or too large to
//! enumerate) or by the set of expressions it may evaluate to. Boolean
//! connectives combine flags with three-valued logic; a predicate set in
//! boolean position only tells that the value depends on the state, so it is
//! read as [`Arbitrary`][BoolAbstraction::Arbitrary] there.

use std::collections::BTreeSet;
use std::ops::Not;
use std::rc::Rc;

use crate::reference::ExprRef;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BoolAbstraction {
    ConstantTrue,
    ConstantFalse,
    Arbitrary,
    /// The enumeration exceeded the size threshold.
    OverApproximated,
    /// The expressions the analysed expression may evaluate to.
    Predicates(Rc<BTreeSet<ExprRef>>),
}

use BoolAbstraction::*;

impl BoolAbstraction {
    pub fn singleton(e: ExprRef) -> Self {
        Predicates(Rc::new(BTreeSet::from([e])))
    }

    pub fn from_set(set: BTreeSet<ExprRef>) -> Self {
        Predicates(Rc::new(set))
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            ConstantTrue
        } else {
            ConstantFalse
        }
    }

    pub fn is_over_approximated(&self) -> bool {
        matches!(self, OverApproximated)
    }

    /// True, false or arbitrary.
    pub fn is_valid_flag(&self) -> bool {
        matches!(self, ConstantTrue | ConstantFalse | Arbitrary)
    }

    pub fn predicates(&self) -> Option<&BTreeSet<ExprRef>> {
        match self {
            Predicates(set) => Some(set),
            _ => None,
        }
    }

    /// Three-valued reading of a boolean expression's abstraction.
    pub fn truth(&self) -> Self {
        match self {
            Predicates(_) => Arbitrary,
            other => other.clone(),
        }
    }

    /// Applies a three-valued operator, propagating over-approximation.
    fn combine(&self, other: &Self, f: impl FnOnce(Self, Self) -> Self) -> Self {
        if self.is_over_approximated() || other.is_over_approximated() {
            return OverApproximated;
        }
        f(self.truth(), other.truth())
    }

    pub fn and(&self, other: &Self) -> Self {
        self.combine(other, |l, r| match (l, r) {
            (ConstantFalse, _) | (_, ConstantFalse) => ConstantFalse,
            (ConstantTrue, ConstantTrue) => ConstantTrue,
            _ => Arbitrary,
        })
    }

    pub fn or(&self, other: &Self) -> Self {
        self.combine(other, |l, r| match (l, r) {
            (ConstantTrue, _) | (_, ConstantTrue) => ConstantTrue,
            (ConstantFalse, ConstantFalse) => ConstantFalse,
            _ => Arbitrary,
        })
    }

    pub fn implies(&self, other: &Self) -> Self {
        self.combine(other, |l, r| match (l, r) {
            (ConstantFalse, _) | (_, ConstantTrue) => ConstantTrue,
            (ConstantTrue, ConstantFalse) => ConstantFalse,
            _ => Arbitrary,
        })
    }

    /// Equality of booleans; also `iff` and `xnor`.
    pub fn equal(&self, other: &Self) -> Self {
        self.combine(other, |l, r| match (l, r) {
            (Arbitrary, _) | (_, Arbitrary) => Arbitrary,
            (l, r) => BoolAbstraction::from_bool(l == r),
        })
    }

    /// Disequality of booleans; also `xor`.
    pub fn not_equal(&self, other: &Self) -> Self {
        self.equal(other).not()
    }

    /// `self < other` with `FALSE < TRUE`.
    pub fn less(&self, other: &Self) -> Self {
        self.combine(other, |l, r| match (l, r) {
            (ConstantTrue, _) | (_, ConstantFalse) => ConstantFalse,
            (ConstantFalse, ConstantTrue) => ConstantTrue,
            _ => Arbitrary,
        })
    }

    /// `self <= other` with `FALSE < TRUE`.
    pub fn less_eq(&self, other: &Self) -> Self {
        self.combine(other, |l, r| match (l, r) {
            (ConstantFalse, _) | (_, ConstantTrue) => ConstantTrue,
            (ConstantTrue, ConstantFalse) => ConstantFalse,
            _ => Arbitrary,
        })
    }
}

impl Not for BoolAbstraction {
    type Output = BoolAbstraction;

    fn not(self) -> Self::Output {
        match self {
            ConstantTrue => ConstantFalse,
            ConstantFalse => ConstantTrue,
            OverApproximated => OverApproximated,
            Arbitrary | Predicates(_) => Arbitrary,
        }
    }
}
