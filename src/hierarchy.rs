//! Flattened model sections consumed by the extractor.

use crate::node::UnaryOp;
use crate::reference::ExprRef;
use crate::store::ExprStore;

/// Kind of target of an assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AssignKind {
    /// `x := e`
    Invariant,
    /// `init(x) := e`
    Init,
    /// `next(x) := e`
    Next,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Assignment {
    pub kind: AssignKind,
    pub var: ExprRef,
    pub value: ExprRef,
}

impl Assignment {
    /// Left-hand side of the assignment: `x`, `init(x)` or `next(x)`.
    pub fn target(&self, store: &ExprStore) -> ExprRef {
        match self.kind {
            AssignKind::Invariant => self.var,
            AssignKind::Init => store.mk_unary(UnaryOp::Init, self.var),
            AssignKind::Next => store.mk_next(self.var),
        }
    }
}

/// The flattened sections of a model, all expressions context-free.
#[derive(Debug, Clone, Default)]
pub struct FlatHierarchy {
    pub init: Vec<ExprRef>,
    pub invar: Vec<ExprRef>,
    pub trans: Vec<ExprRef>,
    pub input: Vec<ExprRef>,
    pub justice: Vec<ExprRef>,
    pub compassion: Vec<ExprRef>,
    pub assigns: Vec<Assignment>,
}

impl FlatHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, kind: AssignKind, var: ExprRef, value: ExprRef) {
        self.assigns.push(Assignment { kind, var, value });
    }

    /// All constraint expressions, section by section.
    pub fn constraints(&self) -> impl Iterator<Item = ExprRef> + '_ {
        self.init
            .iter()
            .chain(&self.invar)
            .chain(&self.trans)
            .chain(&self.input)
            .chain(&self.justice)
            .chain(&self.compassion)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_order() {
        let store = ExprStore::default();
        let (a, b, c) = (store.mk_atom("a"), store.mk_atom("b"), store.mk_atom("c"));
        let mut fh = FlatHierarchy::new();
        fh.trans.push(c);
        fh.init.push(a);
        fh.justice.push(b);
        assert_eq!(fh.constraints().collect::<Vec<_>>(), vec![a, c, b]);
    }

    #[test]
    fn test_assignment_targets() {
        let store = ExprStore::default();
        let x = store.mk_atom("x");
        let one = store.mk_number(1);
        let mut fh = FlatHierarchy::new();
        fh.assign(AssignKind::Init, x, one);
        fh.assign(AssignKind::Next, x, one);
        fh.assign(AssignKind::Invariant, x, one);
        let targets: Vec<_> = fh.assigns.iter().map(|a| store.to_string(a.target(&store))).collect();
        assert_eq!(targets, vec!["init(x)", "next(x)", "x"]);
    }
}
