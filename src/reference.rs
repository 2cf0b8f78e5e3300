use std::fmt::{Display, Formatter};

/// Handle of a hash-consed expression inside an [`ExprStore`][crate::store::ExprStore].
///
/// Two handles are equal iff they denote structurally equal expressions
/// of the same store.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ExprRef(u32);

impl ExprRef {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for ExprRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Naming scope in which identifiers are resolved.
///
/// The root scope has no prefix; any other scope is a qualified name
/// such as `main.sub`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Context(Option<ExprRef>);

impl Context {
    pub const ROOT: Context = Context(None);

    pub const fn new(scope: ExprRef) -> Self {
        Self(Some(scope))
    }

    pub const fn scope(self) -> Option<ExprRef> {
        self.0
    }

    pub const fn is_root(self) -> bool {
        self.0.is_none()
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            None => write!(f, "<root>"),
            Some(scope) => write!(f, "{}", scope),
        }
    }
}
