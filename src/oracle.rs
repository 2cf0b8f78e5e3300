//! The symbol and type oracle consulted by the engine.
//!
//! The normaliser and the extractor never look at declarations themselves:
//! every question about names (what does this identifier denote?) and types
//! (is this sub-expression boolean?) goes through a [`SymbolOracle`].
//! [`SymbTable`][crate::symb_table::SymbTable] is the implementation shipped
//! with the crate.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::reference::{Context, ExprRef};
use crate::types::SymbType;

/// What an identifier resolves to in a given context.
///
/// Every variant carries the fully qualified `name`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResolvedSymbol {
    Variable {
        name: ExprRef,
    },
    /// A definition `name := body`, where `body` must be read in `context`.
    Define {
        name: ExprRef,
        body: ExprRef,
        context: Context,
    },
    Constant {
        name: ExprRef,
    },
    /// A formal module parameter bound to `actual`, read in `context`.
    Parameter {
        name: ExprRef,
        actual: ExprRef,
        context: Context,
    },
    Function {
        name: ExprRef,
    },
    Undefined {
        name: ExprRef,
    },
}

impl ResolvedSymbol {
    pub fn name(&self) -> ExprRef {
        match *self {
            ResolvedSymbol::Variable { name }
            | ResolvedSymbol::Define { name, .. }
            | ResolvedSymbol::Constant { name }
            | ResolvedSymbol::Parameter { name, .. }
            | ResolvedSymbol::Function { name }
            | ResolvedSymbol::Undefined { name } => name,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ResolvedSymbol::Undefined { .. })
    }
}

pub trait SymbolOracle {
    /// Type of `expr` read in `ctx`.
    fn type_of(&self, expr: ExprRef, ctx: Context) -> Result<SymbType>;

    /// Resolves an identifier read in `ctx`.
    fn resolve(&self, ident: ExprRef, ctx: Context) -> Result<ResolvedSymbol>;

    /// Context-free equivalent of `expr`: names are fully qualified, scoped
    /// sub-expressions and parameters are eliminated, and identifiers with
    /// non-constant brackets are expanded. Definitions are kept by name.
    fn flatten(&self, expr: ExprRef, ctx: Context) -> Result<ExprRef>;

    /// State and input variables `expr` depends on, looking through
    /// definitions. `expr` must be context-free.
    fn free_variables(&self, expr: ExprRef) -> Result<BTreeSet<ExprRef>>;
}
