//! # Symbol table
//!
//! A self-contained [`SymbolOracle`] holding the declarations of a flat model:
//! variables (optionally grouped in arrays), definitions, symbolic constants,
//! module parameters and uninterpreted functions.
//!
//! Names are stored fully qualified. Identifiers are resolved by prefixing
//! them with the context they are read in; constants and functions are
//! global and resolve to themselves.
//!
//! ```
//! use pne_rs::oracle::{ResolvedSymbol, SymbolOracle};
//! use pne_rs::reference::Context;
//! use pne_rs::store::ExprStore;
//! use pne_rs::symb_table::SymbTable;
//! use pne_rs::types::SymbType;
//!
//! let store = ExprStore::default();
//! let mut st = SymbTable::new(&store);
//! st.declare_var(store.mk_name("m.x"), SymbType::range(0, 3));
//!
//! let ctx = Context::new(store.mk_atom("m"));
//! let x = store.mk_atom("x");
//! assert_eq!(
//!     st.resolve(x, ctx).unwrap(),
//!     ResolvedSymbol::Variable { name: store.mk_name("m.x") }
//! );
//! assert!(st.type_of(x, ctx).unwrap().is_integer());
//! ```

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use log::trace;

use crate::error::{PneError, Result};
use crate::node::{BinaryOp, Node, UnaryOp};
use crate::oracle::{ResolvedSymbol, SymbolOracle};
use crate::reference::{Context, ExprRef};
use crate::store::ExprStore;
use crate::types::SymbType;

/// Signature of an uninterpreted function.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FunctionSig {
    pub args: Vec<SymbType>,
    pub ret: SymbType,
}

pub struct SymbTable<'s> {
    store: &'s ExprStore,
    vars: HashMap<ExprRef, SymbType>,
    var_order: Vec<ExprRef>,
    defines: HashMap<ExprRef, (ExprRef, Context)>,
    constants: HashMap<ExprRef, SymbType>,
    params: HashMap<ExprRef, (ExprRef, Context)>,
    functions: HashMap<ExprRef, FunctionSig>,
    /// Variable arrays: base name to index bounds.
    arrays: HashMap<ExprRef, (i64, i64)>,
    type_cache: RefCell<HashMap<(Context, ExprRef), SymbType>>,
}

impl<'s> SymbTable<'s> {
    pub fn new(store: &'s ExprStore) -> Self {
        Self {
            store,
            vars: HashMap::new(),
            var_order: Vec::new(),
            defines: HashMap::new(),
            constants: HashMap::new(),
            params: HashMap::new(),
            functions: HashMap::new(),
            arrays: HashMap::new(),
            type_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &'s ExprStore {
        self.store
    }

    fn invalidate(&mut self) {
        self.type_cache.get_mut().clear();
    }

    /// Declares a state or input variable.
    pub fn declare_var(&mut self, name: ExprRef, ty: SymbType) {
        if self.vars.insert(name, ty).is_none() {
            self.var_order.push(name);
        }
        self.invalidate();
    }

    /// Declares the variables `base[lo]`, ..., `base[hi]`.
    ///
    /// # Panics
    ///
    /// Panics if `lo > hi`.
    pub fn declare_var_array(&mut self, base: ExprRef, lo: i64, hi: i64, ty: SymbType) {
        assert!(lo <= hi, "Empty array bounds {}..{}", lo, hi);
        for k in lo..=hi {
            let name = self.store.mk_array(base, self.store.mk_number(k));
            self.declare_var(name, ty.clone());
        }
        self.arrays.insert(base, (lo, hi));
    }

    /// Declares `name := body`, with `body` read in `ctx`.
    pub fn declare_define(&mut self, name: ExprRef, body: ExprRef, ctx: Context) {
        self.defines.insert(name, (body, ctx));
        self.invalidate();
    }

    /// Declares a symbolic constant (an enumeration value).
    pub fn declare_constant(&mut self, name: ExprRef) {
        self.constants.insert(name, SymbType::Symbolic);
        self.invalidate();
    }

    /// Binds the formal parameter `name` to `actual`, read in `ctx`.
    pub fn declare_parameter(&mut self, name: ExprRef, actual: ExprRef, ctx: Context) {
        self.params.insert(name, (actual, ctx));
        self.invalidate();
    }

    pub fn declare_function(&mut self, name: ExprRef, sig: FunctionSig) {
        self.functions.insert(name, sig);
        self.invalidate();
    }

    pub fn var_type(&self, name: ExprRef) -> Option<&SymbType> {
        self.vars.get(&name)
    }

    /// Declared variables, in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = ExprRef> + '_ {
        self.var_order.iter().copied()
    }

    fn undefined(&self, name: ExprRef) -> PneError {
        PneError::UndefinedSymbol(self.store.to_string(name))
    }

    fn ill_typed(&self, e: ExprRef, reason: &str) -> PneError {
        PneError::IllTyped(self.store.to_string(e), reason.to_string())
    }

    /// Qualified name of the base of a bracket identifier, following parameters.
    fn array_base(&self, base: ExprRef, ctx: Context) -> Result<ExprRef> {
        match self.resolve(base, ctx)? {
            ResolvedSymbol::Parameter { actual, context, .. } => self.array_base(actual, context),
            sym => Ok(sym.name()),
        }
    }

    /// Bracket index folded to a number, if it is constant.
    fn constant_index(&self, index: ExprRef) -> Option<ExprRef> {
        let index = self.store.simplify(index);
        self.store.number_value(index).map(|_| index)
    }

    fn bit_index(&self, e: ExprRef, ctx: Context) -> Result<i64> {
        let flat = self.flatten(e, ctx)?;
        let value = self.store.simplify(flat);
        self.store
            .number_value(value)
            .and_then(|n| i64::try_from(n).ok())
            .ok_or_else(|| self.ill_typed(e, "bit index is not a constant"))
    }

    fn flatten_array(&self, base: ExprRef, index: ExprRef, ctx: Context) -> Result<ExprRef> {
        let store = self.store;
        let base = self.array_base(base, ctx)?;
        let index = store.simplify(self.flatten(index, ctx)?);

        if store.number_value(index).is_some() {
            let name = store.mk_array(base, index);
            return if self.vars.contains_key(&name) || self.defines.contains_key(&name) {
                Ok(name)
            } else {
                Err(self.undefined(name))
            };
        }

        if let Some(&(lo, hi)) = self.arrays.get(&base) {
            let branches: Vec<_> = (lo..=hi)
                .map(|k| {
                    let k = store.mk_number(k);
                    (store.mk_equal(index, k), store.mk_array(base, k))
                })
                .collect();
            trace!("expanding {}[{}] over {}..{}", store.display(base), store.display(index), lo, hi);
            return Ok(store.mk_case_list(&branches, store.mk_failure()));
        }

        match self.vars.get(&base) {
            Some(ty) if ty.is_word_array() || ty.is_int_array() => Ok(store.mk_binary(BinaryOp::WaRead, base, index)),
            _ => Err(self.undefined(store.mk_array(base, index))),
        }
    }

    fn infer(&self, e: ExprRef, ctx: Context) -> Result<SymbType> {
        let ty = match self.store.node(e) {
            Node::True | Node::False => SymbType::Boolean,
            Node::Failure => SymbType::NoType,
            Node::Number(_) => SymbType::Integer,
            Node::Word { width, signed, .. } => {
                if signed {
                    SymbType::SignedWord(width)
                } else {
                    SymbType::UnsignedWord(width)
                }
            }
            Node::Real { .. } => SymbType::Real,
            Node::Range(..) => SymbType::SetInt,
            Node::Atom(_) | Node::Dot(..) | Node::Array(..) => match self.resolve(e, ctx)? {
                ResolvedSymbol::Variable { name } => self.vars[&name].clone(),
                ResolvedSymbol::Define { body, context, .. } => self.type_of(body, context)?,
                ResolvedSymbol::Constant { name } => self.constants[&name].clone(),
                ResolvedSymbol::Parameter { actual, context, .. } => self.type_of(actual, context)?,
                ResolvedSymbol::Function { name } => self.functions[&name].ret.clone(),
                ResolvedSymbol::Undefined { name } => match self.store.node(e) {
                    Node::Array(..) => {
                        let flat = self.flatten(e, ctx)?;
                        self.type_of(flat, Context::ROOT)?
                    }
                    _ => return Err(self.undefined(name)),
                },
            },
            Node::Context(scope, body) => self.type_of(body, self.store.concat_contexts(ctx, scope))?,
            Node::Unary(op, a) => {
                let t = self.type_of(a, ctx)?;
                match op {
                    UnaryOp::Not | UnaryOp::Next | UnaryOp::Init | UnaryOp::TypeOf => t,
                    UnaryOp::UMinus if t.is_boolean() => SymbType::Integer,
                    UnaryOp::UMinus => t,
                    UnaryOp::Floor | UnaryOp::ToInt => SymbType::Integer,
                    UnaryOp::CastBool => SymbType::Boolean,
                    UnaryOp::CastWord1 => SymbType::UnsignedWord(1),
                    UnaryOp::CastSigned | UnaryOp::CastUnsigned => {
                        let width = t.word_width().ok_or_else(|| self.ill_typed(e, "expected a word"))?;
                        if op == UnaryOp::CastSigned {
                            SymbType::SignedWord(width)
                        } else {
                            SymbType::UnsignedWord(width)
                        }
                    }
                    _ => SymbType::Boolean,
                }
            }
            Node::Binary(op, l, r) => self.infer_binary(e, op, l, r, ctx)?,
            Node::BitSelect(_, hi, lo) => {
                let hi = self.bit_index(hi, ctx)?;
                let lo = self.bit_index(lo, ctx)?;
                if lo > hi || lo < 0 {
                    return Err(self.ill_typed(e, "bad bit range"));
                }
                SymbType::UnsignedWord((hi - lo + 1) as u32)
            }
            Node::WaWrite(a, ..) => self.type_of(a, ctx)?,
            Node::Case(_, t, tail) => {
                let tt = self.type_of(t, ctx)?;
                if self.store.is_failure(tail) {
                    tt
                } else {
                    tt.branch_join(&self.type_of(tail, ctx)?)
                }
            }
            Node::Function(name, _) => match self.resolve(name, ctx)? {
                ResolvedSymbol::Function { name } => self.functions[&name].ret.clone(),
                _ => return Err(self.ill_typed(e, "not a function")),
            },
            Node::Count(_) => SymbType::Integer,
        };
        Ok(ty)
    }

    fn infer_binary(&self, e: ExprRef, op: BinaryOp, l: ExprRef, r: ExprRef, ctx: Context) -> Result<SymbType> {
        if op.is_relational() || op.is_temporal() {
            return Ok(SymbType::Boolean);
        }
        let lt = self.type_of(l, ctx)?;
        let bit_width = |t: &SymbType| {
            if t.is_boolean() {
                Some(1)
            } else {
                t.word_width()
            }
        };
        let ty = match op {
            _ if op.is_connective() => {
                let rt = self.type_of(r, ctx)?;
                if lt.is_boolean() && rt.is_boolean() {
                    SymbType::Boolean
                } else {
                    lt.arithmetic_join(&rt)
                }
            }
            BinaryOp::LShift | BinaryOp::RShift => lt,
            BinaryOp::Concat => {
                let rt = self.type_of(r, ctx)?;
                match (bit_width(&lt), bit_width(&rt)) {
                    (Some(a), Some(b)) => SymbType::UnsignedWord(a + b),
                    _ => return Err(self.ill_typed(e, "concatenation of non-words")),
                }
            }
            BinaryOp::Extend | BinaryOp::WResize => {
                let width = lt.word_width().ok_or_else(|| self.ill_typed(e, "expected a word"))?;
                let n = self.bit_index(r, ctx)?;
                let width = if op == BinaryOp::Extend { width as i64 + n } else { n };
                if width < 1 {
                    return Err(self.ill_typed(e, "bad word width"));
                }
                if lt.is_signed_word() {
                    SymbType::SignedWord(width as u32)
                } else {
                    SymbType::UnsignedWord(width as u32)
                }
            }
            BinaryOp::Union => {
                let rt = self.type_of(r, ctx)?;
                if lt.is_boolean_like() && rt.is_boolean_like() {
                    SymbType::SetBool
                } else {
                    SymbType::SetInt
                }
            }
            BinaryOp::WaRead => match lt {
                SymbType::WordArray { value, .. } => SymbType::UnsignedWord(value),
                SymbType::IntArray => SymbType::Integer,
                _ => return Err(self.ill_typed(e, "read from a non-array")),
            },
            _ => lt.arithmetic_join(&self.type_of(r, ctx)?),
        };
        Ok(ty)
    }

    fn collect_deps(&self, e: ExprRef, ctx: Context, acc: &mut BTreeSet<ExprRef>) -> Result<()> {
        match self.store.node(e) {
            Node::Atom(_) | Node::Dot(..) | Node::Array(..) => match self.resolve(e, ctx)? {
                ResolvedSymbol::Variable { name } => {
                    acc.insert(name);
                }
                ResolvedSymbol::Define { body, context, .. } => self.collect_deps(body, context, acc)?,
                ResolvedSymbol::Parameter { actual, context, .. } => self.collect_deps(actual, context, acc)?,
                ResolvedSymbol::Constant { .. } | ResolvedSymbol::Function { .. } => {}
                ResolvedSymbol::Undefined { name } => match self.store.node(e) {
                    Node::Array(..) => {
                        let flat = self.flatten(e, ctx)?;
                        self.collect_deps(flat, Context::ROOT, acc)?;
                    }
                    _ => return Err(self.undefined(name)),
                },
            },
            Node::Context(scope, body) => self.collect_deps(body, self.store.concat_contexts(ctx, scope), acc)?,
            Node::Function(_, args) => {
                for arg in args {
                    self.collect_deps(arg, ctx, acc)?;
                }
            }
            node => {
                for child in node.children() {
                    self.collect_deps(child, ctx, acc)?;
                }
            }
        }
        Ok(())
    }
}

impl SymbolOracle for SymbTable<'_> {
    fn type_of(&self, expr: ExprRef, ctx: Context) -> Result<SymbType> {
        if let Some(ty) = self.type_cache.borrow().get(&(ctx, expr)) {
            return Ok(ty.clone());
        }
        let ty = self.infer(expr, ctx)?;
        self.type_cache.borrow_mut().insert((ctx, expr), ty.clone());
        Ok(ty)
    }

    fn resolve(&self, ident: ExprRef, ctx: Context) -> Result<ResolvedSymbol> {
        let store = self.store;
        let node = store.node(ident);
        if !node.is_identifier() {
            return Err(PneError::NotAnIdentifier(store.to_string(ident)));
        }
        if self.constants.contains_key(&ident) {
            return Ok(ResolvedSymbol::Constant { name: ident });
        }
        if self.functions.contains_key(&ident) {
            return Ok(ResolvedSymbol::Function { name: ident });
        }

        let name = match node {
            Node::Array(base, index) => {
                let base = self.array_base(base, ctx)?;
                match self.constant_index(index) {
                    Some(index) => store.mk_array(base, index),
                    None => {
                        return Ok(ResolvedSymbol::Undefined {
                            name: store.mk_array(base, index),
                        })
                    }
                }
            }
            _ => store.qualify(ctx, ident),
        };

        let sym = if self.vars.contains_key(&name) {
            ResolvedSymbol::Variable { name }
        } else if let Some(&(body, context)) = self.defines.get(&name) {
            ResolvedSymbol::Define { name, body, context }
        } else if let Some(&(actual, context)) = self.params.get(&name) {
            ResolvedSymbol::Parameter { name, actual, context }
        } else if self.constants.contains_key(&name) {
            ResolvedSymbol::Constant { name }
        } else {
            ResolvedSymbol::Undefined { name }
        };
        Ok(sym)
    }

    fn flatten(&self, expr: ExprRef, ctx: Context) -> Result<ExprRef> {
        let store = self.store;
        let flat = match store.node(expr) {
            Node::True
            | Node::False
            | Node::Failure
            | Node::Number(_)
            | Node::Word { .. }
            | Node::Real { .. }
            | Node::Range(..) => expr,
            Node::Atom(_) | Node::Dot(..) | Node::Array(..) => match self.resolve(expr, ctx)? {
                ResolvedSymbol::Parameter { actual, context, .. } => self.flatten(actual, context)?,
                ResolvedSymbol::Undefined { name } => match store.node(expr) {
                    Node::Array(base, index) => self.flatten_array(base, index, ctx)?,
                    _ => return Err(self.undefined(name)),
                },
                sym => sym.name(),
            },
            Node::Context(scope, body) => self.flatten(body, store.concat_contexts(ctx, scope))?,
            Node::Unary(op, a) => store.mk_unary(op, self.flatten(a, ctx)?),
            Node::Binary(op, l, r) => store.mk_binary(op, self.flatten(l, ctx)?, self.flatten(r, ctx)?),
            Node::BitSelect(w, hi, lo) => {
                store.mk_bit_select(self.flatten(w, ctx)?, self.flatten(hi, ctx)?, self.flatten(lo, ctx)?)
            }
            Node::WaWrite(a, i, v) => {
                store.mk_wawrite(self.flatten(a, ctx)?, self.flatten(i, ctx)?, self.flatten(v, ctx)?)
            }
            Node::Case(c, t, tail) => {
                store.mk_case(self.flatten(c, ctx)?, self.flatten(t, ctx)?, self.flatten(tail, ctx)?)
            }
            Node::Function(name, args) => {
                let name = match self.resolve(name, ctx)? {
                    ResolvedSymbol::Function { name } => name,
                    _ => return Err(self.ill_typed(expr, "not a function")),
                };
                let args = args.into_iter().map(|a| self.flatten(a, ctx)).collect::<Result<Vec<_>>>()?;
                store.mk_function(name, args)
            }
            Node::Count(args) => {
                let args = args.into_iter().map(|a| self.flatten(a, ctx)).collect::<Result<Vec<_>>>()?;
                store.mk_count(args)
            }
        };
        Ok(flat)
    }

    fn free_variables(&self, expr: ExprRef) -> Result<BTreeSet<ExprRef>> {
        let mut acc = BTreeSet::new();
        self.collect_deps(expr, Context::ROOT, &mut acc)?;
        Ok(acc)
    }
}
