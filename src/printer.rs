//! Human-readable rendering of expressions.
//!
//! Binary operators print infix with parentheses around compound operands,
//! single conditionals print as `c ? t : e`, and longer chains (or chains
//! ending in `FAILURE`) print as `case c1 : e1; c2 : e2; esac`.

use std::fmt::{self, Display, Formatter};

use crate::node::{Node, UnaryOp};
use crate::reference::ExprRef;
use crate::store::ExprStore;

/// Borrowing [`Display`] adapter for an expression.
pub struct ExprDisplay<'a> {
    store: &'a ExprStore,
    expr: ExprRef,
}

impl Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.store.fmt_expr(f, self.expr, false)
    }
}

impl ExprStore {
    pub fn display(&self, e: ExprRef) -> ExprDisplay<'_> {
        ExprDisplay { store: self, expr: e }
    }

    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self, e: ExprRef) -> String {
        self.display(e).to_string()
    }

    fn is_compound(&self, e: ExprRef) -> bool {
        match self.node(e) {
            Node::Binary(op, ..) => !op.is_functional(),
            Node::Unary(op, _) => op.is_temporal(),
            Node::Case(_, _, tail) => !self.is_failure(tail) && !self.is_case(tail),
            _ => false,
        }
    }

    fn fmt_expr(&self, f: &mut Formatter<'_>, e: ExprRef, nested: bool) -> fmt::Result {
        if nested && self.is_compound(e) {
            write!(f, "(")?;
            self.fmt_expr(f, e, false)?;
            return write!(f, ")");
        }

        match self.node(e) {
            Node::True => write!(f, "TRUE"),
            Node::False => write!(f, "FALSE"),
            Node::Failure => write!(f, "FAILURE"),
            Node::Number(n) => write!(f, "{}", n),
            Node::Word { value, width, signed } => {
                write!(f, "0{}d{}_{}", if signed { "s" } else { "u" }, width, value)
            }
            Node::Real { num, den } => write!(f, "{}/{}", num, den),
            Node::Atom(name) => write!(f, "{}", name),
            Node::Dot(prefix, atom) => {
                self.fmt_expr(f, prefix, true)?;
                write!(f, ".")?;
                self.fmt_expr(f, atom, true)
            }
            Node::Array(base, index) => {
                self.fmt_expr(f, base, true)?;
                write!(f, "[")?;
                self.fmt_expr(f, index, false)?;
                write!(f, "]")
            }
            Node::Range(lo, hi) => {
                self.fmt_expr(f, lo, true)?;
                write!(f, "..")?;
                self.fmt_expr(f, hi, true)
            }
            Node::Unary(op, a) => {
                if op.is_functional() {
                    write!(f, "{}(", op.symbol())?;
                    self.fmt_expr(f, a, false)?;
                    write!(f, ")")
                } else if matches!(op, UnaryOp::Not | UnaryOp::UMinus) {
                    write!(f, "{}", op.symbol())?;
                    self.fmt_expr(f, a, true)
                } else {
                    write!(f, "{} ", op.symbol())?;
                    self.fmt_expr(f, a, true)
                }
            }
            Node::Binary(op, l, r) => {
                if op.is_functional() {
                    write!(f, "{}(", op.symbol())?;
                    self.fmt_expr(f, l, false)?;
                    write!(f, ", ")?;
                    self.fmt_expr(f, r, false)?;
                    write!(f, ")")
                } else {
                    self.fmt_expr(f, l, true)?;
                    write!(f, " {} ", op.symbol())?;
                    self.fmt_expr(f, r, true)
                }
            }
            Node::BitSelect(w, hi, lo) => {
                self.fmt_expr(f, w, true)?;
                write!(f, "[")?;
                self.fmt_expr(f, hi, true)?;
                write!(f, ":")?;
                self.fmt_expr(f, lo, true)?;
                write!(f, "]")
            }
            Node::WaWrite(a, i, v) => {
                write!(f, "WRITE(")?;
                self.fmt_args(f, &[a, i, v])?;
                write!(f, ")")
            }
            Node::Case(c, t, tail) => {
                if !self.is_failure(tail) && !self.is_case(tail) {
                    self.fmt_expr(f, c, true)?;
                    write!(f, " ? ")?;
                    self.fmt_expr(f, t, true)?;
                    write!(f, " : ")?;
                    return self.fmt_expr(f, tail, true);
                }
                write!(f, "case")?;
                let mut cur = e;
                while let Some((c, t, tail)) = self.case_parts(cur) {
                    write!(f, " ")?;
                    self.fmt_expr(f, c, false)?;
                    write!(f, " : ")?;
                    self.fmt_expr(f, t, false)?;
                    write!(f, ";")?;
                    cur = tail;
                }
                if !self.is_failure(cur) {
                    write!(f, " TRUE : ")?;
                    self.fmt_expr(f, cur, false)?;
                    write!(f, ";")?;
                }
                write!(f, " esac")
            }
            Node::Context(scope, body) => {
                self.fmt_expr(f, scope, true)?;
                write!(f, "::{{")?;
                self.fmt_expr(f, body, false)?;
                write!(f, "}}")
            }
            Node::Function(name, args) => {
                self.fmt_expr(f, name, true)?;
                write!(f, "(")?;
                self.fmt_args(f, &args)?;
                write!(f, ")")
            }
            Node::Count(args) => {
                write!(f, "count(")?;
                self.fmt_args(f, &args)?;
                write!(f, ")")
            }
        }
    }

    fn fmt_args(&self, f: &mut Formatter<'_>, args: &[ExprRef]) -> fmt::Result {
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.fmt_expr(f, arg, false)?;
        }
        Ok(())
    }
}
