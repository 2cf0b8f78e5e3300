use num_bigint::BigInt;

use crate::reference::ExprRef;
use crate::utils::{hash_bytes, pairing2, pairing3, pairing_seq, MyHash};

/// Single-operand operators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    Not,
    UMinus,
    Next,
    Init,
    Floor,
    ToInt,
    /// `bool(w)`: cast of a one-bit word to boolean.
    CastBool,
    /// `word1(b)`: cast of a boolean to a one-bit word.
    CastWord1,
    CastSigned,
    CastUnsigned,
    TypeOf,
    // CTL
    Ex,
    Ax,
    Ef,
    Af,
    Eg,
    Ag,
    // LTL
    OpNext,
    OpPrec,
    OpNotPrecNot,
    OpGlobal,
    OpHistorical,
    OpFuture,
    OpOnce,
}

impl UnaryOp {
    pub fn is_temporal(self) -> bool {
        use UnaryOp::*;
        matches!(
            self,
            Ex | Ax | Ef | Af | Eg | Ag | OpNext | OpPrec | OpNotPrecNot | OpGlobal | OpHistorical | OpFuture | OpOnce
        )
    }

    /// Operators rendered as `op(x)` rather than a prefix symbol.
    pub fn is_functional(self) -> bool {
        !matches!(self, UnaryOp::Not | UnaryOp::UMinus) && !self.is_temporal()
    }

    pub fn symbol(self) -> &'static str {
        use UnaryOp::*;
        match self {
            Not => "!",
            UMinus => "-",
            Next => "next",
            Init => "init",
            Floor => "floor",
            ToInt => "toint",
            CastBool => "bool",
            CastWord1 => "word1",
            CastSigned => "signed",
            CastUnsigned => "unsigned",
            TypeOf => "typeof",
            Ex => "EX",
            Ax => "AX",
            Ef => "EF",
            Af => "AF",
            Eg => "EG",
            Ag => "AG",
            OpNext => "X",
            OpPrec => "Y",
            OpNotPrecNot => "Z",
            OpGlobal => "G",
            OpHistorical => "H",
            OpFuture => "F",
            OpOnce => "O",
        }
    }
}

/// Two-operand operators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Xnor,
    Iff,
    Implies,
    Equal,
    NotEqual,
    Lt,
    Gt,
    Le,
    Ge,
    /// Assignment `lhs := rhs`.
    EqDef,
    SetIn,
    Plus,
    Minus,
    Times,
    Divide,
    Mod,
    LShift,
    RShift,
    Concat,
    Union,
    /// Word-array read `READ(array, index)`.
    WaRead,
    Extend,
    WResize,
    // Temporal
    Until,
    Since,
    Au,
    Eu,
}

impl BinaryOp {
    /// Boolean connectives (bitwise on words).
    pub fn is_connective(self) -> bool {
        use BinaryOp::*;
        matches!(self, And | Or | Xor | Xnor | Iff | Implies)
    }

    /// Comparisons, set membership and assignment; all yield booleans.
    pub fn is_relational(self) -> bool {
        use BinaryOp::*;
        matches!(self, Equal | NotEqual | Lt | Gt | Le | Ge | EqDef | SetIn)
    }

    pub fn is_arithmetic(self) -> bool {
        use BinaryOp::*;
        matches!(self, Plus | Minus | Times | Divide | Mod | LShift | RShift)
    }

    pub fn is_temporal(self) -> bool {
        use BinaryOp::*;
        matches!(self, Until | Since | Au | Eu)
    }

    /// Operators rendered as `op(l, r)` rather than infix.
    pub fn is_functional(self) -> bool {
        use BinaryOp::*;
        matches!(self, WaRead | Extend | WResize | Au | Eu)
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            And => "&",
            Or => "|",
            Xor => "xor",
            Xnor => "xnor",
            Iff => "<->",
            Implies => "->",
            Equal => "=",
            NotEqual => "!=",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            EqDef => ":=",
            SetIn => "in",
            Plus => "+",
            Minus => "-",
            Times => "*",
            Divide => "/",
            Mod => "mod",
            LShift => "<<",
            RShift => ">>",
            Concat => "::",
            Union => "union",
            WaRead => "READ",
            Extend => "extend",
            WResize => "resize",
            Until => "U",
            Since => "S",
            Au => "AU",
            Eu => "EU",
        }
    }
}

/// A node of the expression DAG.
///
/// Children are handles into the same store, so structurally equal
/// nodes always compare equal.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    True,
    False,
    /// Terminal of a case chain no condition of which held.
    Failure,
    Number(BigInt),
    /// Word constant: `value` holds the low `width` bits.
    Word {
        value: u64,
        width: u32,
        signed: bool,
    },
    Real {
        num: BigInt,
        den: BigInt,
    },
    Atom(String),
    /// Qualified name `prefix.atom`.
    Dot(ExprRef, ExprRef),
    /// Identifier with brackets `base[index]`.
    Array(ExprRef, ExprRef),
    Range(ExprRef, ExprRef),
    Unary(UnaryOp, ExprRef),
    Binary(BinaryOp, ExprRef, ExprRef),
    /// `word[high:low]`.
    BitSelect(ExprRef, ExprRef, ExprRef),
    /// `WRITE(array, index, value)`.
    WaWrite(ExprRef, ExprRef, ExprRef),
    /// `case cond : then; tail`.
    Case(ExprRef, ExprRef, ExprRef),
    /// Expression `body` evaluated in naming scope `scope`.
    Context(ExprRef, ExprRef),
    Function(ExprRef, Vec<ExprRef>),
    Count(Vec<ExprRef>),
}

/// Discriminant of a [`Node`], without its payload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Tag {
    True,
    False,
    Failure,
    Number,
    Word,
    Real,
    Atom,
    Dot,
    Array,
    Range,
    Unary(UnaryOp),
    Binary(BinaryOp),
    BitSelect,
    WaWrite,
    Case,
    Context,
    Function,
    Count,
}

impl Node {
    pub fn tag(&self) -> Tag {
        match self {
            Node::True => Tag::True,
            Node::False => Tag::False,
            Node::Failure => Tag::Failure,
            Node::Number(_) => Tag::Number,
            Node::Word { .. } => Tag::Word,
            Node::Real { .. } => Tag::Real,
            Node::Atom(_) => Tag::Atom,
            Node::Dot(..) => Tag::Dot,
            Node::Array(..) => Tag::Array,
            Node::Range(..) => Tag::Range,
            Node::Unary(op, _) => Tag::Unary(*op),
            Node::Binary(op, ..) => Tag::Binary(*op),
            Node::BitSelect(..) => Tag::BitSelect,
            Node::WaWrite(..) => Tag::WaWrite,
            Node::Case(..) => Tag::Case,
            Node::Context(..) => Tag::Context,
            Node::Function(..) => Tag::Function,
            Node::Count(_) => Tag::Count,
        }
    }

    pub fn children(&self) -> Vec<ExprRef> {
        match self {
            Node::True
            | Node::False
            | Node::Failure
            | Node::Number(_)
            | Node::Word { .. }
            | Node::Real { .. }
            | Node::Atom(_) => Vec::new(),
            Node::Unary(_, a) => vec![*a],
            Node::Dot(a, b)
            | Node::Array(a, b)
            | Node::Range(a, b)
            | Node::Binary(_, a, b)
            | Node::Context(a, b) => vec![*a, *b],
            Node::BitSelect(a, b, c) | Node::WaWrite(a, b, c) | Node::Case(a, b, c) => vec![*a, *b, *c],
            Node::Function(name, args) => std::iter::once(*name).chain(args.iter().copied()).collect(),
            Node::Count(args) => args.clone(),
        }
    }

    /// Nodes without children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Node::True
                | Node::False
                | Node::Failure
                | Node::Number(_)
                | Node::Word { .. }
                | Node::Real { .. }
                | Node::Atom(_)
        )
    }

    /// Literal constants: booleans, numbers, words and reals.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Node::True | Node::False | Node::Number(_) | Node::Word { .. } | Node::Real { .. }
        )
    }

    /// Names: atoms, qualified names and identifiers with brackets.
    pub fn is_identifier(&self) -> bool {
        matches!(self, Node::Atom(_) | Node::Dot(..) | Node::Array(..))
    }

    fn code(&self) -> u64 {
        match self.tag() {
            Tag::True => 1,
            Tag::False => 2,
            Tag::Failure => 3,
            Tag::Number => 4,
            Tag::Word => 5,
            Tag::Real => 6,
            Tag::Atom => 7,
            Tag::Dot => 8,
            Tag::Array => 9,
            Tag::Range => 10,
            Tag::Unary(op) => 100 + op as u64,
            Tag::Binary(op) => 200 + op as u64,
            Tag::BitSelect => 11,
            Tag::WaWrite => 12,
            Tag::Case => 13,
            Tag::Context => 14,
            Tag::Function => 15,
            Tag::Count => 16,
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        let code = self.code();
        match self {
            Node::Number(n) => pairing2(code, hash_bytes(&n.to_signed_bytes_le())),
            Node::Word { value, width, signed } => pairing_seq(code, [*value, *width as u64, *signed as u64]),
            Node::Real { num, den } => pairing3(
                code,
                hash_bytes(&num.to_signed_bytes_le()),
                hash_bytes(&den.to_signed_bytes_le()),
            ),
            Node::Atom(name) => pairing2(code, name.as_str().hash()),
            _ => pairing_seq(code, self.children().into_iter().map(|c| c.get() as u64)),
        }
    }
}
