//! Symbol types reported by the type oracle.
//!
//! The engine only ever asks coarse questions about types ("is this boolean?",
//! "is this a one-bit word?"), so the representation is a plain enum with
//! predicate helpers rather than a full type lattice.
use std::fmt;

/// The type of an expression or a declared symbol.
///
/// # Invariants
///
/// - Word widths are >= 1
/// - `IntRange(lo, hi)` has `lo <= hi`
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum SymbType {
    Boolean,
    Integer,
    IntRange(i64, i64),
    Real,
    /// Enumeration of symbolic constants.
    Symbolic,
    /// Enumeration mixing integers and symbolic constants.
    IntSymbolic,
    UnsignedWord(u32),
    SignedWord(u32),
    /// Array of words: address width and value width.
    WordArray { addr: u32, value: u32 },
    IntArray,
    SetBool,
    SetInt,
    Statement,
    /// Type of the failure terminal.
    NoType,
    Error,
}

impl SymbType {
    /// Creates an unsigned word type.
    ///
    /// # Panics
    ///
    /// Panics if `width == 0`.
    pub fn word(width: u32) -> Self {
        assert_ne!(width, 0, "Word width must be >= 1");
        SymbType::UnsignedWord(width)
    }

    /// Creates an integer range type.
    ///
    /// # Panics
    ///
    /// Panics if `lo > hi`.
    pub fn range(lo: i64, hi: i64) -> Self {
        assert!(lo <= hi, "Empty range {}..{}", lo, hi);
        SymbType::IntRange(lo, hi)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, SymbType::Boolean)
    }

    /// Integers and integer ranges.
    pub fn is_integer(&self) -> bool {
        matches!(self, SymbType::Integer | SymbType::IntRange(..))
    }

    pub fn is_real(&self) -> bool {
        matches!(self, SymbType::Real)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, SymbType::Symbolic | SymbType::IntSymbolic)
    }

    pub fn is_word(&self) -> bool {
        matches!(self, SymbType::UnsignedWord(_) | SymbType::SignedWord(_))
    }

    pub fn is_signed_word(&self) -> bool {
        matches!(self, SymbType::SignedWord(_))
    }

    /// Width of a word type, `None` for anything else.
    pub fn word_width(&self) -> Option<u32> {
        match self {
            SymbType::UnsignedWord(w) | SymbType::SignedWord(w) => Some(*w),
            _ => None,
        }
    }

    /// Unsigned or signed word of width 1.
    pub fn is_word_1(&self) -> bool {
        self.word_width() == Some(1)
    }

    pub fn is_word_array(&self) -> bool {
        matches!(self, SymbType::WordArray { .. })
    }

    pub fn is_int_array(&self) -> bool {
        matches!(self, SymbType::IntArray)
    }

    pub fn is_set_bool(&self) -> bool {
        matches!(self, SymbType::SetBool)
    }

    pub fn is_set_int(&self) -> bool {
        matches!(self, SymbType::SetInt)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SymbType::Error)
    }

    /// Boolean or set of booleans.
    pub fn is_boolean_like(&self) -> bool {
        self.is_boolean() || self.is_set_bool()
    }

    /// Anything that is neither boolean-like nor a statement, no-type or error.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            SymbType::Boolean | SymbType::SetBool | SymbType::Statement | SymbType::NoType | SymbType::Error
        )
    }

    /// Type of an arithmetic combination of two operands.
    ///
    /// Words dominate, then reals; booleans and integers combine to integers.
    pub fn arithmetic_join(&self, other: &SymbType) -> SymbType {
        if self.is_word() {
            self.clone()
        } else if other.is_word() {
            other.clone()
        } else if self.is_real() || other.is_real() {
            SymbType::Real
        } else {
            SymbType::Integer
        }
    }

    /// Type of a conditional whose branches have the given types.
    pub fn branch_join(&self, other: &SymbType) -> SymbType {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (SymbType::NoType, b) => b.clone(),
            (a, SymbType::NoType) => a.clone(),
            (a, b) if a.is_enum() || b.is_enum() => SymbType::IntSymbolic,
            (a, b) => a.arithmetic_join(b),
        }
    }
}

impl fmt::Display for SymbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbType::Boolean => write!(f, "boolean"),
            SymbType::Integer => write!(f, "integer"),
            SymbType::IntRange(lo, hi) => write!(f, "{}..{}", lo, hi),
            SymbType::Real => write!(f, "real"),
            SymbType::Symbolic => write!(f, "symbolic"),
            SymbType::IntSymbolic => write!(f, "integer-symbolic"),
            SymbType::UnsignedWord(w) => write!(f, "unsigned word[{}]", w),
            SymbType::SignedWord(w) => write!(f, "signed word[{}]", w),
            SymbType::WordArray { addr, value } => write!(f, "array word[{}] of word[{}]", addr, value),
            SymbType::IntArray => write!(f, "array integer of integer"),
            SymbType::SetBool => write!(f, "boolean set"),
            SymbType::SetInt => write!(f, "integer set"),
            SymbType::Statement => write!(f, "statement"),
            SymbType::NoType => write!(f, "no-type"),
            SymbType::Error => write!(f, "error"),
        }
    }
}
