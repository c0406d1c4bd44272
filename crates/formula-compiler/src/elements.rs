//! Typed expression elements.
//!
//! Elements are built bottom-up by [`crate::builder::TreeBuilder`] and live
//! in a `bumpalo` arena for the duration of one compile. Every element has
//! its [`ResultType`] fixed at construction, and every operator node
//! carries the plan chosen for it (overload, numeric promotion, string
//! concatenation, ...), so emission never has to make a typing decision.

use std::fmt;

use formula_core::{NumericKind, ResultType, Span, TypeHash};

use crate::conversion::{CastPlan, Conversion};
use crate::options::StringComparison;

/// A type-resolved node in the expression tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element<'a> {
    pub kind: ElementKind<'a>,
    pub result_type: ResultType,
    pub span: Span,
}

impl<'a> Element<'a> {
    pub fn new(kind: ElementKind<'a>, result_type: ResultType, span: Span) -> Self {
        Self {
            kind,
            result_type,
            span,
        }
    }

    /// The value of a non-negative `int` literal.
    pub fn as_non_negative_int(&self) -> Option<u32> {
        match self.kind {
            ElementKind::Literal(Literal::Int(value)) => u32::try_from(value).ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, ElementKind::Root { .. })
    }
}

/// Node variants. Children are arena references.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementKind<'a> {
    Literal(Literal<'a>),
    Arithmetic {
        op: ArithmeticOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        plan: ArithmeticPlan<'a>,
    },
    Compare {
        op: CompareOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        plan: ComparePlan<'a>,
    },
    Shift {
        op: ShiftOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        plan: ShiftPlan<'a>,
    },
    Unary {
        op: UnaryOp,
        operand: &'a Element<'a>,
        plan: UnaryPlan<'a>,
    },
    Logical {
        op: LogicalOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        plan: LogicalPlan<'a>,
    },
    Cast {
        operand: &'a Element<'a>,
        plan: CastPlan,
    },
    Conditional {
        condition: &'a Element<'a>,
        when_true: &'a Element<'a>,
        when_false: &'a Element<'a>,
        /// Converts the true branch into the result type.
        true_conversion: Conversion,
        /// Converts the false branch into the result type.
        false_conversion: Conversion,
    },
    /// `probe in (a, b, c)`.
    InList {
        probe: &'a Element<'a>,
        items: &'a [ListItem<'a>],
    },
    /// `probe in collection`.
    InCollection {
        probe: &'a Element<'a>,
        collection: &'a Element<'a>,
        /// Converts the probe into the key or element type.
        conversion: Conversion,
        /// Instance `contains` (or `containsKey`) method.
        contains: TypeHash,
    },
    Member {
        receiver: Receiver<'a>,
        access: MemberAccess<'a>,
    },
    /// Top of the tree; converts into the requested type and returns.
    Root {
        child: &'a Element<'a>,
        conversion: Conversion,
    },
}

/// Literal values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Char(u16),
    String(&'a str),
    Null,
}

impl Literal<'_> {
    pub fn result_type(&self) -> ResultType {
        match self {
            Literal::Bool(_) => ResultType::BOOL,
            Literal::Int(_) => ResultType::INT32,
            Literal::UInt(_) => ResultType::UINT32,
            Literal::Long(_) => ResultType::INT64,
            Literal::ULong(_) => ResultType::UINT64,
            Literal::Float(_) => ResultType::FLOAT,
            Literal::Double(_) => ResultType::DOUBLE,
            Literal::Char(_) => ResultType::CHAR,
            Literal::String(_) => ResultType::STRING,
            Literal::Null => ResultType::NULL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    /// Whether the operator orders its operands rather than testing equality.
    #[inline]
    pub fn is_relational(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftOp {
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    Complement,
}

macro_rules! symbols {
    ($($ty:ident { $($variant:ident => $sym:literal),* $(,)? })*) => {
        $(
            impl $ty {
                pub const fn symbol(self) -> &'static str {
                    match self {
                        $(Self::$variant => $sym,)*
                    }
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.symbol())
                }
            }
        )*
    };
}

symbols! {
    ArithmeticOp { Add => "+", Sub => "-", Mul => "*", Div => "/", Mod => "%", Pow => "**" }
    CompareOp { Eq => "==", Ne => "!=", Lt => "<", Gt => ">", Le => "<=", Ge => ">=" }
    ShiftOp { Shl => "<<", Shr => ">>" }
    LogicalOp { And => "and", Or => "or", Xor => "xor" }
    UnaryOp { Neg => "-", Plus => "+", Not => "!", Complement => "~" }
}

/// A resolved call to a host member or operator overload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallTarget<'a> {
    pub method: TypeHash,
    pub is_static: bool,
    pub return_type: ResultType,
    /// One conversion per argument, in order.
    pub conversions: &'a [Conversion],
}

impl CallTarget<'_> {
    #[inline]
    pub fn argc(&self) -> usize {
        self.conversions.len()
    }

    /// Conversion applied to argument `index`.
    pub fn conversion(&self, index: usize) -> Conversion {
        self.conversions
            .get(index)
            .copied()
            .unwrap_or_else(Conversion::identity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArithmeticPlan<'a> {
    /// User operator overload.
    Operator(CallTarget<'a>),
    /// Built-in numeric operation performed in `kind`.
    Numeric {
        kind: NumericKind,
        /// Overflow-checked integral arithmetic.
        checked: bool,
        /// Both operands are unsigned.
        unsigned: bool,
        left: Conversion,
        right: Conversion,
    },
    /// String concatenation through a runtime helper.
    Concat {
        helper: TypeHash,
        left: Conversion,
        right: Conversion,
    },
    /// `x ** n` for a literal `n >= 0`, computed by repeated multiplication.
    PowerUnrolled {
        exponent: u32,
        kind: NumericKind,
        checked: bool,
    },
    /// Runtime `pow` on doubles.
    PowerCall { left: Conversion, right: Conversion },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComparePlan<'a> {
    /// User operator overload; `negate` inverts the result (`!=` via `opEquals`).
    Operator { call: CallTarget<'a>, negate: bool },
    Numeric {
        kind: NumericKind,
        left: Conversion,
        right: Conversion,
    },
    /// String equality through `runtime::STRING_EQUALS`.
    String(StringComparison),
    Boolean,
    /// Reference identity.
    Reference,
    /// Two values of the same enum, compared through the underlying type.
    Enum(NumericKind),
}

impl ComparePlan<'_> {
    /// Conversions applied to the left and right operands.
    pub fn operand_conversions(&self) -> (Conversion, Conversion) {
        match self {
            ComparePlan::Operator { call, .. } => (call.conversion(0), call.conversion(1)),
            ComparePlan::Numeric { left, right, .. } => (*left, *right),
            _ => (Conversion::identity(), Conversion::identity()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShiftPlan<'a> {
    Operator(CallTarget<'a>),
    /// Shift in `kind`; the count is converted to `int` and masked.
    Numeric {
        kind: NumericKind,
        left: Conversion,
        right: Conversion,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryPlan<'a> {
    Operator(CallTarget<'a>),
    /// Arithmetic negation in `kind`.
    Negate {
        kind: NumericKind,
        checked: bool,
        conversion: Conversion,
    },
    /// Unary plus; only promotes the operand.
    Plus { conversion: Conversion },
    /// Boolean not.
    Not,
    /// Bitwise complement in `kind`.
    Complement {
        kind: NumericKind,
        conversion: Conversion,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalPlan<'a> {
    Operator(CallTarget<'a>),
    /// Boolean `and` / `or`; the right operand is skipped once the result is known.
    ShortCircuit,
    /// Boolean `xor`.
    BoolXor,
    /// Bitwise operation on integral operands promoted to `kind`.
    Bitwise {
        kind: NumericKind,
        left: Conversion,
        right: Conversion,
    },
}

/// One candidate of an `in (...)` list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListItem<'a> {
    pub element: &'a Element<'a>,
    /// Equality test between the probe and this item.
    pub plan: ComparePlan<'a>,
}

/// The instance a member is read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Receiver<'a> {
    /// An explicit target expression.
    Element(&'a Element<'a>),
    /// The implicit owner instance, for bare instance members.
    Owner,
    /// No instance: static members and global functions.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberAccess<'a> {
    Field { member: TypeHash },
    Property { member: TypeHash },
    Method {
        call: CallTarget<'a>,
        args: &'a [&'a Element<'a>],
    },
}
