//! ResultType - the static type of an expression.
//!
//! A [`ResultType`] pairs the [`TypeHash`] of a host type with a [`TypeKind`]
//! describing how the compiler must treat it: numeric category, value or
//! reference semantics, enum-ness. Relationships between types (base class,
//! interfaces, array element, enum underlying type) are not stored here;
//! they are looked up through the [`MemberResolver`](crate::MemberResolver).
//!
//! # Example
//!
//! ```
//! use formula_core::{NumericKind, ResultType};
//!
//! let int = ResultType::INT32;
//! assert!(int.is_integral());
//! assert!(int.is_value_type());
//! assert_eq!(int.as_numeric(), Some(NumericKind::I32));
//! assert!(ResultType::STRING.is_reference_type());
//! ```

use std::fmt::{self, Display, Formatter};

use crate::{TypeHash, primitives};

/// Built-in numeric types.
///
/// Declaration order is the widening ladder used for conversion scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericKind {
    I8,
    U8,
    I16,
    Char,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl NumericKind {
    /// Every numeric kind, in ladder order.
    pub const ALL: [NumericKind; 11] = [
        NumericKind::I8,
        NumericKind::U8,
        NumericKind::I16,
        NumericKind::Char,
        NumericKind::U16,
        NumericKind::I32,
        NumericKind::U32,
        NumericKind::I64,
        NumericKind::U64,
        NumericKind::F32,
        NumericKind::F64,
    ];

    /// Integers and `char`.
    #[inline]
    pub const fn is_integral(self) -> bool {
        !self.is_floating()
    }

    #[inline]
    pub const fn is_floating(self) -> bool {
        matches!(self, NumericKind::F32 | NumericKind::F64)
    }

    /// Unsigned integers, including `char`.
    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            NumericKind::U8
                | NumericKind::U16
                | NumericKind::U32
                | NumericKind::U64
                | NumericKind::Char
        )
    }

    /// Signed integers (floats excluded).
    #[inline]
    pub const fn is_signed_integral(self) -> bool {
        matches!(
            self,
            NumericKind::I8 | NumericKind::I16 | NumericKind::I32 | NumericKind::I64
        )
    }

    /// Width in bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            NumericKind::I8 | NumericKind::U8 => 8,
            NumericKind::I16 | NumericKind::U16 | NumericKind::Char => 16,
            NumericKind::I32 | NumericKind::U32 | NumericKind::F32 => 32,
            NumericKind::I64 | NumericKind::U64 | NumericKind::F64 => 64,
        }
    }

    /// Whether values of this kind occupy a 64-bit stack slot.
    #[inline]
    pub const fn is_wide(self) -> bool {
        matches!(self, NumericKind::I64 | NumericKind::U64)
    }

    pub const fn type_hash(self) -> TypeHash {
        match self {
            NumericKind::I8 => primitives::INT8,
            NumericKind::U8 => primitives::UINT8,
            NumericKind::I16 => primitives::INT16,
            NumericKind::Char => primitives::CHAR,
            NumericKind::U16 => primitives::UINT16,
            NumericKind::I32 => primitives::INT32,
            NumericKind::U32 => primitives::UINT32,
            NumericKind::I64 => primitives::INT64,
            NumericKind::U64 => primitives::UINT64,
            NumericKind::F32 => primitives::FLOAT,
            NumericKind::F64 => primitives::DOUBLE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            NumericKind::I8 => "int8",
            NumericKind::U8 => "uint8",
            NumericKind::I16 => "int16",
            NumericKind::Char => "char",
            NumericKind::U16 => "uint16",
            NumericKind::I32 => "int",
            NumericKind::U32 => "uint",
            NumericKind::I64 => "int64",
            NumericKind::U64 => "uint64",
            NumericKind::F32 => "float",
            NumericKind::F64 => "double",
        }
    }

    pub fn from_hash(hash: TypeHash) -> Option<Self> {
        NumericKind::ALL.into_iter().find(|k| k.type_hash() == hash)
    }
}

impl Display for NumericKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the compiler treats a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// No value.
    Void,
    /// The type of the `null` literal; converts to any reference type.
    Null,
    Bool,
    Numeric(NumericKind),
    /// Immutable reference string.
    String,
    /// Root of every reference type; value types box into it.
    Object,
    /// Named constants over a numeric underlying type.
    Enum,
    /// User-defined value type.
    Struct,
    /// User-defined reference type.
    Class,
    Interface,
    /// Reference array; element type and rank come from the resolver.
    Array,
}

/// The static type an expression evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultType {
    /// Identity of the host type.
    pub type_hash: TypeHash,
    /// Category of the type.
    pub kind: TypeKind,
}

impl ResultType {
    pub const VOID: ResultType = ResultType::new(primitives::VOID, TypeKind::Void);
    pub const NULL: ResultType = ResultType::new(primitives::NULL, TypeKind::Null);
    pub const BOOL: ResultType = ResultType::new(primitives::BOOL, TypeKind::Bool);
    pub const STRING: ResultType = ResultType::new(primitives::STRING, TypeKind::String);
    pub const OBJECT: ResultType = ResultType::new(primitives::OBJECT, TypeKind::Object);
    pub const INT8: ResultType = ResultType::numeric(NumericKind::I8);
    pub const INT16: ResultType = ResultType::numeric(NumericKind::I16);
    pub const INT32: ResultType = ResultType::numeric(NumericKind::I32);
    pub const INT64: ResultType = ResultType::numeric(NumericKind::I64);
    pub const UINT8: ResultType = ResultType::numeric(NumericKind::U8);
    pub const UINT16: ResultType = ResultType::numeric(NumericKind::U16);
    pub const UINT32: ResultType = ResultType::numeric(NumericKind::U32);
    pub const UINT64: ResultType = ResultType::numeric(NumericKind::U64);
    pub const CHAR: ResultType = ResultType::numeric(NumericKind::Char);
    pub const FLOAT: ResultType = ResultType::numeric(NumericKind::F32);
    pub const DOUBLE: ResultType = ResultType::numeric(NumericKind::F64);

    #[inline]
    pub const fn new(type_hash: TypeHash, kind: TypeKind) -> Self {
        Self { type_hash, kind }
    }

    #[inline]
    pub const fn numeric(kind: NumericKind) -> Self {
        Self::new(kind.type_hash(), TypeKind::Numeric(kind))
    }

    /// Numeric category, if this is a built-in numeric type.
    ///
    /// Enums return `None` even though their representation is numeric.
    #[inline]
    pub const fn as_numeric(&self) -> Option<NumericKind> {
        match self.kind {
            TypeKind::Numeric(kind) => Some(kind),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.kind, TypeKind::Numeric(_))
    }

    #[inline]
    pub const fn is_integral(&self) -> bool {
        matches!(self.kind, TypeKind::Numeric(k) if k.is_integral())
    }

    #[inline]
    pub const fn is_unsigned(&self) -> bool {
        matches!(self.kind, TypeKind::Numeric(k) if k.is_unsigned())
    }

    #[inline]
    pub const fn is_floating(&self) -> bool {
        matches!(self.kind, TypeKind::Numeric(k) if k.is_floating())
    }

    #[inline]
    pub const fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String)
    }

    #[inline]
    pub const fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Object)
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Null)
    }

    #[inline]
    pub const fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    #[inline]
    pub const fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum)
    }

    #[inline]
    pub const fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class)
    }

    #[inline]
    pub const fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    #[inline]
    pub const fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array)
    }

    /// Types copied by value: bool, numerics, enums and structs.
    #[inline]
    pub const fn is_value_type(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Bool | TypeKind::Numeric(_) | TypeKind::Enum | TypeKind::Struct
        )
    }

    /// Types held by reference, including the `null` literal's type.
    #[inline]
    pub const fn is_reference_type(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::String
                | TypeKind::Object
                | TypeKind::Class
                | TypeKind::Interface
                | TypeKind::Array
                | TypeKind::Null
        )
    }
}

impl Display for ResultType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Void => f.write_str("void"),
            TypeKind::Null => f.write_str("null"),
            TypeKind::Bool => f.write_str("bool"),
            TypeKind::Numeric(kind) => f.write_str(kind.name()),
            TypeKind::String => f.write_str("string"),
            TypeKind::Object => f.write_str("object"),
            _ => write!(f, "{}", self.type_hash),
        }
    }
}
