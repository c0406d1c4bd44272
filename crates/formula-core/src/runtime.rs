//! Runtime helpers the emitted code calls by hash.
//!
//! The host binds each hash to a native function before running compiled
//! code. Signatures are given as `(arguments) -> result`.

use crate::TypeHash;

/// `(string, string) -> string`
pub const STRING_CONCAT: TypeHash = TypeHash::from_runtime("string_concat");

/// `(object, object) -> string`; value operands are boxed first.
pub const STRING_CONCAT_OBJECT: TypeHash = TypeHash::from_runtime("string_concat_object");

/// `(string, string, int comparison) -> bool`
pub const STRING_EQUALS: TypeHash = TypeHash::from_runtime("string_equals");

/// `(double, double) -> double`
pub const MATH_POW: TypeHash = TypeHash::from_runtime("math_pow");

/// Every helper with its name, for hosts that bind by iteration.
pub const ALL: [(&str, TypeHash); 4] = [
    ("string_concat", STRING_CONCAT),
    ("string_concat_object", STRING_CONCAT_OBJECT),
    ("string_equals", STRING_EQUALS),
    ("math_pow", MATH_POW),
];
