//! Deterministic hash-based identity for types and members.
//!
//! [`TypeHash`] is a 64-bit hash that identifies host types, members, and
//! runtime helper functions. Hashes are computed from names and signatures,
//! so a resolver and the compiler agree on identities without sharing a
//! registration order.
//!
//! # Examples
//!
//! ```
//! use formula_core::TypeHash;
//!
//! let int_hash = TypeHash::from_name("int");
//! assert_eq!(int_hash, TypeHash::from_name("int"));
//!
//! let a = TypeHash::from_function("max", &[TypeHash::from_name("int")]);
//! let b = TypeHash::from_function("max", &[TypeHash::from_name("double")]);
//! assert_ne!(a, b);
//! ```

use std::fmt;
use xxhash_rust::const_xxh64::xxh64 as const_xxh64;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Different entity kinds sharing a name still hash apart.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for free function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for instance and static member hashes.
    pub const MEMBER: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for runtime helper hashes.
    pub const RUNTIME: u64 = 0x3e9f5d2a8c7b1403;

    /// Parameter position mixing constants.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a type or member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a function hash from its name and parameter type hashes.
    ///
    /// Parameter order matters: `(int, double)` and `(double, int)` differ.
    #[inline]
    pub fn from_function(name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a member hash from its owner, name, and parameter type hashes.
    ///
    /// Fields and properties pass an empty parameter list.
    #[inline]
    pub fn from_member(owner: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::MEMBER ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create the hash of a runtime helper function.
    ///
    /// Usable in const context so helpers can be declared as constants.
    #[inline]
    pub const fn from_runtime(name: &str) -> Self {
        TypeHash(hash_constants::RUNTIME ^ const_xxh64(name.as_bytes(), 0))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(mut hash: u64, param_hashes: &[TypeHash]) -> u64 {
    for (i, param) in param_hashes.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the mix order-sensitive, unlike a plain XOR
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Well-known hashes for the built-in types.
///
/// Pre-computed from `TypeHash::from_name()`.
pub mod primitives {
    use super::TypeHash;

    /// Hash for `void`
    pub const VOID: TypeHash = TypeHash(0xe4b3797ddcf989ea);

    /// Hash for the type of the `null` literal
    pub const NULL: TypeHash = TypeHash(0x1165f1b6597b5a46);

    /// Hash for `bool`
    pub const BOOL: TypeHash = TypeHash(0x1e0c8fa4cced99c1);

    /// Hash for `int8`
    pub const INT8: TypeHash = TypeHash(0x2b44191092e74388);

    /// Hash for `int16`
    pub const INT16: TypeHash = TypeHash(0x95aebfc985e9b115);

    /// Hash for `int` (32-bit signed integer)
    pub const INT32: TypeHash = TypeHash(0x4f5e5320cd1c92bf);

    /// Hash for `int64`
    pub const INT64: TypeHash = TypeHash(0x7d6c550df59a1924);

    /// Hash for `uint8`
    pub const UINT8: TypeHash = TypeHash(0x0e8b2d31cdfa9716);

    /// Hash for `uint16`
    pub const UINT16: TypeHash = TypeHash(0x269d68dfde65ae7f);

    /// Hash for `uint` (32-bit unsigned integer)
    pub const UINT32: TypeHash = TypeHash(0x543fb8f520aa3e26);

    /// Hash for `uint64`
    pub const UINT64: TypeHash = TypeHash(0x32ba58d17fda82dd);

    /// Hash for `char` (16-bit code unit)
    pub const CHAR: TypeHash = TypeHash(0x1262f4f62a255c69);

    /// Hash for `float`
    pub const FLOAT: TypeHash = TypeHash(0x02d5a2fddaf5bb69);

    /// Hash for `double`
    pub const DOUBLE: TypeHash = TypeHash(0xeb125587f6c2a79b);

    /// Hash for `string`
    pub const STRING: TypeHash = TypeHash(0x7a8d5fb1ba695978);

    /// Hash for `object`, the root of every reference type
    pub const OBJECT: TypeHash = TypeHash(0x7453af4894759ab5);
}
