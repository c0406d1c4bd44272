//! Host type metadata and the member resolver contract.
//!
//! The compiler never reflects over host objects itself. It asks a
//! [`MemberResolver`] for the members visible under a name and for the
//! [`TypeEntry`] describing a type's relationships. Operators and
//! conversions are ordinary static members named by convention
//! (`opAdd`, `opEquals`, `opConv`, ...), so one lookup path serves fields,
//! methods, operators and casts alike.

use bitflags::bitflags;

use crate::{NumericKind, ResultType, TypeHash};

bitflags! {
    /// Type-level modifiers that affect cast legality.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// No class may derive from this type.
        const SEALED = 1 << 0;
        /// The type cannot be instantiated directly.
        const ABSTRACT = 1 << 1;
        /// Copied by value.
        const VALUE = 1 << 2;
        /// An interface type.
        const INTERFACE = 1 << 3;
    }
}

/// What a member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
    Method,
    /// Static operator overload; parameters are the operands in order.
    Operator,
    /// Static conversion operator taking the source value.
    Conversion {
        /// `opImplConv` when true, `opConv` otherwise.
        implicit: bool,
    },
}

/// A field, property, method, operator or conversion on a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    /// Identity passed to the call instructions.
    pub hash: TypeHash,
    /// Declaring type.
    pub owner: TypeHash,
    pub kind: MemberKind,
    /// Fixed parameter types.
    pub params: Vec<ResultType>,
    /// Element type of a trailing parameter array.
    pub variadic: Option<ResultType>,
    /// Result of reading the member or calling it.
    pub return_type: ResultType,
    pub is_static: bool,
}

impl Member {
    fn with_kind(
        owner: TypeHash,
        name: &str,
        kind: MemberKind,
        params: Vec<ResultType>,
        return_type: ResultType,
        is_static: bool,
    ) -> Self {
        let param_hashes: Vec<TypeHash> = params.iter().map(|p| p.type_hash).collect();
        Self {
            name: name.to_string(),
            hash: TypeHash::from_member(owner, name, &param_hashes),
            owner,
            kind,
            params,
            variadic: None,
            return_type,
            is_static,
        }
    }

    pub fn field(owner: TypeHash, name: &str, ty: ResultType) -> Self {
        Self::with_kind(owner, name, MemberKind::Field, Vec::new(), ty, false)
    }

    pub fn property(owner: TypeHash, name: &str, ty: ResultType) -> Self {
        Self::with_kind(owner, name, MemberKind::Property, Vec::new(), ty, false)
    }

    /// An instance method.
    pub fn method(
        owner: TypeHash,
        name: &str,
        params: Vec<ResultType>,
        return_type: ResultType,
    ) -> Self {
        Self::with_kind(owner, name, MemberKind::Method, params, return_type, false)
    }

    /// A static method (or, on a namespace owner, a free function).
    pub fn function(
        owner: TypeHash,
        name: &str,
        params: Vec<ResultType>,
        return_type: ResultType,
    ) -> Self {
        Self::with_kind(owner, name, MemberKind::Method, params, return_type, true)
    }

    /// A static operator overload such as `opAdd(Money, Money) -> Money`.
    pub fn operator(
        owner: TypeHash,
        name: &str,
        params: Vec<ResultType>,
        return_type: ResultType,
    ) -> Self {
        Self::with_kind(owner, name, MemberKind::Operator, params, return_type, true)
    }

    /// A conversion operator from `from` to `to`, declared on `owner`.
    pub fn conversion(owner: TypeHash, from: ResultType, to: ResultType, implicit: bool) -> Self {
        let name = if implicit { "opImplConv" } else { "opConv" };
        let mut member = Self::with_kind(
            owner,
            name,
            MemberKind::Conversion { implicit },
            vec![from],
            to,
            true,
        );
        // overloads differ only by return type, so fold it into the identity
        member.hash = TypeHash::from_member(owner, name, &[from.type_hash, to.type_hash]);
        member
    }

    /// Add a trailing parameter array of `element`.
    pub fn with_variadic(mut self, element: ResultType) -> Self {
        self.variadic = Some(element);
        self
    }

    #[inline]
    pub fn is_callable(&self) -> bool {
        !matches!(self.kind, MemberKind::Field | MemberKind::Property)
    }
}

/// Collection interfaces usable by the `in` operator, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    /// Generic dictionary; probes its keys.
    Dictionary,
    /// Generic collection of elements.
    Collection,
    /// Non-generic list of objects.
    List,
}

/// A collection interface implemented by a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionInterface {
    pub kind: CollectionKind,
    /// Key type for dictionaries, element type otherwise.
    pub element: ResultType,
    /// Hash of the instance `contains` method taking `element`.
    pub contains: TypeHash,
}

/// Everything the compiler needs to know about a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    pub name: String,
    pub result_type: ResultType,
    /// Direct base class.
    pub base: Option<TypeHash>,
    /// Directly implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<TypeHash>,
    pub flags: TypeFlags,
    /// Element type of an array.
    pub element: Option<ResultType>,
    /// Rank of an array, 0 otherwise.
    pub rank: u32,
    /// Underlying numeric type of an enum.
    pub underlying: Option<NumericKind>,
    pub collections: Vec<CollectionInterface>,
}

impl TypeEntry {
    pub fn new(name: impl Into<String>, result_type: ResultType) -> Self {
        let flags = if result_type.is_value_type() {
            TypeFlags::VALUE
        } else if result_type.is_interface() {
            TypeFlags::INTERFACE
        } else {
            TypeFlags::empty()
        };
        Self {
            name: name.into(),
            result_type,
            base: None,
            interfaces: Vec::new(),
            flags,
            element: None,
            rank: 0,
            underlying: None,
            collections: Vec::new(),
        }
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeFlags::SEALED)
    }
}

/// Where to look a name up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope<'s> {
    /// Members declared on a type or inherited from its bases.
    Type(TypeHash),
    /// Free functions in a namespace; `""` is the global namespace.
    Namespace(&'s str),
}

/// Host-provided name lookup.
///
/// Implementations return members in a stable order; the overload
/// resolver relies on that order only for error messages.
pub trait MemberResolver {
    /// Describe a type.
    fn type_entry(&self, hash: TypeHash) -> Option<&TypeEntry>;

    /// Every member visible under `name` in `scope`.
    fn resolve(&self, name: &str, scope: Scope<'_>, ignore_case: bool) -> Vec<&Member>;

    /// Display name of a type, for diagnostics.
    fn type_name(&self, hash: TypeHash) -> String {
        self.type_entry(hash)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| hash.to_string())
    }

    /// Number of base-class steps from `derived` up to `base`.
    ///
    /// `Some(0)` when the hashes are equal.
    fn inheritance_distance(&self, derived: TypeHash, base: TypeHash) -> Option<u32> {
        let mut current = Some(derived);
        let mut steps = 0;
        while let Some(hash) = current {
            if hash == base {
                return Some(steps);
            }
            current = self.type_entry(hash).and_then(|entry| entry.base);
            steps += 1;
        }
        None
    }

    /// Whether `ty` (a class or interface) implements or extends `interface`,
    /// directly or through a base.
    fn implements(&self, ty: TypeHash, interface: TypeHash) -> bool {
        let mut pending = vec![ty];
        let mut seen = Vec::new();
        while let Some(hash) = pending.pop() {
            if seen.contains(&hash) {
                continue;
            }
            seen.push(hash);
            let Some(entry) = self.type_entry(hash) else {
                continue;
            };
            if entry.interfaces.contains(&interface) {
                return true;
            }
            pending.extend(entry.interfaces.iter().copied());
            pending.extend(entry.base);
        }
        false
    }
}
