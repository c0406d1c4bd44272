//! TypeRegistry - host types and members by hash.
//!
//! # Storage Model
//!
//! - **Types**: `TypeEntry` values keyed by `TypeHash`, with a name index.
//! - **Members**: per-owner lists, in registration order. Lookups on a type
//!   also see members of its bases and interfaces, nearest first.
//! - **Functions**: free functions per namespace (`""` is global).
//!
//! The registry is populated before compiling and only read afterwards.
//!
//! # Example
//!
//! ```
//! use formula_core::{MemberResolver, Scope, primitives};
//! use formula_registry::TypeRegistry;
//!
//! let registry = TypeRegistry::with_primitives();
//! assert!(registry.type_entry(primitives::INT32).is_some());
//! assert!(registry.resolve("length", Scope::Type(primitives::STRING), false).len() == 1);
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use formula_core::{
    CollectionInterface, CollectionKind, Member, MemberResolver, NumericKind, ResultType, Scope,
    TypeEntry, TypeFlags, TypeHash, TypeKind,
};

/// Errors raised while declaring host types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A referenced type was not registered.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A member with the same signature already exists.
    #[error("duplicate member: {name} on {owner}")]
    DuplicateMember {
        /// The member name.
        name: String,
        /// The declaring type or namespace.
        owner: String,
    },
}

/// Reference implementation of [`MemberResolver`].
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeEntry>,
    types_by_name: FxHashMap<String, TypeHash>,
    members: FxHashMap<TypeHash, Vec<Member>>,
    functions: FxHashMap<String, Vec<Member>>,
    member_hashes: FxHashSet<TypeHash>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in types pre-registered.
    pub fn with_primitives() -> Self {
        let mut registry = Self::new();
        registry.register_all_primitives();
        registry
    }

    /// Register `void`, `null`, `bool`, every numeric type, `string` and `object`.
    ///
    /// `string` gets a `length` property. Re-registering is a no-op.
    pub fn register_all_primitives(&mut self) {
        let builtins = [
            ("void", ResultType::VOID),
            ("null", ResultType::NULL),
            ("bool", ResultType::BOOL),
            ("string", ResultType::STRING),
            ("object", ResultType::OBJECT),
        ];
        for (name, ty) in builtins {
            self.insert_type(TypeEntry::new(name, ty));
        }
        for kind in NumericKind::ALL {
            self.insert_type(TypeEntry::new(kind.name(), ResultType::numeric(kind)));
        }
        if let Some(entry) = self.types.get_mut(&ResultType::STRING.type_hash) {
            entry.flags |= TypeFlags::SEALED;
            entry.base = Some(ResultType::OBJECT.type_hash);
        }
        let length = Member::property(ResultType::STRING.type_hash, "length", ResultType::INT32);
        if self.member_hashes.insert(length.hash) {
            self.members
                .entry(ResultType::STRING.type_hash)
                .or_default()
                .push(length);
        }
    }

    fn insert_type(&mut self, entry: TypeEntry) {
        let hash = entry.result_type.type_hash;
        self.types_by_name.insert(entry.name.clone(), hash);
        self.types.insert(hash, entry);
    }

    // ==========================================================================
    // Type Registration
    // ==========================================================================

    /// Register a fully described type.
    pub fn register_type(&mut self, entry: TypeEntry) -> Result<ResultType, RegistrationError> {
        if self.types_by_name.contains_key(&entry.name)
            || self.types.contains_key(&entry.result_type.type_hash)
        {
            return Err(RegistrationError::DuplicateType(entry.name));
        }
        for dep in entry.base.iter().chain(entry.interfaces.iter()) {
            if !self.types.contains_key(dep) {
                return Err(RegistrationError::TypeNotFound(dep.to_string()));
            }
        }
        let ty = entry.result_type;
        self.insert_type(entry);
        Ok(ty)
    }

    /// Declare a reference class deriving from `base` (or `object`).
    pub fn register_class(
        &mut self,
        name: &str,
        base: Option<TypeHash>,
        interfaces: &[TypeHash],
        flags: TypeFlags,
    ) -> Result<ResultType, RegistrationError> {
        let ty = ResultType::new(TypeHash::from_name(name), TypeKind::Class);
        let mut entry = TypeEntry::new(name, ty);
        entry.base = Some(base.unwrap_or(ResultType::OBJECT.type_hash));
        entry.interfaces = interfaces.to_vec();
        entry.flags |= flags;
        self.register_type(entry)
    }

    /// Declare a value struct.
    pub fn register_struct(&mut self, name: &str) -> Result<ResultType, RegistrationError> {
        let ty = ResultType::new(TypeHash::from_name(name), TypeKind::Struct);
        let mut entry = TypeEntry::new(name, ty);
        entry.flags |= TypeFlags::SEALED;
        self.register_type(entry)
    }

    /// Declare an interface extending `parents`.
    pub fn register_interface(
        &mut self,
        name: &str,
        parents: &[TypeHash],
    ) -> Result<ResultType, RegistrationError> {
        let ty = ResultType::new(TypeHash::from_name(name), TypeKind::Interface);
        let mut entry = TypeEntry::new(name, ty);
        entry.interfaces = parents.to_vec();
        self.register_type(entry)
    }

    /// Declare an enum over an integral underlying type.
    pub fn register_enum(
        &mut self,
        name: &str,
        underlying: NumericKind,
    ) -> Result<ResultType, RegistrationError> {
        let ty = ResultType::new(TypeHash::from_name(name), TypeKind::Enum);
        let mut entry = TypeEntry::new(name, ty);
        entry.underlying = Some(underlying);
        entry.flags |= TypeFlags::SEALED;
        self.register_type(entry)
    }

    /// Get or create the array type of `element` with `rank` dimensions.
    pub fn array_of(
        &mut self,
        element: ResultType,
        rank: u32,
    ) -> Result<ResultType, RegistrationError> {
        let element_name = self.type_name(element.type_hash);
        let commas = ",".repeat(rank.saturating_sub(1) as usize);
        let name = format!("{element_name}[{commas}]");
        if let Some(hash) = self.types_by_name.get(&name) {
            if let Some(entry) = self.types.get(hash) {
                return Ok(entry.result_type);
            }
        }
        if !self.types.contains_key(&element.type_hash) {
            return Err(RegistrationError::TypeNotFound(element_name));
        }
        let ty = ResultType::new(TypeHash::from_name(&name), TypeKind::Array);
        let mut entry = TypeEntry::new(name, ty);
        entry.base = Some(ResultType::OBJECT.type_hash);
        entry.element = Some(element);
        entry.rank = rank.max(1);
        self.register_type(entry)
    }

    // ==========================================================================
    // Member Registration
    // ==========================================================================

    /// Add a member to its owner type.
    pub fn register_member(&mut self, member: Member) -> Result<TypeHash, RegistrationError> {
        let Some(owner) = self.types.get(&member.owner) else {
            return Err(RegistrationError::TypeNotFound(member.owner.to_string()));
        };
        if self.member_hashes.contains(&member.hash) {
            return Err(RegistrationError::DuplicateMember {
                name: member.name,
                owner: owner.name.clone(),
            });
        }
        let hash = member.hash;
        self.member_hashes.insert(hash);
        self.members.entry(member.owner).or_default().push(member);
        Ok(hash)
    }

    /// Add a free function to a namespace.
    pub fn register_function(
        &mut self,
        namespace: &str,
        name: &str,
        params: Vec<ResultType>,
        return_type: ResultType,
    ) -> Result<TypeHash, RegistrationError> {
        let param_hashes: Vec<TypeHash> = params.iter().map(|p| p.type_hash).collect();
        let qualified = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}::{name}")
        };
        let hash = TypeHash::from_function(&qualified, &param_hashes);
        if !self.member_hashes.insert(hash) {
            return Err(RegistrationError::DuplicateMember {
                name: name.to_string(),
                owner: namespace.to_string(),
            });
        }
        let mut member = Member::function(TypeHash::EMPTY, name, params, return_type);
        member.hash = hash;
        self.functions
            .entry(namespace.to_string())
            .or_default()
            .push(member);
        Ok(hash)
    }

    /// Mark `owner` as implementing a collection interface over `element`.
    ///
    /// Registers the instance `contains(element) -> bool` method the `in`
    /// operator calls.
    pub fn implement_collection(
        &mut self,
        owner: TypeHash,
        kind: CollectionKind,
        element: ResultType,
    ) -> Result<CollectionInterface, RegistrationError> {
        let name = match kind {
            CollectionKind::Dictionary => "containsKey",
            CollectionKind::Collection | CollectionKind::List => "contains",
        };
        let contains = self.register_member(Member::method(
            owner,
            name,
            vec![element],
            ResultType::BOOL,
        ))?;
        let collection = CollectionInterface {
            kind,
            element,
            contains,
        };
        if let Some(entry) = self.types.get_mut(&owner) {
            entry.collections.push(collection);
        }
        Ok(collection)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Look a type up by its declared name.
    pub fn get_by_name(&self, name: &str) -> Option<&TypeEntry> {
        self.types_by_name
            .get(name)
            .and_then(|hash| self.types.get(hash))
    }

    /// Iterate over all types.
    pub fn types(&self) -> impl Iterator<Item = &TypeEntry> {
        self.types.values()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// The type and its ancestors, nearest first.
    fn lineage(&self, start: TypeHash) -> Vec<TypeHash> {
        let mut order = vec![start];
        let mut cursor = 0;
        while cursor < order.len() {
            if let Some(entry) = self.types.get(&order[cursor]) {
                for next in entry.base.iter().chain(entry.interfaces.iter()) {
                    if !order.contains(next) {
                        order.push(*next);
                    }
                }
            }
            cursor += 1;
        }
        order
    }
}

fn name_matches(candidate: &str, name: &str, ignore_case: bool) -> bool {
    if ignore_case {
        candidate.eq_ignore_ascii_case(name)
    } else {
        candidate == name
    }
}

impl MemberResolver for TypeRegistry {
    fn type_entry(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    fn resolve(&self, name: &str, scope: Scope<'_>, ignore_case: bool) -> Vec<&Member> {
        match scope {
            Scope::Type(hash) => self
                .lineage(hash)
                .into_iter()
                .filter_map(|owner| self.members.get(&owner))
                .flatten()
                .filter(|m| name_matches(&m.name, name, ignore_case))
                .collect(),
            Scope::Namespace(ns) => self
                .functions
                .get(ns)
                .into_iter()
                .flatten()
                .filter(|m| name_matches(&m.name, name, ignore_case))
                .collect(),
        }
    }
}
