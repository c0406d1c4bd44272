//! Core types shared by the formula compiler crates.
//!
//! - [`TypeHash`]: deterministic identity for types, members and helpers
//! - [`ResultType`]: the static type of an expression
//! - [`MemberResolver`]: the host lookup contract
//! - [`CompilationError`]: every way a compile can fail

mod error;
mod member;
mod result_type;
pub mod runtime;
mod span;
mod type_hash;

pub use error::{CompilationError, ErrorKind};
pub use member::{
    CollectionInterface, CollectionKind, Member, MemberKind, MemberResolver, Scope, TypeEntry,
    TypeFlags,
};
pub use result_type::{NumericKind, ResultType, TypeKind};
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants, primitives};
