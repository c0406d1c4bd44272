//! Host type registry for the formula compiler.
//!
//! [`TypeRegistry`] is the reference [`MemberResolver`](formula_core::MemberResolver):
//! hosts declare their types and members here and hand the registry to the
//! compiler.

mod registry;

pub use registry::{RegistrationError, TypeRegistry};
