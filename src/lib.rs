//! formula
//!
//! Compiles typed formula expressions into stack-machine bytecode.
//!
//! This crate bundles the workspace:
//!
//! - [`compiler`]: tree building, overload resolution and code emission
//! - [`registry`]: a host type registry implementing the member resolver
//! - [`types`]: shared identities, result types and errors
//!
//! A front end parses formula text and reports each reduction as a
//! [`ReduceEvent`]; [`compile_events`] turns the stream into a
//! [`CompiledExpression`].

pub use formula_compiler as compiler;
pub use formula_core as types;
pub use formula_registry as registry;

pub use bumpalo::Bump;
pub use formula_compiler::{
    BinaryOp, CompilationContext, CompiledExpression, CompilerOptions, NodeTag, ReduceEvent,
    StringComparison, TreeBuilder, compile, compile_events,
};
pub use formula_core::{CompilationError, ErrorKind, ResultType, Span};
pub use formula_registry::TypeRegistry;

/// Everything needed to register host types and compile a formula.
pub mod prelude {
    pub use crate::compiler::elements::{Literal, UnaryOp};
    pub use crate::compiler::{
        BinaryOp, CompilationContext, CompiledExpression, CompilerOptions, NodeTag, OpCode,
        ReduceEvent, StringComparison, TreeBuilder, compile, compile_events,
    };
    pub use crate::registry::TypeRegistry;
    pub use crate::types::{
        CollectionKind, CompilationError, ErrorKind, Member, NumericKind, ResultType, Span,
        TypeFlags, TypeHash,
    };
}
