//! Formula Compiler
//!
//! Compiles typed formula expressions into stack-machine bytecode.
//!
//! ## Pipeline
//!
//! - **Tree building**: reduction events from a front end are folded into a
//!   fully typed [`Element`] tree. Operators, members and conversions are
//!   resolved here, so every element knows exactly what it will emit.
//! - **Trial emission**: the tree is walked once to measure where every
//!   branch and label lands with all branches short.
//! - **Relaxation**: branches that cannot reach their target in an `i8`
//!   offset are switched to the long encoding.
//! - **Emission**: the tree is walked again into a [`BytecodeChunk`].
//!
//! ## Modules
//!
//! - [`bytecode`]: Bytecode types (OpCode, BytecodeChunk, ConstantPool)
//! - [`builder`]: Reduction events to typed elements
//! - [`context`]: Options plus the host's member resolver
//! - [`conversion`]: Implicit conversions, casts and their costs
//! - [`driver`]: Tree to finished [`CompiledExpression`]
//! - [`elements`]: The typed expression tree
//! - [`emit`]: Code generation and branch relaxation
//! - [`overload`]: Overload and operator resolution
//! - [`promotion`]: Numeric promotion table
//!
//! ## Example
//!
//! ```
//! use formula_compiler::{BinaryOp, CompilationContext, NodeTag, ReduceEvent, compile_events};
//! use formula_core::{ResultType, Span};
//! use formula_registry::TypeRegistry;
//!
//! let registry = TypeRegistry::with_primitives();
//! let ctx = CompilationContext::new(&registry);
//! let span = Span::new(1, 1, 1);
//! let compiled = compile_events(
//!     &[
//!         ReduceEvent::new(NodeTag::Integer(2), span),
//!         ReduceEvent::new(NodeTag::Real(0.5), span),
//!         ReduceEvent::new(NodeTag::Binary(BinaryOp::Mul), span),
//!     ],
//!     &ctx,
//! )
//! .unwrap();
//! assert_eq!(compiled.result_type, ResultType::DOUBLE);
//! ```

pub mod builder;
pub mod bytecode;
pub mod context;
pub mod conversion;
pub mod driver;
pub mod elements;
pub mod emit;
pub mod options;
pub mod overload;
pub mod promotion;

pub use builder::{BinaryOp, NodeTag, ReduceEvent, Reduction, TreeBuilder};
pub use bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
pub use context::CompilationContext;
pub use conversion::{CastPlan, Conversion, ConversionKind, find_cast, find_conversion};
pub use driver::{CompiledExpression, compile, compile_events};
pub use elements::{Element, ElementKind, Literal};
pub use emit::{BranchPlan, Layout, emit, estimate_layout, relax};
pub use options::{CompilerOptions, StringComparison};
pub use overload::{Candidate, OperatorName, resolve_overload};

// Re-export CompilationError from core for convenience
pub use formula_core::CompilationError;
