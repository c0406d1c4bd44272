//! Compiler driver: typed tree to finished bytecode.

use bumpalo::Bump;
use formula_core::{CompilationError, ResultType};
use tracing::{debug, instrument};

use crate::builder::{ReduceEvent, TreeBuilder};
use crate::bytecode::{BytecodeChunk, ConstantPool};
use crate::context::CompilationContext;
use crate::elements::{Element, ElementKind};
use crate::emit::{self, relax};

type Result<T> = std::result::Result<T, CompilationError>;

/// A compiled expression, ready for the host to wrap into a callable unit.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    pub chunk: BytecodeChunk,
    pub constants: ConstantPool,
    /// Type of the value `Return` leaves.
    pub result_type: ResultType,
    /// Temporary local slots the evaluator must provide.
    pub local_count: u16,
    /// Final offset of every branch label.
    pub labels: Vec<usize>,
}

impl CompiledExpression {
    pub fn disassemble(&self) -> String {
        self.chunk.disassemble()
    }
}

/// Compile a finished tree.
///
/// `tree` must be a root element. Emission runs twice: once to measure
/// branch distances and once for real.
#[instrument(level = "debug", skip_all, fields(result_type))]
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile(tree: &Element<'_>) -> Result<CompiledExpression> {
    let ElementKind::Root { child, conversion } = tree.kind else {
        return Err(CompilationError::internal(
            "expression tree does not end in a root",
        ));
    };
    let result_type = tree.result_type;
    tracing::Span::current().record("result_type", tracing::field::debug(result_type));
    debug!(
        child = ?child.result_type,
        converted = !conversion.is_exact(),
        "compiling expression"
    );

    let layout = emit::estimate_layout(tree)?;
    let plan = relax(&layout);
    let emission = emit::emit(tree, &plan)?;

    if emission.labels != plan.labels() {
        return Err(CompilationError::internal(format!(
            "label offsets {:?} differ from the relaxed layout {:?}",
            emission.labels,
            plan.labels()
        )));
    }
    if emission.chunk.len() != plan.size() {
        return Err(CompilationError::internal(format!(
            "emitted {} bytes, expected {}",
            emission.chunk.len(),
            plan.size()
        )));
    }

    Ok(CompiledExpression {
        chunk: emission.chunk,
        constants: emission.constants,
        result_type,
        local_count: emission.local_count,
        labels: emission.labels,
    })
}

/// Build a tree from reduction events and compile it.
pub fn compile_events(
    events: &[ReduceEvent<'_>],
    ctx: &CompilationContext<'_>,
) -> Result<CompiledExpression> {
    let arena = Bump::new();
    let tree = TreeBuilder::new(&arena, ctx).build(events)?;
    compile(tree)
}
