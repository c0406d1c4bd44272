//! Bottom-up construction of the typed element tree.
//!
//! The front end reports each grammar reduction as a [`NodeTag`] together
//! with the elements built for its children. [`TreeBuilder::reduce`] types
//! one node; [`TreeBuilder::build`] folds a postfix stream of
//! [`ReduceEvent`]s over a value stack.
//!
//! ```ignore
//! let arena = Bump::new();
//! let builder = TreeBuilder::new(&arena, &ctx);
//! let root = builder.build(&[
//!     ReduceEvent::new(NodeTag::Integer(2), span),
//!     ReduceEvent::new(NodeTag::Integer(10), span),
//!     ReduceEvent::new(NodeTag::Binary(BinaryOp::Pow), span),
//!     ReduceEvent::new(NodeTag::Root(None), span),
//! ])?;
//! ```

mod arithmetic;
mod cast;
mod compare;
mod conditional;
mod logical;
mod member;
mod membership;

use bumpalo::Bump;
use formula_core::{CompilationError, NumericKind, ResultType, Span};

use crate::context::CompilationContext;
use crate::conversion::{Conversion, ConversionKind};
use crate::elements::{
    ArithmeticOp, CallTarget, CompareOp, Element, ElementKind, Literal, LogicalOp, ShiftOp,
    UnaryOp,
};
use crate::overload::{Candidate, OperatorName};

type Result<T> = std::result::Result<T, CompilationError>;

/// Binary operators as the front end reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Convention name of the overload for this operator.
    pub const fn operator_name(self) -> OperatorName {
        match self {
            BinaryOp::Add => OperatorName::Add,
            BinaryOp::Sub => OperatorName::Sub,
            BinaryOp::Mul => OperatorName::Mul,
            BinaryOp::Div => OperatorName::Div,
            BinaryOp::Mod => OperatorName::Mod,
            BinaryOp::Pow => OperatorName::Pow,
            BinaryOp::Eq => OperatorName::Equals,
            BinaryOp::Ne => OperatorName::NotEquals,
            BinaryOp::Lt => OperatorName::Less,
            BinaryOp::Gt => OperatorName::Greater,
            BinaryOp::Le => OperatorName::LessEqual,
            BinaryOp::Ge => OperatorName::GreaterEqual,
            BinaryOp::Shl => OperatorName::Shl,
            BinaryOp::Shr => OperatorName::Shr,
            BinaryOp::And => OperatorName::And,
            BinaryOp::Or => OperatorName::Or,
            BinaryOp::Xor => OperatorName::Xor,
        }
    }
}

/// What a reduction produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTag<'a> {
    /// Unsuffixed integer literal; typed as the narrowest of `int`, `uint`,
    /// `int64`, `uint64` that holds it.
    Integer(u64),
    /// Unsuffixed real literal; typed by [`crate::CompilerOptions::real_literal`].
    Real(f64),
    /// Literal with an explicit type.
    Literal(Literal<'a>),
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// Explicit cast of the single child.
    Cast(ResultType),
    /// `if(condition, when_true, when_false)`.
    Conditional,
    /// `probe in (item, ...)`; children are the probe then `count` items.
    InList { count: usize },
    /// `probe in collection`; children are the probe then the collection.
    InCollection,
    /// Field, property or method access. Children are the target (when
    /// `has_target`) followed by `argc` arguments. `argc` is `None` for a
    /// plain name and `Some(n)` for a call.
    Member {
        name: &'a str,
        has_target: bool,
        argc: Option<u8>,
    },
    /// Top of the expression, optionally converted to a host-requested type.
    Root(Option<ResultType>),
}

impl NodeTag<'_> {
    /// Number of children the reduction consumes.
    pub fn arity(&self) -> usize {
        match self {
            NodeTag::Integer(_) | NodeTag::Real(_) | NodeTag::Literal(_) => 0,
            NodeTag::Unary(_) | NodeTag::Cast(_) | NodeTag::Root(_) => 1,
            NodeTag::Binary(_) | NodeTag::InCollection => 2,
            NodeTag::Conditional => 3,
            NodeTag::InList { count } => count + 1,
            NodeTag::Member {
                has_target, argc, ..
            } => usize::from(*has_target) + argc.map_or(0, usize::from),
        }
    }
}

/// A single reduction with its already-built children.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction<'a> {
    pub tag: NodeTag<'a>,
    pub children: Vec<&'a Element<'a>>,
    pub span: Span,
}

/// A reduction in postfix order, without its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceEvent<'a> {
    pub tag: NodeTag<'a>,
    pub span: Span,
}

impl<'a> ReduceEvent<'a> {
    pub fn new(tag: NodeTag<'a>, span: Span) -> Self {
        Self { tag, span }
    }
}

/// Builds type-resolved elements into an arena.
pub struct TreeBuilder<'a, 'r> {
    arena: &'a Bump,
    ctx: &'a CompilationContext<'r>,
}

impl<'a, 'r> TreeBuilder<'a, 'r> {
    pub fn new(arena: &'a Bump, ctx: &'a CompilationContext<'r>) -> Self {
        Self { arena, ctx }
    }

    #[inline]
    pub fn ctx(&self) -> &'a CompilationContext<'r> {
        self.ctx
    }

    /// Build one node from a reduction.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn reduce(&self, reduction: Reduction<'a>) -> Result<&'a Element<'a>> {
        let Reduction {
            tag,
            children,
            span,
        } = reduction;

        if children.len() != tag.arity() {
            return Err(CompilationError::MalformedReduction {
                message: format!(
                    "{tag:?} expects {} children, got {}",
                    tag.arity(),
                    children.len()
                ),
                span,
            });
        }

        match tag {
            NodeTag::Integer(value) => Ok(self.integer(value, span)),
            NodeTag::Real(value) => Ok(self.real(value, span)),
            NodeTag::Literal(literal) => Ok(self.literal(literal, span)),
            NodeTag::Binary(op) => self.binary(op, children[0], children[1], span),
            NodeTag::Unary(op) => self.unary(op, children[0], span),
            NodeTag::Cast(target) => self.cast(children[0], target, span),
            NodeTag::Conditional => self.conditional(children[0], children[1], children[2], span),
            NodeTag::InList { count } => {
                if count == 0 {
                    return Err(CompilationError::MalformedReduction {
                        message: "'in' list has no items".to_string(),
                        span,
                    });
                }
                self.in_list(children[0], &children[1..], span)
            }
            NodeTag::InCollection => self.in_collection(children[0], children[1], span),
            NodeTag::Member {
                name,
                has_target,
                argc,
            } => {
                let (target, args) = if has_target {
                    (Some(children[0]), &children[1..])
                } else {
                    (None, &children[..])
                };
                self.member(name, target, args, argc.is_some(), span)
            }
            NodeTag::Root(expected) => self.root(children[0], expected, span),
        }
    }

    /// Fold a postfix event stream into a tree.
    ///
    /// The stream must leave exactly one element on the stack. If it is not
    /// a root, it is wrapped in one.
    pub fn build(&self, events: &[ReduceEvent<'a>]) -> Result<&'a Element<'a>> {
        let mut stack: Vec<&'a Element<'a>> = Vec::new();
        for event in events {
            let arity = event.tag.arity();
            if stack.len() < arity {
                return Err(CompilationError::MalformedReduction {
                    message: format!(
                        "{:?} needs {arity} operands, {} available",
                        event.tag,
                        stack.len()
                    ),
                    span: event.span,
                });
            }
            let children = stack.split_off(stack.len() - arity);
            let element = self.reduce(Reduction {
                tag: event.tag,
                children,
                span: event.span,
            })?;
            stack.push(element);
        }

        match stack.as_slice() {
            [single] if single.is_root() => Ok(*single),
            [single] => self.root(*single, None, single.span),
            [] => Err(CompilationError::MalformedReduction {
                message: "empty expression".to_string(),
                span: Span::default(),
            }),
            [.., last] => Err(CompilationError::MalformedReduction {
                message: format!("{} operands left without an operator", stack.len()),
                span: last.span,
            }),
        }
    }

    // ==========================================================================
    // Leaves
    // ==========================================================================

    pub fn literal(&self, literal: Literal<'a>, span: Span) -> &'a Element<'a> {
        self.alloc(ElementKind::Literal(literal), literal.result_type(), span)
    }

    pub fn integer(&self, value: u64, span: Span) -> &'a Element<'a> {
        let literal = if self.ctx.options().integers_as_doubles {
            Literal::Double(value as f64)
        } else if let Ok(v) = i32::try_from(value) {
            Literal::Int(v)
        } else if let Ok(v) = u32::try_from(value) {
            Literal::UInt(v)
        } else if let Ok(v) = i64::try_from(value) {
            Literal::Long(v)
        } else {
            Literal::ULong(value)
        };
        self.literal(literal, span)
    }

    pub fn real(&self, value: f64, span: Span) -> &'a Element<'a> {
        let literal = match self.ctx.options().real_literal {
            NumericKind::F32 => Literal::Float(value as f32),
            _ => Literal::Double(value),
        };
        self.literal(literal, span)
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    /// Dispatch a binary operator to its family.
    pub fn binary(
        &self,
        op: BinaryOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        match op {
            BinaryOp::Add => self.arithmetic(ArithmeticOp::Add, left, right, span),
            BinaryOp::Sub => self.arithmetic(ArithmeticOp::Sub, left, right, span),
            BinaryOp::Mul => self.arithmetic(ArithmeticOp::Mul, left, right, span),
            BinaryOp::Div => self.arithmetic(ArithmeticOp::Div, left, right, span),
            BinaryOp::Mod => self.arithmetic(ArithmeticOp::Mod, left, right, span),
            BinaryOp::Pow => self.arithmetic(ArithmeticOp::Pow, left, right, span),
            BinaryOp::Eq => self.compare(CompareOp::Eq, left, right, span),
            BinaryOp::Ne => self.compare(CompareOp::Ne, left, right, span),
            BinaryOp::Lt => self.compare(CompareOp::Lt, left, right, span),
            BinaryOp::Gt => self.compare(CompareOp::Gt, left, right, span),
            BinaryOp::Le => self.compare(CompareOp::Le, left, right, span),
            BinaryOp::Ge => self.compare(CompareOp::Ge, left, right, span),
            BinaryOp::Shl => self.shift(ShiftOp::Shl, left, right, span),
            BinaryOp::Shr => self.shift(ShiftOp::Shr, left, right, span),
            BinaryOp::And => self.logical(LogicalOp::And, left, right, span),
            BinaryOp::Or => self.logical(LogicalOp::Or, left, right, span),
            BinaryOp::Xor => self.logical(LogicalOp::Xor, left, right, span),
        }
    }

    /// Wrap the top node, converting it into `expected` when given.
    pub fn root(
        &self,
        child: &'a Element<'a>,
        expected: Option<ResultType>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        if child.result_type.is_void() {
            return Err(CompilationError::mismatch(
                "expression does not produce a value",
                child.span,
            ));
        }
        let (conversion, result_type) = match expected {
            None => (Conversion::identity(), child.result_type),
            Some(target) => (self.convert_to(child, target, span)?, target),
        };
        Ok(self.alloc(ElementKind::Root { child, conversion }, result_type, span))
    }

    // ==========================================================================
    // Shared helpers
    // ==========================================================================

    fn alloc(&self, kind: ElementKind<'a>, result_type: ResultType, span: Span) -> &'a Element<'a> {
        self.arena.alloc(Element::new(kind, result_type, span))
    }

    /// Implicit conversion of `element` into `target`, or a type mismatch.
    fn convert_to(
        &self,
        element: &Element<'a>,
        target: ResultType,
        span: Span,
    ) -> Result<Conversion> {
        crate::conversion::find_conversion(element.result_type, target, self.ctx).ok_or_else(|| {
            CompilationError::mismatch(
                format!(
                    "cannot implicitly convert '{}' to '{}'",
                    self.ctx.type_name(element.result_type),
                    self.ctx.type_name(target)
                ),
                span,
            )
        })
    }

    /// Copy an overload candidate into an arena call target.
    fn call_target(&self, candidate: &Candidate<'r>) -> CallTarget<'a> {
        CallTarget {
            method: candidate.member.hash,
            is_static: candidate.member.is_static,
            return_type: candidate.return_type,
            conversions: self.arena.alloc_slice_copy(&candidate.conversions),
        }
    }
}

/// Numeric widening from `from` to `to`; identity when equal.
pub(crate) fn numeric_conversion(from: NumericKind, to: NumericKind) -> Conversion {
    if from == to {
        return Conversion::identity();
    }
    let cost = crate::promotion::numeric_convert_score(from, to).unwrap_or(0) as f32;
    Conversion::implicit(ConversionKind::Numeric { from, to }, cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;
    use formula_registry::TypeRegistry;

    fn ev(tag: NodeTag<'_>) -> ReduceEvent<'_> {
        ReduceEvent::new(tag, Span::new(1, 1, 1))
    }

    #[test]
    fn integer_literals_take_narrowest_type() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let s = Span::default();
        assert_eq!(b.integer(7, s).result_type, ResultType::INT32);
        assert_eq!(b.integer(3_000_000_000, s).result_type, ResultType::UINT32);
        assert_eq!(b.integer(1 << 40, s).result_type, ResultType::INT64);
        assert_eq!(b.integer(u64::MAX, s).result_type, ResultType::UINT64);
    }

    #[test]
    fn literal_options() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::with_options(
            &registry,
            CompilerOptions::new()
                .with_integers_as_doubles(true)
                .with_single_precision_reals(),
        );
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        assert_eq!(b.integer(7, Span::default()).result_type, ResultType::DOUBLE);
        assert_eq!(b.real(0.5, Span::default()).result_type, ResultType::FLOAT);
    }

    #[test]
    fn reduce_checks_arity() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let one = b.integer(1, Span::default());
        let err = b
            .reduce(Reduction {
                tag: NodeTag::Binary(BinaryOp::Add),
                children: vec![one],
                span: Span::new(3, 4, 1),
            })
            .unwrap_err();
        assert!(matches!(err, CompilationError::MalformedReduction { .. }));
        assert_eq!(err.span(), Span::new(3, 4, 1));
    }

    #[test]
    fn build_folds_postfix_events() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let root = b
            .build(&[
                ev(NodeTag::Integer(1)),
                ev(NodeTag::Real(2.5)),
                ev(NodeTag::Binary(BinaryOp::Add)),
            ])
            .unwrap();
        assert!(root.is_root());
        assert_eq!(root.result_type, ResultType::DOUBLE);
    }

    #[test]
    fn build_rejects_leftover_and_missing_operands() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let leftover = b.build(&[ev(NodeTag::Integer(1)), ev(NodeTag::Integer(2))]);
        assert!(matches!(
            leftover,
            Err(CompilationError::MalformedReduction { .. })
        ));
        let missing = b.build(&[ev(NodeTag::Integer(1)), ev(NodeTag::Binary(BinaryOp::Mul))]);
        assert!(matches!(
            missing,
            Err(CompilationError::MalformedReduction { .. })
        ));
        assert!(b.build(&[]).is_err());
    }

    #[test]
    fn root_converts_to_requested_type() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let one = b.integer(1, Span::default());
        let root = b.root(one, Some(ResultType::DOUBLE), Span::default()).unwrap();
        assert_eq!(root.result_type, ResultType::DOUBLE);

        let text = b.literal(Literal::String("x"), Span::default());
        let err = b.root(text, Some(ResultType::INT32), Span::default()).unwrap_err();
        assert_eq!(err.kind(), formula_core::ErrorKind::TypeMismatch);
    }
}
