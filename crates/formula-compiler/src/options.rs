//! Per-compile configuration.

use formula_core::{NumericKind, TypeHash};

/// How string equality is evaluated at runtime.
///
/// The discriminant is passed to `runtime::STRING_EQUALS` as its third
/// argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum StringComparison {
    /// Byte-wise comparison.
    #[default]
    Ordinal = 0,
    /// Byte-wise after ASCII case folding.
    OrdinalIgnoreCase = 1,
    /// Culture-aware comparison performed by the host.
    Culture = 2,
    /// Culture-aware, case-insensitive comparison performed by the host.
    CultureIgnoreCase = 3,
}

/// Options for a single compile.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    /// Emit overflow-checked arithmetic and conversions.
    pub checked: bool,
    /// Mode used for `==` and `!=` on strings.
    pub string_comparison: StringComparison,
    /// Type whose members bare names resolve against.
    pub owner: Option<TypeHash>,
    /// Case-insensitive member lookup.
    pub ignore_case: bool,
    /// Type given to real literals: `F64` or `F32`.
    pub real_literal: NumericKind,
    /// Type integer literals as `double`.
    pub integers_as_doubles: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            checked: false,
            string_comparison: StringComparison::default(),
            owner: None,
            ignore_case: false,
            real_literal: NumericKind::F64,
            integers_as_doubles: false,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_string_comparison(mut self, comparison: StringComparison) -> Self {
        self.string_comparison = comparison;
        self
    }

    pub fn with_owner(mut self, owner: TypeHash) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Type real literals as `float` instead of `double`.
    pub fn with_single_precision_reals(mut self) -> Self {
        self.real_literal = NumericKind::F32;
        self
    }

    pub fn with_integers_as_doubles(mut self, enabled: bool) -> Self {
        self.integers_as_doubles = enabled;
        self
    }
}
