use crate::bytecode::symbol_table::SymbolScope;
use thiserror::Error;

/// Errors that abort compilation. A compiler that returned one of these must
/// not have its bytecode executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An operator the compiler has no translation for.
    #[error("compile error: unknown operator: {operator} ({kind})")]
    UnknownOperator {
        operator: String,
        kind: &'static str,
    },

    #[error("compile error: undefined variable {0}")]
    UndefinedVariable(String),

    /// A binding resolved to a scope that has no storage opcode.
    #[error("compile error: cannot store '{name}' in {scope} scope")]
    UnsupportedScope { name: String, scope: SymbolScope },

    #[error("compile error: too many constants (limit: 65536)")]
    TooManyConstants,

    #[error("compile error: too many globals (limit: 65536)")]
    TooManyGlobals,

    /// Jump targets are absolute u16 offsets.
    #[error("compile error: jump target {0} out of range (limit: 65535)")]
    JumpTooFar(usize),

    #[error("compile error: patch at {0} runs past the instruction stream")]
    PatchOutOfRange(usize),
}

impl CompileError {
    pub fn unknown_prefix(operator: &str) -> Self {
        CompileError::UnknownOperator {
            operator: operator.to_string(),
            kind: "prefix",
        }
    }

    pub fn unknown_infix(operator: &str) -> Self {
        CompileError::UnknownOperator {
            operator: operator.to_string(),
            kind: "infix",
        }
    }
}
