use thiserror::Error;

/// Errors that abort a `Vm::run`. The VM is not meant to be reused after one
/// of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("runtime error: unsupported types for {op}: {left} {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("runtime error: unsupported type for negation: {0}")]
    UnsupportedNegation(&'static str),

    #[error("runtime error: division by zero")]
    DivisionByZero,

    #[error("runtime error: stack overflow (limit: {0})")]
    StackOverflow(usize),

    #[error("runtime error: stack underflow")]
    StackUnderflow,

    #[error("runtime error: opcode {0} undefined")]
    UnknownOpcode(u8),

    #[error("runtime error: truncated {op} instruction at {ip}")]
    TruncatedInstruction { op: &'static str, ip: usize },

    #[error("runtime error: constant {0} out of range")]
    ConstantOutOfRange(usize),

    #[error("runtime error: global {0} out of range")]
    GlobalOutOfRange(usize),
}

impl RuntimeError {
    pub fn type_mismatch(op: &'static str, left: &'static str, right: &'static str) -> Self {
        RuntimeError::TypeMismatch { op, left, right }
    }
}
