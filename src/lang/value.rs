use serde::{Deserialize, Serialize};

/// Runtime value in the Cinder language.
///
/// Values are the only data that can live on the VM operand stack, in the
/// constant pool, or in the global store. They are immutable: every
/// operation produces a fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),

    /// Boolean value. Use [`TRUE`] and [`FALSE`] rather than building new ones.
    Boolean(bool),

    /// Absence of a value, produced by a conditional whose taken branch
    /// yields nothing.
    Null,
}

pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

impl Value {
    /// Upper-case kind name used in runtime error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
        }
    }

    /// Only `false` and `null` are falsey. Integer zero is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            Value::Integer(_) => true,
        }
    }

    pub fn from_bool(b: bool) -> Value {
        if b { TRUE } else { FALSE }
    }
}

impl std::fmt::Display for Value {
    /// Format a value the way a REPL would echo it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}
