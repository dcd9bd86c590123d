use tracing::{debug, trace};

use crate::bytecode::Bytecode;
use crate::bytecode::op::{Opcode, read_u16};
use crate::lang::value::{FALSE, NULL, TRUE, Value};
use crate::runtime::runtime_error::RuntimeError;

/// Operand stack capacity.
pub const STACK_SIZE: usize = 2048;

/// Global store capacity: one slot per possible u16 global index.
pub const GLOBALS_SIZE: usize = 65536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    pub stack_size: usize,
    pub globals_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_size: STACK_SIZE,
            globals_size: GLOBALS_SIZE,
        }
    }
}

/// A fresh global store for `config`.
pub fn new_globals(config: &VmConfig) -> Vec<Value> {
    vec![NULL; config.globals_size]
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Equal,
    NotEqual,
    GreaterThan,
}

/// Stack machine executing one [`Bytecode`] artifact.
///
/// The stack is allocated once at `stack_size` and never grows. `sp` always
/// indexes the next free slot; popped values stay in place above it until
/// overwritten, which is what [`Vm::last_popped_stack_elem`] reads.
pub struct Vm<'a> {
    constants: &'a [Value],
    instructions: &'a [u8],

    stack: Vec<Value>,
    sp: usize,

    globals: Vec<Value>,
}

impl<'a> Vm<'a> {
    pub fn new(bytecode: &'a Bytecode) -> Self {
        let config = VmConfig::default();
        let globals = new_globals(&config);
        Self::with_config(bytecode, globals, config)
    }

    /// Run against a global store carried over from earlier runs.
    pub fn with_globals(bytecode: &'a Bytecode, globals: Vec<Value>) -> Self {
        Self::with_config(bytecode, globals, VmConfig::default())
    }

    /// A store shorter than `config.globals_size` is padded with `null`.
    pub fn with_config(bytecode: &'a Bytecode, mut globals: Vec<Value>, config: VmConfig) -> Self {
        if globals.len() < config.globals_size {
            globals.resize(config.globals_size, NULL);
        }

        Self {
            constants: &bytecode.constants,
            instructions: bytecode.instructions.as_bytes(),
            stack: vec![NULL; config.stack_size],
            sp: 0,
            globals,
        }
    }

    /// Top of the live stack, if any.
    pub fn stack_top(&self) -> Option<Value> {
        self.sp.checked_sub(1).map(|top| self.stack[top])
    }

    /// The value most recently removed from the stack.
    pub fn last_popped_stack_elem(&self) -> Value {
        self.stack.get(self.sp).copied().unwrap_or(NULL)
    }

    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    /// Give the global store back so the next run can reuse it.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    // Execution

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        debug!(
            bytes = self.instructions.len(),
            constants = self.constants.len(),
            "run"
        );

        let mut ip: usize = 0;

        while ip < self.instructions.len() {
            let op = Opcode::try_from(self.instructions[ip])
                .map_err(|e| RuntimeError::UnknownOpcode(e.0))?;

            trace!(ip, op = op.name(), sp = self.sp, "exec");

            match op {
                Opcode::Constant => {
                    let index = self.read_operand(op, ip)?;
                    ip += 2;

                    let value = *self
                        .constants
                        .get(index)
                        .ok_or(RuntimeError::ConstantOutOfRange(index))?;
                    self.push(value)?;
                }

                // Arithmetic
                Opcode::Add => self.execute_binary_operation(op, |a, b| Ok(a.wrapping_add(b)))?,
                Opcode::Sub => self.execute_binary_operation(op, |a, b| Ok(a.wrapping_sub(b)))?,
                Opcode::Mul => self.execute_binary_operation(op, |a, b| Ok(a.wrapping_mul(b)))?,
                Opcode::Div => self.execute_binary_operation(op, |a, b| {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    // truncates toward zero
                    Ok(a.wrapping_div(b))
                })?,

                // Comparison
                Opcode::Equal => self.execute_comparison(op, Comparison::Equal)?,
                Opcode::NotEqual => self.execute_comparison(op, Comparison::NotEqual)?,
                Opcode::GreaterThan => self.execute_comparison(op, Comparison::GreaterThan)?,

                // Literals
                Opcode::True => self.push(TRUE)?,
                Opcode::False => self.push(FALSE)?,
                Opcode::Null => self.push(NULL)?,

                // Unary
                Opcode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::from_bool(!operand.is_truthy()))?;
                }
                Opcode::Minus => {
                    let result = match self.pop()? {
                        Value::Integer(n) => Value::Integer(n.wrapping_neg()),
                        other => return Err(RuntimeError::UnsupportedNegation(other.type_name())),
                    };
                    self.push(result)?;
                }

                // Control flow
                Opcode::Jump => {
                    ip = self.read_operand(op, ip)?;
                    continue;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_operand(op, ip)?;
                    ip += 2;

                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        ip = target;
                        continue;
                    }
                }

                Opcode::Pop => {
                    self.pop()?;
                }

                // Globals
                Opcode::SetGlobal => {
                    let index = self.read_operand(op, ip)?;
                    ip += 2;

                    let value = self.pop()?;
                    let slot = self
                        .globals
                        .get_mut(index)
                        .ok_or(RuntimeError::GlobalOutOfRange(index))?;
                    *slot = value;
                }
                Opcode::GetGlobal => {
                    let index = self.read_operand(op, ip)?;
                    ip += 2;

                    let value = *self
                        .globals
                        .get(index)
                        .ok_or(RuntimeError::GlobalOutOfRange(index))?;
                    self.push(value)?;
                }
            }

            ip += 1;
        }

        debug!(sp = self.sp, "run finished");
        Ok(())
    }

    /// Decode the u16 operand of the instruction at `ip`.
    fn read_operand(&self, op: Opcode, ip: usize) -> Result<usize, RuntimeError> {
        read_u16(&self.instructions[ip + 1..])
            .map(usize::from)
            .ok_or(RuntimeError::TruncatedInstruction { op: op.name(), ip })
    }

    fn execute_binary_operation<F>(&mut self, op: Opcode, apply: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(i64, i64) -> Result<i64, RuntimeError>,
    {
        // right was pushed last
        let right = self.pop()?;
        let left = self.pop()?;

        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => self.push(Value::Integer(apply(a, b)?)),
            _ => Err(RuntimeError::type_mismatch(
                op.name(),
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    fn execute_comparison(&mut self, op: Opcode, cmp: Comparison) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (left, right, cmp) {
            (Value::Integer(a), Value::Integer(b), Comparison::Equal) => a == b,
            (Value::Integer(a), Value::Integer(b), Comparison::NotEqual) => a != b,
            (Value::Integer(a), Value::Integer(b), Comparison::GreaterThan) => a > b,

            (Value::Boolean(a), Value::Boolean(b), Comparison::Equal) => a == b,
            (Value::Boolean(a), Value::Boolean(b), Comparison::NotEqual) => a != b,

            _ => {
                return Err(RuntimeError::type_mismatch(
                    op.name(),
                    left.type_name(),
                    right.type_name(),
                ));
            }
        };

        self.push(Value::from_bool(result))
    }

    // Stack operations

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        let capacity = self.stack.len();
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(RuntimeError::StackOverflow(capacity))?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }
}
