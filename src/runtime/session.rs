//! Compile-and-run context that carries state between submissions.
//!
//! Each `eval` compiles against the constants and symbol table left by the
//! previous successful compile, then runs against the same global store, so
//! a binding made in one submission is visible in the next.

use thiserror::Error;
use tracing::{debug, warn};

use crate::bytecode::Bytecode;
use crate::bytecode::compile::Compiler;
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::symbol_table::SymbolTable;
use crate::lang::node::Program;
use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm::{Vm, VmConfig, new_globals};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Clone)]
pub struct Session {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    globals: Vec<Value>,
    config: VmConfig,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            constants: Vec::new(),
            symbol_table: SymbolTable::new(),
            globals: new_globals(&config),
            config,
        }
    }

    /// Compile `program` against the carried state and commit the new
    /// constants and symbols. On failure the session is left untouched.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, SessionError> {
        let mut compiler = Compiler::with_state(self.symbol_table.clone(), self.constants.clone());

        if let Err(e) = compiler.compile(program) {
            warn!(error = %e, "compile failed, session rolled back");
            return Err(e.into());
        }

        let bytecode = compiler.bytecode();
        let (symbol_table, constants) = compiler.into_state();

        debug!(
            constants = constants.len(),
            symbols = symbol_table.len(),
            "session committed"
        );
        self.symbol_table = symbol_table;
        self.constants = constants;

        Ok(bytecode)
    }

    /// Compile and run `program`, returning the last popped value.
    ///
    /// Globals written before a runtime error are kept.
    pub fn eval(&mut self, program: &Program) -> Result<Value, SessionError> {
        let bytecode = self.compile(program)?;

        let globals = std::mem::take(&mut self.globals);
        let mut vm = Vm::with_config(&bytecode, globals, self.config.clone());
        let result = vm.run();
        let value = vm.last_popped_stack_elem();
        self.globals = vm.into_globals();

        result?;
        Ok(value)
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub fn globals(&self) -> &[Value] {
        &self.globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::node::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binding_persists_across_evals() {
        let mut session = Session::new();

        session
            .eval(&Program::new(vec![let_stmt("x", int(5))]))
            .unwrap();
        let value = session
            .eval(&program_of(vec![infix(ident("x"), "+", int(1))]))
            .unwrap();

        assert_eq!(value, Value::Integer(6));
    }

    #[test]
    fn test_constants_accumulate() {
        let mut session = Session::new();

        session.eval(&program_of(vec![int(10)])).unwrap();
        session.eval(&program_of(vec![int(20)])).unwrap();

        assert_eq!(session.constants(), &[Value::Integer(10), Value::Integer(20)]);
    }

    #[test]
    fn test_compile_error_rolls_back() {
        let mut session = Session::new();
        session
            .eval(&Program::new(vec![let_stmt("a", int(1))]))
            .unwrap();

        // let b = 2 + missing;
        let err = session
            .eval(&Program::new(vec![let_stmt(
                "b",
                infix(int(2), "+", ident("missing")),
            )]))
            .unwrap_err();

        assert_eq!(
            err,
            SessionError::Compile(CompileError::UndefinedVariable("missing".to_string()))
        );
        assert_eq!(session.constants(), &[Value::Integer(1)]);
        assert!(session.symbol_table().resolve("b").is_none());
        assert_eq!(session.symbol_table().len(), 1);
    }

    #[test]
    fn test_session_usable_after_runtime_error() {
        let mut session = Session::new();
        session
            .eval(&Program::new(vec![let_stmt("n", int(3))]))
            .unwrap();

        let err = session
            .eval(&program_of(vec![infix(ident("n"), "/", int(0))]))
            .unwrap_err();
        assert_eq!(err, SessionError::Runtime(RuntimeError::DivisionByZero));

        let value = session
            .eval(&program_of(vec![infix(ident("n"), "*", int(2))]))
            .unwrap();
        assert_eq!(value, Value::Integer(6));
    }

    #[test]
    fn test_redefinition_shadows() {
        let mut session = Session::new();
        session
            .eval(&Program::new(vec![let_stmt("x", int(1))]))
            .unwrap();
        session
            .eval(&Program::new(vec![let_stmt(
                "x",
                infix(ident("x"), "+", int(1)),
            )]))
            .unwrap();

        let value = session.eval(&program_of(vec![ident("x")])).unwrap();
        assert_eq!(value, Value::Integer(2));
    }

    #[test]
    fn test_let_only_submission_yields_bound_value() {
        // OpSetGlobal pops the value, so it is the last popped element
        let mut session = Session::new();
        let value = session
            .eval(&Program::new(vec![let_stmt("x", int(1))]))
            .unwrap();
        assert_eq!(value, Value::Integer(1));
        assert_eq!(session.globals()[0], Value::Integer(1));
    }

    #[test]
    fn test_with_config_limits_stack() {
        let mut session = Session::with_config(VmConfig {
            stack_size: 1,
            globals_size: 4,
        });

        let err = session
            .eval(&program_of(vec![infix(int(1), "+", int(2))]))
            .unwrap_err();
        assert_eq!(err, SessionError::Runtime(RuntimeError::StackOverflow(1)));
        assert_eq!(session.globals().len(), 4);
    }

    #[test]
    fn test_compile_only_commits_state() {
        let mut session = Session::new();
        let bytecode = session
            .compile(&Program::new(vec![let_stmt("y", int(7))]))
            .unwrap();

        assert_eq!(bytecode.constants, vec![Value::Integer(7)]);
        assert!(session.symbol_table().resolve("y").is_some());
    }
}
