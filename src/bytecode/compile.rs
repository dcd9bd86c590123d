use tracing::{debug, trace};

use crate::{
    bytecode::{
        Bytecode, Instructions,
        compile_error::CompileError,
        op::{Opcode, make},
        symbol_table::{SymbolScope, SymbolTable},
    },
    lang::{
        node::{BlockStatement, Expression, Node, Program, Statement},
        value::Value,
    },
};

/// Operand written into a forward jump until its target is known.
const JUMP_PLACEHOLDER: usize = 9999;

const MAX_OPERAND: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

pub struct Compiler {
    /// Output instruction stream
    instructions: Instructions,

    /// Constant pool, indexed by `OpConstant` operands
    constants: Vec<Value>,

    symbol_table: SymbolTable,

    /// The two most recent emissions, used to retract a trailing `OpPop`
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_state(SymbolTable::new(), Vec::new())
    }

    /// Resume a session: keep numbering globals and constants where the
    /// previous compile stopped.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            instructions: Instructions::new(),
            constants,
            symbol_table,
            last_instruction: None,
            previous_instruction: None,
        }
    }

    pub fn compile<'a>(&mut self, node: impl Into<Node<'a>>) -> Result<(), CompileError> {
        match node.into() {
            Node::Program(program) => self.compile_program(program),
            Node::Block(block) => self.compile_block(block),
            Node::Statement(statement) => self.compile_statement(statement),
            Node::Expression(expression) => self.compile_expression(expression),
        }
    }

    /// Snapshot of everything compiled so far.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode::new(self.instructions.clone(), self.constants.clone())
    }

    /// Hand the session state back to the caller.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    fn compile_program(&mut self, program: &Program) -> Result<(), CompileError> {
        debug!(
            statements = program.statements.len(),
            constants = self.constants.len(),
            "compiling program"
        );

        for statement in &program.statements {
            self.compile_statement(statement)?;
        }

        debug!(
            bytes = self.instructions.len(),
            constants = self.constants.len(),
            "compiled program"
        );
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Opcode::Pop, &[]);
            }

            Statement::Let { name, value } => {
                self.compile_expression(value)?;

                let scope = self.symbol_table.scope();
                if scope != SymbolScope::Global {
                    return Err(CompileError::UnsupportedScope {
                        name: name.clone(),
                        scope,
                    });
                }

                let symbol = self.symbol_table.define(name);
                if symbol.index > MAX_OPERAND {
                    return Err(CompileError::TooManyGlobals);
                }
                self.emit(Opcode::SetGlobal, &[symbol.index]);
            }
        }

        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        match expression {
            Expression::Integer(n) => {
                let index = self.add_constant(Value::Integer(*n))?;
                self.emit(Opcode::Constant, &[index]);
            }

            Expression::Boolean(true) => {
                self.emit(Opcode::True, &[]);
            }
            Expression::Boolean(false) => {
                self.emit(Opcode::False, &[]);
            }

            Expression::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;

                if symbol.scope != SymbolScope::Global {
                    return Err(CompileError::UnsupportedScope {
                        name: name.clone(),
                        scope: symbol.scope,
                    });
                }
                self.emit(Opcode::GetGlobal, &[symbol.index]);
            }

            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;

                match operator.as_str() {
                    "-" => self.emit(Opcode::Minus, &[]),
                    "!" => self.emit(Opcode::Bang, &[]),
                    other => return Err(CompileError::unknown_prefix(other)),
                };
            }

            Expression::Infix {
                left,
                operator,
                right,
            } => {
                // `a < b` becomes `b > a`: right operand is compiled first.
                if operator == "<" {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;

                let op = match operator.as_str() {
                    "+" => Opcode::Add,
                    "-" => Opcode::Sub,
                    "*" => Opcode::Mul,
                    "/" => Opcode::Div,
                    ">" => Opcode::GreaterThan,
                    "==" => Opcode::Equal,
                    "!=" => Opcode::NotEqual,
                    other => return Err(CompileError::unknown_infix(other)),
                };
                self.emit(op, &[]);
            }

            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref())?,
        }

        Ok(())
    }

    // =========================================================================
    // Conditionals
    // =========================================================================

    /// Emitted layout:
    ///
    /// ```text
    ///   <condition>
    ///   JumpNotTruthy else
    ///   <consequence>          ; trailing Pop retracted
    ///   Jump end
    /// else:
    ///   <alternative> | Null   ; trailing Pop retracted
    /// end:
    /// ```
    ///
    /// Both jumps are emitted with a placeholder target and patched once the
    /// offset they must land on has been emitted.
    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;

        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[JUMP_PLACEHOLDER]);

        self.compile_branch(consequence)?;

        let jump = self.emit(Opcode::Jump, &[JUMP_PLACEHOLDER]);

        self.patch_jump(jump_not_truthy)?;

        match alternative {
            Some(block) => self.compile_branch(block)?,
            None => {
                self.emit(Opcode::Null, &[]);
            }
        }

        self.patch_jump(jump)
    }

    /// Compile a conditional branch so that it leaves exactly one value.
    ///
    /// A branch ending in an expression statement keeps that expression's
    /// value by dropping its `OpPop`; any other branch (empty, or ending in a
    /// `let`) yields `null`.
    fn compile_branch(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        self.compile_block(block)?;

        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(Opcode::Null, &[]);
        }

        Ok(())
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn add_constant(&mut self, value: Value) -> Result<usize, CompileError> {
        let index = self.constants.len();
        if index > MAX_OPERAND {
            return Err(CompileError::TooManyConstants);
        }

        self.constants.push(value);
        Ok(index)
    }

    /// Append one instruction and return its offset.
    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.instructions.push(&instruction);

        trace!(op = op.name(), ?operands, position, "emit");

        self.set_last_instruction(op, position);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        self.previous_instruction = self.last_instruction;
        self.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.last_instruction.is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        if let Some(last) = self.last_instruction {
            self.instructions.truncate(last.position);
            self.last_instruction = self.previous_instruction;
        }
    }

    /// Point the jump at `position` to the current end of the stream.
    fn patch_jump(&mut self, position: usize) -> Result<(), CompileError> {
        let target = self.instructions.len();
        if target > MAX_OPERAND {
            return Err(CompileError::JumpTooFar(target));
        }

        let op = match self.instructions.as_bytes().get(position) {
            Some(&byte) if byte == Opcode::Jump as u8 => Opcode::Jump,
            _ => Opcode::JumpNotTruthy,
        };

        debug!(op = op.name(), position, target, "backpatch");
        self.replace_instruction(position, &make(op, &[target]))
    }

    fn replace_instruction(
        &mut self,
        position: usize,
        instruction: &[u8],
    ) -> Result<(), CompileError> {
        if self.instructions.overwrite(position, instruction) {
            Ok(())
        } else {
            Err(CompileError::PatchOutOfRange(position))
        }
    }
}
