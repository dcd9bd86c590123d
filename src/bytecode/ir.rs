use crate::lang::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A flat, byte-oriented instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions(pub Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one encoded instruction, returning its start offset.
    pub fn push(&mut self, instruction: &[u8]) -> usize {
        let position = self.0.len();
        self.0.extend_from_slice(instruction);
        position
    }

    /// Drop everything from `position` on.
    pub fn truncate(&mut self, position: usize) {
        self.0.truncate(position);
    }

    /// Overwrite bytes in place starting at `position`.
    ///
    /// Returns `false` without touching the stream if the replacement would
    /// run past the end. The stream never grows or shrinks here.
    pub fn overwrite(&mut self, position: usize, bytes: &[u8]) -> bool {
        match self.0.get_mut(position..position + bytes.len()) {
            Some(slot) => {
                slot.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    /// Concatenate separately encoded instructions.
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error("cannot encode bytecode: {0}")]
    Encode(#[source] postcard::Error),

    #[error("cannot decode bytecode: {0}")]
    Decode(#[source] postcard::Error),
}

/// A compiled program: instructions plus the constant pool they index into.
///
/// A `Bytecode` is a snapshot; it can be run any number of times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

impl Bytecode {
    pub fn new(instructions: Instructions, constants: Vec<Value>) -> Self {
        Self {
            instructions,
            constants,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BytecodeError> {
        postcard::to_allocvec(self).map_err(BytecodeError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeError> {
        postcard::from_bytes(bytes).map_err(BytecodeError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::{Opcode, make};

    #[test]
    fn test_push_returns_offsets() {
        let mut ins = Instructions::new();
        assert_eq!(ins.push(&make(Opcode::Constant, &[1])), 0);
        assert_eq!(ins.push(&make(Opcode::Pop, &[])), 3);
        assert_eq!(ins.len(), 4);
    }

    #[test]
    fn test_overwrite_in_bounds() {
        let mut ins: Instructions = vec![make(Opcode::Jump, &[9999])].into_iter().collect();
        assert!(ins.overwrite(0, &make(Opcode::Jump, &[3])));
        assert_eq!(ins.as_bytes(), make(Opcode::Jump, &[3]).as_slice());
    }

    #[test]
    fn test_overwrite_out_of_bounds_is_rejected() {
        let mut ins: Instructions = vec![make(Opcode::Pop, &[])].into_iter().collect();
        assert!(!ins.overwrite(0, &make(Opcode::Jump, &[3])));
        assert_eq!(ins.as_bytes(), &[Opcode::Pop as u8]);
    }

    #[test]
    fn test_postcard_round_trip() {
        let bc = Bytecode::new(
            vec![make(Opcode::Constant, &[0]), make(Opcode::Pop, &[])]
                .into_iter()
                .collect(),
            vec![Value::Integer(7), Value::Boolean(true), Value::Null],
        );

        let bytes = bc.to_bytes().unwrap();
        assert_eq!(Bytecode::from_bytes(&bytes).unwrap(), bc);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = Bytecode::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(err.to_string().contains("cannot decode bytecode"));
    }
}
