use thiserror::Error;

// =============================================================================
// OPCODE - single-byte instruction tags
// =============================================================================
//
// Instruction layout: [opcode: 1 byte][operand_0][operand_1]...
// Operand widths are fixed per opcode, multi-byte operands are big-endian.

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // literals
    /// Push `constants[idx]`. Operand: u16 constant index.
    Constant = 0,
    True = 1,
    False = 2,
    Null = 3,

    // arithmetic ( a b -- a?b )
    Add = 4,
    Sub = 5,
    Mul = 6,
    Div = 7,

    // comparison ( a b -- bool )
    Equal = 8,
    NotEqual = 9,
    /// `a < b` is compiled as `b > a`, so there is no less-than opcode.
    GreaterThan = 10,

    // unary ( a -- r )
    Minus = 11,
    Bang = 12,

    // ==========================================================================
    // Control flow - absolute byte offsets
    // ==========================================================================
    /// Operand: u16 target offset.
    Jump = 13,
    /// Pop one value, jump if it is falsey. Operand: u16 target offset.
    JumpNotTruthy = 14,

    /// Discard the top of the stack.
    Pop = 15,

    // globals
    /// Operand: u16 global slot.
    GetGlobal = 16,
    /// Operand: u16 global slot.
    SetGlobal = 17,
}

/// Name and operand layout of an opcode.
#[derive(Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    /// Byte width of each operand, in order.
    pub operand_widths: &'static [usize],
}

impl Definition {
    /// Total encoded length of one instruction, opcode byte included.
    pub fn instruction_len(&self) -> usize {
        1 + self.operand_widths.iter().sum::<usize>()
    }
}

const NO_OPERANDS: &[usize] = &[];
const ONE_U16: &[usize] = &[2];

macro_rules! definition {
    ($name:literal, $widths:expr) => {
        &Definition {
            name: $name,
            operand_widths: $widths,
        }
    };
}

impl Opcode {
    pub const ALL: [Opcode; 18] = [
        Opcode::Constant,
        Opcode::True,
        Opcode::False,
        Opcode::Null,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::GreaterThan,
        Opcode::Minus,
        Opcode::Bang,
        Opcode::Jump,
        Opcode::JumpNotTruthy,
        Opcode::Pop,
        Opcode::GetGlobal,
        Opcode::SetGlobal,
    ];

    pub fn definition(self) -> &'static Definition {
        match self {
            Opcode::Constant => definition!("OpConstant", ONE_U16),
            Opcode::True => definition!("OpTrue", NO_OPERANDS),
            Opcode::False => definition!("OpFalse", NO_OPERANDS),
            Opcode::Null => definition!("OpNull", NO_OPERANDS),
            Opcode::Add => definition!("OpAdd", NO_OPERANDS),
            Opcode::Sub => definition!("OpSub", NO_OPERANDS),
            Opcode::Mul => definition!("OpMul", NO_OPERANDS),
            Opcode::Div => definition!("OpDiv", NO_OPERANDS),
            Opcode::Equal => definition!("OpEqual", NO_OPERANDS),
            Opcode::NotEqual => definition!("OpNotEqual", NO_OPERANDS),
            Opcode::GreaterThan => definition!("OpGreaterThan", NO_OPERANDS),
            Opcode::Minus => definition!("OpMinus", NO_OPERANDS),
            Opcode::Bang => definition!("OpBang", NO_OPERANDS),
            Opcode::Jump => definition!("OpJump", ONE_U16),
            Opcode::JumpNotTruthy => definition!("OpJumpNotTruthy", ONE_U16),
            Opcode::Pop => definition!("OpPop", NO_OPERANDS),
            Opcode::GetGlobal => definition!("OpGetGlobal", ONE_U16),
            Opcode::SetGlobal => definition!("OpSetGlobal", ONE_U16),
        }
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("opcode {0} undefined")]
pub struct OpcodeError(pub u8);

impl TryFrom<u8> for Opcode {
    type Error = OpcodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(OpcodeError(byte))
    }
}

/// Definition for a raw opcode byte.
pub fn lookup(byte: u8) -> Result<&'static Definition, OpcodeError> {
    Opcode::try_from(byte).map(Opcode::definition)
}

/// Encode one instruction.
///
/// Each operand is written right-justified in its declared width, big-endian,
/// truncated to that width. Missing operands encode as zero; extra operands
/// are ignored. Range checks belong to the caller.
pub fn make(op: Opcode, operands: &[usize]) -> Vec<u8> {
    let def = op.definition();
    let mut instruction = vec![0u8; def.instruction_len()];
    instruction[0] = op as u8;

    let mut offset = 1;
    for (width, operand) in def.operand_widths.iter().zip(operands) {
        match width {
            2 => instruction[offset..offset + 2].copy_from_slice(&(*operand as u16).to_be_bytes()),
            1 => instruction[offset] = *operand as u8,
            _ => {}
        }
        offset += width;
    }

    instruction
}

/// Decode the operands following an opcode byte.
///
/// `bytes` starts right after the opcode. Returns the operands and the number
/// of bytes consumed, or `None` if the slice is shorter than the layout.
pub fn read_operands(def: &Definition, bytes: &[u8]) -> Option<(Vec<usize>, usize)> {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;

    for width in def.operand_widths {
        let operand = match width {
            2 => read_u16(bytes.get(offset..)?)? as usize,
            1 => *bytes.get(offset)? as usize,
            _ => 0,
        };
        operands.push(operand);
        offset += width;
    }

    Some((operands, offset))
}

/// Big-endian u16 at the start of `bytes`.
#[inline]
pub fn read_u16(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}
