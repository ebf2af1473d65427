// =============================================================================
// OPCODE - one byte per instruction tag
// =============================================================================

/// Bytecode instruction tags.
///
/// Operand encoding that follows the tag byte:
/// - constant, local slot, global name and call arguments use one byte
/// - jumps use a two-byte big-endian offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // literals
    Constant,
    Nil,
    True,
    False,

    // stack
    Pop,

    // variables
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,

    // comparison
    Equal,
    Greater,
    Less,

    // arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,

    // I/O
    Print,

    // control flow
    /// Unconditional forward jump by a u16 offset.
    Jump,
    /// Forward jump when the top of stack is falsy. Does not pop.
    JumpIfFalse,
    /// Backward jump by a u16 offset.
    Loop,

    // functions
    Call,
    Return,
}

impl OpCode {
    const ALL: [OpCode; 25] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Pop,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::GetGlobal,
        OpCode::DefineGlobal,
        OpCode::SetGlobal,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Print,
        OpCode::Jump,
        OpCode::JumpIfFalse,
        OpCode::Loop,
        OpCode::Call,
        OpCode::Return,
    ];

    /// Number of operand bytes following the opcode.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetGlobal
            | OpCode::DefineGlobal
            | OpCode::SetGlobal
            | OpCode::Call => 1,
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => 2,
            _ => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Nil => "NIL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Pop => "POP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::DefineGlobal => "DEFINE_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::Equal => "EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::Less => "LESS",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Not => "NOT",
            OpCode::Negate => "NEGATE",
            OpCode::Print => "PRINT",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::Loop => "LOOP",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(usize::from(byte)).copied().ok_or(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_matches_discriminant() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::try_from(u8::from(op)), Ok(op));
        }
    }

    #[test]
    fn test_unknown_byte_rejected() {
        assert_eq!(OpCode::try_from(25), Err(25));
        assert_eq!(OpCode::try_from(0xff), Err(0xff));
    }

    #[test]
    fn test_operand_widths() {
        assert_eq!(OpCode::Constant.operand_width(), 1);
        assert_eq!(OpCode::Call.operand_width(), 1);
        assert_eq!(OpCode::JumpIfFalse.operand_width(), 2);
        assert_eq!(OpCode::Loop.operand_width(), 2);
        assert_eq!(OpCode::Return.operand_width(), 0);
    }
}
