use thiserror::Error;

use super::chunk::Chunk;
use super::op::OpCode;
use crate::lang::object::{Function, Obj};
use crate::lang::value::Value;

/// Structural problem found in a compiled function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("{function}: line table has {lines} entries for {code} bytes")]
    LineTableMismatch {
        function: String,
        code: usize,
        lines: usize,
    },
    #[error("{function}: unknown opcode {byte} at {offset}")]
    UnknownOpcode {
        function: String,
        offset: usize,
        byte: u8,
    },
    #[error("{function}: {op} at {offset} is missing its operand")]
    TruncatedOperand {
        function: String,
        offset: usize,
        op: &'static str,
    },
    #[error("{function}: constant {index} at {offset} is out of range")]
    ConstantOutOfRange {
        function: String,
        offset: usize,
        index: u8,
    },
    #[error("{function}: {op} at {offset} does not name a string constant")]
    NameNotString {
        function: String,
        offset: usize,
        op: &'static str,
    },
    #[error("{function}: {op} at {offset} jumps outside the instruction stream")]
    BadJumpTarget {
        function: String,
        offset: usize,
        op: &'static str,
    },
    #[error("{function}: chunk does not end with RETURN")]
    MissingReturn { function: String },
}

/// Checks that `function` and every function in its constant pool can be
/// executed without reading past the chunk or decoding garbage.
pub fn verify(function: &Function) -> Result<(), VerifyError> {
    let name = function.display_name();
    check_chunk(&function.chunk, &name)?;

    for constant in &function.chunk.constants {
        if let Value::Object(Obj::Function(inner)) = constant {
            verify(inner)?;
        }
    }
    Ok(())
}

fn check_chunk(chunk: &Chunk, function: &str) -> Result<(), VerifyError> {
    if chunk.code.len() != chunk.lines.len() {
        return Err(VerifyError::LineTableMismatch {
            function: function.to_string(),
            code: chunk.code.len(),
            lines: chunk.lines.len(),
        });
    }

    // instruction starts, plus the end of the chunk
    let mut boundary = vec![false; chunk.code.len() + 1];
    boundary[chunk.code.len()] = true;

    let mut jumps = Vec::new();
    let mut last = None;
    let mut offset = 0;

    while offset < chunk.code.len() {
        boundary[offset] = true;
        let byte = chunk.code[offset];
        let op = OpCode::try_from(byte).map_err(|byte| VerifyError::UnknownOpcode {
            function: function.to_string(),
            offset,
            byte,
        })?;

        let next = offset + 1 + op.operand_width();
        if next > chunk.code.len() {
            return Err(VerifyError::TruncatedOperand {
                function: function.to_string(),
                offset,
                op: op.mnemonic(),
            });
        }

        match op {
            OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => {
                let index = chunk.code[offset + 1];
                let Some(value) = chunk.constant(index) else {
                    return Err(VerifyError::ConstantOutOfRange {
                        function: function.to_string(),
                        offset,
                        index,
                    });
                };
                if op != OpCode::Constant && value.as_str().is_none() {
                    return Err(VerifyError::NameNotString {
                        function: function.to_string(),
                        offset,
                        op: op.mnemonic(),
                    });
                }
            }
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => {
                let distance = chunk.read_u16(offset + 1).map_or(0, usize::from);
                let target = if op == OpCode::Loop {
                    next.checked_sub(distance)
                } else {
                    Some(next + distance)
                };
                jumps.push((offset, op, target));
            }
            _ => {}
        }

        last = Some(op);
        offset = next;
    }

    for (offset, op, target) in jumps {
        if !target.is_some_and(|t| boundary.get(t).copied().unwrap_or(false)) {
            return Err(VerifyError::BadJumpTarget {
                function: function.to_string(),
                offset,
                op: op.mnemonic(),
            });
        }
    }

    if last != Some(OpCode::Return) {
        return Err(VerifyError::MissingReturn {
            function: function.to_string(),
        });
    }
    Ok(())
}
