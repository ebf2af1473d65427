use std::fmt::{self, Write};

use super::chunk::Chunk;
use super::op::OpCode;
use crate::lang::object::{Function, Obj};
use crate::lang::value::Value;

/// Disassembles a whole chunk under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    write_chunk(&mut out, chunk, name)
        .map(|()| out)
        .unwrap_or_default()
}

/// Disassembles one function, headed by its name or `<script>`.
pub fn disassemble_function(function: &Function) -> String {
    disassemble_chunk(&function.chunk, &function.display_name())
}

/// Disassembles `script` followed by every function reachable through its
/// constant pool, depth-first in constant order. Chunks are separated by a
/// blank line.
pub fn disassemble_program(script: &Function) -> String {
    let mut parts = Vec::new();
    collect_functions(script, &mut parts);
    parts.join("\n")
}

fn collect_functions(function: &Function, parts: &mut Vec<String>) {
    parts.push(disassemble_function(function));
    for constant in &function.chunk.constants {
        if let Value::Object(Obj::Function(inner)) = constant {
            collect_functions(inner, parts);
        }
    }
}

fn write_chunk(out: &mut impl Write, chunk: &Chunk, name: &str) -> fmt::Result {
    writeln!(out, "== {} ==", name)?;
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = write_instruction(out, chunk, offset)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Renders the instruction at `offset` without a trailing newline and
/// returns it together with the offset of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = String::new();
    write_instruction(&mut out, chunk, offset)
        .map(|next| (out, next))
        .unwrap_or_else(|_| (String::new(), offset + 1))
}

fn write_instruction(out: &mut impl Write, chunk: &Chunk, offset: usize) -> Result<usize, fmt::Error> {
    write!(out, "{:04} ", offset)?;

    let line = chunk.line(offset);
    if offset > 0 && line == chunk.line(offset - 1) {
        write!(out, "   | ")?;
    } else {
        match line {
            Some(line) => write!(out, "{:4} ", line)?,
            None => write!(out, "   ? ")?,
        }
    }

    let Some(&byte) = chunk.code.get(offset) else {
        write!(out, "<end of chunk>")?;
        return Ok(offset + 1);
    };

    let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(byte) => {
            write!(out, "Unknown opcode {}", byte)?;
            return Ok(offset + 1);
        }
    };

    let name = op.mnemonic();
    let width = op.operand_width();
    if offset + width >= chunk.code.len() && width > 0 {
        write!(out, "{:<16} <truncated>", name)?;
        return Ok(chunk.code.len());
    }

    match op {
        OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => {
            let index = chunk.code[offset + 1];
            match chunk.constant(index) {
                Some(value) => write!(out, "{:<16} {:4} '{}'", name, index, value)?,
                None => write!(out, "{:<16} {:4} <invalid constant>", name, index)?,
            }
        }
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
            write!(out, "{:<16} {:4}", name, chunk.code[offset + 1])?;
        }
        OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => {
            let jump = chunk.read_u16(offset + 1).map_or(0, usize::from);
            let after = offset + 3;
            let target = if op == OpCode::Loop {
                after.checked_sub(jump)
            } else {
                Some(after + jump)
            };
            match target {
                Some(target) => write!(out, "{:<16} {:4} -> {}", name, jump, target)?,
                None => write!(out, "{:<16} {:4} -> ?", name, jump)?,
            }
        }
        _ => write!(out, "{}", name)?,
    }

    Ok(offset + 1 + width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn constant(chunk: &mut Chunk, value: Value, line: u32) {
        let index = chunk.add_constant(value).unwrap();
        chunk.write_op(OpCode::Constant, line);
        chunk.write(index, line);
    }

    #[test]
    fn test_simple_chunk() {
        let mut chunk = Chunk::new();
        constant(&mut chunk, Value::Number(1.2), 123);
        chunk.write_op(OpCode::Negate, 123);
        chunk.write_op(OpCode::Return, 124);

        assert_eq!(
            disassemble_chunk(&chunk, "test chunk"),
            "== test chunk ==\n\
             0000  123 CONSTANT            0 '1.2'\n\
             0002    | NEGATE\n\
             0003  124 RETURN\n"
        );
    }

    #[test]
    fn test_operand_forms() {
        let mut chunk = Chunk::new();
        let name = chunk.add_constant(Value::string("x")).unwrap();
        chunk.write_op(OpCode::GetGlobal, 1);
        chunk.write(name, 1);
        chunk.write_op(OpCode::SetLocal, 2);
        chunk.write(3, 2);
        chunk.write_op(OpCode::Call, 2);
        chunk.write(0, 2);

        assert_eq!(
            disassemble_chunk(&chunk, "ops"),
            "== ops ==\n\
             0000    1 GET_GLOBAL          0 'x'\n\
             0002    2 SET_LOCAL           3\n\
             0004    | CALL                0\n"
        );
    }

    #[test]
    fn test_jump_targets() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::JumpIfFalse, 1);
        chunk.write(0, 1);
        chunk.write(1, 1);
        chunk.write_op(OpCode::Pop, 1);
        chunk.write_op(OpCode::Loop, 1);
        chunk.write(0, 1);
        chunk.write(7, 1);

        assert_eq!(
            disassemble_chunk(&chunk, "jumps"),
            "== jumps ==\n\
             0000    1 JUMP_IF_FALSE       1 -> 4\n\
             0003    | POP\n\
             0004    | LOOP                7 -> 0\n"
        );
    }

    #[test]
    fn test_unknown_and_truncated() {
        let mut chunk = Chunk::new();
        chunk.write(200, 1);
        chunk.write_op(OpCode::Jump, 1);
        chunk.write(0, 1);

        assert_eq!(
            disassemble_chunk(&chunk, "bad"),
            "== bad ==\n\
             0000    1 Unknown opcode 200\n\
             0001    | JUMP             <truncated>\n"
        );
    }

    #[test]
    fn test_empty_chunk_is_header_only() {
        assert_eq!(disassemble_chunk(&Chunk::new(), "empty"), "== empty ==\n");
    }

    #[test]
    fn test_single_instruction_view() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 7);
        chunk.write_op(OpCode::Return, 7);
        assert_eq!(
            disassemble_instruction(&chunk, 1),
            ("0001    | RETURN".to_string(), 2)
        );
    }

    #[test]
    fn test_program_recurses_into_functions() {
        let mut inner = Function::new(Some("f"));
        inner.chunk.write_op(OpCode::Nil, 1);
        inner.chunk.write_op(OpCode::Return, 1);

        let mut script = Function::new(None);
        constant(
            &mut script.chunk,
            Value::Object(Obj::Function(Rc::new(inner))),
            1,
        );
        script.chunk.write_op(OpCode::Return, 2);

        assert_eq!(
            disassemble_program(&script),
            "== <script> ==\n\
             0000    1 CONSTANT            0 '<fn f>'\n\
             0002    2 RETURN\n\
             \n\
             == f ==\n\
             0000    1 NIL\n\
             0001    | RETURN\n"
        );
    }
}
