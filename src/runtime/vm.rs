use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::{Level, debug, log_enabled, trace, warn};
use thiserror::Error;

use crate::{
    bytecode::{
        compile::compile, compile_error::CompileErrors, disasm::disassemble_instruction,
        op::OpCode,
    },
    lang::{
        object::{Function, Native, NativeFn, Obj},
        value::Value,
    },
    runtime::{globals::Globals, natives, runtime_error::RuntimeError},
};

/// Execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Deepest call nesting, counting the script frame.
    pub max_frames: usize,
    /// Instruction budget per `run`; `None` means unbounded.
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_frames: 64,
            max_steps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileErrors),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

struct CallFrame {
    function: Rc<Function>,
    ip: usize,
    /// Stack index of the callee; locals are addressed from here.
    slots: usize,
}

/// Stack-based bytecode interpreter.
///
/// Program output and diagnostics are written to `out`. Globals survive
/// across `interpret` calls; the value and frame stacks are reset after
/// every run.
pub struct Vm<W: Write> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Globals,
    config: VmConfig,
    steps: usize,
    out: W,
}

impl<W: Write> Vm<W> {
    pub fn new(out: W) -> Self {
        Self::with_config(out, VmConfig::default())
    }

    pub fn with_config(out: W, config: VmConfig) -> Self {
        let mut vm = Vm {
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(config.max_frames),
            globals: Globals::new(),
            config,
            steps: 0,
            out,
        };
        for (name, function) in natives::STANDARD {
            vm.define_native(name, function);
        }
        vm
    }

    /// Registers a host function as a global.
    pub fn define_native(&mut self, name: &str, function: NativeFn) {
        let native = Native {
            name: name.to_string(),
            function,
        };
        self.globals
            .define(Rc::from(name), Value::Object(Obj::Native(Rc::new(native))));
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Compiles and runs `source`.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = match compile(source) {
            Ok(function) => function,
            Err(errors) => {
                self.report(&errors);
                return Err(errors.into());
            }
        };
        self.run(function)?;
        Ok(())
    }

    /// Runs an already compiled script.
    pub fn run(&mut self, script: Function) -> Result<(), RuntimeError> {
        self.reset();

        let script = Rc::new(script);
        self.push(Value::Object(Obj::Function(Rc::clone(&script))));
        let result = self.call_function(script, 0).and_then(|()| self.execute());

        if let Err(err) = &result {
            debug!("runtime error: {}", err.message);
            self.report(err);
            self.reset();
        }
        result
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.steps = 0;
    }

    fn report(&mut self, diagnostic: &dyn fmt::Display) {
        if let Err(e) = writeln!(self.out, "{}", diagnostic) {
            warn!("failed to write diagnostic: {}", e);
        }
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    /// Builds a runtime error carrying a backtrace of the active frames.
    fn runtime_error(&self, message: impl Into<String>) -> RuntimeError {
        self.frames
            .iter()
            .rev()
            .fold(RuntimeError::new(message), |err, frame| {
                let line = frame
                    .function
                    .chunk
                    .line(frame.ip.saturating_sub(1))
                    .unwrap_or(0);
                err.with_frame(line, frame.function.frame_name())
            })
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(self.runtime_error(format!(
                    "Execution step limit exceeded ({}).",
                    max
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // STACK
    // =========================================================================

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.runtime_error("Stack underflow.")),
        }
    }

    fn peek(&self, distance: usize) -> Result<&Value, RuntimeError> {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .and_then(|index| self.stack.get(index))
            .ok_or_else(|| self.runtime_error("Stack underflow."))
    }

    fn pop_numbers(&mut self) -> Result<(f64, f64), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(self.runtime_error("Operands must be numbers.")),
        }
    }

    // =========================================================================
    // DECODING
    // =========================================================================

    fn frame(&self) -> Result<&CallFrame, RuntimeError> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::new("No active call frame."))
    }

    fn frame_mut(&mut self) -> Result<&mut CallFrame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::new("No active call frame."))
    }

    fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        let frame = self.frame_mut()?;
        let byte = frame.function.chunk.code.get(frame.ip).copied();
        frame.ip += 1;
        byte.ok_or_else(|| self.runtime_error("Ran past the end of the chunk."))
    }

    fn read_u16(&mut self) -> Result<usize, RuntimeError> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(usize::from(u16::from_be_bytes([hi, lo])))
    }

    fn read_constant(&mut self) -> Result<Value, RuntimeError> {
        let index = self.read_byte()?;
        let value = self.frame()?.function.chunk.constant(index).cloned();
        value.ok_or_else(|| self.runtime_error(format!("Constant {} out of range.", index)))
    }

    fn read_name(&mut self) -> Result<Rc<str>, RuntimeError> {
        match self.read_constant()? {
            Value::Object(Obj::String(name)) => Ok(name),
            other => Err(self.runtime_error(format!(
                "Expected a variable name but found {}.",
                other.type_name()
            ))),
        }
    }

    fn local_index(&mut self) -> Result<usize, RuntimeError> {
        let slot = usize::from(self.read_byte()?);
        let index = self.frame()?.slots + slot;
        if index >= self.stack.len() {
            return Err(self.runtime_error(format!("Local slot {} out of range.", slot)));
        }
        Ok(index)
    }

    fn trace_instruction(&self) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        let stack: String = self.stack.iter().map(|v| format!("[ {} ]", v)).collect();
        let (instruction, _) = disassemble_instruction(&frame.function.chunk, frame.ip);
        trace!("          {}", stack);
        trace!("{}", instruction);
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), RuntimeError> {
        match callee {
            Value::Object(Obj::Function(function)) => self.call_function(function, arg_count),
            Value::Object(Obj::Native(native)) => self.call_native(&native, arg_count),
            _ => Err(self.runtime_error("Can only call functions.")),
        }
    }

    fn call_function(&mut self, function: Rc<Function>, arg_count: u8) -> Result<(), RuntimeError> {
        if arg_count != function.arity {
            return Err(self.runtime_error(format!(
                "Expected {} arguments but got {}.",
                function.arity, arg_count
            )));
        }
        if self.frames.len() >= self.config.max_frames {
            return Err(self.runtime_error("Stack overflow."));
        }

        let Some(slots) = self.stack.len().checked_sub(usize::from(arg_count) + 1) else {
            return Err(self.runtime_error("Stack underflow."));
        };
        self.frames.push(CallFrame {
            function,
            ip: 0,
            slots,
        });
        Ok(())
    }

    fn call_native(&mut self, native: &Native, arg_count: u8) -> Result<(), RuntimeError> {
        let Some(args_start) = self.stack.len().checked_sub(usize::from(arg_count)) else {
            return Err(self.runtime_error("Stack underflow."));
        };
        let result = (native.function)(&self.stack[args_start..])
            .map_err(|message| self.runtime_error(message))?;

        // drop the arguments and the callee
        self.stack.truncate(args_start.saturating_sub(1));
        self.push(result);
        Ok(())
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    fn execute(&mut self) -> Result<(), RuntimeError> {
        loop {
            self.check_limits()?;
            if log_enabled!(Level::Trace) {
                self.trace_instruction();
            }

            let byte = self.read_byte()?;
            let op = OpCode::try_from(byte)
                .map_err(|byte| self.runtime_error(format!("Unknown opcode {}.", byte)))?;

            match op {
                OpCode::Constant => {
                    let value = self.read_constant()?;
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::GetLocal => {
                    let index = self.local_index()?;
                    let value = self.stack[index].clone();
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let index = self.local_index()?;
                    let value = self.peek(0)?.clone();
                    self.stack[index] = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_name()?;
                    let Some(value) = self.globals.get(&name).cloned() else {
                        return Err(self.runtime_error(format!("Undefined variable '{}'.", name)));
                    };
                    self.push(value);
                }
                OpCode::DefineGlobal => {
                    let name = self.read_name()?;
                    let value = self.pop()?;
                    self.globals.define(name, value);
                }
                OpCode::SetGlobal => {
                    let name = self.read_name()?;
                    let value = self.peek(0)?.clone();
                    if !self.globals.assign(&name, value) {
                        return Err(self.runtime_error(format!("Undefined variable '{}'.", name)));
                    }
                }

                OpCode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::from(a == b));
                }
                OpCode::Greater => {
                    let (a, b) = self.pop_numbers()?;
                    self.push(Value::from(a > b));
                }
                OpCode::Less => {
                    let (a, b) = self.pop_numbers()?;
                    self.push(Value::from(a < b));
                }

                OpCode::Add => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let result = match (&a, &b) {
                        (Value::Number(a), Value::Number(b)) => Value::from(a + b),
                        (Value::Object(Obj::String(a)), Value::Object(Obj::String(b))) => {
                            let mut joined = String::with_capacity(a.len() + b.len());
                            joined.push_str(a);
                            joined.push_str(b);
                            Value::Object(Obj::String(Rc::from(joined)))
                        }
                        _ => {
                            return Err(self.runtime_error(
                                "Operands must be two numbers or two strings.",
                            ));
                        }
                    };
                    self.push(result);
                }
                OpCode::Subtract => {
                    let (a, b) = self.pop_numbers()?;
                    self.push(Value::from(a - b));
                }
                OpCode::Multiply => {
                    let (a, b) = self.pop_numbers()?;
                    self.push(Value::from(a * b));
                }
                OpCode::Divide => {
                    let (a, b) = self.pop_numbers()?;
                    self.push(Value::from(a / b));
                }
                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::from(value.is_falsy()));
                }
                OpCode::Negate => {
                    let Some(n) = self.peek(0)?.as_number() else {
                        return Err(self.runtime_error("Operand must be a number."));
                    };
                    self.pop()?;
                    self.push(Value::from(-n));
                }

                OpCode::Print => {
                    let value = self.pop()?;
                    writeln!(self.out, "{}", value)
                        .map_err(|e| self.runtime_error(format!("Failed to write output: {}.", e)))?;
                }

                OpCode::Jump => {
                    let offset = self.read_u16()?;
                    self.frame_mut()?.ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16()?;
                    if self.peek(0)?.is_falsy() {
                        self.frame_mut()?.ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16()?;
                    let frame = self.frame_mut()?;
                    match frame.ip.checked_sub(offset) {
                        Some(ip) => frame.ip = ip,
                        None => {
                            return Err(self.runtime_error("Loop jumps before the start of the chunk."));
                        }
                    }
                }

                OpCode::Call => {
                    let arg_count = self.read_byte()?;
                    let callee = self.peek(usize::from(arg_count))?.clone();
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Return => {
                    let result = self.pop()?;
                    let Some(frame) = self.frames.pop() else {
                        return Err(RuntimeError::new("No active call frame."));
                    };
                    self.stack.truncate(frame.slots);

                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result);
                }
            }
        }
    }
}
