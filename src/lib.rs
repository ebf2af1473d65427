//! # loxbc
//!
//! Single-pass compiler and stack-based virtual machine for Lox.
//!
//! Source text is scanned on demand by [`frontend::lexer::Lexer`], compiled
//! straight to bytecode by [`bytecode::compile()`] and executed by
//! [`runtime::Vm`]. Compiled scripts can be stored as images with
//! [`bytecode::image`].

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

pub use bytecode::compile;
pub use runtime::{InterpretError, RuntimeError, Vm, VmConfig};
