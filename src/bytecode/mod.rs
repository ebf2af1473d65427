pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod image;
pub mod op;
pub mod verify;

pub use chunk::Chunk;
pub use compile::compile;
pub use op::OpCode;
