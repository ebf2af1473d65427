//! Compiled image files (`.loxc`).
//!
//! Layout: the 4-byte magic `LXBC`, a big-endian `u16` format version, then
//! the postcard encoding of the top-level script function.

use log::debug;
use thiserror::Error;

use super::verify::{VerifyError, verify};
use crate::lang::object::Function;

pub const MAGIC: [u8; 4] = *b"LXBC";
pub const VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("not a compiled image")]
    BadMagic,
    #[error("unsupported image version {0}")]
    UnsupportedVersion(u16),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("image has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("invalid bytecode in image: {0}")]
    Verify(#[from] VerifyError),
}

/// Serializes a compiled script.
pub fn encode(script: &Function) -> Result<Vec<u8>, ImageError> {
    let body = postcard::to_allocvec(script).map_err(|e| ImageError::Encode(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&VERSION.to_be_bytes());
    bytes.extend_from_slice(&body);

    debug!("encoded image: {} bytes", bytes.len());
    Ok(bytes)
}

/// Loads a compiled script and verifies its bytecode.
pub fn decode(bytes: &[u8]) -> Result<Function, ImageError> {
    if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
        return Err(ImageError::BadMagic);
    }
    let version = u16::from_be_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(ImageError::UnsupportedVersion(version));
    }

    let (script, rest): (Function, &[u8]) = postcard::take_from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    if !rest.is_empty() {
        return Err(ImageError::TrailingBytes(rest.len()));
    }

    verify(&script)?;
    debug!("decoded image: {} bytes", bytes.len());
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::compile;
    use crate::bytecode::disasm::disassemble_program;
    use crate::lang::value::Value;
    use pretty_assertions::assert_eq;

    const PROGRAM: &str = "
        fun greet(name) { return \"hello \" + name; }
        var n = 2.5;
        print greet(\"lox\");
    ";

    #[test]
    fn test_image_preserves_program() {
        let script = compile(PROGRAM).unwrap();
        let bytes = encode(&script).unwrap();
        assert_eq!(&bytes[..4], b"LXBC");
        assert_eq!(&bytes[4..6], &[0, 1]);

        let loaded = decode(&bytes).unwrap();
        assert_eq!(disassemble_program(&loaded), disassemble_program(&script));
    }

    #[test]
    fn test_bad_magic() {
        assert!(matches!(decode(b"NOPE\0\x01"), Err(ImageError::BadMagic)));
        assert!(matches!(decode(b"LX"), Err(ImageError::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode(&compile("print 1;").unwrap()).unwrap();
        bytes[5] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(ImageError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncated_body() {
        let bytes = encode(&compile(PROGRAM).unwrap()).unwrap();
        let cut = &bytes[..bytes.len() / 2];
        assert!(matches!(decode(cut), Err(ImageError::Decode(_))));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode(&compile("print 1;").unwrap()).unwrap();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(ImageError::TrailingBytes(1))));
    }

    #[test]
    fn test_corrupt_bytecode_fails_verification() {
        let mut script = Function::new(None);
        script.chunk.write(0xee, 1);
        script.chunk.add_constant(Value::Nil).unwrap();
        let bytes = encode(&script).unwrap();
        assert!(matches!(decode(&bytes), Err(ImageError::Verify(_))));
    }
}
