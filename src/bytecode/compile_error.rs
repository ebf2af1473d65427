use std::fmt;

use thiserror::Error;

/// Where in the token stream a compile error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At end of input.
    AtEnd,
    /// At a specific token lexeme.
    At(String),
    /// Scanner errors carry no lexeme.
    Unknown,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::AtEnd => write!(f, " at end"),
            ErrorLocation::At(lexeme) => write!(f, " at '{}'", lexeme),
            ErrorLocation::Unknown => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line} error{location}]: {message}")]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

impl CompileError {
    pub fn new(line: u32, location: ErrorLocation, message: impl Into<String>) -> Self {
        CompileError {
            line,
            location,
            message: message.into(),
        }
    }
}

/// Every error reported by one compile, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn errors(&self) -> &[CompileError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_at_token() {
        let e = CompileError::new(3, ErrorLocation::At("=".into()), "Invalid assignment target.");
        assert_eq!(e.to_string(), "[line 3 error at '=']: Invalid assignment target.");
    }

    #[test]
    fn test_error_at_end() {
        let e = CompileError::new(1, ErrorLocation::AtEnd, "Expect ';' after value.");
        assert_eq!(e.to_string(), "[line 1 error at end]: Expect ';' after value.");
    }

    #[test]
    fn test_scanner_error_has_no_location() {
        let e = CompileError::new(2, ErrorLocation::Unknown, "Unterminated string.");
        assert_eq!(e.to_string(), "[line 2 error]: Unterminated string.");
    }

    #[test]
    fn test_error_list_one_per_line() {
        let errors = CompileErrors(vec![
            CompileError::new(1, ErrorLocation::At("1".into()), "Expect expression."),
            CompileError::new(2, ErrorLocation::AtEnd, "Expect ';' after value."),
        ]);
        assert_eq!(
            errors.to_string(),
            "[line 1 error at '1']: Expect expression.\n[line 2 error at end]: Expect ';' after value."
        );
        assert_eq!(errors.len(), 2);
    }
}
