use std::fmt;

/// One `[line N] in name` entry of a runtime backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub line: u32,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
    /// Active frames at the point of failure, innermost first.
    pub trace: Vec<TraceFrame>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for frame in &self.trace {
            write!(f, "\n[line {}] in {}", frame.line, frame.function)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
            trace: Vec::new(),
        }
    }

    /// Appends an outer frame to the backtrace.
    pub fn with_frame(mut self, line: u32, function: impl Into<String>) -> Self {
        self.trace.push(TraceFrame {
            line,
            function: function.into(),
        });
        self
    }
}
