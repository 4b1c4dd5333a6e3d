//! Error handling utilities shared across the compiler middle/back-end.

use thiserror::Error;

/// The error taxonomy shared by every stage from SSA construction through
/// assembly emission. Each variant corresponds to one of the error kinds
/// named by the error handling design: malformed IR, an unsupported
/// construct, legalization impossible, a pass precondition going unmet, or
/// an external tool failing.
#[derive(Error, Debug, Clone)]
pub enum SeenError {
    #[error("malformed IR in function '{function}', block '{block}': {message}")]
    MalformedIr {
        function: String,
        block: String,
        message: String,
    },

    #[error("unsupported construct: {message}")]
    Unsupported { message: String },

    #[error("legalization impossible for instruction '{opcode}': {message}")]
    LegalizationImpossible { opcode: String, message: String },

    #[error("pass '{pass}' precondition unmet: {message}")]
    PassPrecondition { pass: String, message: String },

    #[error("external tool '{tool}' failed with status {status}")]
    ExternalTool { tool: String, status: i32 },

    #[error("I/O error: {message}")]
    Io { message: String },
}

/// Result type alias used throughout the compiler crates.
pub type SeenResult<T> = Result<T, SeenError>;

impl SeenError {
    pub fn malformed_ir(
        function: impl Into<String>,
        block: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedIr {
            function: function.into(),
            block: block.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    pub fn legalization_impossible(opcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LegalizationImpossible {
            opcode: opcode.into(),
            message: message.into(),
        }
    }

    pub fn pass_precondition(pass: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PassPrecondition {
            pass: pass.into(),
            message: message.into(),
        }
    }

    pub fn external_tool(tool: impl Into<String>, status: i32) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            status,
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Whether this error kind aborts the current pipeline. A pass
    /// precondition failure is the one non-fatal kind: the offending pass
    /// skips itself and compilation proceeds.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SeenError::PassPrecondition { .. })
    }
}

impl From<std::io::Error> for SeenError {
    fn from(err: std::io::Error) -> Self {
        SeenError::io(err.to_string())
    }
}
