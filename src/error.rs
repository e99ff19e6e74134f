use std::{fmt, path::PathBuf};

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lex,
    Parse,
    Codegen,
    Emit,
    Link,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lex => write!(f, "lex"),
            Phase::Parse => write!(f, "parse"),
            Phase::Codegen => write!(f, "codegen"),
            Phase::Emit => write!(f, "emit"),
            Phase::Link => write!(f, "link"),
        }
    }
}

/// Every compile-time failure. The first one aborts compilation.
///
/// Division by zero is not in here: the grammar cannot rule it out statically
/// and it only surfaces when the produced executable runs.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("illegal character '{ch}' at position {position}")]
    Lex { ch: char, position: usize },
    #[error("integer literal `{literal}` at position {position} does not fit in 32 bits")]
    NumberOverflow { position: usize, literal: String },
    #[error("syntax error at position {position}: found {found}, expected {expected}")]
    Syntax {
        found: String,
        position: usize,
        expected: String,
    },
    #[error("invalid IR: {0}")]
    Codegen(String),
    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),
    #[error("failed to write object file {}: {message}", .path.display())]
    ObjectWrite { path: PathBuf, message: String },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no system linker found on PATH (tried cc, gcc, clang)")]
    LinkerNotFound,
    #[error("{linker} exited with {}{}", describe_status(.status), stderr_suffix(.stderr))]
    LinkError {
        linker: String,
        status: Option<i32>,
        stderr: String,
    },
}

impl CompileError {
    /// Short classification used for logging and CLI output.
    pub fn phase(&self) -> Phase {
        match self {
            CompileError::Lex { .. } | CompileError::NumberOverflow { .. } => Phase::Lex,
            CompileError::Syntax { .. } => Phase::Parse,
            CompileError::Codegen(_) => Phase::Codegen,
            CompileError::UnsupportedTarget(_)
            | CompileError::ObjectWrite { .. }
            | CompileError::Io { .. } => Phase::Emit,
            CompileError::LinkerNotFound | CompileError::LinkError { .. } => Phase::Link,
        }
    }

    /// Byte offset into the source, for front-end errors.
    pub fn position(&self) -> Option<usize> {
        match self {
            CompileError::Lex { position, .. }
            | CompileError::NumberOverflow { position, .. }
            | CompileError::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Render the error with the line holding the offending byte and a caret under it.
    pub fn render(&self, source: &str) -> String {
        let Some(position) = self.position() else {
            return self.to_string();
        };
        let position = position.min(source.len());
        let start = source[..position].rfind('\n').map_or(0, |i| i + 1);
        let end = source[position..].find('\n').map_or(source.len(), |i| position + i);
        let line = source[start..end].trim_end_matches('\r');
        let column = source[start..position].chars().count();
        format!("{line}\n{}^ {self}", " ".repeat(column))
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match *status {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
