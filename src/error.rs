use std::io;
use std::num::ParseIntError;

use thiserror::Error;

use crate::program::Program;

/// Why a program could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("non-ASCII content")]
    NotAscii,

    #[error("program too large")]
    TooLarge,

    #[error("unsupported option: {0}")]
    UnsupportedOption(&'static str),
}

/// Error raised while building a [`Program`] from source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compilation error at ({x}, {y}): {message}")]
pub struct CompileError {
    pub message: String,
    /// Column of the offending location.
    pub x: usize,
    /// Row of the offending location.
    pub y: usize,
    #[source]
    pub cause: CompileErrorKind,
}

impl CompileError {
    pub(crate) fn new(cause: CompileErrorKind, x: usize, y: usize) -> Self {
        Self {
            message: cause.to_string(),
            x,
            y,
            cause,
        }
    }
}

fn code_point(c: &char) -> u32 {
    *c as u32
}

/// The underlying cause of a [`RuntimeError`].
#[derive(Debug, Error)]
pub enum Fault {
    #[error("unknown opcode '{0}' ({})", code_point(.0))]
    UnknownOpcode(char),

    /// Raised by `/` (when interactive recovery is disabled) and always by `%`.
    #[error("division by zero: {dividend} {op} 0")]
    DivisionByZero { op: char, dividend: i64 },

    #[error("grid access out of bounds at ({x}, {y})")]
    OutOfBounds { x: i64, y: i64 },

    #[error("value {0} is not a valid character")]
    InvalidCodePoint(i64),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("wrote 0 bytes")]
    WroteNothing,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid integer input: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("input is not valid UTF-8")]
    InvalidUtf8,
}

/// A fault raised during execution, with the location of the faulting
/// instruction and a snapshot of the grid at that moment.
#[derive(Debug, Error)]
#[error("runtime error at ({x}, {y}): {message}")]
pub struct RuntimeError {
    pub message: String,
    pub x: usize,
    pub y: usize,
    /// Deep copy of the program taken when the fault occurred.
    pub program: Program,
    #[source]
    pub cause: Fault,
}

/// Error returned by [`Process::exec`](crate::process::Process::exec) and
/// [`Process::step`](crate::process::Process::step).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("process already executed")]
    AlreadyExecuted,

    #[error(transparent)]
    Runtime(#[from] Box<RuntimeError>),
}

impl ExecError {
    /// The fault behind a runtime error, if this is one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ExecError::AlreadyExecuted => None,
            ExecError::Runtime(e) => Some(&e.cause),
        }
    }
}
