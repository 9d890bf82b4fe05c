//! A Befunge-93 interpreter.
//!
//! ```
//! use bef93::{Options, Process, Program};
//!
//! let prog = Program::build("12+.@", Options::default()).unwrap();
//! let mut out = Vec::new();
//! Process::new(&prog, std::io::empty(), &mut out, std::io::sink())
//!     .exec()
//!     .unwrap();
//! assert_eq!(out, b"3 ");
//! ```
pub mod error;
pub mod opcode;
pub mod options;
pub mod process;
pub mod program;
pub mod stack;

pub use error::{CompileError, CompileErrorKind, ExecError, Fault, RuntimeError};
pub use options::Options;
pub use process::{Process, Step};
pub use program::Program;
