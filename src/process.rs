use std::io::{self, BufRead, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, trace, warn};

use crate::error::{ExecError, Fault, RuntimeError};
use crate::opcode::{Direction, Opcode};
use crate::program::Program;
use crate::stack::Stack;

/// Outcome of a single [`Process::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The instruction ran and the program counter moved on.
    Continue,
    /// `@` was reached.
    Terminated,
}

/// What the dispatcher tells the step loop to do next.
enum Flow {
    Next,
    End,
}

/// A running Befunge-93 program.
///
/// Owns a private copy of the grid (so `p` never touches the caller's
/// [`Program`]), the operand stack, the machine registers, a seeded random
/// generator and the three streams it talks to.
pub struct Process<R, W, E> {
    program: Program,
    pc: (usize, usize),
    dir: Direction,
    string_mode: bool,
    stack: Stack,
    done: bool,
    seed: u64,
    rng: SmallRng,
    input: R,
    output: W,
    diag: E,
}

/// Seed derived from the wall clock, used when no fixed seed is configured.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

/// Number of bytes in a UTF-8 sequence starting with `first`.
fn utf8_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl<R, W, E> Process<R, W, E> {
    /// Start a new process at (0, 0) moving right with an empty stack.
    pub fn new(program: &Program, input: R, output: W, diag: E) -> Self {
        let seed = match program.options().rand_seed {
            0 => clock_seed(),
            s => s,
        };
        debug!(
            seed,
            width = program.width(),
            height = program.height(),
            "process created"
        );
        Self {
            program: program.clone(),
            pc: (0, 0),
            dir: Direction::Right,
            string_mode: false,
            stack: Stack::new(),
            done: false,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            input,
            output,
            diag,
        }
    }

    /// Copy the complete machine state into a new process bound to other
    /// streams. Grid, stack and random generator are deep copies.
    pub fn fork<R2, W2, E2>(&self, input: R2, output: W2, diag: E2) -> Process<R2, W2, E2> {
        Process {
            program: self.program.clone(),
            pc: self.pc,
            dir: self.dir,
            string_mode: self.string_mode,
            stack: self.stack.clone(),
            done: self.done,
            seed: self.seed,
            rng: self.rng.clone(),
            input,
            output,
            diag,
        }
    }

    /// Current program counter as (x, y).
    pub fn pc(&self) -> (usize, usize) {
        self.pc
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    pub fn string_mode(&self) -> bool {
        self.string_mode
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The process's own copy of the grid, including any `p` writes.
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The seed the random generator was started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Move the program counter one cell, wrapping around the grid edges.
    fn advance(&mut self) {
        let (dx, dy) = self.dir.delta();
        let w = self.program.width() as isize;
        let h = self.program.height() as isize;
        self.pc.0 = (self.pc.0 as isize + dx).rem_euclid(w) as usize;
        self.pc.1 = (self.pc.1 as isize + dy).rem_euclid(h) as usize;
    }

    fn runtime_error(&self, cause: Fault) -> Box<RuntimeError> {
        Box::new(RuntimeError {
            message: cause.to_string(),
            x: self.pc.0,
            y: self.pc.1,
            program: self.program.clone(),
            cause,
        })
    }

    /// Convert a stack value into a grid/output character. Without unicode
    /// only the low 8 bits are kept.
    fn to_char(&self, val: i64) -> Result<char, Fault> {
        if self.program.options().allow_unicode {
            u32::try_from(val)
                .ok()
                .and_then(char::from_u32)
                .ok_or(Fault::InvalidCodePoint(val))
        } else {
            Ok(char::from(val as u8))
        }
    }

    /// Apply the I/O error policy: fatal errors become faults, everything
    /// else is logged and dropped.
    fn io_policy(&self, result: io::Result<()>) -> Result<(), Fault> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if !self.program.options().terminate_on_io_err => {
                warn!(error = %e, "ignoring i/o error");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WriteZero => Err(Fault::WroteNothing),
            Err(e) => Err(Fault::Io(e)),
        }
    }
}

impl<R: BufRead, W: Write, E: Write> Process<R, W, E> {
    /// Run the program until `@` or a fault.
    ///
    /// May be called once; later calls return
    /// [`ExecError::AlreadyExecuted`] without doing anything.
    pub fn exec(&mut self) -> Result<(), ExecError> {
        if self.done {
            return Err(ExecError::AlreadyExecuted);
        }
        loop {
            if self.step()? == Step::Terminated {
                return Ok(());
            }
        }
    }

    /// Execute exactly one instruction.
    ///
    /// Embedders that need to bound run time can drive the process with
    /// this instead of [`exec`](Self::exec).
    pub fn step(&mut self) -> Result<Step, ExecError> {
        if self.done {
            return Err(ExecError::AlreadyExecuted);
        }

        let c = self.program.cell(self.pc.0, self.pc.1);
        let flow = if self.string_mode && c != '"' {
            self.stack.push(c as i64);
            Ok(Flow::Next)
        } else {
            let op = Opcode::decode(c);
            trace!(x = self.pc.0, y = self.pc.1, ?op, "dispatch");
            self.dispatch(op)
        };

        match flow {
            Ok(Flow::Next) => {
                self.advance();
                Ok(Step::Continue)
            }
            Ok(Flow::End) => {
                self.done = true;
                debug!(x = self.pc.0, y = self.pc.1, "terminated");
                Ok(Step::Terminated)
            }
            Err(cause) => {
                self.done = true;
                if let Err(e) = self.output.flush() {
                    warn!(error = %e, "output flush after fault failed");
                }
                debug!(x = self.pc.0, y = self.pc.1, %cause, "fault");
                Err(ExecError::Runtime(self.runtime_error(cause)))
            }
        }
    }

    fn dispatch(&mut self, op: Opcode) -> Result<Flow, Fault> {
        let opts = *self.program.options();
        match op {
            Opcode::Digit(d) => self.stack.push(d as i64),
            Opcode::Add => {
                let (a, b) = self.stack.pop2();
                self.stack.push(b.wrapping_add(a));
            }
            Opcode::Sub => {
                let (a, b) = self.stack.pop2();
                self.stack.push(b.wrapping_sub(a));
            }
            Opcode::Mul => {
                let (a, b) = self.stack.pop2();
                self.stack.push(b.wrapping_mul(a));
            }
            Opcode::Div => {
                let (a, b) = self.stack.pop2();
                if a != 0 {
                    self.stack.push(b.wrapping_div(a));
                } else if opts.disallow_div_zero {
                    return Err(Fault::DivisionByZero { op: '/', dividend: b });
                } else {
                    let val = self.ask_division_result(b)?;
                    self.stack.push(val);
                }
            }
            Opcode::Mod => {
                let (a, b) = self.stack.pop2();
                // No reference behavior to fall back on here.
                if a == 0 {
                    return Err(Fault::DivisionByZero { op: '%', dividend: b });
                }
                self.stack.push(b.wrapping_rem(a));
            }
            Opcode::Not => {
                let a = self.stack.pop();
                self.stack.push((a == 0) as i64);
            }
            Opcode::Greater => {
                let (a, b) = self.stack.pop2();
                self.stack.push((b > a) as i64);
            }
            Opcode::Right => self.dir = Direction::Right,
            Opcode::Left => self.dir = Direction::Left,
            Opcode::Up => self.dir = Direction::Up,
            Opcode::Down => self.dir = Direction::Down,
            Opcode::Random => self.dir = self.rng.r#gen(),
            Opcode::HorizontalIf => {
                self.dir = if self.stack.pop() == 0 {
                    Direction::Right
                } else {
                    Direction::Left
                };
            }
            Opcode::VerticalIf => {
                self.dir = if self.stack.pop() == 0 {
                    Direction::Down
                } else {
                    Direction::Up
                };
            }
            Opcode::StringMode => self.string_mode = !self.string_mode,
            Opcode::Dup => {
                let a = self.stack.pop();
                self.stack.push(a);
                self.stack.push(a);
            }
            Opcode::Swap => {
                let (a, b) = self.stack.pop2();
                self.stack.push(a);
                self.stack.push(b);
            }
            Opcode::Discard => {
                self.stack.pop();
            }
            Opcode::OutputInt => {
                let a = self.stack.pop();
                let text = format!("{a} ");
                self.write_output(text.as_bytes())?;
            }
            Opcode::OutputChar => {
                let a = self.stack.pop();
                if opts.allow_unicode {
                    let c = self.to_char(a)?;
                    let mut buf = [0u8; 4];
                    self.write_output(c.encode_utf8(&mut buf).as_bytes())?;
                } else {
                    self.write_output(&[a as u8])?;
                }
            }
            Opcode::Bridge => self.advance(),
            Opcode::Put => {
                let (y, x) = self.stack.pop2();
                let v = self.stack.pop();
                match self.program.locate(x, y) {
                    Some((cx, cy)) => {
                        let c = self.to_char(v)?;
                        self.program.set(cx, cy, c);
                    }
                    None if opts.terminate_on_put_get_out_of_bounds => {
                        return Err(Fault::OutOfBounds { x, y });
                    }
                    None => trace!(x, y, v, "discarding out-of-bounds put"),
                }
            }
            Opcode::Get => {
                let (y, x) = self.stack.pop2();
                let val = match self.program.locate(x, y) {
                    Some((cx, cy)) => {
                        let c = self.program.cell(cx, cy) as i64;
                        if opts.allow_unicode { c } else { c & 0xFF }
                    }
                    None if opts.terminate_on_put_get_out_of_bounds => {
                        return Err(Fault::OutOfBounds { x, y });
                    }
                    None => 0,
                };
                self.stack.push(val);
            }
            Opcode::InputInt => {
                let val = match self.read_int() {
                    Ok(v) => v,
                    Err(fault) if opts.terminate_on_io_err => return Err(fault),
                    Err(fault) => {
                        warn!(%fault, "integer input failed");
                        if opts.read_error_undefined {
                            self.rng.r#gen::<i64>()
                        } else {
                            -1
                        }
                    }
                };
                self.stack.push(val);
            }
            Opcode::InputChar => {
                let val = match self.read_char() {
                    Ok(v) => v,
                    Err(fault) if opts.terminate_on_io_err => return Err(fault),
                    Err(fault) => {
                        warn!(%fault, "character input failed");
                        -1
                    }
                };
                self.stack.push(val);
            }
            Opcode::End => {
                let flushed = self.output.flush();
                self.io_policy(flushed)?;
                return Ok(Flow::End);
            }
            Opcode::Nop => {}
            Opcode::Unknown(c) => {
                if !opts.ignore_unsupported_instructions {
                    return Err(Fault::UnknownOpcode(c));
                }
            }
        }
        Ok(Flow::Next)
    }

    fn write_output(&mut self, bytes: &[u8]) -> Result<(), Fault> {
        let written = self.output.write_all(bytes);
        self.io_policy(written)
    }

    /// Prompt on the diagnostic stream for the result of `dividend / 0`.
    ///
    /// A failed read yields 0 unless I/O errors are fatal.
    fn ask_division_result(&mut self, dividend: i64) -> Result<i64, Fault> {
        let prompted = writeln!(self.diag, "What do you want {dividend}/0 to be?")
            .and_then(|()| self.diag.flush());
        self.io_policy(prompted)?;

        match self.read_int() {
            Ok(v) => Ok(v),
            Err(fault) if self.program.options().terminate_on_io_err => Err(fault),
            Err(fault) => {
                warn!(%fault, "division prompt input failed");
                Ok(0)
            }
        }
    }

    /// Pending output must be visible before blocking on input.
    fn flush_before_read(&mut self) -> Result<(), Fault> {
        let flushed = self.output.flush();
        self.io_policy(flushed)
    }

    /// Read one line and parse it as a base-10 integer.
    fn read_int(&mut self) -> Result<i64, Fault> {
        self.flush_before_read()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Fault::UnexpectedEof);
        }
        Ok(line.trim().parse::<i64>()?)
    }

    fn read_byte(&mut self) -> Result<u8, Fault> {
        let mut byte = [0u8];
        match self.input.read_exact(&mut byte) {
            Ok(()) => Ok(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Fault::UnexpectedEof),
            Err(e) => Err(Fault::Io(e)),
        }
    }

    /// Read one byte, or one UTF-8 encoded code point when unicode is allowed.
    fn read_char(&mut self) -> Result<i64, Fault> {
        self.flush_before_read()?;
        let first = self.read_byte()?;
        if !self.program.options().allow_unicode {
            return Ok(first as i64);
        }

        let len = utf8_len(first).ok_or(Fault::InvalidUtf8)?;
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            *slot = self.read_byte()?;
        }
        std::str::from_utf8(&buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .map(|c| c as i64)
            .ok_or(Fault::InvalidUtf8)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::options::Options;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn string_round_trips_through_output(text in "[ !#-~]{1,38}") {
            let reversed: String = text.chars().rev().collect();
            let code = format!("\"{reversed}\"{}@", ",".repeat(text.len()));
            let prog = Program::build(&code, Options::default()).unwrap();
            let mut out = Vec::new();
            Process::new(&prog, io::empty(), &mut out, io::sink()).exec().unwrap();
            prop_assert_eq!(out, text.into_bytes());
        }

        #[test]
        fn put_then_get_reads_back(
            v in 0i64..0xD800,
            x in 0i64..80,
            y in 1i64..25,
            allow_unicode in any::<bool>(),
        ) {
            let opts = Options { allow_unicode, ..Default::default() };
            let prog = Program::build("&&&p&&g.@", opts).unwrap();
            let input = format!("{v}\n{x}\n{y}\n{x}\n{y}\n");
            let mut out = Vec::new();
            Process::new(&prog, input.as_bytes(), &mut out, io::sink()).exec().unwrap();
            let expected = if allow_unicode { v } else { v & 0xFF };
            prop_assert_eq!(String::from_utf8(out).unwrap(), format!("{expected} "));
        }

        #[test]
        fn random_programs_never_panic(
            rows in prop::collection::vec("[ -~]{0,16}", 1..8),
            input in "[ -~\n]{0,16}",
        ) {
            let opts = Options { rand_seed: 1, ..Default::default() };
            let prog = Program::build(&rows.join("\n"), opts).unwrap();
            let mut proc = Process::new(&prog, input.as_bytes(), io::sink(), io::sink());
            for _ in 0..2000 {
                match proc.step() {
                    Ok(Step::Continue) => {}
                    Ok(Step::Terminated) | Err(_) => break,
                }
            }
            let (x, y) = proc.pc();
            prop_assert!(x < prog.width() && y < prog.height());
        }
    }
}
