use crate::error::{CompileError, CompileErrorKind};

/// Standard Befunge-93 playfield width.
pub const STANDARD_WIDTH: usize = 80;
/// Standard Befunge-93 playfield height.
pub const STANDARD_HEIGHT: usize = 25;

/// Behavior switches for building and running a program.
///
/// The first group mirrors the flags of the reference interpreter; the
/// second group is non-standard. The default value of every switch gives
/// standard Befunge-93 behavior.
///
/// Options are copied into a [`Program`](crate::program::Program) when it
/// is built and never change afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// `&` pushes an unspecified (random) value instead of -1 on a read error.
    pub read_error_undefined: bool,
    /// Unknown instructions are no-ops instead of runtime errors.
    pub ignore_unsupported_instructions: bool,

    /// Accept sources larger than 80x25. Smaller sources are still padded
    /// to the standard size.
    pub allow_arbitrary_code_size: bool,
    /// Accept non-ASCII source and treat cell values as Unicode code points.
    pub allow_unicode: bool,
    /// Division by zero is a runtime error instead of prompting for a result.
    pub disallow_div_zero: bool,
    /// Seed for `?` and undefined reads. 0 derives a seed from the clock.
    pub rand_seed: u64,
    /// I/O errors terminate the program instead of being papered over.
    pub terminate_on_io_err: bool,
    /// Out-of-bounds `g`/`p` terminate the program instead of reading 0 or
    /// discarding the write.
    pub terminate_on_put_get_out_of_bounds: bool,

    /// Reference-interpreter line wrapping mode. Not supported.
    pub wrap_long_lines: bool,
    /// Reference-interpreter `#` edge quirk. Not supported.
    pub wrap_hash_inconsistently: bool,
    /// Reference-interpreter off-by-one compatibility mode. Not supported.
    pub no_fix_off_by_one: bool,
}

impl Options {
    /// Reject switches that are recognised but not implemented.
    pub fn validate(&self) -> Result<(), CompileError> {
        let unsupported = [
            ("wrap_long_lines", self.wrap_long_lines),
            ("wrap_hash_inconsistently", self.wrap_hash_inconsistently),
            ("no_fix_off_by_one", self.no_fix_off_by_one),
        ];
        match unsupported.iter().find(|(_, set)| *set) {
            Some(&(name, _)) => Err(CompileError::new(
                CompileErrorKind::UnsupportedOption(name),
                0,
                0,
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standard() {
        let opts = Options::default();
        assert!(!opts.allow_unicode);
        assert!(!opts.allow_arbitrary_code_size);
        assert_eq!(opts.rand_seed, 0);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_unsupported_switch_rejected() {
        let opts = Options {
            wrap_hash_inconsistently: true,
            ..Default::default()
        };
        let err = opts.validate().unwrap_err();
        assert_eq!(
            err.cause,
            CompileErrorKind::UnsupportedOption("wrap_hash_inconsistently")
        );
        assert_eq!((err.x, err.y), (0, 0));
    }
}
