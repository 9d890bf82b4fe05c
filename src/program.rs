use std::fmt;

use crate::error::{CompileError, CompileErrorKind};
use crate::options::{Options, STANDARD_HEIGHT, STANDARD_WIDTH};

/// A Befunge-93 playfield: a rectangular grid of characters.
///
/// The grid never changes size after it is built. Individual cells may be
/// overwritten by a running process (`p`), which works on its own copy.
/// Cells are stored row-major, indexed by `y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    cells: Vec<char>,
    width: usize,
    height: usize,
    options: Options,
}

impl Program {
    /// Build a program from source text.
    ///
    /// Rows are separated by `\n`. Short rows are padded with spaces and the
    /// grid is padded to at least 80x25.
    pub fn build(source: &str, options: Options) -> Result<Self, CompileError> {
        options.validate()?;

        let body = source.strip_suffix('\n').unwrap_or(source);
        let lines: Vec<&str> = body
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();

        if !options.allow_unicode {
            for (y, line) in lines.iter().enumerate() {
                if let Some(x) = line.chars().position(|c| !c.is_ascii()) {
                    return Err(CompileError::new(CompileErrorKind::NotAscii, x, y));
                }
            }
        }

        let src_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let src_height = lines.len();

        if !options.allow_arbitrary_code_size
            && (src_width > STANDARD_WIDTH || src_height > STANDARD_HEIGHT)
        {
            return Err(CompileError::new(
                CompileErrorKind::TooLarge,
                src_width,
                src_height,
            ));
        }

        let width = src_width.max(STANDARD_WIDTH);
        let height = src_height.max(STANDARD_HEIGHT);

        let mut cells = vec![' '; width * height];
        for (y, line) in lines.iter().enumerate() {
            for (x, c) in line.chars().enumerate() {
                cells[y * width + x] = c;
            }
        }

        Ok(Self {
            cells,
            width,
            height,
            options,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The options this program was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Cell at (x, y), or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<char> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    /// Overwrite the cell at (x, y). Returns false (and does nothing) when
    /// (x, y) lies outside the grid.
    pub fn set(&mut self, x: usize, y: usize, c: char) -> bool {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = c;
            true
        } else {
            false
        }
    }

    /// Map signed coordinates to a cell position if they are inside the grid.
    pub(crate) fn locate(&self, x: i64, y: i64) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.width && y < self.height).then_some((x, y))
    }

    #[inline(always)]
    pub(crate) fn cell(&self, x: usize, y: usize) -> char {
        self.cells[y * self.width + x]
    }

    /// One row of the grid as a string.
    pub fn row(&self, y: usize) -> Option<String> {
        (y < self.height).then(|| {
            self.cells[y * self.width..(y + 1) * self.width]
                .iter()
                .collect()
        })
    }
}

/// Renders the grid with column rulers on top and row numbers on the left.
/// Rows are printed verbatim, padding included.
///
/// ```text
///    0         1
///    0123456789012345...
///  0 >12+.@
///  1
/// ```
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gutter = (self.height - 1).to_string().len();
        let pad = " ".repeat(gutter + 1);

        let tens: String = (0..self.width)
            .map(|x| {
                if x % 10 == 0 {
                    char::from(b'0' + ((x / 10) % 10) as u8)
                } else {
                    ' '
                }
            })
            .collect();
        let units: String = (0..self.width)
            .map(|x| char::from(b'0' + (x % 10) as u8))
            .collect();
        writeln!(f, "{pad}{}", tens.trim_end())?;
        writeln!(f, "{pad}{units}")?;

        for y in 0..self.height {
            let row = self.row(y).unwrap_or_default();
            writeln!(f, "{y:>gutter$} {row}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = ">              v
v  ,,,,,\"Hello\"<
>48*,          v
v,,,,,,\"World!\"<
>25*,@
";

    #[test]
    fn test_build_pads_to_standard_size() {
        let prog = Program::build(HELLO, Options::default()).unwrap();
        assert_eq!(prog.width(), STANDARD_WIDTH);
        assert_eq!(prog.height(), STANDARD_HEIGHT);
        assert_eq!(prog.get(0, 0), Some('>'));
        assert_eq!(prog.get(15, 0), Some('v'));
        assert_eq!(prog.get(16, 0), Some(' '));
        assert_eq!(prog.get(79, 24), Some(' '));
        assert_eq!(prog.get(80, 0), None);
        assert_eq!(prog.get(0, 25), None);
    }

    #[test]
    fn test_build_rejects_unicode_by_default() {
        let src = "v,,,,,,\"Wörld!\"<";
        let err = Program::build(src, Options::default()).unwrap_err();
        assert_eq!(err.cause, CompileErrorKind::NotAscii);
        assert_eq!((err.x, err.y), (9, 0));

        let opts = Options {
            allow_unicode: true,
            ..Default::default()
        };
        let prog = Program::build(src, opts).unwrap();
        assert_eq!(prog.get(9, 0), Some('ö'));
        assert_eq!(prog.get(10, 0), Some('r'));
    }

    #[test]
    fn test_build_non_ascii_location_on_later_row() {
        let src = "@\n  12\n ä";
        let err = Program::build(src, Options::default()).unwrap_err();
        assert_eq!((err.x, err.y), (1, 2));
    }

    #[test]
    fn test_build_too_large() {
        let mut src = String::from(HELLO);
        src.push_str(&" ".repeat(119));
        src.push_str("#\n");
        for _ in 0..24 {
            src.push('\n');
        }
        src.push_str("#\n");

        let err = Program::build(&src, Options::default()).unwrap_err();
        assert_eq!(err.cause, CompileErrorKind::TooLarge);
        assert_eq!((err.x, err.y), (120, 31));

        let opts = Options {
            allow_arbitrary_code_size: true,
            ..Default::default()
        };
        let prog = Program::build(&src, opts).unwrap();
        assert_eq!(prog.width(), 120);
        assert_eq!(prog.height(), 31);
        assert_eq!(prog.get(119, 5), Some('#'));
        assert_eq!(prog.get(0, 30), Some('#'));
    }

    #[test]
    fn test_build_full_standard_size_with_trailing_newline() {
        let row = "v".repeat(80);
        let src = vec![row.as_str(); 25].join("\n") + "\n";
        let prog = Program::build(&src, Options::default()).unwrap();
        assert_eq!(prog.height(), 25);
    }

    #[test]
    fn test_build_strips_carriage_returns() {
        let prog = Program::build("12+.@\r\n@\r\n", Options::default()).unwrap();
        assert_eq!(prog.row(0).unwrap().trim_end(), "12+.@");
        assert_eq!(prog.get(1, 1), Some(' '));
    }

    #[test]
    fn test_build_empty_source() {
        let prog = Program::build("", Options::default()).unwrap();
        assert_eq!((prog.width(), prog.height()), (80, 25));
        assert!(prog.row(0).unwrap().chars().all(|c| c == ' '));
    }

    #[test]
    fn test_build_unsupported_option() {
        let opts = Options {
            wrap_long_lines: true,
            ..Default::default()
        };
        let err = Program::build("@", opts).unwrap_err();
        assert_eq!(err.cause, CompileErrorKind::UnsupportedOption("wrap_long_lines"));
    }

    #[test]
    fn test_set_out_of_bounds_is_rejected() {
        let mut prog = Program::build("@", Options::default()).unwrap();
        assert!(prog.set(3, 4, 'x'));
        assert_eq!(prog.get(3, 4), Some('x'));
        assert!(!prog.set(80, 0, 'x'));
        assert_eq!(prog.width(), 80);
    }

    #[test]
    fn test_locate() {
        let prog = Program::build("@", Options::default()).unwrap();
        assert_eq!(prog.locate(0, 0), Some((0, 0)));
        assert_eq!(prog.locate(79, 24), Some((79, 24)));
        assert_eq!(prog.locate(-1, 0), None);
        assert_eq!(prog.locate(0, 25), None);
    }

    #[test]
    fn test_display_rulers() {
        let prog = Program::build("12+.@", Options::default()).unwrap();
        let text = prog.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 + 25);
        assert!(lines[0].starts_with("   0         1         2"));
        assert!(lines[1].starts_with("   0123456789012345678901234567890"));
        assert_eq!(lines[2], format!(" 0 12+.@{}", " ".repeat(75)));
        assert_eq!(lines[26], format!("24 {}", " ".repeat(80)));
        assert!(lines[2..].iter().all(|l| l.len() == 3 + 80));
    }

    #[test]
    fn test_display_keeps_self_modified_cells() {
        let mut prog = Program::build("@", Options::default()).unwrap();
        prog.set(79, 1, '#');
        let text = prog.to_string();
        let row = text.lines().nth(3).unwrap();
        assert!(row.ends_with('#'));
        assert_eq!(row, format!(" 1 {}#", " ".repeat(79)));
    }
}
