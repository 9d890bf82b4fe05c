use rand::Rng;
use rand::distributions::{Distribution, Standard};

/// Direction of travel of the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    /// Unit step `(dx, dy)` for this direction. y grows downwards.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
        }
    }
}

impl Distribution<Direction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        match rng.gen_range(0..4u8) {
            0 => Direction::Right,
            1 => Direction::Down,
            2 => Direction::Left,
            _ => Direction::Up,
        }
    }
}

/// A decoded Befunge-93 instruction.
///
/// See the command summary in the Befunge-93 documentation. Binary
/// operators pop `a` (top) then `b` and push `b op a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `0`-`9`: push the digit value.
    Digit(u8),
    /// `+`: push a+b.
    Add,
    /// `-`: push b-a.
    Sub,
    /// `*`: push a*b.
    Mul,
    /// `/`: push b/a, rounded towards zero.
    Div,
    /// `%`: push b%a.
    Mod,
    /// `!`: push 1 if the popped value is zero, else 0.
    Not,
    /// `` ` ``: push 1 if b>a, else 0.
    Greater,
    /// `>`
    Right,
    /// `<`
    Left,
    /// `^`
    Up,
    /// `v`
    Down,
    /// `?`: move in a random cardinal direction.
    Random,
    /// `_`: pop; right if zero, left otherwise.
    HorizontalIf,
    /// `|`: pop; down if zero, up otherwise.
    VerticalIf,
    /// `"`: toggle string mode.
    StringMode,
    /// `:`
    Dup,
    /// `\`
    Swap,
    /// `$`
    Discard,
    /// `.`: pop and print as a decimal integer followed by a space.
    OutputInt,
    /// `,`: pop and print as a character.
    OutputChar,
    /// `#`: skip the next cell.
    Bridge,
    /// `p`: pop y, x, v and store v at (x, y).
    Put,
    /// `g`: pop y, x and push the value at (x, y).
    Get,
    /// `&`: read an integer.
    InputInt,
    /// `~`: read a character.
    InputChar,
    /// `@`
    End,
    /// Space.
    Nop,
    Unknown(char),
}

impl Opcode {
    pub fn decode(c: char) -> Self {
        match c {
            '0'..='9' => Opcode::Digit(c as u8 - b'0'),
            '+' => Opcode::Add,
            '-' => Opcode::Sub,
            '*' => Opcode::Mul,
            '/' => Opcode::Div,
            '%' => Opcode::Mod,
            '!' => Opcode::Not,
            '`' => Opcode::Greater,
            '>' => Opcode::Right,
            '<' => Opcode::Left,
            '^' => Opcode::Up,
            'v' => Opcode::Down,
            '?' => Opcode::Random,
            '_' => Opcode::HorizontalIf,
            '|' => Opcode::VerticalIf,
            '"' => Opcode::StringMode,
            ':' => Opcode::Dup,
            '\\' => Opcode::Swap,
            '$' => Opcode::Discard,
            '.' => Opcode::OutputInt,
            ',' => Opcode::OutputChar,
            '#' => Opcode::Bridge,
            'p' => Opcode::Put,
            'g' => Opcode::Get,
            '&' => Opcode::InputInt,
            '~' => Opcode::InputChar,
            '@' => Opcode::End,
            ' ' => Opcode::Nop,
            other => Opcode::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_decode_digits() {
        for (i, c) in ('0'..='9').enumerate() {
            assert_eq!(Opcode::decode(c), Opcode::Digit(i as u8));
        }
    }

    #[test]
    fn test_decode_non_ascii_digit_is_unknown() {
        // Arabic-Indic digit zero
        assert_eq!(Opcode::decode('\u{0660}'), Opcode::Unknown('\u{0660}'));
    }

    #[test]
    fn test_decode_backslash_and_backtick() {
        assert_eq!(Opcode::decode('\\'), Opcode::Swap);
        assert_eq!(Opcode::decode('`'), Opcode::Greater);
        assert_eq!(Opcode::decode('x'), Opcode::Unknown('x'));
    }

    #[test]
    fn test_random_direction_covers_all() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let d: Direction = rng.r#gen();
            let idx = match d {
                Direction::Right => 0,
                Direction::Down => 1,
                Direction::Left => 2,
                Direction::Up => 3,
            };
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
