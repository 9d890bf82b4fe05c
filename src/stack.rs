/// The operand stack of a Befunge-93 process.
///
/// Values are signed 64-bit integers. Popping an empty stack yields 0
/// instead of failing, which is how the reference interpreter behaves and
/// what many published programs rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    data: Vec<i64>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn push(&mut self, val: i64) {
        self.data.push(val);
    }

    #[inline(always)]
    pub fn pop(&mut self) -> i64 {
        self.data.pop().unwrap_or(0)
    }

    /// Pop twice, returning `(a, b)` where `a` was on top and `b` beneath it.
    ///
    /// Binary operators compute `b op a`.
    #[inline(always)]
    pub fn pop2(&mut self) -> (i64, i64) {
        let a = self.pop();
        let b = self.pop();
        (a, b)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bottom-to-top view of the stack contents.
    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }
}
