use core::fmt::{self, Display};

use configuration::Word;

/// The two most recent values of the Fibonacci recurrence.
///
/// Every operation wraps modulo 2^32; overflow is part of the sequence, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecurrenceState {
    pub a: Word,
    pub b: Word,
}

impl RecurrenceState {
    /// State at the start of every outer iteration.
    pub const INITIAL: RecurrenceState = RecurrenceState { a: 0, b: 1 };

    pub const fn new() -> Self {
        Self::INITIAL
    }

    /// Performs one inner iteration and returns the freshly computed `c`.
    #[inline(always)]
    pub fn step(&mut self) -> Word {
        let c = self.a.wrapping_add(self.b);
        self.a = self.b;
        self.b = c;
        c
    }

    #[inline]
    pub fn advance(&mut self, steps: u32) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Returns the state reached after `k` steps from [`Self::INITIAL`],
    /// i.e. `(Fib(k), Fib(k + 1))` modulo 2^32.
    ///
    /// Uses fast doubling, so it costs O(log k) multiplications instead of
    /// `k` additions:
    ///
    /// ```text
    /// Fib(2n)     = Fib(n) * (2 * Fib(n + 1) - Fib(n))
    /// Fib(2n + 1) = Fib(n)^2 + Fib(n + 1)^2
    /// ```
    ///
    /// Both identities hold in the wrapping ring, so the result matches what
    /// stepping would produce.
    pub const fn after(k: u64) -> Self {
        let mut f: Word = 0;
        let mut g: Word = 1;

        let mut bit = u64::BITS - k.leading_zeros();
        while bit > 0 {
            bit -= 1;
            let even = f.wrapping_mul(g.wrapping_mul(2).wrapping_sub(f));
            let odd = f.wrapping_mul(f).wrapping_add(g.wrapping_mul(g));
            if (k >> bit) & 1 == 1 {
                f = odd;
                g = even.wrapping_add(odd);
            } else {
                f = even;
                g = odd;
            }
        }

        RecurrenceState { a: f, b: g }
    }

    pub const fn is_initial(&self) -> bool {
        self.a == Self::INITIAL.a && self.b == Self::INITIAL.b
    }
}

impl Default for RecurrenceState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Display for RecurrenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(a: 0x{:08x}, b: 0x{:08x})", self.a, self.b)
    }
}
