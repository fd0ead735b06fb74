use core::hint::black_box;
use core::iter::FusedIterator;

use configuration::BATCH_SIZE;

use crate::recurrence::RecurrenceState;

/// One outer iteration of the workload: `bound` recurrence steps starting
/// from [`RecurrenceState::INITIAL`].
///
/// Yields the state after each step, so a batch of bound 5 produces
/// `(1,1) (1,2) (2,3) (3,5) (5,8)`.
#[derive(Debug, Clone)]
pub struct Batch {
    state: RecurrenceState,
    remaining: u32,
}

impl Batch {
    pub const fn new(bound: u32) -> Self {
        Batch {
            state: RecurrenceState::INITIAL,
            remaining: bound,
        }
    }

    pub const fn state(&self) -> RecurrenceState {
        self.state
    }
}

impl Iterator for Batch {
    type Item = RecurrenceState;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.state.step();
        Some(self.state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batch {}

impl FusedIterator for Batch {}

/// Runs a single outer iteration and returns the final state. The final
/// `c` of the batch is the returned `b`.
#[inline]
pub fn run_batch(bound: u32) -> RecurrenceState {
    let mut state = RecurrenceState::INITIAL;
    for _ in 0..bound {
        state.step();
    }
    state
}

/// The workload. Burns CPU forever and never returns.
///
/// There is no cancellation check, no yield and no blocking call in here:
/// the only way out is the host killing the process.
pub fn run() -> ! {
    loop {
        // keeps the optimizer from folding the batch away
        black_box(run_batch(black_box(BATCH_SIZE)));
    }
}
