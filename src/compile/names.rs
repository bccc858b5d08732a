//! Run-scoped name allocation.

/// Hands out the numeric suffixes that keep element names unique across every
/// branch of one compilation run. Values start at 1, only grow, and are never
/// handed out twice; the same input in the same order always yields the same
/// sequence.
#[derive(Debug, Default)]
pub struct NameAllocator {
    last: u64,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}
