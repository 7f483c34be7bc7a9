//! Variable name allocation for metric-math expressions
//!
//! Names follow spreadsheet-column order: `a`..`z`, `aa`..`az`, `ba`, ..
//! (bijective base 26, no leading-zero digit).

use serde::Serialize;

const ALPHABET_LEN: u64 = 26;

/// Hands out pairwise distinct variable names for one expression-building pass
///
/// The allocator is a plain value: each pass owns its own instance, so two
/// builds never observe each other's counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableAllocator {
    allocated: u64,
}

impl VariableAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure step: returns the next name and the successor state
    pub fn advance(self) -> (String, Self) {
        let name = name_at(self.allocated);
        (
            name,
            Self {
                allocated: self.allocated + 1,
            },
        )
    }

    /// Allocate the next name in place
    pub fn next_name(&mut self) -> String {
        let name = name_at(self.allocated);
        self.allocated += 1;
        name
    }

    /// Number of names handed out so far
    pub fn allocated(&self) -> u64 {
        self.allocated
    }
}

impl Iterator for VariableAllocator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_name())
    }
}

/// Name at zero-based position `index` of the sequence
pub fn name_at(index: u64) -> String {
    let mut remaining = index + 1;
    let mut digits = Vec::new();

    while remaining > 0 {
        remaining -= 1;
        digits.push((b'a' + (remaining % ALPHABET_LEN) as u8) as char);
        remaining /= ALPHABET_LEN;
    }

    digits.iter().rev().collect()
}
