//! Unique benchmark instance names

use std::collections::HashSet;

/// Issues `<base>_<n>` names, picking the lowest free `n` for each base.
#[derive(Debug, Default)]
pub struct NameAllocator {
    issued: HashSet<String>,
}

impl NameAllocator {
    /// Create an allocator with nothing issued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next free instance name for `base`.
    pub fn allocate(&mut self, base: &str) -> String {
        let mut suffix = 0usize;
        loop {
            let candidate = format!("{base}_{suffix}");
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Check if a name has been issued.
    #[must_use]
    pub fn is_issued(&self, name: &str) -> bool {
        self.issued.contains(name)
    }
}
