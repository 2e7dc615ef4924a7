//! Codes restored from saved state, waiting for an owned view to match against.

/// Persisted selection codes not yet merged into the selection.
///
/// Filled by a restore and emptied exactly once by [`PendingRestore::take`],
/// whether or not any code matched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingRestore {
    codes: Vec<String>,
}

impl PendingRestore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append restored codes, skipping duplicates.
    pub fn fill<I, S>(&mut self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for code in codes {
            let code = code.into();
            if !self.codes.contains(&code) {
                self.codes.push(code);
            }
        }
    }

    /// Drain all buffered codes, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.codes)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }
}
