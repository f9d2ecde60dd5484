//! Configuration for sync runs.

/// Options for one sync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncConfig {
    /// Only propagate changes from A to B. Changes on B are ignored.
    pub only_a_to_b: bool,
    /// Decide but do not write.
    pub dry_run: bool,
}

impl SyncConfig {
    /// Bidirectional, writing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one-directional mode.
    #[must_use]
    pub fn with_only_a_to_b(mut self, only_a_to_b: bool) -> Self {
        self.only_a_to_b = only_a_to_b;
        self
    }

    /// Sets dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
