//! Key versions for optimistic concurrency.

/// Optimistic concurrency expectation for a single world-state key.
///
/// Hosts record the version of every key read during an invocation and check
/// these expectations at commit time. Version `0` means "key was absent".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The key must still be absent.
    Absent,
    /// Require the key to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation for a key observed at `version`.
    pub fn at(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::Absent
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Absent => actual == 0,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
