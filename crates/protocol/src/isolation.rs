//! Transactional record visibility.

/// Controls the visibility of transactional records in fetch and
/// list-offsets requests.
///
/// `ReadUncommitted` makes all records visible. `ReadCommitted` restricts
/// results to offsets below the last stable offset, so aborted
/// transactional records are never observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    #[default]
    ReadUncommitted,
    ReadCommitted,
}

impl From<IsolationLevel> for i8 {
    fn from(level: IsolationLevel) -> Self {
        match level {
            IsolationLevel::ReadUncommitted => 0,
            IsolationLevel::ReadCommitted => 1,
        }
    }
}
