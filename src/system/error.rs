//! Error types for the shared drive command store

use core::fmt;

/// Failure to acquire the drive command store
///
/// The store is only ever locked for a pure memory operation, so this can
/// only happen when a lock holder re-enters the store (for example from an
/// interrupt preempting its own critical section on a misconfigured
/// executor). Tasks treat it as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum StoreError {
    /// The guarded state was already borrowed by the current lock holder
    Reentered,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Reentered => write!(f, "drive command store re-entered while locked"),
        }
    }
}
