use std::error::Error;
use std::fmt;

/// Failure to obtain the backing buffer at arena construction.
///
/// This is the only error the arena ever raises. Capacity exhaustion during
/// allocation is signalled by `None` results instead, so the allocation hot
/// path never constructs an error value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// No valid memory layout exists for the requested capacity
    /// (the rounded size would exceed `isize::MAX`).
    InvalidCapacity {
        /// Requested capacity in bytes.
        capacity: usize,
    },
    /// The global allocator could not provide the buffer.
    OutOfMemory {
        /// Requested capacity in bytes.
        capacity: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::InvalidCapacity { capacity } => {
                write!(f, "no valid layout for an arena of {} bytes", capacity)
            }
            AllocError::OutOfMemory { capacity } => {
                write!(f, "failed to obtain {} bytes for the arena buffer", capacity)
            }
        }
    }
}

impl Error for AllocError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_capacity() {
        let e = AllocError::OutOfMemory { capacity: 4096 };
        assert!(e.to_string().contains("4096"));
        let e = AllocError::InvalidCapacity { capacity: 7 };
        assert!(e.to_string().contains("7"));
    }
}
