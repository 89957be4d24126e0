//! Thread-safe fixed-capacity bump arena.
//!
//! An [`Arena`] owns a single preallocated buffer and hands out aligned,
//! placement-constructed values from it by advancing one cursor. Individual
//! deallocation is strict LIFO; [`Arena::reset`] reclaims everything at once.
//! Every operation takes one internal mutex, so a single arena can be shared
//! across threads behind an `Arc`.
//!
//! The arena stores no per-allocation metadata. That keeps allocation at
//! O(1) with zero overhead, and it means the deallocation contract (same
//! type, same count, reverse order) rests entirely on the caller. See the
//! safety sections on [`Arena::deallocate`] and [`Arena::deallocate_array`].

#[macro_use]
mod logging;

mod arena;
mod error;

pub use arena::Arena;
pub use error::AllocError;

#[cfg(test)]
pub mod dropflag;
