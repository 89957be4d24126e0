use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::Mutex;

use crate::error::AllocError;

/// Alignment requested for the backing buffer. Keeps the base address at a
/// known boundary so that small-alignment requests pad deterministically;
/// types with a stricter alignment are padded from the actual address in
/// [`Arena::bump`].
const BUFFER_ALIGN: usize = 16;

/// Cursor into the buffer. Everything behind the mutex lives here.
struct ArenaState {
    /// Start of free space; `0 <= offset <= capacity` on every exit path,
    /// including failed allocations.
    offset: usize,
}

/// Fixed-capacity bump arena that hands out aligned, placement-constructed
/// values from a single preallocated buffer.
///
/// Allocation advances a cursor; there is no per-allocation metadata and no
/// free list. Individual deallocation only rewinds the cursor, so it must
/// happen in exactly the reverse order of allocation (strict LIFO). The
/// arena trusts the caller on this and cannot check it. [`Arena::reset`]
/// reclaims the whole buffer at once without running destructors.
///
/// All operations serialize on one internal mutex, so an `Arc<Arena>` can be
/// shared freely between threads. The critical section covers the capacity
/// check, the cursor advance and the in-place construction as one unit, and
/// does O(1) work beyond constructing the value.
///
/// Pointers returned by the allocation methods alias into the buffer and are
/// valid until whichever comes first of the matching deallocation, a
/// [`Arena::reset`], or the arena itself being dropped. The arena does not
/// track them: use after reset is a caller error it cannot detect.
pub struct Arena {
    buf: NonNull<u8>,
    layout: Layout,
    state: Mutex<ArenaState>,
}

// The mutex serializes every access to the cursor and every construction in
// the buffer; returned pointers hand out disjoint cells, never the
// bookkeeping.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Creates an arena backed by exactly `capacity` bytes.
    ///
    /// The buffer comes from the global allocator and is released when the
    /// arena is dropped. Dropping the arena runs no destructors for values
    /// still inside it; deallocate them first if their `Drop` matters.
    ///
    /// A zero-capacity arena is valid: it allocates nothing and every
    /// non-zero-sized request fails.
    pub fn new(capacity: usize) -> Result<Arena, AllocError> {
        let layout = Layout::from_size_align(capacity, BUFFER_ALIGN)
            .map_err(|_| AllocError::InvalidCapacity { capacity })?;
        let buf = if capacity == 0 {
            NonNull::dangling()
        } else {
            let raw = unsafe { alloc(layout) };
            NonNull::new(raw).ok_or(AllocError::OutOfMemory { capacity })?
        };
        debug!("arena created with {} bytes", capacity);
        Ok(Arena {
            buf,
            layout,
            state: Mutex::new(ArenaState { offset: 0 }),
        })
    }

    /// Reserves space for `count` values of `T` at the cursor and advances it.
    ///
    /// Padding is derived from the actual address of the cursor, not the
    /// offset, so the returned pointer satisfies `align_of::<T>()` no matter
    /// how the backing buffer happens to be aligned. Zero-sized reservations
    /// need no storage and get the canonical aligned dangling pointer
    /// without moving the cursor.
    ///
    /// Returns `None` if the padded request does not fit or its byte size
    /// overflows. On `None` the cursor is exactly as it was.
    fn bump<T>(&self, state: &mut ArenaState, count: usize) -> Option<*mut T> {
        let size = mem::size_of::<T>().checked_mul(count)?;
        if size == 0 {
            return Some(NonNull::<T>::dangling().as_ptr());
        }
        let align = mem::align_of::<T>();
        let base = self.buf.as_ptr() as usize;
        let addr = base.checked_add(state.offset)?;
        let padding = (align - (addr % align)) % align;
        let aligned = addr.checked_add(padding)?;
        let end = aligned.checked_add(size)?;
        if end > base.checked_add(self.layout.size())? {
            return None;
        }
        state.offset = end - base;
        trace!("bump {} bytes at address {:#x} (align {})", size, aligned, align);
        Some(aligned as *mut T)
    }

    /// Allocates one default-constructed `T`.
    ///
    /// The returned pointer is aligned for `T` and disjoint from every other
    /// live allocation. Alignment padding is consumed from capacity and only
    /// comes back with [`Arena::reset`]. Returns `None` without touching the
    /// cursor when the value does not fit.
    pub fn allocate<T: Default>(&self) -> Option<NonNull<T>> {
        let mut state = self.state.lock().expect("lock");
        let ptr = self.bump::<T>(&mut state, 1)?;
        unsafe { ptr::write(ptr, T::default()) };
        Some(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Moves `value` into the arena.
    ///
    /// Same contract as [`Arena::allocate`], for types that are not
    /// `Default` or values constructed elsewhere. If the arena is full the
    /// value is dropped along with the `None` return.
    pub fn allocate_value<T>(&self, value: T) -> Option<NonNull<T>> {
        let mut state = self.state.lock().expect("lock");
        let ptr = self.bump::<T>(&mut state, 1)?;
        unsafe { ptr::write(ptr, value) };
        Some(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Drops the value at `ptr` and rewinds the cursor past it.
    ///
    /// A null `ptr` is a no-op; no destructor runs. If rewinding by
    /// `size_of::<T>()` would pass the start of the buffer the whole call is
    /// a no-op as well: no destructor, cursor untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be the most recent still-live allocation from this arena,
    /// obtained with the same `T`. The arena keeps no record to verify this:
    /// deallocating out of order or with a different type rewinds the cursor
    /// by the wrong amount and corrupts subsequent allocations.
    pub unsafe fn deallocate<T>(&self, ptr: *mut T) {
        if ptr.is_null() {
            return;
        }
        let mut state = self.state.lock().expect("lock");
        let size = mem::size_of::<T>();
        if size > state.offset {
            return;
        }
        ptr::drop_in_place(ptr);
        state.offset -= size;
        trace!("deallocated {} bytes, offset now {}", size, state.offset);
    }

    /// Allocates `count` default-constructed values of `T`, contiguously,
    /// returning the first element.
    ///
    /// `count == 0` is rejected with `None`: there is no address for an
    /// array of nothing. A `count` whose byte size overflows `usize` is
    /// rejected before any arithmetic wraps. Elements are constructed in
    /// index order.
    pub fn allocate_array<T: Default>(&self, count: usize) -> Option<NonNull<T>> {
        if count == 0 {
            return None;
        }
        let mut state = self.state.lock().expect("lock");
        let first = self.bump::<T>(&mut state, count)?;
        for i in 0..count {
            unsafe { ptr::write(first.add(i), T::default()) };
        }
        Some(unsafe { NonNull::new_unchecked(first) })
    }

    /// Drops `count` values starting at `ptr` and rewinds the cursor past
    /// them.
    ///
    /// No-op when `count == 0` or `ptr` is null. Elements are dropped in
    /// reverse index order, mirroring construction. The cursor is rewound by
    /// `count * size_of::<T>()` only when that cannot pass the start of the
    /// buffer; otherwise the destructors still run but the space stays
    /// consumed until the next [`Arena::reset`].
    ///
    /// # Safety
    ///
    /// `ptr` and `count` must identify the most recent still-live array
    /// allocation from this arena, with the same `T` and the same `count` it
    /// was allocated with. As with [`Arena::deallocate`], the arena cannot
    /// verify this.
    pub unsafe fn deallocate_array<T>(&self, ptr: *mut T, count: usize) {
        if ptr.is_null() || count == 0 {
            return;
        }
        let mut state = self.state.lock().expect("lock");
        for i in (0..count).rev() {
            ptr::drop_in_place(ptr.add(i));
        }
        match mem::size_of::<T>().checked_mul(count) {
            Some(total) if total <= state.offset => {
                state.offset -= total;
                trace!("deallocated array of {} bytes, offset now {}", total, state.offset);
            }
            // Rewind would pass the buffer start; leave the cursor alone.
            _ => (),
        }
    }

    /// Rewinds the cursor to the start of the buffer.
    ///
    /// Runs no destructors: values still inside the arena are abandoned, and
    /// every previously returned pointer becomes invalid. Callers that need
    /// cleanup must deallocate before resetting. Safe to call on an arena
    /// that never allocated.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("lock");
        state.offset = 0;
        trace!("arena reset");
    }

    /// Bytes still free.
    pub fn remaining(&self) -> usize {
        let state = self.state.lock().expect("lock");
        self.layout.size() - state.offset
    }

    /// Bytes consumed so far, alignment padding included.
    pub fn used(&self) -> usize {
        self.state.lock().expect("lock").offset
    }

    /// Total size of the buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            unsafe { dealloc(self.buf.as_ptr(), self.layout) };
        }
        debug!("arena with {} bytes freed", self.layout.size());
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.layout.size())
            .field("used", &self.used())
            .finish()
    }
}
