//! Shared interior-mutable cells for dispatch-partitioned data.

use std::cell::UnsafeCell;

/// A cell shared across worker threads without a lock. The dispatch
/// protocol guarantees each cell index is handed to at most one worker at a
/// time; that exclusive-ownership rule is the entire safety argument, there
/// is no hardware lock backing it.
pub struct SyncCell<T>(UnsafeCell<T>);

unsafe impl<T: Send> Sync for SyncCell<T> {}

impl<T> SyncCell<T> {
    /// Create a new cell.
    ///
    /// * `v` - The initial value.
    pub fn new(v: T) -> Self {
        Self(UnsafeCell::new(v))
    }

    /// Returns a mutable reference to the contents.
    ///
    /// # Safety
    ///
    /// The caller must be the sole owner of this cell for the duration of
    /// the borrow, as established by the work-dispatch protocol.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut(&self) -> &mut T {
        &mut *self.0.get()
    }

    /// Returns a shared reference to the contents.
    ///
    /// # Safety
    ///
    /// No worker may hold a mutable borrow of this cell while the returned
    /// reference is live.
    pub unsafe fn as_ref(&self) -> &T {
        &*self.0.get()
    }

    /// Returns a mutable reference through an exclusive borrow of the
    /// cell itself. Safe: the borrow checker rules out concurrent access.
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }

    /// Consumes the cell, returning the contained value.
    pub fn into_inner(self) -> T {
        self.0.into_inner()
    }
}

impl<T> SyncCell<T>
where
    T: Copy,
{
    /// Reads the contained value.
    ///
    /// # Safety
    ///
    /// No worker may be concurrently writing this cell.
    pub unsafe fn read(&self) -> T {
        *self.0.get()
    }

    /// Writes the contained value.
    ///
    /// # Safety
    ///
    /// The caller must be the sole owner of this cell, as established by
    /// the work-dispatch protocol.
    pub unsafe fn write(&self, v: T) {
        *self.0.get() = v;
    }
}

impl<T: Default> Default for SyncCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write() {
        let cell = SyncCell::new(1_u32);
        unsafe {
            cell.write(5);
            assert_eq!(cell.read(), 5);
        }
        assert_eq!(cell.into_inner(), 5);
    }
}
