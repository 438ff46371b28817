//! Lock-free floating point accumulation.

use crate::math::Float;
use std::sync::atomic::{AtomicU32, Ordering};

/// A single-precision float that supports lock-free atomic addition by
/// storing its bit pattern in an `AtomicU32` and updating it with a
/// compare-and-swap loop. Render buffer channels use this so concurrent
/// paths can accumulate into the same pixel without locking.
pub struct AtomicFloat {
    /// Bit representation of the floating point value.
    bits: AtomicU32,
}

impl AtomicFloat {
    /// Create a new `AtomicFloat`.
    ///
    /// * `v` - The initial value.
    pub fn new(v: Float) -> Self {
        Self {
            bits: AtomicU32::new(v.to_bits()),
        }
    }

    /// Atomically add a value, returning the previous value.
    ///
    /// * `v` - The value to add.
    pub fn fetch_add(&self, v: Float) -> Float {
        let mut old_bits = self.bits.load(Ordering::Relaxed);
        loop {
            let new_bits = (Float::from_bits(old_bits) + v).to_bits();
            match self.bits.compare_exchange_weak(
                old_bits,
                new_bits,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Float::from_bits(old_bits),
                Err(x) => old_bits = x,
            }
        }
    }

    /// Loads the floating point value.
    pub fn load(&self) -> Float {
        Float::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Stores the floating point value.
    ///
    /// * `v` - The value.
    pub fn store(&self, v: Float) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicFloat {
    /// Returns a zero-valued `AtomicFloat`.
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clone for AtomicFloat {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}

impl std::fmt::Debug for AtomicFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtomicFloat({})", self.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn add_and_load() {
        let f = AtomicFloat::new(1.5);
        assert_eq!(f.fetch_add(2.0), 1.5);
        assert_eq!(f.load(), 3.5);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let f = Arc::new(AtomicFloat::new(0.0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let f = Arc::clone(&f);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        f.fetch_add(1.0);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(f.load(), 8000.0);
    }
}
