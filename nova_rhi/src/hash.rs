//! Deterministic content hashing for resource descriptors
//!
//! Every descriptor exposes a 64-bit content hash used as the identity key
//! in the device object caches. Two descriptors with identical field values
//! hash identically; the hash is computed lazily and memoized inside the
//! descriptor. Hash equality is treated as content equality by the caches
//! (no secondary equality probe), so descriptors must feed every field that
//! affects backend behavior into the hasher.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for types exposing a deterministic, memoized content hash
pub trait ContentHash {
    /// Content hash over every field that affects backend object identity
    fn content_hash(&self) -> u64;
}

/// Memoization cell for a lazily computed content hash
///
/// Stores 0 as the "not yet computed" sentinel; computed hashes that land on
/// 0 are remapped to a fixed non-zero constant so the sentinel stays unique.
/// Setters on the owning descriptor call `invalidate()` after mutating a
/// hashed field.
#[derive(Debug, Default)]
pub struct HashCell(AtomicU64);

/// Replacement value for the (astronomically unlikely) computed hash of 0
const ZERO_REMAP: u64 = 0x9E37_79B9_7F4A_7C15;

impl HashCell {
    /// Create an empty (not yet computed) cell
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Return the memoized hash, computing it with `f` on first use
    pub fn get_or_compute<F: FnOnce() -> u64>(&self, f: F) -> u64 {
        match self.0.load(Ordering::Relaxed) {
            0 => {
                let mut h = f();
                if h == 0 {
                    h = ZERO_REMAP;
                }
                self.0.store(h, Ordering::Relaxed);
                h
            }
            h => h,
        }
    }

    /// Forget the memoized value (called by descriptor setters)
    pub fn invalidate(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Clone for HashCell {
    fn clone(&self) -> Self {
        // Cloning a descriptor keeps its memoized hash: the clone has
        // identical field values, so the value is still correct.
        Self(AtomicU64::new(self.0.load(Ordering::Relaxed)))
    }
}

/// Deterministic hasher over descriptor fields
///
/// Thin wrapper around `FxHasher` (no random seed, stable across runs and
/// processes of the same build). Floats are hashed by bit pattern.
pub struct DescHasher(FxHasher);

impl DescHasher {
    pub fn new() -> Self {
        Self(FxHasher::default())
    }

    /// Feed any `Hash` value
    pub fn field<T: Hash>(&mut self, value: &T) -> &mut Self {
        value.hash(&mut self.0);
        self
    }

    /// Feed an f32 by bit pattern
    pub fn f32_field(&mut self, value: f32) -> &mut Self {
        value.to_bits().hash(&mut self.0);
        self
    }

    /// Feed another object's content hash (sub-descriptor composition)
    pub fn sub_hash(&mut self, hash: u64) -> &mut Self {
        hash.hash(&mut self.0);
        self
    }

    /// Feed a pointer identity (shader/frame-buffer handles in a pipeline
    /// descriptor hash by identity, not by content)
    pub fn identity<T: ?Sized>(&mut self, ptr: *const T) -> &mut Self {
        (ptr as *const () as usize as u64).hash(&mut self.0);
        self
    }

    /// Finish and return the 64-bit hash
    pub fn finish(&self) -> u64 {
        self.0.finish()
    }
}

impl Default for DescHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
