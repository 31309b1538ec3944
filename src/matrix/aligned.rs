//! Cache-line aligned float storage.

use crate::error::{MatmulError, Result};
use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

/// Cache line size in bytes. Every buffer starts on a multiple of this.
pub const CACHE_LINE: usize = 64;

/// Heap buffer of `f32` whose first element sits on a cache-line boundary.
///
/// Memory is zeroed at allocation and released when the buffer is dropped,
/// so an early `?` return can't leak it.
pub struct AlignedBuffer {
    ptr: NonNull<f32>,
    len: usize,
    layout: Layout,
}

// The buffer uniquely owns its allocation, same as a Vec<f32>.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocates `len` zeroed floats aligned to [`CACHE_LINE`].
    ///
    /// # Errors
    ///
    /// `InvalidDimension` for `len == 0`, `Allocation` if the layout
    /// overflows or the allocator returns null.
    pub fn zeroed(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(MatmulError::InvalidDimension(0));
        }

        let bytes = len
            .checked_mul(size_of::<f32>())
            .ok_or(MatmulError::Allocation { bytes: usize::MAX })?;
        let layout = Layout::from_size_align(bytes, CACHE_LINE)
            .map_err(|_| MatmulError::Allocation { bytes })?;

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<f32>()).ok_or(MatmulError::Allocation { bytes })?;

        Ok(Self { ptr, len, layout })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        // SAFETY: ptr is valid for len initialized (zeroed) floats for our lifetime.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Deref for AlignedBuffer {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        self.as_slice()
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [f32] {
        self.as_mut_slice()
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by alloc_zeroed with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("ptr", &self.ptr)
            .finish()
    }
}
