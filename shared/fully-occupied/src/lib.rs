#![deny(unsafe_op_in_unsafe_fn)]
#![no_std]

use core::mem::{align_of, size_of};
use core::slice::from_raw_parts;

fn is_aligned<T>(ptr: *const T) -> bool {
    (ptr as usize) % align_of::<T>() == 0
}

/// Marker trait for fully occupied types. A fully occupied type is valid for any state of the bits
/// in its representation.
///
/// A fully occupied type may be safely reinterpreted from any correctly aligned byte slice. This is
/// how on-disk records are borrowed directly out of a memory-mapped file without copying.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` or `#[repr(transparent)]` and every field must itself be
/// fully occupied.
pub unsafe trait FullyOccupied {}

// SAFETY: Primitive integer types are fully occupied.
unsafe impl FullyOccupied for u8 {}
unsafe impl FullyOccupied for u16 {}
unsafe impl FullyOccupied for u32 {}
unsafe impl FullyOccupied for u64 {}
unsafe impl FullyOccupied for i8 {}
unsafe impl FullyOccupied for i16 {}
unsafe impl FullyOccupied for i32 {}
unsafe impl FullyOccupied for i64 {}

// SAFETY: Floating-point types are fully occupied.
unsafe impl FullyOccupied for f32 {}
unsafe impl FullyOccupied for f64 {}

// SAFETY: Arrays of fully-occupied types are fully occupied.
unsafe impl<T: FullyOccupied, const N: usize> FullyOccupied for [T; N] {}

/// Why a reinterpretation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractError {
    /// Fewer bytes than the requested value(s) occupy, or a length that is not a whole number of
    /// records.
    Length,
    /// The first byte is not aligned for the target type.
    Alignment,
}

/// Reinterprets a prefix of a byte slice as a value of T.
///
/// Only the first `size_of::<T>()` bytes are consulted.
pub fn try_extract<T: FullyOccupied>(bytes: &[u8]) -> Result<&T, ExtractError> {
    let bytes = bytes.get(..size_of::<T>()).ok_or(ExtractError::Length)?;
    let ptr = bytes.as_ptr() as *const T;
    if !is_aligned(ptr) {
        return Err(ExtractError::Alignment);
    }

    // SAFETY: The unsafe impl of `FullyOccupied` promises that any bytes are valid for T. The memory
    // is from the provided byte slice, is long enough, and alignment has been checked.
    Ok(unsafe { &*ptr })
}

/// Reinterprets an entire byte slice as a slice of T.
///
/// An empty byte slice always succeeds, whatever its address.
pub fn try_extract_slice<T: FullyOccupied>(bytes: &[u8]) -> Result<&[T], ExtractError> {
    if size_of::<T>() == 0 || bytes.len() % size_of::<T>() != 0 {
        return Err(ExtractError::Length);
    }
    if bytes.is_empty() {
        return Ok(&[]);
    }
    let ptr = bytes.as_ptr() as *const T;
    if !is_aligned(ptr) {
        return Err(ExtractError::Alignment);
    }

    // SAFETY: As above, for `bytes.len() / size_of::<T>()` consecutive values.
    Ok(unsafe { from_raw_parts(ptr, bytes.len() / size_of::<T>()) })
}
