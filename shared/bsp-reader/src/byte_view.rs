use std::ffi::CStr;
use std::mem::size_of;

use byteorder::{ByteOrder, LittleEndian};
use fully_occupied::{try_extract, try_extract_slice, ExtractError, FullyOccupied};

use crate::bsp::LumpKind;
use crate::error::{Error, Result};

/// A bounds-checked, read-only window over a borrowed buffer.
///
/// Reads are addressed relative to the view's base offset. Every read checks that the requested
/// region lies within the buffer before touching it, and failures name the lump the view is scoped
/// to.
#[derive(Clone, Copy, Debug)]
pub struct ByteView<'a> {
    data: &'a [u8],
    offset: usize,
    lump: Option<LumpKind>,
}

impl<'a> ByteView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            lump: None,
        }
    }

    /// Returns a view whose errors are attributed to `lump`.
    pub fn scoped(self, lump: LumpKind) -> Self {
        Self {
            lump: Some(lump),
            ..self
        }
    }

    /// Returns a view whose base is `relative_offset` bytes past this view's base.
    ///
    /// The new base is not checked here. Reads through it are.
    pub fn with_relative_offset(self, relative_offset: usize) -> Self {
        Self {
            offset: self.offset.saturating_add(relative_offset),
            ..self
        }
    }

    pub fn base_offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `len` bytes starting at `relative_offset`.
    pub fn bytes(&self, relative_offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
        let start = self.absolute(relative_offset, what)?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::out_of_bounds(
                    self.lump,
                    format!(
                        "{what}: {len} bytes at offset {start} exceed buffer of {} bytes",
                        self.data.len(),
                    ),
                )
            })?;
        Ok(&self.data[start..end])
    }

    pub fn read<T: FullyOccupied>(&self, relative_offset: usize, what: &str) -> Result<&'a T> {
        let bytes = self.bytes(relative_offset, size_of::<T>(), what)?;
        try_extract(bytes).map_err(|e| self.extract_error(e, what))
    }

    /// Reads `count` consecutive records. A zero count yields an empty slice without any check.
    pub fn read_slice<T: FullyOccupied>(
        &self,
        relative_offset: usize,
        count: usize,
        what: &str,
    ) -> Result<&'a [T]> {
        if count == 0 {
            return Ok(&[]);
        }
        let len = count.checked_mul(size_of::<T>()).ok_or_else(|| {
            Error::out_of_bounds(self.lump, format!("{what}: {count} records overflow"))
        })?;
        let bytes = self.bytes(relative_offset, len, what)?;
        try_extract_slice(bytes).map_err(|e| self.extract_error(e, what))
    }

    /// Reads a little-endian i32 at any alignment.
    pub fn read_i32(&self, relative_offset: usize, what: &str) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.bytes(relative_offset, 4, what)?))
    }

    /// Reads a NUL-terminated string. The terminator must lie within the buffer.
    pub fn read_str(&self, relative_offset: usize, what: &str) -> Result<&'a str> {
        let start = self.absolute(relative_offset, what)?;
        let tail = &self.data[start..];
        let len = tail.iter().position(|&b| b == 0).ok_or_else(|| {
            Error::out_of_bounds(
                self.lump,
                format!("{what}: string at offset {start} is not terminated"),
            )
        })?;
        CStr::from_bytes_with_nul(&tail[..=len])
            .ok()
            .and_then(|s| s.to_str().ok())
            .ok_or_else(|| {
                Error::invalid_body(self.lump, format!("{what}: string is not valid UTF-8"))
            })
    }

    fn absolute(&self, relative_offset: usize, what: &str) -> Result<usize> {
        self.offset
            .checked_add(relative_offset)
            .filter(|&start| start <= self.data.len())
            .ok_or_else(|| {
                Error::out_of_bounds(
                    self.lump,
                    format!(
                        "{what}: offset {} + {relative_offset} is outside buffer of {} bytes",
                        self.offset,
                        self.data.len(),
                    ),
                )
            })
    }

    fn extract_error(&self, error: ExtractError, what: &str) -> Error {
        match error {
            ExtractError::Length => {
                Error::out_of_bounds(self.lump, format!("{what}: truncated record"))
            }
            ExtractError::Alignment => {
                Error::invalid_body(self.lump, format!("{what}: misaligned record data"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::TestResult;

    use super::ByteView;
    use crate::bsp::LumpKind;
    use crate::error::Reason;

    fn aligned(words: &[u32]) -> Vec<u32> {
        words.iter().map(|w| w.to_le()).collect()
    }

    #[test]
    fn reads_records_relative_to_base() {
        let words = aligned(&[10, 20, 30, 40]);
        let view = ByteView::new(bytemuck::cast_slice(&words)).with_relative_offset(4);
        assert_eq!(u32::from_le(*view.read::<u32>(0, "first").unwrap()), 20);
        let rest: &[u32] = view.read_slice(4, 2, "rest").unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(u32::from_le(rest[1]), 40);
    }

    #[test]
    fn read_past_end_fails_with_lump() {
        let words = aligned(&[1, 2]);
        let view = ByteView::new(bytemuck::cast_slice(&words)).scoped(LumpKind::Edges);
        let error = view.read_slice::<u32>(4, 2, "edges").unwrap_err();
        assert_eq!(error.reason(), Reason::OutOfBoundsAccess);
        assert_eq!(error.lump(), Some(LumpKind::Edges));
    }

    #[test]
    fn zero_count_never_fails() {
        let view = ByteView::new(&[]);
        assert!(view.read_slice::<u32>(1000, 0, "nothing").unwrap().is_empty());
    }

    #[test]
    fn misaligned_record_is_body_error() {
        let words = aligned(&[1, 2]);
        let view = ByteView::new(bytemuck::cast_slice(&words));
        let error = view.read::<u32>(2, "word").unwrap_err();
        assert_eq!(error.reason(), Reason::InvalidBody);
        assert_eq!(view.read_i32(2, "word").unwrap(), 0x0002_0000);
    }

    #[test]
    fn reads_terminated_strings() {
        let view = ByteView::new(b"tools/nodraw\0dev/dev_measuregeneric01\0");
        assert_eq!(view.read_str(0, "name").unwrap(), "tools/nodraw");
        assert_eq!(view.read_str(13, "name").unwrap(), "dev/dev_measuregeneric01");
        assert_eq!(view.read_str(37, "name").unwrap(), "");
    }

    #[test]
    fn unterminated_string_fails() {
        let view = ByteView::new(b"abc");
        let error = view.read_str(0, "name").unwrap_err();
        assert_eq!(error.reason(), Reason::OutOfBoundsAccess);
    }

    #[quickcheck]
    fn reads_stay_in_bounds(data: Vec<u8>, base: usize, offset: usize, len: usize) -> TestResult {
        let view = ByteView::new(&data).with_relative_offset(base % 64);
        match view.bytes(offset % 64, len % 64, "bytes") {
            Ok(bytes) => {
                let start = base % 64 + offset % 64;
                TestResult::from_bool(
                    bytes.len() == len % 64
                        && start + bytes.len() <= data.len()
                        && bytes == &data[start..start + bytes.len()],
                )
            }
            Err(error) => TestResult::from_bool(
                error.reason() == Reason::OutOfBoundsAccess
                    && base % 64 + offset % 64 + len % 64 > data.len(),
            ),
        }
    }

    #[quickcheck]
    fn huge_offsets_do_not_overflow(offset: usize, count: usize) -> bool {
        let view = ByteView::new(&[0; 16]).with_relative_offset(usize::MAX - 3);
        view.read_slice::<u32>(offset, count.max(1), "records").is_err()
    }
}
