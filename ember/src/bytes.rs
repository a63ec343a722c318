//! Byte-buffer primitives: equality, ordering, copy and fill.
//!
//! Every operation runs through a [`Strategy`], a table of routines picked
//! once per process from [`PlatformCapabilities`]:
//!
//! - [`Strategy::fast`] hands whole ranges to the bulk memory intrinsics
//!   (`memcmp`/`memcpy`/`memset` via `ptr::copy_nonoverlapping`,
//!   `ptr::write_bytes` and slice comparison).
//! - [`Strategy::portable`] walks the ranges byte by byte with checked
//!   indexing. It is the conservative path for hosts without the fast probe.
//!
//! The free functions in this module use the process-wide [`strategy()`].
//!
//! # Range checking
//!
//! Each operation comes in three forms:
//!
//! | Form | On a malformed range |
//! |------|----------------------|
//! | `try_equal`, `try_copy`, ... | returns [`RangeError`] |
//! | `equal`, `copy`, ... | panics, like slice indexing |
//! | `equal_unchecked`, ... (`unsafe`) | undefined behavior; the caller proves bounds |
//!
//! Copy and fill with `len == 0` are no-ops and never inspect the offsets.
//!
//! # Example
//!
//! ```
//! use std::cmp::Ordering;
//! use ember::bytes;
//!
//! let src = *b"hello world";
//! let mut dst = [0u8; 5];
//!
//! bytes::copy(&src, 6, &mut dst, 0, 5);
//! assert!(bytes::equal(&dst, 0, b"world", 0, 5));
//! assert_eq!(bytes::compare(&src, 0, 5, &dst, 0, 5), Ordering::Less);
//!
//! bytes::clear(&mut dst, 1, 3);
//! assert_eq!(&dst, b"w\0\0\0d");
//! ```

mod view;

pub use view::ByteView;

use std::cmp::Ordering;
use std::ops::Range;
use std::ptr;
use std::sync::OnceLock;

use crate::platform::PlatformCapabilities;

/// A malformed byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// The range ends past the end of the buffer.
    #[error("range {offset}..{offset}+{len} out of bounds for buffer of length {buffer_len}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },
    /// `offset + len` overflows `usize`.
    #[error("range {offset}+{len} overflows")]
    Overflow { offset: usize, len: usize },
}

/// Validates `offset..offset + len` against a buffer of `buffer_len` bytes.
#[inline]
pub(crate) fn checked_range(
    buffer_len: usize,
    offset: usize,
    len: usize,
) -> Result<Range<usize>, RangeError> {
    let end = offset
        .checked_add(len)
        .ok_or(RangeError::Overflow { offset, len })?;
    if end > buffer_len {
        return Err(RangeError::OutOfBounds {
            offset,
            len,
            buffer_len,
        });
    }
    Ok(offset..end)
}

/// Which family of routines a [`Strategy`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Bulk memory intrinsics.
    Fast,
    /// Byte-wise checked loops.
    Portable,
}

/// A set of byte routines. Obtain one with [`strategy()`],
/// [`Strategy::fast`] or [`Strategy::portable`].
///
/// The routines only ever see ranges that were already validated (or that the
/// caller vouched for), and equal-length ranges where lengths must match.
pub struct Strategy {
    kind: StrategyKind,
    equal: fn(&[u8], &[u8]) -> bool,
    compare: fn(&[u8], &[u8]) -> Ordering,
    copy: fn(&[u8], &mut [u8]),
    fill: fn(&mut [u8], u8),
}

static FAST: Strategy = Strategy {
    kind: StrategyKind::Fast,
    equal: fast::equal,
    compare: fast::compare,
    copy: fast::copy,
    fill: fast::fill,
};

static PORTABLE: Strategy = Strategy {
    kind: StrategyKind::Portable,
    equal: portable::equal,
    compare: portable::compare,
    copy: portable::copy,
    fill: portable::fill,
};

static ACTIVE: OnceLock<&'static Strategy> = OnceLock::new();

/// Returns the strategy selected for this process.
#[inline]
pub fn strategy() -> &'static Strategy {
    ACTIVE.get_or_init(|| {
        if PlatformCapabilities::get().fast_memory_view_supported() {
            Strategy::fast()
        } else {
            Strategy::portable()
        }
    })
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("kind", &self.kind).finish()
    }
}

impl Strategy {
    /// The bulk-intrinsic routines.
    #[must_use]
    pub fn fast() -> &'static Self {
        &FAST
    }

    /// The byte-wise routines.
    #[must_use]
    pub fn portable() -> &'static Self {
        &PORTABLE
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Returns whether the `len` bytes at `a[a_off..]` and `b[b_off..]` match.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if either range falls outside its buffer.
    pub fn try_equal(
        &self,
        a: &[u8],
        a_off: usize,
        b: &[u8],
        b_off: usize,
        len: usize,
    ) -> Result<bool, RangeError> {
        let ra = checked_range(a.len(), a_off, len)?;
        let rb = checked_range(b.len(), b_off, len)?;
        Ok((self.equal)(&a[ra], &b[rb]))
    }

    /// Panicking form of [`Strategy::try_equal`].
    ///
    /// # Panics
    ///
    /// Panics if either range falls outside its buffer.
    #[track_caller]
    #[must_use]
    pub fn equal(&self, a: &[u8], a_off: usize, b: &[u8], b_off: usize, len: usize) -> bool {
        match self.try_equal(a, a_off, b, b_off, len) {
            Ok(eq) => eq,
            Err(e) => panic!("{e}"),
        }
    }

    /// Unchecked form of [`Strategy::try_equal`].
    ///
    /// # Safety
    ///
    /// `a_off + len <= a.len()` and `b_off + len <= b.len()` must hold.
    #[inline]
    #[must_use]
    pub unsafe fn equal_unchecked(
        &self,
        a: &[u8],
        a_off: usize,
        b: &[u8],
        b_off: usize,
        len: usize,
    ) -> bool {
        debug_assert!(checked_range(a.len(), a_off, len).is_ok());
        debug_assert!(checked_range(b.len(), b_off, len).is_ok());
        // SAFETY: the caller guarantees both ranges are in bounds.
        let (a, b) = unsafe {
            (
                a.get_unchecked(a_off..a_off + len),
                b.get_unchecked(b_off..b_off + len),
            )
        };
        (self.equal)(a, b)
    }

    /// Orders `a[a_off..a_off + a_len]` against `b[b_off..b_off + b_len]`
    /// lexicographically by unsigned byte value. A strict prefix sorts first.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if either range falls outside its buffer.
    pub fn try_compare(
        &self,
        a: &[u8],
        a_off: usize,
        a_len: usize,
        b: &[u8],
        b_off: usize,
        b_len: usize,
    ) -> Result<Ordering, RangeError> {
        let ra = checked_range(a.len(), a_off, a_len)?;
        let rb = checked_range(b.len(), b_off, b_len)?;
        Ok((self.compare)(&a[ra], &b[rb]))
    }

    /// Panicking form of [`Strategy::try_compare`].
    ///
    /// # Panics
    ///
    /// Panics if either range falls outside its buffer.
    #[track_caller]
    #[must_use]
    pub fn compare(
        &self,
        a: &[u8],
        a_off: usize,
        a_len: usize,
        b: &[u8],
        b_off: usize,
        b_len: usize,
    ) -> Ordering {
        match self.try_compare(a, a_off, a_len, b, b_off, b_len) {
            Ok(ord) => ord,
            Err(e) => panic!("{e}"),
        }
    }

    /// Unchecked form of [`Strategy::try_compare`].
    ///
    /// # Safety
    ///
    /// `a_off + a_len <= a.len()` and `b_off + b_len <= b.len()` must hold.
    #[inline]
    #[must_use]
    pub unsafe fn compare_unchecked(
        &self,
        a: &[u8],
        a_off: usize,
        a_len: usize,
        b: &[u8],
        b_off: usize,
        b_len: usize,
    ) -> Ordering {
        debug_assert!(checked_range(a.len(), a_off, a_len).is_ok());
        debug_assert!(checked_range(b.len(), b_off, b_len).is_ok());
        // SAFETY: the caller guarantees both ranges are in bounds.
        let (a, b) = unsafe {
            (
                a.get_unchecked(a_off..a_off + a_len),
                b.get_unchecked(b_off..b_off + b_len),
            )
        };
        (self.compare)(a, b)
    }

    /// Copies `len` bytes from `src[src_off..]` into `dst[dst_off..]`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if either range falls outside its buffer.
    pub fn try_copy(
        &self,
        src: &[u8],
        src_off: usize,
        dst: &mut [u8],
        dst_off: usize,
        len: usize,
    ) -> Result<(), RangeError> {
        if len == 0 {
            return Ok(());
        }
        let rs = checked_range(src.len(), src_off, len)?;
        let rd = checked_range(dst.len(), dst_off, len)?;
        (self.copy)(&src[rs], &mut dst[rd]);
        Ok(())
    }

    /// Panicking form of [`Strategy::try_copy`].
    ///
    /// # Panics
    ///
    /// Panics if either range falls outside its buffer.
    #[track_caller]
    pub fn copy(&self, src: &[u8], src_off: usize, dst: &mut [u8], dst_off: usize, len: usize) {
        if let Err(e) = self.try_copy(src, src_off, dst, dst_off, len) {
            panic!("{e}");
        }
    }

    /// Unchecked form of [`Strategy::try_copy`].
    ///
    /// # Safety
    ///
    /// When `len > 0`, `src_off + len <= src.len()` and
    /// `dst_off + len <= dst.len()` must hold.
    #[inline]
    pub unsafe fn copy_unchecked(
        &self,
        src: &[u8],
        src_off: usize,
        dst: &mut [u8],
        dst_off: usize,
        len: usize,
    ) {
        if len == 0 {
            return;
        }
        debug_assert!(checked_range(src.len(), src_off, len).is_ok());
        debug_assert!(checked_range(dst.len(), dst_off, len).is_ok());
        // SAFETY: the caller guarantees both ranges are in bounds.
        let (src, dst) = unsafe {
            (
                src.get_unchecked(src_off..src_off + len),
                dst.get_unchecked_mut(dst_off..dst_off + len),
            )
        };
        (self.copy)(src, dst);
    }

    /// Sets every byte of `dst[off..off + len]` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if the range falls outside `dst`.
    pub fn try_fill(
        &self,
        dst: &mut [u8],
        off: usize,
        len: usize,
        value: u8,
    ) -> Result<(), RangeError> {
        if len == 0 {
            return Ok(());
        }
        let rd = checked_range(dst.len(), off, len)?;
        (self.fill)(&mut dst[rd], value);
        Ok(())
    }

    /// Panicking form of [`Strategy::try_fill`].
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside `dst`.
    #[track_caller]
    pub fn fill(&self, dst: &mut [u8], off: usize, len: usize, value: u8) {
        if let Err(e) = self.try_fill(dst, off, len, value) {
            panic!("{e}");
        }
    }

    /// Unchecked form of [`Strategy::try_fill`].
    ///
    /// # Safety
    ///
    /// When `len > 0`, `off + len <= dst.len()` must hold.
    #[inline]
    pub unsafe fn fill_unchecked(&self, dst: &mut [u8], off: usize, len: usize, value: u8) {
        if len == 0 {
            return;
        }
        debug_assert!(checked_range(dst.len(), off, len).is_ok());
        // SAFETY: the caller guarantees the range is in bounds.
        let dst = unsafe { dst.get_unchecked_mut(off..off + len) };
        (self.fill)(dst, value);
    }
}

mod fast {
    use std::cmp::Ordering;
    use std::ptr;

    #[inline]
    pub(super) fn equal(a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    #[inline]
    pub(super) fn compare(a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    #[inline]
    pub(super) fn copy(src: &[u8], dst: &mut [u8]) {
        let len = src.len().min(dst.len());
        // SAFETY: both pointers are valid for `len` bytes, and `&`/`&mut`
        // borrows cannot overlap.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_mut_ptr(), len) }
    }

    #[inline]
    pub(super) fn fill(dst: &mut [u8], value: u8) {
        // SAFETY: dst is valid for writes of dst.len() bytes.
        unsafe { ptr::write_bytes(dst.as_mut_ptr(), value, dst.len()) }
    }
}

// Per-byte bounds checks are the point of this path.
#[allow(clippy::needless_range_loop)]
mod portable {
    use std::cmp::Ordering;

    pub(super) fn equal(a: &[u8], b: &[u8]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        for i in 0..a.len() {
            if a[i] != b[i] {
                return false;
            }
        }
        true
    }

    pub(super) fn compare(a: &[u8], b: &[u8]) -> Ordering {
        let common = a.len().min(b.len());
        for i in 0..common {
            match a[i].cmp(&b[i]) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        a.len().cmp(&b.len())
    }

    pub(super) fn copy(src: &[u8], dst: &mut [u8]) {
        let len = src.len().min(dst.len());
        for i in 0..len {
            dst[i] = src[i];
        }
    }

    pub(super) fn fill(dst: &mut [u8], value: u8) {
        for byte in dst.iter_mut() {
            *byte = value;
        }
    }
}

/// Returns whether the `len` bytes at `a[a_off..]` and `b[b_off..]` match.
///
/// # Panics
///
/// Panics if either range falls outside its buffer.
#[track_caller]
#[inline]
#[must_use]
pub fn equal(a: &[u8], a_off: usize, b: &[u8], b_off: usize, len: usize) -> bool {
    strategy().equal(a, a_off, b, b_off, len)
}

/// Like [`equal`], reporting a malformed range as an error.
///
/// # Errors
///
/// Returns [`RangeError`] if either range falls outside its buffer.
#[inline]
pub fn try_equal(
    a: &[u8],
    a_off: usize,
    b: &[u8],
    b_off: usize,
    len: usize,
) -> Result<bool, RangeError> {
    strategy().try_equal(a, a_off, b, b_off, len)
}

/// Like [`equal`], without range validation.
///
/// # Safety
///
/// See [`Strategy::equal_unchecked`].
#[inline]
#[must_use]
pub unsafe fn equal_unchecked(a: &[u8], a_off: usize, b: &[u8], b_off: usize, len: usize) -> bool {
    // SAFETY: forwarded caller contract.
    unsafe { strategy().equal_unchecked(a, a_off, b, b_off, len) }
}

/// Unsigned lexicographic ordering of two byte ranges.
///
/// # Panics
///
/// Panics if either range falls outside its buffer.
#[track_caller]
#[inline]
#[must_use]
pub fn compare(
    a: &[u8],
    a_off: usize,
    a_len: usize,
    b: &[u8],
    b_off: usize,
    b_len: usize,
) -> Ordering {
    strategy().compare(a, a_off, a_len, b, b_off, b_len)
}

/// Like [`compare`], reporting a malformed range as an error.
///
/// # Errors
///
/// Returns [`RangeError`] if either range falls outside its buffer.
#[inline]
pub fn try_compare(
    a: &[u8],
    a_off: usize,
    a_len: usize,
    b: &[u8],
    b_off: usize,
    b_len: usize,
) -> Result<Ordering, RangeError> {
    strategy().try_compare(a, a_off, a_len, b, b_off, b_len)
}

/// Like [`compare`], without range validation.
///
/// # Safety
///
/// See [`Strategy::compare_unchecked`].
#[inline]
#[must_use]
pub unsafe fn compare_unchecked(
    a: &[u8],
    a_off: usize,
    a_len: usize,
    b: &[u8],
    b_off: usize,
    b_len: usize,
) -> Ordering {
    // SAFETY: forwarded caller contract.
    unsafe { strategy().compare_unchecked(a, a_off, a_len, b, b_off, b_len) }
}

/// Copies `len` bytes from `src[src_off..]` to `dst[dst_off..]`.
///
/// # Panics
///
/// Panics if either range falls outside its buffer.
#[track_caller]
#[inline]
pub fn copy(src: &[u8], src_off: usize, dst: &mut [u8], dst_off: usize, len: usize) {
    strategy().copy(src, src_off, dst, dst_off, len);
}

/// Like [`copy`], reporting a malformed range as an error.
///
/// # Errors
///
/// Returns [`RangeError`] if either range falls outside its buffer.
#[inline]
pub fn try_copy(
    src: &[u8],
    src_off: usize,
    dst: &mut [u8],
    dst_off: usize,
    len: usize,
) -> Result<(), RangeError> {
    strategy().try_copy(src, src_off, dst, dst_off, len)
}

/// Like [`copy`], without range validation.
///
/// # Safety
///
/// See [`Strategy::copy_unchecked`].
#[inline]
pub unsafe fn copy_unchecked(
    src: &[u8],
    src_off: usize,
    dst: &mut [u8],
    dst_off: usize,
    len: usize,
) {
    // SAFETY: forwarded caller contract.
    unsafe { strategy().copy_unchecked(src, src_off, dst, dst_off, len) }
}

/// Copies `len` bytes between raw, non-overlapping regions.
///
/// Does nothing when `len == 0`.
///
/// # Safety
///
/// `src` must be valid for reads and `dst` valid for writes of `len` bytes,
/// and the two regions must not overlap.
#[inline]
pub unsafe fn copy_raw(src: *const u8, dst: *mut u8, len: usize) {
    if len > 0 {
        // SAFETY: forwarded caller contract.
        unsafe { ptr::copy_nonoverlapping(src, dst, len) }
    }
}

/// Copies `len` bytes from `src[src_off..]` into raw memory at `dst`.
///
/// # Errors
///
/// Returns [`RangeError`] if the source range falls outside `src`.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes and must not overlap `src`.
#[inline]
pub unsafe fn copy_to_raw(
    src: &[u8],
    src_off: usize,
    dst: *mut u8,
    len: usize,
) -> Result<(), RangeError> {
    let rs = checked_range(src.len(), src_off, len)?;
    // SAFETY: the source range is checked; `dst` is the caller's contract.
    unsafe { copy_raw(src[rs].as_ptr(), dst, len) };
    Ok(())
}

/// Copies `len` bytes from raw memory at `src` into `dst[dst_off..]`.
///
/// # Errors
///
/// Returns [`RangeError`] if the destination range falls outside `dst`.
///
/// # Safety
///
/// `src` must be valid for reads of `len` bytes and must not overlap `dst`.
#[inline]
pub unsafe fn copy_from_raw(
    src: *const u8,
    dst: &mut [u8],
    dst_off: usize,
    len: usize,
) -> Result<(), RangeError> {
    let rd = checked_range(dst.len(), dst_off, len)?;
    // SAFETY: the destination range is checked; `src` is the caller's contract.
    unsafe { copy_raw(src, dst[rd].as_mut_ptr(), len) };
    Ok(())
}

/// Sets `len` bytes of `dst[off..]` to `value`.
///
/// # Panics
///
/// Panics if the range falls outside `dst`.
#[track_caller]
#[inline]
pub fn fill(dst: &mut [u8], off: usize, len: usize, value: u8) {
    strategy().fill(dst, off, len, value);
}

/// Like [`fill`], reporting a malformed range as an error.
///
/// # Errors
///
/// Returns [`RangeError`] if the range falls outside `dst`.
#[inline]
pub fn try_fill(dst: &mut [u8], off: usize, len: usize, value: u8) -> Result<(), RangeError> {
    strategy().try_fill(dst, off, len, value)
}

/// Like [`fill`], without range validation.
///
/// # Safety
///
/// See [`Strategy::fill_unchecked`].
#[inline]
pub unsafe fn fill_unchecked(dst: &mut [u8], off: usize, len: usize, value: u8) {
    // SAFETY: forwarded caller contract.
    unsafe { strategy().fill_unchecked(dst, off, len, value) }
}

/// Sets `len` bytes at a raw pointer to `value`. Does nothing when `len == 0`.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub unsafe fn fill_raw(dst: *mut u8, len: usize, value: u8) {
    if len > 0 {
        // SAFETY: forwarded caller contract.
        unsafe { ptr::write_bytes(dst, value, len) }
    }
}

/// Zeroes `len` bytes of `dst[off..]`.
///
/// # Panics
///
/// Panics if the range falls outside `dst`.
#[track_caller]
#[inline]
pub fn clear(dst: &mut [u8], off: usize, len: usize) {
    fill(dst, off, len, 0);
}

/// Returns a reference to `buf[index]` without a bounds check.
///
/// # Safety
///
/// `index < buf.len()` must hold.
#[inline]
#[must_use]
pub unsafe fn raw_access(buf: &[u8], index: usize) -> &u8 {
    debug_assert!(index < buf.len());
    // SAFETY: the caller guarantees `index` is in bounds.
    unsafe { buf.get_unchecked(index) }
}

/// Mutable form of [`raw_access`].
///
/// # Safety
///
/// `index < buf.len()` must hold.
#[inline]
#[must_use]
pub unsafe fn raw_access_mut(buf: &mut [u8], index: usize) -> &mut u8 {
    debug_assert!(index < buf.len());
    // SAFETY: the caller guarantees `index` is in bounds.
    unsafe { buf.get_unchecked_mut(index) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both() -> [&'static Strategy; 2] {
        [Strategy::fast(), Strategy::portable()]
    }

    #[test]
    fn test_checked_range() {
        assert_eq!(checked_range(10, 2, 8), Ok(2..10));
        assert_eq!(checked_range(10, 10, 0), Ok(10..10));
        assert_eq!(
            checked_range(10, 3, 8),
            Err(RangeError::OutOfBounds {
                offset: 3,
                len: 8,
                buffer_len: 10
            })
        );
        assert_eq!(
            checked_range(10, usize::MAX, 2),
            Err(RangeError::Overflow {
                offset: usize::MAX,
                len: 2
            })
        );
    }

    #[test]
    fn test_equal_with_offsets() {
        let a = b"xxabcdef";
        let b = b"abcdefyy";
        for s in both() {
            assert!(s.equal(a, 2, b, 0, 6));
            assert!(!s.equal(a, 1, b, 0, 6));
            assert!(s.equal(a, 0, b, 0, 0));
        }
    }

    #[test]
    fn test_compare_prefix_sorts_first() {
        for s in both() {
            assert_eq!(s.compare(b"abc", 0, 2, b"abc", 0, 3), Ordering::Less);
            assert_eq!(s.compare(b"abc", 0, 3, b"abc", 0, 2), Ordering::Greater);
            assert_eq!(s.compare(b"abc", 0, 3, b"abc", 0, 3), Ordering::Equal);
            assert_eq!(s.compare(b"", 0, 0, b"", 0, 0), Ordering::Equal);
        }
    }

    #[test]
    fn test_compare_is_unsigned() {
        for s in both() {
            assert_eq!(s.compare(&[0x80], 0, 1, &[0x7f], 0, 1), Ordering::Greater);
            assert_eq!(s.compare(&[0x00], 0, 1, &[0xff], 0, 1), Ordering::Less);
        }
    }

    #[test]
    fn test_copy_and_fill() {
        for s in both() {
            let src = [1u8, 2, 3, 4, 5];
            let mut dst = [0u8; 7];
            s.copy(&src, 1, &mut dst, 2, 3);
            assert_eq!(dst, [0, 0, 2, 3, 4, 0, 0]);

            s.fill(&mut dst, 0, 2, 9);
            assert_eq!(dst, [9, 9, 2, 3, 4, 0, 0]);
        }
    }

    #[test]
    fn test_zero_length_ignores_offsets() {
        let mut dst = [7u8; 4];
        assert_eq!(try_copy(&[1, 2], 100, &mut dst, 100, 0), Ok(()));
        assert_eq!(try_fill(&mut dst, 100, 0, 1), Ok(()));
        assert_eq!(dst, [7; 4]);
    }

    #[test]
    fn test_try_forms_report_bad_ranges() {
        let mut dst = [0u8; 4];
        assert!(try_equal(b"abc", 1, b"abc", 0, 3).is_err());
        assert!(try_compare(b"abc", 0, 4, b"abc", 0, 1).is_err());
        assert!(try_copy(b"abcd", 0, &mut dst, 1, 4).is_err());
        assert!(try_fill(&mut dst, 2, 3, 1).is_err());
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_copy_panics_on_bad_range() {
        let mut dst = [0u8; 2];
        copy(b"abc", 0, &mut dst, 0, 3);
    }

    #[test]
    fn test_unchecked_forms() {
        let src = *b"0123456789";
        let mut dst = [0u8; 10];
        unsafe {
            copy_unchecked(&src, 0, &mut dst, 0, 10);
            assert!(equal_unchecked(&src, 0, &dst, 0, 10));
            fill_unchecked(&mut dst, 5, 5, b'x');
            assert_eq!(compare_unchecked(&src, 0, 10, &dst, 0, 10), Ordering::Less);
            assert_eq!(*raw_access(&dst, 9), b'x');
            *raw_access_mut(&mut dst, 0) = b'y';
        }
        assert_eq!(&dst, b"y1234xxxxx");
    }

    #[test]
    fn test_raw_pointer_forms() {
        let src = [1u8, 2, 3];
        let mut dst = [0u8; 3];
        unsafe {
            copy_raw(src.as_ptr(), dst.as_mut_ptr(), 3);
            assert_eq!(dst, src);
            fill_raw(dst.as_mut_ptr().add(1), 2, 0xaa);
            copy_raw(std::ptr::null(), std::ptr::null_mut(), 0);
        }
        assert_eq!(dst, [1, 0xaa, 0xaa]);
    }

    #[test]
    fn test_mixed_raw_copies() {
        let src = [1u8, 2, 3, 4, 5];
        let mut out = [0u8; 3];
        unsafe {
            copy_to_raw(&src, 2, out.as_mut_ptr(), 3).unwrap();
        }
        assert_eq!(out, [3, 4, 5]);

        let mut dst = [0u8; 6];
        unsafe {
            copy_from_raw(out.as_ptr(), &mut dst, 1, 3).unwrap();
        }
        assert_eq!(dst, [0, 3, 4, 5, 0, 0]);

        let err = unsafe { copy_to_raw(&src, 4, out.as_mut_ptr(), 2) };
        assert!(matches!(err, Err(RangeError::OutOfBounds { .. })));
        let err = unsafe { copy_from_raw(src.as_ptr(), &mut dst, usize::MAX, 1) };
        assert!(matches!(err, Err(RangeError::Overflow { .. })));
        assert_eq!(dst, [0, 3, 4, 5, 0, 0]);
    }

    #[test]
    fn test_active_strategy_matches_capabilities() {
        let expected = if PlatformCapabilities::get().fast_memory_view_supported() {
            StrategyKind::Fast
        } else {
            StrategyKind::Portable
        };
        assert_eq!(strategy().kind(), expected);
        assert!(std::ptr::eq(strategy(), strategy()));
    }
}
