//! Bounded zero-copy view over a byte range.

use std::cmp::Ordering;

use super::{RangeError, checked_range, raw_access, strategy};

/// A borrowed byte range whose bounds were validated once, at construction.
///
/// Reads inside the view can then skip per-access checks with
/// [`ByteView::get_unchecked`], which is how buffer hot paths are expected to
/// use it after validating their own indices.
///
/// ```
/// use ember::bytes::ByteView;
///
/// let packet = b"\x01\x02hello";
/// let body = ByteView::new(packet, 2, 5).unwrap();
/// assert_eq!(body.as_slice(), b"hello");
/// assert_eq!(body.get(0), Some(b'h'));
/// assert_eq!(body.get(5), None);
/// assert!(ByteView::new(packet, 2, 6).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteView<'a> {
    /// Creates a view of `buf[offset..offset + len]`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if the range falls outside `buf`.
    pub fn new(buf: &'a [u8], offset: usize, len: usize) -> Result<Self, RangeError> {
        let range = checked_range(buf.len(), offset, len)?;
        Ok(Self {
            bytes: &buf[range],
            offset,
        })
    }

    /// Creates a view of the whole buffer.
    #[must_use]
    pub const fn whole(buf: &'a [u8]) -> Self {
        Self {
            bytes: buf,
            offset: 0,
        }
    }

    /// Offset of this view inside the buffer it was created from.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the byte at `index`, or `None` past the end of the view.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Returns a reference to the byte at `index` without a bounds check.
    ///
    /// # Safety
    ///
    /// `index < self.len()` must hold.
    #[inline]
    #[must_use]
    pub unsafe fn get_unchecked(&self, index: usize) -> &'a u8 {
        // SAFETY: forwarded caller contract.
        unsafe { raw_access(self.bytes, index) }
    }

    /// Narrows the view to `[offset..offset + len]` relative to its start.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if the range falls outside this view.
    pub fn subview(&self, offset: usize, len: usize) -> Result<Self, RangeError> {
        let range = checked_range(self.bytes.len(), offset, len)?;
        Ok(Self {
            bytes: &self.bytes[range],
            offset: self.offset + offset,
        })
    }

    /// Compares contents using the process-wide byte strategy.
    #[must_use]
    pub fn equals(&self, other: &ByteView<'_>) -> bool {
        self.len() == other.len()
            // SAFETY: both ranges are exactly the views' own bounds.
            && unsafe { strategy().equal_unchecked(self.bytes, 0, other.bytes, 0, self.len()) }
    }

    /// Orders contents using the process-wide byte strategy.
    #[must_use]
    pub fn compare(&self, other: &ByteView<'_>) -> Ordering {
        // SAFETY: both ranges are exactly the views' own bounds.
        unsafe {
            strategy().compare_unchecked(self.bytes, 0, self.len(), other.bytes, 0, other.len())
        }
    }
}

impl AsRef<[u8]> for ByteView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl PartialEq for ByteView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for ByteView<'_> {}

impl PartialOrd for ByteView<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteView<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subview_offsets_accumulate() {
        let buf = b"0123456789";
        let outer = ByteView::new(buf, 2, 6).unwrap();
        let inner = outer.subview(1, 3).unwrap();
        assert_eq!(inner.as_slice(), b"345");
        assert_eq!(inner.offset(), 3);
        assert!(outer.subview(4, 3).is_err());
    }

    #[test]
    fn test_equality_ignores_position() {
        let a = ByteView::new(b"..abc", 2, 3).unwrap();
        let b = ByteView::whole(b"abc");
        assert_eq!(a, b);
        assert_ne!(a, ByteView::whole(b"abd"));
        assert_ne!(a, ByteView::whole(b"ab"));
    }

    #[test]
    fn test_ordering() {
        let mut views = vec![
            ByteView::whole(b"b"),
            ByteView::whole(b"ab"),
            ByteView::whole(b""),
            ByteView::whole(b"a"),
            ByteView::whole(&[0xff]),
        ];
        views.sort();
        let sorted: Vec<Vec<u8>> = views.iter().map(|v| v.as_slice().to_vec()).collect();
        assert_eq!(
            sorted,
            vec![vec![], b"a".to_vec(), b"ab".to_vec(), b"b".to_vec(), vec![0xff]]
        );
    }

    #[test]
    fn test_empty_view_at_end() {
        let buf = [1u8, 2, 3];
        let view = ByteView::new(&buf, 3, 0).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.get(0), None);
        assert_eq!(unsafe { *ByteView::whole(&buf).get_unchecked(2) }, 3);
    }
}
