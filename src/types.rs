//! Core types used throughout the cache.

use bytes::Bytes;
use std::fmt;

/// Identity of a peer on the hash ring, its `host:port` address.
pub type PeerId = String;

/// An immutable view of a cached value.
///
/// Cloning a `ByteView` is cheap and never aliases mutable state: the backing
/// buffer is reference counted and read-only.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    /// Create a view holding its own copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    /// Number of bytes in the value.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the value is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Return a copy of the data; mutating it does not touch the cache.
    pub fn byte_slice(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Borrow the data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the data as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(data),
        }
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::copy_from_slice(s.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("len", &self.bytes.len())
            .field("data", &String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_slice_is_a_copy() {
        let view = ByteView::from("630");
        let mut copy = view.byte_slice();
        copy[0] = b'9';

        assert_eq!(view.as_bytes(), b"630");
        assert_eq!(copy, b"930");
    }

    #[test]
    fn test_len_and_display() {
        let view = ByteView::from(b"hello".to_vec());
        assert_eq!(view.len(), 5);
        assert!(!view.is_empty());
        assert_eq!(view.to_string(), "hello");
        assert!(ByteView::default().is_empty());
    }
}
