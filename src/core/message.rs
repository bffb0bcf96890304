//! Message: an ordered sequence of opaque byte parts.
//!
//! A `Message` is never mutated once it has been sent on a transaction
//! channel — processors that "transform" a message build a new one from the
//! parts they want to keep.

use bytes::Bytes;

/// An ordered sequence of opaque byte parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Bytes>,
}

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Creates a message from a list of parts.
    pub fn from_parts<I, B>(parts: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a part to the end of the message.
    pub fn append(&mut self, part: impl Into<Bytes>) {
        self.parts.push(part.into());
    }

    /// Returns the number of parts in the message.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if the message has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the part at `index`. Negative indices count from the end:
    /// `-1` is the last part, `-2` the second-to-last, and so on.
    pub fn get(&self, index: i64) -> Option<&Bytes> {
        let resolved = if index < 0 {
            let from_end = (-index) as usize;
            self.parts.len().checked_sub(from_end)?
        } else {
            index as usize
        };
        self.parts.get(resolved)
    }

    /// Returns all parts as a slice.
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.parts.iter()
    }

    /// Returns all parts.
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Approximate size of this message in bytes, used by bounded stores to
    /// track how much of their capacity is in use.
    pub fn byte_size(&self) -> usize {
        self.parts.iter().map(|p| p.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_get() {
        let mut msg = Message::new();
        msg.append(&b"foo"[..]);
        msg.append(&b"bar"[..]);
        assert_eq!(msg.len(), 2);
        assert_eq!(msg.get(0).unwrap().as_ref(), b"foo");
        assert_eq!(msg.get(1).unwrap().as_ref(), b"bar");
    }

    #[test]
    fn test_negative_index() {
        let msg = Message::from_parts(vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert_eq!(msg.get(-1).unwrap().as_ref(), b"c");
        assert_eq!(msg.get(-2).unwrap().as_ref(), b"b");
        assert_eq!(msg.get(-4), None);
    }

    #[test]
    fn test_byte_size() {
        let msg = Message::from_parts(vec![vec![0u8; 10], vec![0u8; 5]]);
        assert_eq!(msg.byte_size(), 15);
    }
}
