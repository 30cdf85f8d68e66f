// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The growable byte buffer canonicalizers append into.

/// Typical URLs fit here without touching the heap.
const INLINE_CAPACITY: usize = 128;

enum Repr {
    Inline { buf: [u8; INLINE_CAPACITY], len: usize },
    Heap(Vec<u8>),
}

/// Canonical output accumulator.
///
/// Bytes appended are always either ASCII or well-formed UTF-8 sequences
/// produced by the canonicalizers, so `finish` cannot fail. Storage starts
/// in a fixed inline array and spills to a `Vec` (geometric growth) when a
/// URL outgrows it.
pub struct CanonOutput {
    repr: Repr,
}

impl CanonOutput {
    pub fn new() -> CanonOutput {
        CanonOutput {
            repr: Repr::Inline {
                buf: [0; INLINE_CAPACITY],
                len: 0,
            },
        }
    }

    /// A buffer pre-sized for `capacity` bytes of output.
    pub fn with_capacity(capacity: usize) -> CanonOutput {
        if capacity <= INLINE_CAPACITY {
            CanonOutput::new()
        } else {
            CanonOutput {
                repr: Repr::Heap(Vec::with_capacity(capacity)),
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self.repr {
            Repr::Inline { len, .. } => len,
            Repr::Heap(ref vec) => vec.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self.repr {
            Repr::Inline { ref buf, len } => &buf[..len],
            Repr::Heap(ref vec) => vec,
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        match self.repr {
            Repr::Inline { ref mut buf, ref mut len } if *len < INLINE_CAPACITY => {
                buf[*len] = byte;
                *len += 1;
            }
            Repr::Inline { .. } => {
                self.spill(1);
                self.push(byte);
            }
            Repr::Heap(ref mut vec) => vec.push(byte),
        }
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.extend_from_slice(s.as_bytes());
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        match self.repr {
            Repr::Inline { ref mut buf, ref mut len } if *len + bytes.len() <= INLINE_CAPACITY => {
                buf[*len..*len + bytes.len()].copy_from_slice(bytes);
                *len += bytes.len();
            }
            Repr::Inline { .. } => {
                self.spill(bytes.len());
                self.extend_from_slice(bytes);
            }
            Repr::Heap(ref mut vec) => vec.extend_from_slice(bytes),
        }
    }

    /// Drop everything at index `new_len` and after.
    pub fn truncate(&mut self, new_len: usize) {
        match self.repr {
            Repr::Inline { ref mut len, .. } => *len = (*len).min(new_len),
            Repr::Heap(ref mut vec) => vec.truncate(new_len),
        }
    }

    #[inline]
    pub fn byte_at(&self, index: usize) -> u8 {
        self.as_bytes()[index]
    }

    /// The accumulated output as an owned `String`.
    pub fn finish(self) -> String {
        match self.repr {
            Repr::Inline { buf, len } => {
                debug_assert!(std::str::from_utf8(&buf[..len]).is_ok());
                String::from_utf8_lossy(&buf[..len]).into_owned()
            }
            Repr::Heap(vec) => {
                debug_assert!(std::str::from_utf8(&vec).is_ok());
                match String::from_utf8(vec) {
                    Ok(s) => s,
                    Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
                }
            }
        }
    }

    fn spill(&mut self, extra: usize) {
        if let Repr::Inline { ref buf, len } = self.repr {
            let mut vec = Vec::with_capacity((INLINE_CAPACITY * 2).max(len + extra));
            vec.extend_from_slice(&buf[..len]);
            self.repr = Repr::Heap(vec);
        }
    }
}

impl Default for CanonOutput {
    fn default() -> CanonOutput {
        CanonOutput::new()
    }
}

impl std::fmt::Write for CanonOutput {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_inline_for_short_output() {
        let mut out = CanonOutput::new();
        out.push_str("http://example.com/");
        assert!(matches!(out.repr, Repr::Inline { .. }));
        assert_eq!(out.finish(), "http://example.com/");
    }

    #[test]
    fn spills_to_heap_and_keeps_content() {
        let mut out = CanonOutput::new();
        let long = "a".repeat(INLINE_CAPACITY - 1);
        out.push_str(&long);
        out.push_str("bcd");
        assert!(matches!(out.repr, Repr::Heap(_)));
        assert_eq!(out.len(), INLINE_CAPACITY + 2);
        assert!(out.finish().ends_with("abcd"));
    }

    #[test]
    fn truncate_rewinds() {
        let mut out = CanonOutput::new();
        out.push_str("/foo/bar");
        out.truncate(4);
        assert_eq!(out.as_bytes(), b"/foo");
    }
}
