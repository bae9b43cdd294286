//  Copyright 2024 Warren Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The element literal: the uniform currency every container operation
//! accepts and produces, so that algebra over mixed encodings never pays
//! for an allocation in the integer case.

use std::borrow::Cow;

use bytes::Bytes;

/// A single element, either an integer or a byte string, either borrowed
/// from a container's storage or carrying its own buffer.
///
/// The borrowed form ties its lifetime to the container it came from, so
/// the "never outlives the storage it borrows from" invariant spec-level
/// implementations have to police by convention is enforced here by the
/// borrow checker: a `&mut` container operation cannot be called while an
/// `Elem<'_>` borrowed from it is alive.
#[derive(Debug, Clone)]
pub enum Elem<'a> {
    Int(i64),
    Bytes(Cow<'a, [u8]>),
}

impl<'a> Elem<'a> {
    pub fn from_integer(i: i64) -> Elem<'static> {
        Elem::Int(i)
    }

    pub fn from_bytes(b: &'a [u8]) -> Elem<'a> {
        Elem::Bytes(Cow::Borrowed(b))
    }

    pub fn from_owned_bytes(b: impl Into<Vec<u8>>) -> Elem<'static> {
        Elem::Bytes(Cow::Owned(b.into()))
    }

    /// Borrow from a value object: integer-encoded payloads surface as
    /// `Int`, everything else borrows the object's buffer.
    pub fn from_object(obj: &'a Bytes) -> Elem<'a> {
        match parse_i64(obj) {
            Some(i) => Elem::Int(i),
            None => Elem::Bytes(Cow::Borrowed(obj.as_ref())),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Elem::Int(i) => Some(*i),
            Elem::Bytes(_) => None,
        }
    }

    /// Byte-serialised view used for cross-encoding comparison: an integer
    /// literal is compared against its decimal byte form.
    pub fn bytes_view(&self) -> Cow<'_, [u8]> {
        match self {
            Elem::Int(i) => Cow::Owned(i.to_string().into_bytes()),
            Elem::Bytes(b) => Cow::Borrowed(b.as_ref()),
        }
    }

    /// Materialise into an owned, refcounted value object. For the integer
    /// case this allocates a fresh decimal encoding; for an already-owned
    /// byte literal it reuses the buffer without copying.
    pub fn as_object(&self) -> Bytes {
        match self {
            Elem::Int(i) => Bytes::from(i.to_string().into_bytes()),
            Elem::Bytes(Cow::Borrowed(b)) => Bytes::copy_from_slice(b),
            Elem::Bytes(Cow::Owned(b)) => Bytes::from(b.clone()),
        }
    }

    /// No-op: value objects here are `Bytes`, which are refcounted and
    /// clone in O(1), so there is no separate dirty materialisation to
    /// release. Kept for symmetry with the borrowed-vs-owned contract.
    pub fn clear_dirty(self) {}

    pub fn len(&self) -> usize {
        self.bytes_view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, 'b> PartialEq<Elem<'b>> for Elem<'a> {
    fn eq(&self, other: &Elem<'b>) -> bool {
        match (self, other) {
            (Elem::Int(a), Elem::Int(b)) => a == b,
            _ => self.bytes_view() == other.bytes_view(),
        }
    }
}

impl<'a> Eq for Elem<'a> {}

/// Whether `buf` is the canonical decimal encoding of an `i64` (no leading
/// zeros, no `+`, a bare `-0` rejected) -- the same rule containers use to
/// decide whether a byte element is "integer-encodable".
pub fn parse_i64(buf: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(buf).ok()?;
    if s.is_empty() {
        return None;
    }
    let i: i64 = s.parse().ok()?;
    // Reject non-canonical forms (e.g. "01", "+1") that would not round-trip.
    if i.to_string() == s {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_decimal_bytes_compare_equal() {
        let a = Elem::from_integer(42);
        let b = Elem::from_bytes(b"42");
        assert_eq!(a, b);
    }

    #[test]
    fn non_canonical_bytes_are_not_integers() {
        assert_eq!(parse_i64(b"01"), None);
        assert_eq!(parse_i64(b"+1"), None);
        assert_eq!(parse_i64(b"-0"), None);
        assert_eq!(parse_i64(b""), None);
        assert_eq!(parse_i64(b"-5"), Some(-5));
        assert_eq!(parse_i64(b"0"), Some(0));
    }

    #[test]
    fn materialise_roundtrips() {
        let e = Elem::from_bytes(b"hello");
        assert_eq!(e.as_object().as_ref(), b"hello");

        let e = Elem::from_integer(7);
        assert_eq!(e.as_object().as_ref(), b"7");
    }
}
